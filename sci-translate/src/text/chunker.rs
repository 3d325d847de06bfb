//! Greedy paragraph-aware splitting of long documents.
//!
//! Sizes are counted in characters, not bytes, and every slice boundary falls
//! on a character boundary. Concatenating the returned chunks always yields
//! the input unchanged.

/// Default maximum chunk size in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 4000;

/// Split `text` into chunks of at most `max_size` characters.
///
/// Text that already fits is returned as a single chunk. Longer text is cut
/// into segments at runs of newlines (each run kept as its own segment) and the
/// segments are packed greedily. A segment longer than `max_size` on its own is
/// hard-split at fixed character offsets.
pub fn split_into_chunks(text: &str, max_size: usize) -> Vec<String> {
    let max_size = max_size.max(1);

    if char_len(text) <= max_size {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for segment in newline_segments(text) {
        let segment_len = char_len(segment);

        if segment_len > max_size {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
                current_len = 0;
            }
            chunks.extend(hard_split(segment, max_size).into_iter().map(str::to_string));
        } else if current_len + segment_len > max_size {
            chunks.push(std::mem::replace(&mut current, segment.to_string()));
            current_len = segment_len;
        } else {
            current.push_str(segment);
            current_len += segment_len;
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

/// Split text into alternating runs of non-newline text and runs of `\n`.
fn newline_segments(text: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut start = 0;
    let mut in_newlines = text.starts_with('\n');

    for (i, c) in text.char_indices() {
        let is_newline = c == '\n';
        if is_newline != in_newlines {
            if i > start {
                segments.push(&text[start..i]);
            }
            start = i;
            in_newlines = is_newline;
        }
    }

    if start < text.len() {
        segments.push(&text[start..]);
    }

    segments
}

/// Cut text into consecutive slices of `max_size` characters (the last may be shorter).
fn hard_split(text: &str, max_size: usize) -> Vec<&str> {
    let mut slices = Vec::new();
    let mut start = 0;

    for (count, (i, _)) in text.char_indices().enumerate() {
        if count > 0 && count % max_size == 0 {
            slices.push(&text[start..i]);
            start = i;
        }
    }

    if start < text.len() {
        slices.push(&text[start..]);
    }

    slices
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}
