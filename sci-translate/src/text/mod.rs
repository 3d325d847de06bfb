//! Text processing for translation: splitting documents into backend-sized chunks.

pub mod chunker;

pub use chunker::{DEFAULT_CHUNK_SIZE, split_into_chunks};

/// A contiguous piece of the source document sent to the backend on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Position of this chunk in the output ordering
    pub index: usize,
    /// The chunk content, byte-for-byte as it appears in the source
    pub text: String,
}

impl Chunk {
    /// Create a new chunk.
    pub fn new(index: usize, text: String) -> Self {
        Self { index, text }
    }
}

/// Split a document into indexed chunks of at most `max_size` characters.
pub fn chunk_document(text: &str, max_size: usize) -> Vec<Chunk> {
    split_into_chunks(text, max_size)
        .into_iter()
        .enumerate()
        .map(|(index, text)| Chunk::new(index, text))
        .collect()
}
