//! sci-translate - Translate scientific documents with a chat-completion LLM

mod config;
mod error;
mod extract;
mod improve;
mod languages;
mod text;
mod translate;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::{DispatchPolicy, TranslatorConfig};
use improve::ImprovementRequest;
use indicatif::{ProgressBar, ProgressStyle};
use llm_client::{Config, LlmProvider, ModelPreset, get_provider};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::time::Duration;
use translate::{LlmBackend, TranslateOptions, TranslationRequest, Translator};

#[derive(Parser, Debug)]
#[command(
    name = "sci-translate",
    about = "Translate scientific documents with an LLM",
    long_about = "Translates a .txt, .pdf or .docx document (or pasted text) into one of ten languages, splitting long documents into chunks the backend can handle"
)]
#[command(version)]
struct Args {
    /// Document to translate (.txt, .pdf, .docx). Reads stdin when omitted.
    file: Option<PathBuf>,

    /// Text to translate instead of a file
    #[arg(short, long, conflicts_with = "file")]
    text: Option<String>,

    /// Target language (see `sci-translate languages`)
    #[arg(short, long, value_parser = languages::parse_language)]
    lang: Option<String>,

    /// Write the translation to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Copy the translation to the clipboard
    #[arg(long)]
    copy: bool,

    /// Model preset to use (overrides default from config and GIGA_CHAT_MODEL)
    #[arg(short, long)]
    model: Option<String>,

    /// How chunks are sent to the backend (overrides config)
    #[arg(long, value_enum)]
    dispatch: Option<DispatchPolicy>,

    /// Maximum chunk size in characters (overrides config)
    #[arg(long, value_parser = positive_usize())]
    chunk_size: Option<usize>,

    /// Enable debug logging
    #[arg(short, long, default_value_t = false)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

fn positive_usize() -> clap::builder::RangedU64ValueParser<usize> {
    clap::builder::RangedU64ValueParser::new().range(1..)
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the supported target languages
    Languages,
    /// Suggest improvements to an existing translation
    Improve {
        /// File with the original text
        #[arg(long)]
        original: PathBuf,
        /// File with the current translation
        #[arg(long)]
        translated: PathBuf,
        /// Language of the translation
        #[arg(short, long, value_parser = languages::parse_language)]
        lang: Option<String>,
        /// Model preset to use
        #[arg(short, long)]
        model: Option<String>,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// List available model presets
    List,
    /// Set the default model preset
    SetDefault {
        /// Name of the preset to use as default
        preset: String,
        /// Only for this command (translate, improve)
        #[arg(long)]
        command: Option<String>,
    },
    /// Add a new model preset
    AddPreset {
        /// Preset name
        name: String,
        /// Provider (gigachat, openai-compatible, mock)
        #[arg(short, long)]
        provider: String,
        /// Model identifier
        #[arg(short = 'M', long)]
        model: String,
    },
    /// Set the maximum chunk size in characters
    SetChunkSize {
        #[arg(value_parser = positive_usize())]
        size: usize,
    },
    /// Set how chunks are dispatched
    SetDispatch {
        #[arg(value_enum)]
        policy: DispatchPolicy,
        /// Cap on concurrent requests (concurrent dispatch only)
        #[arg(long, value_parser = positive_usize())]
        max_in_flight: Option<usize>,
    },
    /// Set the default target language
    SetLanguage {
        #[arg(value_parser = languages::parse_language)]
        lang: String,
    },
}

fn init_logging(debug: bool) {
    let default_filter = if debug { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}

fn load_dotenv() {
    match dotenvy::dotenv() {
        Ok(path) => log::debug!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => log::warn!("Ignoring malformed .env file: {}", e),
    }
}

/// Handle config subcommands
fn handle_config_command(action: &ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let llm = Config::load()?;
            let translator = TranslatorConfig::load()?;
            println!("Translator config: {}", TranslatorConfig::config_path()?.display());
            println!("{:#?}", translator);
            println!();
            println!("LLM config: {}", Config::config_path()?.display());
            println!("{:#?}", llm);
        }
        ConfigAction::List => {
            let config = Config::load()?;
            let current_default = config.get_default_for_command("translate");
            let mut names: Vec<_> = config.presets.keys().collect();
            names.sort();
            println!("Available presets:");
            for name in names {
                let preset = &config.presets[name];
                let default_marker = if name == current_default {
                    " (default)"
                } else {
                    ""
                };
                println!(
                    "  {} - {} / {}{}",
                    name, preset.provider, preset.model, default_marker
                );
            }
        }
        ConfigAction::SetDefault { preset, command } => {
            let mut config = Config::load()?;
            config.get_preset(preset)?;
            match command {
                Some(command) => {
                    config.defaults.insert(command.clone(), preset.clone());
                    println!("Default preset for {} set to: {}", command, preset);
                }
                None => {
                    config.default_preset = preset.clone();
                    println!("Default preset set to: {}", preset);
                }
            }
            config.save()?;
        }
        ConfigAction::AddPreset {
            name,
            provider,
            model,
        } => {
            provider
                .parse::<llm_client::ProviderKind>()
                .context("Cannot add preset")?;
            let mut config = Config::load()?;
            config.presets.insert(
                name.clone(),
                ModelPreset {
                    provider: provider.clone(),
                    model: model.clone(),
                },
            );
            config.save()?;
            println!("Added preset: {}", name);
        }
        ConfigAction::SetChunkSize { size } => {
            let mut config = TranslatorConfig::load()?;
            config.chunk_size = *size;
            config.save()?;
            println!("Chunk size set to {} characters", size);
        }
        ConfigAction::SetDispatch {
            policy,
            max_in_flight,
        } => {
            let mut config = TranslatorConfig::load()?;
            config.dispatch = *policy;
            config.max_in_flight = *max_in_flight;
            config.save()?;
            println!("Dispatch set to {:?}", policy);
        }
        ConfigAction::SetLanguage { lang } => {
            let mut config = TranslatorConfig::load()?;
            config.default_language = lang.clone();
            config.save()?;
            println!("Default language set to {}", lang);
        }
    }
    Ok(())
}

/// Resolve the preset for `command` and construct its provider
fn build_provider(
    model: Option<&str>,
    command: &str,
    timeout: Duration,
) -> Result<Box<dyn LlmProvider>> {
    let config = Config::load().context("Failed to load LLM configuration")?;
    let preset = config
        .resolve_preset(model, command)
        .context("Unknown model preset")?;

    let provider = get_provider(&preset, config.get_provider_config(&preset.provider), timeout)
        .with_context(|| format!("Failed to initialize provider '{}'", preset.provider))?;

    log::info!(
        "Using LLM provider: {} (model: {})",
        provider.name(),
        preset.model
    );
    Ok(provider)
}

/// Source text from --text, a document, or stdin (in that order)
fn read_input(text: Option<&str>, file: Option<&Path>) -> Result<String> {
    if let Some(text) = text {
        return Ok(text.to_string());
    }

    if let Some(path) = file {
        return extract::extract_file(path)
            .with_context(|| format!("Could not load {}", path.display()));
    }

    let stdin = std::io::stdin();
    if !stdin.is_terminal() {
        return std::io::read_to_string(stdin).context("Failed to read stdin");
    }

    anyhow::bail!("No input given. Pass a file, --text, or pipe text on stdin. Run 'sci-translate --help' for usage.")
}

fn chunk_progress_bar() -> Result<ProgressBar> {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} Translating [{bar:30.cyan/blue}] {pos}/{len} chunks ({elapsed})")?
            .progress_chars("#>-"),
    );
    pb.enable_steady_tick(Duration::from_millis(120));
    Ok(pb)
}

fn emit_output(text: &str, output: Option<&Path>, copy: bool) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, text)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("Translation written to {}", path.display());
        }
        None => {
            print!("{}", text);
            if !text.ends_with('\n') {
                println!();
            }
        }
    }

    if copy {
        copy_to_clipboard(text)?;
        eprintln!("Copied to clipboard.");
    }

    Ok(())
}

fn copy_to_clipboard(text: &str) -> Result<()> {
    use cli_clipboard::{ClipboardContext, ClipboardProvider};

    let mut ctx =
        ClipboardContext::new().map_err(|e| anyhow::anyhow!("Clipboard unavailable: {}", e))?;
    ctx.set_contents(text.to_string())
        .map_err(|e| anyhow::anyhow!("Failed to copy to clipboard: {}", e))
}

async fn run_translate(args: &Args, config: &TranslatorConfig) -> Result<()> {
    let mut options = TranslateOptions::from(config);
    if let Some(dispatch) = args.dispatch {
        options.dispatch = dispatch;
    }
    if let Some(size) = args.chunk_size {
        options.chunk_size = size;
    }

    let target_language = args
        .lang
        .clone()
        .unwrap_or_else(|| config.default_language.clone());

    let text = read_input(args.text.as_deref(), args.file.as_deref())?;
    let request = TranslationRequest::new(text, target_language);

    // Input errors are reported before any provider is set up.
    translate::validate_request(&request, options.min_text_len)
        .context("Input error")?;

    let timeout = Duration::from_secs(config.request_timeout_secs);
    let backend = LlmBackend::new(build_provider(args.model.as_deref(), "translate", timeout)?);
    eprintln!(
        "Translating into {} via {}...",
        request.target_language,
        backend.provider_name()
    );

    let pb = chunk_progress_bar()?;
    let translator = Translator::new(backend, options).with_progress(pb.clone());
    let result = translator.translate(&request).await;
    pb.finish_and_clear();

    let result = result.context("Translation failed")?;
    emit_output(&result.translated_text, args.output.as_deref(), args.copy)
}

async fn run_improve(
    original: &Path,
    translated: &Path,
    lang: Option<&str>,
    model: Option<&str>,
    config: &TranslatorConfig,
) -> Result<()> {
    let request = ImprovementRequest {
        original_text: extract::extract_file(original)
            .with_context(|| format!("Could not load {}", original.display()))?,
        translated_text: extract::extract_file(translated)
            .with_context(|| format!("Could not load {}", translated.display()))?,
        target_language: lang.unwrap_or(&config.default_language).to_string(),
    };

    let timeout = Duration::from_secs(config.request_timeout_secs);
    let provider = build_provider(model, "improve", timeout)?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_message("Reviewing translation...");
    spinner.enable_steady_tick(Duration::from_millis(120));
    let suggestion = improve::suggest_improvements(provider.as_ref(), &request).await;
    spinner.finish_and_clear();

    let suggestion = suggestion.context("Improvement failed")?;
    println!("Improved translation:\n{}\n", suggestion.improved_translation);
    println!("Explanation:\n{}", suggestion.explanation);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.debug);
    load_dotenv();

    match &args.command {
        Some(Commands::Config { action }) => return handle_config_command(action),
        Some(Commands::Languages) => {
            for lang in languages::SUPPORTED_LANGUAGES {
                println!("{}", lang);
            }
            return Ok(());
        }
        Some(Commands::Improve {
            original,
            translated,
            lang,
            model,
        }) => {
            let config = TranslatorConfig::load().context("Failed to load configuration")?;
            return run_improve(original, translated, lang.as_deref(), model.as_deref(), &config)
                .await;
        }
        None => {}
    }

    let config = TranslatorConfig::load().context("Failed to load configuration")?;
    run_translate(&args, &config).await
}
