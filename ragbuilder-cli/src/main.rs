//! RAGBuilder CLI - index documents and ask questions against them
//!
//! # Commands
//!
//! ```bash
//! # Show how a document would be split
//! ragbuilder chunk --tokens 100 faq.txt
//!
//! # Embed a document into a vector store
//! ragbuilder index faq.txt --out data/vectors.json
//!
//! # Ask a question; Ctrl-C cancels the run, a second Ctrl-C exits
//! ragbuilder ask "Quels sont les horaires ?" --store data/vectors.json --show-prompt
//!
//! # Inspect or edit the saved wizard settings
//! ragbuilder wizard set moteur topK 5
//!
//! # Models named claude-* generate through Anthropic
//! ragbuilder wizard set moteur llmModel claude-3-5-haiku-latest
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use ragbuilder_rag::anthropic::AnthropicClient;
use ragbuilder_rag::ollama::OllamaClient;
use ragbuilder_rag::openai::OpenAiClient;
use ragbuilder_rag::wizard::DEFAULT_WIZARD_FILE;
use ragbuilder_rag::{
    CancellationToken, ChatTranscript, Chunker, Embedder, FileVectorStore, Generator,
    HttpVectorStore, Phase, RagConfig, RagPipeline, Sender, VectorStore, WizardState, WizardStore,
};
use serde_json::Value;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const PREVIEW_CHARS: usize = 120;

#[derive(Parser)]
#[command(name = "ragbuilder")]
#[command(about = "Retrieval-augmented answers over your own documents")]
#[command(version)]
struct Cli {
    /// JSON config file; missing fields take their defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Base URL of the embedding and generation server
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Service provider
    #[arg(long, global = true, value_enum, default_value_t = Provider::Ollama)]
    provider: Provider,

    /// Wizard settings file, applied on top of the config
    #[arg(long, global = true, default_value = DEFAULT_WIZARD_FILE)]
    wizard: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Provider {
    Ollama,
    Openai,
}

#[derive(Subcommand)]
enum Commands {
    /// Split a document and show the chunks
    Chunk {
        /// Input file to chunk
        input: PathBuf,

        /// Chunk size in tokens (6 characters each)
        #[arg(long)]
        tokens: Option<usize>,

        /// Tokens shared by consecutive chunks
        #[arg(long)]
        overlap: Option<usize>,
    },

    /// Chunk, embed and save a document as a vector store
    Index {
        /// Input file to index
        input: PathBuf,

        /// Output store file (defaults to the configured store path)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Answer a question from a vector store
    Ask {
        /// The question
        question: String,

        /// Store file or http(s) URL (defaults to the configured store path)
        #[arg(short, long)]
        store: Option<String>,

        /// Number of passages to retrieve
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Print the assembled prompt
        #[arg(long)]
        show_prompt: bool,

        /// Print the whole result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Inspect or edit the saved wizard settings
    Wizard {
        #[command(subcommand)]
        action: WizardAction,
    },

    /// Read or append to a chat transcript
    Chat {
        /// Transcript file
        #[arg(long, default_value = "chat.json")]
        transcript: PathBuf,

        #[command(subcommand)]
        action: ChatAction,
    },
}

#[derive(Subcommand)]
enum WizardAction {
    /// Print every phase
    Show,
    /// Save one field of a phase; the value is parsed as JSON when possible
    Set {
        /// Wizard phase holding the field
        phase: Phase,
        /// Field name, e.g. topK or llmModel
        key: String,
        /// New value
        value: String,
    },
    /// Delete the wizard file
    Clear,
}

#[derive(Subcommand)]
enum ChatAction {
    /// Print the transcript
    Log,
    /// Append a message
    Say {
        /// Who sent the message
        #[arg(value_enum)]
        sender: SenderArg,
        /// Message text
        text: String,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SenderArg {
    User,
    Bot,
}

impl From<SenderArg> for Sender {
    fn from(sender: SenderArg) -> Self {
        match sender {
            SenderArg::User => Sender::User,
            SenderArg::Bot => Sender::Bot,
        }
    }
}

/// Config file (or defaults) with the wizard's saved settings applied.
fn resolve_config(cli: &Cli, wizard: &WizardState) -> Result<RagConfig> {
    let base = match &cli.config {
        Some(path) => RagConfig::from_json_file(path)
            .with_context(|| format!("failed to read config {}", path.display()))?,
        None => RagConfig::default(),
    };
    Ok(wizard.rag_config_overrides(base)?)
}

/// Whether `model` is served by Anthropic rather than the chosen provider.
fn is_anthropic_model(model: &str) -> bool {
    model.starts_with("claude")
}

fn services(
    cli: &Cli,
    config: &RagConfig,
    wizard: &WizardState,
) -> Result<(Arc<dyn Embedder>, Arc<dyn Generator>)> {
    let (embedder, generator): (Arc<dyn Embedder>, Arc<dyn Generator>) = match cli.provider {
        Provider::Ollama => {
            let mut client = OllamaClient::new()?;
            if let Some(url) = &cli.base_url {
                client = client.with_base_url(url);
            }
            if let Some(key) = wizard.api_key() {
                client = client.with_api_key(key);
            }
            (
                Arc::new(client.embedder(&config.embedding_model)),
                Arc::new(client.generator(&config.generation_model)),
            )
        }
        Provider::Openai => {
            let mut client = match wizard.api_key() {
                Some(key) => OpenAiClient::new(key)?,
                None => OpenAiClient::from_env()?,
            };
            if let Some(url) = &cli.base_url {
                client = client.with_base_url(url);
            }
            let mut generator = client.generator(&config.generation_model);
            if let Some(prompt) = &config.system_prompt {
                generator = generator.with_system_prompt(prompt);
            }
            if let Some(temperature) = config.temperature {
                generator = generator.with_temperature(temperature);
            }
            if let Some(max_tokens) = config.max_tokens {
                generator = generator.with_max_tokens(max_tokens);
            }
            (Arc::new(client.embedder(&config.embedding_model)), Arc::new(generator))
        }
    };

    if !is_anthropic_model(&config.generation_model) {
        return Ok((embedder, generator));
    }
    let client = match wizard.anthropic_key() {
        Some(key) => AnthropicClient::new(key)?,
        None => AnthropicClient::from_env()?,
    };
    let mut claude = client.generator(&config.generation_model);
    if let Some(prompt) = &config.system_prompt {
        claude = claude.with_system_prompt(prompt);
    }
    if let Some(temperature) = config.temperature {
        claude = claude.with_temperature(temperature);
    }
    if let Some(max_tokens) = config.max_tokens {
        claude = claude.with_max_tokens(max_tokens);
    }
    info!(model = %config.generation_model, "generating through Anthropic");
    Ok((embedder, Arc::new(claude)))
}

fn open_store(location: &str) -> Result<Arc<dyn VectorStore>> {
    if location.starts_with("http://") || location.starts_with("https://") {
        Ok(Arc::new(HttpVectorStore::new(location)?))
    } else {
        Ok(Arc::new(FileVectorStore::new(location)))
    }
}

/// Parse `raw` as JSON, falling back to a plain string.
fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn preview(text: &str) -> String {
    let mut out: String = text.chars().take(PREVIEW_CHARS).collect();
    if text.chars().count() > PREVIEW_CHARS {
        out.push_str("...");
    }
    out.replace('\n', " ")
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let wizard_store = WizardStore::new(&cli.wizard);

    match &cli.command {
        Commands::Chunk { input, tokens, overlap } => {
            let config = resolve_config(&cli, &wizard_store.load().await?)?;
            let mut builder = RagConfig::builder();
            builder = builder.chunk_tokens(tokens.unwrap_or(config.chunk_tokens));
            builder = builder.chunk_overlap_tokens(overlap.unwrap_or(config.chunk_overlap_tokens));
            let chunker = builder.build()?.chunker()?;

            let text = read_input(input)?;
            let chunks = chunker.chunk(&text);
            println!(
                "Chunked '{}' into {} chunks ({} chars per window):\n",
                input.display(),
                chunks.len(),
                chunker.window()
            );
            for (i, chunk) in chunks.iter().enumerate() {
                println!("--- Chunk {} ({} chars) ---", i + 1, chunk.chars().count());
                println!("{}\n", preview(chunk));
            }
        }

        Commands::Index { input, out } => {
            let wizard = wizard_store.load().await?;
            let config = resolve_config(&cli, &wizard)?;
            let out = out.clone().unwrap_or_else(|| PathBuf::from(&config.store_path));
            let (embedder, generator) = services(&cli, &config, &wizard)?;
            let pipeline = RagPipeline::builder()
                .config(config)
                .embedder(embedder)
                .generator(generator)
                .vector_store(Arc::new(FileVectorStore::new(&out)))
                .build()?;

            let text = read_input(input)?;
            let records = pipeline.index_to_file(&text, &out).await?;
            info!(path = %out.display(), record_count = records.len(), "store written");
            println!("Indexed {} chunks into {}", records.len(), out.display());
        }

        Commands::Ask { question, store, top_k, show_prompt, json } => {
            let wizard = wizard_store.load().await?;
            let config = resolve_config(&cli, &wizard)?;
            let location = store.clone().unwrap_or_else(|| config.store_path.clone());
            let k = top_k.unwrap_or(config.top_k);
            let (embedder, generator) = services(&cli, &config, &wizard)?;

            let token = CancellationToken::new();
            let pipeline = RagPipeline::builder()
                .config(config)
                .embedder(embedder)
                .generator(generator)
                .vector_store(open_store(&location)?)
                .with_cancellation(token.clone())
                .build()?;

            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("interrupt received, cancelling (Ctrl-C again to exit)");
                    token.cancel();
                    if tokio::signal::ctrl_c().await.is_ok() {
                        std::process::exit(130);
                    }
                }
            });

            let result = pipeline.answer_question_with(question, k).await?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&result)?);
                return Ok(());
            }
            if *show_prompt {
                println!("=== Prompt ===\n{}\n", result.prompt);
            }
            println!("{}\n", result.response);
            for passage in &result.passages {
                println!("[{}] {:.3}  {}", passage.id(), passage.score, preview(passage.text()));
            }
        }

        Commands::Wizard { action } => match action {
            WizardAction::Show => {
                let state = wizard_store.load().await?;
                println!("{}", serde_json::to_string_pretty(&state)?);
                if let Some(name) = state.collection_name() {
                    println!("\nCollection: {name}");
                }
            }
            WizardAction::Set { phase, key, value } => {
                let mut patch = serde_json::Map::new();
                patch.insert(key.clone(), parse_value(value));
                let state = wizard_store.update_phase(*phase, patch).await?;
                println!("{}", serde_json::to_string_pretty(state.phase(*phase))?);
            }
            WizardAction::Clear => {
                wizard_store.clear().await?;
                println!("Cleared {}", wizard_store.path().display());
            }
        },

        Commands::Chat { transcript, action } => {
            let mut log = ChatTranscript::open(transcript).await?;
            match action {
                ChatAction::Log => {
                    for message in log.entries() {
                        let who = match message.sender {
                            Sender::User => "user",
                            Sender::Bot => "bot",
                        };
                        println!("{who:>4}: {}", message.text);
                    }
                }
                ChatAction::Say { sender, text } => {
                    log.append((*sender).into(), text.clone()).await?;
                    println!("{} messages in {}", log.entries().len(), log.path().display());
                }
            }
        }
    }

    Ok(())
}

fn read_input(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}
