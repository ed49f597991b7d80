//! estate-rag command line.
//!
//! ```bash
//! # Extract metadata and a summary from one estate document
//! estate-rag analyze lease.pdf
//!
//! # Page-level comparison of two documents, keeping the 3 newest sessions
//! estate-rag compare reference.pdf actual.pdf --keep 3 --format csv
//!
//! # Prune stored comparison sessions
//! estate-rag clean --keep 5
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};

use estate_rag::config::{self, AppConfig, ModelConfig};
use estate_rag::credentials::ApiKeyManager;
use estate_rag::logging;
use estate_rag::pipeline::analysis::DocumentAnalyzer;
use estate_rag::pipeline::comparison::{ComparisonOptions, ComparisonPipeline};
use estate_rag::pipeline::ingestion::{PathUpload, SessionStore, UploadedFile};
use estate_rag::pipeline::llm::EmbeddingClient;
use estate_rag::pipeline::model_router::ModelGateway;
use estate_rag::{ErrorKind, EstateError};

#[derive(Parser, Debug)]
#[command(name = "estate-rag")]
#[command(version, about = "Analyze and compare estate documents with an LLM", long_about = None)]
struct Cli {
    /// Model configuration file (default: CONFIG_PATH, then config/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Session storage root (default: ESTATE_DATA_STORAGE_PATH, then ./estate_data/...)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Directory for JSON log files
    #[arg(long, global = true, default_value = "logs")]
    log_dir: PathBuf,

    /// Console logging only
    #[arg(long, global = true)]
    no_log_file: bool,

    /// Provider key from the `llm` section of the config (default: LLM_PROVIDER, then google)
    #[arg(long, global = true)]
    provider: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract structured metadata from a PDF
    Analyze {
        pdf: PathBuf,

        /// Reuse or name the storage session
        #[arg(long)]
        session_id: Option<String>,
    },

    /// Report page-level differences between two PDFs
    Compare {
        reference: PathBuf,
        actual: PathBuf,

        /// Comparison sessions to keep after the run
        #[arg(long, default_value_t = 3)]
        keep: usize,

        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,

        /// Require a record for every page
        #[arg(long)]
        enforce_page_coverage: bool,
    },

    /// Delete all but the newest comparison sessions
    Clean {
        #[arg(long, default_value_t = 3)]
        keep: usize,
    },

    /// Embed a query with the configured embedding model
    Embed { text: String },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Table,
    Csv,
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let (environment, dotenv_loaded) = config::load_dotenv();
    let app = AppConfig::from_env();

    let log_dir = (!cli.no_log_file).then_some(cli.log_dir.as_path());
    let _guard = match logging::init(log_dir) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(2);
        }
    };
    tracing::info!(environment = ?environment, dotenv_loaded, "Configuration captured");

    match run(cli, &app) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let kind = err.downcast_ref::<EstateError>().map(EstateError::kind);
            tracing::error!(error = %format!("{err:#}"), kind = ?kind, "Command failed");
            eprintln!("error: {err:#}");
            match kind {
                Some(ErrorKind::Configuration) => ExitCode::from(2),
                Some(ErrorKind::Input) => ExitCode::from(3),
                Some(ErrorKind::Transient) => ExitCode::from(4),
                None => ExitCode::FAILURE,
            }
        }
    }
}

fn run(cli: Cli, app: &AppConfig) -> anyhow::Result<()> {
    match cli.command {
        Command::Analyze { ref pdf, ref session_id } => {
            let gateway = gateway(&cli, app)?;
            let model = gateway
                .load_model(cli.provider.as_deref())
                .map_err(EstateError::from)?;

            let store = SessionStore::new(data_dir(&cli, app.analysis_data_dir()));
            let session = store
                .create_session(session_id.as_deref())
                .map_err(EstateError::from)?;
            let saved = store
                .save_file(&session, &PathUpload::new(pdf))
                .map_err(EstateError::from)?;

            let metadata = DocumentAnalyzer::new(Box::new(model))
                .analyze_file(&saved)
                .map_err(EstateError::from)?;
            println!(
                "{}",
                serde_json::to_string_pretty(&metadata).context("serializing metadata")?
            );
        }

        Command::Compare {
            ref reference,
            ref actual,
            keep,
            format,
            enforce_page_coverage,
        } => {
            let gateway = gateway(&cli, app)?;
            let model = gateway
                .load_model(cli.provider.as_deref())
                .map_err(EstateError::from)?;

            let store = SessionStore::new(data_dir(&cli, app.comparison_data_dir()));
            let session = store.create_session(None).map_err(EstateError::from)?;
            let (reference, actual) = (PathUpload::new(reference), PathUpload::new(actual));
            // Same file name in two directories: keep both documents apart.
            let uploads = if reference.name().eq_ignore_ascii_case(actual.name()) {
                let reference_name = format!("reference_{}", reference.name());
                let actual_name = format!("actual_{}", actual.name());
                [reference.with_name(reference_name), actual.with_name(actual_name)]
            } else {
                [reference, actual]
            };
            let refs: Vec<&dyn UploadedFile> = uploads.iter().map(|u| u as &dyn UploadedFile).collect();
            store.save_files(&session, &refs).map_err(EstateError::from)?;

            let result = ComparisonPipeline::new(Box::new(model))
                .with_options(ComparisonOptions { enforce_page_coverage })
                .compare(session.path())
                .map_err(EstateError::from)?;

            store.clean_old_sessions(keep).map_err(EstateError::from)?;

            match format {
                OutputFormat::Table => print!("{result}"),
                OutputFormat::Csv => print!("{}", result.to_csv().context("writing CSV")?),
                OutputFormat::Json => println!("{}", result.to_json().context("writing JSON")?),
            }
        }

        Command::Clean { keep } => {
            let store = SessionStore::new(data_dir(&cli, app.comparison_data_dir()));
            let removed = store.clean_old_sessions(keep).map_err(EstateError::from)?;
            for path in &removed {
                println!("removed {}", path.display());
            }
        }

        Command::Embed { ref text } => {
            let embeddings = gateway(&cli, app)?
                .load_embeddings()
                .map_err(EstateError::from)?;
            let vector = embeddings.embed_query(text).map_err(EstateError::from)?;
            println!("{} dimensions from {}", vector.len(), embeddings.model_name());
        }
    }
    Ok(())
}

/// Credentials first, so missing keys fail before the config is read.
fn gateway(cli: &Cli, app: &AppConfig) -> Result<ModelGateway, EstateError> {
    let keys = ApiKeyManager::from_env()?;
    let config = ModelConfig::load(cli.config.as_deref(), app)
        .map_err(|e| EstateError::Initialization(format!("model gateway: {e}")))?;
    Ok(ModelGateway::new(config, app, keys))
}

fn data_dir(cli: &Cli, fallback: PathBuf) -> PathBuf {
    cli.data_dir.clone().unwrap_or(fallback)
}
