use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use consult_common::{logger, AppConfig};
use consult_vector::{RetrievalService, SearchParams, DEFAULT_SEARCH_LIMIT, DEFAULT_THRESHOLD};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Find project root by looking for .git directory
fn find_project_root() -> Option<PathBuf> {
    let mut current_dir = std::env::current_dir().ok()?;

    loop {
        if current_dir.join(".git").exists() {
            return Some(current_dir);
        }

        if !current_dir.pop() {
            break;
        }
    }

    None
}

/// Load .env file from project root
fn load_dotenv_from_project_root() {
    if let Some(root) = find_project_root() {
        let env_path = root.join(".env");
        if env_path.exists() {
            dotenv::from_path(&env_path).ok();
        }
    } else {
        dotenv::dotenv().ok();
    }
}

#[derive(Parser)]
#[command(name = "consult-search")]
#[command(about = "Consultation records with semantic (embedding) search", long_about = None)]
struct Cli {
    /// Store file path (overrides STORE_PATH)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Skip the embedding model and use zero vectors
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(long)]
        port: Option<u16>,

        /// Database path
        #[arg(long)]
        db_path: Option<PathBuf>,
    },

    /// Import one consultation per non-empty line of a text file
    Import {
        file: PathBuf,

        /// Texts per embedding request
        #[arg(long)]
        batch_size: Option<usize>,
    },

    /// Run a similarity search and print the matches
    Search {
        query: String,

        #[arg(long, default_value_t = DEFAULT_THRESHOLD)]
        threshold: f32,

        #[arg(long, default_value_t = DEFAULT_SEARCH_LIMIT)]
        limit: usize,

        #[arg(long, default_value_t = 0)]
        skip: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    load_dotenv_from_project_root();

    let mut config = AppConfig::from_env();
    if let Some(store) = cli.store {
        config.store_path = store;
    }
    if cli.offline {
        config.offline_embeddings = true;
    }

    match cli.command {
        Some(Commands::Serve { host, port, db_path }) => {
            if let Some(host) = host {
                config.server_host = host;
            }
            if let Some(port) = port {
                config.server_port = port;
            }
            if let Some(db) = db_path {
                config.store_path = db.join("consultations.json");
                config.db_base_path = db;
            }
            serve(config).await?;
        }
        None => serve(config).await?,
        Some(Commands::Import { file, batch_size }) => {
            if let Some(batch_size) = batch_size {
                config.embedding_batch_size = batch_size;
            }
            init_cli_logging(&config)?;
            import(&config, &file).await?;
        }
        Some(Commands::Search { query, threshold, limit, skip }) => {
            init_cli_logging(&config)?;
            search(&config, &query, SearchParams::new(threshold, skip, limit)).await?;
        }
    }

    Ok(())
}

fn init_cli_logging(config: &AppConfig) -> Result<()> {
    config.validate()?;
    logger::setup_console_logging(&config.log_level)?;
    Ok(())
}

async fn serve(config: AppConfig) -> Result<()> {
    config.validate()?;
    config.ensure_directories()?;
    logger::setup_logging(&config.log_dir, &config.log_level)?;

    tracing::info!("Consultation search starting...");
    tracing::info!("  Bind: {}", config.server_bind_address());
    tracing::info!("  Store: {}", config.store_path.display());
    tracing::info!(
        "  Embedding: {} (dimension {}){}",
        config.embedding_model,
        config.embedding_dimension,
        if config.offline_embeddings { " [offline]" } else { "" }
    );

    let service = Arc::new(RetrievalService::from_config(&config).await?);

    println!("Server listening on http://{}", config.server_bind_address());
    consult_server::start_server(config, service).await?;

    Ok(())
}

async fn import(config: &AppConfig, file: &Path) -> Result<()> {
    let content = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let texts: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();

    if texts.is_empty() {
        println!("Nothing to import from {}", file.display());
        return Ok(());
    }

    let service = RetrievalService::from_config(config).await?;
    let records = service.create_many(&texts).await?;

    println!(
        "Imported {} consultations into {}",
        records.len(),
        config.store_path.display()
    );
    Ok(())
}

async fn search(config: &AppConfig, query: &str, params: SearchParams) -> Result<()> {
    let service = RetrievalService::from_config(config).await?;
    let outcome = service.search(query, params).await?;

    for m in &outcome.matches {
        println!("{:>6}  {:.4}  {}", m.record.id, m.similarity, m.record.text);
    }
    println!(
        "-- {} shown, {} total (page {}/{})",
        outcome.matches.len(),
        outcome.total,
        outcome.page.page,
        outcome.page.total_pages
    );

    Ok(())
}
