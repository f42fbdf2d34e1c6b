use anyhow::{bail, Context, Result};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use x_search_export::env_loader::{self, EnvFile};
use x_search_export::{collect, config::Config, validate_csv, write_csv, Credentials, XClient};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env before the subscriber so RUST_LOG can come from it.
    let env_file = env_loader::load_env();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("x_search_export=info")),
        )
        .init();

    match &env_file {
        EnvFile::Loaded(path) => info!(path = %path.display(), "Loaded environment file"),
        EnvFile::NotFound => info!("No .env file found"),
        EnvFile::Failed { path, error } => {
            warn!(path = %path.display(), %error, "Could not load environment file")
        }
    }

    let cwd = std::env::current_dir().context("Cannot determine working directory")?;
    let (config, config_path) = Config::discover(&cwd)?;
    match &config_path {
        Some(path) => info!(path = %path.display(), "Loaded config overrides"),
        None => info!("Using built-in config"),
    }

    let provider = XClient::new().with_search_tab(config.search_tab);
    let creds = Credentials::from_env();

    let collected = collect(&provider, &config, &creds, env_file.path()).await?;
    if collected.rows.is_empty() {
        bail!("No tweets collected. Most likely no active accounts or the query returned nothing.");
    }

    let csv_path = write_csv(&collected.rows, &config.out_dir, &config)?;
    validate_csv(&csv_path, &config)?;

    let resolved = csv_path.canonicalize().unwrap_or(csv_path);
    println!(
        "✅ CSV OK — {} rows written to: {}",
        collected.rows.len(),
        resolved.display()
    );
    Ok(())
}
