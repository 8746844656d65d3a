use anyhow::{bail, Context};
use clap::Parser;
use newsalpha::{ArchiveImporter, ImportConfig, PgArticleStore};
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

const LOGO: &str = r#"
 _   _                     _    _       _
| \ | | _____      _____  / \  | |_ __ | |__   __ _
|  \| |/ _ \ \ /\ / / __|/ _ \ | | '_ \| '_ \ / _` |
| |\  |  __/\ V  V /\__ / ___ \| | |_) | | | | (_| |
|_| \_|\___| \_/\_/ |___/_/  \_\_| .__/|_| |_|\__,_|
                                 |_|
"#;

#[derive(Parser, Debug)]
#[command(name = "newsalpha", version, about = "NewsAlpha bulk article importer")]
struct Cli {
    /// Enable debug-level logging.
    #[arg(long)]
    debug: bool,

    /// Server host where the NewsAlpha PostgreSQL database is located.
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// PostgreSQL server database port.
    #[arg(long, default_value_t = 5432)]
    port: u16,

    /// Set the data import directory if needed.
    #[arg(long)]
    data: Option<PathBuf>,

    /// Target article language for acceptance.
    #[arg(long, default_value = "en")]
    lang: String,

    /// Additional arguments comma-delimited as key=value, e.g. --args 'ppm=4,fps=1'.
    #[arg(long)]
    args: Option<String>,

    /// Import article data from the data folder into the database.
    #[arg(long)]
    import_articles: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt().with_max_level(level).init();
    if cli.debug {
        info!("Debug mode enabled.");
    }

    println!("{}v{}\n", LOGO, env!("CARGO_PKG_VERSION"));

    let custom_args = parse_custom_args(cli.args.as_deref())?;
    if !custom_args.is_empty() {
        debug!("Custom arguments are {:?}.", custom_args);
    }

    let password = env::var("NA_PASSWORD").unwrap_or_else(|_| "newsalpha".to_string());
    let database_url = format!(
        "postgres://newsalpha:{}@{}:{}/newsalpha",
        password, cli.host, cli.port
    );
    info!(
        "Connecting to database: postgres://newsalpha:***@{}:{}/newsalpha",
        cli.host, cli.port
    );

    let config = ImportConfig {
        data_dir: cli.data.clone().unwrap_or_default(),
        target_lang: cli.lang.clone(),
        ..ImportConfig::default()
    };

    let store = PgArticleStore::connect(&database_url, &config)
        .await
        .map_err(|e| {
            error!(
                "Could not connect to PGSQL database at {}:{} with user newsalpha.",
                cli.host, cli.port
            );
            e
        })
        .context("database connection failed")?;
    info!(
        "Connection to PGSQL database at {}:{} with user newsalpha OK.",
        cli.host, cli.port
    );

    if !cli.import_articles {
        info!("Nothing to do. Pass --import-articles to run an import.");
        return Ok(());
    }

    if cli.data.is_none() {
        bail!("The import data directory is not specified.");
    }

    let stop = CancellationToken::new();
    let listener = newsalpha::spawn_stop_listener(stop.clone());
    info!("Press ENTER to stop article import.");

    let importer = ArchiveImporter::new(store, config, stop);
    let stats = importer.run().await.context("article import failed")?;
    listener.abort();

    println!("\nImport {}", if stats.stopped { "stopped" } else { "complete" });
    println!("================");
    println!("Files found:      {}", stats.files_found);
    println!("Files completed:  {}", stats.files_completed);
    println!("Files failed:     {}", stats.files_failed);
    println!("Articles stored:  {}", stats.articles_stored);
    println!("Records skipped:  {}", stats.records_skipped);
    println!("Elapsed time:     {:.1}s", stats.elapsed_seconds());

    Ok(())
}

fn parse_custom_args(raw: Option<&str>) -> anyhow::Result<HashMap<String, String>> {
    let mut custom_args = HashMap::new();
    let Some(raw) = raw else {
        return Ok(custom_args);
    };
    for pair in raw.split(',') {
        match pair.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                custom_args.insert(key.trim().to_string(), value.trim().to_string());
            }
            _ => bail!("The argument {:?} is malformed.", pair),
        }
    }
    Ok(custom_args)
}
