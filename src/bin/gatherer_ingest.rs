use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing::info;
use tracing_subscriber::EnvFilter;

use gatherer_ingest::app::{App, RunSummary};
use gatherer_ingest::config::ConfigLoader;
use gatherer_ingest::domain::{MultiverseId, parse_id_list};
use gatherer_ingest::error::IngestError;
use gatherer_ingest::fetch::HttpRecordFetcher;
use gatherer_ingest::output::JsonOutput;
use gatherer_ingest::store::JsonCardStore;

#[derive(Parser)]
#[command(name = "gatherer-ingest")]
#[command(about = "Bulk-load Magic: The Gathering card data from Gatherer")]
#[command(version, author)]
struct Cli {
    /// JSON config file (defaults to ./gatherer-ingest.json when present)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Directory holding the card store
    #[arg(long, global = true)]
    store_dir: Option<Utf8PathBuf>,

    /// Skip the overwrite confirmation
    #[arg(long, short = 'y', global = true)]
    yes: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    #[command(about = "Re-ingest every card already in the store")]
    Update,
    #[command(about = "Ingest a comma-separated list of multiverse ids")]
    UpdateIds { ids: String },
    #[command(about = "Ingest a single multiverse id")]
    UpdateId { id: MultiverseId },
    #[command(about = "Ingest every multiverse id not yet in the store")]
    Populate,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<IngestError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &IngestError) -> u8 {
    match error {
        IngestError::InvalidIdentifier(_)
        | IngestError::ConfigRead(_)
        | IngestError::ConfigParse(_)
        | IngestError::ConfigInvalid(_) => 2,
        IngestError::FetchHttp(_)
        | IngestError::FetchStatus { .. }
        | IngestError::RetriesExhausted { .. } => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = ConfigLoader::resolve(cli.config.as_deref())?;
    if let Some(dir) = cli.store_dir {
        config.store_dir = Some(dir);
    }

    let root = match config.store_dir.clone() {
        Some(root) => root,
        None => JsonCardStore::default_root()?,
    };
    let store = JsonCardStore::new(root);
    store.ensure_root()?;
    info!(store = %store.root(), "using card store");

    let fetcher = HttpRecordFetcher::new(config.retry, config.request_timeout)?;
    let app = App::new(fetcher, store, config);
    let progress = JsonOutput;

    let summary = match cli.command {
        Command::Update => {
            if !confirm(cli.yes, "This will overwrite every card in the store.")? {
                return Ok(());
            }
            app.update_known(&progress)?
        }
        Command::UpdateIds { ids } => {
            let ids = parse_id_list(&ids)?;
            if !confirm(cli.yes, &format!("This will overwrite {} card(s).", ids.len()))? {
                return Ok(());
            }
            app.update_ids(&ids, &progress)?
        }
        Command::UpdateId { id } => {
            if !confirm(cli.yes, &format!("This will overwrite card {id}."))? {
                return Ok(());
            }
            app.update_one(id, &progress)?
        }
        Command::Populate => app.populate(&progress)?,
    };

    report(&summary)
}

fn confirm(assume_yes: bool, warning: &str) -> miette::Result<bool> {
    if assume_yes {
        return Ok(true);
    }
    let mut stdout = io::stdout();
    write!(stdout, "{warning} Continue? [y/N] ").into_diagnostic()?;
    stdout.flush().into_diagnostic()?;

    let mut answer = String::new();
    io::stdin()
        .lock()
        .read_line(&mut answer)
        .into_diagnostic()?;
    let confirmed = matches!(answer.trim().to_lowercase().as_str(), "y" | "yes");
    if !confirmed {
        info!("aborted by user");
    }
    Ok(confirmed)
}

fn report(summary: &RunSummary) -> miette::Result<()> {
    info!(
        written = summary.written,
        elapsed_ms = summary.elapsed_ms,
        "run complete"
    );
    JsonOutput::print_summary(summary).into_diagnostic()
}
