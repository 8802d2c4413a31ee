//! # Image Batch - Main Entry Point
//!
//! Questo è il punto di ingresso principale dell'applicazione.
//!
//! ## Responsabilità:
//! - Parsing degli argomenti della command line con `clap`
//! - Inizializzazione del sistema di logging con `tracing`
//! - Costruzione della configurazione (file JSON + override da CLI)
//! - Avvio del runtime tokio e del BatchProcessor
//!
//! ## Flusso di esecuzione:
//! 1. Parsa gli argomenti CLI (directory, operazione, workers, etc.)
//! 2. Configura il logging (INFO o DEBUG, su stderr in modalità JSON)
//! 3. Carica l'eventuale file di configurazione e applica gli override
//! 4. Valida la configurazione: un errore qui termina con exit code non zero
//! 5. Esegue la run e chiude il runtime senza attendere I/O abbandonato
//!
//! ## Esempio di utilizzo:
//! ```bash
//! image-batch /path/to/photos --recursive --scale 0.5 --workers 8
//! image-batch /path/to/photos --copy-to /backup --json
//! ```

use anyhow::{anyhow, Result};
use clap::{ArgGroup, Parser};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use image_batch::json_output::JsonMessage;
use image_batch::{BatchProcessor, Config, Operation};

/// Grace period for blocking work still running when the run returns
const RUNTIME_SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

#[derive(Parser)]
#[command(name = "image-batch")]
#[command(about = "Resize, invert, delete or copy every image in a directory tree")]
#[command(group(ArgGroup::new("operation").multiple(false)))]
struct Args {
    /// Directory containing the images to process
    #[arg(required_unless_present = "config")]
    source_directory: Option<PathBuf>,

    /// Also process images in subdirectories
    #[arg(long, visible_alias = "sub")]
    recursive: bool,

    /// Resize every image by this factor (e.g. 0.5 halves each side)
    #[arg(short, long, group = "operation")]
    scale: Option<f64>,

    /// Invert the colors of every image
    #[arg(short = 'n', long, group = "operation")]
    invert: bool,

    /// Delete every image
    #[arg(short, long, visible_alias = "delete", group = "operation")]
    remove: bool,

    /// Copy every image into this directory (created if missing)
    #[arg(short, long, group = "operation")]
    copy_to: Option<PathBuf>,

    /// Number of parallel workers (default: hardware threads)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Seconds to wait for submitted work before aborting it
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Do not follow symbolic links while walking
    #[arg(long)]
    no_follow_links: bool,

    /// Dry run - log what would happen without touching files
    #[arg(long)]
    dry_run: bool,

    /// Output progress and results as JSON lines on stdout
    #[arg(long)]
    json: bool,

    /// Do not listen for Esc or Ctrl-C
    #[arg(long)]
    no_abort_listener: bool,

    /// Load settings from a JSON config file (command line values win)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the effective configuration to this file
    #[arg(long)]
    save_config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    /// The operation picked on the command line, if any
    fn operation(&self) -> Option<Operation> {
        if let Some(factor) = self.scale {
            Some(Operation::Resize { factor })
        } else if self.invert {
            Some(Operation::Invert)
        } else if self.remove {
            Some(Operation::Delete)
        } else {
            self.copy_to
                .as_ref()
                .map(|target_dir| Operation::CopyTo { target_dir: target_dir.clone() })
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose, args.json)?;

    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    let result = runtime.block_on(run(args));
    runtime.shutdown_timeout(RUNTIME_SHUTDOWN_GRACE);

    result
}

/// Initialize logging; JSON mode keeps stdout for JSON lines only
fn init_logging(verbose: bool, json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));

    if json {
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = tracing_subscriber::fmt().with_env_filter(filter).finish();
        tracing::subscriber::set_global_default(subscriber)?;
    }

    Ok(())
}

async fn run(args: Args) -> Result<()> {
    let json = args.json;

    let processor = match build_config(&args).await.and_then(BatchProcessor::new) {
        Ok(processor) => processor,
        Err(e) => {
            if json {
                JsonMessage::error(e.to_string()).emit();
            }
            return Err(e);
        }
    };

    if let Some(ref path) = args.save_config {
        processor.config().save_to_file(path).await?;
        info!("Configuration saved to: {}", path.display());
    }

    let report = processor.run().await?;
    if !json {
        info!("Run {} in {:.2}s", report.status, report.duration.as_secs_f64());
    }

    Ok(())
}

/// Merge the optional config file with the command line
async fn build_config(args: &Args) -> Result<Config> {
    let mut config = match args.config {
        Some(ref path) => Config::from_file(path).await?,
        None => {
            let source = args
                .source_directory
                .clone()
                .ok_or_else(|| anyhow!("A source directory is required"))?;
            let operation = args.operation().ok_or_else(no_operation)?;
            Config::new(source, operation)
        }
    };

    if let Some(ref source) = args.source_directory {
        config.source_dir = source.clone();
    }
    if let Some(operation) = args.operation() {
        config.operation = operation;
    }
    if let Some(workers) = args.workers {
        config.workers = workers;
    }
    if let Some(timeout_secs) = args.timeout_secs {
        config.drain_timeout_secs = timeout_secs;
    }

    config.recursive |= args.recursive;
    config.dry_run |= args.dry_run;
    config.json_output |= args.json;
    if args.no_follow_links {
        config.follow_links = false;
    }
    if args.no_abort_listener {
        config.listen_for_abort = false;
    }

    Ok(config)
}

fn no_operation() -> anyhow::Error {
    anyhow!("Choose one operation: --scale <FACTOR>, --invert, --remove or --copy-to <DIR>")
}
