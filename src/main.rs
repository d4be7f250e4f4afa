use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use labrun::config::{config_file_path, Config};
use labrun::executor::Orchestrator;
use labrun::interrupt::watch_interrupts;
use labrun::log::{init_logger, TracingBus};
use labrun::session::HttpSessionClient;
use labrun::state::timeline::{format_timestamp, humanize};
use labrun::Error;

#[derive(Parser)]
#[command(name = "labrun", version, about = "Run timed remote experiment sessions in sequence")]
struct Cli {
    /// Configuration file [default: $LABRUN_ROOT/config.json]
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Log filter used when RUST_LOG is unset
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the numbered experiment menu
    List,
    /// Run the selected experiments one after another
    Run {
        /// `all` or comma separated menu numbers, e.g. `1,4,5`
        #[arg(long)]
        select: String,
        /// Seed for the duration jitter
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logger(&cli.log_level);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

async fn run(cli: Cli) -> Result<(), u8> {
    let path = cli.config.unwrap_or_else(config_file_path);
    let config = Config::load(&path).map_err(|e| {
        error!("{}", e);
        e.exit_code()
    })?;

    match cli.command {
        Commands::List => {
            let mut current = None;
            for (index, category, experiment) in config.catalog.entries() {
                if current != Some(&category.category) {
                    println!("\n{}", category.category);
                    current = Some(&category.category);
                }
                println!(
                    "  {:>3}. {} ({} active, {} rest)",
                    index,
                    experiment.name,
                    humanize(experiment.total_time),
                    humanize(experiment.sleep_time)
                );
            }
            Ok(())
        }
        Commands::Run { select, seed } => {
            let selection = config.catalog.select(&select).map_err(|e| {
                error!("{}", e);
                e.exit_code()
            })?;
            let mut rng = match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            let plan = labrun::plan::plan(&selection, &mut rng);

            let client = HttpSessionClient::new(&config).map_err(|e| {
                error!("{}", e);
                e.exit_code()
            })?;
            let cancel = CancellationToken::new();
            let orchestrator = Orchestrator::new(client, TracingBus).with_cancellation(cancel.clone());

            tokio::spawn(async move {
                match watch_interrupts(cancel, tokio::signal::ctrl_c).await {
                    Ok(()) => std::process::exit(i32::from(Error::Cancelled.exit_code())),
                    Err(e) => warn!("cannot listen for interrupts: {}", e),
                }
            });

            match orchestrator.execute_plan(&plan).await {
                Ok(report) => {
                    info!(
                        "all {} experiments finished at {}",
                        report.completed.len(),
                        format_timestamp(&report.finished_at)
                    );
                    Ok(())
                }
                Err(aborted) => {
                    error!("{}", aborted);
                    Err(aborted.exit_code())
                }
            }
        }
    }
}
