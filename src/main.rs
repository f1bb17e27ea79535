use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use log::{error, info, warn};

use sales_validation::{export, pipeline, Market, MxMode, Result, RunConfig};

#[derive(Parser, Debug)]
#[command(name = "sales-validation", about = "Validación de ventas LATAM / MX")]
struct Cli {
    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct Overrides {
    /// Folder holding Part1..Part4 (env: SALES_INPUT_DIR)
    #[arg(long, global = true)]
    input: Option<PathBuf>,

    /// Folder for the workbooks (env: SALES_OUTPUT_DIR)
    #[arg(long, global = true)]
    output: Option<PathBuf>,

    /// Records per chunk (env: SALES_CHUNK_SIZE)
    #[arg(long, global = true)]
    chunk_size: Option<usize>,

    /// Customer id of the MX segment (env: SALES_SEGMENT_CUSTOMER)
    #[arg(long, global = true)]
    segment_customer: Option<i64>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Daily volume / revenue / transactions report for one market
    Latam {
        /// Market to process: ARG, PE, MX, EC, HTC
        #[arg(long)]
        market: String,
    },
    /// MX report with the segment customer breakdown
    Mx {
        /// Process Part1 to Part4 (default)
        #[arg(long, conflicts_with = "precierre")]
        completo: bool,

        /// Process only Part1 to Part3
        #[arg(long)]
        precierre: bool,
    },
}

impl Overrides {
    fn apply(self, mut config: RunConfig) -> RunConfig {
        if let Some(input) = self.input {
            config.input_dir = input;
        }
        if let Some(output) = self.output {
            config.output_dir = output;
        }
        if let Some(chunk_size) = self.chunk_size {
            config.chunk_size = chunk_size;
        }
        if let Some(customer) = self.segment_customer {
            config.segment_customer = customer;
        }
        config
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = cli.overrides.apply(RunConfig::from_env());
    info!(
        "Input: {} | Output: {} | chunk size: {}",
        config.input_dir.display(),
        config.output_dir.display(),
        config.effective_chunk_size()
    );

    match cli.command {
        Command::Latam { market } => {
            let market: Market = market.parse()?;
            match pipeline::build_market_report(&config, market)? {
                Some(report) => {
                    export::export_market_report(&report, &config.output_dir)?;
                }
                None => warn!("❌ No data was processed for {market}."),
            }
        }
        Command::Mx {
            completo,
            precierre,
        } => {
            let mode = if precierre && !completo {
                MxMode::Precierre
            } else {
                MxMode::Completo
            };
            match pipeline::build_mx_report(&config, mode)? {
                Some(report) => {
                    export::export_mx_report(&report, &config.output_dir)?;
                }
                None => warn!("❌ No data was processed for MX {}.", mode.as_str()),
            }
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("❌ {e}");
            ExitCode::FAILURE
        }
    }
}
