use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use weather_etl::models::parse_date;
use weather_etl::{
    EtlConfig, EtlError, NasaPowerClient, NominatimGeocoder, Pipeline, RunOutcome, S3Storage,
    logging,
};

#[derive(Parser)]
#[command(version, about, long_about = None)]
/// Fetch daily weather for named places, save it as CSV and upload it to object storage
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug level logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline once
    Run {
        /// Location name; repeat for several locations
        #[arg(short, long = "location", required = true)]
        locations: Vec<String>,
        /// First day, YYYY-MM-DD or YYYYMMDD
        #[arg(long)]
        start: String,
        /// Last day (inclusive), YYYY-MM-DD or YYYYMMDD
        #[arg(long)]
        end: String,
        /// Override the configured data directory
        #[arg(long)]
        data_dir: Option<PathBuf>,
        /// Keep the file local and skip the upload
        #[arg(long)]
        no_upload: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match execute(cli).await {
        Ok(outcome) => match outcome {
            RunOutcome::Done => ExitCode::SUCCESS,
            RunOutcome::Failed => ExitCode::from(1),
            RunOutcome::PartialSuccess => ExitCode::from(3),
        },
        Err(e) => {
            match e.downcast_ref::<EtlError>() {
                Some(etl) => eprintln!("Error: {e:#}\n{}", etl.user_message()),
                None => eprintln!("Error: {e:#}"),
            }
            ExitCode::from(2)
        }
    }
}

async fn execute(cli: Cli) -> Result<RunOutcome> {
    let mut config = EtlConfig::load_from_path(cli.config.clone())?;

    match cli.command {
        Commands::Run {
            locations,
            start,
            end,
            data_dir,
            no_upload,
        } => {
            // Dates are checked before logging or clients are set up.
            let start = parse_date(&start)?;
            let end = parse_date(&end)?;

            if let Some(dir) = data_dir {
                config.output.data_dir = dir;
            }
            if no_upload {
                config.storage.enabled = false;
            }

            logging::init(&config.logging, cli.verbose)?;

            let geocoder = NominatimGeocoder::new(&config.geocoding)?;
            let weather = NasaPowerClient::new(&config.weather)?;
            let storage = S3Storage::new(config.storage.clone());
            let pipeline = Pipeline::new(config, geocoder, weather, storage);

            let report = pipeline
                .run(&locations, start, end)
                .await
                .context("Run rejected")?;
            println!("{report}");
            Ok(report.outcome)
        }
    }
}
