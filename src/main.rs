use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use powerfetch::ml_service::Evaluator;
use powerfetch::presenter::{EvaluationView, RunSummary};
use powerfetch::selector::MAX_LOCATIONS;
use powerfetch::{
    DatasetStore, FetchOrchestrator, FileDownloadSink, FileId, Location, LocationSelector,
    MlServiceClient, PowerClient, PowerFetchConfig, PowerFetchError, PowerProxySource,
    QueryParameters, VERSION, ValidationError, telemetry, web,
};
use tracing::debug;

#[derive(Parser, Debug)]
#[command(
    name = "powerfetch",
    version,
    about = "Fetch NASA POWER data for four locations, preprocess it and evaluate the model"
)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch, preprocess and download data for exactly four locations
    Fetch(FetchArgs),
    /// Show evaluation metrics for a dataset
    Evaluate(EvaluateArgs),
    /// Run the HTTP API
    Serve(ServeArgs),
}

#[derive(Args, Debug)]
struct FetchArgs {
    /// Location as LAT,LON; give it four times, order matters
    #[arg(short, long = "location", value_parser = parse_location, required = true)]
    locations: Vec<Location>,

    /// First day (YYYY-MM-DD)
    #[arg(long)]
    start: Option<NaiveDate>,

    /// Last day (YYYY-MM-DD)
    #[arg(long)]
    end: Option<NaiveDate>,

    #[arg(long)]
    community: Option<String>,

    /// Comma separated POWER parameter names
    #[arg(long)]
    parameters: Option<String>,

    #[arg(long)]
    format: Option<String>,

    #[arg(long)]
    theme: Option<String>,

    #[arg(long)]
    user: Option<String>,

    #[arg(long)]
    time_standard: Option<String>,

    /// Where cleaned files are written
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Evaluate the first location's dataset once the run finishes
    #[arg(long)]
    evaluate: bool,
}

#[derive(Args, Debug)]
struct EvaluateArgs {
    /// Server-side path of the file to evaluate
    #[arg(long, conflicts_with = "file_id", required_unless_present = "file_id")]
    filepath: Option<String>,

    /// Coordinate identifier, e.g. 19.6565_73.1556
    #[arg(long)]
    file_id: Option<String>,
}

#[derive(Args, Debug)]
struct ServeArgs {
    #[arg(short, long)]
    port: Option<u16>,
}

fn parse_location(value: &str) -> std::result::Result<Location, String> {
    let (lat, lon) = value
        .split_once(',')
        .ok_or_else(|| format!("expected LAT,LON, got '{value}'"))?;
    let parse = |part: &str| {
        part.trim()
            .parse::<f64>()
            .map_err(|e| format!("invalid coordinate '{part}': {e}"))
    };
    let location = Location::new(parse(lat)?, parse(lon)?);
    location.validate().map_err(|e| e.to_string())?;
    Ok(location)
}

#[tokio::main]
async fn main() -> ExitCode {
    match run(Cli::parse()).await {
        Ok(code) => code,
        Err(err) => {
            report_error(&err);
            ExitCode::FAILURE
        }
    }
}

fn report_error(err: &anyhow::Error) {
    match err.downcast_ref::<PowerFetchError>() {
        Some(app_err) => eprintln!("❌ {}", app_err.user_message()),
        None => eprintln!("❌ {err:#}"),
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let mut config = PowerFetchConfig::load_from_path(cli.config.clone())?;
    let _telemetry = telemetry::init(&config.logging, cli.verbose)?;

    match cli.command {
        Some(Command::Fetch(args)) => fetch(&config, args).await,
        Some(Command::Evaluate(args)) => {
            let ml = ml_client(&config)?;
            let filepath = match (args.filepath, args.file_id) {
                (Some(filepath), _) => filepath,
                (None, Some(id)) => ml.dataset_path(&FileId::from(id)),
                (None, None) => return Err(anyhow!("Either --filepath or --file-id is required")),
            };
            evaluate(&ml, &filepath).await?;
            Ok(ExitCode::SUCCESS)
        }
        Some(Command::Serve(args)) => {
            if let Some(port) = args.port {
                config.server.port = port;
            }
            web::run(&config).await?;
            Ok(ExitCode::SUCCESS)
        }
        None => {
            print_overview(&config, &cli);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn ml_client(config: &PowerFetchConfig) -> Result<MlServiceClient> {
    MlServiceClient::new(
        &config.ml_service,
        DatasetStore::new(&config.power.dataset_dir),
    )
}

async fn fetch(config: &PowerFetchConfig, args: FetchArgs) -> Result<ExitCode> {
    let mut selector = LocationSelector::new();
    let requested = args.locations.len();
    for location in args.locations {
        if let Err(rejected) = selector.select(location) {
            eprintln!("⚠️  {rejected}");
            return Err(PowerFetchError::from(ValidationError::LocationCount {
                expected: MAX_LOCATIONS,
                found: requested,
            })
            .into());
        }
    }

    let mut form = config.defaults.form();
    if let Some(start) = args.start {
        form.start_date = Some(start);
    }
    if let Some(end) = args.end {
        form.end_date = Some(end);
    }
    form.community = args.community.unwrap_or(form.community);
    form.parameters = args.parameters.unwrap_or(form.parameters);
    form.format = args.format.unwrap_or(form.format);
    form.theme = args.theme.unwrap_or(form.theme);
    form.user = args.user.unwrap_or(form.user);
    form.time_standard = args.time_standard.unwrap_or(form.time_standard);
    let params = QueryParameters::try_from(form).map_err(PowerFetchError::from)?;

    let datasets = DatasetStore::new(&config.power.dataset_dir);
    let source = PowerProxySource::new(PowerClient::new(&config.power)?, datasets);
    let ml = Arc::new(ml_client(config)?);
    let output_dir = args
        .output_dir
        .unwrap_or_else(|| config.downloads.output_dir.clone());
    let orchestrator = FetchOrchestrator::new(
        Arc::new(source),
        ml.clone(),
        Arc::new(FileDownloadSink::new(output_dir)),
        config.downloads.release_grace(),
    );

    println!("⏳ Processing, please wait...");
    let report = orchestrator
        .run(selector.snapshot(), params)
        .await
        .map_err(PowerFetchError::from)?;
    println!("{}", RunSummary(&report));

    if let Some(file_id) = &report.navigate_to {
        let filepath = ml.dataset_path(file_id);
        if args.evaluate {
            println!();
            evaluate(ml.as_ref(), &filepath).await?;
        } else {
            println!("Next: powerfetch evaluate --filepath {filepath}");
        }
    }

    Ok(if report.result.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn evaluate(evaluator: &dyn Evaluator, filepath: &str) -> Result<()> {
    debug!("Evaluating {}", filepath);
    let report = evaluator
        .evaluate(filepath)
        .await
        .map_err(|e| PowerFetchError::api(format!("Error evaluating CSV file {filepath}: {e}")))?;
    println!("{}", EvaluationView(&report));
    Ok(())
}

fn print_overview(config: &PowerFetchConfig, cli: &Cli) {
    println!("PowerFetch v{VERSION}");
    println!("NASA POWER data for four locations, cleaned and evaluated by the ML service.");
    println!();
    println!("  POWER API:   {}", config.power.base_url);
    println!("  ML service:  {}", config.ml_service.base_url);
    println!("  Datasets:    {}", config.power.dataset_dir.display());
    println!("  Downloads:   {}", config.downloads.output_dir.display());

    if cli.verbose {
        let path = cli
            .config
            .clone()
            .or_else(PowerFetchConfig::get_config_path)
            .map_or_else(|| "defaults".to_string(), |p| p.display().to_string());
        println!("  Using config from: {path}");
        println!("  Log level:   {}", config.logging.level);
    }

    println!();
    println!("Run `powerfetch --help` for commands.");
}
