//! Tech Finder CLI Application
//!
//! A command-line interface that discovers the technology stack of a list of
//! domains through the Tomba API and writes one record per finding.

mod ui;

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::Parser;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter};
use std::path::Path;
use std::process;
use std::time::Duration;
use tech_finder_lib::{
    load_env_config, load_input_file, parse_timeout_string, ConfigManager, CsvSink, DatasetSink,
    DomainProcessor, EnvConfig, FileConfig, JsonLinesSink, OutputFormat, ProcessorOptions,
    RecordSink, RunConfig, RunInput, TombaClient, DEFAULT_PACING, DEFAULT_REQUESTS_PER_MINUTE,
};
use tracing_subscriber::EnvFilter;

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

/// CLI arguments for tech-finder
#[derive(Parser, Debug)]
#[command(name = "tech-finder")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Discover the technologies used by domains via the Tomba API")]
#[command(
    long_about = "Discover the technologies used by a list of domains via the Tomba API.\n\nEmits one record per technology found (or one error record per domain without results), rate limited to 150 requests/minute by default."
)]
#[command(styles = STYLES)]
pub struct Args {
    /// Domains to look up (e.g. stripe.com)
    #[arg(value_name = "DOMAINS", help_heading = "Input")]
    pub domains: Vec<String>,

    /// JSON input document (tombaApiKey, tombaApiSecret, domains, maxResults)
    #[arg(long = "input", value_name = "FILE", help_heading = "Input")]
    pub input: Option<String>,

    /// Input file with domains (one per line)
    #[arg(short = 'f', long = "file", value_name = "FILE", help_heading = "Input")]
    pub file: Option<String>,

    /// Maximum number of records to emit (default: 50)
    #[arg(short = 'm', long = "max-results", value_name = "N", help_heading = "Input")]
    pub max_results: Option<i64>,

    /// Tomba API key (or TOMBA_API_KEY)
    #[arg(long = "key", value_name = "KEY", help_heading = "Credentials")]
    pub key: Option<String>,

    /// Tomba API secret (or TOMBA_API_SECRET)
    #[arg(long = "secret", value_name = "SECRET", help_heading = "Credentials")]
    pub secret: Option<String>,

    /// Write records as CSV instead of JSON lines
    #[arg(long = "csv", help_heading = "Output Format")]
    pub csv: bool,

    /// Write records to this file instead of stdout
    #[arg(short = 'o', long = "output", value_name = "FILE", help_heading = "Output Format")]
    pub output: Option<String>,

    /// Write each record as a numbered JSON file in this directory
    #[arg(long = "dataset", value_name = "DIR", help_heading = "Output Format")]
    pub dataset: Option<String>,

    /// Outbound requests per minute (default: 150)
    #[arg(long = "rpm", value_name = "N", help_heading = "Performance")]
    pub rpm: Option<u32>,

    /// Delay after each domain in milliseconds (default: 100)
    #[arg(long = "pacing-ms", value_name = "MS", help_heading = "Performance")]
    pub pacing_ms: Option<u64>,

    /// Request timeout, e.g. "30s" or "2m"
    #[arg(long = "timeout", value_name = "DURATION", help_heading = "Performance")]
    pub timeout: Option<String>,

    /// Override the API root URL
    #[arg(long = "base-url", value_name = "URL", help_heading = "Configuration")]
    pub base_url: Option<String>,

    /// Use specific config file instead of automatic discovery
    #[arg(long = "config", value_name = "FILE", help_heading = "Configuration")]
    pub config: Option<String>,

    /// Show detailed debug information
    #[arg(short = 'd', long = "debug", help_heading = "Configuration")]
    pub debug: bool,

    /// Verbose logging
    #[arg(short = 'v', long = "verbose", help_heading = "Configuration")]
    pub verbose: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    init_logging(&args);

    if let Err(e) = validate_args(&args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    if let Err(e) = run_technology_discovery(args).await {
        tracing::error!("Technology discovery failed: {}", e);
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Install the stderr log subscriber.
///
/// `RUST_LOG` wins when set; otherwise `-d` selects trace, `-v` debug and
/// the default is info.
fn init_logging(args: &Args) {
    let default_level = if args.debug {
        "trace"
    } else if args.verbose {
        "debug"
    } else {
        "info"
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("tech_finder={0},tech_finder_lib={0}", default_level)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(args.debug)
        .try_init();
}

/// Validate command line arguments
fn validate_args(args: &Args) -> Result<(), String> {
    if args.output.is_some() && args.dataset.is_some() {
        return Err("Cannot specify both --output and --dataset".to_string());
    }

    if args.csv && args.dataset.is_some() {
        return Err("--csv cannot be combined with --dataset (datasets are JSON)".to_string());
    }

    if let Some(n) = args.max_results {
        if n <= 0 {
            return Err("--max-results must be a positive integer".to_string());
        }
    }

    if args.rpm == Some(0) {
        return Err("--rpm must be greater than 0".to_string());
    }

    if let Some(timeout) = &args.timeout {
        if parse_timeout_string(timeout).is_none() {
            return Err(format!(
                "Invalid timeout '{}'. Use format like '5s', '30s', '2m'",
                timeout
            ));
        }
    }

    Ok(())
}

/// Main technology discovery logic
async fn run_technology_discovery(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let file_config = load_file_config(&args)?;
    let env_config = load_env_config();

    let input = resolve_run_input(&args, &file_config, &env_config)?;
    let config = RunConfig::from_input(input)?;
    let options = build_processor_options(&args, &file_config, &env_config);
    let client = build_client(&args, &file_config, &env_config, &config)?;

    ui::print_header(
        config.domains.len(),
        config.max_results,
        options.requests_per_minute,
        &args,
    );
    tracing::debug!(?config, ?options, ?client, "resolved run configuration");

    let mut sink = open_sink(&args, &file_config)?;

    let processor = DomainProcessor::with_options(client, options);
    let summary = processor.run(&config, sink.as_mut()).await?;

    ui::print_summary(&summary);

    Ok(())
}

/// Load the explicit config file, or discover one.
fn load_file_config(args: &Args) -> Result<FileConfig, Box<dyn std::error::Error>> {
    let manager = ConfigManager::new();
    match &args.config {
        Some(path) => Ok(manager.load_file(path)?),
        None => Ok(manager.discover_and_load()?),
    }
}

/// Merge every input source into the raw run input.
///
/// Layers, lowest first: config-file defaults, the JSON input document,
/// environment, CLI flags. Returns `None` when neither the document, the
/// environment credentials nor the CLI supplied anything.
fn resolve_run_input(
    args: &Args,
    file_config: &FileConfig,
    env_config: &EnvConfig,
) -> Result<Option<RunInput>, Box<dyn std::error::Error>> {
    let document = match &args.input {
        Some(path) => load_input_file(path)?,
        None => RunInput::default(),
    };

    let mut cli_domains = Vec::new();
    if let Some(path) = &args.file {
        cli_domains.extend(read_domains_from_file(path)?);
    }
    cli_domains.extend(args.domains.iter().cloned());

    let cli = RunInput {
        tomba_api_key: args.key.clone(),
        tomba_api_secret: args.secret.clone(),
        domains: (!cli_domains.is_empty()).then_some(cli_domains),
        max_results: args.max_results,
    };

    // Environment and config-file limits are defaults, not input.
    let env_input = env_config.as_run_input();
    let env_credentials =
        env_input.tomba_api_key.is_some() || env_input.tomba_api_secret.is_some();
    if document.is_empty() && !env_credentials && cli.is_empty() {
        return Ok(None);
    }

    let defaults = RunInput {
        max_results: file_config
            .defaults
            .as_ref()
            .and_then(|d| d.max_results)
            .map(|n| n as i64),
        ..Default::default()
    };

    Ok(Some(defaults.merge(document).merge(env_input).merge(cli)))
}

/// Resolve throttle settings: CLI, then environment, then config file.
fn build_processor_options(
    args: &Args,
    file_config: &FileConfig,
    env_config: &EnvConfig,
) -> ProcessorOptions {
    let rate = file_config.rate.as_ref();

    let rpm = args
        .rpm
        .or(env_config.requests_per_minute)
        .or_else(|| rate.and_then(|r| r.requests_per_minute))
        .unwrap_or(DEFAULT_REQUESTS_PER_MINUTE);

    let pacing = args
        .pacing_ms
        .or(env_config.pacing_ms)
        .or_else(|| rate.and_then(|r| r.pacing_ms))
        .map(Duration::from_millis)
        .unwrap_or(DEFAULT_PACING);

    ProcessorOptions::default()
        .with_requests_per_minute(rpm)
        .with_pacing(pacing)
}

/// Build the authenticated Tomba client.
fn build_client(
    args: &Args,
    file_config: &FileConfig,
    env_config: &EnvConfig,
    config: &RunConfig,
) -> Result<TombaClient, Box<dyn std::error::Error>> {
    let api = file_config.api.as_ref();
    let mut client = TombaClient::new();

    let base_url = args
        .base_url
        .clone()
        .or_else(|| env_config.base_url.clone())
        .or_else(|| api.and_then(|a| a.base_url.clone()));
    if let Some(base_url) = base_url {
        client = client.with_base_url(base_url);
    }

    let timeout = args
        .timeout
        .clone()
        .or_else(|| env_config.timeout.clone())
        .or_else(|| api.and_then(|a| a.timeout.clone()));
    if let Some(timeout) = timeout {
        let secs = parse_timeout_string(&timeout)
            .ok_or_else(|| format!("Invalid timeout '{}'", timeout))?;
        client = client.with_timeout(Duration::from_secs(secs));
    }

    client
        .set_key(config.api_key.as_str())
        .set_secret(config.api_secret.as_str());

    Ok(client)
}

/// Pick the output sink from flags and config.
fn open_sink(
    args: &Args,
    file_config: &FileConfig,
) -> Result<Box<dyn RecordSink>, Box<dyn std::error::Error>> {
    if let Some(dir) = &args.dataset {
        return Ok(Box::new(DatasetSink::create(dir)?));
    }

    let format = if args.csv {
        OutputFormat::Csv
    } else {
        match file_config.output.as_ref().and_then(|o| o.format.as_deref()) {
            Some(format) => format.parse::<OutputFormat>()?,
            None => OutputFormat::JsonLines,
        }
    };

    match &args.output {
        Some(path) => {
            let file = File::create(path)
                .map_err(|e| format!("Cannot create output file '{}': {}", path, e))?;
            let writer = BufWriter::new(file);
            Ok(match format {
                OutputFormat::JsonLines => Box::new(JsonLinesSink::new(writer)),
                OutputFormat::Csv => Box::new(CsvSink::new(writer)),
            })
        }
        None => Ok(match format {
            OutputFormat::JsonLines => Box::new(JsonLinesSink::new(std::io::stdout())),
            OutputFormat::Csv => Box::new(CsvSink::new(std::io::stdout())),
        }),
    }
}

/// Read domains from a file, one per line.
///
/// Blank lines and `#` comments (whole-line or trailing) are ignored.
fn read_domains_from_file(file_path: &str) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {}", file_path).into());
    }

    let reader = BufReader::new(File::open(path)?);
    let mut domains = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| format!("{}: line {}: {}", file_path, index + 1, e))?;
        let domain = line.split('#').next().unwrap_or("").trim();
        if !domain.is_empty() {
            domains.push(domain.to_string());
        }
    }

    if domains.is_empty() {
        return Err(format!("No domains found in {}", file_path).into());
    }

    Ok(domains)
}
