//! # Tech Finder Library
//!
//! Rate-limited technology discovery for lists of domains, backed by the
//! Tomba technology API.
//!
//! A run walks the input domains in order, waits for the throttle before
//! each lookup, turns whatever the API returns into flat result records and
//! pushes them to a sink. Per-domain failures become error records; only
//! configuration and sink failures end a run.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tech_finder_lib::{DomainProcessor, JsonLinesSink, RunConfig, RunInput, TombaClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RunConfig::from_input(Some(RunInput {
//!         tomba_api_key: Some("ta_xxxx".into()),
//!         tomba_api_secret: Some("ts_xxxx".into()),
//!         domains: Some(vec!["stripe.com".into(), "github.com".into()]),
//!         max_results: Some(20),
//!     }))?;
//!
//!     let mut client = TombaClient::new();
//!     client.set_key(&config.api_key).set_secret(&config.api_secret);
//!
//!     let mut sink = JsonLinesSink::new(std::io::stdout());
//!     let summary = DomainProcessor::new(client).run(&config, &mut sink).await?;
//!     eprintln!("{} records in {}s", summary.processed, summary.elapsed_secs);
//!     Ok(())
//! }
//! ```

pub use config::{
    load_env_config, load_env_config_from, load_input_file, parse_timeout_string, ApiConfig,
    ConfigManager, DefaultsConfig, EnvConfig, FileConfig, OutputConfig, RateConfig,
};
pub use error::TechFinderError;
pub use parse::{parse_response, parse_technology};
pub use processor::DomainProcessor;
pub use protocols::{TechnologyLookup, TombaClient};
pub use rate_limit::RateLimiter;
pub use sink::{csv_row, CsvSink, DatasetSink, JsonLinesSink, MemorySink, RecordSink, CSV_COLUMNS};
pub use stats::{RunStats, RunSummary};
pub use types::{
    Category, ErrorResult, LookupOutcome, OutputFormat, ParsedTechnology, ProcessorOptions,
    ResultRecord, RunConfig, RunInput, Technology, TechnologyResult, DEFAULT_MAX_RESULTS,
    DEFAULT_PACING, DEFAULT_REQUESTS_PER_MINUTE, RECORD_SOURCE,
};

pub use protocols::tomba::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT};

mod config;
mod error;
mod parse;
mod processor;
mod protocols;
mod rate_limit;
mod sink;
mod stats;
mod types;

// Type alias for convenience
pub type Result<T> = std::result::Result<T, TechFinderError>;

// Library version and metadata
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const AUTHOR: &str = env!("CARGO_PKG_AUTHORS");
