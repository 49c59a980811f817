//! The domain processing loop.
//!
//! Domains are handled strictly one after another: throttle, look up,
//! normalize, emit, pause. A failure for one domain becomes an error record
//! and the loop moves on. Only sink failures end a run early with an error.

use crate::error::TechFinderError;
use crate::parse::parse_response;
use crate::protocols::TechnologyLookup;
use crate::rate_limit::RateLimiter;
use crate::sink::RecordSink;
use crate::stats::{RunStats, RunSummary};
use crate::types::{LookupOutcome, ParsedTechnology, ProcessorOptions, ResultRecord, RunConfig};
use tracing::{debug, error, info, warn};

/// Runs technology discovery over a list of domains.
///
/// # Example
///
/// ```rust,no_run
/// use tech_finder_lib::{DomainProcessor, MemorySink, RunConfig, RunInput, TombaClient};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = RunConfig::from_input(Some(RunInput {
///         tomba_api_key: Some("ta_xxxx".into()),
///         tomba_api_secret: Some("ts_xxxx".into()),
///         domains: Some(vec!["stripe.com".into()]),
///         max_results: None,
///     }))?;
///
///     let mut client = TombaClient::new();
///     client.set_key(&config.api_key).set_secret(&config.api_secret);
///
///     let mut sink = MemorySink::new();
///     let summary = DomainProcessor::new(client).run(&config, &mut sink).await?;
///     println!("{} records, {}% success", summary.processed, summary.success_rate);
///     Ok(())
/// }
/// ```
pub struct DomainProcessor<L: TechnologyLookup> {
    lookup: L,
    options: ProcessorOptions,
}

impl<L: TechnologyLookup> DomainProcessor<L> {
    /// Create a processor with the default 150 requests/minute budget and
    /// 100ms pacing.
    pub fn new(lookup: L) -> Self {
        Self::with_options(lookup, ProcessorOptions::default())
    }

    pub fn with_options(lookup: L, options: ProcessorOptions) -> Self {
        Self { lookup, options }
    }

    pub fn lookup(&self) -> &L {
        &self.lookup
    }

    /// Process every domain in `config`, pushing records to `sink`.
    ///
    /// Stops early once `config.max_results` records have been emitted.
    ///
    /// # Errors
    ///
    /// Only a failing sink aborts the run. Lookup failures are recorded.
    pub async fn run(
        &self,
        config: &RunConfig,
        sink: &mut dyn RecordSink,
    ) -> Result<RunSummary, TechFinderError> {
        let mut limiter = RateLimiter::per_minute(self.options.requests_per_minute);
        let mut stats = RunStats::start();

        info!(
            "Starting technology discovery for {} domains",
            config.domains.len()
        );

        for domain in &config.domains {
            if stats.processed >= config.max_results {
                info!("Reached maximum results limit of {}", config.max_results);
                break;
            }

            limiter.acquire().await;
            stats.requests += 1;
            stats.domains_visited += 1;

            info!("Finding technologies for: {}", domain);

            match self.lookup.list_technologies(domain).await {
                Ok(response) => {
                    let outcome = parse_response(&response);
                    self.emit_outcome(domain, outcome, config.max_results, &mut stats, sink)
                        .await?;
                }
                Err(e) => {
                    error!("Error finding technologies for {}: {}", domain, e);
                    let message = e.message();
                    let message = if message.trim().is_empty() {
                        "Unknown error".to_string()
                    } else {
                        message
                    };
                    sink.push(&ResultRecord::error(domain, message)).await?;
                    stats.record_error();
                }
            }

            tokio::time::sleep(self.options.pacing).await;
        }

        sink.finish().await?;
        stats.finish();

        let summary = stats.summary(config.domains.len(), limiter.min_interval());
        info!(
            "Technology discovery completed. Processed {} results.",
            summary.processed
        );
        Ok(summary)
    }

    async fn emit_outcome(
        &self,
        domain: &str,
        outcome: LookupOutcome,
        max_results: usize,
        stats: &mut RunStats,
        sink: &mut dyn RecordSink,
    ) -> Result<(), TechFinderError> {
        let technologies = match outcome {
            LookupOutcome::Technologies(technologies) => technologies,
            other => {
                // The other variants all carry a message.
                let message = other.error_message().unwrap_or("Invalid API response");
                info!("{} for: {}", message, domain);
                sink.push(&ResultRecord::error(domain, message)).await?;
                stats.record_error();
                return Ok(());
            }
        };

        let mut entries = technologies.into_iter();
        while let Some(parsed) = entries.next() {
            let tech = match parsed {
                ParsedTechnology::Known(tech) => tech,
                ParsedTechnology::Malformed => {
                    warn!("Skipping non-object technology entry for {}", domain);
                    stats.skipped += 1;
                    continue;
                }
            };

            if stats.processed >= max_results {
                // This entry and every remaining well-formed one are dropped.
                let remaining: Vec<ParsedTechnology> = entries.by_ref().collect();
                let malformed = remaining
                    .iter()
                    .filter(|entry| matches!(entry, ParsedTechnology::Malformed))
                    .count();
                let dropped = remaining.len() - malformed + 1;
                warn!(
                    "Result limit {} reached, dropping {} remaining entries for {}",
                    max_results, dropped, domain
                );
                stats.truncated += dropped;
                stats.skipped += malformed;
                break;
            }

            let record = ResultRecord::technology(domain, tech);
            sink.push(&record).await?;
            stats.record_success();

            if let ResultRecord::Technology(t) = &record {
                debug!(
                    "Found technology: {} (Category: {})",
                    t.technology_name.as_deref().unwrap_or("unknown"),
                    t.category_name.as_deref().unwrap_or("none")
                );
            }
        }

        Ok(())
    }
}
