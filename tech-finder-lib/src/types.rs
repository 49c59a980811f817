//! Core data types for technology discovery runs.
//!
//! This module defines the run input and configuration, the parsed shape of
//! a lookup response and the flat result records written to the output sink.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tag written into the `source` field of every result record.
pub const RECORD_SOURCE: &str = "tomba_technology_finder";

/// Default cap on emitted records.
pub const DEFAULT_MAX_RESULTS: usize = 50;

/// Default outbound request budget.
pub const DEFAULT_REQUESTS_PER_MINUTE: u32 = 150;

/// Default pause after each domain, on top of the rate limiter.
pub const DEFAULT_PACING: Duration = Duration::from_millis(100);

/// Raw run input as supplied by the caller.
///
/// Every field is optional here; `RunConfig::from_input` decides what is
/// acceptable. Field names follow the JSON input document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tomba_api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tomba_api_secret: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domains: Option<Vec<String>>,

    /// Signed so that negative values surface as a configuration error
    /// instead of a JSON type error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_results: Option<i64>,
}

impl RunInput {
    /// True when no field has been provided by any source.
    pub fn is_empty(&self) -> bool {
        self.tomba_api_key.is_none()
            && self.tomba_api_secret.is_none()
            && self.domains.is_none()
            && self.max_results.is_none()
    }

    /// Overlay `higher` on top of `self`.
    ///
    /// Scalar fields from `higher` win when set. Domain lists are
    /// concatenated so that domains from every source are processed.
    pub fn merge(mut self, higher: RunInput) -> RunInput {
        if higher.tomba_api_key.is_some() {
            self.tomba_api_key = higher.tomba_api_key;
        }
        if higher.tomba_api_secret.is_some() {
            self.tomba_api_secret = higher.tomba_api_secret;
        }
        if higher.max_results.is_some() {
            self.max_results = higher.max_results;
        }
        self.domains = match (self.domains, higher.domains) {
            (Some(mut lower), Some(higher)) => {
                lower.extend(higher);
                Some(lower)
            }
            (lower, higher) => higher.or(lower),
        };
        self
    }
}

/// Validated, immutable configuration for one run.
#[derive(Clone, PartialEq)]
pub struct RunConfig {
    pub api_key: String,
    pub api_secret: String,
    pub domains: Vec<String>,
    pub max_results: usize,
}

// Credentials stay out of debug output.
impl std::fmt::Debug for RunConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunConfig")
            .field("api_key", &"***")
            .field("api_secret", &"***")
            .field("domains", &self.domains)
            .field("max_results", &self.max_results)
            .finish()
    }
}

/// Tuning knobs for the processing loop.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessorOptions {
    /// Outbound request budget; the minimum spacing is one minute divided by this
    pub requests_per_minute: u32,

    /// Fixed delay after every domain
    pub pacing: Duration,
}

impl Default for ProcessorOptions {
    fn default() -> Self {
        Self {
            requests_per_minute: DEFAULT_REQUESTS_PER_MINUTE,
            pacing: DEFAULT_PACING,
        }
    }
}

impl ProcessorOptions {
    /// Set the request budget. Zero is clamped to one.
    pub fn with_requests_per_minute(mut self, rpm: u32) -> Self {
        self.requests_per_minute = rpm.max(1);
        self
    }

    /// Set the inter-domain pacing delay.
    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    /// Minimum spacing between the start of two consecutive lookups.
    pub fn min_interval(&self) -> Duration {
        Duration::from_secs(60) / self.requests_per_minute.max(1)
    }
}

/// Category attached to a technology.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Category {
    pub id: Option<serde_json::Number>,
    pub slug: Option<String>,
    pub name: Option<String>,
}

/// A technology entry extracted from a lookup response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Technology {
    pub slug: Option<String>,
    pub name: Option<String>,
    pub icon: Option<String>,
    pub website: Option<String>,
    pub category: Option<Category>,
}

/// One element of the response's `data` array.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedTechnology {
    Known(Technology),
    /// The element was not an object
    Malformed,
}

/// Shape of a lookup response after normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum LookupOutcome {
    /// The response was not a JSON object
    InvalidResponse,
    /// The object had no array-valued `data` field
    NoData,
    /// `data` was an empty array
    Empty,
    /// `data` had at least one element
    Technologies(Vec<ParsedTechnology>),
}

impl LookupOutcome {
    /// Error text for outcomes that produce a single error record.
    pub fn error_message(&self) -> Option<&'static str> {
        match self {
            LookupOutcome::InvalidResponse => Some("Invalid API response"),
            LookupOutcome::NoData => Some("No data returned from API"),
            LookupOutcome::Empty => Some("No technologies found"),
            LookupOutcome::Technologies(_) => None,
        }
    }
}

/// A technology found for a domain, flattened for output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnologyResult {
    pub input_domain: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technology_slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technology_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technology_icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technology_website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<serde_json::Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_name: Option<String>,
    pub source: String,
}

/// A domain for which no technology data could be produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResult {
    pub input_domain: String,
    /// Always `None`; serialized as an explicit `null`
    pub technology_name: Option<String>,
    pub source: String,
    pub error: String,
}

/// One emitted output row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResultRecord {
    Error(ErrorResult),
    Technology(TechnologyResult),
}

impl ResultRecord {
    /// Build a success record for `domain` from a parsed technology.
    pub fn technology(domain: &str, tech: Technology) -> Self {
        let category = tech.category.unwrap_or_default();
        ResultRecord::Technology(TechnologyResult {
            input_domain: domain.to_string(),
            technology_slug: tech.slug,
            technology_name: tech.name,
            technology_icon: tech.icon,
            technology_website: tech.website,
            category_id: category.id,
            category_slug: category.slug,
            category_name: category.name,
            source: RECORD_SOURCE.to_string(),
        })
    }

    /// Build an error record for `domain`.
    pub fn error<E: Into<String>>(domain: &str, error: E) -> Self {
        ResultRecord::Error(ErrorResult {
            input_domain: domain.to_string(),
            technology_name: None,
            source: RECORD_SOURCE.to_string(),
            error: error.into(),
        })
    }

    pub fn input_domain(&self) -> &str {
        match self {
            ResultRecord::Error(e) => &e.input_domain,
            ResultRecord::Technology(t) => &t.input_domain,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ResultRecord::Error(_))
    }

    /// The error text, if this is an error record.
    pub fn error_message(&self) -> Option<&str> {
        match self {
            ResultRecord::Error(e) => Some(&e.error),
            ResultRecord::Technology(_) => None,
        }
    }
}

/// Format used when writing records to a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// One JSON object per line
    #[default]
    JsonLines,
    /// Header row followed by one CSV row per record
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "jsonl" | "json" | "ndjson" => Ok(OutputFormat::JsonLines),
            "csv" => Ok(OutputFormat::Csv),
            other => Err(format!("Unknown output format '{}'. Use 'jsonl' or 'csv'", other)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::JsonLines => write!(f, "jsonl"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_record_serializes_null_name() {
        let record = ResultRecord::error("a.com", "No technologies found");
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(
            value,
            json!({
                "input_domain": "a.com",
                "technology_name": null,
                "source": "tomba_technology_finder",
                "error": "No technologies found"
            })
        );
    }

    #[test]
    fn test_success_record_omits_missing_fields() {
        let tech = Technology {
            name: Some("React".to_string()),
            ..Default::default()
        };
        let value = serde_json::to_value(ResultRecord::technology("a.com", tech)).unwrap();
        assert_eq!(
            value,
            json!({
                "input_domain": "a.com",
                "technology_name": "React",
                "source": "tomba_technology_finder"
            })
        );
        assert!(value.get("error").is_none());
        assert!(value.get("category_id").is_none());
    }

    #[test]
    fn test_untagged_deserialize_picks_variant() {
        let err: ResultRecord = serde_json::from_value(json!({
            "input_domain": "a.com",
            "technology_name": null,
            "source": "tomba_technology_finder",
            "error": "timeout"
        }))
        .unwrap();
        assert!(err.is_error());
        assert_eq!(err.error_message(), Some("timeout"));

        let ok: ResultRecord = serde_json::from_value(json!({
            "input_domain": "b.com",
            "technology_name": "Vue",
            "category_id": 3,
            "source": "tomba_technology_finder"
        }))
        .unwrap();
        assert!(!ok.is_error());
        assert_eq!(ok.input_domain(), "b.com");
    }

    #[test]
    fn test_run_input_merge() {
        let lower = RunInput {
            tomba_api_key: Some("k1".to_string()),
            domains: Some(vec!["a.com".to_string()]),
            max_results: Some(10),
            ..Default::default()
        };
        let higher = RunInput {
            tomba_api_key: Some("k2".to_string()),
            tomba_api_secret: Some("s2".to_string()),
            domains: Some(vec!["b.com".to_string()]),
            ..Default::default()
        };

        let merged = lower.merge(higher);
        assert_eq!(merged.tomba_api_key.as_deref(), Some("k2"));
        assert_eq!(merged.tomba_api_secret.as_deref(), Some("s2"));
        assert_eq!(merged.max_results, Some(10));
        assert_eq!(
            merged.domains,
            Some(vec!["a.com".to_string(), "b.com".to_string()])
        );
    }

    #[test]
    fn test_run_input_camel_case() {
        let input: RunInput = serde_json::from_str(
            r#"{"tombaApiKey":"ta_x","tombaApiSecret":"ts_y","domains":["a.com"],"maxResults":5}"#,
        )
        .unwrap();
        assert_eq!(input.tomba_api_key.as_deref(), Some("ta_x"));
        assert_eq!(input.max_results, Some(5));
        assert!(!input.is_empty());
        assert!(RunInput::default().is_empty());
    }

    #[test]
    fn test_min_interval_from_rpm() {
        let options = ProcessorOptions::default();
        assert_eq!(options.min_interval(), Duration::from_millis(400));

        let options = ProcessorOptions::default().with_requests_per_minute(0);
        assert_eq!(options.requests_per_minute, 1);
        assert_eq!(options.min_interval(), Duration::from_secs(60));
    }

    #[test]
    fn test_run_config_debug_hides_credentials() {
        let config = RunConfig {
            api_key: "ta_secret_key".to_string(),
            api_secret: "ts_secret".to_string(),
            domains: vec!["a.com".to_string()],
            max_results: 50,
        };
        let debug = format!("{:?}", config);
        assert!(!debug.contains("ta_secret_key"));
        assert!(!debug.contains("ts_secret"));
        assert!(debug.contains("a.com"));
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!("csv".parse::<OutputFormat>(), Ok(OutputFormat::Csv));
        assert_eq!("JSONL".parse::<OutputFormat>(), Ok(OutputFormat::JsonLines));
        assert!("xml".parse::<OutputFormat>().is_err());
    }
}
