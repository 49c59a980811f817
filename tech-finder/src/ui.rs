//! Terminal display for tech-finder runs.
//!
//! Everything here writes to stderr so that stdout carries only records.
//! Uses only the `console` crate for styling.

use console::style;
use std::path::Path;
use tech_finder_lib::RunSummary;

use crate::Args;

// ── Header ───────────────────────────────────────────────────────────────────

/// Print a styled header at the start of a run.
pub fn print_header(domain_count: usize, max_results: usize, rpm: u32, args: &Args) {
    eprintln!(
        "{} {} {}",
        style("tech-finder").bold(),
        style(format!("v{}", env!("CARGO_PKG_VERSION"))).dim(),
        style(format!(
            "({} domain{}, up to {} results)",
            domain_count,
            if domain_count == 1 { "" } else { "s" },
            max_results
        ))
        .dim(),
    );

    let destination = match (&args.dataset, &args.output) {
        (Some(dir), _) => format!("dataset {}", Path::new(dir).display()),
        (None, Some(file)) => format!("file {}", Path::new(file).display()),
        (None, None) => "stdout".to_string(),
    };
    eprintln!(
        "  {}",
        style(format!(
            "Rate: {} req/min  |  Output: {} ({})",
            rpm,
            destination,
            if args.csv { "csv" } else { "jsonl" }
        ))
        .dim()
    );
    eprintln!();
}

// ── Summary ──────────────────────────────────────────────────────────────────

/// Plain summary lines, without styling.
pub fn summary_lines(summary: &RunSummary) -> Vec<String> {
    let mut lines = vec![
        format!(
            "Total domains processed: {}/{}",
            summary.domains_visited, summary.total_domains
        ),
        format!("Records emitted: {}", summary.processed),
        format!("Successful searches: {}", summary.success),
        format!("Failed searches: {}", summary.errors),
        format!("Success rate: {}%", summary.success_rate),
        format!("Total execution time: {} seconds", summary.elapsed_secs),
        format!(
            "Average time per domain: {} seconds",
            summary.avg_secs_per_domain
        ),
        format!("API requests made: {}", summary.requests),
        format!(
            "Rate limiting: {} requests/minute ({}ms interval)",
            summary.requests_per_minute(),
            summary.min_interval_ms
        ),
    ];

    if summary.skipped > 0 {
        lines.push(format!("Malformed entries skipped: {}", summary.skipped));
    }
    if summary.truncated > 0 {
        lines.push(format!(
            "Technologies dropped at result limit: {}",
            summary.truncated
        ));
    }

    lines
}

/// Print the end-of-run summary block.
pub fn print_summary(summary: &RunSummary) {
    let rule = style("================================").dim();

    eprintln!();
    eprintln!("{}", style("TECHNOLOGY FINDER SUMMARY").bold());
    eprintln!("{}", rule);
    for line in summary_lines(summary) {
        let styled = if line.starts_with("Successful") {
            style(line).green()
        } else if line.starts_with("Failed") && summary.errors > 0 {
            style(line).red()
        } else if line.starts_with("Malformed") || line.starts_with("Technologies dropped") {
            style(line).yellow()
        } else {
            style(line)
        };
        eprintln!("{}", styled);
    }
    eprintln!("{}", rule);
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> RunSummary {
        RunSummary {
            total_domains: 4,
            domains_visited: 3,
            processed: 5,
            success: 4,
            errors: 1,
            requests: 3,
            skipped: 0,
            truncated: 0,
            elapsed_secs: 2,
            success_rate: 80,
            avg_secs_per_domain: 0,
            min_interval_ms: 400,
        }
    }

    #[test]
    fn test_summary_lines_core_fields() {
        let lines = summary_lines(&summary());
        assert!(lines.contains(&"Total domains processed: 3/4".to_string()));
        assert!(lines.contains(&"Success rate: 80%".to_string()));
        assert!(lines.contains(&"API requests made: 3".to_string()));
        assert!(lines.contains(&"Rate limiting: 150 requests/minute (400ms interval)".to_string()));
        assert_eq!(lines.len(), 9);
    }

    #[test]
    fn test_summary_lines_optional_counters() {
        let mut s = summary();
        s.skipped = 2;
        s.truncated = 3;
        let lines = summary_lines(&s);
        assert!(lines.contains(&"Malformed entries skipped: 2".to_string()));
        assert!(lines.contains(&"Technologies dropped at result limit: 3".to_string()));
    }
}
