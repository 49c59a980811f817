//! Output sinks for result records.
//!
//! Records are pushed one at a time, in emission order, as soon as they are
//! produced. A sink failure is fatal for the run because the output is the
//! only durable product of the job.

use crate::error::TechFinderError;
use crate::types::ResultRecord;
use async_trait::async_trait;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Column order used for CSV output.
pub const CSV_COLUMNS: [&str; 10] = [
    "input_domain",
    "technology_slug",
    "technology_name",
    "technology_icon",
    "technology_website",
    "category_id",
    "category_slug",
    "category_name",
    "source",
    "error",
];

/// Append-only destination for result records.
#[async_trait]
pub trait RecordSink: Send {
    /// Append one record.
    async fn push(&mut self, record: &ResultRecord) -> Result<(), TechFinderError>;

    /// Flush anything buffered. Called once after the last record.
    async fn finish(&mut self) -> Result<(), TechFinderError> {
        Ok(())
    }
}

fn sink_io_error(err: std::io::Error) -> TechFinderError {
    TechFinderError::sink(format!("Failed to write record: {}", err))
}

/// Writes one JSON object per line.
pub struct JsonLinesSink<W: Write + Send> {
    writer: W,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[async_trait]
impl<W: Write + Send> RecordSink for JsonLinesSink<W> {
    async fn push(&mut self, record: &ResultRecord) -> Result<(), TechFinderError> {
        let line = serde_json::to_string(record)?;
        writeln!(self.writer, "{}", line).map_err(sink_io_error)?;
        self.writer.flush().map_err(sink_io_error)
    }

    async fn finish(&mut self) -> Result<(), TechFinderError> {
        self.writer.flush().map_err(sink_io_error)
    }
}

/// Writes a header row followed by one CSV row per record.
pub struct CsvSink<W: Write + Send> {
    writer: W,
    header_written: bool,
}

impl<W: Write + Send> CsvSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            header_written: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_header(&mut self) -> Result<(), TechFinderError> {
        writeln!(self.writer, "{}", CSV_COLUMNS.join(",")).map_err(sink_io_error)?;
        self.header_written = true;
        Ok(())
    }
}

/// Quote a CSV field when it contains a delimiter, quote or newline.
fn escape_csv(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Render a record as CSV fields in `CSV_COLUMNS` order.
pub fn csv_row(record: &ResultRecord) -> Vec<String> {
    let opt = |value: &Option<String>| value.as_deref().map(escape_csv).unwrap_or_default();

    match record {
        ResultRecord::Technology(t) => vec![
            escape_csv(&t.input_domain),
            opt(&t.technology_slug),
            opt(&t.technology_name),
            opt(&t.technology_icon),
            opt(&t.technology_website),
            t.category_id.as_ref().map(|id| id.to_string()).unwrap_or_default(),
            opt(&t.category_slug),
            opt(&t.category_name),
            escape_csv(&t.source),
            String::new(),
        ],
        ResultRecord::Error(e) => vec![
            escape_csv(&e.input_domain),
            String::new(),
            String::new(),
            String::new(),
            String::new(),
            String::new(),
            String::new(),
            String::new(),
            escape_csv(&e.source),
            escape_csv(&e.error),
        ],
    }
}

#[async_trait]
impl<W: Write + Send> RecordSink for CsvSink<W> {
    async fn push(&mut self, record: &ResultRecord) -> Result<(), TechFinderError> {
        if !self.header_written {
            self.write_header()?;
        }
        writeln!(self.writer, "{}", csv_row(record).join(",")).map_err(sink_io_error)?;
        self.writer.flush().map_err(sink_io_error)
    }

    async fn finish(&mut self) -> Result<(), TechFinderError> {
        // An empty run still gets a header so the file is valid CSV.
        if !self.header_written {
            self.write_header()?;
        }
        self.writer.flush().map_err(sink_io_error)
    }
}

/// Writes each record to its own numbered JSON file in a dataset directory.
///
/// Files are named `000000001.json`, `000000002.json`, ... in push order.
#[derive(Debug)]
pub struct DatasetSink {
    dir: PathBuf,
    count: usize,
}

impl DatasetSink {
    /// Open (and create if needed) a dataset directory.
    ///
    /// Items left by an earlier run are removed so the dataset only ever
    /// holds records from this one. Other files in the directory are kept.
    pub fn create<P: AsRef<Path>>(dir: P) -> Result<Self, TechFinderError> {
        let dir = dir.as_ref().to_path_buf();
        let dir_error = |action: &str, e: std::io::Error| {
            TechFinderError::file_error(
                dir.to_string_lossy(),
                format!("Failed to {} dataset directory: {}", action, e),
            )
        };

        std::fs::create_dir_all(&dir).map_err(|e| dir_error("create", e))?;

        let mut removed = 0;
        for entry in std::fs::read_dir(&dir).map_err(|e| dir_error("read", e))? {
            let path = entry.map_err(|e| dir_error("read", e))?.path();
            if path.is_file() && is_dataset_item(&path) {
                std::fs::remove_file(&path).map_err(|e| dir_error("clear", e))?;
                removed += 1;
            }
        }
        if removed > 0 {
            tracing::info!(
                "Removed {} items from a previous run in {}",
                removed,
                dir.display()
            );
        }

        Ok(Self { dir, count: 0 })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Number of records written so far.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    fn item_path(&self, index: usize) -> PathBuf {
        self.dir.join(format!("{:09}.json", index))
    }
}

#[async_trait]
impl RecordSink for DatasetSink {
    async fn push(&mut self, record: &ResultRecord) -> Result<(), TechFinderError> {
        let path = self.item_path(self.count + 1);
        let body = serde_json::to_vec_pretty(record)?;
        tokio::fs::write(&path, body).await.map_err(|e| {
            TechFinderError::sink(format!("Failed to write {}: {}", path.display(), e))
        })?;
        self.count += 1;
        Ok(())
    }
}

/// Whether `path` is named like a dataset item (`NNNNNNNNN.json`).
fn is_dataset_item(path: &Path) -> bool {
    let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
        return false;
    };
    path.extension().is_some_and(|ext| ext == "json")
        && stem.len() == 9
        && stem.bytes().all(|b| b.is_ascii_digit())
}

/// Collects records in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Vec<ResultRecord>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[ResultRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<ResultRecord> {
        self.records
    }
}

#[async_trait]
impl RecordSink for MemorySink {
    async fn push(&mut self, record: &ResultRecord) -> Result<(), TechFinderError> {
        self.records.push(record.clone());
        Ok(())
    }
}
