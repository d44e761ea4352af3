//! Report output for JSON and JSONL.
//!
//! The [`LibraryReport`] is what the backup collaborator consumes. JSON writes
//! it as one object. JSONL writes one tagged record per line so large
//! libraries can be streamed:
//!
//! ```text
//! {"type":"photo","id":"a.jpg",...}
//! {"type":"failure","id":"b.jpg","kind":"invalid_image",...}
//! {"type":"duplicate_group","members":["a.jpg","c.jpg"]}
//! {"type":"summary","stats":{...},"cancelled":false}
//! ```

use serde::Serialize;
use std::io::{self, Write};

use crate::duplicates::PhotoId;
use crate::types::{BatchStats, LibraryReport, PhotoFailure, PhotoRecord};

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Single JSON object
    Json,
    /// One JSON object per line (newline-delimited JSON)
    JsonLines,
}

impl OutputFormat {
    /// Parse format from string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "jsonl" | "jsonlines" | "ndjson" => Some(Self::JsonLines),
            _ => None,
        }
    }
}

/// One line of a JSONL report.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ReportRecord<'a> {
    Photo(&'a PhotoRecord),
    Failure(&'a PhotoFailure),
    DuplicateGroup { members: &'a [PhotoId] },
    Summary { stats: &'a BatchStats, cancelled: bool },
}

/// Writes library reports to any `io::Write`.
pub struct ReportWriter<W: Write> {
    writer: W,
    format: OutputFormat,
    pretty: bool,
    records_written: usize,
}

impl<W: Write> ReportWriter<W> {
    /// `pretty` only affects JSON; JSONL is always one object per line.
    pub fn new(writer: W, format: OutputFormat, pretty: bool) -> Self {
        Self {
            writer,
            format,
            pretty,
            records_written: 0,
        }
    }

    pub fn write_report(&mut self, report: &LibraryReport) -> io::Result<()> {
        match self.format {
            OutputFormat::Json => {
                if self.pretty {
                    serde_json::to_writer_pretty(&mut self.writer, report)
                        .map_err(io::Error::other)?;
                } else {
                    serde_json::to_writer(&mut self.writer, report).map_err(io::Error::other)?;
                }
                writeln!(self.writer)?;
                self.records_written += 1;
            }
            OutputFormat::JsonLines => {
                for photo in &report.photos {
                    self.write_line(&ReportRecord::Photo(photo))?;
                }
                for failure in &report.failures {
                    self.write_line(&ReportRecord::Failure(failure))?;
                }
                for group in &report.duplicate_groups {
                    self.write_line(&ReportRecord::DuplicateGroup {
                        members: group.members(),
                    })?;
                }
                self.write_line(&ReportRecord::Summary {
                    stats: &report.stats,
                    cancelled: report.cancelled,
                })?;
            }
        }
        Ok(())
    }

    fn write_line(&mut self, record: &ReportRecord<'_>) -> io::Result<()> {
        serde_json::to_writer(&mut self.writer, record).map_err(io::Error::other)?;
        writeln!(self.writer)?;
        self.records_written += 1;
        Ok(())
    }

    /// Number of JSON values written so far.
    pub fn records_written(&self) -> usize {
        self.records_written
    }

    /// Flush the underlying writer.
    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}
