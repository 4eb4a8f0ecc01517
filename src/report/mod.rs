//! Downloadable reports built from a [`ResultTable`].
//!
//! Artifacts are rebuilt on every request; nothing is cached. The generation
//! time is passed in by the caller.

pub mod pdf;
pub mod xlsx;

use crate::error::{ChatSqlError, ChatSqlResult};
use crate::table::ResultTable;

use chrono::NaiveDateTime;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const PDF_MIME: &str = "application/pdf";

/// Literal every report filename starts with.
pub const FILENAME_PREFIX: &str = "Report";

/// Characters that cannot appear in a filename on common filesystems.
const ILLEGAL_CHARS: &[char] = &['\\', '/', '*', '?', ':', '"', '<', '>', '|'];

/// How many characters of the question go into a filename.
const SLUG_LEN: usize = 30;

/// Visual style of the PDF document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum PdfLayout {
    /// Running header and footer, heading, question and timestamp.
    #[default]
    Corporate,
    /// Just the bordered table.
    Simple,
}

impl PdfLayout {
    pub fn name(&self) -> &'static str {
        match self {
            PdfLayout::Corporate => "corporate",
            PdfLayout::Simple => "simple",
        }
    }
}

impl fmt::Display for PdfLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PdfLayout {
    type Err = ChatSqlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "corporate" => Ok(PdfLayout::Corporate),
            "simple" => Ok(PdfLayout::Simple),
            other => Err(ChatSqlError::Report(format!(
                "unknown layout '{}', expected corporate or simple",
                other
            ))),
        }
    }
}

/// Which artifact to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Spreadsheet,
    Document(PdfLayout),
}

impl ReportFormat {
    pub fn mime(&self) -> &'static str {
        match self {
            ReportFormat::Spreadsheet => XLSX_MIME,
            ReportFormat::Document(_) => PDF_MIME,
        }
    }
}

/// A rendered report ready to be saved or served.
#[derive(Debug, Clone)]
pub struct ReportArtifact {
    pub filename: String,
    pub mime: &'static str,
    pub bytes: Vec<u8>,
}

impl ReportArtifact {
    /// Write the artifact into `dir`, returning the full path.
    pub fn save_in(&self, dir: &Path) -> ChatSqlResult<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(&self.filename);
        std::fs::write(&path, &self.bytes)?;
        Ok(path)
    }
}

/// Build the artifact for `table`, titled after `question`.
pub fn generate(
    table: &ResultTable,
    question: &str,
    format: ReportFormat,
    generated_at: NaiveDateTime,
) -> ChatSqlResult<ReportArtifact> {
    let base = base_filename(question, generated_at);
    let (filename, bytes) = match format {
        ReportFormat::Spreadsheet => (format!("{}.xlsx", base), xlsx::render(table)?),
        ReportFormat::Document(layout) => {
            let plan = pdf::plan(table, question, layout, generated_at);
            (format!("{}_{}.pdf", base, layout.name()), pdf::render(&plan)?)
        }
    };
    tracing::debug!(%filename, bytes = bytes.len(), "report generated");
    Ok(ReportArtifact {
        filename,
        mime: format.mime(),
        bytes,
    })
}

/// First characters of the question, made safe for a filename.
pub fn sanitize(question: &str) -> String {
    question
        .chars()
        .take(SLUG_LEN)
        .filter(|c| !ILLEGAL_CHARS.contains(c))
        .map(|c| if c == ' ' { '_' } else { c })
        .collect()
}

/// `Report_<slug>_<YYYY-MM-DD_HHMMSS>`, without extension.
pub fn base_filename(question: &str, generated_at: NaiveDateTime) -> String {
    format!(
        "{}_{}_{}",
        FILENAME_PREFIX,
        sanitize(question),
        generated_at.format("%Y-%m-%d_%H%M%S")
    )
}
