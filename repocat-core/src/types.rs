//! Core data type definitions

use crate::error::{ErrorContext, RepocatError, RepocatResult};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Format of a documentation file found in a checkout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentType {
    PlainText,
    Markdown,
    PlainOldDocumentation,
}

impl DocumentType {
    /// Infer the document type from a file extension.
    ///
    /// Files without an extension are treated as plain text.
    pub fn from_path<P: AsRef<Path>>(path: P) -> RepocatResult<Self> {
        let path = path.as_ref();
        match path.extension().and_then(|ext| ext.to_str()) {
            None => Ok(DocumentType::PlainText),
            Some(ext) => ext.parse(),
        }
    }
}

impl FromStr for DocumentType {
    type Err = RepocatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "txt" | "text" | "plaintext" => Ok(DocumentType::PlainText),
            "md" | "markdown" => Ok(DocumentType::Markdown),
            "pod" => Ok(DocumentType::PlainOldDocumentation),
            _ => Err(RepocatError::UnsupportedType {
                type_name: s.to_string(),
                context: ErrorContext::new("document_type")
                    .with_operation("from_str")
                    .with_suggestion("Use one of: txt, md, markdown, pod"),
            }),
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DocumentType::PlainText => "plaintext",
            DocumentType::Markdown => "markdown",
            DocumentType::PlainOldDocumentation => "pod",
        };
        f.write_str(name)
    }
}

/// A documentation file selected for conversion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentCandidate {
    pub path: PathBuf,
    pub doc_type: DocumentType,
}

/// Rendered documentation of a project; `None` means no usable document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectDocuments {
    pub license_html: Option<String>,
    pub readme_html: Option<String>,
}

/// The effect of a single commit on the statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitDelta {
    pub timestamp: DateTime<FixedOffset>,
    pub commit_hash: String,
    pub author_name: String,
    /// Lowercased; identifies the author
    pub author_email: String,
    pub files_changed: u64,
    pub insertions: u64,
    pub deletions: u64,
}

impl CommitDelta {
    /// Year-month histogram key such as `"202401"`, in the commit's own offset
    pub fn month_bucket(&self) -> String {
        self.timestamp.format("%Y%m").to_string()
    }
}

/// Running totals for one author, keyed by email in the snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorStats {
    /// Last name seen for this email
    pub name: String,
    pub commits: u64,
    pub insertions: u64,
    pub deletions: u64,
}

/// Commits per year-month bucket
pub type CommitHistogram = BTreeMap<String, u64>;

/// Contribution statistics of a complete history
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatisticsSnapshot {
    pub authors: BTreeMap<String, AuthorStats>,
    pub histogram: CommitHistogram,
}

impl StatisticsSnapshot {
    pub fn total_commits(&self) -> u64 {
        self.histogram.values().sum()
    }

    pub fn author_count(&self) -> usize {
        self.authors.len()
    }
}

/// Result of streaming a full history dump
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryOutcome {
    pub snapshot: StatisticsSnapshot,
    /// Records parsed and folded into the snapshot
    pub commits_applied: u64,
    /// Records dropped because their header was malformed
    pub records_skipped: u64,
    /// Trailing bytes of an incomplete final record
    pub bytes_discarded: usize,
}
