//! Core trait definitions

use crate::error::RepocatResult;
use crate::types::*;
use async_trait::async_trait;

/// Markdown to HTML renderer
///
/// Implementations must be pure: the same input always renders the same HTML.
pub trait MarkdownRenderer: Send + Sync {
    fn render(&self, markdown: &str) -> String;
}

/// Destination for analysis results (catalog database, report file, ...)
#[async_trait]
pub trait AnalysisSink: Send + Sync {
    /// Store the rendered documentation of a project
    async fn store_documents(&self, project: &str, documents: &ProjectDocuments)
        -> RepocatResult<()>;

    /// Store the statistics of a fully collected history
    async fn store_statistics(&self, project: &str, outcome: &HistoryOutcome)
        -> RepocatResult<()>;
}
