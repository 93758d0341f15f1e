//! Repository analyzer for extracting documentation and commit statistics

use crate::converter::ContentConverter;
use crate::history::HistoryCollector;
use crate::locator::locate;
use repocat_core::{
    log_operation_start, log_operation_success, not_found_error, performance, AnalysisSink,
    DocumentConfig, HistoryOutcome, MarkdownRenderer, ProjectDocuments, RepocatConfig,
    RepocatResult,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of analyzing one checkout.
///
/// Documentation is obtained independently of the history, so it is reported
/// even when history collection failed.
#[derive(Debug)]
pub struct AnalysisOutcome {
    pub repo_path: PathBuf,
    pub documents: ProjectDocuments,
    pub history: RepocatResult<HistoryOutcome>,
}

/// Runs documentation extraction and history statistics against a checkout
#[derive(Clone)]
pub struct RepositoryAnalyzer {
    documents: DocumentConfig,
    converter: ContentConverter,
    collector: HistoryCollector,
}

impl RepositoryAnalyzer {
    pub fn new(config: &RepocatConfig) -> Self {
        Self {
            documents: config.documents.clone(),
            converter: ContentConverter::new(&config.documents),
            collector: HistoryCollector::new(&config.history),
        }
    }

    /// Create an analyzer with a custom Markdown renderer
    pub fn with_renderer(config: &RepocatConfig, renderer: Arc<dyn MarkdownRenderer>) -> Self {
        Self {
            documents: config.documents.clone(),
            converter: ContentConverter::with_renderer(&config.documents, renderer),
            collector: HistoryCollector::new(&config.history),
        }
    }

    pub fn converter(&self) -> &ContentConverter {
        &self.converter
    }

    /// Analyze the checkout at `repo_path`.
    ///
    /// Fails only when the checkout does not exist; document and history failures
    /// are reported inside the outcome.
    pub async fn analyze<P: AsRef<Path>>(&self, repo_path: P) -> RepocatResult<AnalysisOutcome> {
        let repo_path = repo_path.as_ref();

        if !repo_path.is_dir() {
            return Err(not_found_error!(repo_path.display(), "repository_analyzer"));
        }

        log_operation_start!("analyze_repository", repo_path = %repo_path.display());

        performance::measure_async("analyze_repository", async {
            let documents = self.extract_documents(repo_path).await;
            let history = self.collector.collect(repo_path).await;

            if let Err(e) = &history {
                e.log();
            }

            log_operation_success!(
                "analyze_repository",
                repo_path = %repo_path.display(),
                has_license = documents.license_html.is_some(),
                has_readme = documents.readme_html.is_some(),
                history_ok = history.is_ok()
            );

            Ok(AnalysisOutcome {
                repo_path: repo_path.to_path_buf(),
                documents,
                history,
            })
        })
        .await
    }

    /// Locate and convert the license and readme documents
    pub async fn extract_documents(&self, repo_path: &Path) -> ProjectDocuments {
        let license_html = self
            .extract_document(repo_path, &self.documents.license_basenames, "license")
            .await;
        let readme_html = self
            .extract_document(repo_path, &self.documents.readme_basenames, "readme")
            .await;

        ProjectDocuments {
            license_html,
            readme_html,
        }
    }

    async fn extract_document(
        &self,
        repo_path: &Path,
        basenames: &[String],
        slot: &str,
    ) -> Option<String> {
        let Some(candidate) = locate(repo_path, basenames) else {
            debug!(
                repo_path = %repo_path.display(),
                slot = slot,
                basenames = ?basenames,
                "No document found"
            );
            return None;
        };

        match self.converter.convert(&candidate).await {
            Ok(html) => {
                info!(
                    path = %candidate.path.display(),
                    slot = slot,
                    html_bytes = html.len(),
                    "📄 Document converted"
                );
                Some(html)
            }
            Err(e) => {
                warn!(
                    path = %candidate.path.display(),
                    slot = slot,
                    error = %e,
                    "⚠️ Document conversion failed, leaving slot empty"
                );
                None
            }
        }
    }

    /// Analyze and hand the results to `sink`.
    ///
    /// Documents are always stored; statistics only after a complete history run.
    pub async fn analyze_and_store<P: AsRef<Path>>(
        &self,
        repo_path: P,
        project: &str,
        sink: &dyn AnalysisSink,
    ) -> RepocatResult<AnalysisOutcome> {
        let outcome = self.analyze(repo_path).await?;

        sink.store_documents(project, &outcome.documents).await?;
        if let Ok(history) = &outcome.history {
            sink.store_statistics(project, history).await?;
        }

        Ok(outcome)
    }
}

/// Analyze a checkout with the default configuration
pub async fn analyze_repository<P: AsRef<Path>>(repo_path: P) -> RepocatResult<AnalysisOutcome> {
    RepositoryAnalyzer::new(&RepocatConfig::default())
        .analyze(repo_path)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use repocat_core::RepocatError;

    #[tokio::test]
    async fn test_analyze_missing_checkout() {
        let err = analyze_repository("/nonexistent/checkout").await.unwrap_err();
        assert!(matches!(err, RepocatError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_extract_documents_independent_slots() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("COPYING"), "GPL <v2>").unwrap();
        std::fs::write(dir.path().join("README.md"), "# Demo").unwrap();

        let analyzer = RepositoryAnalyzer::new(&RepocatConfig::default());
        let documents = analyzer.extract_documents(dir.path()).await;

        assert_eq!(documents.license_html.as_deref(), Some("<pre>GPL &lt;v2&gt;</pre>"));
        assert!(documents.readme_html.unwrap().contains("<h1>Demo</h1>"));
    }

    #[tokio::test]
    async fn test_conversion_failure_leaves_slot_empty() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("LICENSE.pod"), "=head1 LICENSE").unwrap();
        std::fs::write(dir.path().join("README"), "hello").unwrap();

        let mut config = RepocatConfig::default();
        config.documents.pod_converter.program = "repocat-no-such-pod-converter".to_string();

        let documents = RepositoryAnalyzer::new(&config)
            .extract_documents(dir.path())
            .await;

        assert_eq!(documents.license_html, None);
        assert_eq!(documents.readme_html.as_deref(), Some("<pre>hello</pre>"));
    }
}
