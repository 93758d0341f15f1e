//! JSON report sink

use async_trait::async_trait;
use repocat_core::{
    AnalysisSink, HistoryOutcome, ProjectDocuments, RepocatError, RepocatResult,
    StatisticsSnapshot,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Everything reported for one project
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProjectReport {
    pub path: String,
    pub documents: ProjectDocuments,
    pub statistics: Option<StatisticsSnapshot>,
    pub commits_applied: u64,
    pub records_skipped: u64,
    pub error: Option<String>,
}

/// Collects analysis results in memory and serializes them as a JSON array
#[derive(Debug, Default)]
pub struct JsonReportSink {
    reports: Mutex<BTreeMap<String, ProjectReport>>,
}

impl JsonReportSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a project as failed
    pub fn record_error(&self, project: &str, error: &RepocatError) {
        self.update(project, |report| report.error = Some(error.to_string()));
    }

    pub fn reports(&self) -> Vec<ProjectReport> {
        self.lock().values().cloned().collect()
    }

    pub fn to_json(&self) -> RepocatResult<String> {
        Ok(serde_json::to_string_pretty(&self.reports())?)
    }

    fn update<F: FnOnce(&mut ProjectReport)>(&self, project: &str, f: F) {
        let mut reports = self.lock();
        let report = reports
            .entry(project.to_string())
            .or_insert_with(|| ProjectReport {
                path: project.to_string(),
                ..ProjectReport::default()
            });
        f(report);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, ProjectReport>> {
        // A panic while holding the lock cannot leave a report half-written
        self.reports
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl AnalysisSink for JsonReportSink {
    async fn store_documents(
        &self,
        project: &str,
        documents: &ProjectDocuments,
    ) -> RepocatResult<()> {
        self.update(project, |report| report.documents = documents.clone());
        Ok(())
    }

    async fn store_statistics(&self, project: &str, outcome: &HistoryOutcome) -> RepocatResult<()> {
        self.update(project, |report| {
            report.statistics = Some(outcome.snapshot.clone());
            report.commits_applied = outcome.commits_applied;
            report.records_skipped = outcome.records_skipped;
        });
        Ok(())
    }
}
