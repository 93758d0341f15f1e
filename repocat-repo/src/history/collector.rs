//! Streaming collection of commit statistics from the history dump command

use super::aggregator::StatisticsAggregator;
use super::parser::parse_record;
use super::reassembler::RecordReassembler;
use repocat_core::{
    with_timeout, ErrorContext, HistoryConfig, HistoryOutcome, RepocatError, RepocatResult,
};
use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Reassembler, parser and aggregator of one run, fed chunk by chunk
#[derive(Debug, Default)]
pub struct HistoryPipeline {
    reassembler: RecordReassembler,
    aggregator: StatisticsAggregator,
    commits_applied: u64,
    records_skipped: u64,
}

impl HistoryPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a chunk of raw history output
    pub fn feed(&mut self, chunk: &[u8]) {
        let Self {
            reassembler,
            aggregator,
            commits_applied,
            records_skipped,
        } = self;

        reassembler.feed(chunk, |record| {
            apply_record(&record, aggregator, commits_applied, records_skipped)
        });
    }

    /// End of stream: flush the reassembler and hand out the statistics
    pub fn finish(mut self) -> HistoryOutcome {
        let Self {
            reassembler,
            aggregator,
            commits_applied,
            records_skipped,
        } = &mut self;

        let bytes_discarded = reassembler.finish(|record| {
            apply_record(&record, aggregator, commits_applied, records_skipped)
        });

        HistoryOutcome {
            snapshot: self.aggregator.into_snapshot(),
            commits_applied: self.commits_applied,
            records_skipped: self.records_skipped,
            bytes_discarded,
        }
    }
}

fn apply_record(
    record: &str,
    aggregator: &mut StatisticsAggregator,
    commits_applied: &mut u64,
    records_skipped: &mut u64,
) {
    match parse_record(record) {
        Ok(delta) => {
            aggregator.apply(&delta);
            *commits_applied += 1;
        }
        Err(e) => {
            warn!(
                error = %e,
                record_bytes = record.len(),
                "⚠️ Skipping malformed history record"
            );
            *records_skipped += 1;
        }
    }
}

/// Read `reader` to the end in chunks of `buffer_size`, feeding each chunk to the pipeline
pub async fn consume_stream<R>(
    mut reader: R,
    buffer_size: usize,
    pipeline: &mut HistoryPipeline,
) -> std::io::Result<u64>
where
    R: AsyncRead + Unpin,
{
    let mut buffer = vec![0u8; buffer_size.max(1)];
    let mut total = 0u64;

    loop {
        let read = reader.read(&mut buffer).await?;
        if read == 0 {
            return Ok(total);
        }
        total += read as u64;
        pipeline.feed(&buffer[..read]);
    }
}

/// Runs the history dump command inside a checkout and aggregates its output
#[derive(Debug, Clone)]
pub struct HistoryCollector {
    config: HistoryConfig,
}

impl HistoryCollector {
    pub fn new(config: &HistoryConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Collect statistics for the checkout at `repo_dir`.
    ///
    /// Fails if the command cannot be spawned, exits unsuccessfully or exceeds the
    /// configured timeout; no partial statistics are returned in that case.
    pub async fn collect(&self, repo_dir: &Path) -> RepocatResult<HistoryOutcome> {
        match self.config.timeout_secs {
            Some(secs) => {
                with_timeout(self.run(repo_dir), secs * 1000, "collect_history")
                    .await
                    .map_err(|e| RepocatError::HistoryCollection {
                        message: format!("History dump did not finish: {}", e),
                        source: Some(Box::new(e)),
                        context: ErrorContext::new("history_collector")
                            .with_operation("collect")
                            .with_suggestion("Raise history.timeout_secs for large repositories"),
                    })?
            }
            None => self.run(repo_dir).await,
        }
    }

    async fn run(&self, repo_dir: &Path) -> RepocatResult<HistoryOutcome> {
        let program = &self.config.command.program;

        info!(
            repo_path = %repo_dir.display(),
            program = %program,
            "📜 Collecting repository history"
        );

        // Dropping the child (timeout or cancellation) kills the process
        let mut child = Command::new(program)
            .args(&self.config.command.args)
            .current_dir(repo_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| RepocatError::HistoryCollection {
                message: format!("Failed to execute {}: {}", program, e),
                source: Some(Box::new(e)),
                context: ErrorContext::new("history_collector")
                    .with_operation("spawn")
                    .with_suggestion("Ensure git is installed and accessible"),
            })?;

        let stdout = child.stdout.take().ok_or_else(|| missing_pipe("stdout"))?;
        let stderr = child.stderr.take().ok_or_else(|| missing_pipe("stderr"))?;

        let mut pipeline = HistoryPipeline::new();
        let (read_result, ()) = tokio::join!(
            consume_stream(stdout, self.config.read_buffer_size, &mut pipeline),
            log_stderr(stderr, program),
        );

        let bytes_read = read_result.map_err(|e| RepocatError::HistoryCollection {
            message: format!("Failed to read output of {}: {}", program, e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("history_collector").with_operation("read_stdout"),
        })?;

        let status = child
            .wait()
            .await
            .map_err(|e| RepocatError::HistoryCollection {
                message: format!("Failed to wait for {}: {}", program, e),
                source: Some(Box::new(e)),
                context: ErrorContext::new("history_collector").with_operation("wait"),
            })?;

        if !status.success() {
            return Err(RepocatError::HistoryCollection {
                message: format!("{} exited with {}", program, status),
                source: None,
                context: ErrorContext::new("history_collector")
                    .with_operation("wait")
                    .with_metadata("repo_path", &repo_dir.display().to_string())
                    .with_suggestion("Check that the path is a git checkout with at least one commit"),
            });
        }

        let outcome = pipeline.finish();

        info!(
            repo_path = %repo_dir.display(),
            bytes_read = bytes_read,
            commits = outcome.commits_applied,
            skipped = outcome.records_skipped,
            authors = outcome.snapshot.author_count(),
            "✅ Repository history collected"
        );

        Ok(outcome)
    }
}

async fn log_stderr<R>(stderr: R, program: &str)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(stderr).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => warn!(program = %program, "Git error: {}", line),
            Ok(None) => break,
            Err(e) => {
                debug!(program = %program, error = %e, "Stopped reading stderr");
                break;
            }
        }
    }
}

fn missing_pipe(name: &str) -> RepocatError {
    RepocatError::HistoryCollection {
        message: format!("Failed to capture {} of the history command", name),
        source: None,
        context: ErrorContext::new("history_collector").with_operation("spawn"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use repocat_core::ExternalCommand;

    const STREAM: &str = "2024-01-15 10:00:00 +0000|a1|Jane Doe|Jane@Example.com\n\n 3 files changed, 10 insertions(+), 2 deletions(-)\n\
2024-01-20 11:00:00 +0000|a2|Jane D.|jane@example.com\n\n 1 file changed, 1 deletion(-)\n\
2024-02-02 09:30:00 +0100|a3|Bob|bob@example.com\n\n 2 files changed, 7 insertions(+)\n";

    #[test]
    fn test_pipeline_end_to_end() {
        let mut pipeline = HistoryPipeline::new();
        for chunk in STREAM.as_bytes().chunks(13) {
            pipeline.feed(chunk);
        }
        let outcome = pipeline.finish();

        assert_eq!(outcome.commits_applied, 3);
        assert_eq!(outcome.records_skipped, 0);
        assert_eq!(outcome.snapshot.histogram.len(), 2);
        assert_eq!(outcome.snapshot.histogram.values().sum::<u64>(), 3);

        let jane = &outcome.snapshot.authors["jane@example.com"];
        assert_eq!(jane.name, "Jane D.");
        assert_eq!(jane.commits, 2);
        assert_eq!(jane.insertions, 10);
        assert_eq!(jane.deletions, 3);
    }

    #[test]
    fn test_pipeline_skips_malformed_records() {
        let stream = format!(
            "not a header\n\n 1 file changed\n{}",
            "2024-03-01 00:00:00 +0000|h|A|a@x\n\n 1 file changed, 4 insertions(+)\n"
        );
        let mut pipeline = HistoryPipeline::new();
        pipeline.feed(stream.as_bytes());
        let outcome = pipeline.finish();

        assert_eq!(outcome.records_skipped, 1);
        assert_eq!(outcome.commits_applied, 1);
        assert_eq!(outcome.snapshot.authors["a@x"].insertions, 4);
    }

    #[test]
    fn test_pipeline_survives_huge_counts() {
        let record = "2024-01-15 10:00:00 +0000|h|A|a@x\n\n 1 file changed, 18446744073709551615 insertions(+)\n";
        let mut pipeline = HistoryPipeline::new();
        pipeline.feed(record.as_bytes());
        pipeline.feed(record.as_bytes());
        let outcome = pipeline.finish();

        assert_eq!(outcome.commits_applied, 2);
        assert_eq!(outcome.snapshot.authors["a@x"].insertions, u64::MAX);
    }

    #[test]
    fn test_pipeline_drops_trailing_record_without_diffstat() {
        let stream = format!("{}2024-03-01 00:00:00 +0000|h|A|a@x\n\n", STREAM);
        let mut pipeline = HistoryPipeline::new();
        pipeline.feed(stream.as_bytes());
        let outcome = pipeline.finish();

        assert_eq!(outcome.commits_applied, 3);
        assert_eq!(outcome.bytes_discarded, "2024-03-01 00:00:00 +0000|h|A|a@x\n\n".len());
    }

    #[tokio::test]
    async fn test_consume_stream_small_buffer() {
        let mut pipeline = HistoryPipeline::new();
        let total = consume_stream(STREAM.as_bytes(), 5, &mut pipeline)
            .await
            .unwrap();

        assert_eq!(total, STREAM.len() as u64);
        assert_eq!(pipeline.finish().commits_applied, 3);
    }

    fn shell_collector(script: &str) -> HistoryCollector {
        HistoryCollector::new(&HistoryConfig {
            command: ExternalCommand {
                program: "sh".to_string(),
                args: vec!["-c".to_string(), script.to_string()],
            },
            read_buffer_size: 16,
            timeout_secs: None,
        })
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_collect_from_command() {
        let dir = tempfile::tempdir().unwrap();
        let collector = shell_collector(
            "printf '2024-01-15 10:00:00 +0000|a|A|A@X\\n\\n 1 file changed, 2 insertions(+)\\n'; echo noise >&2",
        );

        let outcome = collector.collect(dir.path()).await.unwrap();
        assert_eq!(outcome.commits_applied, 1);
        assert_eq!(outcome.snapshot.authors["a@x"].insertions, 2);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_collect_fails_on_non_zero_exit() {
        let dir = tempfile::tempdir().unwrap();
        let collector = shell_collector(
            "printf '2024-01-15 10:00:00 +0000|a|A|a@x\\n\\n 1 file changed\\n'; exit 128",
        );

        let err = collector.collect(dir.path()).await.unwrap_err();
        assert!(matches!(err, RepocatError::HistoryCollection { .. }));
        assert!(!err.is_recoverable());
    }

    #[tokio::test]
    async fn test_collect_fails_when_command_missing() {
        let dir = tempfile::tempdir().unwrap();
        let collector = HistoryCollector::new(&HistoryConfig {
            command: ExternalCommand {
                program: "repocat-no-such-history-command".to_string(),
                args: vec![],
            },
            ..HistoryConfig::default()
        });

        let err = collector.collect(dir.path()).await.unwrap_err();
        assert!(matches!(err, RepocatError::HistoryCollection { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_collect_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let mut collector = shell_collector("sleep 5");
        collector.config.timeout_secs = Some(1);

        let err = collector.collect(dir.path()).await.unwrap_err();
        assert!(matches!(err, RepocatError::HistoryCollection { .. }));
    }
}
