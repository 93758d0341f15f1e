//! Parsing of reassembled commit records

use chrono::{DateTime, FixedOffset};
use repocat_core::{malformed_record_error, CommitDelta, RepocatResult};
use tracing::warn;

/// Date format produced by `git log --date=iso`
const GIT_ISO_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S %z";

const HEADER_FIELDS: usize = 4;

/// Counts from a `--shortstat` summary line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffStat {
    pub files_changed: u64,
    pub insertions: u64,
    pub deletions: u64,
    /// Tokens matching none of the known keywords
    pub unrecognized: Vec<String>,
}

/// Parse one `date|hash|name|email` / blank / diffstat record
pub fn parse_record(record: &str) -> RepocatResult<CommitDelta> {
    let mut lines = record.splitn(3, '\n');
    let header = lines.next().unwrap_or_default().trim_end_matches('\r');
    let _separator = lines.next();
    let diffstat = lines.next().unwrap_or_default();

    let fields: Vec<&str> = header.split('|').collect();
    if fields.len() != HEADER_FIELDS {
        return Err(malformed_record_error!(
            format!(
                "expected {} '|' separated header fields, found {}",
                HEADER_FIELDS,
                fields.len()
            ),
            header,
            "record_parser"
        ));
    }

    let timestamp = parse_timestamp(fields[0]).ok_or_else(|| {
        malformed_record_error!(
            format!("unparseable commit date '{}'", fields[0]),
            header,
            "record_parser"
        )
    })?;

    let stat = parse_diffstat(diffstat);

    Ok(CommitDelta {
        timestamp,
        commit_hash: fields[1].trim().to_string(),
        author_name: fields[2].to_string(),
        author_email: fields[3].trim().to_lowercase(),
        files_changed: stat.files_changed,
        insertions: stat.insertions,
        deletions: stat.deletions,
    })
}

/// Parse a summary such as ` 3 files changed, 10 insertions(+), 2 deletions(-)`
pub fn parse_diffstat(line: &str) -> DiffStat {
    let mut stat = DiffStat::default();

    for token in line.trim().split(',') {
        if token.trim().is_empty() {
            continue;
        }

        if let Some(count) = count_before(token, "file") {
            stat.files_changed = count;
        } else if let Some(count) = count_before(token, "ins") {
            stat.insertions = count;
        } else if let Some(count) = count_before(token, "del") {
            stat.deletions = count;
        } else {
            warn!(token = %token.trim(), "⚠️ Unknown entry in git log diffstat");
            stat.unrecognized.push(token.trim().to_string());
        }
    }

    stat
}

fn parse_timestamp(value: &str) -> Option<DateTime<FixedOffset>> {
    let value = value.trim();
    DateTime::parse_from_str(value, GIT_ISO_DATE_FORMAT)
        .or_else(|_| DateTime::parse_from_rfc3339(value))
        .ok()
}

/// Integer prefix before `keyword`; a non-numeric prefix counts as zero
fn count_before(token: &str, keyword: &str) -> Option<u64> {
    token
        .find(keyword)
        .map(|pos| token[..pos].trim().parse().unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use repocat_core::RepocatError;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_parse_record() {
        let delta = parse_record(
            "2024-01-15 10:00:00 +0000|abc123|Jane Doe|Jane@Example.com\n\n3 files changed, 10 insertions(+), 2 deletions(-)\n",
        )
        .unwrap();

        assert_eq!(delta.author_email, "jane@example.com");
        assert_eq!(delta.author_name, "Jane Doe");
        assert_eq!(delta.commit_hash, "abc123");
        assert_eq!(delta.files_changed, 3);
        assert_eq!(delta.insertions, 10);
        assert_eq!(delta.deletions, 2);
        assert_eq!(delta.month_bucket(), "202401");
    }

    #[test]
    fn test_parse_record_singular_forms() {
        let delta = parse_record(
            "2023-12-31 23:59:59 +0100|h|A|a@x\n\n 1 file changed, 1 insertion(+)\n",
        )
        .unwrap();

        assert_eq!(delta.files_changed, 1);
        assert_eq!(delta.insertions, 1);
        assert_eq!(delta.deletions, 0);
        assert_eq!(delta.month_bucket(), "202312");
    }

    #[test]
    fn test_parse_record_rfc3339_date() {
        let delta = parse_record("2024-03-05T08:00:00+02:00|h|A|a@x\n\n\n").unwrap();
        assert_eq!(delta.month_bucket(), "202403");
    }

    #[test]
    fn test_empty_diffstat_is_zero() {
        let delta = parse_record("2024-01-15 10:00:00 +0000|h|A|a@x\n\n\n").unwrap();
        assert_eq!(delta.files_changed, 0);
        assert_eq!(delta.insertions, 0);
        assert_eq!(delta.deletions, 0);

        assert_eq!(parse_diffstat("   "), DiffStat::default());
    }

    #[test]
    fn test_malformed_header_field_count() {
        for header in ["2024-01-15 10:00:00 +0000|h|A", "d|h|A|a@x|extra", "garbage"] {
            let err = parse_record(&format!("{}\n\n 1 file changed\n", header)).unwrap_err();
            match err {
                RepocatError::MalformedRecord { record, .. } => assert_eq!(record, header),
                other => panic!("Expected MalformedRecord, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_malformed_date() {
        let err = parse_record("yesterday|h|A|a@x\n\n\n").unwrap_err();
        assert!(matches!(err, RepocatError::MalformedRecord { .. }));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_unrecognized_token_is_ignored() {
        let stat = parse_diffstat(" 2 files changed, 5 renames, 4 deletions(-)");

        assert_eq!(stat.files_changed, 2);
        assert_eq!(stat.insertions, 0);
        assert_eq!(stat.deletions, 4);
        assert_eq!(stat.unrecognized, vec!["5 renames".to_string()]);
    }

    /// Shared buffer the test subscriber writes formatted events into
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_unrecognized_token_logs_warning() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();

        // The warn! in parse_diffstat is the only event emitted here
        let stat = tracing::subscriber::with_default(subscriber, || {
            parse_diffstat(" 1 file changed, 5 renames")
        });

        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert_eq!(stat.unrecognized, vec!["5 renames".to_string()]);
        assert!(output.contains("WARN"));
        assert!(output.contains("5 renames"));
    }

    #[test]
    fn test_non_numeric_prefix_counts_as_zero() {
        let stat = parse_diffstat("many files changed, 7 insertions(+)");
        assert_eq!(stat.files_changed, 0);
        assert_eq!(stat.insertions, 7);
        assert!(stat.unrecognized.is_empty());
    }

    #[test]
    fn test_keyword_priority() {
        // "file" is checked before "del"
        let stat = parse_diffstat("3 files deleted");
        assert_eq!(stat.files_changed, 3);
        assert_eq!(stat.deletions, 0);
    }
}
