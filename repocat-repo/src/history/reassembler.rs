//! Reassembly of commit records from an arbitrarily chunked byte stream

use tracing::{debug, warn};

/// Lines making up one commit: header, blank separator, diffstat
const LINES_PER_RECORD: usize = 3;

/// Splits the history dump into one three-line record per commit.
///
/// Only the current partial record is buffered. Bytes are kept undecoded until
/// a record is complete so multi-byte characters may span chunks.
#[derive(Debug, Default)]
pub struct RecordReassembler {
    buffer: Vec<u8>,
    newlines: usize,
    /// Offset of the second line of the pending record
    second_line_start: usize,
}

impl RecordReassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and emit every record it completes, in stream order
    pub fn feed<F>(&mut self, chunk: &[u8], mut on_record: F)
    where
        F: FnMut(String),
    {
        for &byte in chunk {
            self.buffer.push(byte);
            if byte != b'\n' {
                continue;
            }

            self.newlines += 1;
            match self.newlines {
                1 => self.second_line_start = self.buffer.len(),
                2 if self.buffer.len() - self.second_line_start > 1 => {
                    // The second line is a header: the first commit had no diffstat
                    self.resync(&mut on_record);
                }
                LINES_PER_RECORD => {
                    let record = std::mem::take(&mut self.buffer);
                    self.newlines = 0;
                    self.second_line_start = 0;
                    on_record(String::from_utf8_lossy(&record).into_owned());
                }
                _ => {}
            }
        }
    }

    /// Signal end of stream.
    ///
    /// A header-only commit left at the end is emitted. Any other tail, one that
    /// stops mid-line or after the blank separator, is discarded and its length
    /// returned.
    pub fn finish<F>(&mut self, mut on_record: F) -> usize
    where
        F: FnMut(String),
    {
        let remaining = std::mem::take(&mut self.buffer);
        let newlines = std::mem::replace(&mut self.newlines, 0);
        self.second_line_start = 0;

        if remaining.is_empty() {
            return 0;
        }

        // Only a lone header line is a complete commit; anything else lost its diffstat
        if newlines != 1 || remaining.last() != Some(&b'\n') {
            warn!(
                bytes = remaining.len(),
                complete_lines = newlines,
                "⚠️ Discarding incomplete history record at end of stream"
            );
            return remaining.len();
        }

        let mut record = String::from_utf8_lossy(&remaining).into_owned();
        record.push_str("\n\n");
        on_record(record);
        0
    }

    /// Bytes currently held for the pending record
    pub fn pending_bytes(&self) -> usize {
        self.buffer.len()
    }

    fn resync<F>(&mut self, on_record: &mut F)
    where
        F: FnMut(String),
    {
        let next = self.buffer.split_off(self.second_line_start);
        let mut record = std::mem::replace(&mut self.buffer, next);
        record.extend_from_slice(b"\n\n");

        debug!(
            record_bytes = record.len(),
            "Commit without diffstat, padding record"
        );

        self.newlines = 1;
        self.second_line_start = self.buffer.len();
        on_record(String::from_utf8_lossy(&record).into_owned());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECORD: &str =
        "2024-01-15 10:00:00 +0000|abc123|Jane Doe|Jane@Example.com\n\n 3 files changed, 10 insertions(+), 2 deletions(-)\n";

    fn collect(chunks: &[&[u8]]) -> (Vec<String>, usize) {
        let mut reassembler = RecordReassembler::new();
        let mut records = Vec::new();
        for chunk in chunks {
            reassembler.feed(chunk, |record| records.push(record));
        }
        let discarded = reassembler.finish(|record| records.push(record));
        (records, discarded)
    }

    #[test]
    fn test_single_chunk_record() {
        let (records, discarded) = collect(&[RECORD.as_bytes()]);
        assert_eq!(records, vec![RECORD.to_string()]);
        assert_eq!(discarded, 0);
    }

    #[test]
    fn test_record_split_at_every_position() {
        let bytes = RECORD.as_bytes();
        for split in 1..bytes.len() {
            let (records, discarded) = collect(&[&bytes[..split], &bytes[split..]]);
            assert_eq!(records, vec![RECORD.to_string()], "split at {}", split);
            assert_eq!(discarded, 0);
        }
    }

    #[test]
    fn test_record_fed_byte_by_byte() {
        let chunks: Vec<&[u8]> = RECORD.as_bytes().chunks(1).collect();
        let (records, _) = collect(&chunks);
        assert_eq!(records, vec![RECORD.to_string()]);
    }

    #[test]
    fn test_many_records_in_order() {
        let stream: String = (0..5)
            .map(|i| format!("2024-0{}-01 00:00:00 +0000|h{}|A|a@x\n\n 1 file changed\n", i + 1, i))
            .collect();

        for chunk_size in [1, 7, 64, stream.len()] {
            let chunks: Vec<&[u8]> = stream.as_bytes().chunks(chunk_size).collect();
            let (records, _) = collect(&chunks);
            assert_eq!(records.len(), 5);
            for (i, record) in records.iter().enumerate() {
                assert!(record.contains(&format!("|h{}|", i)));
            }
        }
    }

    #[test]
    fn test_records_emitted_as_soon_as_complete() {
        let mut reassembler = RecordReassembler::new();
        let mut records = Vec::new();

        reassembler.feed(RECORD.as_bytes(), |record| records.push(record));
        assert_eq!(records.len(), 1);
        assert_eq!(reassembler.pending_bytes(), 0);

        reassembler.feed(b"2024-02-01 00:00:00 +0000|def|B|b@x\n", |record| {
            records.push(record)
        });
        assert_eq!(records.len(), 1);
        assert!(reassembler.pending_bytes() > 0);
    }

    #[test]
    fn test_multibyte_character_split_across_chunks() {
        let record = "2024-01-15 10:00:00 +0000|abc|Jürgen Müller|j@x\n\n 1 file changed\n";
        let bytes = record.as_bytes();
        let split = record.find('ü').unwrap() + 1;

        let (records, _) = collect(&[&bytes[..split], &bytes[split..]]);
        assert_eq!(records, vec![record.to_string()]);
    }

    #[test]
    fn test_header_only_commit_is_padded() {
        let stream = "2024-01-01 00:00:00 +0000|empty|A|a@x\n\
                      2024-01-02 00:00:00 +0000|full|B|b@x\n\n 1 file changed, 1 insertion(+)\n";

        let (records, _) = collect(&[stream.as_bytes()]);
        assert_eq!(
            records,
            vec![
                "2024-01-01 00:00:00 +0000|empty|A|a@x\n\n\n".to_string(),
                "2024-01-02 00:00:00 +0000|full|B|b@x\n\n 1 file changed, 1 insertion(+)\n"
                    .to_string(),
            ]
        );
    }

    #[test]
    fn test_consecutive_header_only_commits() {
        let stream = "d|h1|A|a@x\nd|h2|A|a@x\nd|h3|A|a@x\n\n 2 files changed\n";

        let (records, _) = collect(&[stream.as_bytes()]);
        assert_eq!(records.len(), 3);
        assert_eq!(records[0], "d|h1|A|a@x\n\n\n");
        assert_eq!(records[1], "d|h2|A|a@x\n\n\n");
        assert_eq!(records[2], "d|h3|A|a@x\n\n 2 files changed\n");
    }

    #[test]
    fn test_trailing_header_only_commit_is_emitted() {
        let stream = format!("{}d|last|A|a@x\n", RECORD);

        let (records, discarded) = collect(&[stream.as_bytes()]);
        assert_eq!(discarded, 0);
        assert_eq!(records.len(), 2);
        assert_eq!(records[1], "d|last|A|a@x\n\n\n");
    }

    #[test]
    fn test_partial_line_discarded_on_finish() {
        let stream = format!("{}2024-02-01 00:00:00 +0000|def|B|b@", RECORD);

        let (records, discarded) = collect(&[stream.as_bytes()]);
        assert_eq!(records, vec![RECORD.to_string()]);
        assert_eq!(discarded, "2024-02-01 00:00:00 +0000|def|B|b@".len());
    }

    #[test]
    fn test_header_and_separator_without_diffstat_discarded() {
        let tail = "2024-01-15 10:00:00 +0000|h|A|a@x\n\n";
        let stream = format!("{}{}", RECORD, tail);

        let (records, discarded) = collect(&[stream.as_bytes()]);
        assert_eq!(records, vec![RECORD.to_string()]);
        assert_eq!(discarded, tail.len());
    }

    #[test]
    fn test_finish_resets_state() {
        let mut reassembler = RecordReassembler::new();
        reassembler.feed(b"partial", |_| panic!("no record expected"));
        assert_eq!(reassembler.finish(|_| {}), 7);
        assert_eq!(reassembler.pending_bytes(), 0);
        assert_eq!(reassembler.finish(|_| panic!("no record expected")), 0);
    }
}
