//! Commit history statistics
//!
//! The history dump prints three lines per commit, oldest first:
//!
//! ```text
//! 2024-01-15 10:00:00 +0000|abc123|Jane Doe|jane@example.com
//!
//!  3 files changed, 10 insertions(+), 2 deletions(-)
//! ```
//!
//! Output is consumed chunk by chunk: [`RecordReassembler`] cuts records,
//! [`parse_record`] turns them into deltas and [`StatisticsAggregator`] keeps the
//! running totals.

pub mod aggregator;
pub mod collector;
pub mod parser;
pub mod reassembler;

pub use aggregator::StatisticsAggregator;
pub use collector::{consume_stream, HistoryCollector, HistoryPipeline};
pub use parser::{parse_diffstat, parse_record, DiffStat};
pub use reassembler::RecordReassembler;
