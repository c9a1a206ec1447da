//! Transfer planning and file sinks

pub mod planner;
pub mod sink;

pub use planner::{OffsetSource, Planner, Preflight, TransferDecision, INLINE_THRESHOLD};
pub use sink::FileSink;
