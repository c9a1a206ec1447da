//! Bandwidth shaping for request and response bodies
//!
//! A rate spec like `10K`, `1.5M:req` or `512K:rsp` caps how fast body bytes
//! move. One shared bucket serves both directions unless the spec narrows it.

pub mod bucket;
pub mod spec;

pub use bucket::{shape_stream, TokenBucket};
pub use spec::{Direction, RateSpec};
