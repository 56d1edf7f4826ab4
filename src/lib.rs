//! crawl-profiler - method-level profiling for capability traits
//!
//! This library wraps any implementation of a capability trait in a
//! transparent decorator that times calls to methods marked as profiled,
//! aggregates the timings per method across the process, and writes a
//! human-readable report. It also serializes crawl results to JSON.

pub mod capability;
pub mod cli;
pub mod clock;
pub mod corpus;
pub mod crawl_result;
pub mod profiler;
pub mod profiling_state;
pub mod proxy;
pub mod result_writer;
