//! Perfdash: performance dashboard backend
//!
//! Command-line wiring around the aggregation engine in `perfdash-core`, the
//! artifact stores in `perfdash-storage` and the HTTP surface in
//! `perfdash-api`.

pub mod cli;
