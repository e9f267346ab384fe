//! Perfdash API Module
//!
//! The API module exposes the aggregated performance data over HTTP for the
//! dashboard front end, and serves the dashboard's static assets.

pub mod handlers;
pub mod models;
pub mod server;

pub use handlers::*;
pub use models::*;
pub use server::*;
