//! Typed data access for the scam watch dashboard.
//!
//! All reads and writes go through a [`store::RecordStore`] carried by a
//! request-scoped [`session::Session`]. The `db` module holds one-shot
//! wrappers per table; `dashboard` aggregates detection events into the
//! summary figures the dashboard shows.

pub mod config;
pub mod dashboard;
pub mod db;
pub mod error;
pub mod import;
pub mod models;
pub mod report;
pub mod session;
pub mod store;

pub use error::StoreError;
pub use session::{CallerId, Session};
