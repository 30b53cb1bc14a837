//! Place Adventure Log
//!
//! Status screen for the personal places log: probes the hosted `places`
//! table once and shows whether the backend is reachable, plus the typed
//! place records the rest of the app builds on.

pub mod backend;
pub mod config;
pub mod dashboard;
pub mod models;
pub mod presence;
pub mod probe;
