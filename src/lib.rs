//! Meal plan and workout plan management.
//!
//! The library holds everything a front end needs: typed plan models and
//! their schemas, a generic nested editor for drafts, HTTP clients for the
//! plan backend and the upload service, and the panel that ties them
//! together. The `fitplan` binary drives these from the command line and an
//! interactive console.

pub mod client;
pub mod editor;
pub mod models;
pub mod panel;
pub mod schema;
pub mod shell;

#[cfg(test)]
pub(crate) mod testing;

/// Library version
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
