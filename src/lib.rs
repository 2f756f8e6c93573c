// ABOUTME: Library root for bitswan-gitops - exposes public types for testing.
// ABOUTME: The main binary is in main.rs.

pub mod config;
pub mod content;
pub mod deploy;
pub mod diagnostics;
pub mod error;
pub mod ledger;
pub mod output;
pub mod pipeline;
pub mod route;
pub mod store;
pub mod types;
pub mod vcs;
