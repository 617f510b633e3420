//! tablegrid - server-side processing for tabular grid views
//!
//! Translates paged, sorted and filtered grid requests into declarative
//! query plans, runs them against a store and renders JSON pages or CSV
//! exports.

pub mod cli;
pub mod config;
pub mod grid;
pub mod http;
pub mod store;
