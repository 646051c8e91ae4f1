//! Market, sentiment, and macro data collection pipeline.
//!
//! Fetches time-series observations from heterogeneous sources (a chart API
//! for quotes, a spreadsheet for survey sentiment, a macro-data API for
//! economic rates), normalizes locale-inconsistent numeric text, derives
//! moving averages and trend state, and upserts the results into a
//! date-keyed SQLite store so repeated runs converge to the same state.

pub mod cli;
pub mod commands;
pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
