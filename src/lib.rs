//! # census-stats
//!
//! Descriptive statistics over census-style CSV datasets (the UCI "adult"
//! layout). It supports:
//!
//! - Memory-mapped or in-memory CSV loading into typed columns
//! - Schema inference (int, float, string) and census column validation
//! - Parallel chunked parsing with Rayon
//! - Distribution counts, conditional means and percentages, grouped ratio
//!   argmax, most-frequent category, minimum and binned histograms
//! - A fixed summary report, printed by the CLI or served as JSON
//! - An axum dashboard API with uploads and filtered re-computation
//!
//! # Example
//!
//! ```rust,no_run
//! use census_stats::census::{self, TabularSource};
//! use census_stats::engine::{ReportOptions, full_report};
//!
//! fn main() -> Result<(), census_stats::Error> {
//!     let dataset = census::load(TabularSource::Path("data/adult.data.csv".into()))?;
//!     let report = full_report(&dataset, &ReportOptions::default())?;
//!     println!("{report}");
//!     Ok(())
//! }
//! ```

pub mod census;
pub mod config;
pub mod engine;
pub mod processor;
pub mod server;

pub use processor::Error;
