//! Filescraper - file format identification and well-formedness checking
//!
//! This library crate wires the built-in detectors and scrapers into the
//! [`FileScraper`] orchestrator and exposes configuration loading for the
//! command line tool and for integration testing.

pub mod checksum;
pub mod config;
pub mod registry;
pub mod scrape;

pub use registry::default_registry;
pub use scrape::{FileScraper, ScrapeResult};
