//! # filescraper-tools
//!
//! External tool plumbing plus the concrete detectors and scrapers.
//!
//! This crate provides:
//! - Tool lookup from configuration or `PATH` ([`get_tool_path`], [`check_tools`])
//! - Blocking command execution with captured output ([`ToolCommand`])
//! - Temporary workspaces for tools that write files ([`Workspace`])
//! - Detectors built on `file` and in-process magic bytes
//! - Scrapers for JHOVE, veraPDF, ffprobe, xmllint, schematron, LibreOffice
//!   and CSV, each with its metadata models
//!
//! ## Example
//!
//! ```no_run
//! use filescraper_common::{Scraper, ScraperArgs};
//! use filescraper_tools::scrapers::XmllintScraper;
//!
//! let mut scraper = XmllintScraper::new(ScraperArgs::new("/path/to/file.xml", true));
//! scraper.scrape_file()?;
//! println!("well-formed: {:?}", scraper.well_formed());
//! # Ok::<(), filescraper_common::Error>(())
//! ```

mod command;
pub mod detectors;
mod error;
pub mod scrapers;
pub mod tools;
pub mod workspace;

// Re-exports
pub use command::{ToolCommand, ToolOutput};
pub use error::{Error, Result};
pub use tools::{check_tool, check_tools, get_tool_path, require_tool, ToolInfo};
pub use workspace::Workspace;
