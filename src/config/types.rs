use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use filescraper_common::ToolsConfig;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub scrape: ScrapeConfig,

    #[serde(default)]
    pub tools: ToolsConfig,

    #[serde(default)]
    pub schematron: SchematronConfig,
}

impl Config {
    /// Tool settings as handed to detectors and scrapers, with the
    /// schematron directories folded in.
    pub fn tools_config(&self) -> ToolsConfig {
        let mut tools = self.tools.clone();
        if self.schematron.xsl_dir.is_some() {
            tools.schematron_xsl_dir = self.schematron.xsl_dir.clone();
        }
        if self.schematron.cache_dir.is_some() {
            tools.schematron_cache_dir = self.schematron.cache_dir.clone();
        }
        tools
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScrapeConfig {
    /// Run well-formedness checks unless told otherwise on the command line
    #[serde(default = "default_true")]
    pub check_wellformed: bool,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            check_wellformed: true,
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SchematronConfig {
    /// Directory with the ISO schematron XSLT skeleton
    #[serde(default)]
    pub xsl_dir: Option<PathBuf>,

    /// Cache for compiled schematron stylesheets
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
}
