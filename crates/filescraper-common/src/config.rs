//! Locations of external tools, shared read-only by every scraper.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Tool paths and tool-specific directories.
///
/// Every path is optional; an unset or non-existent path falls back to a
/// `PATH` lookup of the tool's default executable name.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ToolsConfig {
    #[serde(default)]
    pub file_path: Option<PathBuf>,

    #[serde(default)]
    pub ffprobe_path: Option<PathBuf>,

    #[serde(default)]
    pub jhove_path: Option<PathBuf>,

    #[serde(default)]
    pub verapdf_path: Option<PathBuf>,

    #[serde(default)]
    pub xmllint_path: Option<PathBuf>,

    #[serde(default)]
    pub xsltproc_path: Option<PathBuf>,

    #[serde(default)]
    pub soffice_path: Option<PathBuf>,

    /// Directory holding the ISO schematron skeleton stylesheets
    /// (`iso_dsdl_include.xsl`, `iso_abstract_expand.xsl`,
    /// `iso_svrl_for_xslt1.xsl`).
    #[serde(default)]
    pub schematron_xsl_dir: Option<PathBuf>,

    /// Where compiled schematron stylesheets are cached.
    #[serde(default)]
    pub schematron_cache_dir: Option<PathBuf>,
}

impl ToolsConfig {
    /// Configured path for a tool, by its executable name.
    pub fn path_for(&self, tool: &str) -> Option<&Path> {
        match tool {
            "file" => self.file_path.as_deref(),
            "ffprobe" => self.ffprobe_path.as_deref(),
            "jhove" => self.jhove_path.as_deref(),
            "verapdf" => self.verapdf_path.as_deref(),
            "xmllint" => self.xmllint_path.as_deref(),
            "xsltproc" => self.xsltproc_path.as_deref(),
            "soffice" => self.soffice_path.as_deref(),
            _ => None,
        }
    }
}
