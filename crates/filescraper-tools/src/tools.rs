//! External tool detection and management.

use std::path::{Path, PathBuf};

use filescraper_common::ToolsConfig;

use crate::command::ToolCommand;
use crate::{Error, Result};

/// Where veraPDF installs itself when packaged for the system.
pub const VERAPDF_DEFAULT_PATH: &str = "/usr/share/java/verapdf/verapdf";

/// Every tool a scraper or detector may invoke, with the argument that
/// makes it print its version.
pub const KNOWN_TOOLS: &[(&str, &str)] = &[
    ("file", "--version"),
    ("ffprobe", "-version"),
    ("jhove", "-v"),
    ("verapdf", "--version"),
    ("xmllint", "--version"),
    ("xsltproc", "--version"),
    ("soffice", "--version"),
];

/// Information about an external tool.
#[derive(Debug, Clone)]
pub struct ToolInfo {
    /// Name of the tool.
    pub name: String,
    /// Whether the tool is available.
    pub available: bool,
    /// Version string if available.
    pub version: Option<String>,
    /// Path to the tool executable.
    pub path: Option<PathBuf>,
}

/// Check if a tool is available and get its information.
///
/// # Example
///
/// ```no_run
/// use filescraper_common::ToolsConfig;
/// use filescraper_tools::check_tool;
///
/// let info = check_tool("ffprobe", "-version", &ToolsConfig::default());
/// if info.available {
///     println!("ffprobe version: {:?}", info.version);
/// }
/// ```
pub fn check_tool(name: &str, version_arg: &str, config: &ToolsConfig) -> ToolInfo {
    let Ok(path) = get_tool_path(name, config) else {
        return ToolInfo {
            name: name.to_string(),
            available: false,
            version: None,
            path: None,
        };
    };

    // Some tools print their version on stderr, some exit non-zero after
    // printing it. Take the first line wherever it shows up.
    let version = ToolCommand::new(&path)
        .arg(version_arg)
        .execute()
        .ok()
        .and_then(|output| {
            output
                .stdout
                .lines()
                .chain(output.stderr.lines())
                .map(str::trim)
                .find(|line| !line.is_empty())
                .map(str::to_string)
        });

    ToolInfo {
        name: name.to_string(),
        available: true,
        version,
        path: Some(path),
    }
}

/// Check every tool the scrapers rely on.
pub fn check_tools(config: &ToolsConfig) -> Vec<ToolInfo> {
    KNOWN_TOOLS
        .iter()
        .map(|(name, arg)| check_tool(name, arg, config))
        .collect()
}

/// Require that a tool is available on `PATH`, returning its path.
///
/// # Errors
///
/// Returns an error if the tool is not found.
pub fn require_tool(name: &str) -> Result<PathBuf> {
    which::which(name).map_err(|_| Error::tool_not_found(name))
}

/// Get the path to a tool, preferring a configured path over PATH lookup.
pub fn get_tool_path(name: &str, config: &ToolsConfig) -> Result<PathBuf> {
    if let Some(path) = config.path_for(name) {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        tracing::warn!(tool = name, path = %path.display(), "configured tool path does not exist");
    }

    if name == "verapdf" && Path::new(VERAPDF_DEFAULT_PATH).exists() {
        return Ok(PathBuf::from(VERAPDF_DEFAULT_PATH));
    }

    require_tool(name)
}
