//! Scratch directories for tools that write files.

use crate::{Error, Result};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Scratch directory for a tool run against one input file.
///
/// Conversions and compiled stylesheets land here instead of next to the
/// file being scraped. Everything is removed when the workspace drops.
///
/// # Example
///
/// ```no_run
/// use filescraper_tools::Workspace;
///
/// let workspace = Workspace::new("/path/to/report.odt")?;
/// // soffice --convert-to pdf --outdir <temp_dir> report.odt
/// let pdf = workspace.converted("pdf");
/// assert!(pdf.ends_with("report.pdf"));
/// # Ok::<(), filescraper_tools::Error>(())
/// ```
pub struct Workspace {
    temp_dir: TempDir,
    input_path: PathBuf,
}

impl Workspace {
    /// Create a new workspace for the given input file.
    pub fn new<P: AsRef<Path>>(input: P) -> Result<Self> {
        let input = input.as_ref();
        if input.file_name().is_none() {
            return Err(Error::Workspace(format!(
                "Invalid input file path: {}",
                input.display()
            )));
        }
        let temp_dir = tempfile::Builder::new()
            .prefix("filescraper-")
            .tempdir()
            .map_err(|e| Error::Workspace(e.to_string()))?;

        Ok(Self {
            temp_dir,
            input_path: input.to_path_buf(),
        })
    }

    /// Get the temp directory path.
    pub fn temp_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Create a temp file path with the given name.
    pub fn temp_file(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }

    /// Where a converter writing into [`Workspace::temp_dir`] puts its
    /// output: the input's stem with the new extension.
    pub fn converted(&self, extension: &str) -> PathBuf {
        let mut name = self
            .input_path
            .file_stem()
            .map(|s| s.to_os_string())
            .unwrap_or_default();
        // Not `with_extension`: stems like "valid_1.1" contain dots.
        name.push(".");
        name.push(extension);
        self.temp_dir.path().join(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_workspace_paths() {
        let temp_file = NamedTempFile::new().unwrap();
        let workspace = Workspace::new(temp_file.path()).unwrap();

        assert!(workspace.temp_dir().is_dir());
        assert_ne!(workspace.temp_dir(), temp_file.path().parent().unwrap());
    }

    #[test]
    fn test_temp_file() {
        let temp_file = NamedTempFile::new().unwrap();
        let workspace = Workspace::new(temp_file.path()).unwrap();

        let intermediate = workspace.temp_file("rules.compiled.xsl");
        assert!(intermediate.starts_with(workspace.temp_dir()));
        assert_eq!(intermediate.file_name().unwrap(), "rules.compiled.xsl");
    }

    #[test]
    fn test_converted_name() {
        let workspace = Workspace::new("/data/valid_1.1.odt").unwrap();
        let pdf = workspace.converted("pdf");
        assert!(pdf.starts_with(workspace.temp_dir()));
        assert_eq!(pdf.file_name().unwrap(), "valid_1.1.pdf");
    }

    #[test]
    fn test_removed_on_drop() {
        let workspace = Workspace::new("/data/a.doc").unwrap();
        let dir = workspace.temp_dir().to_path_buf();
        drop(workspace);
        assert!(!dir.exists());
    }
}
