mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let mut config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    expand_paths(&mut config)?;
    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    // Try default locations
    let default_paths = [
        "./filescraper.toml",
        "~/.config/filescraper/config.toml",
        "/etc/filescraper/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    // Return default config if no file found
    Ok(Config::default())
}

fn expand(path: &mut Option<PathBuf>) -> Result<()> {
    if let Some(p) = path {
        let raw = p.to_string_lossy().into_owned();
        let expanded = shellexpand::full(&raw)
            .with_context(|| format!("Failed to expand path: {}", raw))?;
        *p = PathBuf::from(expanded.as_ref());
    }
    Ok(())
}

/// Expand `~` and environment variables in every configured path
fn expand_paths(config: &mut Config) -> Result<()> {
    let tools = &mut config.tools;
    for path in [
        &mut tools.file_path,
        &mut tools.ffprobe_path,
        &mut tools.jhove_path,
        &mut tools.verapdf_path,
        &mut tools.xmllint_path,
        &mut tools.xsltproc_path,
        &mut tools.soffice_path,
        &mut tools.schematron_xsl_dir,
        &mut tools.schematron_cache_dir,
        &mut config.schematron.xsl_dir,
        &mut config.schematron.cache_dir,
    ] {
        expand(path)?;
    }
    Ok(())
}

/// Validate configuration
fn validate_config(config: &Config) -> Result<()> {
    // Missing tool paths fall back to PATH at lookup time
    for (name, path) in [
        ("file", &config.tools.file_path),
        ("ffprobe", &config.tools.ffprobe_path),
        ("jhove", &config.tools.jhove_path),
        ("verapdf", &config.tools.verapdf_path),
        ("xmllint", &config.tools.xmllint_path),
        ("xsltproc", &config.tools.xsltproc_path),
        ("soffice", &config.tools.soffice_path),
    ] {
        if let Some(path) = path {
            if !path.exists() {
                tracing::warn!("Configured {} path does not exist: {:?}", name, path);
            }
        }
    }

    if let Some(dir) = &config.schematron.xsl_dir {
        if !dir.is_dir() {
            anyhow::bail!("Schematron xsl_dir is not a directory: {:?}", dir);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.scrape.check_wellformed);
        assert!(config.tools.jhove_path.is_none());

        let file = write_config("");
        let config = load_config(file.path()).unwrap();
        assert!(config.scrape.check_wellformed);
    }

    #[test]
    fn test_full_config() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_config(&format!(
            r#"
[scrape]
check_wellformed = false

[tools]
jhove_path = "/opt/jhove/jhove"

[schematron]
xsl_dir = "{}"
cache_dir = "/tmp/schematron-cache"
"#,
            dir.path().display()
        ));
        let config = load_config(file.path()).unwrap();
        assert!(!config.scrape.check_wellformed);
        assert_eq!(config.tools.jhove_path, Some(PathBuf::from("/opt/jhove/jhove")));

        let tools = config.tools_config();
        assert_eq!(tools.schematron_xsl_dir.as_deref(), Some(dir.path()));
        assert_eq!(
            tools.schematron_cache_dir,
            Some(PathBuf::from("/tmp/schematron-cache"))
        );
    }

    #[test]
    fn test_invalid_config() {
        let file = write_config("[scrape]\ncheck_wellformed = \"maybe\"\n");
        assert!(load_config(file.path()).is_err());

        let file = write_config("[schematron]\nxsl_dir = \"/nonexistent/xsl\"\n");
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn test_missing_custom_path() {
        assert!(load_config_or_default(Some(Path::new("/nonexistent/config.toml"))).is_err());
    }
}
