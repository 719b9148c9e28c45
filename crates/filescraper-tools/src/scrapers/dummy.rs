//! Scrapers that do not inspect file contents.

use filescraper_common::{Result, Scraper, ScraperArgs, ScraperState};

/// Error recorded when no scraper accepts the detected file type.
pub const SCRAPER_NOT_FOUND: &str = "Proper scraper was not found. The file was not analyzed.";

/// Checks that the file exists. Always runs first.
#[derive(Debug)]
pub struct FileExists {
    state: ScraperState,
}

impl FileExists {
    pub fn new(args: ScraperArgs) -> Self {
        Self {
            state: ScraperState::new(args),
        }
    }
}

impl Scraper for FileExists {
    fn name(&self) -> &'static str {
        "FileExists"
    }

    scraper_state!();

    fn run(&mut self) -> Result<()> {
        let path = self.state.path().to_path_buf();
        if path.as_os_str().is_empty() {
            self.state.error("No filename given.");
        } else if path.is_file() {
            self.state
                .message(format!("File {} was found.", path.display()));
        } else {
            self.state
                .error(format!("File {} does not exist.", path.display()));
        }
        Ok(())
    }

    /// Only a missing file is an outcome; finding it says nothing about
    /// well-formedness.
    fn well_formed(&self) -> Option<bool> {
        if self.state.errors().is_empty() {
            None
        } else {
            Some(false)
        }
    }
}

/// Stand-in run when no registered scraper accepts the file type.
#[derive(Debug)]
pub struct ScraperNotFound {
    state: ScraperState,
}

impl ScraperNotFound {
    pub fn new(args: ScraperArgs) -> Self {
        Self {
            state: ScraperState::new(args),
        }
    }
}

impl Scraper for ScraperNotFound {
    fn name(&self) -> &'static str {
        "ScraperNotFound"
    }

    scraper_state!();

    fn run(&mut self) -> Result<()> {
        self.state.error(SCRAPER_NOT_FOUND);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_exists() {
        let file = tempfile::NamedTempFile::new().unwrap();
        for check in [true, false] {
            let mut scraper = FileExists::new(ScraperArgs::new(file.path(), check));
            scraper.scrape_file().unwrap();
            assert_eq!(scraper.well_formed(), None);
            assert!(scraper.messages()[0].ends_with("was found."));
            assert!(scraper.records().is_empty());
        }
    }

    #[test]
    fn test_file_missing() {
        for check in [true, false] {
            let mut scraper = FileExists::new(ScraperArgs::new("/nonexistent/file.pdf", check));
            scraper.scrape_file().unwrap();
            assert_eq!(scraper.well_formed(), Some(false));
            assert_eq!(
                scraper.errors(),
                vec!["File /nonexistent/file.pdf does not exist."]
            );
        }
    }

    #[test]
    fn test_no_filename() {
        let mut scraper = FileExists::new(ScraperArgs::new("", true));
        scraper.scrape_file().unwrap();
        assert_eq!(scraper.errors(), vec!["No filename given."]);
        assert_eq!(scraper.well_formed(), Some(false));
    }

    #[test]
    fn test_scraper_not_found() {
        let mut scraper = ScraperNotFound::new(ScraperArgs::new("file.xyz", true));
        scraper.scrape_file().unwrap();
        assert_eq!(scraper.errors(), vec![SCRAPER_NOT_FOUND]);
        assert_eq!(scraper.well_formed(), Some(false));
        assert!(scraper.records().is_empty());
        assert_eq!(scraper.info().class, "ScraperNotFound");
    }
}
