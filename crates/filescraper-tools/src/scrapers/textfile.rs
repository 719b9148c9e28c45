//! Plain text check with the `file` utility.

use filescraper_common::{Result, Scraper, ScraperArgs, ScraperState};

use crate::command::ToolCommand;
use crate::tools::get_tool_path;

/// Whether `file`'s MIME type and encoding answers describe text.
fn is_text(mimetype: &str, encoding: &str) -> bool {
    mimetype.starts_with("text/") && encoding != "binary" && !encoding.is_empty()
}

/// Answers "is this a text file" and nothing else; it yields no streams
/// and is not registered for scraper selection.
#[derive(Debug)]
pub struct TextfileScraper {
    state: ScraperState,
}

impl TextfileScraper {
    pub fn new(args: ScraperArgs) -> Self {
        Self {
            state: ScraperState::new(args),
        }
    }

    fn query(&mut self, flag: &str) -> Result<Option<String>> {
        let file = get_tool_path("file", self.state.tools())?;
        let output = ToolCommand::new(file)
            .args(["-b", flag])
            .arg(self.state.path())
            .execute()?;
        if !output.success() {
            self.state.error(output.stderr.trim());
            return Ok(None);
        }
        Ok(Some(output.stdout.trim().to_string()))
    }
}

impl Scraper for TextfileScraper {
    fn name(&self) -> &'static str {
        "TextfileScraper"
    }

    scraper_state!();

    fn run(&mut self) -> Result<()> {
        let Some(mimetype) = self.query("--mime-type")? else {
            return Ok(());
        };
        let Some(encoding) = self.query("--mime-encoding")? else {
            return Ok(());
        };
        if is_text(&mimetype, &encoding) {
            self.state.message("File is a text file.");
        } else {
            self.state.error(format!(
                "File is not a text file: {mimetype}; charset={encoding}"
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_text() {
        assert!(is_text("text/plain", "us-ascii"));
        assert!(is_text("text/xml", "utf-8"));
        assert!(!is_text("text/plain", "binary"));
        assert!(!is_text("application/pdf", "binary"));
        assert!(!is_text("image/png", "binary"));
        assert!(!is_text("text/plain", ""));
    }

    #[test]
    fn test_missing_file_reports_error() {
        let mut scraper = TextfileScraper::new(ScraperArgs::new("/nonexistent/file.txt", true));
        match scraper.scrape_file() {
            Ok(()) => assert_ne!(scraper.well_formed(), Some(true)),
            Err(e) => assert!(e.is_fatal()),
        }
    }
}
