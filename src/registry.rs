//! The built-in detectors and scrapers, in priority order.

use filescraper_common::Registry;
use filescraper_tools::detectors::{MagicBytesDetector, MagicDetector};
use filescraper_tools::scrapers::{
    CsvScraper, FfmpegScraper, JHoveScraper, OfficeScraper, SchematronScraper, VerapdfScraper,
    XmlEncodingScraper, XmllintScraper,
};

/// Registry of every built-in detector and scraper.
///
/// Detectors run in the order listed: `file` first, magic bytes only fill
/// in what it left open. Scrapers run in the order listed and the first
/// one to report a field keeps it, unless a later one marks its value
/// important.
pub fn default_registry() -> Registry {
    Registry::new()
        .detector(MagicDetector::ENTRY)
        .detector(MagicBytesDetector::ENTRY)
        .scraper(JHoveScraper::GIF)
        .scraper(JHoveScraper::HTML)
        .scraper(JHoveScraper::JPEG)
        .scraper(JHoveScraper::TIFF)
        .scraper(JHoveScraper::PDF)
        .scraper(JHoveScraper::WAV)
        .scraper(VerapdfScraper::ENTRY)
        .scraper(FfmpegScraper::ENTRY)
        .scraper(XmllintScraper::ENTRY)
        .scraper(XmlEncodingScraper::ENTRY)
        .scraper(SchematronScraper::ENTRY)
        .scraper(OfficeScraper::ENTRY)
        .scraper(CsvScraper::ENTRY)
        .utf8_check(JHoveScraper::UTF8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use filescraper_common::{Params, ScraperArgs};

    fn selected(mime: &str, version: Option<&str>, check: bool, params: &Params) -> Vec<&'static str> {
        default_registry()
            .iter_scrapers(Some(mime), version, check, params)
            .map(|e| e.name)
            .collect()
    }

    #[test]
    fn test_pdf_selects_jhove_then_verapdf() {
        let names = selected("application/pdf", Some("A-1b"), true, &Params::new());
        assert_eq!(names, vec!["JHovePdfScraper", "VerapdfScraper"]);
        let names = selected("application/pdf", Some("1.4"), true, &Params::new());
        assert_eq!(names, vec!["JHovePdfScraper"]);
    }

    #[test]
    fn test_xml_scrapers() {
        let params = Params::new();
        assert_eq!(
            selected("text/xml", Some("1.0"), true, &params),
            vec!["XmllintScraper", "XmlEncodingScraper"]
        );
        assert_eq!(selected("text/xml", Some("1.0"), false, &params), vec!["XmllintScraper"]);

        let params = Params::new().with("schematron", "/rules/mets.sch");
        assert!(selected("text/xml", Some("1.0"), true, &params).contains(&"SchematronScraper"));
    }

    #[test]
    fn test_csv_runs_without_wellformed_check() {
        assert_eq!(selected("text/csv", None, false, &Params::new()), vec!["CsvScraper"]);
    }

    #[test]
    fn test_unknown_type_selects_nothing() {
        assert!(selected("application/x-unknown", None, true, &Params::new()).is_empty());
    }

    #[test]
    fn test_detector_order() {
        let registry = default_registry();
        let names: Vec<_> = registry.iter_detectors().map(|e| e.name).collect();
        assert_eq!(names, vec!["MagicDetector", "MagicBytesDetector"]);
        assert_eq!(registry.utf8_scraper().map(|e| e.name), Some("JHoveUtf8Scraper"));
    }

    #[test]
    fn test_built_scrapers_agree_with_entries() {
        let entries = [
            JHoveScraper::GIF,
            JHoveScraper::HTML,
            JHoveScraper::JPEG,
            JHoveScraper::TIFF,
            JHoveScraper::PDF,
            JHoveScraper::WAV,
            JHoveScraper::UTF8,
            VerapdfScraper::ENTRY,
            FfmpegScraper::ENTRY,
            XmllintScraper::ENTRY,
            XmlEncodingScraper::ENTRY,
            SchematronScraper::ENTRY,
            OfficeScraper::ENTRY,
            CsvScraper::ENTRY,
        ];
        for entry in entries {
            let scraper = (entry.build)(ScraperArgs::new("file", false));
            assert_eq!(scraper.name(), entry.name);
            assert_eq!(
                scraper.only_wellformed(),
                entry.only_wellformed,
                "{} disagrees with its entry",
                entry.name
            );
        }
    }
}
