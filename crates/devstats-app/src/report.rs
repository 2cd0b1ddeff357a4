/// Markdown report assembly.
///
/// Joins the export summaries of every collector under a header naming the
/// scanned folder and the generation time.
use chrono::{DateTime, Local};
use devstats_core::collector::SharedCollector;
use std::fmt::Write as _;
use std::path::Path;

/// Separator placed between collector sections.
const SECTION_SEPARATOR: &str = "\n---\n\n";

/// Render the full report.
///
/// Collectors appear in registration order; each contributes its own
/// `export_summary` text unchanged.
pub fn markdown_report(
    root: Option<&Path>,
    generated_at: DateTime<Local>,
    collectors: &[SharedCollector],
) -> String {
    let mut md = String::new();
    md.push_str("# Developer Statistics\n\n");
    if let Some(root) = root {
        let _ = writeln!(md, "- **Folder:** `{}`", root.display());
    }
    let _ = writeln!(
        md,
        "- **Generated:** {}",
        generated_at.format("%Y-%m-%d %H:%M:%S")
    );

    for collector in collectors {
        md.push_str(SECTION_SEPARATOR);
        md.push_str(&collector.lock().export_summary());
    }
    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use devstats_core::collector::{self, ExtensionCollector, SourceFileCollector};

    #[test]
    fn report_has_header_and_every_section() {
        let (_, extensions) = collector::share(ExtensionCollector::new());
        let (_, sources) = collector::share(SourceFileCollector::new("cs"));
        let generated = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 0).unwrap();

        let md = markdown_report(Some(Path::new("/repo")), generated, &[extensions, sources]);

        assert!(md.starts_with("# Developer Statistics\n"));
        assert!(md.contains("- **Folder:** `/repo`"));
        assert!(md.contains("- **Generated:** 2024-03-09 14:05:00"));
        let extensions_at = md.find("# File Extensions").unwrap();
        let sources_at = md.find("# CS File Statistics").unwrap();
        assert!(extensions_at < sources_at);
        assert_eq!(md.matches(SECTION_SEPARATOR).count(), 2);
    }

    #[test]
    fn report_without_root_or_collectors() {
        let generated = Local.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let md = markdown_report(None, generated, &[]);
        assert!(!md.contains("**Folder:**"));
        assert!(md.contains("**Generated:**"));
    }
}
