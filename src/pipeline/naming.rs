//! Output file naming: `<output_dir>/<stem>_page_<n>.png`.
//!
//! Names depend only on the document's file stem and the 1-based page number,
//! so rerunning a batch over the same folder produces the same set of paths.
//! Two documents with the same stem (`report.pdf` and `report.PDF`) map to
//! the same names; the later write wins.

use std::path::{Path, PathBuf};

/// Maps (document, page number) to a PNG path inside one output folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputNamer {
    output_dir: PathBuf,
}

impl OutputNamer {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Path for `page_number` (1-based) of `document`.
    pub fn name_for(&self, document: &Path, page_number: usize) -> PathBuf {
        self.output_dir
            .join(format!("{}_page_{}.png", base_name(document), page_number))
    }

    /// Paths for pages `1..=page_count`, in page order.
    pub fn names_for(&self, document: &Path, page_count: usize) -> Vec<PathBuf> {
        (1..=page_count)
            .map(|n| self.name_for(document, n))
            .collect()
    }
}

/// File name without its last extension.
pub fn base_name(document: &Path) -> String {
    document
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_three_pages() {
        let namer = OutputNamer::new("/out");
        let names = namer.names_for(Path::new("/in/report.pdf"), 3);
        assert_eq!(
            names,
            vec![
                PathBuf::from("/out/report_page_1.png"),
                PathBuf::from("/out/report_page_2.png"),
                PathBuf::from("/out/report_page_3.png"),
            ]
        );
    }

    #[test]
    fn only_last_extension_is_stripped() {
        let namer = OutputNamer::new("out");
        assert_eq!(
            namer.name_for(Path::new("v1.2.final.pdf"), 1),
            PathBuf::from("out/v1.2.final_page_1.png")
        );
    }

    #[test]
    fn dot_file_keeps_whole_name() {
        let namer = OutputNamer::new("out");
        assert_eq!(
            namer.name_for(Path::new("in/.pdf"), 1),
            PathBuf::from("out/.pdf_page_1.png")
        );
    }

    #[test]
    fn distinct_pages_distinct_paths() {
        let namer = OutputNamer::new("out");
        let mut names = namer.names_for(Path::new("doc.pdf"), 250);
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 250);
    }

    #[test]
    fn distinct_stems_do_not_collide() {
        let namer = OutputNamer::new("out");
        let a = namer.name_for(Path::new("a.pdf"), 1);
        let b = namer.name_for(Path::new("b.pdf"), 1);
        assert_ne!(a, b);
    }

    #[test]
    fn same_stem_collides() {
        let namer = OutputNamer::new("out");
        assert_eq!(
            namer.name_for(Path::new("x/report.pdf"), 2),
            namer.name_for(Path::new("y/report.PDF"), 2)
        );
    }

    #[test]
    fn naming_is_deterministic() {
        let namer = OutputNamer::new("out");
        let doc = Path::new("scan 01.pdf");
        assert_eq!(namer.names_for(doc, 4), namer.names_for(doc, 4));
        assert_eq!(
            namer.name_for(doc, 4),
            PathBuf::from("out/scan 01_page_4.png")
        );
    }
}
