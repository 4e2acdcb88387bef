//! Remote object keys.
//!
//! Every uploaded file lands at `{project}/{folder}/{timestamp_ms}-{index}.{ext}`.
//! One timestamp is taken per submission, so keys within a submission only
//! differ by the index of the file in that submission. Timestamps never
//! repeat within a process, so two submissions never share one.

use crate::consts::{DISALLOWED_REGEX, EXTENSION_REGEX, HYPHENS_REGEX, WHITESPACE_REGEX};
use crate::error::{ErrorKind, Result};
use crate::policy::MediaKind;
use crate::source::SourceFile;
use exn::ResultExt;
use std::sync::atomic::{AtomicU64, Ordering};
use time::OffsetDateTime;

const PROJECT_FALLBACK: &str = "project";
const FOLDER_FALLBACK: &str = "uploads";

/// Reduce free text to a lowercase, hyphen-separated path segment containing
/// only `[a-z0-9-]`. Returns an empty string when nothing survives.
///
/// ```
/// assert_eq!(brick_upload::naming::normalize_segment("Floor Plans (2nd)"), "floor-plans-2nd");
/// ```
pub fn normalize_segment(text: &str) -> String {
    let lowered = text.to_lowercase();
    let hyphenated = WHITESPACE_REGEX.replace_all(&lowered, "-");
    let stripped = DISALLOWED_REGEX.replace_all(&hyphenated, "");
    let collapsed = HYPHENS_REGEX.replace_all(&stripped, "-");
    collapsed.trim_matches('-').to_string()
}

/// Path segment for a project name, falling back to `project`.
pub fn normalize_project(name: &str) -> String {
    with_fallback(normalize_segment(name), PROJECT_FALLBACK)
}

fn with_fallback(segment: String, fallback: &str) -> String {
    if segment.is_empty() { fallback.to_string() } else { segment }
}

static LAST_TIMESTAMP: AtomicU64 = AtomicU64::new(0);

/// Milliseconds since the Unix epoch, strictly increasing across calls.
///
/// Calls landing in the same millisecond (or a clock stepping backwards)
/// get the previous value plus one.
pub fn timestamp_ms() -> u64 {
    let millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
    let now = u64::try_from(millis).unwrap_or_default();
    match LAST_TIMESTAMP.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |last| Some(now.max(last + 1))) {
        Ok(last) | Err(last) => now.max(last + 1),
    }
}

/// Builds object keys for one project folder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectNamer {
    project: String,
    folder: String,
    kind: MediaKind,
}
impl ObjectNamer {
    pub fn new(project: &str, folder: &str, kind: MediaKind) -> Self {
        Self {
            project: normalize_project(project),
            folder: with_fallback(normalize_segment(folder), FOLDER_FALLBACK),
            kind,
        }
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn folder(&self) -> &str {
        &self.folder
    }

    /// Key for the `index`-th file of a submission started at `timestamp_ms`.
    pub fn name(&self, file: &SourceFile, index: usize, timestamp_ms: u64) -> Result<String> {
        let ext = self.extension(file);
        let key = format!("{}/{}/{timestamp_ms}-{index}.{ext}", self.project, self.folder);
        Ok(brick_storage::validate_key(&key).or_raise(|| ErrorKind::Naming(file.name().to_string()))?)
    }

    fn extension(&self, file: &SourceFile) -> String {
        match self.kind {
            MediaKind::Document => self.kind.default_extension().to_string(),
            MediaKind::Image => file
                .extension()
                .filter(|ext| EXTENSION_REGEX.is_match(ext))
                .unwrap_or_else(|| self.kind.default_extension().to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::HashSet;

    #[rstest]
    #[case("  My Home!! Apas  ", "my-home-apas")]
    #[case("Villa\tSol\n  Norte", "villa-sol-norte")]
    #[case("ÁTICO Centro", "tico-centro")]
    #[case("a -- b", "a-b")]
    #[case("--edge--", "edge")]
    #[case("already-clean-42", "already-clean-42")]
    #[case("!!!", "")]
    #[case("", "")]
    fn test_normalize_segment(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize_segment(input), expected);
    }

    #[rstest]
    #[case("  My Home!! Apas  ", "my-home-apas")]
    #[case("   ", "project")]
    #[case("???", "project")]
    fn test_normalize_project(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize_project(input), expected);
    }

    #[rstest]
    #[case(MediaKind::Image, "Living Room.JPG", "jpg")]
    #[case(MediaKind::Image, "balcony.webp", "webp")]
    #[case(MediaKind::Image, "no-extension", "jpg")]
    #[case(MediaKind::Image, "odd.j p g", "jpg")]
    #[case(MediaKind::Image, "weird.ünï", "jpg")]
    #[case(MediaKind::Document, "brochure.PDF", "pdf")]
    #[case(MediaKind::Document, "brochure", "pdf")]
    fn test_extension(#[case] kind: MediaKind, #[case] name: &str, #[case] expected: &str) {
        let namer = ObjectNamer::new("p", "f", kind);
        let file = SourceFile::from_bytes(name, "image/jpeg", Vec::new());
        let key = namer.name(&file, 0, 1).unwrap();
        assert_eq!(key, format!("p/f/1-0.{expected}"));
    }

    #[test]
    fn test_key_layout() {
        let namer = ObjectNamer::new("  My Home!! Apas  ", "Gallery", MediaKind::Image);
        let file = SourceFile::from_bytes("kitchen.png", "image/png", Vec::new());
        let key = namer.name(&file, 4, 1_700_000_000_123).unwrap();
        assert_eq!(key, "my-home-apas/gallery/1700000000123-4.png");
    }

    #[test]
    fn test_folder_fallback() {
        let namer = ObjectNamer::new("Casa", "../..", MediaKind::Document);
        assert_eq!(namer.folder(), "uploads");
        let file = SourceFile::from_bytes("b.pdf", "application/pdf", Vec::new());
        assert_eq!(namer.name(&file, 0, 5).unwrap(), "casa/uploads/5-0.pdf");
    }

    #[test]
    fn test_keys_unique_within_submission() {
        let namer = ObjectNamer::new("casa", "gallery", MediaKind::Image);
        let file = SourceFile::from_bytes("same.jpg", "image/jpeg", Vec::new());
        let timestamp = timestamp_ms();
        let keys: HashSet<_> = (0..20).map(|index| namer.name(&file, index, timestamp).unwrap()).collect();
        assert_eq!(keys.len(), 20);
    }

    #[test]
    fn test_timestamps_never_repeat() {
        let stamps: Vec<u64> = (0..1000).map(|_| timestamp_ms()).collect();
        assert!(stamps.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn test_timestamp_is_recent() {
        // 2020-01-01T00:00:00Z
        assert!(timestamp_ms() > 1_577_836_800_000);
    }
}
