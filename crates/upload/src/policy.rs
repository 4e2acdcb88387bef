//! Admission rules applied to a selection before anything is staged.
//!
//! A file that fails admission never becomes an [`UploadItem`](crate::UploadItem);
//! it is reported as a [`Rejection`] naming the file and the reason.

use crate::consts::MIB;
use crate::source::SourceFile;
use derive_more::Display;

/// What kind of asset a batch holds.
#[derive(Clone, Copy, Debug, Default, Display, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum MediaKind {
    /// Gallery photos: any `image/*` media type.
    #[default]
    #[display("image")]
    Image,
    /// Brochures and floor plans: exactly `application/pdf`.
    #[display("document")]
    Document,
}
impl MediaKind {
    pub fn accepts(&self, media_type: &str) -> bool {
        match self {
            Self::Image => media_type.starts_with("image/"),
            Self::Document => media_type == "application/pdf",
        }
    }

    /// Extension used when a file name doesn't provide a usable one.
    pub fn default_extension(&self) -> &'static str {
        match self {
            Self::Image => "jpg",
            Self::Document => "pdf",
        }
    }

    pub fn default_limits(&self) -> Limits {
        match self {
            Self::Image => Limits::images(),
            Self::Document => Limits::documents(),
        }
    }
}

/// Size and count limits for one batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Limits {
    /// Largest accepted file, in bytes.
    pub max_file_bytes: u64,
    /// Most items the batch may hold, counting those already in it.
    pub max_items: usize,
    /// Cap on the combined size of the whole batch, if any.
    #[cfg_attr(feature = "serde", serde(default))]
    pub max_batch_bytes: Option<u64>,
}
impl Limits {
    /// Gallery defaults: 100 MiB per photo, 20 photos.
    pub const fn images() -> Self {
        Self {
            max_file_bytes: 100 * MIB,
            max_items: 20,
            max_batch_bytes: None,
        }
    }

    /// Brochure defaults: a single PDF of up to 100 MiB.
    pub const fn documents() -> Self {
        Self {
            max_file_bytes: 100 * MIB,
            max_items: 1,
            max_batch_bytes: None,
        }
    }

    /// The stricter limits of the older inline image forms: 1 MiB per file,
    /// 10 MiB for the whole batch.
    pub const fn legacy_inline() -> Self {
        Self {
            max_file_bytes: MIB,
            max_items: 20,
            max_batch_bytes: Some(10 * MIB),
        }
    }
}
impl Default for Limits {
    fn default() -> Self {
        Self::images()
    }
}

/// Why a file was turned away.
#[derive(Clone, Debug, Display, PartialEq, Eq)]
pub enum RejectReason {
    #[display("{found} is not an accepted {expected} type")]
    UnsupportedType { found: String, expected: MediaKind },
    #[display("{} exceeds the {} limit", megabytes(*size), megabytes(*limit))]
    TooLarge { size: u64, limit: u64 },
    #[display("no room left, at most {max} files are allowed")]
    NoSlotsLeft { max: usize },
    #[display("the batch would exceed its {} limit", megabytes(*limit))]
    BatchTooLarge { limit: u64 },
}

/// A file that failed admission.
#[derive(Clone, Debug, Display, PartialEq, Eq)]
#[display("{file}: {reason}")]
pub struct Rejection {
    pub file: String,
    pub reason: RejectReason,
}

/// The outcome of admitting a selection: admitted files keep their
/// selection order.
#[derive(Debug, Default)]
pub struct Admission {
    pub admitted: Vec<SourceFile>,
    pub rejected: Vec<Rejection>,
}

/// Admission rules for one kind of asset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Policy {
    kind: MediaKind,
    limits: Limits,
}
impl Policy {
    pub fn new(kind: MediaKind, limits: Limits) -> Self {
        Self { kind, limits }
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Check `files` in selection order against the policy, given what the
    /// batch already holds.
    ///
    /// Type and size are checked first, so an oversized file never uses up
    /// a slot. Once the batch is full, every remaining valid file is
    /// rejected with [`RejectReason::NoSlotsLeft`].
    pub fn admit(&self, files: impl IntoIterator<Item = SourceFile>, existing_items: usize, existing_bytes: u64) -> Admission {
        let mut admission = Admission::default();
        let mut slots = self.limits.max_items.saturating_sub(existing_items);
        let mut total = existing_bytes;
        for file in files {
            match self.check(&file, slots, total) {
                Some(reason) => admission.rejected.push(Rejection {
                    file: file.name().to_string(),
                    reason,
                }),
                None => {
                    slots -= 1;
                    total = total.saturating_add(file.size());
                    admission.admitted.push(file);
                },
            }
        }
        admission
    }

    fn check(&self, file: &SourceFile, slots: usize, total: u64) -> Option<RejectReason> {
        if !self.kind.accepts(file.media_type()) {
            return Some(RejectReason::UnsupportedType {
                found: file.media_type().to_string(),
                expected: self.kind,
            });
        }
        if file.size() > self.limits.max_file_bytes {
            return Some(RejectReason::TooLarge {
                size: file.size(),
                limit: self.limits.max_file_bytes,
            });
        }
        if slots == 0 {
            return Some(RejectReason::NoSlotsLeft { max: self.limits.max_items });
        }
        if let Some(limit) = self.limits.max_batch_bytes
            && total.saturating_add(file.size()) > limit
        {
            return Some(RejectReason::BatchTooLarge { limit });
        }
        None
    }
}
impl From<MediaKind> for Policy {
    fn from(kind: MediaKind) -> Self {
        Self::new(kind, kind.default_limits())
    }
}

/// Render a byte count the way users expect to read it: `100MB`, `1.5MB`.
fn megabytes(bytes: u64) -> String {
    let tenths = (u128::from(bytes) * 10).div_ceil(u128::from(MIB));
    match tenths % 10 {
        0 => format!("{}MB", tenths / 10),
        rest => format!("{}.{rest}MB", tenths / 10),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn file(name: &str, media_type: &str, size: usize) -> SourceFile {
        SourceFile::from_bytes(name, media_type, vec![0u8; size])
    }

    /// A sparse file on disk, so huge sizes don't need huge allocations.
    async fn sparse(dir: &tempfile::TempDir, name: &str, size: u64) -> SourceFile {
        let path = dir.path().join(name);
        std::fs::File::create(&path).unwrap().set_len(size).unwrap();
        SourceFile::open(&path).await.unwrap()
    }

    #[rstest]
    #[case(MediaKind::Image, "image/jpeg", true)]
    #[case(MediaKind::Image, "image/svg+xml", true)]
    #[case(MediaKind::Image, "application/pdf", false)]
    #[case(MediaKind::Image, "imagex/png", false)]
    #[case(MediaKind::Document, "application/pdf", true)]
    #[case(MediaKind::Document, "application/pdf+x", false)]
    #[case(MediaKind::Document, "image/png", false)]
    fn test_accepts(#[case] kind: MediaKind, #[case] media_type: &str, #[case] expected: bool) {
        assert_eq!(kind.accepts(media_type), expected);
    }

    #[rstest]
    #[case(100 * MIB, "100MB")]
    #[case(MIB, "1MB")]
    #[case(MIB + MIB / 2, "1.5MB")]
    #[case(150 * MIB, "150MB")]
    #[case(1, "0.1MB")]
    #[case(u64::MAX, "17592186044416MB")]
    fn test_megabytes(#[case] bytes: u64, #[case] expected: &str) {
        assert_eq!(megabytes(bytes), expected);
    }

    #[test]
    fn test_admits_in_selection_order() {
        let policy = Policy::from(MediaKind::Image);
        let files = (0..5).map(|i| file(&format!("{i}.jpg"), "image/jpeg", 10));
        let admission = policy.admit(files, 0, 0);
        let names: Vec<_> = admission.admitted.iter().map(SourceFile::name).collect();
        assert_eq!(names, ["0.jpg", "1.jpg", "2.jpg", "3.jpg", "4.jpg"]);
        assert!(admission.rejected.is_empty());
    }

    #[tokio::test]
    async fn test_rejects_oversized_image() {
        let dir = tempfile::tempdir().unwrap();
        let policy = Policy::from(MediaKind::Image);
        let admission = policy.admit([sparse(&dir, "huge.jpg", 150 * MIB).await], 0, 0);
        assert!(admission.admitted.is_empty());
        assert_eq!(admission.rejected.len(), 1);
        let rejection = &admission.rejected[0];
        assert_eq!(rejection.reason, RejectReason::TooLarge { size: 150 * MIB, limit: 100 * MIB });
        assert_eq!(rejection.to_string(), "huge.jpg: 150MB exceeds the 100MB limit");
    }

    #[test]
    fn test_rejects_wrong_type() {
        let policy = Policy::from(MediaKind::Document);
        let admission = policy.admit([file("plan.png", "image/png", 10), file("plan.pdf", "application/pdf", 10)], 0, 0);
        assert_eq!(admission.admitted.len(), 1);
        assert_eq!(admission.rejected[0].to_string(), "plan.png: image/png is not an accepted document type");
    }

    #[test]
    fn test_rejects_past_remaining_slots() {
        let policy = Policy::new(MediaKind::Image, Limits { max_items: 4, ..Limits::images() });
        let files = [
            file("a.jpg", "image/jpeg", 1),
            file("b.txt", "text/plain", 1),
            file("c.jpg", "image/jpeg", 1),
            file("d.jpg", "image/jpeg", 1),
        ];
        let admission = policy.admit(files, 2, 0);
        let names: Vec<_> = admission.admitted.iter().map(SourceFile::name).collect();
        assert_eq!(names, ["a.jpg", "c.jpg"]);
        assert_eq!(admission.rejected.len(), 2);
        assert_eq!(admission.rejected[1].reason, RejectReason::NoSlotsLeft { max: 4 });
    }

    #[test]
    fn test_single_document_slot() {
        let policy = Policy::from(MediaKind::Document);
        let admission = policy.admit([file("brochure.pdf", "application/pdf", 1)], 1, 0);
        assert!(admission.admitted.is_empty());
        assert_eq!(admission.rejected[0].reason, RejectReason::NoSlotsLeft { max: 1 });
    }

    #[test]
    fn test_legacy_batch_cap() {
        let policy = Policy::new(MediaKind::Image, Limits::legacy_inline());
        let chunk = (MIB - 1) as usize;
        let files = (0..3).map(|i| file(&format!("{i}.png"), "image/png", chunk));
        // 8 MiB already staged; two more files fit, the third does not.
        let admission = policy.admit(files, 8, 8 * MIB);
        assert_eq!(admission.admitted.len(), 2);
        assert_eq!(admission.rejected[0].reason, RejectReason::BatchTooLarge { limit: 10 * MIB });
        assert_eq!(admission.rejected[0].to_string(), "2.png: the batch would exceed its 10MB limit");
    }

    #[test]
    fn test_legacy_per_file_cap() {
        let policy = Policy::new(MediaKind::Image, Limits::legacy_inline());
        let admission = policy.admit([file("big.png", "image/png", (MIB + 1) as usize)], 0, 0);
        assert!(matches!(admission.rejected[0].reason, RejectReason::TooLarge { .. }));
    }
}
