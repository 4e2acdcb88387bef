use crate::source::SourceFile;
use crate::upload::Outcome;
use derive_more::Display;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of an item for as long as it lives in a batch, independent of
/// its position.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[display("#{_0}")]
pub struct ItemId(u64);
impl ItemId {
    pub(crate) fn next() -> Self {
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Clone, Debug)]
pub enum ItemState {
    /// The upload is in flight; the file belongs to the running task.
    Uploading,
    Uploaded { url: String },
    /// The file is kept so the item can be retried without picking it again.
    Failed { retry: SourceFile, reason: String },
}

/// One asset in a batch.
#[derive(Clone, Debug)]
pub struct UploadItem {
    pub(crate) id: ItemId,
    pub(crate) sequence: usize,
    pub(crate) name: String,
    pub(crate) size: u64,
    pub(crate) key: String,
    pub(crate) preview: Option<String>,
    pub(crate) state: ItemState,
}

impl UploadItem {
    pub fn id(&self) -> ItemId {
        self.id
    }

    /// Position of the file within the submission that added it.
    pub fn sequence(&self) -> usize {
        self.sequence
    }

    /// Original file name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Remote key the file is (or will be) stored under.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Local `data:` URI shown until the remote URL is known.
    pub fn preview(&self) -> Option<&str> {
        self.preview.as_deref()
    }

    pub fn state(&self) -> &ItemState {
        &self.state
    }

    pub fn is_uploading(&self) -> bool {
        matches!(self.state, ItemState::Uploading)
    }

    pub fn has_error(&self) -> bool {
        matches!(self.state, ItemState::Failed { .. })
    }

    pub fn remote_url(&self) -> Option<&str> {
        match &self.state {
            ItemState::Uploaded { url } => Some(url),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&str> {
        match &self.state {
            ItemState::Failed { reason, .. } => Some(reason),
            _ => None,
        }
    }

    /// Move a failed item back to uploading, handing over its file.
    pub(crate) fn take_retry(&mut self) -> Option<SourceFile> {
        if !self.has_error() {
            return None;
        }
        match std::mem::replace(&mut self.state, ItemState::Uploading) {
            ItemState::Failed { retry, .. } => Some(retry),
            _ => None,
        }
    }

    pub(crate) fn resolve(&mut self, outcome: Outcome) {
        self.state = match outcome {
            Outcome::Uploaded { url } => ItemState::Uploaded { url },
            Outcome::Failed { file, reason } => ItemState::Failed { retry: file, reason },
        };
    }
}
