use crate::item::{ItemId, UploadItem};
use crate::policy::Rejection;
use std::sync::Arc;

/// An ordered snapshot of the items a user has staged.
///
/// Snapshots are copy-on-write: cloning shares the underlying list, and a
/// change made through the [`Uploader`](crate::Uploader) produces a new list
/// rather than altering one an observer may still be holding.
#[derive(Clone, Debug, Default)]
pub struct UploadBatch {
    items: Arc<Vec<UploadItem>>,
}

impl UploadBatch {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[UploadItem] {
        &self.items
    }

    pub fn iter(&self) -> impl Iterator<Item = &UploadItem> {
        self.items.iter()
    }

    pub fn get(&self, index: usize) -> Option<&UploadItem> {
        self.items.get(index)
    }

    /// Current position of the item with the given id.
    pub fn position(&self, id: ItemId) -> Option<usize> {
        self.items.iter().position(|item| item.id == id)
    }

    /// Combined size of every staged file.
    pub fn total_bytes(&self) -> u64 {
        self.items.iter().map(UploadItem::size).sum()
    }

    pub fn uploading(&self) -> usize {
        self.items.iter().filter(|item| item.is_uploading()).count()
    }

    pub fn uploaded(&self) -> usize {
        self.items.iter().filter(|item| item.remote_url().is_some()).count()
    }

    pub fn failed(&self) -> usize {
        self.items.iter().filter(|item| item.has_error()).count()
    }

    /// Shares the list with no other snapshot.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.items, &other.items)
    }

    pub(crate) fn append(&mut self, items: impl IntoIterator<Item = UploadItem>) {
        Arc::make_mut(&mut self.items).extend(items);
    }

    pub(crate) fn get_mut(&mut self, id: ItemId) -> Option<&mut UploadItem> {
        Arc::make_mut(&mut self.items).iter_mut().find(|item| item.id == id)
    }

    pub(crate) fn remove(&mut self, index: usize) -> Option<UploadItem> {
        if index >= self.items.len() {
            return None;
        }
        Some(Arc::make_mut(&mut self.items).remove(index))
    }
}

/// What a submission did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub succeeded: usize,
    /// Items left in the batch as failed, including those whose preview
    /// could not be built.
    pub failed: usize,
    /// Files turned away by admission; none of them entered the batch.
    pub rejected: Vec<Rejection>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::ItemState;

    fn item(name: &str, state: ItemState) -> UploadItem {
        UploadItem {
            id: ItemId::next(),
            sequence: 0,
            name: name.to_string(),
            size: 10,
            key: format!("p/f/1-{name}"),
            preview: None,
            state,
        }
    }

    #[test]
    fn test_append_keeps_order() {
        let mut batch = UploadBatch::default();
        batch.append([item("a", ItemState::Uploading), item("b", ItemState::Uploading)]);
        batch.append([item("c", ItemState::Uploading)]);
        let names: Vec<_> = batch.iter().map(UploadItem::name).collect();
        assert_eq!(names, ["a", "b", "c"]);
        assert_eq!(batch.total_bytes(), 30);
    }

    #[test]
    fn test_copy_on_write() {
        let mut batch = UploadBatch::default();
        batch.append([item("a", ItemState::Uploading)]);
        let observed = batch.clone();
        assert!(batch.ptr_eq(&observed));

        let id = batch.items()[0].id();
        batch.get_mut(id).unwrap().state = ItemState::Uploaded { url: "u".to_string() };
        assert!(!batch.ptr_eq(&observed));
        assert!(observed.items()[0].is_uploading());
        assert_eq!(batch.items()[0].remote_url(), Some("u"));
    }

    #[test]
    fn test_position_follows_removal() {
        let mut batch = UploadBatch::default();
        batch.append([item("a", ItemState::Uploading), item("b", ItemState::Uploading)]);
        let id = batch.items()[1].id();
        assert_eq!(batch.position(id), Some(1));
        assert_eq!(batch.remove(0).unwrap().name(), "a");
        assert_eq!(batch.position(id), Some(0));
        assert!(batch.remove(5).is_none());
    }

    #[test]
    fn test_counts() {
        let mut batch = UploadBatch::default();
        batch.append([
            item("a", ItemState::Uploading),
            item("b", ItemState::Uploaded { url: "u".to_string() }),
            item("c", ItemState::Failed {
                retry: crate::SourceFile::from_bytes("c", "image/png", Vec::new()),
                reason: "boom".to_string(),
            }),
        ]);
        assert_eq!((batch.uploading(), batch.uploaded(), batch.failed()), (1, 1, 1));
    }
}
