use crate::batch::{Summary, UploadBatch};
use crate::consts::DEFAULT_CONCURRENCY;
use crate::error::{ErrorKind, Result};
use crate::item::{ItemId, ItemState, UploadItem};
use crate::naming::{self, ObjectNamer};
use crate::notify::{LogNotifier, Notice, Notifier};
use crate::policy::{Limits, MediaKind, Policy};
use crate::preview;
use crate::source::SourceFile;
use crate::upload::{Outcome, upload_one};
use brick_storage::{Access, BackendHandle};
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::{Mutex, watch};

/// How an [`Uploader`] treats its batch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    pub kind: MediaKind,
    pub limits: Limits,
    /// Uploads started together per slice. Values below 1 are treated as 1.
    pub concurrency: usize,
    pub access: Access,
}
impl Settings {
    pub fn new(kind: MediaKind) -> Self {
        Self {
            kind,
            limits: kind.default_limits(),
            concurrency: DEFAULT_CONCURRENCY,
            access: Access::default(),
        }
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_access(mut self, access: Access) -> Self {
        self.access = access;
        self
    }
}

/// Reason recorded on an item whose upload was dropped before it finished.
const CANCELLED: &str = "upload cancelled";

/// A staged file whose item has not been resolved yet.
///
/// Dropping it unresolved, because the future driving it was cancelled,
/// marks the item failed with its file kept for a retry.
struct Pending<'a> {
    uploader: &'a Uploader,
    id: ItemId,
    file: SourceFile,
    key: String,
    resolved: bool,
}
impl Pending<'_> {
    async fn upload(&self) -> Outcome {
        let Uploader { backend, settings, .. } = self.uploader;
        upload_one(backend.as_ref(), self.file.clone(), &self.key, settings.access).await
    }

    /// The outcome is about to be written back; nothing to undo on drop.
    fn resolve(mut self) -> ItemId {
        self.resolved = true;
        self.id
    }
}
impl Drop for Pending<'_> {
    fn drop(&mut self) {
        if self.resolved {
            return;
        }
        let (id, file) = (self.id, self.file.clone());
        self.uploader.batch.send_if_modified(|batch| {
            if !batch.iter().any(|item| item.id == id && item.is_uploading()) {
                return false;
            }
            let Some(item) = batch.get_mut(id) else {
                return false;
            };
            tracing::warn!(%id, name = item.name(), "Upload dropped before it finished");
            item.resolve(Outcome::Failed {
                file,
                reason: CANCELLED.to_string(),
            });
            true
        });
    }
}

/// Owns one batch and every operation on it.
///
/// State changes are published as [`UploadBatch`] snapshots through a
/// [`watch`] channel; see [`subscribe`](Self::subscribe).
pub struct Uploader {
    backend: BackendHandle,
    settings: Settings,
    namer: ObjectNamer,
    notifier: Arc<dyn Notifier>,
    batch: watch::Sender<UploadBatch>,
    /// Held from admission until the admitted files are in the batch.
    admission: Mutex<()>,
}

impl Uploader {
    pub fn new(backend: BackendHandle, settings: Settings, project: &str, folder: &str) -> Self {
        let settings = Settings {
            concurrency: settings.concurrency.max(1),
            ..settings
        };
        Self {
            namer: ObjectNamer::new(project, folder, settings.kind),
            backend,
            settings,
            notifier: Arc::new(LogNotifier),
            batch: watch::Sender::new(UploadBatch::default()),
            admission: Mutex::new(()),
        }
    }

    /// Send notices somewhere other than the log.
    pub fn with_notifier(mut self, notifier: impl Notifier + 'static) -> Self {
        self.notifier = Arc::new(notifier);
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn namer(&self) -> &ObjectNamer {
        &self.namer
    }

    pub fn policy(&self) -> Policy {
        Policy::new(self.settings.kind, self.settings.limits)
    }

    /// Receive every published snapshot from now on.
    pub fn subscribe(&self) -> watch::Receiver<UploadBatch> {
        self.batch.subscribe()
    }

    /// The most recently published snapshot.
    pub fn snapshot(&self) -> UploadBatch {
        self.batch.borrow().clone()
    }

    /// Admit, stage and upload a selection of files.
    ///
    /// Rejected files are reported and never enter the batch. Every admitted
    /// file is appended as a placeholder before the first upload starts;
    /// uploads then run in consecutive slices of at most
    /// [`concurrency`](Settings::concurrency), one slice at a time.
    #[tracing::instrument(skip_all, fields(project = self.namer.project(), folder = self.namer.folder()))]
    pub async fn submit(&self, files: impl IntoIterator<Item = SourceFile>) -> Summary {
        let (mut summary, mut pending) = {
            let _admission = self.admission.lock().await;
            let (existing_items, existing_bytes) = {
                let batch = self.batch.borrow();
                (batch.len(), batch.total_bytes())
            };
            let admission = self.policy().admit(files, existing_items, existing_bytes);
            for rejection in &admission.rejected {
                self.notifier.notify(&Notice::Rejected(rejection.clone()));
            }

            let timestamp = naming::timestamp_ms();
            let (placeholders, pending) = self.stage(admission.admitted, timestamp).await;
            let summary = Summary {
                failed: placeholders.iter().filter(|item| item.has_error()).count(),
                rejected: admission.rejected,
                ..Summary::default()
            };
            self.batch.send_modify(|batch| batch.append(placeholders));
            (summary, pending)
        };

        let mut slice_number = 0;
        while !pending.is_empty() {
            let slice: Vec<Pending> = pending.drain(..self.settings.concurrency.min(pending.len())).collect();
            tracing::debug!(slice = slice_number, uploads = slice.len(), "Starting slice");
            let outcomes = join_all(slice.iter().map(Pending::upload)).await;
            for outcome in &outcomes {
                match outcome {
                    Outcome::Uploaded { .. } => summary.succeeded += 1,
                    Outcome::Failed { .. } => summary.failed += 1,
                }
            }
            self.write_back(slice.into_iter().map(Pending::resolve).zip(outcomes).collect());
            slice_number += 1;
        }

        tracing::info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            rejected = summary.rejected.len(),
            "Submission finished"
        );
        self.notify_counts(summary.succeeded, summary.failed);
        summary
    }

    /// Build a placeholder for every admitted file, in selection order.
    ///
    /// Files whose preview cannot be built are staged as failed and are not
    /// queued for upload.
    async fn stage(&self, admitted: Vec<SourceFile>, timestamp: u64) -> (Vec<UploadItem>, Vec<Pending<'_>>) {
        let mut placeholders = Vec::with_capacity(admitted.len());
        let mut pending = Vec::with_capacity(admitted.len());
        for (sequence, file) in admitted.into_iter().enumerate() {
            let id = ItemId::next();
            let name = file.name().to_string();
            let size = file.size();
            let (key, staged) = match self.namer.name(&file, sequence, timestamp) {
                Ok(key) => {
                    let preview = preview::encode(&file).await;
                    (key, preview)
                },
                Err(err) => (String::new(), Err(err)),
            };
            let (preview, state) = match staged {
                Ok(preview) => {
                    pending.push(Pending {
                        uploader: self,
                        id,
                        file,
                        key: key.clone(),
                        resolved: false,
                    });
                    (Some(preview), ItemState::Uploading)
                },
                Err(err) => {
                    let reason = (*err).to_string();
                    tracing::warn!(file = %name, %reason, "Could not stage file");
                    (None, ItemState::Failed { retry: file, reason })
                },
            };
            placeholders.push(UploadItem {
                id,
                sequence,
                name,
                size,
                key,
                preview,
                state,
            });
        }
        (placeholders, pending)
    }

    fn write_back(&self, outcomes: Vec<(ItemId, Outcome)>) {
        self.batch.send_modify(|batch| {
            for (id, outcome) in outcomes {
                match batch.get_mut(id) {
                    Some(item) => item.resolve(outcome),
                    None => tracing::warn!(item = %id, "Upload finished for an item no longer in the batch"),
                }
            }
        });
    }

    fn notify_counts(&self, succeeded: usize, failed: usize) {
        let kind = self.settings.kind;
        if succeeded > 0 {
            self.notifier.notify(&Notice::Uploaded { kind, count: succeeded });
        }
        if failed > 0 {
            self.notifier.notify(&Notice::Failed { kind, count: failed });
        }
    }

    /// Upload the failed item at `index` again, under its original key.
    ///
    /// Returns the item as it stands once the attempt has finished. Only
    /// that item changes; the batch keeps its length.
    #[tracing::instrument(skip(self))]
    pub async fn retry(&self, index: usize) -> Result<UploadItem> {
        let mut taken = Err(ErrorKind::NoSuchItem(index));
        self.batch.send_if_modified(|batch| {
            let Some(id) = batch.get(index).map(UploadItem::id) else {
                return false;
            };
            let Some(item) = batch.get_mut(id) else {
                return false;
            };
            taken = match item.take_retry() {
                Some(file) => Ok(Pending {
                    uploader: self,
                    id,
                    file,
                    key: item.key.clone(),
                    resolved: false,
                }),
                None => Err(ErrorKind::NotRetryable(index)),
            };
            taken.is_ok()
        });
        let pending = taken?;

        let outcome = pending.upload().await;
        let succeeded = outcome.is_uploaded();
        let id = pending.resolve();
        self.write_back(vec![(id, outcome)]);
        self.notify_counts(usize::from(succeeded), usize::from(!succeeded));

        let batch = self.batch.borrow();
        let item = batch.iter().find(|item| item.id == id).cloned().ok_or(ErrorKind::NoSuchItem(index))?;
        Ok(item)
    }

    /// Take the item at `index` out of the batch.
    ///
    /// Items that are still uploading cannot be removed. Nothing is deleted
    /// remotely.
    pub fn remove(&self, index: usize) -> Result<UploadItem> {
        let mut removed = Err(ErrorKind::NoSuchItem(index));
        self.batch.send_if_modified(|batch| {
            match batch.get(index) {
                None => return false,
                Some(item) if item.is_uploading() => {
                    removed = Err(ErrorKind::StillUploading(index));
                    return false;
                },
                Some(_) => {},
            }
            removed = batch.remove(index).ok_or(ErrorKind::NoSuchItem(index));
            removed.is_ok()
        });
        let item = removed?;
        tracing::debug!(item = %item.id, name = item.name(), "Removed from batch");
        Ok(item)
    }
}
