//! Batch uploads for listing galleries and brochures.
//!
//! An [`Uploader`] owns one [`UploadBatch`]: the ordered list of assets a
//! user has picked for a project. Selecting files runs them through the
//! admission [`Policy`](policy::Policy), stages a local preview for each,
//! then pushes them to a [storage backend](brick_storage) a few at a time.
//! Failed items stay in the batch, holding on to their file, until they are
//! retried or removed.
//!
//! ```
//! use brick_storage::BackendHandle;
//! use brick_upload::{Settings, SourceFile, Uploader, policy::MediaKind};
//!
//! # async fn example(backend: BackendHandle) -> brick_upload::error::Result<()> {
//! let uploader = Uploader::new(backend, Settings::new(MediaKind::Image), "  My Home!! Apas  ", "gallery");
//! let photo = SourceFile::open("/tmp/living-room.jpg").await?;
//! let summary = uploader.submit(vec![photo]).await;
//! println!("{} uploaded, {} failed", summary.succeeded, summary.failed);
//! if summary.failed > 0 {
//!     uploader.retry(0).await?;
//! }
//! # Ok(())
//! # }
//! ```

mod batch;
mod consts;
pub mod error;
mod item;
pub mod naming;
pub mod notify;
pub mod policy;
pub mod preview;
mod source;
mod upload;
mod uploader;

pub use crate::batch::{Summary, UploadBatch};
pub use crate::consts::{DEFAULT_CONCURRENCY, MIB};
pub use crate::item::{ItemId, ItemState, UploadItem};
pub use crate::source::SourceFile;
pub use crate::upload::{Outcome, upload_one};
pub use crate::uploader::{Settings, Uploader};
