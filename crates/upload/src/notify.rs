//! User-facing notices.
//!
//! The [`Uploader`](crate::Uploader) reports what happened to a selection
//! through a [`Notifier`]: one notice per rejected file, then at most one
//! summary notice for successes and one for failures.

use crate::policy::{MediaKind, Rejection};
use derive_more::Display;

#[derive(Clone, Debug, Display, PartialEq, Eq)]
pub enum Notice {
    #[display("{_0}")]
    Rejected(Rejection),
    #[display("{count} {}(s) uploaded", kind)]
    Uploaded { kind: MediaKind, count: usize },
    #[display("{count} {}(s) failed - click retry to try again", kind)]
    Failed { kind: MediaKind, count: usize },
}

/// Receives notices as they are produced.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: &Notice);
}

impl<F> Notifier for F
where
    F: Fn(&Notice) + Send + Sync,
{
    fn notify(&self, notice: &Notice) {
        self(notice)
    }
}

/// Emits every notice as a `tracing` event.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogNotifier;
impl Notifier for LogNotifier {
    fn notify(&self, notice: &Notice) {
        match notice {
            Notice::Uploaded { .. } => tracing::info!(target: "brick::notice", "{notice}"),
            Notice::Rejected(_) | Notice::Failed { .. } => tracing::warn!(target: "brick::notice", "{notice}"),
        }
    }
}
