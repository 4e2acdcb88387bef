use brick_storage::StorageBackend;
use brick_storage::backend::MockBackend;
use brick_upload::error::ErrorKind;
use brick_upload::notify::Notice;
use brick_upload::policy::{Limits, MediaKind, RejectReason};
use brick_upload::{MIB, Settings, SourceFile, UploadBatch, Uploader};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Notices = Arc<Mutex<Vec<String>>>;

fn photo(name: &str) -> SourceFile {
    SourceFile::from_bytes(name, "image/jpeg", format!("jpeg:{name}").into_bytes())
}

fn photos(count: usize) -> Vec<SourceFile> {
    (0..count).map(|i| photo(&format!("photo-{i}.jpg"))).collect()
}

fn uploader(backend: &Arc<MockBackend>, settings: Settings) -> (Uploader, Notices) {
    let notices = Notices::default();
    let sink = notices.clone();
    let uploader = Uploader::new(backend.clone(), settings, "  My Home!! Apas  ", "gallery")
        .with_notifier(move |notice: &Notice| sink.lock().unwrap().push(notice.to_string()));
    (uploader, notices)
}

fn assert_terminal(batch: &UploadBatch) {
    for item in batch.iter() {
        assert!(!item.is_uploading(), "{} is still uploading", item.name());
        assert_ne!(item.remote_url().is_some(), item.has_error(), "{} is not in exactly one terminal state", item.name());
    }
}

#[tokio::test]
async fn five_images_resolve_in_two_slices() {
    let backend = Arc::new(MockBackend::default().with_delay(Duration::from_millis(10)));
    let (uploader, notices) = uploader(&backend, Settings::new(MediaKind::Image));
    let mut rx = uploader.subscribe();

    let (summary, history) = tokio::join!(uploader.submit(photos(5)), async {
        let mut history = Vec::new();
        while rx.changed().await.is_ok() {
            let batch = rx.borrow_and_update().clone();
            let done = batch.iter().all(|item| !item.is_uploading());
            history.push(batch);
            if done {
                break;
            }
        }
        history
    });

    assert_eq!(summary.succeeded, 5);
    assert_eq!(summary.failed, 0);
    // Placeholders, first slice of three, second slice of two.
    assert_eq!(history.len(), 3);
    assert_eq!(history[0].len(), 5);
    assert_eq!(history[0].uploading(), 5);
    assert_eq!(history[1].uploaded(), 3);
    assert_eq!(history[1].uploading(), 2);
    assert_eq!(history[2].uploaded(), 5);

    let batch = uploader.snapshot();
    let names: Vec<_> = batch.iter().map(|item| item.name().to_string()).collect();
    assert_eq!(names, ["photo-0.jpg", "photo-1.jpg", "photo-2.jpg", "photo-3.jpg", "photo-4.jpg"]);
    assert_terminal(&batch);
    assert_eq!(*notices.lock().unwrap(), ["5 image(s) uploaded"]);
}

#[tokio::test]
async fn never_more_than_three_in_flight() {
    let backend = Arc::new(MockBackend::default().with_delay(Duration::from_millis(5)));
    let (uploader, _) = uploader(&backend, Settings::new(MediaKind::Image));
    let summary = uploader.submit(photos(20)).await;
    assert_eq!(summary.succeeded, 20);
    assert_eq!(backend.attempts(), 20);
    assert_eq!(backend.peak_in_flight(), 3);
}

#[tokio::test]
async fn concurrency_is_configurable() {
    let backend = Arc::new(MockBackend::default().with_delay(Duration::from_millis(5)));
    let (uploader, _) = uploader(&backend, Settings::new(MediaKind::Image).with_concurrency(1));
    uploader.submit(photos(4)).await;
    assert_eq!(backend.peak_in_flight(), 1);
}

#[tokio::test]
async fn oversized_image_rejected_before_placeholders() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("huge.jpg");
    std::fs::File::create(&path).unwrap().set_len(150 * MIB).unwrap();
    let huge = SourceFile::open(&path).await.unwrap();

    let backend = Arc::new(MockBackend::default());
    let (uploader, notices) = uploader(&backend, Settings::new(MediaKind::Image));
    let mut rx = uploader.subscribe();
    let summary = uploader.submit([huge]).await;

    assert_eq!(summary.rejected.len(), 1);
    assert!(matches!(summary.rejected[0].reason, RejectReason::TooLarge { .. }));
    assert_eq!(uploader.snapshot().len(), 0);
    assert_eq!(backend.attempts(), 0);
    assert!(rx.borrow_and_update().is_empty());
    assert_eq!(*notices.lock().unwrap(), ["huge.jpg: 150MB exceeds the 100MB limit"]);
}

#[tokio::test]
async fn selections_append_in_order() {
    let backend = Arc::new(MockBackend::default());
    let (uploader, _) = uploader(&backend, Settings::new(MediaKind::Image));
    uploader.submit([photo("a.jpg"), photo("b.jpg")]).await;
    uploader.submit([photo("c.jpg"), photo("d.jpg"), photo("e.jpg")]).await;

    let names: Vec<_> = uploader.snapshot().iter().map(|item| item.name().to_string()).collect();
    assert_eq!(names, ["a.jpg", "b.jpg", "c.jpg", "d.jpg", "e.jpg"]);
}

#[tokio::test]
async fn remaining_slots_are_enforced() {
    let backend = Arc::new(MockBackend::default());
    let settings = Settings::new(MediaKind::Image).with_limits(Limits {
        max_items: 3,
        ..Limits::images()
    });
    let (uploader, notices) = uploader(&backend, settings);
    uploader.submit(photos(2)).await;
    let summary = uploader.submit([photo("x.jpg"), photo("y.jpg")]).await;

    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.rejected[0].file, "y.jpg");
    assert_eq!(uploader.snapshot().len(), 3);
    assert!(notices.lock().unwrap().contains(&"y.jpg: no room left, at most 3 files are allowed".to_string()));
}

#[tokio::test]
async fn keys_are_normalized_and_unique() {
    let backend = Arc::new(MockBackend::default());
    let (uploader, _) = uploader(&backend, Settings::new(MediaKind::Image));
    uploader.submit(photos(6)).await;

    let batch = uploader.snapshot();
    let keys: HashSet<_> = batch.iter().map(|item| item.key().to_string()).collect();
    assert_eq!(keys.len(), 6);
    for item in batch.iter() {
        assert!(item.key().starts_with("my-home-apas/gallery/"), "{}", item.key());
        assert!(item.key().ends_with(&format!("-{}.jpg", item.sequence())));
        let url = item.remote_url().unwrap();
        assert_eq!(url, format!("https://blob.test/{}", item.key()));
    }
}

#[tokio::test]
async fn back_to_back_submissions_get_distinct_keys() {
    let backend = Arc::new(MockBackend::default());
    let (uploader, _) = uploader(&backend, Settings::new(MediaKind::Image));
    for i in 0..20 {
        uploader.submit([photo(&format!("single-{i}.jpg"))]).await;
    }

    let batch = uploader.snapshot();
    assert_eq!(batch.uploaded(), 20);
    let keys: HashSet<_> = batch.iter().map(|item| item.key().to_string()).collect();
    assert_eq!(keys.len(), 20);
    for item in batch.iter() {
        let stored = backend.read(item.key()).await.unwrap();
        assert_eq!(stored, format!("jpeg:{}", item.name()).into_bytes(), "{}", item.key());
    }
}

#[tokio::test]
async fn concurrent_submissions_share_the_slot_limit() {
    let dir = tempfile::tempdir().unwrap();
    let mut brochures = Vec::new();
    for name in ["first.pdf", "second.pdf"] {
        let path = dir.path().join(name);
        std::fs::write(&path, b"%PDF-1.7").unwrap();
        brochures.push(SourceFile::open(&path).await.unwrap());
    }
    let second = brochures.pop().unwrap();
    let first = brochures.pop().unwrap();

    let backend = Arc::new(MockBackend::default());
    let (uploader, _) = uploader(&backend, Settings::new(MediaKind::Document));
    let (a, b) = tokio::join!(uploader.submit([first]), uploader.submit([second]));

    assert_eq!(uploader.snapshot().len(), 1);
    assert_eq!(a.succeeded + b.succeeded, 1);
    let rejected: Vec<_> = a.rejected.iter().chain(&b.rejected).collect();
    assert_eq!(rejected.len(), 1);
    assert!(matches!(rejected[0].reason, RejectReason::NoSlotsLeft { max: 1 }));
    assert_eq!(backend.attempts(), 1);
}

#[tokio::test]
async fn cancelled_submission_leaves_items_failed_and_retryable() {
    let backend = Arc::new(MockBackend::default().with_delay(Duration::from_millis(50)));
    let (uploader, _) = uploader(&backend, Settings::new(MediaKind::Image));
    let cancelled = tokio::time::timeout(Duration::from_millis(5), uploader.submit(photos(5))).await;
    assert!(cancelled.is_err());

    let batch = uploader.snapshot();
    assert_eq!(batch.len(), 5);
    assert_terminal(&batch);
    assert!(batch.iter().all(|item| item.failure() == Some("upload cancelled")));

    uploader.remove(4).unwrap();
    let retried = uploader.retry(0).await.unwrap();
    assert!(retried.remote_url().is_some());
    assert_eq!(uploader.snapshot().failed(), 3);
}

#[tokio::test]
async fn one_failure_in_a_slice_then_retry() {
    let backend = Arc::new(MockBackend::default());
    backend.fail_when(|key| key.ends_with("-1.jpg"));
    let (uploader, notices) = uploader(&backend, Settings::new(MediaKind::Image));

    let summary = uploader.submit(photos(3)).await;
    assert_eq!((summary.succeeded, summary.failed), (2, 1));
    let before = uploader.snapshot();
    assert_terminal(&before);
    assert!(before.items()[0].remote_url().is_some());
    assert!(before.items()[1].has_error());
    assert!(before.items()[2].remote_url().is_some());
    assert_eq!(
        *notices.lock().unwrap(),
        ["2 image(s) uploaded", "1 image(s) failed - click retry to try again"]
    );

    backend.succeed_all();
    let retried = uploader.retry(1).await.unwrap();
    assert_eq!(retried.key(), before.items()[1].key());
    assert_eq!(retried.remote_url(), Some(format!("https://blob.test/{}", retried.key()).as_str()));

    let after = uploader.snapshot();
    assert_eq!(after.len(), 3);
    assert_terminal(&after);
    for index in [0, 2] {
        assert_eq!(after.items()[index].id(), before.items()[index].id());
        assert_eq!(after.items()[index].remote_url(), before.items()[index].remote_url());
    }
    assert_eq!(notices.lock().unwrap().last().unwrap(), "1 image(s) uploaded");
}

#[tokio::test]
async fn repeated_retries_keep_slot_count() {
    let backend = Arc::new(MockBackend::default());
    backend.fail_when(|_| true);
    let (uploader, notices) = uploader(&backend, Settings::new(MediaKind::Image));
    uploader.submit([photo("stubborn.jpg")]).await;

    for _ in 0..3 {
        let item = uploader.retry(0).await.unwrap();
        assert!(item.has_error());
        assert_eq!(uploader.snapshot().len(), 1);
    }
    assert_eq!(backend.attempts(), 4);
    assert_eq!(notices.lock().unwrap().len(), 4);
}

#[tokio::test]
async fn uploading_items_cannot_be_removed() {
    let backend = Arc::new(MockBackend::default().with_delay(Duration::from_millis(20)));
    let (uploader, _) = uploader(&backend, Settings::new(MediaKind::Image));
    let mut rx = uploader.subscribe();

    let (_, refused) = tokio::join!(uploader.submit([photo("a.jpg")]), async {
        rx.changed().await.unwrap();
        uploader.remove(0)
    });

    let err = refused.unwrap_err();
    assert!(matches!(&*err, ErrorKind::StillUploading(0)));
    assert!(err.is_retryable());
    assert_eq!(uploader.snapshot().len(), 1);
    assert_eq!(uploader.remove(0).unwrap().name(), "a.jpg");
    assert!(uploader.snapshot().is_empty());
}

#[tokio::test]
async fn documents_are_single_pdf() {
    let backend = Arc::new(MockBackend::default());
    let (uploader, notices) = uploader(&backend, Settings::new(MediaKind::Document));
    let summary = uploader
        .submit([
            SourceFile::from_bytes("Brochure.PDF", "application/pdf", b"%PDF-1.7".to_vec()),
            SourceFile::from_bytes("extra.pdf", "application/pdf", b"%PDF-1.7".to_vec()),
        ])
        .await;

    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.rejected.len(), 1);
    let batch = uploader.snapshot();
    assert!(batch.items()[0].key().ends_with("-0.pdf"));
    assert!(batch.items()[0].preview().unwrap().starts_with("data:application/pdf;base64,"));
    assert_eq!(notices.lock().unwrap().last().unwrap(), "1 document(s) uploaded");
}

#[tokio::test]
async fn legacy_inline_limits() {
    let backend = Arc::new(MockBackend::default());
    let settings = Settings::new(MediaKind::Image).with_limits(Limits::legacy_inline());
    let (uploader, _) = uploader(&backend, settings);
    let big = SourceFile::from_bytes("big.png", "image/png", vec![0u8; (MIB + 1) as usize]);
    let summary = uploader.submit([big, photo("small.jpg")]).await;
    assert_eq!(summary.rejected.len(), 1);
    assert_eq!(summary.succeeded, 1);
}
