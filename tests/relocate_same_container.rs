mod common;

use common::{Harness, dept};
use datum::{ConflictReason, DatumError, RelocateOptions};

#[tokio::test]
async fn move_between_record_sets_touches_no_blob() {
    let h = Harness::new();
    let src = dept("dept-A");
    let dst = dept("dept-A").with_record_set("incidents").unwrap();
    let original = h.seed(&src, "memo.txt", "Departments/Accounts/memo.txt").await;

    let done = h
        .relocator()
        .relocate(&src, &dst, "memo.txt", RelocateOptions::default())
        .await
        .unwrap();

    assert_eq!(
        h.calls.entries(),
        vec![
            "metadata.get tenants/acme/departments/dept-A/files/memo.txt",
            "metadata.set tenants/acme/departments/dept-A/incidents/memo.txt",
            "metadata.delete tenants/acme/departments/dept-A/files/memo.txt",
        ]
    );
    assert!(done.blob.is_none());
    // Blob path unchanged, record identical.
    assert_eq!(h.record_at(&dst, "memo.txt").await, Some(original));
    assert!(h.record_at(&src, "memo.txt").await.is_none());
    assert!(h.has_blob("Departments/Accounts/memo.txt").await);
}

#[tokio::test]
async fn copy_within_container_is_rejected_before_any_mutation() {
    let h = Harness::new();
    let src = dept("dept-A");
    let dst = dept("dept-A").with_record_set("incidents").unwrap();
    h.seed(&src, "memo.txt", "Departments/Accounts/memo.txt").await;

    let err = h
        .relocator()
        .relocate(&src, &dst, "memo.txt", RelocateOptions::copy())
        .await
        .unwrap_err();

    assert!(matches!(err, DatumError::Conflict(ConflictReason::SameContainerCopy)));
    assert_eq!(err.code(), 409);
    assert_eq!(h.calls.ops(), vec!["metadata.get"]);
    assert!(h.record_at(&dst, "memo.txt").await.is_none());
}

#[tokio::test]
async fn move_onto_itself_is_rejected() {
    let h = Harness::new();
    let src = dept("dept-A");
    h.seed(&src, "memo.txt", "Departments/Accounts/memo.txt").await;

    // "files" spelled out is the same record-set as the default.
    let same = dept("dept-A").with_record_set("files").unwrap();
    let err = h
        .relocator()
        .relocate(&src, &same, "memo.txt", RelocateOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, DatumError::Conflict(ConflictReason::SameLocation)));
    assert_eq!(h.calls.ops(), vec!["metadata.get"]);
    assert!(h.record_at(&src, "memo.txt").await.is_some());
}
