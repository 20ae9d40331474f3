//! Contract Test: Idempotence & No-op Stability
//!
//! Constraints verified:
//! - Running the same declaration twice writes on the first run only
//! - A declaration that already matches remote state is a no-op in all modes
//! - No-op runs issue read calls only
//!
//! If this test fails, the differ is flagging equal entries as changed.

mod common;

use common::*;
use pihole_core::{ListType, PatchSpec, ReplaceSpec, UpsertSpec};
use tokio_test::assert_ok;

#[tokio::test]
async fn replace_twice_writes_once() {
    let store = RecordingListStore::new(vec![block("https://x/old.txt")]);
    let specs = vec![
        ReplaceSpec::new("https://x/a.txt").with_comment("ads"),
        ReplaceSpec::new("https://x/b.txt").with_groups([0, 1]),
    ];

    let first = assert_ok!(reconciler(&store).replace(ListType::Block, &specs).await);
    assert!(first.changed);
    assert_eq!(first.created_count, 2);
    assert_eq!(first.deleted_count, 1);

    store.clear_calls();

    let second = assert_ok!(reconciler(&store).replace(ListType::Block, &specs).await);
    assert!(!second.changed);
    assert_eq!(second.message, "No changes required");
    assert!(
        store.writes().is_empty(),
        "second run must not write, got {:?}",
        store.writes()
    );
}

#[tokio::test]
async fn patch_twice_writes_once() {
    let store = RecordingListStore::new(vec![allow("https://x/gone.txt")]);
    let specs = vec![
        PatchSpec::present("https://x/a.txt", ListType::Block).with_enabled(false),
        PatchSpec::absent("https://x/gone.txt", ListType::Allow),
    ];

    let first = assert_ok!(reconciler(&store).patch(&specs).await);
    assert!(first.changed);
    assert_eq!(first.message, "Lists updated, removed: 1, added: 1, changed: 0");

    store.clear_calls();

    let second = assert_ok!(reconciler(&store).patch(&specs).await);
    assert!(!second.changed);
    assert_eq!(second.message, "No lists to update");
    assert!(store.writes().is_empty());
}

#[tokio::test]
async fn upsert_twice_writes_once() {
    let store = RecordingListStore::new(Vec::new());
    let spec = UpsertSpec::present("https://x/a.txt", ListType::Allow)
        .with_comment("family")
        .with_groups([1]);

    let first = assert_ok!(reconciler(&store).upsert(&spec).await);
    assert!(first.changed);
    assert_eq!(first.message, "Allow list created");
    assert!(first.response.is_some());

    store.clear_calls();

    let second = assert_ok!(reconciler(&store).upsert(&spec).await);
    assert!(!second.changed);
    assert_eq!(
        second.message,
        "Allow list already exists with the desired configuration"
    );
    assert!(store.writes().is_empty());
}

#[tokio::test]
async fn matching_state_is_noop_in_every_mode() {
    let remote = vec![
        block("https://x/a.txt").with_comment("c").with_groups([1, 0]),
        allow("https://x/b.txt").with_enabled(false),
    ];
    let store = RecordingListStore::new(remote);

    let replace = assert_ok!(
        reconciler(&store)
            .replace(
                ListType::Block,
                &[ReplaceSpec::new("https://x/a.txt")
                    .with_comment("c")
                    .with_groups([0, 1])],
            )
            .await
    );
    assert!(!replace.changed);

    let patch = assert_ok!(
        reconciler(&store)
            .patch(&[
                PatchSpec::present("https://x/a.txt", ListType::Block)
                    .with_comment("c")
                    .with_groups([0, 1]),
                PatchSpec::present("https://x/b.txt", ListType::Allow).with_enabled(false),
            ])
            .await
    );
    assert!(!patch.changed);

    let upsert = assert_ok!(
        reconciler(&store)
            .upsert(
                &UpsertSpec::present("https://x/b.txt", ListType::Allow).with_enabled(false)
            )
            .await
    );
    assert!(!upsert.changed);

    assert!(store.writes().is_empty());
}

#[tokio::test]
async fn upsert_absent_on_missing_entry_is_noop() {
    let store = RecordingListStore::new(Vec::new());

    let result = assert_ok!(
        reconciler(&store)
            .upsert(&UpsertSpec::absent("https://x/a.txt", ListType::Block))
            .await
    );

    assert!(!result.changed);
    assert_eq!(result.message, "Block list does not exist");
    assert!(store.writes().is_empty());
}
