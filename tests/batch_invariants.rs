//! Batch Mutation Invariant Tests
//!
//! Tests for the core batch guarantees:
//! - Whole-batch atomicity (zero partial effects on any failure)
//! - Version counters start at 0 and move by exactly 1
//! - Idempotent deletes
//! - Single `updated_at` bump per effective batch

use lineagedb::batch::{BatchError, BatchRequest, ModifyEntry};
use lineagedb::engine::TreeEngine;
use lineagedb::store::PersonId;
use serde_json::{json, Value};
use uuid::Uuid;

fn engine_with_tree() -> (TreeEngine, lineagedb::access::TreeId, Uuid) {
    let engine = TreeEngine::new();
    let owner = Uuid::new_v4();
    let tree = engine.create_tree(owner, "invariants", false).unwrap();
    (engine, tree.id, owner)
}

fn adds(ids: &[u64]) -> BatchRequest {
    BatchRequest::new(
        ids.iter()
            .map(|id| json!({ "id": id, "name": format!("p{id}") }))
            .collect(),
        Vec::new(),
        Vec::new(),
    )
}

fn modify(id: u64, expected: u64, name: &str) -> ModifyEntry {
    ModifyEntry {
        person_id: PersonId::new(id),
        expected_version: expected,
        payload: json!({ "id": id, "name": name }),
    }
}

fn version_of(data: &[Value], id: u64) -> u64 {
    data.iter()
        .find(|p| p["id"] == json!(id))
        .and_then(|p| p["version"].as_u64())
        .unwrap()
}

// =============================================================================
// Happy path
// =============================================================================

/// When every expected version matches, the batch commits and every
/// modified record's version increases by exactly 1.
#[test]
fn test_matching_versions_commit_and_bump_by_one() {
    let (engine, tree, owner) = engine_with_tree();
    engine.apply_batch(owner, tree, adds(&[1, 2, 3])).unwrap();

    let request = BatchRequest::new(
        Vec::new(),
        vec![modify(1, 0, "a"), modify(2, 0, "b")],
        Vec::new(),
    );
    let outcome = engine.apply_batch(owner, tree, request).unwrap();
    assert_eq!(outcome.modified, 2);

    let data = engine.tree_data(Some(owner), tree).unwrap();
    assert_eq!(version_of(&data, 1), 1);
    assert_eq!(version_of(&data, 2), 1);
    assert_eq!(version_of(&data, 3), 0);
}

/// A batch may mix all three operation kinds.
#[test]
fn test_mixed_batch() {
    let (engine, tree, owner) = engine_with_tree();
    engine.apply_batch(owner, tree, adds(&[1, 2])).unwrap();

    let request = BatchRequest::new(
        vec![json!({ "id": 3, "name": "new" })],
        vec![modify(1, 0, "renamed")],
        vec![PersonId::new(2)],
    );
    let outcome = engine.apply_batch(owner, tree, request).unwrap();
    assert_eq!((outcome.added, outcome.modified, outcome.deleted), (1, 1, 1));

    let data = engine.tree_data(Some(owner), tree).unwrap();
    assert_eq!(data.len(), 2);
    assert!(data.iter().all(|p| p["id"] != json!(2)));
}

// =============================================================================
// The worked example: stale second writer
// =============================================================================

/// Tree has P1 at version 0. Batch A modifies it (now version 1); stale
/// batch B still expecting version 0 fails with the exact conflict triple.
#[test]
fn test_stale_second_batch_conflicts() {
    let (engine, tree, owner) = engine_with_tree();
    engine.apply_batch(owner, tree, adds(&[1])).unwrap();

    let batch_a = BatchRequest::new(Vec::new(), vec![modify(1, 0, "X")], Vec::new());
    engine.apply_batch(owner, tree, batch_a).unwrap();

    let batch_b = BatchRequest::new(Vec::new(), vec![modify(1, 0, "Y")], Vec::new());
    let err = engine.apply_batch(owner, tree, batch_b).unwrap_err();
    assert_eq!(err.status_code(), 409);
    assert!(matches!(
        err,
        lineagedb::engine::EngineError::Batch(BatchError::VersionConflict {
            person_id,
            expected: 0,
            actual: Some(1),
        }) if person_id == PersonId::new(1)
    ));

    // The committed name is still batch A's
    let data = engine.tree_data(Some(owner), tree).unwrap();
    assert_eq!(data[0]["name"], json!("X"));
}

/// After refetching the new version, the retried batch succeeds.
#[test]
fn test_refetch_and_retry_succeeds() {
    let (engine, tree, owner) = engine_with_tree();
    engine.apply_batch(owner, tree, adds(&[1])).unwrap();

    let first = BatchRequest::new(Vec::new(), vec![modify(1, 0, "X")], Vec::new());
    engine.apply_batch(owner, tree, first).unwrap();

    let data = engine.tree_data(Some(owner), tree).unwrap();
    let current = version_of(&data, 1);

    let retry = BatchRequest::new(Vec::new(), vec![modify(1, current, "Y")], Vec::new());
    engine.apply_batch(owner, tree, retry).unwrap();

    let data = engine.tree_data(Some(owner), tree).unwrap();
    assert_eq!(data[0]["name"], json!("Y"));
    assert_eq!(version_of(&data, 1), 2);
}

// =============================================================================
// Atomicity on failure
// =============================================================================

/// One stale entry rejects the whole batch: no add, no delete, no modify
/// of the entries that were individually fine.
#[test]
fn test_one_stale_entry_means_zero_partial_effects() {
    let (engine, tree, owner) = engine_with_tree();
    engine.apply_batch(owner, tree, adds(&[1, 2, 3])).unwrap();

    let before = engine.tree_data(Some(owner), tree).unwrap();
    let request = BatchRequest::new(
        vec![json!({ "id": 4 })],
        vec![modify(1, 0, "fine"), modify(2, 9, "stale")],
        vec![PersonId::new(3)],
    );
    engine.apply_batch(owner, tree, request).unwrap_err();

    let after = engine.tree_data(Some(owner), tree).unwrap();
    assert_eq!(before, after);
}

/// A duplicate add likewise poisons the whole batch.
#[test]
fn test_duplicate_add_rejects_whole_batch() {
    let (engine, tree, owner) = engine_with_tree();
    engine.apply_batch(owner, tree, adds(&[1])).unwrap();

    let request = BatchRequest::new(
        vec![json!({ "id": 2 }), json!({ "id": 1 })],
        vec![modify(1, 0, "x")],
        Vec::new(),
    );
    let err = engine.apply_batch(owner, tree, request).unwrap_err();
    assert_eq!(err.status_code(), 409);

    let data = engine.tree_data(Some(owner), tree).unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(version_of(&data, 1), 0);
}

// =============================================================================
// Deletes and bookkeeping
// =============================================================================

/// Deleting a nonexistent id never raises and never bumps `updated_at`
/// unless combined with a real change.
#[test]
fn test_phantom_delete_is_silent() {
    let (engine, tree, owner) = engine_with_tree();
    let before = engine.access().get_tree(tree).unwrap().updated_at;

    let phantom = BatchRequest::new(Vec::new(), Vec::new(), vec![PersonId::new(99)]);
    let outcome = engine.apply_batch(owner, tree, phantom).unwrap();
    assert_eq!(outcome.changed(), 0);
    assert_eq!(engine.access().get_tree(tree).unwrap().updated_at, before);

    // Combined with a real change the tree is touched
    std::thread::sleep(std::time::Duration::from_millis(2));
    let mixed = BatchRequest::new(
        vec![json!({ "id": 1 })],
        Vec::new(),
        vec![PersonId::new(99)],
    );
    let outcome = engine.apply_batch(owner, tree, mixed).unwrap();
    assert_eq!(outcome.changed(), 1);
    assert!(engine.access().get_tree(tree).unwrap().updated_at > before);
}

/// Deleting the same absent id twice stays idempotent.
#[test]
fn test_delete_is_idempotent() {
    let (engine, tree, owner) = engine_with_tree();
    engine.apply_batch(owner, tree, adds(&[5])).unwrap();

    // First delete removes, second is a no-op
    let first = engine
        .apply_batch(
            owner,
            tree,
            BatchRequest::new(Vec::new(), Vec::new(), vec![PersonId::new(5)]),
        )
        .unwrap();
    assert_eq!(first.deleted, 1);
    let second = engine
        .apply_batch(
            owner,
            tree,
            BatchRequest::new(Vec::new(), Vec::new(), vec![PersonId::new(5)]),
        )
        .unwrap();
    assert_eq!(second.deleted, 0);
}

// =============================================================================
// Cross-tree isolation
// =============================================================================

/// The same person id in two trees never collides or conflicts.
#[test]
fn test_trees_are_isolated() {
    let engine = TreeEngine::new();
    let owner = Uuid::new_v4();
    let tree_a = engine.create_tree(owner, "a", false).unwrap().id;
    let tree_b = engine.create_tree(owner, "b", false).unwrap().id;

    engine.apply_batch(owner, tree_a, adds(&[1])).unwrap();
    engine.apply_batch(owner, tree_b, adds(&[1])).unwrap();

    // Modifying in one tree leaves the other's version untouched
    let request = BatchRequest::new(Vec::new(), vec![modify(1, 0, "only a")], Vec::new());
    engine.apply_batch(owner, tree_a, request).unwrap();

    let data_b = engine.tree_data(Some(owner), tree_b).unwrap();
    assert_eq!(version_of(&data_b, 1), 0);
}
