mod common;

use common::TestHarness;
use tasktrack_core::models::{
    CommentFilters, CommentUpdate, Pagination, Principal, TaskFilters, TaskUpdate,
};

fn pending() -> TaskFilters {
    TaskFilters {
        status: Some("pending".to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_list_is_served_from_cache_on_second_call() {
    let harness = TestHarness::new();
    let user = Principal::user(7);
    harness.create_task(&user, "a").await;

    let first = harness.tasks.list(&user, &pending(), Pagination::default()).await.unwrap();
    let reads = harness.repo.read_count();
    let second = harness.tasks.list(&user, &pending(), Pagination::default()).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(harness.repo.read_count(), reads);
    assert_eq!(harness.memory.keys_matching("tasks:user:7:*").len(), 1);
}

#[tokio::test]
async fn test_update_bypasses_every_stale_listing_of_the_owner() {
    let harness = TestHarness::new();
    let user = Principal::user(7);
    let task = harness.create_task(&user, "a").await;

    harness.tasks.list(&user, &pending(), Pagination::default()).await.unwrap();
    harness.tasks.list(&user, &TaskFilters::default(), Pagination::new(1, 5)).await.unwrap();
    harness.tasks.stats(&user).await.unwrap();
    assert_eq!(harness.memory.keys_matching("tasks:user:7:*").len(), 3);

    harness
        .tasks
        .update(
            &user,
            task.id,
            &TaskUpdate {
                status: Some("completed".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert!(harness.memory.keys_matching("tasks:user:7:*").is_empty());
    let listing = harness.tasks.list(&user, &pending(), Pagination::default()).await.unwrap();
    assert_eq!(listing.total, 0);
}

#[tokio::test]
async fn test_detail_never_returns_pre_update_value() {
    let harness = TestHarness::new();
    let user = Principal::user(7);
    let task = harness.create_task(&user, "before").await;

    assert_eq!(harness.tasks.get(&user, task.id).await.unwrap().title, "before");
    harness
        .tasks
        .update(
            &user,
            task.id,
            &TaskUpdate {
                title: Some("after".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(harness.tasks.get(&user, task.id).await.unwrap().title, "after");
}

#[tokio::test]
async fn test_other_principals_listings_are_untouched() {
    let harness = TestHarness::new();
    let seven = Principal::user(7);
    let eight = Principal::user(8);
    harness.create_task(&eight, "theirs").await;
    harness.tasks.list(&eight, &TaskFilters::default(), Pagination::default()).await.unwrap();

    harness.create_task(&seven, "mine").await;
    assert_eq!(harness.memory.keys_matching("tasks:user:8:*").len(), 1);
}

#[tokio::test]
async fn test_comment_mutation_refreshes_task_comment_count() {
    let harness = TestHarness::new();
    let owner = Principal::user(7);
    let task = harness.create_task(&owner, "t").await;

    assert_eq!(harness.tasks.get(&owner, task.id).await.unwrap().comment_count, 0);
    let listing = harness.tasks.list(&owner, &TaskFilters::default(), Pagination::default()).await.unwrap();
    assert_eq!(listing.items[0].comment_count, 0);

    let comment = harness.create_comment(&owner, task.id, "note").await;
    assert_eq!(harness.tasks.get(&owner, task.id).await.unwrap().comment_count, 1);
    let listing = harness.tasks.list(&owner, &TaskFilters::default(), Pagination::default()).await.unwrap();
    assert_eq!(listing.items[0].comment_count, 1);

    harness.comments.delete(&owner, comment.id).await.unwrap();
    assert_eq!(harness.tasks.get(&owner, task.id).await.unwrap().comment_count, 0);
}

#[tokio::test]
async fn test_comment_mutation_clears_every_comment_listing() {
    let harness = TestHarness::new();
    let owner = Principal::user(7);
    let admin = Principal::admin(1);
    let task = harness.create_task(&owner, "t").await;
    let comment = harness.create_comment(&owner, task.id, "v1").await;

    harness.comments.list(&owner, &CommentFilters::default(), Pagination::default()).await.unwrap();
    harness.comments.list(&admin, &CommentFilters::default(), Pagination::default()).await.unwrap();
    assert_eq!(harness.memory.keys_matching("comments:*").len(), 2);

    harness
        .comments
        .update(&owner, comment.id, &CommentUpdate { content: "v2".to_string() })
        .await
        .unwrap();
    assert!(harness.memory.keys_matching("comments:*").is_empty());

    let listing = harness
        .comments
        .list(&admin, &CommentFilters::default(), Pagination::default())
        .await
        .unwrap();
    assert_eq!(listing.items[0].content, "v2");
}

#[tokio::test]
async fn test_cache_outage_degrades_to_store_reads() {
    let harness = TestHarness::new();
    let user = Principal::user(7);
    let task = harness.create_task(&user, "a").await;
    harness.memory.set_available(false);

    let before = harness.repo.read_count();
    assert_eq!(harness.tasks.get(&user, task.id).await.unwrap().id, task.id);
    assert_eq!(harness.tasks.get(&user, task.id).await.unwrap().id, task.id);
    assert_eq!(harness.repo.read_count(), before + 2);

    harness
        .tasks
        .update(
            &user,
            task.id,
            &TaskUpdate {
                title: Some("still works".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_pagination_envelope() {
    let harness = TestHarness::new();
    let user = Principal::user(7);
    for i in 0..5 {
        harness.create_task(&user, &format!("task {i}")).await;
    }

    let page = harness
        .tasks
        .list(&user, &TaskFilters::default(), Pagination::new(2, 2))
        .await
        .unwrap();
    assert_eq!(page.total, 5);
    assert_eq!(page.total_pages, 3);
    assert!(page.has_next);
    assert!(page.has_prev);
    assert_eq!(page.items.len(), 2);

    let err = harness
        .tasks
        .list(&user, &TaskFilters::default(), Pagination::new(0, 2))
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "VALIDATION_ERROR");
}
