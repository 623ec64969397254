mod common;

use common::TestHarness;
use tasktrack_core::models::{CommentFilters, Pagination, Principal, TaskFilters, TaskUpdate};
use tasktrack_core::services::ServiceError;

#[tokio::test]
async fn test_user_never_sees_foreign_task_via_cache() {
    let harness = TestHarness::new();
    let owner = Principal::user(7);
    let stranger = Principal::user(8);
    let task = harness.create_task(&owner, "private").await;

    harness.tasks.get(&owner, task.id).await.unwrap();
    assert!(harness.memory.contains_key(&format!("task:{}", task.id)));

    let err = harness.tasks.get(&stranger, task.id).await.unwrap_err();
    assert_eq!(err, ServiceError::Forbidden);
}

#[tokio::test]
async fn test_admin_reads_any_task_and_missing_is_not_found() {
    let harness = TestHarness::new();
    let task = harness.create_task(&Principal::user(7), "t").await;
    let admin = Principal::admin(1);

    assert_eq!(harness.tasks.get(&admin, task.id).await.unwrap().id, task.id);
    assert_eq!(
        harness.tasks.get(&admin, 999).await.unwrap_err(),
        ServiceError::NotFound("Task".to_string())
    );
}

#[tokio::test]
async fn test_owner_filter_is_ignored_for_regular_users() {
    let harness = TestHarness::new();
    let seven = Principal::user(7);
    harness.create_task(&seven, "mine").await;
    harness.create_task(&Principal::user(8), "theirs").await;

    let snooping = TaskFilters {
        owner_id: Some(8),
        ..Default::default()
    };
    let listing = harness.tasks.list(&seven, &snooping, Pagination::default()).await.unwrap();
    assert_eq!(listing.total, 1);
    assert!(listing.items.iter().all(|t| t.owner_id == 7));

    let admin_view = harness
        .tasks
        .list(&Principal::admin(1), &snooping, Pagination::default())
        .await
        .unwrap();
    assert!(admin_view.items.iter().all(|t| t.owner_id == 8));
}

#[tokio::test]
async fn test_listing_cache_is_partitioned_per_principal() {
    let harness = TestHarness::new();
    let seven = Principal::user(7);
    let eight = Principal::user(8);
    harness.create_task(&seven, "mine").await;

    let mine = harness.tasks.list(&seven, &TaskFilters::default(), Pagination::default()).await.unwrap();
    let theirs = harness.tasks.list(&eight, &TaskFilters::default(), Pagination::default()).await.unwrap();
    assert_eq!(mine.total, 1);
    assert_eq!(theirs.total, 0);
}

#[tokio::test]
async fn test_comment_visibility_rules() {
    let harness = TestHarness::new();
    let owner = Principal::user(7);
    let admin = Principal::admin(1);
    let outsider = Principal::user(9);

    let task = harness.create_task(&owner, "t").await;
    let by_admin = harness.create_comment(&admin, task.id, "admin note").await;
    let by_owner = harness.create_comment(&owner, task.id, "owner note").await;

    // Task owner sees comments on their task, whoever wrote them
    let listing = harness.comments.list(&owner, &CommentFilters::default(), Pagination::default()).await.unwrap();
    assert_eq!(listing.total, 2);
    assert!(harness.comments.get(&owner, by_admin.id).await.is_ok());

    // Outsider sees nothing, by listing or by id, even with a warm cache
    let listing = harness.comments.list(&outsider, &CommentFilters::default(), Pagination::default()).await.unwrap();
    assert_eq!(listing.total, 0);
    assert_eq!(
        harness.comments.get(&outsider, by_owner.id).await.unwrap_err(),
        ServiceError::Forbidden
    );
}

#[tokio::test]
async fn test_ownership_rechecked_after_cache_hit() {
    let harness = TestHarness::new();
    let owner = Principal::user(7);
    let task = harness.create_task(&owner, "t").await;
    harness.tasks.get(&owner, task.id).await.unwrap();

    let err = harness
        .tasks
        .update(
            &Principal::user(8),
            task.id,
            &TaskUpdate {
                title: Some("mine now".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err, ServiceError::Forbidden);
    assert_eq!(harness.tasks.get(&owner, task.id).await.unwrap().title, "t");
}

#[tokio::test]
async fn test_delete_task_cascades_and_forbids_strangers() {
    let harness = TestHarness::new();
    let owner = Principal::user(7);
    let task = harness.create_task(&owner, "t").await;
    harness.create_comment(&owner, task.id, "note").await;

    assert_eq!(
        harness.tasks.delete(&Principal::user(8), task.id).await.unwrap_err(),
        ServiceError::Forbidden
    );
    harness.tasks.delete(&owner, task.id).await.unwrap();

    assert_eq!(
        harness.tasks.get(&owner, task.id).await.unwrap_err(),
        ServiceError::NotFound("Task".to_string())
    );
    let listing = harness
        .comments
        .list(&Principal::admin(1), &CommentFilters::default(), Pagination::default())
        .await
        .unwrap();
    assert_eq!(listing.total, 0);
}

#[tokio::test]
async fn test_cascaded_comment_detail_is_not_served_after_task_delete() {
    let harness = TestHarness::new();
    let owner = Principal::user(7);
    let admin = Principal::admin(1);
    let task = harness.create_task(&owner, "t").await;
    let own_note = harness.create_comment(&owner, task.id, "mine").await;
    let admin_note = harness.create_comment(&admin, task.id, "from admin").await;

    harness.comments.get(&owner, own_note.id).await.unwrap();
    harness.comments.get(&owner, admin_note.id).await.unwrap();
    assert!(harness.memory.contains_key(&format!("comment:{}", own_note.id)));

    harness.tasks.delete(&owner, task.id).await.unwrap();

    assert!(!harness.memory.contains_key(&format!("comment:{}", own_note.id)));
    assert!(!harness.memory.contains_key(&format!("comment:{}", admin_note.id)));
    for comment_id in [own_note.id, admin_note.id] {
        assert_eq!(
            harness.comments.get(&owner, comment_id).await.unwrap_err(),
            ServiceError::NotFound("Comment".to_string())
        );
    }
}
