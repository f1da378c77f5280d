//! Waitlist standing, approval and ordering.
//!
//! Run with: cargo test -p launchpad-integration-tests --test waitlist_scenarios

#![allow(clippy::unwrap_used)]

use launchpad_core::{PriorityLevel, Role};
use launchpad_identity::{IdentityError, MemoryDirectory, WaitEstimate, WaitlistStanding};
use launchpad_integration_tests::{provision, provision_waitlist, signed_in, wait_signed_in};

#[tokio::test]
async fn test_standing_seventh_of_fifty() {
    let directory = MemoryDirectory::new();
    provision_waitlist(&directory, "w", 50).await;
    let context = signed_in(&directory, "w7@example.com").await;

    let standing = WaitlistStanding::current(&context).await.unwrap().unwrap();
    assert_eq!(standing.position, 7);
    assert_eq!(standing.total, 50);
    assert!((standing.progress - 0.14).abs() < 1e-9);
    assert_eq!(standing.progress_percent(), 14);
    assert_eq!(standing.estimated_weeks, 1);
    assert_eq!(standing.estimate, WaitEstimate::LessThanAWeek);
    assert_eq!(standing.priority_level, PriorityLevel::Normal);
}

#[tokio::test]
async fn test_standing_absent_for_admitted_account() {
    let directory = MemoryDirectory::new();
    provision(&directory, "u@example.com", Role::User).await;
    let context = signed_in(&directory, "u@example.com").await;

    assert!(WaitlistStanding::current(&context).await.unwrap().is_none());
}

#[tokio::test]
async fn test_standing_progress_clamped_after_waitlist_shrinks() {
    let directory = MemoryDirectory::new();
    provision(&directory, "root@example.com", Role::Admin).await;
    let ids = provision_waitlist(&directory, "w", 3).await;
    let admin = signed_in(&directory, "root@example.com").await;
    let waiting = signed_in(&directory, "w3@example.com").await;

    // Position 3 is kept while the waitlist drops to a single entry
    let service = admin.identity_service();
    service.delete_account(ids[0]).await.unwrap();
    service.delete_account(ids[1]).await.unwrap();

    let standing = WaitlistStanding::current(&waiting).await.unwrap().unwrap();
    assert_eq!((standing.position, standing.total), (3, 1));
    assert!((standing.progress - 1.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_approval_keeps_stale_entry_hidden() {
    let directory = MemoryDirectory::new();
    provision(&directory, "root@example.com", Role::Admin).await;
    let target = provision(&directory, "w@example.com", Role::Waitlist).await;
    let admin = signed_in(&directory, "root@example.com").await;

    let profile = admin
        .identity_service()
        .update_role(target, Role::User)
        .await
        .unwrap();
    assert_eq!(profile.role, Role::User);

    // The entry row survives the role change
    let rows = directory.records("waitlist_users").await;
    assert_eq!(rows.len(), 1);

    // but is no longer reported as a waitlist entry
    let entry = admin.identity_service().get_waitlist_entry(Some(target)).await;
    assert_eq!(entry, Err(IdentityError::NotFound));
    let listing = admin.identity_service().list_all_waitlist_entries().await.unwrap();
    assert!(listing.is_empty());

    // and the admitted account loads as a plain user
    let admitted = signed_in(&directory, "w@example.com").await;
    let state = wait_signed_in(&admitted).await;
    assert_eq!(state.role(), Some(Role::User));
    assert!(state.waitlist_entry().is_none());
}

#[tokio::test]
async fn test_listing_follows_positions_with_ties() {
    let directory = MemoryDirectory::new();
    provision(&directory, "root@example.com", Role::Admin).await;
    let ids = provision_waitlist(&directory, "w", 3).await;
    let admin = signed_in(&directory, "root@example.com").await;
    let service = admin.identity_service();

    service.update_waitlist_position(ids[2], 1).await.unwrap();
    service
        .update_waitlist_priority(ids[2], PriorityLevel::Vip)
        .await
        .unwrap();

    let listing = service.list_all_waitlist_entries().await.unwrap();
    let positions: Vec<u32> = listing.iter().map(|l| l.position()).collect();
    assert_eq!(positions, vec![1, 1, 2]);
    let promoted = listing.iter().find(|l| l.id() == ids[2]).unwrap();
    assert_eq!(promoted.entry.priority_level, PriorityLevel::Vip);
}

#[tokio::test]
async fn test_zero_position_rejected_without_change() {
    let directory = MemoryDirectory::new();
    provision(&directory, "root@example.com", Role::Admin).await;
    let ids = provision_waitlist(&directory, "w", 1).await;
    let admin = signed_in(&directory, "root@example.com").await;
    let service = admin.identity_service();

    let err = service.update_waitlist_position(ids[0], 0).await.unwrap_err();
    assert!(matches!(err, IdentityError::Invalid(_)));
    assert_eq!(service.get_waitlist_entry(Some(ids[0])).await.unwrap().position, 1);
}

#[tokio::test]
async fn test_own_view_refreshes_after_reposition() {
    let directory = MemoryDirectory::new();
    provision(&directory, "root@example.com", Role::Admin).await;
    let ids = provision_waitlist(&directory, "w", 12).await;
    let admin = signed_in(&directory, "root@example.com").await;
    let waiting = signed_in(&directory, "w12@example.com").await;

    let before = WaitlistStanding::current(&waiting).await.unwrap().unwrap();
    assert_eq!(before.estimate, WaitEstimate::Weeks(2));

    admin
        .identity_service()
        .update_waitlist_position(ids[11], 2)
        .await
        .unwrap();
    waiting.refresh_profile().await.unwrap();

    let after = WaitlistStanding::current(&waiting).await.unwrap().unwrap();
    assert_eq!(after.position, 2);
    assert_eq!(after.estimate, WaitEstimate::LessThanAWeek);
}
