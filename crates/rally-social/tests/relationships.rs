//! Integration tests for the friend-request lifecycle.

use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::{Duration, TimeZone, Utc};
use rally_protocol::{AccountId, FriendAction, RelationStatus};
use rally_session::AccountStore;
use rally_social::{FriendshipStatus, RelationshipService, SocialError};
use rally_token::{Clock, ManualClock};

// =========================================================================
// Helpers
// =========================================================================

struct World {
    clock: Arc<ManualClock>,
    accounts: Arc<AccountStore>,
    social: Arc<RelationshipService>,
    ana: AccountId,
    bob: AccountId,
    cat: AccountId,
}

async fn world() -> World {
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 5, 1, 18, 0, 0).unwrap(),
    ));
    let accounts = Arc::new(AccountStore::new(clock.clone()));
    let ana = accounts.register("ana", "h".into()).await.unwrap();
    let bob = accounts.register("bob", "h".into()).await.unwrap();
    let cat = accounts.register("cat", "h".into()).await.unwrap();
    let social = Arc::new(RelationshipService::new(accounts.clone(), clock.clone()));
    World {
        clock,
        accounts,
        social,
        ana,
        bob,
        cat,
    }
}

async fn befriend(w: &World, a: AccountId, b: AccountId) {
    w.social.request(a, b).await.unwrap();
    w.social.respond(b, a, FriendAction::Accept).await.unwrap();
}

// =========================================================================
// request()
// =========================================================================

#[tokio::test]
async fn test_request_creates_pending_row_from_requester() {
    let w = world().await;

    w.social.request(w.ana, w.bob).await.unwrap();

    let edge = w.social.friendship(w.bob, w.ana).await.unwrap();
    assert_eq!(edge.requester, w.ana);
    assert_eq!(edge.recipient, w.bob);
    assert_eq!(edge.status, FriendshipStatus::Pending);
    assert_eq!(edge.created_at, w.clock.now());
    assert_eq!(edge.responded_at, None);
}

#[tokio::test]
async fn test_request_twice_same_direction_returns_already_exists() {
    let w = world().await;
    w.social.request(w.ana, w.bob).await.unwrap();

    assert_matches!(w.social.request(w.ana, w.bob).await, Err(SocialError::AlreadyExists));
}

#[tokio::test]
async fn test_request_reverse_direction_while_pending_returns_already_exists() {
    let w = world().await;
    w.social.request(w.ana, w.bob).await.unwrap();

    assert_matches!(w.social.request(w.bob, w.ana).await, Err(SocialError::AlreadyExists));
    assert_eq!(w.social.edge_count().await, 1);
}

#[tokio::test]
async fn test_request_between_friends_returns_already_exists() {
    let w = world().await;
    befriend(&w, w.ana, w.bob).await;

    assert_matches!(w.social.request(w.bob, w.ana).await, Err(SocialError::AlreadyExists));
}

// =========================================================================
// respond()
// =========================================================================

#[tokio::test]
async fn test_respond_accept_makes_both_sides_friends() {
    let w = world().await;
    w.social.request(w.ana, w.bob).await.unwrap();
    w.clock.advance(Duration::minutes(3));

    w.social.respond(w.bob, w.ana, FriendAction::Accept).await.unwrap();

    let edge = w.social.friendship(w.ana, w.bob).await.unwrap();
    assert_eq!(edge.status, FriendshipStatus::Accepted);
    assert_eq!(edge.responded_at, Some(w.clock.now()));

    let ana_friends = w.social.list_friends(w.ana).await.unwrap();
    let bob_friends = w.social.list_friends(w.bob).await.unwrap();
    assert_eq!(ana_friends.len(), 1);
    assert_eq!(ana_friends[0].friend.id, w.bob);
    assert_eq!(ana_friends[0].friend.username, "bob");
    assert_eq!(bob_friends[0].friend.id, w.ana);
}

#[tokio::test]
async fn test_respond_decline_deletes_row_and_allows_new_request() {
    let w = world().await;
    w.social.request(w.ana, w.bob).await.unwrap();

    w.social.respond(w.bob, w.ana, FriendAction::Decline).await.unwrap();

    assert!(w.social.friendship(w.ana, w.bob).await.is_none());
    assert_eq!(w.social.status_of(w.ana, w.bob).await, RelationStatus::None);
    // Either side may now start over.
    assert!(w.social.request(w.bob, w.ana).await.is_ok());
}

#[tokio::test]
async fn test_respond_without_pending_request_returns_request_not_found() {
    let w = world().await;

    assert_matches!(
        w.social.respond(w.bob, w.ana, FriendAction::Accept).await,
        Err(SocialError::RequestNotFound)
    );
}

#[tokio::test]
async fn test_respond_to_unknown_requester_returns_account_not_found() {
    let w = world().await;

    assert_matches!(
        w.social.respond(w.bob, AccountId(999), FriendAction::Accept).await,
        Err(SocialError::AccountNotFound(AccountId(999)))
    );
}

#[tokio::test]
async fn test_respond_to_accepted_friendship_returns_request_not_found() {
    let w = world().await;
    befriend(&w, w.ana, w.bob).await;

    assert_matches!(
        w.social.respond(w.bob, w.ana, FriendAction::Decline).await,
        Err(SocialError::RequestNotFound)
    );
    assert_eq!(w.social.status_of(w.ana, w.bob).await, RelationStatus::Accepted);
}

// =========================================================================
// remove()
// =========================================================================

#[tokio::test]
async fn test_remove_accepted_friendship_from_either_side() {
    let w = world().await;
    befriend(&w, w.ana, w.bob).await;
    befriend(&w, w.cat, w.ana).await;

    w.social.remove(w.bob, w.ana).await.unwrap();
    w.social.remove(w.ana, w.cat).await.unwrap();

    assert!(w.social.list_friends(w.ana).await.unwrap().is_empty());
    assert_eq!(w.social.edge_count().await, 0);
}

#[tokio::test]
async fn test_remove_pending_request_returns_not_friends() {
    let w = world().await;
    w.social.request(w.ana, w.bob).await.unwrap();

    assert_matches!(w.social.remove(w.ana, w.bob).await, Err(SocialError::NotFriends));
    assert_eq!(w.social.status_of(w.ana, w.bob).await, RelationStatus::Pending);
}

#[tokio::test]
async fn test_remove_strangers_returns_not_friends() {
    let w = world().await;
    assert_matches!(w.social.remove(w.ana, w.cat).await, Err(SocialError::NotFriends));
}

#[tokio::test]
async fn test_remove_unknown_friend_returns_account_not_found() {
    let w = world().await;
    assert_matches!(
        w.social.remove(w.ana, AccountId(999)).await,
        Err(SocialError::AccountNotFound(AccountId(999)))
    );
}

// =========================================================================
// Listings and status
// =========================================================================

#[tokio::test]
async fn test_list_friends_sorted_by_id_and_excludes_pending() {
    let w = world().await;
    befriend(&w, w.cat, w.bob).await;
    befriend(&w, w.bob, w.ana).await;
    let dan = w.accounts.register("dan", "h".into()).await.unwrap();
    w.social.request(dan, w.bob).await.unwrap();

    let friends: Vec<_> = w
        .social
        .list_friends(w.bob)
        .await
        .unwrap()
        .into_iter()
        .map(|entry| entry.friend.id)
        .collect();

    assert_eq!(friends, vec![w.ana, w.cat]);
}

#[tokio::test]
async fn test_list_friends_unknown_account_returns_not_found() {
    let w = world().await;
    assert_matches!(
        w.social.list_friends(AccountId(404)).await,
        Err(SocialError::AccountNotFound(_))
    );
}

#[tokio::test]
async fn test_list_friends_empty_is_ok() {
    let w = world().await;
    assert!(w.social.list_friends(w.ana).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_list_incoming_oldest_first_and_only_for_recipient() {
    let w = world().await;
    w.social.request(w.cat, w.ana).await.unwrap();
    w.clock.advance(Duration::seconds(30));
    w.social.request(w.bob, w.ana).await.unwrap();
    w.social.request(w.ana, w.cat).await.ok(); // rejected: pair exists

    let incoming = w.social.list_incoming(w.ana).await;

    let requesters: Vec<_> = incoming.iter().map(|r| r.requester.id).collect();
    assert_eq!(requesters, vec![w.cat, w.bob]);
    assert!(incoming[0].created_at < incoming[1].created_at);
    assert!(w.social.list_incoming(w.bob).await.is_empty());
}

#[tokio::test]
async fn test_list_incoming_drops_accepted_requests() {
    let w = world().await;
    befriend(&w, w.bob, w.ana).await;

    assert!(w.social.list_incoming(w.ana).await.is_empty());
}

#[tokio::test]
async fn test_status_of_is_symmetric_and_never_fails() {
    let w = world().await;
    w.social.request(w.ana, w.bob).await.unwrap();

    assert_eq!(w.social.status_of(w.ana, w.bob).await, RelationStatus::Pending);
    assert_eq!(w.social.status_of(w.bob, w.ana).await, RelationStatus::Pending);
    assert_eq!(w.social.status_of(w.ana, w.cat).await, RelationStatus::None);
    assert_eq!(w.social.status_of(w.ana, w.ana).await, RelationStatus::None);
    assert_eq!(
        w.social.status_of(AccountId(500), AccountId(501)).await,
        RelationStatus::None
    );
}

// =========================================================================
// Races
// =========================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_both_directions_create_one_row() {
    let w = world().await;

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let social = w.social.clone();
            let (from, to) = if i % 2 == 0 { (w.ana, w.bob) } else { (w.bob, w.ana) };
            tokio::spawn(async move { social.request(from, to).await })
        })
        .collect();

    let mut created = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(()) => created += 1,
            Err(SocialError::AlreadyExists) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(created, 1);
    assert_eq!(w.social.edge_count().await, 1);
}
