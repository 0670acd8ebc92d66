//! End-to-end friend request, acceptance and status change flows.

use std::sync::Arc;
use std::time::Duration;

use rapport::domain::friend::FriendStatus;
use rapport::domain::request::{AddFriendStatus, ConfirmAction, RequestStatus};
use rapport::error::ErrorKind;
use rapport::port::outbound::queue::RepairJob;
use rapport::testkit::config;
use rapport::testkit::domain::{befriend, edge_status, insert_edge, uid};
use rapport::testkit::graph::TestGraph;

fn graph_with_users(ids: &[i64]) -> TestGraph {
    let tg = TestGraph::new();
    tg.db.insert_users(ids);
    tg
}

#[tokio::test]
async fn repeated_request_is_reported_not_duplicated() {
    let tg = graph_with_users(&[1, 2]);

    let first = tg.graph.request_friend(uid(1), uid(2)).await.data.unwrap();
    let second = tg.graph.request_friend(uid(1), uid(2)).await.data.unwrap();

    assert_eq!(first.status, AddFriendStatus::SendRequestSuccess);
    assert_eq!(second.status, AddFriendStatus::AlreadySentRequest);
    assert_eq!(first.request.unwrap().id, second.request.unwrap().id);

    let incoming = tg
        .graph
        .query_friend_request_list(uid(2), RequestStatus::Requested)
        .await
        .data
        .unwrap();
    assert_eq!(incoming.len(), 1);
    assert_eq!(incoming[0].profile.as_ref().map(|p| p.name.as_str()), Some("user-1"));
}

#[tokio::test]
async fn accept_writes_both_edges_and_caches_the_pair() {
    let tg = graph_with_users(&[1, 2]);
    let request = tg
        .graph
        .request_friend(uid(1), uid(2))
        .await
        .data
        .unwrap()
        .request
        .unwrap();

    let confirmed = tg
        .graph
        .confirm_friend_request(request.id, uid(2), ConfirmAction::Accept)
        .await;
    assert!(confirmed.is_ok());
    assert_eq!(confirmed.data.unwrap().request.status, RequestStatus::Accepted);

    let db = tg.database();
    assert_eq!(edge_status(&db, 1, 2), Some(FriendStatus::Friend));
    assert_eq!(edge_status(&db, 2, 1), Some(FriendStatus::Friend));
    assert!(tg.cache.inner().contains_key("friend_status:1:2"));
    assert_eq!(tg.graph.check_is_friend(uid(2), uid(1)).await.data, Some(true));
}

#[tokio::test]
async fn only_the_target_may_confirm() {
    let tg = graph_with_users(&[1, 2, 3]);
    let request = tg
        .graph
        .request_friend(uid(1), uid(2))
        .await
        .data
        .unwrap()
        .request
        .unwrap();

    let response = tg
        .graph
        .confirm_friend_request(request.id, uid(3), ConfirmAction::Accept)
        .await;
    assert_eq!(response.error, Some(ErrorKind::NotFound));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_accepts_have_exactly_one_winner() {
    let tg = Arc::new(graph_with_users(&[1, 2]));
    let request = tg
        .graph
        .request_friend(uid(1), uid(2))
        .await
        .data
        .unwrap()
        .request
        .unwrap();

    let mut tasks = Vec::new();
    for _ in 0..2 {
        let tg = Arc::clone(&tg);
        tasks.push(tokio::spawn(async move {
            tg.graph
                .confirm_friend_request(request.id, uid(2), ConfirmAction::Accept)
                .await
        }));
    }

    let mut winners = 0;
    let mut losers = 0;
    for task in tasks {
        let response = task.await.unwrap();
        match response.error {
            None => winners += 1,
            Some(ErrorKind::InvalidState) => losers += 1,
            Some(other) => panic!("unexpected outcome {other}"),
        }
    }
    assert_eq!((winners, losers), (1, 1));

    let friends = tg
        .graph
        .query_friend_list(uid(1), Some(FriendStatus::Friend))
        .await
        .data
        .unwrap();
    assert_eq!(friends.len(), 1);
}

#[tokio::test]
async fn late_confirmation_is_invalid_state() {
    let tg = graph_with_users(&[1, 2]);
    let request = tg
        .graph
        .request_friend(uid(1), uid(2))
        .await
        .data
        .unwrap()
        .request
        .unwrap();

    let rejected = tg
        .graph
        .confirm_friend_request(request.id, uid(2), ConfirmAction::Reject)
        .await;
    assert!(rejected.is_ok());

    let late = tg
        .graph
        .confirm_friend_request(request.id, uid(2), ConfirmAction::Accept)
        .await;
    assert_eq!(late.error, Some(ErrorKind::InvalidState));
    assert_eq!(edge_status(&tg.database(), 1, 2), None);
}

#[tokio::test]
async fn failed_accept_rolls_back_the_request() {
    let tg = graph_with_users(&[1, 2]);
    let request = tg
        .graph
        .request_friend(uid(1), uid(2))
        .await
        .data
        .unwrap()
        .request
        .unwrap();
    // The requester blocks the target before the target accepts.
    let blocked = tg.graph.update_friend_status(uid(1), uid(2), FriendStatus::Blocked).await;
    assert!(blocked.is_ok());

    let response = tg
        .graph
        .confirm_friend_request(request.id, uid(2), ConfirmAction::Accept)
        .await;
    assert_eq!(response.error, Some(ErrorKind::InvalidState));

    let db = tg.database();
    assert_eq!(edge_status(&db, 1, 2), Some(FriendStatus::Blocked));
    assert_eq!(edge_status(&db, 2, 1), None);
    let stored = tg.graph.get_friend_request(uid(1), uid(2)).await.data.unwrap();
    assert_eq!(stored.status, RequestStatus::Requested);
    assert!(!tg.cache.inner().contains_key("friend_status:1:2"));
}

#[tokio::test]
async fn blocks_are_reported_in_both_directions() {
    let tg = graph_with_users(&[1, 2, 3]);
    let db = tg.database();
    insert_edge(&db, 2, 1, FriendStatus::Blocked);
    insert_edge(&db, 1, 3, FriendStatus::Blocked);

    let by_friend = tg.graph.request_friend(uid(1), uid(2)).await.data.unwrap();
    assert_eq!(by_friend.status, AddFriendStatus::BlockedByFriend);

    let by_me = tg.graph.request_friend(uid(1), uid(3)).await.data.unwrap();
    assert_eq!(by_me.status, AddFriendStatus::BlockedByMe);

    let missing = tg.graph.get_friend_request(uid(1), uid(2)).await;
    assert_eq!(missing.error, Some(ErrorKind::NotFound));
}

#[tokio::test]
async fn request_completes_when_peer_still_considers_requester_a_friend() {
    let tg = graph_with_users(&[1, 2]);
    let db = tg.database();
    insert_edge(&db, 2, 1, FriendStatus::Friend);
    insert_edge(&db, 1, 2, FriendStatus::Stranger);

    let outcome = tg.graph.request_friend(uid(1), uid(2)).await.data.unwrap();

    assert_eq!(outcome.status, AddFriendStatus::AddFriendSuccess);
    assert!(outcome.request.is_none());
    assert_eq!(edge_status(&db, 1, 2), Some(FriendStatus::Friend));
    assert_eq!(tg.graph.check_is_friend(uid(1), uid(2)).await.data, Some(true));
}

#[tokio::test]
async fn mutual_friend_invariant_holds_through_unfriend_and_block() {
    let tg = graph_with_users(&[1, 2]);
    befriend(&tg.database(), 1, 2);
    assert_eq!(tg.graph.check_is_friend(uid(1), uid(2)).await.data, Some(true));

    tg.graph
        .update_friend_status(uid(2), uid(1), FriendStatus::Stranger)
        .await;
    assert_eq!(tg.graph.check_is_friend(uid(1), uid(2)).await.data, Some(false));

    // Re-befriending through the workflow auto-completes from 1's FRIEND edge.
    let outcome = tg.graph.request_friend(uid(2), uid(1)).await.data.unwrap();
    assert_eq!(outcome.status, AddFriendStatus::AddFriendSuccess);
    assert_eq!(tg.graph.check_is_friend(uid(1), uid(2)).await.data, Some(true));

    tg.graph
        .update_friend_status(uid(1), uid(2), FriendStatus::Blocked)
        .await;
    assert_eq!(tg.graph.check_is_friend(uid(2), uid(1)).await.data, Some(false));
}

#[tokio::test]
async fn cache_outage_after_commit_is_repaired_not_reported_as_failure() {
    let tg = graph_with_users(&[1, 2]);
    let request = tg
        .graph
        .request_friend(uid(1), uid(2))
        .await
        .data
        .unwrap()
        .request
        .unwrap();
    tg.cache.set_failing(true);

    let response = tg
        .graph
        .confirm_friend_request(request.id, uid(2), ConfirmAction::Accept)
        .await;

    assert!(response.is_ok());
    assert!(response.detail.is_some());
    assert!(response.data.unwrap().repair_pending);
    assert_eq!(
        tg.queue.jobs(),
        vec![RepairJob::MarkFriends {
            uid_a: uid(1),
            uid_b: uid(2)
        }]
    );
    // A cache miss is never read as "not friends".
    assert_eq!(tg.graph.check_is_friend(uid(1), uid(2)).await.data, Some(true));
}

#[tokio::test]
async fn friend_limit_applies_to_new_requests() {
    let tg = TestGraph::with_settings(config::with_max_friends(1));
    tg.db.insert_users(&[1, 2, 3]);
    befriend(&tg.database(), 1, 2);

    let response = tg.graph.request_friend(uid(1), uid(3)).await;
    assert_eq!(response.error, Some(ErrorKind::CapacityExceeded));
}

#[tokio::test]
async fn self_and_unknown_targets_are_rejected() {
    let tg = graph_with_users(&[1]);

    let to_self = tg.graph.request_friend(uid(1), uid(1)).await;
    assert_eq!(to_self.error, Some(ErrorKind::InvalidState));

    let unknown = tg.graph.request_friend(uid(1), uid(404)).await;
    assert_eq!(unknown.error, Some(ErrorKind::NotFound));
}

#[tokio::test]
async fn request_completes_against_an_unblocked_peer_without_caching() {
    let tg = graph_with_users(&[1, 2]);
    let db = tg.database();
    insert_edge(&db, 2, 1, FriendStatus::Unblocked);

    let outcome = tg.graph.request_friend(uid(1), uid(2)).await.data.unwrap();

    assert_eq!(outcome.status, AddFriendStatus::AddFriendSuccess);
    assert!(outcome.request.is_none());
    assert_eq!(edge_status(&db, 1, 2), Some(FriendStatus::Friend));
    assert_eq!(edge_status(&db, 2, 1), Some(FriendStatus::Unblocked));
    assert!(!tg.cache.inner().contains_key("friend_status:1:2"));
    assert_eq!(tg.graph.check_is_friend(uid(1), uid(2)).await.data, Some(false));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn check_racing_a_block_leaves_no_stale_positive() {
    let tg = Arc::new(TestGraph::with_settings(config::with_cache_timeout(
        Duration::from_secs(2),
    )));
    tg.db.insert_users(&[1, 2]);
    befriend(&tg.database(), 1, 2);
    tg.cache.set_write_delay(Some(Duration::from_millis(300)));

    // The check reads a mutual pair and stalls writing the marker; the block
    // commits and clears the key while that write is still in flight.
    let check = {
        let tg = Arc::clone(&tg);
        tokio::spawn(async move { tg.graph.check_is_friend(uid(1), uid(2)).await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;
    let block = tg
        .graph
        .update_friend_status(uid(1), uid(2), FriendStatus::Blocked)
        .await;
    assert!(block.is_ok());
    assert!(check.await.unwrap().is_ok());
    tg.cache.set_write_delay(None);

    assert_eq!(edge_status(&tg.database(), 1, 2), Some(FriendStatus::Blocked));
    assert!(!tg.cache.inner().contains_key("friend_status:1:2"));
    assert_eq!(tg.graph.check_is_friend(uid(1), uid(2)).await.data, Some(false));
}
