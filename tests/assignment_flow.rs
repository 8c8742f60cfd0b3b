//! Assignment acknowledgement flow against a mocked remote API.

use std::sync::{Arc, Mutex};

use kolektrash::api::KolekApi;
use kolektrash::assignments::{send_response, AssignmentBoard, Outcome, RemovalPolicy, ResponseStatus};
use kolektrash::session::{Role, Session};
use kolektrash::Id;

mod support;

use support::{Fetch, MockApi};

fn driver() -> Session {
    Session::new("7", Role::Driver)
}

fn pending_ids(board: &AssignmentBoard) -> Vec<String> {
    board
        .pending()
        .iter()
        .map(|a| a.assignment_id.to_string())
        .collect()
}

#[tokio::test]
async fn successful_fetch_populates_board() {
    let api = MockApi::with_assignments(&["1"]);
    let mut board = AssignmentBoard::default();

    board.load(&api, &driver()).await;

    assert_eq!(pending_ids(&board), vec!["1"]);
    assert_eq!(
        api.fetches.lock().unwrap().as_slice(),
        &[(Id::from("7"), Role::Driver)]
    );
}

#[tokio::test]
async fn unsuccessful_fetch_leaves_board_empty() {
    let api = MockApi::new(Fetch::Unsuccessful);
    let mut board = AssignmentBoard::default();

    board.load(&api, &driver()).await;
    assert!(board.pending().is_empty());
}

#[tokio::test]
async fn network_error_leaves_board_empty() {
    let api = MockApi::with_assignments(&["1", "2"]);
    let mut board = AssignmentBoard::default();
    board.load(&api, &driver()).await;
    assert_eq!(board.pending().len(), 2);

    api.set_fetch(Fetch::NetworkError);
    board.load(&api, &driver()).await;
    assert!(board.pending().is_empty());
}

#[tokio::test]
async fn subject_change_triggers_fresh_fetch() {
    let api = MockApi::with_assignments(&["1"]);
    let mut board = AssignmentBoard::default();
    board.load(&api, &driver()).await;

    api.set_fetch(Fetch::Assignments(vec![support::assignment("9")]));
    board.load(&api, &Session::new("8", Role::GarbageCollector)).await;

    assert_eq!(board.subject(), Some(&Id::from("8")));
    assert_eq!(pending_ids(&board), vec!["9"]);
    assert_eq!(api.fetches.lock().unwrap()[1], (Id::from("8"), Role::GarbageCollector));
}

#[tokio::test]
async fn confirm_removes_only_that_assignment() {
    for fail_writes in [false, true] {
        let api = MockApi::with_assignments(&["1", "2"]);
        api.fail_writes(fail_writes);
        let mut board = AssignmentBoard::new(RemovalPolicy::FireAndForget);
        board.load(&api, &driver()).await;

        let outcome = board
            .respond(&api, &driver(), &Id::from("1"), ResponseStatus::Confirmed)
            .await
            .unwrap();

        assert!(outcome.removed());
        assert_eq!(matches!(outcome, Outcome::Unconfirmed(_)), fail_writes);
        assert_eq!(pending_ids(&board), vec!["2"]);
    }
}

#[tokio::test]
async fn reply_carries_user_and_role() {
    let api = MockApi::with_assignments(&["1", "2"]);
    let mut board = AssignmentBoard::default();
    board.load(&api, &driver()).await;

    board
        .respond(&api, &driver(), &Id::from("2"), ResponseStatus::Declined)
        .await
        .unwrap();

    let replies = api.replies.lock().unwrap();
    assert_eq!(replies.len(), 1);
    assert_eq!(
        serde_json::to_value(&replies[0]).unwrap(),
        serde_json::json!({
            "assignment_id": 2,
            "user_id": 7,
            "response_status": "declined",
            "role": "driver",
        })
    );
}

#[tokio::test]
async fn responding_twice_is_a_no_op() {
    let api = MockApi::with_assignments(&["1"]);
    let mut board = AssignmentBoard::default();
    board.load(&api, &driver()).await;

    let id = Id::from("1");
    board.respond(&api, &driver(), &id, ResponseStatus::Confirmed).await.unwrap();
    let second = board.respond(&api, &driver(), &id, ResponseStatus::Confirmed).await.unwrap();

    assert!(matches!(second, Outcome::NotPending));
    assert_eq!(api.replies.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn restore_on_failure_reports_and_restores() {
    let api = MockApi::with_assignments(&["1", "2"]);
    api.fail_writes(true);
    let mut board = AssignmentBoard::new(RemovalPolicy::RestoreOnFailure);
    board.load(&api, &driver()).await;

    let result = board
        .respond(&api, &driver(), &Id::from("1"), ResponseStatus::Confirmed)
        .await;

    let err = result.unwrap_err();
    assert_eq!(err.to_string(), "Database unavailable");
    assert_eq!(pending_ids(&board), vec!["1", "2"]);
}

#[tokio::test]
async fn concurrent_responses_remove_their_own_records() {
    let api = MockApi::with_assignments(&["1", "2", "3"]);
    let session = driver();
    let board = Arc::new(Mutex::new(AssignmentBoard::default()));

    let ticket = board.lock().unwrap().begin_load(&session);
    let result = api.my_assignments(&session.user_id, session.role).await;
    board.lock().unwrap().finish_load(ticket, result);

    let first = board.lock().unwrap().take(&Id::from("1")).unwrap();
    let third = board.lock().unwrap().take(&Id::from("3")).unwrap();

    let (sent_first, sent_third) = tokio::join!(
        send_response(&api, &session, first.record(), ResponseStatus::Confirmed),
        send_response(&api, &session, third.record(), ResponseStatus::Declined),
    );

    let mut guard = board.lock().unwrap();
    guard.settle(third, sent_third).unwrap();
    guard.settle(first, sent_first).unwrap();

    assert_eq!(pending_ids(&guard), vec!["2"]);
    assert_eq!(api.replies.lock().unwrap().len(), 2);
}
