use payment_request_core::{request_transition, RequestAction, RequestState};

#[test]
fn accepted_flow_transitions() {
    let (s1, _) = request_transition(RequestState::Unknown, RequestAction::Construct)
        .expect("unknown -> created");
    assert_eq!(s1, RequestState::Created);
    let (s2, _) = request_transition(s1, RequestAction::Show).expect("created -> interactive");
    assert_eq!(s2, RequestState::Interactive);
    let (s3, transition) =
        request_transition(s2, RequestAction::ShowSettled).expect("interactive -> closed");
    assert_eq!(s3, RequestState::Closed);
    assert_eq!(transition.from, RequestState::Interactive);
    assert_eq!(transition.reason, "show settled");
}

#[test]
fn failed_show_dispatch_closes_a_created_request() {
    let (state, _) = request_transition(RequestState::Created, RequestAction::ShowDispatchFailed)
        .expect("created -> closed");
    assert_eq!(state, RequestState::Closed);
}

#[test]
fn abort_success_only_leaves_interactive() {
    let (state, _) = request_transition(RequestState::Interactive, RequestAction::AbortSucceeded)
        .expect("interactive -> closed");
    assert_eq!(state, RequestState::Closed);
    request_transition(RequestState::Created, RequestAction::AbortSucceeded)
        .expect_err("created cannot be aborted");
}

#[test]
fn closed_is_final() {
    for action in [
        RequestAction::Construct,
        RequestAction::Show,
        RequestAction::ShowDispatchFailed,
        RequestAction::ShowSettled,
        RequestAction::AbortSucceeded,
        RequestAction::Teardown,
    ] {
        let err = request_transition(RequestState::Closed, action).expect_err("closed is final");
        assert!(err.to_string().contains("illegal request transition"));
    }
}

#[test]
fn created_is_never_revisited() {
    request_transition(RequestState::Interactive, RequestAction::Construct)
        .expect_err("interactive cannot be constructed again");
    request_transition(RequestState::Interactive, RequestAction::Show)
        .expect_err("second show is illegal");
}

#[test]
fn teardown_closes_live_requests() {
    for from in [RequestState::Created, RequestState::Interactive] {
        let (state, _) = request_transition(from, RequestAction::Teardown).expect("teardown");
        assert_eq!(state, RequestState::Closed);
    }
    request_transition(RequestState::Unknown, RequestAction::Teardown)
        .expect_err("nothing to tear down");
}
