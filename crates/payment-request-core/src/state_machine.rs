use serde::{Deserialize, Serialize};

use crate::ports::PaymentError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestState {
    Unknown,
    Created,
    Interactive,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestAction {
    Construct,
    Show,
    ShowDispatchFailed,
    ShowSettled,
    AbortSucceeded,
    Teardown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateTransition {
    pub from: RequestState,
    pub to: RequestState,
    pub reason: &'static str,
}

pub fn request_transition(
    from: RequestState,
    action: RequestAction,
) -> Result<(RequestState, StateTransition), PaymentError> {
    use RequestAction as A;
    use RequestState as S;

    let (to, reason) = match (from, action) {
        (S::Unknown, A::Construct) => (S::Created, "constructed"),
        (S::Created, A::Show) => (S::Interactive, "show dispatched"),
        (S::Created, A::ShowDispatchFailed) => (S::Closed, "show dispatch failed"),
        (S::Interactive, A::ShowSettled) => (S::Closed, "show settled"),
        (S::Interactive, A::AbortSucceeded) => (S::Closed, "aborted"),
        (S::Created | S::Interactive, A::Teardown) => (S::Closed, "torn down"),
        _ => {
            return Err(PaymentError::InvalidState(format!(
                "illegal request transition: {from:?} --{action:?}-->"
            )))
        }
    };
    Ok((to, StateTransition { from, to, reason }))
}
