use std::rc::Weak;

use thiserror::Error;

use crate::domain::{PaymentComplete, PaymentDetailsUpdate};
use crate::record::{ServicePaymentRequest, ServiceResponse};
use crate::service::UiReply;
use crate::wire::ChangeNotification;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaymentError {
    #[error("TypeError: {0}")]
    Type(String),
    #[error("InvalidStateError: {0}")]
    InvalidState(String),
    #[error("NotAllowedError: {0}")]
    NotAllowed(String),
    #[error("NotSupportedError: {0}")]
    NotSupported(String),
    #[error("AbortError: {0}")]
    Abort(String),
    #[error("payment request not found: {0}")]
    NotFound(String),
    #[error("payment actor not initialized")]
    NotInitialized,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("unexpected: {0}")]
    Unexpected(String),
}

/// Content-side end of a payment channel. Frames are opaque bytes.
pub trait ChildTransport {
    fn channel_id(&self) -> u64;
    fn send(&self, frame: Vec<u8>) -> Result<(), PaymentError>;
    fn close(&self);
}

/// Opens a new channel to the privileged side.
pub trait ChildConnector {
    type Transport: ChildTransport;

    fn connect(&self) -> Result<Self::Transport, PaymentError>;
}

/// Privileged-side end of a payment channel.
pub trait ParentTransport {
    fn channel_id(&self) -> u64;
    fn send(&self, frame: Vec<u8>) -> Result<(), PaymentError>;
    fn close(&self);
}

/// Outbound actions issued by a content-side request, keyed by internal id.
pub trait PaymentDispatch {
    fn can_make_payment(&mut self, internal_id: &str) -> Result<(), PaymentError>;
    fn show_payment(&mut self, internal_id: &str) -> Result<(), PaymentError>;
    fn abort_payment(&mut self, internal_id: &str) -> Result<(), PaymentError>;
    fn update_payment(
        &mut self,
        internal_id: &str,
        details: &PaymentDetailsUpdate,
    ) -> Result<(), PaymentError>;
    fn complete_payment(
        &mut self,
        internal_id: &str,
        status: PaymentComplete,
    ) -> Result<(), PaymentError>;
}

/// Receiver of privileged responses and notifications; implemented by the parent actor.
pub trait ResponseSink {
    fn is_alive(&self) -> bool;
    fn respond_payment(&self, response: ServiceResponse) -> Result<(), PaymentError>;
    fn notify(&self, notification: ChangeNotification) -> Result<(), PaymentError>;
}

/// Handle to the actor that issued an action. Holds no strong reference, so a torn-down
/// actor releases every callback that still points at it.
#[derive(Clone)]
pub struct ResponseCallback {
    sink: Weak<dyn ResponseSink>,
}

impl std::fmt::Debug for ResponseCallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseCallback")
            .field("alive", &self.is_alive())
            .finish()
    }
}

impl ResponseCallback {
    pub fn new(sink: Weak<dyn ResponseSink>) -> Self {
        Self { sink }
    }

    pub fn is_alive(&self) -> bool {
        self.sink.upgrade().is_some_and(|sink| sink.is_alive())
    }

    pub fn respond(&self, response: ServiceResponse) -> Result<(), PaymentError> {
        match self.sink.upgrade() {
            Some(sink) if sink.is_alive() => sink.respond_payment(response),
            _ => Err(PaymentError::NotInitialized),
        }
    }

    pub fn notify(&self, notification: ChangeNotification) -> Result<(), PaymentError> {
        match self.sink.upgrade() {
            Some(sink) if sink.is_alive() => sink.notify(notification),
            _ => Err(PaymentError::NotInitialized),
        }
    }
}

/// The user-agent payment UI as seen from the privileged orchestrator. Outcomes are
/// never returned directly; they come back later through the `UiReply` handle.
pub trait PaymentUiPort {
    fn can_make_payment(
        &self,
        request: &ServicePaymentRequest,
        reply: UiReply,
    ) -> Result<(), PaymentError>;
    fn show_payment(&self, request: &ServicePaymentRequest, reply: UiReply)
        -> Result<(), PaymentError>;
    fn abort_payment(&self, request: &ServicePaymentRequest, reply: UiReply)
        -> Result<(), PaymentError>;
    fn complete_payment(
        &self,
        request: &ServicePaymentRequest,
        status: PaymentComplete,
        reply: UiReply,
    ) -> Result<(), PaymentError>;
    fn update_payment(&self, request: &ServicePaymentRequest) -> Result<(), PaymentError>;
}
