//! The two ends of a payment channel. Both are pure message pumps: they encode and decode
//! frames and track whether the channel is still usable.

use std::cell::Cell;
use std::rc::Rc;

use tracing::{debug, error, info, warn};

use crate::manager::PaymentRequestManager;
use crate::ports::{
    ChildConnector, ChildTransport, ParentTransport, PaymentError, PaymentUiPort,
    ResponseCallback, ResponseSink,
};
use crate::record::{PaymentActionRequest, ServiceResponse};
use crate::service::PaymentRequestService;
use crate::wire::{
    decode, encode, ActionRequest, ChangeNotification, ChildMessage, ParentMessage,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorDestroyReason {
    Deletion,
    AbnormalShutdown,
    NormalShutdown,
}

/// Content-side end of the channel.
#[derive(Debug)]
pub struct PaymentRequestChild<T: ChildTransport> {
    transport: T,
    destroyed: bool,
}

impl<T: ChildTransport> PaymentRequestChild<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            destroyed: false,
        }
    }

    pub fn channel_id(&self) -> u64 {
        self.transport.channel_id()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn send_request_payment(&self, request: ActionRequest) -> Result<(), PaymentError> {
        if self.destroyed {
            return Err(PaymentError::NotInitialized);
        }
        debug!(
            channel = self.channel_id(),
            action = request.kind(),
            request_id = request.request_id(),
            "send payment action"
        );
        self.transport
            .send(encode(&ChildMessage::RequestPayment(request))?)
    }

    pub fn recv_frame(&self, frame: &[u8]) -> Result<ParentMessage, PaymentError> {
        if self.destroyed {
            return Err(PaymentError::NotInitialized);
        }
        decode(frame)
    }

    /// Graceful teardown: tells the other side, then closes.
    pub fn delete(&mut self) {
        if self.destroyed {
            return;
        }
        if let Err(error) = encode(&ChildMessage::Delete).and_then(|f| self.transport.send(f)) {
            warn!(channel = self.channel_id(), %error, "delete frame not delivered");
        }
        self.actor_destroy(ActorDestroyReason::Deletion);
    }

    pub fn actor_destroy(&mut self, reason: ActorDestroyReason) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        self.transport.close();
        info!(channel = self.channel_id(), ?reason, "payment child actor destroyed");
    }
}

/// Routes one decoded parent message into the registry. Unknown ids are expected after a
/// request went away and are absorbed; any other registry failure is a protocol failure.
pub fn route_parent_message<C: ChildConnector>(
    manager: &mut PaymentRequestManager<C>,
    message: ParentMessage,
) -> Result<(), PaymentError> {
    let outcome = match message {
        ParentMessage::RespondPayment(response) => manager.respond_payment(response),
        ParentMessage::ChangeShipping(ChangeNotification::ShippingAddress {
            request_id,
            address,
        }) => {
            manager.change_shipping_address(&request_id, address.into());
            Ok(())
        }
        ParentMessage::ChangeShipping(ChangeNotification::ShippingOption {
            request_id,
            option,
        }) => {
            manager.change_shipping_option(&request_id, option);
            Ok(())
        }
    };
    match outcome {
        Err(PaymentError::NotFound(request_id)) => {
            warn!(%request_id, "response for an unknown payment request ignored");
            Ok(())
        }
        Err(error) => Err(PaymentError::Protocol(error.to_string())),
        Ok(()) => Ok(()),
    }
}

struct ParentEndpoint<T> {
    transport: T,
    destroyed: Cell<bool>,
}

impl<T: ParentTransport> ParentEndpoint<T> {
    fn send(&self, message: &ParentMessage) -> Result<(), PaymentError> {
        if self.destroyed.get() {
            return Err(PaymentError::NotInitialized);
        }
        self.transport.send(encode(message)?)
    }
}

impl<T: ParentTransport> ResponseSink for ParentEndpoint<T> {
    fn is_alive(&self) -> bool {
        !self.destroyed.get()
    }

    fn respond_payment(&self, response: ServiceResponse) -> Result<(), PaymentError> {
        self.send(&ParentMessage::RespondPayment(response.into()))
    }

    fn notify(&self, notification: ChangeNotification) -> Result<(), PaymentError> {
        self.send(&ParentMessage::ChangeShipping(notification))
    }
}

/// Privileged-side end of the channel. Callbacks handed to the service only hold a weak
/// reference to the endpoint, so dropping the actor releases all of them.
pub struct PaymentRequestParent<T: ParentTransport + 'static> {
    endpoint: Rc<ParentEndpoint<T>>,
}

impl<T: ParentTransport + 'static> std::fmt::Debug for PaymentRequestParent<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentRequestParent")
            .field("channel", &self.channel_id())
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}

impl<T: ParentTransport + 'static> PaymentRequestParent<T> {
    pub fn new(transport: T) -> Self {
        Self {
            endpoint: Rc::new(ParentEndpoint {
                transport,
                destroyed: Cell::new(false),
            }),
        }
    }

    pub fn channel_id(&self) -> u64 {
        self.endpoint.transport.channel_id()
    }

    pub fn transport(&self) -> &T {
        &self.endpoint.transport
    }

    pub fn is_destroyed(&self) -> bool {
        self.endpoint.destroyed.get()
    }

    pub fn callback(&self) -> ResponseCallback {
        let sink: Rc<dyn ResponseSink> = self.endpoint.clone();
        ResponseCallback::new(Rc::downgrade(&sink))
    }

    /// Decodes one child frame and hands the action to the service. Any error returned
    /// here is fatal to the channel.
    pub fn recv_frame<U: PaymentUiPort>(
        &self,
        service: &mut PaymentRequestService<U>,
        frame: &[u8],
    ) -> Result<(), PaymentError> {
        if self.is_destroyed() {
            return Err(PaymentError::NotInitialized);
        }
        match decode::<ChildMessage>(frame)? {
            ChildMessage::RequestPayment(request) => {
                debug!(
                    channel = self.channel_id(),
                    action = request.kind(),
                    request_id = request.request_id(),
                    "received payment action"
                );
                let action = PaymentActionRequest::from_wire(request, self.callback());
                service.request_payment(action).map_err(|e| {
                    error!(channel = self.channel_id(), error = %e, "payment action rejected");
                    PaymentError::Protocol(e.to_string())
                })
            }
            ChildMessage::Delete => {
                self.actor_destroy(ActorDestroyReason::Deletion);
                Ok(())
            }
        }
    }

    pub fn actor_destroy(&self, reason: ActorDestroyReason) {
        if self.endpoint.destroyed.replace(true) {
            return;
        }
        self.endpoint.transport.close();
        info!(channel = self.channel_id(), ?reason, "payment parent actor destroyed");
    }
}
