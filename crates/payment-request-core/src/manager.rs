//! Content-side registry of live payment requests.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::actor::{route_parent_message, ActorDestroyReason, PaymentRequestChild};
use crate::domain::{
    PaymentAddress, PaymentComplete, PaymentDetailsInit, PaymentDetailsUpdate, PaymentMethodData,
    PaymentOptions, PaymentShippingType,
};
use crate::ports::{ChildConnector, PaymentDispatch, PaymentError};
use crate::promise::Promise;
use crate::request::{PaymentRequest, PaymentRequestUpdateEvent, PaymentResponse, ShowResult};
use crate::state_machine::RequestState;
use crate::validation::validate_details_init;
use crate::wire::{
    ActionRequest, ActionResponse, IpcMethodData, IpcPaymentDetails, IpcPaymentOptions,
};

/// Outbound half of the registry: owns the connector and at most one child actor.
/// Requests created on a channel that has since been destroyed stay bound to it and
/// never reach a successor.
pub(crate) struct Outbound<C: ChildConnector> {
    connector: C,
    child: Option<PaymentRequestChild<C::Transport>>,
    orphaned: HashSet<String>,
}

impl<C: ChildConnector> Outbound<C> {
    fn connect(&mut self) -> Result<&PaymentRequestChild<C::Transport>, PaymentError> {
        let live = self.child.as_ref().is_some_and(|child| !child.is_destroyed());
        if !live {
            let child = PaymentRequestChild::new(self.connector.connect()?);
            info!(channel = child.channel_id(), "payment child actor connected");
            self.child = Some(child);
        }
        self.child.as_ref().ok_or(PaymentError::NotInitialized)
    }

    fn send(&self, request: ActionRequest) -> Result<(), PaymentError> {
        if self.orphaned.contains(request.request_id()) {
            return Err(PaymentError::NotInitialized);
        }
        self.child
            .as_ref()
            .ok_or(PaymentError::NotInitialized)?
            .send_request_payment(request)
    }

    fn release(&mut self) {
        if let Some(mut child) = self.child.take() {
            child.delete();
        }
    }
}

impl<C: ChildConnector> PaymentDispatch for Outbound<C> {
    fn can_make_payment(&mut self, internal_id: &str) -> Result<(), PaymentError> {
        self.send(ActionRequest::CanMake {
            request_id: internal_id.to_owned(),
        })
    }

    fn show_payment(&mut self, internal_id: &str) -> Result<(), PaymentError> {
        self.send(ActionRequest::Show {
            request_id: internal_id.to_owned(),
        })
    }

    fn abort_payment(&mut self, internal_id: &str) -> Result<(), PaymentError> {
        self.send(ActionRequest::Abort {
            request_id: internal_id.to_owned(),
        })
    }

    fn update_payment(
        &mut self,
        internal_id: &str,
        details: &PaymentDetailsUpdate,
    ) -> Result<(), PaymentError> {
        self.send(ActionRequest::Update {
            request_id: internal_id.to_owned(),
            details: IpcPaymentDetails::from_update(details)?,
        })
    }

    fn complete_payment(
        &mut self,
        internal_id: &str,
        status: PaymentComplete,
    ) -> Result<(), PaymentError> {
        self.send(ActionRequest::Complete {
            request_id: internal_id.to_owned(),
            complete_status: status,
        })
    }
}

/// Per-process registry mapping internal ids to requests. Built explicitly by the content
/// host and handed the connector used to reach the privileged side.
pub struct PaymentRequestManager<C: ChildConnector> {
    tab_id: u64,
    release_idle_actor: bool,
    requests: HashMap<String, PaymentRequest>,
    outbound: Outbound<C>,
}

impl<C: ChildConnector> PaymentRequestManager<C> {
    pub fn new(connector: C, tab_id: u64, release_idle_actor: bool) -> Self {
        Self {
            tab_id,
            release_idle_actor,
            requests: HashMap::new(),
            outbound: Outbound {
                connector,
                child: None,
                orphaned: HashSet::new(),
            },
        }
    }

    pub fn tab_id(&self) -> u64 {
        self.tab_id
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    pub fn child(&self) -> Option<&PaymentRequestChild<C::Transport>> {
        self.outbound.child.as_ref()
    }

    /// Validates and registers a new request, then announces it to the privileged side.
    /// Returns the internal id; the record is discoverable before the Create action leaves.
    pub fn create_payment(
        &mut self,
        method_data: &[PaymentMethodData],
        details: &PaymentDetailsInit,
        options: PaymentOptions,
    ) -> Result<String, PaymentError> {
        if method_data.is_empty() {
            return Err(PaymentError::Type(
                "At least one payment method is required".to_owned(),
            ));
        }
        validate_details_init(details)?;
        let method_data = method_data
            .iter()
            .map(IpcMethodData::from_method_data)
            .collect::<Result<Vec<_>, _>>()?;

        let internal_id = Uuid::new_v4().to_string();
        let request = PaymentRequest::new(internal_id.clone(), details, options)?;
        let create = ActionRequest::Create {
            tab_id: self.tab_id,
            request_id: internal_id.clone(),
            method_data,
            details: IpcPaymentDetails::from_init(details, request.id())?,
            options: IpcPaymentOptions::from(request.options()),
        };
        self.requests.insert(internal_id.clone(), request);
        info!(request_id = %internal_id, "payment request registered");

        let sent = self
            .outbound
            .connect()
            .and_then(|child| child.send_request_payment(create));
        if let Err(error) = sent {
            warn!(request_id = %internal_id, %error, "create action failed; unregistering");
            self.requests.remove(&internal_id);
            return Err(error);
        }
        Ok(internal_id)
    }

    pub fn get_by_internal_id(&self, internal_id: &str) -> Option<&PaymentRequest> {
        self.requests.get(internal_id)
    }

    /// Script-facing view of one request.
    pub fn handle(
        &mut self,
        internal_id: &str,
    ) -> Result<PaymentRequestHandle<'_, C>, PaymentError> {
        let request = self
            .requests
            .get_mut(internal_id)
            .ok_or_else(|| PaymentError::NotFound(internal_id.to_owned()))?;
        Ok(PaymentRequestHandle {
            request,
            outbound: &mut self.outbound,
        })
    }

    fn ensure_registered(&self, internal_id: &str) -> Result<(), PaymentError> {
        if self.requests.contains_key(internal_id) {
            Ok(())
        } else {
            Err(PaymentError::NotFound(internal_id.to_owned()))
        }
    }

    pub fn show_payment(&mut self, internal_id: &str) -> Result<(), PaymentError> {
        self.ensure_registered(internal_id)?;
        self.outbound.show_payment(internal_id)
    }

    pub fn abort_payment(&mut self, internal_id: &str) -> Result<(), PaymentError> {
        self.ensure_registered(internal_id)?;
        self.outbound.abort_payment(internal_id)
    }

    pub fn can_make_payment(&mut self, internal_id: &str) -> Result<(), PaymentError> {
        self.ensure_registered(internal_id)?;
        self.outbound.can_make_payment(internal_id)
    }

    pub fn update_payment(
        &mut self,
        internal_id: &str,
        details: &PaymentDetailsUpdate,
    ) -> Result<(), PaymentError> {
        self.ensure_registered(internal_id)?;
        self.outbound.update_payment(internal_id, details)
    }

    pub fn complete_payment(
        &mut self,
        internal_id: &str,
        status: PaymentComplete,
    ) -> Result<(), PaymentError> {
        self.ensure_registered(internal_id)?;
        self.outbound.complete_payment(internal_id, status)
    }

    /// Single entry point for privileged responses.
    pub fn respond_payment(&mut self, response: ActionResponse) -> Result<(), PaymentError> {
        let request_id = response.request_id().to_owned();
        let request = self
            .requests
            .get_mut(&request_id)
            .ok_or_else(|| PaymentError::NotFound(request_id.clone()))?;
        let finished = match response {
            ActionResponse::CanMake { result, .. } => {
                request.respond_can_make_payment(result)?;
                false
            }
            ActionResponse::Abort { succeeded, .. } => {
                request.respond_abort_payment(succeeded)?;
                succeeded
            }
            ActionResponse::Show {
                accepted,
                method_name,
                data,
                payer_name,
                payer_email,
                payer_phone,
                ..
            } => {
                let result = ShowResult {
                    accepted,
                    method_name,
                    data,
                    payer_name,
                    payer_email,
                    payer_phone,
                };
                request.respond_show_payment(result, None)?;
                false
            }
            ActionResponse::Complete { completed, .. } => {
                request.respond_complete(completed)?;
                true
            }
        };
        // A declined sheet, or an update-triggered abort, closes the request for good.
        if finished || request.is_finished() {
            self.unregister(&request_id);
        }
        Ok(())
    }

    pub fn change_shipping_address(&mut self, internal_id: &str, address: PaymentAddress) {
        match self.requests.get_mut(internal_id) {
            Some(request) if request.is_ready_for_update() => {
                request.update_shipping_address(address)
            }
            Some(_) => warn!(request_id = %internal_id, "shipping address change while not ready"),
            None => debug!(request_id = %internal_id, "shipping address change for a gone request"),
        }
    }

    pub fn change_shipping_option(&mut self, internal_id: &str, option: String) {
        match self.requests.get_mut(internal_id) {
            Some(request) if request.is_ready_for_update() => request.update_shipping_option(option),
            Some(_) => warn!(request_id = %internal_id, "shipping option change while not ready"),
            None => debug!(request_id = %internal_id, "shipping option change for a gone request"),
        }
    }

    /// Decodes one frame received on the current child actor and routes it.
    pub fn recv_frame(&mut self, frame: &[u8]) -> Result<(), PaymentError> {
        let message = self
            .outbound
            .child
            .as_ref()
            .ok_or(PaymentError::NotInitialized)?
            .recv_frame(frame)?;
        route_parent_message(self, message)
    }

    /// The page let go of a request. A showing request is aborted on the privileged side
    /// on a best-effort basis; outstanding promises are rejected.
    pub fn release(&mut self, internal_id: &str) -> Result<(), PaymentError> {
        let mut request = self
            .requests
            .remove(internal_id)
            .ok_or_else(|| PaymentError::NotFound(internal_id.to_owned()))?;
        self.outbound.orphaned.remove(internal_id);
        if request.state() == RequestState::Interactive {
            if let Err(error) = self.outbound.abort_payment(internal_id) {
                debug!(request_id = %internal_id, %error, "abort on release not sent");
            }
        }
        request.fail_pending(PaymentError::Abort(
            "The payment request was released".to_owned(),
        ));
        info!(request_id = %internal_id, "payment request released");
        self.release_actor_if_idle();
        Ok(())
    }

    /// The channel went away underneath us. Every outstanding promise is rejected and
    /// every registered request loses the ability to send: their sends fail with
    /// `NotInitialized`, even after a new request reconnects.
    pub fn actor_destroyed(&mut self, reason: ActorDestroyReason) {
        if let Some(child) = self.outbound.child.as_mut() {
            child.actor_destroy(reason);
        }
        self.outbound.orphaned.extend(self.requests.keys().cloned());
        for request in self.requests.values_mut() {
            request.fail_pending(PaymentError::Abort(
                "The payment channel was closed".to_owned(),
            ));
        }
    }

    fn unregister(&mut self, internal_id: &str) {
        self.outbound.orphaned.remove(internal_id);
        if self.requests.remove(internal_id).is_some() {
            info!(request_id = %internal_id, "payment request removed");
        }
        self.release_actor_if_idle();
    }

    fn release_actor_if_idle(&mut self) {
        if self.release_idle_actor && self.requests.is_empty() {
            self.outbound.release();
        }
    }
}

/// Borrowed view of one request, offering the page-facing operations.
pub struct PaymentRequestHandle<'a, C: ChildConnector> {
    request: &'a mut PaymentRequest,
    outbound: &'a mut Outbound<C>,
}

impl<'a, C: ChildConnector> PaymentRequestHandle<'a, C> {
    pub fn request(&self) -> &PaymentRequest {
        self.request
    }

    pub fn id(&self) -> &str {
        self.request.id()
    }

    pub fn state(&self) -> RequestState {
        self.request.state()
    }

    pub fn shipping_address(&self) -> Option<&PaymentAddress> {
        self.request.shipping_address()
    }

    pub fn shipping_option(&self) -> Option<&str> {
        self.request.shipping_option()
    }

    pub fn shipping_type(&self) -> Option<PaymentShippingType> {
        self.request.shipping_type()
    }

    pub fn show(&mut self) -> Result<Promise<PaymentResponse>, PaymentError> {
        self.request.show(&mut *self.outbound)
    }

    pub fn abort(&mut self) -> Result<Promise<()>, PaymentError> {
        self.request.abort(&mut *self.outbound)
    }

    pub fn can_make_payment(&mut self) -> Result<Promise<bool>, PaymentError> {
        self.request.can_make_payment(&mut *self.outbound)
    }

    pub fn complete(&mut self, status: PaymentComplete) -> Result<Promise<()>, PaymentError> {
        self.request.complete(status, &mut *self.outbound)
    }

    pub fn update_with(&mut self) -> Result<(), PaymentError> {
        self.request.update_with()
    }

    pub fn resolve_update(
        &mut self,
        outcome: Result<PaymentDetailsUpdate, String>,
    ) -> Result<(), PaymentError> {
        self.request.resolve_update(outcome, &mut *self.outbound)
    }

    pub fn take_events(&mut self) -> Vec<PaymentRequestUpdateEvent> {
        self.request.take_events()
    }
}
