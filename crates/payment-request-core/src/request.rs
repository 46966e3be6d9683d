//! Content-side payment request: the per-flow state machine and its promise bookkeeping.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::domain::{
    selected_shipping_option, PaymentAddress, PaymentComplete, PaymentDetailsInit,
    PaymentDetailsUpdate, PaymentOptions, PaymentShippingType,
};
use crate::ports::{PaymentDispatch, PaymentError};
use crate::promise::{Promise, Resolver};
use crate::state_machine::{request_transition, RequestAction, RequestState};
use crate::validation::validate_details_update;

const USER_ABORTED: &str = "The user aborted the payment request";

/// What the page receives once the user accepted the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentResponse {
    pub request_id: String,
    pub method_name: String,
    /// Method-specific details as serialized JSON.
    pub details: String,
    pub shipping_address: Option<PaymentAddress>,
    pub shipping_option: Option<String>,
    pub payer_name: Option<String>,
    pub payer_email: Option<String>,
    pub payer_phone: Option<String>,
}

impl PaymentResponse {
    pub fn details_json(&self) -> Result<Value, PaymentError> {
        serde_json::from_str(&self.details)
            .map_err(|e| PaymentError::Serialization(format!("response details: {e}")))
    }
}

/// Outcome of a Show action as delivered by the privileged side.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShowResult {
    pub accepted: bool,
    pub method_name: String,
    pub data: String,
    pub payer_name: String,
    pub payer_email: String,
    pub payer_phone: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateEventType {
    ShippingAddressChange,
    ShippingOptionChange,
}

impl UpdateEventType {
    pub fn as_str(self) -> &'static str {
        match self {
            UpdateEventType::ShippingAddressChange => "shippingaddresschange",
            UpdateEventType::ShippingOptionChange => "shippingoptionchange",
        }
    }
}

/// Non-cancelable event queued for page script. The handler may call `update_with`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRequestUpdateEvent {
    pub event_type: UpdateEventType,
    pub request_id: String,
}

#[derive(Debug)]
pub struct PaymentRequest {
    internal_id: String,
    id: String,
    state: RequestState,
    options: PaymentOptions,
    shipping_address: Option<PaymentAddress>,
    shipping_option: Option<String>,
    accept: Option<Resolver<PaymentResponse>>,
    result: Option<Resolver<bool>>,
    abort: Option<Resolver<()>>,
    complete: Option<Resolver<()>>,
    complete_called: bool,
    last_response: Option<PaymentResponse>,
    updating: bool,
    pending_update_error: Option<PaymentError>,
    events: VecDeque<PaymentRequestUpdateEvent>,
}

impl PaymentRequest {
    pub fn new(
        internal_id: String,
        details: &PaymentDetailsInit,
        options: PaymentOptions,
    ) -> Result<Self, PaymentError> {
        let id = match details.id.as_deref() {
            Some(id) if !id.is_empty() => id.to_owned(),
            _ => internal_id.clone(),
        };
        let shipping_option = if options.request_shipping {
            details
                .shipping_options
                .as_deref()
                .and_then(selected_shipping_option)
        } else {
            None
        };
        let mut request = Self {
            internal_id,
            id,
            state: RequestState::Unknown,
            options,
            shipping_address: None,
            shipping_option,
            accept: None,
            result: None,
            abort: None,
            complete: None,
            complete_called: false,
            last_response: None,
            updating: false,
            pending_update_error: None,
            events: VecDeque::new(),
        };
        request.transition(RequestAction::Construct)?;
        Ok(request)
    }

    pub fn internal_id(&self) -> &str {
        &self.internal_id
    }

    /// Merchant-visible id.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> RequestState {
        self.state
    }

    pub fn options(&self) -> &PaymentOptions {
        &self.options
    }

    pub fn shipping_address(&self) -> Option<&PaymentAddress> {
        self.shipping_address.as_ref()
    }

    pub fn shipping_option(&self) -> Option<&str> {
        self.shipping_option.as_deref()
    }

    pub fn shipping_type(&self) -> Option<PaymentShippingType> {
        self.options
            .request_shipping
            .then_some(self.options.shipping_type)
    }

    pub fn last_response(&self) -> Option<&PaymentResponse> {
        self.last_response.as_ref()
    }

    pub fn is_updating(&self) -> bool {
        self.updating
    }

    pub fn pending_update_error(&self) -> Option<&PaymentError> {
        self.pending_update_error.as_ref()
    }

    pub fn is_ready_for_update(&self) -> bool {
        self.state == RequestState::Interactive && !self.updating
    }

    pub fn take_events(&mut self) -> Vec<PaymentRequestUpdateEvent> {
        self.events.drain(..).collect()
    }

    fn transition(&mut self, action: RequestAction) -> Result<(), PaymentError> {
        let (next, transition) = request_transition(self.state, action)?;
        debug!(
            request_id = %self.internal_id,
            from = ?transition.from,
            to = ?transition.to,
            reason = transition.reason,
            "payment request transition"
        );
        self.state = next;
        Ok(())
    }

    pub fn show(
        &mut self,
        dispatch: &mut dyn PaymentDispatch,
    ) -> Result<Promise<PaymentResponse>, PaymentError> {
        if self.state != RequestState::Created {
            return Err(PaymentError::InvalidState(
                "show() can only be called on a newly created request".to_owned(),
            ));
        }
        let (promise, resolver) = Promise::new();
        match dispatch.show_payment(&self.internal_id) {
            Ok(()) => {
                self.transition(RequestAction::Show)?;
                self.accept = Some(resolver);
            }
            Err(error) => {
                warn!(request_id = %self.internal_id, %error, "show dispatch failed");
                self.transition(RequestAction::ShowDispatchFailed)?;
                resolver.reject(error);
            }
        }
        Ok(promise)
    }

    pub fn can_make_payment(
        &mut self,
        dispatch: &mut dyn PaymentDispatch,
    ) -> Result<Promise<bool>, PaymentError> {
        if self.state != RequestState::Created {
            return Err(PaymentError::InvalidState(
                "canMakePayment() is only allowed before show()".to_owned(),
            ));
        }
        if self.result.is_some() {
            return Err(PaymentError::NotAllowed(
                "a canMakePayment() call is already in progress".to_owned(),
            ));
        }
        let (promise, resolver) = Promise::new();
        match dispatch.can_make_payment(&self.internal_id) {
            Ok(()) => self.result = Some(resolver),
            Err(error) => resolver.reject(error),
        }
        Ok(promise)
    }

    pub fn abort(
        &mut self,
        dispatch: &mut dyn PaymentDispatch,
    ) -> Result<Promise<()>, PaymentError> {
        if self.state != RequestState::Interactive {
            return Err(PaymentError::InvalidState(
                "abort() is only allowed while the request is showing".to_owned(),
            ));
        }
        if self.abort.is_some() || self.pending_update_error.is_some() {
            return Err(PaymentError::NotAllowed(
                "an abort is already in progress".to_owned(),
            ));
        }
        dispatch.abort_payment(&self.internal_id)?;
        let (promise, resolver) = Promise::new();
        self.abort = Some(resolver);
        Ok(promise)
    }

    /// `PaymentResponse.complete()`: only valid once, after an accepted show.
    pub fn complete(
        &mut self,
        status: PaymentComplete,
        dispatch: &mut dyn PaymentDispatch,
    ) -> Result<Promise<()>, PaymentError> {
        if self.last_response.is_none() {
            return Err(PaymentError::InvalidState(
                "there is no accepted payment response to complete".to_owned(),
            ));
        }
        if self.complete_called {
            return Err(PaymentError::InvalidState(
                "complete() has already been called".to_owned(),
            ));
        }
        self.complete_called = true;
        let (promise, resolver) = Promise::new();
        match dispatch.complete_payment(&self.internal_id, status) {
            Ok(()) => self.complete = Some(resolver),
            Err(error) => resolver.reject(error),
        }
        Ok(promise)
    }

    /// Called by an update event handler to take over the details for this cycle.
    pub fn update_with(&mut self) -> Result<(), PaymentError> {
        if !self.is_ready_for_update() {
            return Err(PaymentError::InvalidState(
                "updateWith() requires a showing request with no update in progress".to_owned(),
            ));
        }
        self.updating = true;
        Ok(())
    }

    /// Settles the promise handed to `update_with`: `Err` carries the rejection reason.
    pub fn resolve_update(
        &mut self,
        outcome: Result<PaymentDetailsUpdate, String>,
        dispatch: &mut dyn PaymentDispatch,
    ) -> Result<(), PaymentError> {
        if !self.updating {
            return Err(PaymentError::InvalidState(
                "no updateWith() cycle is in progress".to_owned(),
            ));
        }
        let details = match outcome {
            Ok(details) => details,
            Err(reason) => return self.abort_update(PaymentError::Abort(reason), dispatch),
        };
        if let Err(error) = validate_details_update(&details) {
            return self.abort_update(error, dispatch);
        }
        self.update_payment(&details, dispatch)
    }

    pub fn update_payment(
        &mut self,
        details: &PaymentDetailsUpdate,
        dispatch: &mut dyn PaymentDispatch,
    ) -> Result<(), PaymentError> {
        self.updating = false;
        if self.options.request_shipping {
            if let Some(options) = details.shipping_options.as_deref() {
                self.shipping_option = selected_shipping_option(options);
            }
        }
        if let Err(error) = dispatch.update_payment(&self.internal_id, details) {
            return self.abort_update(error, dispatch);
        }
        Ok(())
    }

    /// Ends the update cycle by aborting the whole request. The abort response is later
    /// redirected to the accept promise carrying `error`.
    pub fn abort_update(
        &mut self,
        error: PaymentError,
        dispatch: &mut dyn PaymentDispatch,
    ) -> Result<(), PaymentError> {
        self.updating = false;
        match dispatch.abort_payment(&self.internal_id) {
            Ok(()) => {
                self.pending_update_error = Some(error);
                Ok(())
            }
            Err(dispatch_error) => {
                warn!(
                    request_id = %self.internal_id,
                    %dispatch_error,
                    "abort for a failed update could not be sent"
                );
                if let Some(accept) = self.accept.take() {
                    accept.reject(error);
                }
                self.transition(RequestAction::Teardown)
            }
        }
    }

    pub fn respond_can_make_payment(&mut self, result: bool) -> Result<(), PaymentError> {
        let resolver = self.result.take().ok_or_else(|| {
            PaymentError::Unexpected("canMakePayment response without a pending call".to_owned())
        })?;
        resolver.resolve(result);
        Ok(())
    }

    pub fn respond_abort_payment(&mut self, success: bool) -> Result<(), PaymentError> {
        if let Some(error) = self.pending_update_error.take() {
            return self.respond_show_payment(ShowResult::default(), Some(error));
        }
        let resolver = self.abort.take().ok_or_else(|| {
            PaymentError::Unexpected("abort response without a pending abort()".to_owned())
        })?;
        if self.state == RequestState::Closed {
            // The show response won the race; only the abort promise is left to settle.
            debug!(request_id = %self.internal_id, success, "abort answered after close");
            if success {
                resolver.resolve(());
            } else {
                resolver.reject(PaymentError::InvalidState(
                    "Unable to abort the payment request".to_owned(),
                ));
            }
            return Ok(());
        }
        if success {
            self.transition(RequestAction::AbortSucceeded)?;
            resolver.resolve(());
            if let Some(accept) = self.accept.take() {
                accept.reject(PaymentError::Abort(
                    "The payment request was aborted".to_owned(),
                ));
            }
        } else {
            resolver.reject(PaymentError::InvalidState(
                "Unable to abort the payment request".to_owned(),
            ));
        }
        Ok(())
    }

    pub fn respond_show_payment(
        &mut self,
        result: ShowResult,
        error: Option<PaymentError>,
    ) -> Result<(), PaymentError> {
        if self.accept.is_none() || !self.is_ready_for_update() {
            return Err(PaymentError::Unexpected(
                "show response while no show() is awaiting it".to_owned(),
            ));
        }
        self.transition(RequestAction::ShowSettled)?;
        let Some(accept) = self.accept.take() else {
            return Ok(());
        };
        if !result.accepted {
            accept.reject(error.unwrap_or_else(|| PaymentError::Abort(USER_ABORTED.to_owned())));
            return Ok(());
        }

        let shipping = self.options.request_shipping;
        let response = PaymentResponse {
            request_id: self.id.clone(),
            method_name: result.method_name,
            details: result.data,
            shipping_address: self.shipping_address.clone().filter(|_| shipping),
            shipping_option: self.shipping_option.clone().filter(|_| shipping),
            payer_name: self.options.request_payer_name.then_some(result.payer_name),
            payer_email: self.options.request_payer_email.then_some(result.payer_email),
            payer_phone: self.options.request_payer_phone.then_some(result.payer_phone),
        };
        self.last_response = Some(response.clone());
        accept.resolve(response);
        Ok(())
    }

    pub fn respond_complete(&mut self, completed: bool) -> Result<(), PaymentError> {
        if self.last_response.is_none() {
            return Err(PaymentError::Unexpected(
                "complete response without an accepted payment".to_owned(),
            ));
        }
        let resolver = self.complete.take().ok_or_else(|| {
            PaymentError::Unexpected("complete response without a pending complete()".to_owned())
        })?;
        if completed {
            resolver.resolve(());
        } else {
            resolver.reject(PaymentError::Abort(
                "The payment could not be completed".to_owned(),
            ));
        }
        Ok(())
    }

    pub fn update_shipping_address(&mut self, address: PaymentAddress) {
        self.shipping_address = Some(address);
        self.queue_event(UpdateEventType::ShippingAddressChange);
    }

    pub fn update_shipping_option(&mut self, option: String) {
        self.shipping_option = Some(option);
        self.queue_event(UpdateEventType::ShippingOptionChange);
    }

    fn queue_event(&mut self, event_type: UpdateEventType) {
        debug!(request_id = %self.internal_id, event = event_type.as_str(), "queue update event");
        self.events.push_back(PaymentRequestUpdateEvent {
            event_type,
            request_id: self.id.clone(),
        });
    }

    /// Rejects every outstanding promise; a showing request is closed.
    pub fn fail_pending(&mut self, error: PaymentError) {
        if let Some(accept) = self.accept.take() {
            accept.reject(error.clone());
        }
        if let Some(result) = self.result.take() {
            result.reject(error.clone());
        }
        if let Some(abort) = self.abort.take() {
            abort.reject(error.clone());
        }
        if let Some(complete) = self.complete.take() {
            complete.reject(error);
        }
        self.updating = false;
        self.pending_update_error = None;
        if self.state == RequestState::Interactive {
            if let Err(error) = self.transition(RequestAction::Teardown) {
                warn!(request_id = %self.internal_id, %error, "teardown transition refused");
            }
        }
    }

    /// Closed with nothing left to settle: no payment to complete and no abort awaiting
    /// its answer.
    pub fn is_finished(&self) -> bool {
        self.state == RequestState::Closed
            && self.last_response.is_none()
            && self.abort.is_none()
            && self.result.is_none()
    }
}
