//! Privileged-side orchestrator.
//!
//! Owns every in-flight request record, forwards actions to the payment UI and routes
//! the UI's answers back to the actor that asked. UI answers never arrive synchronously:
//! they are posted onto the service's own sequence and processed by `run_until_idle`.

use tracing::{debug, info, warn};

use crate::domain::PaymentAddress;
use crate::ports::{PaymentError, PaymentUiPort, ResponseCallback};
use crate::record::{
    ActionKind, PaymentActionRequest, ServiceAction, ServicePaymentRequest, ServiceResponse,
};
use crate::sequence::{Sequence, SequenceSender};
use crate::wire::ChangeNotification;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceTask {
    Respond(ServiceResponse),
    ChangeShippingAddress {
        request_id: String,
        address: PaymentAddress,
    },
    ChangeShippingOption {
        request_id: String,
        option: String,
    },
}

/// Handle given to the payment UI for one request. Cheap to clone and safe to move to
/// another thread; every call only posts onto the service sequence.
#[derive(Debug, Clone)]
pub struct UiReply {
    request_id: String,
    sender: SequenceSender<ServiceTask>,
}

impl UiReply {
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn respond(&self, response: ServiceResponse) -> Result<(), PaymentError> {
        self.sender.post(ServiceTask::Respond(response))
    }

    pub fn change_shipping_address(&self, address: PaymentAddress) -> Result<(), PaymentError> {
        self.sender.post(ServiceTask::ChangeShippingAddress {
            request_id: self.request_id.clone(),
            address,
        })
    }

    pub fn change_shipping_option(&self, option: impl Into<String>) -> Result<(), PaymentError> {
        self.sender.post(ServiceTask::ChangeShippingOption {
            request_id: self.request_id.clone(),
            option: option.into(),
        })
    }
}

pub struct PaymentRequestService<U: PaymentUiPort> {
    ui: U,
    requests: Vec<ServicePaymentRequest>,
    inbox: Sequence<ServiceTask>,
}

impl<U: PaymentUiPort> PaymentRequestService<U> {
    pub fn new(ui: U) -> Self {
        Self {
            ui,
            requests: Vec::new(),
            inbox: Sequence::new(),
        }
    }

    pub fn ui(&self) -> &U {
        &self.ui
    }

    pub fn get_by_id(&self, request_id: &str) -> Option<&ServicePaymentRequest> {
        self.requests.iter().find(|r| r.request_id() == request_id)
    }

    pub fn enumerate(&self) -> &[ServicePaymentRequest] {
        &self.requests
    }

    fn position(&self, request_id: &str) -> Result<usize, PaymentError> {
        self.requests
            .iter()
            .position(|r| r.request_id() == request_id)
            .ok_or_else(|| PaymentError::NotFound(request_id.to_owned()))
    }

    pub fn reply_handle(&self, request_id: &str) -> UiReply {
        UiReply {
            request_id: request_id.to_owned(),
            sender: self.inbox.sender(),
        }
    }

    pub fn request_payment(&mut self, action: PaymentActionRequest) -> Result<(), PaymentError> {
        let PaymentActionRequest {
            request_id,
            callback,
            action,
        } = action;
        match action {
            ServiceAction::Create {
                tab_id,
                method_data,
                details,
                options,
            } => {
                if self.get_by_id(&request_id).is_some() {
                    return Err(PaymentError::InvalidState(format!(
                        "payment request {request_id} already exists"
                    )));
                }
                info!(%request_id, tab_id, "privileged payment request created");
                self.requests.push(ServicePaymentRequest::new(
                    tab_id,
                    request_id,
                    method_data,
                    details,
                    options,
                    callback,
                ));
                Ok(())
            }
            ServiceAction::Update { details } => {
                let index = self.position(&request_id)?;
                let record = &mut self.requests[index];
                if record.outstanding().is_empty() {
                    return Err(PaymentError::InvalidState(format!(
                        "update for {request_id} while no action is outstanding"
                    )));
                }
                record.refresh_callback(callback);
                record.update_details(details);
                self.ui.update_payment(&self.requests[index])
            }
            ServiceAction::CanMake => {
                self.forward(&request_id, callback, ActionKind::CanMake, |ui, record, reply| {
                    ui.can_make_payment(record, reply)
                })
            }
            ServiceAction::Show => {
                self.forward(&request_id, callback, ActionKind::Show, |ui, record, reply| {
                    ui.show_payment(record, reply)
                })
            }
            ServiceAction::Abort => {
                self.forward(&request_id, callback, ActionKind::Abort, |ui, record, reply| {
                    ui.abort_payment(record, reply)
                })
            }
            ServiceAction::Complete { status } => {
                self.forward(&request_id, callback, ActionKind::Complete, |ui, record, reply| {
                    ui.complete_payment(record, status, reply)
                })
            }
        }
    }

    /// Attaches the callback and hands the action to the UI. A refusal still owes one
    /// response, so a failure answer is queued in its place.
    fn forward(
        &mut self,
        request_id: &str,
        callback: ResponseCallback,
        kind: ActionKind,
        dispatch: impl FnOnce(&U, &ServicePaymentRequest, UiReply) -> Result<(), PaymentError>,
    ) -> Result<(), PaymentError> {
        let index = self.position(request_id)?;
        self.requests[index].attach(kind, callback);
        let reply = self.reply_handle(request_id);
        if let Err(error) = dispatch(&self.ui, &self.requests[index], reply) {
            warn!(%request_id, ?kind, %error, "payment UI refused the action");
            self.inbox
                .post(ServiceTask::Respond(ServiceResponse::failure(kind, request_id)));
        }
        Ok(())
    }

    pub fn respond_payment(&mut self, response: ServiceResponse) -> Result<(), PaymentError> {
        let index = self.position(response.request_id())?;
        let kind = response.kind();
        let record = &mut self.requests[index];
        let callback = record.take_callback(kind).ok_or_else(|| {
            PaymentError::Unexpected(format!(
                "{kind:?} response for {} without an outstanding action",
                response.request_id()
            ))
        })?;
        if response.is_declined_show() {
            record.mark_declined();
        }
        let terminal = response.is_terminal()
            || (record.is_declined() && record.outstanding().is_empty());
        let request_id = response.request_id().to_owned();
        let delivered = callback.respond(response);
        if terminal {
            self.requests.remove(index);
            info!(%request_id, "privileged payment request removed");
        }
        delivered
    }

    pub fn change_shipping_address(
        &mut self,
        request_id: &str,
        address: PaymentAddress,
    ) -> Result<(), PaymentError> {
        let record = self
            .get_by_id(request_id)
            .ok_or_else(|| PaymentError::NotFound(request_id.to_owned()))?;
        record.notifier().notify(ChangeNotification::ShippingAddress {
            request_id: request_id.to_owned(),
            address: (&address).into(),
        })
    }

    pub fn change_shipping_option(
        &mut self,
        request_id: &str,
        option: String,
    ) -> Result<(), PaymentError> {
        let record = self
            .get_by_id(request_id)
            .ok_or_else(|| PaymentError::NotFound(request_id.to_owned()))?;
        record.notifier().notify(ChangeNotification::ShippingOption {
            request_id: request_id.to_owned(),
            option,
        })
    }

    pub fn run_task(&mut self, task: ServiceTask) -> Result<(), PaymentError> {
        match task {
            ServiceTask::Respond(response) => self.respond_payment(response),
            ServiceTask::ChangeShippingAddress {
                request_id,
                address,
            } => self.change_shipping_address(&request_id, address),
            ServiceTask::ChangeShippingOption { request_id, option } => {
                self.change_shipping_option(&request_id, option)
            }
        }
    }

    /// Runs queued tasks until the sequence is empty. Failures are logged; a reply for a
    /// request whose actor went away is expected and not fatal to the service.
    pub fn run_until_idle(&mut self) -> usize {
        let mut processed = 0;
        loop {
            let tasks = self.inbox.drain();
            if tasks.is_empty() {
                return processed;
            }
            for task in tasks {
                processed += 1;
                if let Err(error) = self.run_task(task) {
                    warn!(%error, "payment service task failed");
                }
            }
        }
    }

    /// Waits for the next task posted from off the sequence.
    pub async fn next_task(&mut self) -> Option<ServiceTask> {
        self.inbox.next().await
    }

    /// Drops records whose owning actor is gone.
    pub fn purge_dead(&mut self) -> usize {
        let before = self.requests.len();
        self.requests.retain(|record| {
            let alive = record.notifier().is_alive();
            if !alive {
                debug!(request_id = record.request_id(), "purging orphaned payment request");
            }
            alive
        });
        before - self.requests.len()
    }
}
