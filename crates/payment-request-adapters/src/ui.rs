//! Payment UI stand-ins. Neither renders anything; both answer through the `UiReply`
//! handle exactly as a real sheet would, so answers always arrive on the service sequence.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use serde_json::json;
use tracing::{debug, warn};

use payment_request_core::{
    AbortStatus, AcceptStatus, PaymentComplete, PaymentError, PaymentUiPort,
    ServicePaymentRequest, ServiceResponse, UiReply,
};

use crate::config::PaymentsConfig;

/// Answers every action from configuration, optionally after a delay on a worker thread.
#[derive(Debug, Clone)]
pub struct DeterministicUi {
    config: PaymentsConfig,
}

impl DeterministicUi {
    pub fn new(config: PaymentsConfig) -> Self {
        Self { config }
    }

    fn answer(&self, reply: UiReply, response: ServiceResponse) -> Result<(), PaymentError> {
        if self.config.ui_delay_ms == 0 {
            return reply.respond(response);
        }
        let delay = Duration::from_millis(self.config.ui_delay_ms);
        thread::spawn(move || {
            thread::sleep(delay);
            if let Err(error) = reply.respond(response) {
                warn!(request_id = reply.request_id(), %error, "delayed UI answer dropped");
            }
        });
        Ok(())
    }

    fn accepted(&self, request: &ServicePaymentRequest) -> ServiceResponse {
        let options = request.options();
        let requested = |asked: bool, value: &str| {
            if asked {
                value.to_owned()
            } else {
                String::new()
            }
        };
        ServiceResponse::Show {
            request_id: request.request_id().to_owned(),
            status: AcceptStatus::Accepted,
            method_name: self.config.ui_method_name.clone(),
            data: json!({}).to_string(),
            payer_name: requested(options.request_payer_name, &self.config.ui_payer_name),
            payer_email: requested(options.request_payer_email, &self.config.ui_payer_email),
            payer_phone: requested(options.request_payer_phone, &self.config.ui_payer_phone),
        }
    }
}

impl PaymentUiPort for DeterministicUi {
    fn can_make_payment(
        &self,
        request: &ServicePaymentRequest,
        reply: UiReply,
    ) -> Result<(), PaymentError> {
        self.answer(
            reply,
            ServiceResponse::CanMake {
                request_id: request.request_id().to_owned(),
                result: self.config.ui_can_make_payment,
            },
        )
    }

    fn show_payment(
        &self,
        request: &ServicePaymentRequest,
        reply: UiReply,
    ) -> Result<(), PaymentError> {
        let response = if self.config.ui_accept {
            self.accepted(request)
        } else {
            ServiceResponse::rejected_show(request.request_id())
        };
        self.answer(reply, response)
    }

    fn abort_payment(
        &self,
        request: &ServicePaymentRequest,
        reply: UiReply,
    ) -> Result<(), PaymentError> {
        self.answer(
            reply,
            ServiceResponse::Abort {
                request_id: request.request_id().to_owned(),
                status: AbortStatus::Succeeded,
            },
        )
    }

    fn complete_payment(
        &self,
        request: &ServicePaymentRequest,
        status: PaymentComplete,
        reply: UiReply,
    ) -> Result<(), PaymentError> {
        debug!(request_id = request.request_id(), ?status, "closing payment sheet");
        self.answer(
            reply,
            ServiceResponse::Complete {
                request_id: request.request_id().to_owned(),
                completed: true,
            },
        )
    }

    fn update_payment(&self, request: &ServicePaymentRequest) -> Result<(), PaymentError> {
        debug!(
            request_id = request.request_id(),
            total = %request.details().total_item.amount.value,
            "payment sheet updated"
        );
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiCall {
    CanMake { request_id: String },
    Show { request_id: String },
    Abort { request_id: String },
    Complete { request_id: String, status: PaymentComplete },
    Update { request_id: String, total: String },
}

#[derive(Debug, Default)]
struct ManualUiState {
    calls: Vec<UiCall>,
    replies: HashMap<String, UiReply>,
    refuse: bool,
}

/// Records every call and keeps the latest reply handle per request, so a test can answer
/// whenever it likes.
#[derive(Debug, Clone, Default)]
pub struct ManualUi {
    inner: Arc<Mutex<ManualUiState>>,
}

impl ManualUi {
    fn lock(&self) -> Result<MutexGuard<'_, ManualUiState>, PaymentError> {
        self.inner
            .lock()
            .map_err(|e| PaymentError::Transport(format!("manual ui lock poisoned: {e}")))
    }

    pub fn calls(&self) -> Result<Vec<UiCall>, PaymentError> {
        Ok(self.lock()?.calls.clone())
    }

    pub fn reply_for(&self, request_id: &str) -> Result<Option<UiReply>, PaymentError> {
        Ok(self.lock()?.replies.get(request_id).cloned())
    }

    /// Posts `response` through the reply handle recorded for its request.
    pub fn respond(&self, response: ServiceResponse) -> Result<(), PaymentError> {
        let request_id = response.request_id().to_owned();
        self.reply_for(&request_id)?
            .ok_or(PaymentError::NotFound(request_id))?
            .respond(response)
    }

    /// While set, every action is refused as if no UI were available.
    pub fn set_refuse(&self, refuse: bool) -> Result<(), PaymentError> {
        self.lock()?.refuse = refuse;
        Ok(())
    }

    fn record(&self, call: UiCall, reply: Option<UiReply>) -> Result<(), PaymentError> {
        let mut g = self.lock()?;
        if g.refuse {
            return Err(PaymentError::NotSupported("payment UI unavailable".to_owned()));
        }
        if let Some(reply) = reply {
            g.replies.insert(reply.request_id().to_owned(), reply);
        }
        g.calls.push(call);
        Ok(())
    }
}

impl PaymentUiPort for ManualUi {
    fn can_make_payment(
        &self,
        request: &ServicePaymentRequest,
        reply: UiReply,
    ) -> Result<(), PaymentError> {
        let request_id = request.request_id().to_owned();
        self.record(UiCall::CanMake { request_id }, Some(reply))
    }

    fn show_payment(
        &self,
        request: &ServicePaymentRequest,
        reply: UiReply,
    ) -> Result<(), PaymentError> {
        let request_id = request.request_id().to_owned();
        self.record(UiCall::Show { request_id }, Some(reply))
    }

    fn abort_payment(
        &self,
        request: &ServicePaymentRequest,
        reply: UiReply,
    ) -> Result<(), PaymentError> {
        let request_id = request.request_id().to_owned();
        self.record(UiCall::Abort { request_id }, Some(reply))
    }

    fn complete_payment(
        &self,
        request: &ServicePaymentRequest,
        status: PaymentComplete,
        reply: UiReply,
    ) -> Result<(), PaymentError> {
        let request_id = request.request_id().to_owned();
        self.record(UiCall::Complete { request_id, status }, Some(reply))
    }

    fn update_payment(&self, request: &ServicePaymentRequest) -> Result<(), PaymentError> {
        let call = UiCall::Update {
            request_id: request.request_id().to_owned(),
            total: request.details().total_item.amount.value.clone(),
        };
        self.record(call, None)
    }
}
