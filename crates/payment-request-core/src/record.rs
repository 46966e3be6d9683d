//! Privileged-side request records and the action/response objects exchanged with the
//! service.

use serde::{Deserialize, Serialize};

use crate::domain::{
    selected_shipping_option, PaymentComplete, PaymentItem, PaymentOptions,
    PaymentShippingOption,
};
use crate::ports::ResponseCallback;
use crate::wire::{
    join_optional, ActionRequest, ActionResponse, IpcDetailsModifier, IpcMethodData,
    IpcPaymentDetails, IpcPaymentItem, IpcShippingOption,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodData {
    pub supported_methods: Vec<String>,
    /// Serialized method-specific blob, kept opaque on this side.
    pub data: Option<String>,
}

impl From<&IpcMethodData> for MethodData {
    fn from(method: &IpcMethodData) -> Self {
        Self {
            supported_methods: method.supported_methods.clone(),
            data: method.data_passed.then(|| method.data.clone()),
        }
    }
}

impl From<&MethodData> for IpcMethodData {
    fn from(method: &MethodData) -> Self {
        Self {
            supported_methods: method.supported_methods.clone(),
            data: method.data.clone().unwrap_or_default(),
            data_passed: method.data.is_some(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailsModifier {
    pub supported_methods: Vec<String>,
    pub total: PaymentItem,
    pub additional_display_items: Option<Vec<PaymentItem>>,
    pub data: Option<String>,
}

impl From<&IpcDetailsModifier> for DetailsModifier {
    fn from(modifier: &IpcDetailsModifier) -> Self {
        Self {
            supported_methods: modifier.supported_methods.clone(),
            total: (&modifier.total).into(),
            additional_display_items: join_optional(
                &modifier.additional_display_items,
                modifier.additional_display_items_passed,
            ),
            data: modifier.data_passed.then(|| modifier.data.clone()),
        }
    }
}

impl From<&DetailsModifier> for IpcDetailsModifier {
    fn from(modifier: &DetailsModifier) -> Self {
        Self {
            supported_methods: modifier.supported_methods.clone(),
            total: (&modifier.total).into(),
            additional_display_items: modifier
                .additional_display_items
                .iter()
                .flatten()
                .map(IpcPaymentItem::from)
                .collect(),
            additional_display_items_passed: modifier.additional_display_items.is_some(),
            data: modifier.data.clone().unwrap_or_default(),
            data_passed: modifier.data.is_some(),
        }
    }
}

/// Details as held by the privileged side. Optional lists keep the presence information
/// that came over the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentDetails {
    pub id: String,
    pub total_item: PaymentItem,
    pub display_items: Option<Vec<PaymentItem>>,
    pub shipping_options: Option<Vec<PaymentShippingOption>>,
    pub modifiers: Option<Vec<DetailsModifier>>,
    pub error: Option<String>,
}

impl PaymentDetails {
    /// Folds an update into these details. Lists the update did not pass are kept, the id
    /// never changes, and the error always comes from the update.
    pub fn merge_update(&mut self, update: PaymentDetails) {
        self.total_item = update.total_item;
        if update.display_items.is_some() {
            self.display_items = update.display_items;
        }
        if update.shipping_options.is_some() {
            self.shipping_options = update.shipping_options;
        }
        if update.modifiers.is_some() {
            self.modifiers = update.modifiers;
        }
        self.error = update.error;
    }

    pub fn selected_shipping_option(&self) -> Option<String> {
        self.shipping_options
            .as_deref()
            .and_then(selected_shipping_option)
    }
}

impl From<&IpcPaymentDetails> for PaymentDetails {
    fn from(details: &IpcPaymentDetails) -> Self {
        Self {
            id: details.id.clone(),
            total_item: (&details.total).into(),
            display_items: join_optional(&details.display_items, details.display_items_passed),
            shipping_options: join_optional(
                &details.shipping_options,
                details.shipping_options_passed,
            ),
            modifiers: join_optional(&details.modifiers, details.modifiers_passed),
            error: details.error_passed.then(|| details.error.clone()),
        }
    }
}

impl From<&PaymentDetails> for IpcPaymentDetails {
    fn from(details: &PaymentDetails) -> Self {
        Self {
            id: details.id.clone(),
            total: (&details.total_item).into(),
            display_items: details
                .display_items
                .iter()
                .flatten()
                .map(IpcPaymentItem::from)
                .collect(),
            display_items_passed: details.display_items.is_some(),
            shipping_options: details
                .shipping_options
                .iter()
                .flatten()
                .map(IpcShippingOption::from)
                .collect(),
            shipping_options_passed: details.shipping_options.is_some(),
            modifiers: details
                .modifiers
                .iter()
                .flatten()
                .map(IpcDetailsModifier::from)
                .collect(),
            modifiers_passed: details.modifiers.is_some(),
            error: details.error.clone().unwrap_or_default(),
            error_passed: details.error.is_some(),
        }
    }
}

/// Actions that owe exactly one response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    CanMake,
    Show,
    Abort,
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcceptStatus {
    Accepted,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbortStatus {
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServiceResponse {
    CanMake {
        request_id: String,
        result: bool,
    },
    Abort {
        request_id: String,
        status: AbortStatus,
    },
    Show {
        request_id: String,
        status: AcceptStatus,
        method_name: String,
        data: String,
        payer_name: String,
        payer_email: String,
        payer_phone: String,
    },
    Complete {
        request_id: String,
        completed: bool,
    },
}

impl ServiceResponse {
    pub fn request_id(&self) -> &str {
        match self {
            ServiceResponse::CanMake { request_id, .. }
            | ServiceResponse::Abort { request_id, .. }
            | ServiceResponse::Show { request_id, .. }
            | ServiceResponse::Complete { request_id, .. } => request_id,
        }
    }

    pub fn kind(&self) -> ActionKind {
        match self {
            ServiceResponse::CanMake { .. } => ActionKind::CanMake,
            ServiceResponse::Abort { .. } => ActionKind::Abort,
            ServiceResponse::Show { .. } => ActionKind::Show,
            ServiceResponse::Complete { .. } => ActionKind::Complete,
        }
    }

    /// True when the flow is over and the record can be dropped.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ServiceResponse::Abort {
                status: AbortStatus::Succeeded,
                ..
            } | ServiceResponse::Complete { .. }
        )
    }

    /// A declined sheet: the flow ends once nothing else is outstanding.
    pub fn is_declined_show(&self) -> bool {
        matches!(
            self,
            ServiceResponse::Show {
                status: AcceptStatus::Rejected,
                ..
            }
        )
    }

    pub fn rejected_show(request_id: impl Into<String>) -> Self {
        ServiceResponse::Show {
            request_id: request_id.into(),
            status: AcceptStatus::Rejected,
            method_name: String::new(),
            data: String::new(),
            payer_name: String::new(),
            payer_email: String::new(),
            payer_phone: String::new(),
        }
    }

    /// The negative answer for an action the UI could not take on.
    pub fn failure(kind: ActionKind, request_id: impl Into<String>) -> Self {
        let request_id = request_id.into();
        match kind {
            ActionKind::CanMake => ServiceResponse::CanMake {
                request_id,
                result: false,
            },
            ActionKind::Abort => ServiceResponse::Abort {
                request_id,
                status: AbortStatus::Failed,
            },
            ActionKind::Show => ServiceResponse::rejected_show(request_id),
            ActionKind::Complete => ServiceResponse::Complete {
                request_id,
                completed: false,
            },
        }
    }
}

impl From<ServiceResponse> for ActionResponse {
    fn from(response: ServiceResponse) -> Self {
        match response {
            ServiceResponse::CanMake { request_id, result } => {
                ActionResponse::CanMake { request_id, result }
            }
            ServiceResponse::Abort { request_id, status } => ActionResponse::Abort {
                request_id,
                succeeded: status == AbortStatus::Succeeded,
            },
            ServiceResponse::Show {
                request_id,
                status,
                method_name,
                data,
                payer_name,
                payer_email,
                payer_phone,
            } => ActionResponse::Show {
                request_id,
                accepted: status == AcceptStatus::Accepted,
                method_name,
                data,
                payer_name,
                payer_email,
                payer_phone,
            },
            ServiceResponse::Complete {
                request_id,
                completed,
            } => ActionResponse::Complete {
                request_id,
                completed,
            },
        }
    }
}

#[derive(Debug, Clone)]
pub enum ServiceAction {
    Create {
        tab_id: u64,
        method_data: Vec<MethodData>,
        details: PaymentDetails,
        options: PaymentOptions,
    },
    CanMake,
    Show,
    Abort,
    Update {
        details: PaymentDetails,
    },
    Complete {
        status: PaymentComplete,
    },
}

/// One decoded action, bound to the actor that must receive its response.
#[derive(Debug, Clone)]
pub struct PaymentActionRequest {
    pub request_id: String,
    pub callback: ResponseCallback,
    pub action: ServiceAction,
}

impl PaymentActionRequest {
    pub fn from_wire(request: ActionRequest, callback: ResponseCallback) -> Self {
        let (request_id, action) = match request {
            ActionRequest::Create {
                tab_id,
                request_id,
                method_data,
                details,
                options,
            } => (
                request_id,
                ServiceAction::Create {
                    tab_id,
                    method_data: method_data.iter().map(MethodData::from).collect(),
                    details: (&details).into(),
                    options: (&options).into(),
                },
            ),
            ActionRequest::CanMake { request_id } => (request_id, ServiceAction::CanMake),
            ActionRequest::Show { request_id } => (request_id, ServiceAction::Show),
            ActionRequest::Abort { request_id } => (request_id, ServiceAction::Abort),
            ActionRequest::Update {
                request_id,
                details,
            } => (
                request_id,
                ServiceAction::Update {
                    details: (&details).into(),
                },
            ),
            ActionRequest::Complete {
                request_id,
                complete_status,
            } => (
                request_id,
                ServiceAction::Complete {
                    status: complete_status,
                },
            ),
        };
        Self {
            request_id,
            callback,
            action,
        }
    }
}

/// A request as tracked by the privileged service.
#[derive(Debug)]
pub struct ServicePaymentRequest {
    tab_id: u64,
    request_id: String,
    method_data: Vec<MethodData>,
    details: PaymentDetails,
    options: PaymentOptions,
    callback: Option<ResponseCallback>,
    outstanding: Vec<ActionKind>,
    declined: bool,
    notifier: ResponseCallback,
}

impl ServicePaymentRequest {
    pub fn new(
        tab_id: u64,
        request_id: String,
        method_data: Vec<MethodData>,
        details: PaymentDetails,
        options: PaymentOptions,
        notifier: ResponseCallback,
    ) -> Self {
        Self {
            tab_id,
            request_id,
            method_data,
            details,
            options,
            callback: None,
            outstanding: Vec::new(),
            declined: false,
            notifier,
        }
    }

    pub fn tab_id(&self) -> u64 {
        self.tab_id
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn method_data(&self) -> &[MethodData] {
        &self.method_data
    }

    pub fn details(&self) -> &PaymentDetails {
        &self.details
    }

    pub fn options(&self) -> &PaymentOptions {
        &self.options
    }

    pub fn notifier(&self) -> &ResponseCallback {
        &self.notifier
    }

    pub fn has_callback(&self) -> bool {
        self.callback.is_some()
    }

    pub fn outstanding(&self) -> &[ActionKind] {
        &self.outstanding
    }

    pub fn is_declined(&self) -> bool {
        self.declined
    }

    pub fn mark_declined(&mut self) {
        self.declined = true;
    }

    pub fn attach(&mut self, kind: ActionKind, callback: ResponseCallback) {
        self.callback = Some(callback);
        self.outstanding.push(kind);
    }

    /// Replaces the current callback without owing a new response. Only meaningful while
    /// another action is outstanding.
    pub fn refresh_callback(&mut self, callback: ResponseCallback) {
        if !self.outstanding.is_empty() {
            self.callback = Some(callback);
        }
    }

    /// Settles one outstanding action of `kind`. The slot is cleared once nothing else is
    /// outstanding, so the same callback is never used for a response nobody asked for.
    pub fn take_callback(&mut self, kind: ActionKind) -> Option<ResponseCallback> {
        let position = self.outstanding.iter().position(|k| *k == kind)?;
        self.outstanding.remove(position);
        if self.outstanding.is_empty() {
            self.callback.take()
        } else {
            self.callback.clone()
        }
    }

    pub fn update_details(&mut self, update: PaymentDetails) {
        self.details.merge_update(update);
    }
}
