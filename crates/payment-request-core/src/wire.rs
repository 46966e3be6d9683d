//! Transfer types carried between the content-side manager and the privileged service.
//!
//! Every optional field travels as a value plus an explicit `*_passed` flag; the
//! receiving side rebuilds `Option`s from the flag, never from emptiness.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{
    PaymentAddress, PaymentComplete, PaymentCurrencyAmount, PaymentDetailsInit,
    PaymentDetailsModifier, PaymentDetailsUpdate, PaymentItem, PaymentMethodData,
    PaymentOptions, PaymentShippingOption, PaymentShippingType,
};
use crate::ports::PaymentError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpcCurrencyAmount {
    pub currency: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpcPaymentItem {
    pub label: String,
    pub amount: IpcCurrencyAmount,
    pub pending: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpcShippingOption {
    pub id: String,
    pub label: String,
    pub amount: IpcCurrencyAmount,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpcMethodData {
    pub supported_methods: Vec<String>,
    pub data: String,
    pub data_passed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpcDetailsModifier {
    pub supported_methods: Vec<String>,
    pub total: IpcPaymentItem,
    pub additional_display_items: Vec<IpcPaymentItem>,
    pub additional_display_items_passed: bool,
    pub data: String,
    pub data_passed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpcPaymentDetails {
    pub id: String,
    pub total: IpcPaymentItem,
    pub display_items: Vec<IpcPaymentItem>,
    pub display_items_passed: bool,
    pub shipping_options: Vec<IpcShippingOption>,
    pub shipping_options_passed: bool,
    pub modifiers: Vec<IpcDetailsModifier>,
    pub modifiers_passed: bool,
    pub error: String,
    pub error_passed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpcPaymentOptions {
    pub request_payer_name: bool,
    pub request_payer_email: bool,
    pub request_payer_phone: bool,
    pub request_shipping: bool,
    pub shipping_type: PaymentShippingType,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpcPaymentAddress {
    pub country: String,
    pub address_line: Vec<String>,
    pub region: String,
    pub city: String,
    pub dependent_locality: String,
    pub postal_code: String,
    pub sorting_code: String,
    pub language_code: String,
    pub organization: String,
    pub recipient: String,
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionRequest {
    Create {
        tab_id: u64,
        request_id: String,
        method_data: Vec<IpcMethodData>,
        details: IpcPaymentDetails,
        options: IpcPaymentOptions,
    },
    CanMake {
        request_id: String,
    },
    Show {
        request_id: String,
    },
    Abort {
        request_id: String,
    },
    Update {
        request_id: String,
        details: IpcPaymentDetails,
    },
    Complete {
        request_id: String,
        complete_status: PaymentComplete,
    },
}

impl ActionRequest {
    pub fn request_id(&self) -> &str {
        match self {
            ActionRequest::Create { request_id, .. }
            | ActionRequest::CanMake { request_id }
            | ActionRequest::Show { request_id }
            | ActionRequest::Abort { request_id }
            | ActionRequest::Update { request_id, .. }
            | ActionRequest::Complete { request_id, .. } => request_id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ActionRequest::Create { .. } => "create",
            ActionRequest::CanMake { .. } => "can_make",
            ActionRequest::Show { .. } => "show",
            ActionRequest::Abort { .. } => "abort",
            ActionRequest::Update { .. } => "update",
            ActionRequest::Complete { .. } => "complete",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionResponse {
    CanMake {
        request_id: String,
        result: bool,
    },
    Abort {
        request_id: String,
        succeeded: bool,
    },
    Show {
        request_id: String,
        accepted: bool,
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

impl ActionResponse {
    pub fn request_id(&self) -> &str {
        match self {
            ActionResponse::CanMake { request_id, .. }
            | ActionResponse::Abort { request_id, .. }
            | ActionResponse::Show { request_id, .. }
            | ActionResponse::Complete { request_id, .. } => request_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChangeNotification {
    ShippingAddress {
        request_id: String,
        address: IpcPaymentAddress,
    },
    ShippingOption {
        request_id: String,
        option: String,
    },
}

impl ChangeNotification {
    pub fn request_id(&self) -> &str {
        match self {
            ChangeNotification::ShippingAddress { request_id, .. }
            | ChangeNotification::ShippingOption { request_id, .. } => request_id,
        }
    }
}

/// Frames sent from the content-side child actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "message", content = "body", rename_all = "snake_case")]
pub enum ChildMessage {
    RequestPayment(ActionRequest),
    Delete,
}

/// Frames sent from the privileged-side parent actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "message", content = "body", rename_all = "snake_case")]
pub enum ParentMessage {
    RespondPayment(ActionResponse),
    ChangeShipping(ChangeNotification),
}

pub fn encode<T: Serialize>(message: &T) -> Result<Vec<u8>, PaymentError> {
    serde_json::to_vec(message)
        .map_err(|e| PaymentError::Serialization(format!("frame encoding failed: {e}")))
}

pub fn decode<T: DeserializeOwned>(frame: &[u8]) -> Result<T, PaymentError> {
    serde_json::from_slice(frame)
        .map_err(|e| PaymentError::Protocol(format!("malformed frame: {e}")))
}

fn serialize_blob(data: Option<&Value>) -> Result<(String, bool), PaymentError> {
    match data {
        Some(value) => serde_json::to_string(value)
            .map(|s| (s, true))
            .map_err(|e| PaymentError::Serialization(format!("method data: {e}"))),
        None => Ok((String::new(), false)),
    }
}

fn split_optional<T, U>(items: Option<&Vec<T>>) -> (Vec<U>, bool)
where
    U: for<'a> From<&'a T>,
{
    match items {
        Some(items) => (items.iter().map(U::from).collect(), true),
        None => (Vec::new(), false),
    }
}

pub(crate) fn join_optional<T, U>(items: &[T], passed: bool) -> Option<Vec<U>>
where
    U: for<'a> From<&'a T>,
{
    passed.then(|| items.iter().map(U::from).collect())
}

impl From<&PaymentCurrencyAmount> for IpcCurrencyAmount {
    fn from(amount: &PaymentCurrencyAmount) -> Self {
        Self {
            currency: amount.currency.clone(),
            value: amount.value.clone(),
        }
    }
}

impl From<&IpcCurrencyAmount> for PaymentCurrencyAmount {
    fn from(amount: &IpcCurrencyAmount) -> Self {
        Self {
            currency: amount.currency.clone(),
            value: amount.value.clone(),
        }
    }
}

impl From<&PaymentItem> for IpcPaymentItem {
    fn from(item: &PaymentItem) -> Self {
        Self {
            label: item.label.clone(),
            amount: (&item.amount).into(),
            pending: item.pending,
        }
    }
}

impl From<&IpcPaymentItem> for PaymentItem {
    fn from(item: &IpcPaymentItem) -> Self {
        Self {
            label: item.label.clone(),
            amount: (&item.amount).into(),
            pending: item.pending,
        }
    }
}

impl From<&PaymentShippingOption> for IpcShippingOption {
    fn from(option: &PaymentShippingOption) -> Self {
        Self {
            id: option.id.clone(),
            label: option.label.clone(),
            amount: (&option.amount).into(),
            selected: option.selected,
        }
    }
}

impl From<&IpcShippingOption> for PaymentShippingOption {
    fn from(option: &IpcShippingOption) -> Self {
        Self {
            id: option.id.clone(),
            label: option.label.clone(),
            amount: (&option.amount).into(),
            selected: option.selected,
        }
    }
}

impl From<&PaymentOptions> for IpcPaymentOptions {
    fn from(options: &PaymentOptions) -> Self {
        Self {
            request_payer_name: options.request_payer_name,
            request_payer_email: options.request_payer_email,
            request_payer_phone: options.request_payer_phone,
            request_shipping: options.request_shipping,
            shipping_type: options.shipping_type,
        }
    }
}

impl From<&IpcPaymentOptions> for PaymentOptions {
    fn from(options: &IpcPaymentOptions) -> Self {
        Self {
            request_payer_name: options.request_payer_name,
            request_payer_email: options.request_payer_email,
            request_payer_phone: options.request_payer_phone,
            request_shipping: options.request_shipping,
            shipping_type: options.shipping_type,
        }
    }
}

impl From<&PaymentAddress> for IpcPaymentAddress {
    fn from(address: &PaymentAddress) -> Self {
        Self {
            country: address.country.clone(),
            address_line: address.address_line.clone(),
            region: address.region.clone(),
            city: address.city.clone(),
            dependent_locality: address.dependent_locality.clone(),
            postal_code: address.postal_code.clone(),
            sorting_code: address.sorting_code.clone(),
            language_code: address.language_code.clone(),
            organization: address.organization.clone(),
            recipient: address.recipient.clone(),
            phone: address.phone.clone(),
        }
    }
}

impl From<IpcPaymentAddress> for PaymentAddress {
    fn from(address: IpcPaymentAddress) -> Self {
        Self {
            country: address.country,
            address_line: address.address_line,
            region: address.region,
            city: address.city,
            dependent_locality: address.dependent_locality,
            postal_code: address.postal_code,
            sorting_code: address.sorting_code,
            language_code: address.language_code,
            organization: address.organization,
            recipient: address.recipient,
            phone: address.phone,
        }
    }
}

impl IpcMethodData {
    pub fn from_method_data(method: &PaymentMethodData) -> Result<Self, PaymentError> {
        let (data, data_passed) = serialize_blob(method.data.as_ref())?;
        Ok(Self {
            supported_methods: method.supported_methods.clone(),
            data,
            data_passed,
        })
    }
}

impl IpcDetailsModifier {
    pub fn from_modifier(modifier: &PaymentDetailsModifier) -> Result<Self, PaymentError> {
        let (data, data_passed) = serialize_blob(modifier.data.as_ref())?;
        let (additional_display_items, additional_display_items_passed) =
            split_optional(modifier.additional_display_items.as_ref());
        Ok(Self {
            supported_methods: modifier.supported_methods.clone(),
            total: (&modifier.total).into(),
            additional_display_items,
            additional_display_items_passed,
            data,
            data_passed,
        })
    }
}

fn convert_modifiers(
    modifiers: Option<&Vec<PaymentDetailsModifier>>,
) -> Result<(Vec<IpcDetailsModifier>, bool), PaymentError> {
    match modifiers {
        Some(modifiers) => {
            let converted = modifiers
                .iter()
                .map(IpcDetailsModifier::from_modifier)
                .collect::<Result<Vec<_>, _>>()?;
            Ok((converted, true))
        }
        None => Ok((Vec::new(), false)),
    }
}

impl IpcPaymentDetails {
    /// Constructor details; `id` is the already resolved merchant id.
    pub fn from_init(details: &PaymentDetailsInit, id: &str) -> Result<Self, PaymentError> {
        let (display_items, display_items_passed) =
            split_optional(details.display_items.as_ref());
        let (shipping_options, shipping_options_passed) =
            split_optional(details.shipping_options.as_ref());
        let (modifiers, modifiers_passed) = convert_modifiers(details.modifiers.as_ref())?;
        Ok(Self {
            id: id.to_owned(),
            total: (&details.total).into(),
            display_items,
            display_items_passed,
            shipping_options,
            shipping_options_passed,
            modifiers,
            modifiers_passed,
            error: String::new(),
            error_passed: false,
        })
    }

    pub fn from_update(details: &PaymentDetailsUpdate) -> Result<Self, PaymentError> {
        let (display_items, display_items_passed) =
            split_optional(details.display_items.as_ref());
        let (shipping_options, shipping_options_passed) =
            split_optional(details.shipping_options.as_ref());
        let (modifiers, modifiers_passed) = convert_modifiers(details.modifiers.as_ref())?;
        Ok(Self {
            id: String::new(),
            total: (&details.total).into(),
            display_items,
            display_items_passed,
            shipping_options,
            shipping_options_passed,
            modifiers,
            modifiers_passed,
            error: details.error.clone().unwrap_or_default(),
            error_passed: details.error.is_some(),
        })
    }
}
