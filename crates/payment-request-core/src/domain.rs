use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentCurrencyAmount {
    pub currency: String,
    pub value: String,
}

impl PaymentCurrencyAmount {
    pub fn new(currency: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            currency: currency.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentItem {
    pub label: String,
    pub amount: PaymentCurrencyAmount,
    #[serde(default)]
    pub pending: bool,
}

impl PaymentItem {
    pub fn new(label: impl Into<String>, currency: &str, value: &str) -> Self {
        Self {
            label: label.into(),
            amount: PaymentCurrencyAmount::new(currency, value),
            pending: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentShippingOption {
    pub id: String,
    pub label: String,
    pub amount: PaymentCurrencyAmount,
    #[serde(default)]
    pub selected: bool,
}

/// Method identifiers plus the method-specific blob handed over by the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentMethodData {
    pub supported_methods: Vec<String>,
    pub data: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentDetailsModifier {
    pub supported_methods: Vec<String>,
    pub total: PaymentItem,
    pub additional_display_items: Option<Vec<PaymentItem>>,
    pub data: Option<Value>,
}

/// Details given to the constructor. Optional lists stay `None` when the page omitted
/// them; an empty `Vec` means the page passed an empty list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentDetailsInit {
    pub id: Option<String>,
    pub total: PaymentItem,
    pub display_items: Option<Vec<PaymentItem>>,
    pub shipping_options: Option<Vec<PaymentShippingOption>>,
    pub modifiers: Option<Vec<PaymentDetailsModifier>>,
}

/// Details handed back from an `updateWith` promise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentDetailsUpdate {
    pub total: PaymentItem,
    pub display_items: Option<Vec<PaymentItem>>,
    pub shipping_options: Option<Vec<PaymentShippingOption>>,
    pub modifiers: Option<Vec<PaymentDetailsModifier>>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentShippingType {
    #[default]
    Shipping,
    Delivery,
    Pickup,
}

impl PaymentShippingType {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentShippingType::Shipping => "shipping",
            PaymentShippingType::Delivery => "delivery",
            PaymentShippingType::Pickup => "pickup",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentOptions {
    pub request_payer_name: bool,
    pub request_payer_email: bool,
    pub request_payer_phone: bool,
    pub request_shipping: bool,
    pub shipping_type: PaymentShippingType,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentAddress {
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

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentComplete {
    Success,
    Fail,
    #[default]
    Unknown,
}

/// Id of the last option flagged `selected`, which is what the page sees as the
/// initially chosen shipping option.
pub fn selected_shipping_option(options: &[PaymentShippingOption]) -> Option<String> {
    options
        .iter()
        .rev()
        .find(|option| option.selected)
        .map(|option| option.id.clone())
}
