#![allow(dead_code)]

use payment_request_adapters::{InProcessBridge, ManualUi, PaymentsConfig};
use payment_request_core::{
    AcceptStatus, PaymentCurrencyAmount, PaymentDetailsInit, PaymentDetailsModifier,
    PaymentDetailsUpdate, PaymentItem, PaymentMethodData, PaymentOptions, PaymentShippingOption,
    PaymentUiPort, ServiceResponse,
};

pub fn usd(value: &str) -> PaymentCurrencyAmount {
    PaymentCurrencyAmount::new("USD", value)
}

pub fn donation_method_data() -> Vec<PaymentMethodData> {
    vec![PaymentMethodData {
        supported_methods: vec!["MyPay".to_owned(), "TestPay".to_owned()],
        data: None,
    }]
}

pub fn donation_details() -> PaymentDetailsInit {
    PaymentDetailsInit {
        id: Some("test details".to_owned()),
        total: PaymentItem::new("Donation", "USD", "55.00"),
        display_items: Some(vec![
            PaymentItem::new("Original donation amount", "USD", "-65.00"),
            PaymentItem::new("Friends and family discount", "USD", "10.00"),
        ]),
        shipping_options: None,
        modifiers: Some(vec![PaymentDetailsModifier {
            supported_methods: vec!["MyPay".to_owned()],
            total: PaymentItem::new("Discounted donation", "USD", "45.00"),
            additional_display_items: Some(vec![PaymentItem::new(
                "MyPay discount",
                "USD",
                "-10.00",
            )]),
            data: Some(serde_json::json!({ "discountProgramParticipantId": "86328764873265" })),
        }]),
    }
}

pub fn shipping_options(selected: &str) -> Vec<PaymentShippingOption> {
    [("standard", "5.00"), ("drone", "25.00")]
        .into_iter()
        .map(|(id, value)| PaymentShippingOption {
            id: id.to_owned(),
            label: format!("{id} shipping"),
            amount: usd(value),
            selected: id == selected,
        })
        .collect()
}

pub fn update(total: &str) -> PaymentDetailsUpdate {
    PaymentDetailsUpdate {
        total: PaymentItem::new("Donation", "USD", total),
        display_items: None,
        shipping_options: None,
        modifiers: None,
        error: None,
    }
}

pub fn payer_name_options() -> PaymentOptions {
    PaymentOptions {
        request_payer_name: true,
        ..PaymentOptions::default()
    }
}

/// The answer a user gives by picking a card and confirming.
pub fn accepted_show(request_id: &str, method_name: &str, payer_name: &str) -> ServiceResponse {
    ServiceResponse::Show {
        request_id: request_id.to_owned(),
        status: AcceptStatus::Accepted,
        method_name: method_name.to_owned(),
        data: "{}".to_owned(),
        payer_name: payer_name.to_owned(),
        payer_email: String::new(),
        payer_phone: String::new(),
    }
}

pub fn manual_bridge() -> (InProcessBridge<ManualUi>, ManualUi) {
    let ui = ManualUi::default();
    (
        InProcessBridge::new(PaymentsConfig::default(), ui.clone()),
        ui,
    )
}

pub fn pump<U: PaymentUiPort>(bridge: &mut InProcessBridge<U>) {
    bridge.pump().expect("pump frames and tasks");
}
