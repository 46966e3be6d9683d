use std::time::Duration;

use eyre::{bail, WrapErr};
use tokio::time::timeout;
use tracing::{info, warn};

use payment_request_adapters::{DeterministicUi, InProcessBridge, PaymentsConfig};
use payment_request_core::{
    PaymentComplete, PaymentDetailsInit, PaymentDetailsModifier, PaymentError, PaymentItem,
    PaymentMethodData, PaymentOptions, PaymentUiPort, Promise, PromiseState,
};

fn donation() -> (Vec<PaymentMethodData>, PaymentDetailsInit) {
    let method_data = vec![PaymentMethodData {
        supported_methods: vec!["basic-card".to_owned(), "MyPay".to_owned()],
        data: None,
    }];
    let details = PaymentDetailsInit {
        id: Some("donation".to_owned()),
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
    };
    (method_data, details)
}

/// Pumps the bridge until `promise` settles, waiting on the UI between rounds.
async fn settle<T: Clone, U: PaymentUiPort>(
    bridge: &mut InProcessBridge<U>,
    promise: &Promise<T>,
    patience: Duration,
) -> eyre::Result<Result<T, PaymentError>> {
    bridge.pump()?;
    while promise.is_pending() {
        match timeout(patience, bridge.chrome_mut().run_next_task()).await {
            Ok(true) => {
                bridge.pump()?;
            }
            Ok(false) => bail!("payment service sequence closed"),
            Err(_) => bail!("no answer from the payment UI within {patience:?}"),
        }
    }
    match promise.state() {
        PromiseState::Fulfilled(value) => Ok(Ok(value)),
        PromiseState::Rejected(error) => Ok(Err(error)),
        PromiseState::Pending => bail!("promise still pending after the bridge went quiet"),
    }
}

pub async fn run(config: PaymentsConfig) -> eyre::Result<()> {
    let patience = Duration::from_millis(config.ui_delay_ms.saturating_mul(4) + 1_000);
    let mut bridge = InProcessBridge::new(config.clone(), DeterministicUi::new(config));
    let (method_data, details) = donation();
    let options = PaymentOptions {
        request_payer_name: true,
        request_payer_email: true,
        ..PaymentOptions::default()
    };

    let id = bridge
        .content_mut()
        .construct(&method_data, &details, options)
        .wrap_err("constructing the donation request")?;
    info!(request_id = %id, "donation request created");

    let can_make = bridge.content_mut().handle(&id)?.can_make_payment()?;
    match settle(&mut bridge, &can_make, patience).await? {
        Ok(true) => info!("a supported payment method is available"),
        Ok(false) => warn!("no supported payment method; showing the sheet anyway"),
        Err(error) => bail!("canMakePayment failed: {error}"),
    }

    let accept = bridge.content_mut().handle(&id)?.show()?;
    let response = match settle(&mut bridge, &accept, patience).await? {
        Ok(response) => response,
        Err(error) => {
            warn!(%error, "the donation was not accepted");
            return Ok(());
        }
    };
    info!(
        method = %response.method_name,
        payer_name = response.payer_name.as_deref().unwrap_or_default(),
        payer_email = response.payer_email.as_deref().unwrap_or_default(),
        "donation accepted"
    );

    let done = bridge
        .content_mut()
        .handle(&id)?
        .complete(PaymentComplete::Success)?;
    if let Err(error) = settle(&mut bridge, &done, patience).await? {
        bail!("complete() failed: {error}");
    }
    info!("payment sheet closed");

    info!(
        content_requests = bridge.content().manager().len(),
        chrome_requests = bridge.chrome().service().enumerate().len(),
        "demo finished"
    );
    Ok(())
}
