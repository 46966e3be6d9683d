//! Monetary amount checks applied to details before they cross the process boundary.

use crate::domain::{PaymentDetailsInit, PaymentDetailsModifier, PaymentDetailsUpdate, PaymentItem};
use crate::ports::PaymentError;

/// `-?[0-9]+(\.[0-9]+)?`
pub fn is_valid_decimal(value: &str) -> bool {
    let digits = value.strip_prefix('-').unwrap_or(value);
    let (whole, fraction) = match digits.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (digits, None),
    };
    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    all_digits(whole) && fraction.map_or(true, all_digits)
}

pub fn is_non_negative_decimal(value: &str) -> bool {
    is_valid_decimal(value) && value.parse::<f64>().is_ok_and(|v| v.is_finite() && v >= 0.0)
}

fn check_valid(field: &str, value: &str) -> Result<(), PaymentError> {
    if is_valid_decimal(value) {
        return Ok(());
    }
    Err(PaymentError::Type(format!(
        "The amount.value of \"{field}\"({value}) must be a valid decimal monetary value."
    )))
}

fn check_non_negative(field: &str, value: &str) -> Result<(), PaymentError> {
    if is_non_negative_decimal(value) {
        return Ok(());
    }
    Err(PaymentError::Type(format!(
        "The amount.value of \"{field}\"({value}) must be a valid and positive decimal monetary value."
    )))
}

fn check_items(field: &str, items: Option<&Vec<PaymentItem>>) -> Result<(), PaymentError> {
    for item in items.into_iter().flatten() {
        check_valid(field, &item.amount.value)?;
    }
    Ok(())
}

fn check_modifiers(modifiers: Option<&Vec<PaymentDetailsModifier>>) -> Result<(), PaymentError> {
    for modifier in modifiers.into_iter().flatten() {
        check_non_negative("details.modifiers.total", &modifier.total.amount.value)?;
        check_items(
            "details.modifiers.additionalDisplayItems",
            modifier.additional_display_items.as_ref(),
        )?;
    }
    Ok(())
}

fn check_common(
    total: &PaymentItem,
    display_items: Option<&Vec<PaymentItem>>,
    shipping_options: Option<&Vec<crate::domain::PaymentShippingOption>>,
    modifiers: Option<&Vec<PaymentDetailsModifier>>,
) -> Result<(), PaymentError> {
    check_non_negative("details.total", &total.amount.value)?;
    check_items("details.displayItems", display_items)?;
    for option in shipping_options.into_iter().flatten() {
        check_valid("details.shippingOptions", &option.amount.value)?;
    }
    check_modifiers(modifiers)
}

pub fn validate_details_init(details: &PaymentDetailsInit) -> Result<(), PaymentError> {
    check_common(
        &details.total,
        details.display_items.as_ref(),
        details.shipping_options.as_ref(),
        details.modifiers.as_ref(),
    )
}

pub fn validate_details_update(details: &PaymentDetailsUpdate) -> Result<(), PaymentError> {
    check_common(
        &details.total,
        details.display_items.as_ref(),
        details.shipping_options.as_ref(),
        details.modifiers.as_ref(),
    )
}
