use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentsConfig {
    /// Exposes `PaymentRequest` construction to pages.
    pub enabled: bool,
    /// Deletes the content-side actor once no request is registered.
    pub release_idle_actor: bool,
    pub tab_id: u64,
    /// Delay before the stand-in UI answers; zero answers straight away.
    pub ui_delay_ms: u64,
    pub ui_can_make_payment: bool,
    pub ui_accept: bool,
    pub ui_method_name: String,
    pub ui_payer_name: String,
    pub ui_payer_email: String,
    pub ui_payer_phone: String,
}

impl Default for PaymentsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            release_idle_actor: true,
            tab_id: 1,
            ui_delay_ms: 0,
            ui_can_make_payment: true,
            ui_accept: true,
            ui_method_name: "basic-card".to_owned(),
            ui_payer_name: String::new(),
            ui_payer_email: String::new(),
            ui_payer_phone: String::new(),
        }
    }
}

impl PaymentsConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(v) = parsed(&lookup, "PAYMENTS_REQUEST_ENABLED", parse_flag)? {
            config.enabled = v;
        }
        if let Some(v) = parsed(&lookup, "PAYMENTS_RELEASE_IDLE_ACTOR", parse_flag)? {
            config.release_idle_actor = v;
        }
        if let Some(v) = parsed(&lookup, "PAYMENTS_TAB_ID", parse_number::<u64>)? {
            config.tab_id = v;
        }
        if let Some(v) = parsed(&lookup, "PAYMENTS_UI_DELAY_MS", parse_number::<u64>)? {
            config.ui_delay_ms = v;
        }
        if let Some(v) = parsed(&lookup, "PAYMENTS_UI_CAN_MAKE_PAYMENT", parse_flag)? {
            config.ui_can_make_payment = v;
        }
        if let Some(v) = parsed(&lookup, "PAYMENTS_UI_ACCEPT", parse_flag)? {
            config.ui_accept = v;
        }
        if let Some(v) = lookup("PAYMENTS_UI_METHOD_NAME") {
            if v.trim().is_empty() {
                return Err(ConfigError::Invalid {
                    key: "PAYMENTS_UI_METHOD_NAME",
                    value: v,
                });
            }
            config.ui_method_name = v;
        }
        if let Some(v) = lookup("PAYMENTS_UI_PAYER_NAME") {
            config.ui_payer_name = v;
        }
        if let Some(v) = lookup("PAYMENTS_UI_PAYER_EMAIL") {
            config.ui_payer_email = v;
        }
        if let Some(v) = lookup("PAYMENTS_UI_PAYER_PHONE") {
            config.ui_payer_phone = v;
        }
        Ok(config)
    }
}

fn parsed<F, T>(
    lookup: &F,
    key: &'static str,
    parse: fn(&str) -> Option<T>,
) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(value) => parse(value.trim())
            .map(Some)
            .ok_or(ConfigError::Invalid { key, value }),
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_number<T: FromStr>(value: &str) -> Option<T> {
    value.parse().ok()
}
