//! payment-request: drives one donation checkout through both sides of the channel

use payment_request_adapters::PaymentsConfig;

mod demo;

#[tokio::main(flavor = "current_thread")]
async fn main() -> eyre::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let config = PaymentsConfig::from_env()?;
    tracing::info!(tab = config.tab_id, "Starting payment-request demo");

    demo::run(config).await
}
