//! hands-in - fingerspelling practice loop
//!
//! Camera frames to hand landmarks to letter recognition, with an external
//! policy service choosing the next letter to practice.

use hands_in::cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging (WARN level by default, use RUST_LOG=info for debug)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into())
        )
        .init();

    cli::run().await
}
