//! Energy of Money Engine - Main entry point.

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    eom_engine::run::run().await
}
