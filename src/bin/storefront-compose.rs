//! Storefront Compose CLI Tool
//!
//! Command-line interface for compositing a product photograph onto a bust or
//! mannequin photograph and exporting the storefront variants.

#[cfg(feature = "cli")]
use storefront_compose::cli;

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::main().await
}

#[cfg(not(feature = "cli"))]
fn main() {
    panic!("CLI feature not enabled. Please rebuild with --features cli");
}
