//! Example: search random maps and download the first one
//!
//! Run with: cargo run -p ectmx --example search_maps

use ectmx::{SearchFilters, TmxClient};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    println!("Searching trackmania.exchange...\n");

    let client = TmxClient::new()?;
    let filters = SearchFilters::default();
    let maps = client.search_maps(&filters, 5).await?;

    println!("Found {} maps:\n", maps.len());
    for map in &maps {
        println!(
            "  {} by {} ({}, author time {} ms)",
            map.name,
            map.author,
            map.filename(),
            map.author_time_ms
        );
    }

    if let Some(first) = maps.first() {
        let bytes = client.download_map(first.external_id).await?;
        println!("\nDownloaded {}: {} bytes", first.filename(), bytes.len());
    }

    Ok(())
}
