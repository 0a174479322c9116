//! Server command implementation

use anyhow::{Context, Result};

pub async fn cmd_serve(host: &str, port: u16, allow_origin: Vec<String>) -> Result<()> {
    println!("🚀 Starting Keel API server...");
    println!("   Listening: http://{}:{}", host, port);
    if allow_origin.is_empty() {
        println!("   CORS: same-origin only (pass --allow-origin to open up)");
    } else {
        println!("   CORS: {}", allow_origin.join(", "));
    }
    println!();
    println!("   Press Ctrl+C to stop");

    let config = keel_server::ServerConfig {
        allowed_origins: allow_origin,
    };
    keel_server::serve(host, port, config)
        .await
        .context("Server error")?;

    Ok(())
}
