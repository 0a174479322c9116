//! Backend health-check command

use anyhow::Result;

use keel_core::insight::{InsightBackend, InsightClient};
use keel_core::provider::{BankProvider, ProviderClient};

pub async fn cmd_probe() -> Result<()> {
    println!("🔎 Probing configured backends...");
    println!();

    let provider = ProviderClient::from_env();
    let provider_ok = provider.health_check().await;
    println!(
        "   Bank provider   {}  {}",
        if provider_ok { "✅" } else { "❌" },
        provider.host()
    );

    match InsightClient::from_env() {
        Some(insight) => {
            let insight_ok = insight.health_check().await;
            println!(
                "   Insight backend {}  {} ({})",
                if insight_ok { "✅" } else { "❌" },
                insight.host(),
                insight.model()
            );
        }
        None => {
            println!("   Insight backend --  not configured (set OLLAMA_HOST to enable)");
        }
    }

    Ok(())
}
