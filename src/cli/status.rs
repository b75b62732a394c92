//! `toolgate status`: probe running services.

use std::time::Duration;

use url::Url;

/// Result of one health probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Health {
    Ok,
    Degraded(u16),
    Unreachable,
}

impl std::fmt::Display for Health {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ok => write!(f, "OK"),
            Self::Degraded(status) => write!(f, "Degraded (status {})", status),
            Self::Unreachable => write!(f, "Unreachable"),
        }
    }
}

/// `GET <base>/health`.
pub async fn probe(client: &reqwest::Client, base: &Url) -> Health {
    let Ok(url) = base.join("health") else {
        return Health::Unreachable;
    };
    match client.get(url).send().await {
        Ok(resp) if resp.status().is_success() => Health::Ok,
        Ok(resp) => Health::Degraded(resp.status().as_u16()),
        Err(_) => Health::Unreachable,
    }
}

pub async fn run_status_command(gateway: &Url, orchestrator: &Url) -> anyhow::Result<()> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(2))
        .build()?;

    println!("Toolgate Status");
    println!("===============\n");

    let (gateway_health, orchestrator_health) =
        tokio::join!(probe(&client, gateway), probe(&client, orchestrator));
    println!("  Gateway:      {} ({})", gateway_health, gateway);
    println!("  Orchestrator: {} ({})", orchestrator_health, orchestrator);

    let auth = std::env::var("GATEWAY_AUTH_TOKEN").is_ok_and(|v| !v.trim().is_empty());
    println!(
        "  Auth Token:   {}",
        if auth { "set" } else { "not set" }
    );
    Ok(())
}
