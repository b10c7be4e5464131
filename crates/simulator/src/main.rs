//! `granary-simulator` -- sensor-stream simulator.
//!
//! Registers a handful of demo silos against a running `granary-api`
//! instance and then feeds it randomized, slowly drifting readings over
//! plain HTTP, with occasional temperature spikes so alerts actually fire.
//! Purely a collaborator: it only uses the public API surface.
//!
//! # Environment variables
//!
//! | Variable        | Required | Default                        | Description                    |
//! |-----------------|----------|--------------------------------|--------------------------------|
//! | `API_URL`       | no       | `http://localhost:3000/api/v1` | Base URL of the API            |
//! | `INTERVAL_SECS` | no       | `30`                           | Seconds between reading cycles |
//! | `SILO_COUNT`    | no       | `3`                            | Number of demo silos           |

use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use rand::Rng;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Default interval between reading cycles.
const DEFAULT_INTERVAL_SECS: u64 = 30;

/// Default number of simulated silos.
const DEFAULT_SILO_COUNT: i64 = 3;

/// Chance per cycle that a silo takes a temperature spike.
const SPIKE_PROBABILITY: f64 = 0.08;

/// Simulated state for one silo, drifting between cycles.
struct SiloSim {
    silo_id: i64,
    temperature: f64,
    humidity: f64,
    volume_percent: f64,
}

impl SiloSim {
    fn new(silo_id: i64) -> Self {
        let mut rng = rand::rng();
        Self {
            silo_id,
            temperature: rng.random_range(18.0..26.0),
            humidity: rng.random_range(45.0..65.0),
            volume_percent: rng.random_range(30.0..90.0),
        }
    }

    /// Advance one cycle: small random drift, occasional spike.
    fn step(&mut self) {
        let mut rng = rand::rng();
        self.temperature += rng.random_range(-0.6..0.6);
        self.humidity += rng.random_range(-1.5..1.5);
        self.volume_percent += rng.random_range(-1.0..0.4);

        if rng.random_bool(SPIKE_PROBABILITY) {
            let spike = rng.random_range(6.0..12.0);
            tracing::info!(silo_id = self.silo_id, spike, "Injecting temperature spike");
            self.temperature += spike;
        }

        self.temperature = self.temperature.clamp(-10.0, 60.0);
        self.humidity = self.humidity.clamp(20.0, 100.0);
        self.volume_percent = self.volume_percent.clamp(0.0, 100.0);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "granary_simulator=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let api_url = std::env::var("API_URL")
        .unwrap_or_else(|_| "http://localhost:3000/api/v1".to_string());
    let interval_secs: u64 = std::env::var("INTERVAL_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_INTERVAL_SECS);
    let silo_count: i64 = std::env::var("SILO_COUNT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_SILO_COUNT);

    tracing::info!(api_url = %api_url, interval_secs, silo_count, "Starting granary-simulator");

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .context("Failed to build HTTP client")?;

    let mut silos: Vec<SiloSim> = (1..=silo_count).map(SiloSim::new).collect();

    register_silos(&client, &api_url, &silos).await?;

    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received Ctrl-C, stopping simulator");
                break;
            }
            _ = interval.tick() => {
                run_cycle(&client, &api_url, &mut silos).await;
            }
        }
    }

    Ok(())
}

/// Register every simulated silo. Registration is an upsert, so re-running
/// the simulator against a live server is harmless.
async fn register_silos(
    client: &reqwest::Client,
    api_url: &str,
    silos: &[SiloSim],
) -> anyhow::Result<()> {
    for silo in silos {
        let body = serde_json::json!({
            "silo_id": silo.silo_id,
            "name": format!("Demo Silo {}", silo.silo_id),
            "capacity_tons": 500.0,
        });

        let response = client
            .post(format!("{api_url}/silos"))
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Failed to register silo {}", silo.silo_id))?;

        if !response.status().is_success() {
            anyhow::bail!(
                "Silo {} registration returned HTTP {}",
                silo.silo_id,
                response.status()
            );
        }
        tracing::info!(silo_id = silo.silo_id, "Silo registered");
    }
    Ok(())
}

/// Advance and submit one reading per silo.
///
/// Failures are logged and skipped — one unreachable cycle never stops the
/// simulator.
async fn run_cycle(client: &reqwest::Client, api_url: &str, silos: &mut [SiloSim]) {
    for silo in silos.iter_mut() {
        silo.step();

        let body = serde_json::json!({
            "timestamp": Utc::now().to_rfc3339(),
            "temperature": round1(silo.temperature),
            "humidity": round1(silo.humidity),
            "volume_percent": round1(silo.volume_percent),
        });

        let result = client
            .post(format!("{api_url}/silos/{}/readings", silo.silo_id))
            .json(&body)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                tracing::info!(
                    silo_id = silo.silo_id,
                    temperature = round1(silo.temperature),
                    humidity = round1(silo.humidity),
                    volume_percent = round1(silo.volume_percent),
                    "Reading sent"
                );
            }
            Ok(response) => {
                tracing::warn!(
                    silo_id = silo.silo_id,
                    status = %response.status(),
                    "Reading rejected by server"
                );
            }
            Err(e) => {
                tracing::warn!(silo_id = silo.silo_id, error = %e, "Failed to send reading");
            }
        }
    }
}

/// Round to one decimal place, like real gateway firmware reports.
fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
