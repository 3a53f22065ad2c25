use anyhow::Result;
use dotenvy::dotenv;
use serde::Deserialize;
use std::env;

#[derive(Deserialize, Clone, Debug)]
pub struct Config {
    pub server: ServerConfig,
    pub sweep: SweepConfig,
    pub service_name: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Deserialize, Clone, Debug)]
pub struct SweepConfig {
    pub enabled: bool,
    pub interval_secs: u64,
    pub batch_size: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let host = env::var("FINANCE_SERVICE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("FINANCE_SERVICE_PORT")
            .unwrap_or_else(|_| "3007".to_string())
            .parse()?;

        let sweep_enabled = env::var("FINANCE_SWEEP_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse()
            .unwrap_or(true);
        let sweep_interval_secs = env::var("FINANCE_SWEEP_INTERVAL_SECS")
            .unwrap_or_else(|_| "3600".to_string())
            .parse()
            .unwrap_or(3600);
        let sweep_batch_size = env::var("FINANCE_SWEEP_BATCH_SIZE")
            .unwrap_or_else(|_| "500".to_string())
            .parse()
            .unwrap_or(500);

        Ok(Self {
            server: ServerConfig { host, port },
            sweep: SweepConfig {
                enabled: sweep_enabled,
                interval_secs: sweep_interval_secs,
                batch_size: sweep_batch_size,
            },
            service_name: "freight-finance-service".to_string(),
        })
    }
}
