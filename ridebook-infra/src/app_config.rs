use chrono::NaiveTime;
use ridebook_catalog::{NightWindow, PricingConfig, VehicleRateRecord};
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: Option<DatabaseConfig>,
    pub pricing: PricingSettings,
    pub processor: ProcessorConfig,
    pub kafka: Option<KafkaConfig>,
    /// Seed fleet for the in-memory catalog. Ignored when a database is configured.
    #[serde(default)]
    pub vehicles: Vec<VehicleRateRecord>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 { 5 }

#[derive(Debug, Deserialize, Clone)]
pub struct PricingSettings {
    pub currency: String,
    /// Minor units.
    pub midnight_surcharge: i64,
    /// `HH:MM`, local pickup time.
    pub night_start: String,
    pub night_end: String,
    #[serde(default = "default_deposit_percent")]
    pub deposit_percent: u8,
}

fn default_deposit_percent() -> u8 { 30 }

impl PricingSettings {
    pub fn to_pricing_config(&self) -> Result<PricingConfig, config::ConfigError> {
        if self.midnight_surcharge < 0 {
            return Err(config::ConfigError::Message(
                "pricing.midnight_surcharge must not be negative".into(),
            ));
        }
        if !(1..=100).contains(&self.deposit_percent) {
            return Err(config::ConfigError::Message(
                "pricing.deposit_percent must be between 1 and 100".into(),
            ));
        }

        Ok(PricingConfig {
            currency: self.currency.to_ascii_uppercase(),
            midnight_surcharge: self.midnight_surcharge,
            night_window: NightWindow {
                start: parse_clock("pricing.night_start", &self.night_start)?,
                end: parse_clock("pricing.night_end", &self.night_end)?,
            },
        })
    }
}

fn parse_clock(key: &str, value: &str) -> Result<NaiveTime, config::ConfigError> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|e| config::ConfigError::Message(format!("{} '{}' is not a clock time: {}", key, value, e)))
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProcessorMode {
    Http,
    Sandbox,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProcessorConfig {
    pub mode: ProcessorMode,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub secret_key: String,
    pub webhook_secret: String,
    #[serde(default = "default_tolerance")]
    pub webhook_tolerance_seconds: i64,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    pub success_url: String,
    pub cancel_url: String,
}

fn default_base_url() -> String { "https://api.stripe.com".into() }
fn default_tolerance() -> i64 { 300 }
fn default_timeout_ms() -> u64 { 10_000 }

#[derive(Debug, Deserialize, Clone)]
pub struct KafkaConfig {
    pub brokers: String,
    #[serde(default = "default_topic")]
    pub topic: String,
}

fn default_topic() -> String { "booking.confirmed".into() }

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Optional per-environment overrides
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // e.g. `RIDEBOOK__PROCESSOR__SECRET_KEY=sk_live_...`
            .add_source(config::Environment::with_prefix("RIDEBOOK").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
