use eventeq_booking::ServiceConfig;
use serde::Deserialize;
use std::env;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    /// Rate limiting is disabled without Redis.
    pub redis: Option<RedisConfig>,
    pub kafka: Option<KafkaConfig>,
    pub payment: PaymentConfig,
    pub smtp: Option<SmtpConfig>,
    #[serde(default)]
    pub lifecycle: LifecycleConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
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
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_seconds: u64,
}

fn default_max_connections() -> u32 { 5 }
fn default_acquire_timeout() -> u64 { 3 }

#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct KafkaConfig {
    pub brokers: String,
    #[serde(default = "default_topic")]
    pub topic: String,
}

fn default_topic() -> String { "booking-events".into() }

/// Bill-payment gateway settings.
#[derive(Debug, Deserialize, Clone)]
pub struct PaymentConfig {
    pub base_url: String,
    pub secret_key: String,
    pub category_code: String,
    #[serde(default = "default_bill_name")]
    pub bill_name: String,
    pub return_url: String,
    pub callback_url: String,
    #[serde(default = "default_gateway_timeout")]
    pub timeout_seconds: u64,
}

fn default_bill_name() -> String { "EventEQ Payment".into() }
fn default_gateway_timeout() -> u64 { 10 }

#[derive(Debug, Deserialize, Clone)]
pub struct SmtpConfig {
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    pub from_address: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

fn default_smtp_port() -> u16 { 587 }

#[derive(Debug, Deserialize, Clone)]
pub struct LifecycleConfig {
    #[serde(default = "default_store_timeout")]
    pub store_timeout_seconds: u64,
    /// Runs the refresh pass in the background as well when set.
    pub refresh_interval_seconds: Option<u64>,
}

fn default_store_timeout() -> u64 { 10 }

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            store_timeout_seconds: default_store_timeout(),
            refresh_interval_seconds: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RateLimitConfig {
    #[serde(default = "default_rate_requests")]
    pub requests: i64,
    #[serde(default = "default_rate_window")]
    pub window_seconds: i64,
}

fn default_rate_requests() -> i64 { 100 }
fn default_rate_window() -> i64 { 60 }

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests: default_rate_requests(),
            window_seconds: default_rate_window(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Per-environment overrides, optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Developer overrides, never checked in
            .add_source(config::File::with_name("config/local").required(false))
            // e.g. `EVENTEQ__PAYMENT__SECRET_KEY=...`
            .add_source(config::Environment::with_prefix("EVENTEQ").separator("__"))
            .build()?;

        s.try_deserialize()
    }

    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            store_timeout: Duration::from_secs(self.lifecycle.store_timeout_seconds),
            gateway_timeout: Duration::from_secs(self.payment.timeout_seconds),
            ..ServiceConfig::default()
        }
    }
}
