use std::{path::PathBuf, time::Duration};

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    pub check_mx: bool,
    pub mx_timeout_secs: u64,
}

impl EmailConfig {
    pub fn mx_timeout(&self) -> Duration {
        Duration::from_secs(self.mx_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub data_file: PathBuf,
    pub host: String,
    pub port: u16,
    pub email: EmailConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let data_file = var("DATA_FILE").context("DATA_FILE must be set")?.into();
        let port = match var("APP_PORT") {
            Some(v) => v.parse().with_context(|| format!("invalid APP_PORT {v:?}"))?,
            None => 8080,
        };
        let email = EmailConfig {
            check_mx: var("EMAIL_CHECK_MX")
                .map(|v| !matches!(v.to_ascii_lowercase().as_str(), "0" | "false" | "no" | "off"))
                .unwrap_or(true),
            mx_timeout_secs: match var("MX_LOOKUP_TIMEOUT_SECS") {
                Some(v) => v
                    .parse::<u64>()
                    .ok()
                    .filter(|secs| *secs > 0)
                    .with_context(|| format!("invalid MX_LOOKUP_TIMEOUT_SECS {v:?}"))?,
                None => 5,
            },
        };
        Ok(Self {
            data_file,
            host: var("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            email,
        })
    }
}
