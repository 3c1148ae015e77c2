use anyhow::Context;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub version: u32,
    pub database: Database,
    pub http: HttpConfig,
    #[serde(default)]
    pub assets: Assets,
    #[serde(default)]
    pub mixtapes: Mixtapes,
    #[serde(default)]
    pub public_endpoint: PublicEndpoint,
}

impl Config {
    pub fn load(path: &str) -> anyhow::Result<Config> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {path}"))?;
        toml::from_str(&contents).with_context(|| "Failed to parse config TOML")
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    pub bind_addr: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Database {
    InMemory,
    OnDisk { location: PathBuf },
}

/// static files served under /assets/, most importantly the cassette cue
/// sounds; the pages degrade gracefully when the directory is absent
#[derive(Debug, Deserialize, Default)]
pub struct Assets {
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
pub struct Mixtapes {
    /// id served when a requested mixtape does not exist
    #[serde(default = "default_fallback_id")]
    pub fallback_id: String,
}

impl Default for Mixtapes {
    fn default() -> Self {
        Self {
            fallback_id: default_fallback_id(),
        }
    }
}

fn default_fallback_id() -> String {
    "awesome-mix".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct PublicEndpoint {
    pub base_url: String,
}

impl Default for PublicEndpoint {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
        }
    }
}
