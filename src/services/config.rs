use crate::constants::env_keys;
use std::path::Path;

/// Process-wide Octopus Energy credentials and meter defaults.
///
/// Loaded once at startup and never mutated afterwards; the consumption
/// pipeline borrows it read-only, so concurrent tool calls need no
/// coordination. An empty `api_key` means "unset" and is rejected at
/// request-resolution time rather than at load time, so the server can
/// start and report its configuration status.
#[derive(Debug, Clone)]
pub struct OctopusConfig {
    pub api_key: String,
    pub electricity_mpan: Option<String>,
    pub electricity_serial_number: Option<String>,
    pub gas_mprn: Option<String>,
    pub gas_serial_number: Option<String>,
}

impl OctopusConfig {
    pub fn from_env() -> Self {
        Self {
            api_key: std::env::var(env_keys::API_KEY).unwrap_or_default(),
            electricity_mpan: read_optional(env_keys::ELECTRICITY_MPAN),
            electricity_serial_number: read_optional(env_keys::ELECTRICITY_SERIAL_NUMBER),
            gas_mprn: read_optional(env_keys::GAS_MPRN),
            gas_serial_number: read_optional(env_keys::GAS_SERIAL_NUMBER),
        }
    }
}

fn read_optional(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

/// Loads `KEY=value` pairs from a local `.env` file into the process
/// environment. Variables already set in the running environment win over
/// the file. A missing or unreadable file is not an error.
pub fn load_dotenv(path: &Path) {
    let Ok(content) = std::fs::read_to_string(path) else {
        return;
    };
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let Some((key, value)) = trimmed.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() || std::env::var_os(key).is_some() {
            continue;
        }
        std::env::set_var(key, value.trim());
    }
}
