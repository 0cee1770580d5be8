use crate::services::config::{load_dotenv, OctopusConfig};
use crate::services::logger::Logger;
use crate::services::octopus::OctopusClient;
use crate::services::validation::Validation;
use std::path::Path;

pub struct App {
    pub logger: Logger,
    pub octopus: OctopusClient,
}

impl App {
    /// Loads `.env` (without overwriting the process environment), reads
    /// the configuration once, and wires the consumption client.
    pub fn initialize() -> Self {
        load_dotenv(Path::new(".env"));
        let config = OctopusConfig::from_env();
        Self::with_config(config)
    }

    pub fn with_config(config: OctopusConfig) -> Self {
        let logger = Logger::new("octopus-mcp");
        log_config_status(&logger, &config);
        let octopus = OctopusClient::new(logger.clone(), Validation::new(), config);
        Self { logger, octopus }
    }
}

fn log_config_status(logger: &Logger, config: &OctopusConfig) {
    let set = |present: bool| if present { "set" } else { "not set" };
    logger.info(
        "configuration",
        Some(&serde_json::json!({
            "api_key": set(!config.api_key.is_empty()),
            "electricity_mpan": set(config.electricity_mpan.is_some()),
            "electricity_serial_number": set(config.electricity_serial_number.is_some()),
            "gas_mprn": set(config.gas_mprn.is_some()),
            "gas_serial_number": set(config.gas_serial_number.is_some()),
        })),
    );
}
