use octopus_mcp::services::config::OctopusConfig;
use octopus_mcp::services::logger::Logger;
use octopus_mcp::services::octopus::OctopusClient;
use octopus_mcp::services::validation::Validation;
use serde_json::json;

pub fn base_config() -> OctopusConfig {
    OctopusConfig {
        api_key: "test-api-key".to_string(),
        electricity_mpan: Some("1234567890123".to_string()),
        electricity_serial_number: Some("E-SERIAL-001".to_string()),
        gas_mprn: Some("1234567890".to_string()),
        gas_serial_number: Some("G-SERIAL-001".to_string()),
    }
}

pub fn client_for(base_url: &str) -> OctopusClient {
    OctopusClient::new(Logger::new("test"), Validation::new(), base_config())
        .with_base_url(base_url)
}

pub fn consumption_body() -> serde_json::Value {
    json!({
        "count": 2,
        "next": null,
        "previous": null,
        "results": [
            {
                "consumption": 1.5,
                "interval_start": "2024-01-01T00:00:00Z",
                "interval_end": "2024-01-01T00:30:00Z"
            },
            {
                "consumption": 2.1,
                "interval_start": "2024-01-01T00:30:00Z",
                "interval_end": "2024-01-01T01:00:00Z"
            }
        ]
    })
}
