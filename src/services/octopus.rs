use crate::constants::{api, env_keys};
use crate::errors::ToolError;
use crate::services::config::OctopusConfig;
use crate::services::logger::Logger;
use crate::services::validation::Validation;
use base64::Engine;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeterKind {
    Electricity,
    Gas,
}

impl MeterKind {
    pub fn label(self) -> &'static str {
        match self {
            MeterKind::Electricity => "electricity",
            MeterKind::Gas => "gas",
        }
    }

    pub fn identifier_label(self) -> &'static str {
        match self {
            MeterKind::Electricity => "MPAN",
            MeterKind::Gas => "MPRN",
        }
    }

    fn identifier_env_key(self) -> &'static str {
        match self {
            MeterKind::Electricity => env_keys::ELECTRICITY_MPAN,
            MeterKind::Gas => env_keys::GAS_MPRN,
        }
    }

    fn serial_env_key(self) -> &'static str {
        match self {
            MeterKind::Electricity => env_keys::ELECTRICITY_SERIAL_NUMBER,
            MeterKind::Gas => env_keys::GAS_SERIAL_NUMBER,
        }
    }

    fn meter_point_segment(self) -> &'static str {
        match self {
            MeterKind::Electricity => "electricity-meter-points",
            MeterKind::Gas => "gas-meter-points",
        }
    }
}

/// One time-bucketed usage reading, exactly as the API returns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumptionInterval {
    pub consumption: f64,
    pub interval_start: String,
    pub interval_end: String,
}

/// One page of consumption readings. `results` keeps the API's ordering;
/// nothing downstream re-sorts or converts it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumptionPage {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<ConsumptionInterval>,
}

/// Fully resolved and validated request intent, ready for URL construction.
/// `identifier` and `serial_number` have passed their shape checks, so they
/// are safe to place in the path without escaping.
#[derive(Debug, Clone)]
pub struct ResolvedRequest {
    pub kind: MeterKind,
    pub identifier: String,
    pub serial_number: String,
    pub period_from: Option<String>,
    pub period_to: Option<String>,
    pub page_size: Option<i64>,
    pub order_by: Option<String>,
    pub group_by: Option<String>,
}

/// Client for the Octopus Energy consumption API.
///
/// Holds the immutable configuration and a shared connection pool; each
/// call runs one linear pipeline (resolve, build, execute, decode) with no
/// state carried between calls.
#[derive(Clone)]
pub struct OctopusClient {
    logger: Logger,
    validation: Validation,
    config: OctopusConfig,
    client: Client,
    base_url: String,
    timeout_ms: u64,
}

impl OctopusClient {
    pub fn new(logger: Logger, validation: Validation, config: OctopusConfig) -> Self {
        let client = Client::builder()
            .user_agent("octopus-mcp/1.0")
            .build()
            .expect("reqwest client");
        Self {
            logger: logger.child("octopus"),
            validation,
            config,
            client,
            base_url: api::OCTOPUS_API_BASE.to_string(),
            timeout_ms: api::TIMEOUT_CONSUMPTION_MS,
        }
    }

    /// Points the client at a different API origin. Tests use this to
    /// target a local mock server.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Shrinks the per-request budget so tests can simulate expiry without
    /// waiting out the production 30 seconds.
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Merges per-call arguments with the configuration and validates every
    /// field. The first failing check wins: API key, then identifier, then
    /// serial number, then each optional filter.
    pub fn resolve(&self, kind: MeterKind, args: &Value) -> Result<ResolvedRequest, ToolError> {
        if self.config.api_key.is_empty() {
            return Err(ToolError::missing_config(format!(
                "{} environment variable is not set",
                env_keys::API_KEY
            ))
            .with_hint("Set OCTOPUS_API_KEY in your environment or .env file."));
        }

        let identifier_override = match kind {
            MeterKind::Electricity => self.validation.ensure_mpan(args.get("mpan"))?,
            MeterKind::Gas => self.validation.ensure_mprn(args.get("mprn"))?,
        };
        let configured_identifier = match kind {
            MeterKind::Electricity => self.config.electricity_mpan.clone(),
            MeterKind::Gas => self.config.gas_mprn.clone(),
        };
        let identifier = identifier_override
            .or(configured_identifier)
            .ok_or_else(|| {
                ToolError::missing_config(format!(
                    "{} is required for {} consumption. Provide it as a parameter or set {} in your .env file.",
                    kind.identifier_label(),
                    kind.label(),
                    kind.identifier_env_key()
                ))
            })?;

        let serial_override = self
            .validation
            .ensure_optional_string(args.get("serial_number"), "serial_number")?;
        let configured_serial = match kind {
            MeterKind::Electricity => self.config.electricity_serial_number.clone(),
            MeterKind::Gas => self.config.gas_serial_number.clone(),
        };
        let serial_number = serial_override.or(configured_serial).ok_or_else(|| {
            ToolError::missing_config(format!(
                "Serial number is required for {} consumption. Provide it as a parameter or set {} in your .env file.",
                kind.label(),
                kind.serial_env_key()
            ))
        })?;

        let period_from = self
            .validation
            .ensure_date(args.get("period_from"), "period_from")?;
        let period_to = self
            .validation
            .ensure_date(args.get("period_to"), "period_to")?;
        let page_size = self.validation.ensure_page_size(args.get("page_size"))?;
        let order_by = self
            .validation
            .ensure_optional_string(args.get("order_by"), "order_by")?;
        let group_by = self.validation.ensure_group_by(args.get("group_by"))?;

        Ok(ResolvedRequest {
            kind,
            identifier,
            serial_number,
            period_from,
            period_to,
            page_size,
            order_by,
            group_by,
        })
    }

    /// Endpoint URL with the optional filters appended in a fixed order.
    /// Identifier and serial number go in as literal path segments; query
    /// values are percent-encoded. No `?` appears when no filter is set.
    pub fn build_url(&self, request: &ResolvedRequest) -> Result<String, ToolError> {
        let endpoint = format!(
            "{}/{}/{}/meters/{}/consumption/",
            self.base_url,
            request.kind.meter_point_segment(),
            request.identifier,
            request.serial_number
        );
        let mut url = Url::parse(&endpoint)
            .map_err(|err| ToolError::internal(format!("Invalid endpoint URL: {}", err)))?;

        let mut pairs: Vec<(&str, String)> = Vec::new();
        if let Some(value) = &request.period_from {
            pairs.push(("period_from", value.clone()));
        }
        if let Some(value) = &request.period_to {
            pairs.push(("period_to", value.clone()));
        }
        if let Some(value) = request.page_size {
            pairs.push(("page_size", value.to_string()));
        }
        if let Some(value) = &request.order_by {
            pairs.push(("order_by", value.clone()));
        }
        if let Some(value) = &request.group_by {
            pairs.push(("group_by", value.clone()));
        }
        if !pairs.is_empty() {
            let mut query = url.query_pairs_mut();
            for (key, value) in &pairs {
                query.append_pair(key, value);
            }
        }

        Ok(url.to_string())
    }

    fn build_headers(&self) -> Result<HeaderMap, ToolError> {
        let encoded = base64::engine::general_purpose::STANDARD
            .encode(format!("{}:", self.config.api_key));
        let auth = HeaderValue::from_str(&format!("Basic {}", encoded)).map_err(|_| {
            ToolError::internal("API key produced an invalid Authorization header")
        })?;
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    /// Runs the full pipeline for one tool call: resolve and validate the
    /// parameters, issue a single GET with a 30 second budget, classify the
    /// outcome, and decode the body.
    pub async fn fetch_consumption(
        &self,
        kind: MeterKind,
        args: &Value,
    ) -> Result<ConsumptionPage, ToolError> {
        let request = self.resolve(kind, args)?;
        let url = self.build_url(&request)?;
        let headers = self.build_headers()?;

        self.logger.debug(
            "fetch_consumption",
            Some(&serde_json::json!({ "meter": kind.label(), "url": url })),
        );

        let response = self
            .client
            .get(&url)
            .headers(headers)
            .timeout(Duration::from_millis(self.timeout_ms))
            .send()
            .await
            .map_err(|err| classify_request_error(err, &request))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|err| classify_request_error(err, &request))?;

        if !status.is_success() {
            return Err(ToolError::http(format!(
                "Octopus Energy API error ({}) for {} meter {}: {}",
                status.as_u16(),
                request.kind.label(),
                request.identifier,
                text
            ))
            .with_details(serde_json::json!({
                "status": status.as_u16(),
                "meter": request.kind.label(),
                "identifier": request.identifier,
            })));
        }

        serde_json::from_str(&text).map_err(|err| {
            ToolError::parse(format!("Failed to decode consumption response: {}", err))
        })
    }
}

fn classify_request_error(err: reqwest::Error, request: &ResolvedRequest) -> ToolError {
    if err.is_timeout() {
        return ToolError::timeout(format!(
            "Octopus Energy API request timed out after {} for {} meter {}",
            api::TIMEOUT_CONSUMPTION_LABEL,
            request.kind.label(),
            request.identifier
        ));
    }
    ToolError::transport(format!("Octopus Energy API request failed: {}", err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ToolErrorKind;
    use serde_json::json;

    fn full_config() -> OctopusConfig {
        OctopusConfig {
            api_key: "test-api-key".to_string(),
            electricity_mpan: Some("1234567890123".to_string()),
            electricity_serial_number: Some("E-SERIAL-001".to_string()),
            gas_mprn: Some("1234567890".to_string()),
            gas_serial_number: Some("G-SERIAL-001".to_string()),
        }
    }

    fn client(config: OctopusConfig) -> OctopusClient {
        OctopusClient::new(Logger::new("test"), Validation::new(), config)
    }

    #[test]
    fn electricity_url_with_empty_params_has_no_query_string() {
        let client = client(full_config());
        let request = client.resolve(MeterKind::Electricity, &json!({})).unwrap();
        let url = client.build_url(&request).unwrap();
        assert_eq!(
            url,
            "https://api.octopus.energy/v1/electricity-meter-points/1234567890123/meters/E-SERIAL-001/consumption/"
        );
        assert!(!url.contains('?'));
    }

    #[test]
    fn gas_url_uses_configured_mprn_and_serial() {
        let client = client(full_config());
        let request = client.resolve(MeterKind::Gas, &json!({})).unwrap();
        let url = client.build_url(&request).unwrap();
        assert_eq!(
            url,
            "https://api.octopus.energy/v1/gas-meter-points/1234567890/meters/G-SERIAL-001/consumption/"
        );
    }

    #[test]
    fn parameter_override_beats_configuration() {
        let client = client(full_config());
        let request = client
            .resolve(MeterKind::Gas, &json!({ "mprn": "9876543210" }))
            .unwrap();
        assert_eq!(request.identifier, "9876543210");
        let url = client.build_url(&request).unwrap();
        assert!(url.contains("/gas-meter-points/9876543210/"));
        assert!(!url.contains("1234567890/"));
    }

    #[test]
    fn serial_number_override_beats_configuration() {
        let client = client(full_config());
        let request = client
            .resolve(
                MeterKind::Electricity,
                &json!({ "serial_number": "E-OVERRIDE-9" }),
            )
            .unwrap();
        assert_eq!(request.serial_number, "E-OVERRIDE-9");
    }

    #[test]
    fn missing_api_key_fails_first_naming_the_env_key() {
        let mut config = full_config();
        config.api_key = String::new();
        let client = client(config);
        let err = client
            .resolve(MeterKind::Electricity, &json!({}))
            .unwrap_err();
        assert_eq!(err.kind, ToolErrorKind::MissingConfig);
        assert!(err.message.contains("OCTOPUS_API_KEY"));
    }

    #[test]
    fn missing_mpan_names_the_field_and_config_key() {
        let mut config = full_config();
        config.electricity_mpan = None;
        let client = client(config);
        let err = client
            .resolve(MeterKind::Electricity, &json!({}))
            .unwrap_err();
        assert_eq!(err.kind, ToolErrorKind::MissingConfig);
        assert!(err.message.contains("MPAN"));
        assert!(err.message.contains("ELECTRICITY_MPAN"));
    }

    #[test]
    fn missing_mprn_names_the_field_and_config_key() {
        let mut config = full_config();
        config.gas_mprn = None;
        let client = client(config);
        let err = client.resolve(MeterKind::Gas, &json!({})).unwrap_err();
        assert!(err.message.contains("MPRN"));
        assert!(err.message.contains("GAS_MPRN"));
    }

    #[test]
    fn missing_serial_number_names_the_config_key() {
        let mut config = full_config();
        config.gas_serial_number = None;
        let client = client(config);
        let err = client.resolve(MeterKind::Gas, &json!({})).unwrap_err();
        assert!(err.message.contains("Serial number"));
        assert!(err.message.contains("GAS_SERIAL_NUMBER"));
    }

    #[test]
    fn invalid_override_is_a_validation_error() {
        let client = client(full_config());
        let err = client
            .resolve(MeterKind::Electricity, &json!({ "mpan": "123" }))
            .unwrap_err();
        assert_eq!(err.kind, ToolErrorKind::InvalidParams);
        assert!(err.message.contains("'123'"));
    }

    #[test]
    fn invalid_filter_short_circuits_resolution() {
        let client = client(full_config());
        let err = client
            .resolve(
                MeterKind::Electricity,
                &json!({ "page_size": 25001, "group_by": "year" }),
            )
            .unwrap_err();
        assert!(err.message.contains("between 1 and 25000"));
    }

    #[test]
    fn query_parameters_appear_in_fixed_order() {
        let client = client(full_config());
        let request = client
            .resolve(
                MeterKind::Electricity,
                &json!({
                    "period_from": "2024-01-01T00:00:00Z",
                    "period_to": "2024-01-31T23:59:59Z",
                    "page_size": 100,
                    "order_by": "period",
                    "group_by": "day",
                }),
            )
            .unwrap();
        let url = client.build_url(&request).unwrap();
        let positions: Vec<usize> = [
            "period_from=",
            "period_to=",
            "page_size=",
            "order_by=",
            "group_by=",
        ]
        .iter()
        .map(|needle| url.find(needle).expect(needle))
        .collect();
        assert!(positions.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn date_values_are_percent_encoded_in_the_query() {
        let client = client(full_config());
        let request = client
            .resolve(
                MeterKind::Electricity,
                &json!({ "period_from": "2024-01-01T00:00:00Z" }),
            )
            .unwrap();
        let url = client.build_url(&request).unwrap();
        assert!(url.contains("period_from=2024-01-01T00%3A00%3A00Z"));
    }

    #[test]
    fn single_filter_produces_exactly_one_query_parameter() {
        let client = client(full_config());
        let request = client
            .resolve(MeterKind::Gas, &json!({ "page_size": 48 }))
            .unwrap();
        let url = client.build_url(&request).unwrap();
        assert!(url.ends_with("consumption/?page_size=48"));
    }

    #[test]
    fn auth_header_is_basic_with_empty_password() {
        let client = client(full_config());
        let headers = client.build_headers().unwrap();
        // base64("test-api-key:")
        assert_eq!(
            headers.get(AUTHORIZATION).unwrap(),
            "Basic dGVzdC1hcGkta2V5Og=="
        );
        assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "application/json");
    }
}
