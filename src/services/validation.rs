use crate::constants::{grouping, limits};
use crate::errors::ToolError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static ISO_8601_UTC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{4})-(\d{2})-(\d{2})T(\d{2}):(\d{2}):(\d{2})Z$").expect("valid regex")
});

static MPAN_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{13}$").expect("valid regex"));

static MPRN_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{10}$").expect("valid regex"));

/// Pure field-level checks over untyped tool arguments.
///
/// Every method maps an absent or null value to `None`, a valid value to
/// `Some`, and anything else to an `InvalidParams` error naming the field.
/// No method touches any state outside its arguments.
#[derive(Clone)]
pub struct Validation;

impl Validation {
    pub fn new() -> Self {
        Self
    }

    /// ISO 8601 UTC timestamp (`2024-01-15T00:00:00Z`). The numeric
    /// components are checked against the real calendar explicitly instead
    /// of being handed to a lenient parser, so month 13 or Feb 30 fail.
    pub fn ensure_date(
        &self,
        value: Option<&Value>,
        label: &str,
    ) -> Result<Option<String>, ToolError> {
        let Some(value) = present(value) else {
            return Ok(None);
        };
        let text = value.as_str().ok_or_else(|| {
            ToolError::invalid_params(format!("{} must be a string", label))
        })?;
        let captures = ISO_8601_UTC.captures(text).ok_or_else(|| {
            ToolError::invalid_params(format!(
                "Invalid {}: must be ISO 8601 format with UTC indicator (e.g., 2024-01-15T00:00:00Z)",
                label
            ))
        })?;

        // Capture groups are 2-4 digit numbers, so parsing cannot fail.
        let component = |idx: usize| -> u32 { captures[idx].parse().unwrap_or(0) };
        let (year, month, day) = (component(1) as i32, component(2), component(3));
        let (hour, minute, second) = (component(4), component(5), component(6));

        let date_ok = chrono::NaiveDate::from_ymd_opt(year, month, day).is_some();
        let time_ok = chrono::NaiveTime::from_hms_opt(hour, minute, second).is_some();
        if !date_ok || !time_ok {
            return Err(ToolError::invalid_params(format!(
                "Invalid {}: must be a real calendar date/time (got: '{}')",
                label, text
            )));
        }
        Ok(Some(text.to_string()))
    }

    /// MPAN (Meter Point Administration Number): exactly 13 digits.
    pub fn ensure_mpan(&self, value: Option<&Value>) -> Result<Option<String>, ToolError> {
        self.ensure_meter_identifier(value, &MPAN_PATTERN, "MPAN", limits::MPAN_DIGITS)
    }

    /// MPRN (Meter Point Reference Number): exactly 10 digits.
    pub fn ensure_mprn(&self, value: Option<&Value>) -> Result<Option<String>, ToolError> {
        self.ensure_meter_identifier(value, &MPRN_PATTERN, "MPRN", limits::MPRN_DIGITS)
    }

    fn ensure_meter_identifier(
        &self,
        value: Option<&Value>,
        pattern: &Regex,
        label: &str,
        digits: usize,
    ) -> Result<Option<String>, ToolError> {
        let Some(value) = present(value) else {
            return Ok(None);
        };
        let text = value.as_str().ok_or_else(|| {
            ToolError::invalid_params(format!("{} must be a string", label))
        })?;
        if !pattern.is_match(text) {
            return Err(ToolError::invalid_params(format!(
                "Invalid {}: must be exactly {} digits (got: '{}')",
                label, digits, text
            )));
        }
        Ok(Some(text.to_string()))
    }

    /// Whole number in [1, 25000]. The three failure modes (not a number,
    /// not an integer, out of range) carry distinct messages.
    pub fn ensure_page_size(&self, value: Option<&Value>) -> Result<Option<i64>, ToolError> {
        let Some(value) = present(value) else {
            return Ok(None);
        };
        let number = value
            .as_f64()
            .filter(|n| !n.is_nan())
            .ok_or_else(|| ToolError::invalid_params("page_size must be a number"))?;
        // A JSON number like 100.0 still counts as a whole number, matching
        // how callers serialize integers from loosely typed runtimes.
        let whole = value
            .as_i64()
            .or_else(|| (number.fract() == 0.0).then_some(number as i64))
            .ok_or_else(|| {
                ToolError::invalid_params(format!(
                    "page_size must be a whole number (got: {})",
                    number
                ))
            })?;
        if !(limits::MIN_PAGE_SIZE..=limits::MAX_PAGE_SIZE).contains(&whole) {
            return Err(ToolError::invalid_params(format!(
                "page_size must be between {} and {} (got: {})",
                limits::MIN_PAGE_SIZE,
                limits::MAX_PAGE_SIZE,
                whole
            )));
        }
        Ok(Some(whole))
    }

    pub fn ensure_optional_string(
        &self,
        value: Option<&Value>,
        label: &str,
    ) -> Result<Option<String>, ToolError> {
        let Some(value) = present(value) else {
            return Ok(None);
        };
        let text = value.as_str().ok_or_else(|| {
            ToolError::invalid_params(format!("{} must be a string", label))
        })?;
        Ok(Some(text.to_string()))
    }

    /// One of the fixed grouping buckets the consumption API accepts.
    pub fn ensure_group_by(&self, value: Option<&Value>) -> Result<Option<String>, ToolError> {
        let Some(value) = present(value) else {
            return Ok(None);
        };
        let text = value
            .as_str()
            .ok_or_else(|| ToolError::invalid_params("group_by must be a string"))?;
        if !grouping::ALLOWED.contains(&text) {
            return Err(ToolError::invalid_params(format!(
                "group_by must be one of: {} (got: '{}')",
                grouping::ALLOWED.join(", "),
                text
            )));
        }
        Ok(Some(text.to_string()))
    }
}

impl Default for Validation {
    fn default() -> Self {
        Self::new()
    }
}

fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}
