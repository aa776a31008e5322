use anyhow::{Result, anyhow};
use url::Url;

use crate::database::models::{MonitorPatch, NewIntegration, NewMonitor};

/// HTTP methods a monitor may probe with
pub const SUPPORTED_METHODS: &[&str] = &["GET", "POST", "PUT", "PATCH", "DELETE", "HEAD"];

/// Validation results with specific error messages
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub error: Option<String>,
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self { is_valid: true, error: None }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self { is_valid: false, error: Some(msg.into()) }
    }

    pub fn to_result(&self) -> Result<()> {
        if self.is_valid {
            Ok(())
        } else {
            Err(anyhow!(self.error.clone().unwrap_or_else(|| "Validation failed".to_string())))
        }
    }

    /// Keep the first failure of a chain of checks.
    fn and(self, next: impl FnOnce() -> ValidationResult) -> ValidationResult {
        if self.is_valid { next() } else { self }
    }
}

/// Validate HTTP/HTTPS URL endpoint
pub fn validate_http_endpoint(target: &str) -> ValidationResult {
    if target.trim().is_empty() {
        return ValidationResult::err("URL cannot be empty");
    }

    match Url::parse(target) {
        Ok(url) => {
            let scheme = url.scheme();
            if scheme != "http" && scheme != "https" {
                return ValidationResult::err(format!(
                    "Invalid scheme '{scheme}'. Must be http or https"
                ));
            }

            if url.host_str().is_none() {
                return ValidationResult::err("URL must have a valid host");
            }

            ValidationResult::ok()
        }
        Err(e) => {
            // If it fails to parse, check if it's missing a scheme
            if !target.contains("://") {
                ValidationResult::err("URL must include scheme (http:// or https://)")
            } else {
                ValidationResult::err(format!("Invalid URL: {e}"))
            }
        }
    }
}

/// Validate the probe method
pub fn validate_method(method: &str) -> ValidationResult {
    let upper = method.trim().to_ascii_uppercase();
    if SUPPORTED_METHODS.contains(&upper.as_str()) {
        ValidationResult::ok()
    } else {
        ValidationResult::err(format!(
            "Unsupported method '{method}'. Use one of {}",
            SUPPORTED_METHODS.join(", ")
        ))
    }
}

/// Validate monitor name
pub fn validate_monitor_name(name: &str) -> ValidationResult {
    let trimmed = name.trim();

    if trimmed.is_empty() {
        return ValidationResult::err("Name cannot be empty");
    }

    if trimmed.chars().count() > 100 {
        return ValidationResult::err("Name too long (max 100 characters)");
    }

    ValidationResult::ok()
}

/// Validate monitor interval
pub fn validate_interval(interval: u64) -> ValidationResult {
    if interval == 0 {
        return ValidationResult::err("Interval must be at least 1 second");
    }

    if interval > 86400 {
        return ValidationResult::err("Interval too long (max 24 hours)");
    }

    ValidationResult::ok()
}

/// Validate consecutive-failure threshold
pub fn validate_threshold(threshold: u32) -> ValidationResult {
    if threshold == 0 {
        return ValidationResult::err("Threshold must be at least 1");
    }

    if threshold > 1000 {
        return ValidationResult::err("Threshold too high (max 1000)");
    }

    ValidationResult::ok()
}

/// Validate probe timeout
pub fn validate_timeout(timeout: u64) -> ValidationResult {
    if timeout == 0 {
        return ValidationResult::err("Timeout must be at least 1 second");
    }

    if timeout > 300 {
        return ValidationResult::err("Timeout too long (max 5 minutes)");
    }

    ValidationResult::ok()
}

pub fn validate_integration_ids(ids: &[i64]) -> ValidationResult {
    if ids.is_empty() {
        ValidationResult::err("At least one integration is required")
    } else {
        ValidationResult::ok()
    }
}

pub fn validate_new_monitor(monitor: &NewMonitor) -> ValidationResult {
    validate_monitor_name(&monitor.name)
        .and(|| validate_http_endpoint(&monitor.url))
        .and(|| validate_method(&monitor.method))
        .and(|| validate_interval(monitor.interval_seconds))
        .and(|| validate_threshold(monitor.threshold))
        .and(|| validate_timeout(monitor.timeout_seconds))
        .and(|| validate_integration_ids(&monitor.integration_ids))
}

pub fn validate_monitor_patch(patch: &MonitorPatch) -> ValidationResult {
    if patch.is_empty() {
        return ValidationResult::err("Nothing to update");
    }

    let mut result = ValidationResult::ok();
    if let Some(name) = &patch.name {
        result = result.and(|| validate_monitor_name(name));
    }
    if let Some(url) = &patch.url {
        result = result.and(|| validate_http_endpoint(url));
    }
    if let Some(method) = &patch.method {
        result = result.and(|| validate_method(method));
    }
    if let Some(interval) = patch.interval_seconds {
        result = result.and(|| validate_interval(interval));
    }
    if let Some(threshold) = patch.threshold {
        result = result.and(|| validate_threshold(threshold));
    }
    if let Some(timeout) = patch.timeout_seconds {
        result = result.and(|| validate_timeout(timeout));
    }
    if let Some(ids) = &patch.integration_ids {
        result = result.and(|| validate_integration_ids(ids));
    }
    result
}

pub fn validate_new_integration(integration: &NewIntegration) -> ValidationResult {
    validate_monitor_name(&integration.name).and(|| validate_http_endpoint(&integration.url))
}
