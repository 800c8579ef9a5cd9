//! Configuration validation system.

use super::types::GeoLbConfig;
use crate::modules::coordination::StoreBackend;
use crate::modules::load_balancer::{BackendServer, GeoPoint};
use std::collections::HashMap;
use std::time::Duration;

/// A single validation error.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// The field path that failed validation.
    pub field: String,
    /// Error message.
    pub message: String,
    /// Severity level.
    pub severity: ValidationSeverity,
}

impl ValidationError {
    /// Create a new error.
    pub fn error(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            severity: ValidationSeverity::Error,
        }
    }

    /// Create a new warning.
    pub fn warning(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            severity: ValidationSeverity::Warning,
        }
    }
}

/// Severity of validation issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationSeverity {
    /// Error - configuration is invalid.
    Error,
    /// Warning - configuration may have issues.
    Warning,
}

/// Result of configuration validation.
#[derive(Debug, Default)]
pub struct ValidationResult {
    errors: Vec<ValidationError>,
}

impl ValidationResult {
    /// Create a new empty (valid) result.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an error to the result.
    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    /// Check if the validation passed (no errors).
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self
            .errors
            .iter()
            .any(|e| e.severity == ValidationSeverity::Error)
    }

    /// Get all validation errors.
    #[must_use]
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    /// Get only errors (not warnings).
    #[must_use]
    pub fn errors_only(&self) -> Vec<&ValidationError> {
        self.errors
            .iter()
            .filter(|e| e.severity == ValidationSeverity::Error)
            .collect()
    }

    /// Get only warnings.
    #[must_use]
    pub fn warnings(&self) -> Vec<&ValidationError> {
        self.errors
            .iter()
            .filter(|e| e.severity == ValidationSeverity::Warning)
            .collect()
    }

    /// Merge another validation result into this one.
    pub fn merge(&mut self, other: ValidationResult) {
        self.errors.extend(other.errors);
    }
}

/// Trait for configuration validators.
pub trait Validator: std::fmt::Debug + Send + Sync {
    /// Validate a configuration and return any errors.
    fn validate(&self, config: &GeoLbConfig) -> ValidationResult;
}

/// Built-in validator for basic configuration checks.
#[derive(Debug, Default)]
pub struct BasicValidator;

impl BasicValidator {
    /// Create a new basic validator.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn validate_backends(config: &GeoLbConfig, result: &mut ValidationResult) {
        if config.backends.is_empty() {
            result.add_error(ValidationError::error(
                "backends",
                "At least one backend is required",
            ));
        }

        for (i, backend) in config.backends.iter().enumerate() {
            let field = format!("backends[{i}]");
            let location = GeoPoint::new(backend.latitude, backend.longitude);

            if !location.is_valid() {
                result.add_error(ValidationError::error(
                    format!("{field}.latitude"),
                    format!(
                        "Backend {} has an invalid location {location}: latitude must be within [-90, 90] and longitude within [-180, 180]",
                        backend.address
                    ),
                ));
                continue;
            }

            if let Err(e) = BackendServer::new(backend.address.clone(), location) {
                result.add_error(ValidationError::error(
                    format!("{field}.address"),
                    e.to_string(),
                ));
            }
        }
    }

    fn validate_coordination(config: &GeoLbConfig, result: &mut ValidationResult) {
        let coordination = &config.coordination;

        if coordination.lock_key.is_empty() {
            result.add_error(ValidationError::error(
                "coordination.lock_key",
                "Lock key cannot be empty",
            ));
        }

        if coordination.lease_ttl < Duration::from_secs(1) {
            result.add_error(ValidationError::error(
                "coordination.lease_ttl",
                "Lease TTL must be at least 1s",
            ));
        }

        if coordination.backend == StoreBackend::Etcd && coordination.endpoints.is_empty() {
            result.add_error(ValidationError::error(
                "coordination.endpoints",
                "At least one endpoint is required for the etcd backend",
            ));
        }
    }

    fn validate_election(config: &GeoLbConfig, result: &mut ValidationResult) {
        let election = &config.election;

        if election.retry_interval >= election.poll_interval {
            result.add_error(ValidationError::error(
                "election.retry_interval",
                "Retry interval must be shorter than the poll interval",
            ));
        }

        if election.backoff_initial.is_zero() {
            result.add_error(ValidationError::error(
                "election.backoff_initial",
                "Initial backoff cannot be 0",
            ));
        }

        if election.backoff_initial > election.backoff_max {
            result.add_error(ValidationError::error(
                "election.backoff_initial",
                "Initial backoff cannot exceed the maximum backoff",
            ));
        }

        if !election.backoff_multiplier.is_finite() || election.backoff_multiplier < 1.0 {
            result.add_error(ValidationError::error(
                "election.backoff_multiplier",
                "Backoff multiplier must be a finite number of at least 1.0",
            ));
        }

        if !(0.0..=1.0).contains(&election.jitter) {
            result.add_error(ValidationError::error(
                "election.jitter",
                "Jitter must be between 0.0 and 1.0",
            ));
        }

        if election.keep_alive && config.coordination.lease_ttl < Duration::from_secs(3) {
            result.add_error(ValidationError::warning(
                "election.keep_alive",
                "Lease TTL below 3s leaves little room for keep-alive refreshes",
            ));
        }
    }
}

impl Validator for BasicValidator {
    fn validate(&self, config: &GeoLbConfig) -> ValidationResult {
        let mut result = ValidationResult::new();

        if config.instance.name.is_empty() {
            result.add_error(ValidationError::error(
                "instance.name",
                "Instance name cannot be empty",
            ));
        }

        if config.health.probe_timeout.is_zero() {
            result.add_error(ValidationError::error(
                "health.probe_timeout",
                "Probe timeout cannot be 0",
            ));
        }

        if config.router.latitude_header.is_empty() || config.router.longitude_header.is_empty() {
            result.add_error(ValidationError::error(
                "router",
                "Location header names cannot be empty",
            ));
        }

        Self::validate_backends(config, &mut result);
        Self::validate_coordination(config, &mut result);
        Self::validate_election(config, &mut result);

        result
    }
}

/// Validator that checks for address conflicts.
#[derive(Debug, Default)]
pub struct AddressConflictValidator;

impl AddressConflictValidator {
    /// Create a new address conflict validator.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Validator for AddressConflictValidator {
    fn validate(&self, config: &GeoLbConfig) -> ValidationResult {
        let mut result = ValidationResult::new();

        let listen = config.instance.listen_address;
        let control = config.control.socket_addr();
        if config.control.enabled && listen.port() != 0 && listen.port() == control.port() {
            let overlaps = listen.ip() == control.ip()
                || listen.ip().is_unspecified()
                || control.ip().is_unspecified();
            if overlaps {
                result.add_error(ValidationError::error(
                    "control.port",
                    format!("Control address {control} conflicts with instance.listen_address {listen}"),
                ));
            }
        }

        let mut seen: HashMap<&str, usize> = HashMap::new();
        for (i, backend) in config.backends.iter().enumerate() {
            if let Some(first) = seen.insert(backend.address.as_str(), i) {
                result.add_error(ValidationError::warning(
                    format!("backends[{i}].address"),
                    format!(
                        "Backend address {} duplicates backends[{first}]",
                        backend.address
                    ),
                ));
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::load_balancer::BackendConfig;

    #[test]
    fn test_basic_validator_valid() {
        let config = GeoLbConfig::default();
        let validator = BasicValidator::new();
        let result = validator.validate(&config);
        assert!(result.is_valid());
    }

    #[test]
    fn test_basic_validator_empty_name() {
        let mut config = GeoLbConfig::default();
        config.instance.name = String::new();

        let validator = BasicValidator::new();
        let result = validator.validate(&config);

        assert!(!result.is_valid());
        assert!(result.errors()[0].message.contains("name cannot be empty"));
    }

    #[test]
    fn test_basic_validator_backends() {
        let mut config = GeoLbConfig::default();
        config.backends = vec![
            BackendConfig::new("http://localhost:3030", 95.0, 20.0),
            BackendConfig::new("https://localhost:3031", 10.0, 20.0),
        ];

        let result = BasicValidator::new().validate(&config);
        let errors = result.errors_only();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].field, "backends[0].latitude");
        assert_eq!(errors[1].field, "backends[1].address");

        config.backends.clear();
        let result = BasicValidator::new().validate(&config);
        assert!(result.errors()[0].message.contains("At least one backend"));
    }

    #[test]
    fn test_basic_validator_election_timing() {
        let mut config = GeoLbConfig::default();
        config.election.retry_interval = config.election.poll_interval;
        config.election.jitter = 1.5;

        let result = BasicValidator::new().validate(&config);
        let fields: Vec<_> = result.errors().iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"election.retry_interval"));
        assert!(fields.contains(&"election.jitter"));
    }

    #[test]
    fn test_basic_validator_backoff_multiplier() {
        for multiplier in [0.5, f64::NAN, f64::INFINITY] {
            let mut config = GeoLbConfig::default();
            config.election.backoff_multiplier = multiplier;

            let result = BasicValidator::new().validate(&config);
            assert!(!result.is_valid(), "multiplier {multiplier} accepted");
            assert_eq!(result.errors()[0].field, "election.backoff_multiplier");
        }

        let mut config = GeoLbConfig::default();
        config.election.backoff_multiplier = 1e30;
        assert!(BasicValidator::new().validate(&config).is_valid());
    }

    #[test]
    fn test_basic_validator_etcd_endpoints() {
        let mut config = GeoLbConfig::default();
        config.coordination.backend = StoreBackend::Etcd;
        config.coordination.endpoints.clear();

        let result = BasicValidator::new().validate(&config);
        assert!(!result.is_valid());
        assert_eq!(result.errors()[0].field, "coordination.endpoints");
    }

    #[test]
    fn test_address_conflict_validator() {
        let mut config = GeoLbConfig::default();
        config.control.port = config.instance.listen_address.port();

        let validator = AddressConflictValidator::new();
        let result = validator.validate(&config);

        assert!(!result.is_valid());
        assert!(result.errors()[0].message.contains("conflicts"));
    }

    #[test]
    fn test_duplicate_backends_warn() {
        let mut config = GeoLbConfig::default();
        config
            .backends
            .push(BackendConfig::new("http://localhost:3030", 1.0, 2.0));

        let result = AddressConflictValidator::new().validate(&config);
        assert!(result.is_valid());
        assert_eq!(result.warnings().len(), 1);
    }

    #[test]
    fn test_validation_result_merge() {
        let mut result1 = ValidationResult::new();
        result1.add_error(ValidationError::error("field1", "error1"));

        let mut result2 = ValidationResult::new();
        result2.add_error(ValidationError::warning("field2", "warning1"));

        result1.merge(result2);
        assert_eq!(result1.errors().len(), 2);
    }
}
