//! Turning a configuration file into a deployment.
//!
//! Loading parses the TOML, runs the registered validators and then resolves
//! what every instance derives from its configuration: the address it
//! records in the active slot and the backend directory it routes over.

use super::error::{ConfigError, ConfigResult};
use super::types::GeoLbConfig;
use super::validation::{AddressConflictValidator, BasicValidator, Validator};
use crate::modules::load_balancer::BackendDirectory;
use http::uri::Authority;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Where a deployment's configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Read from this file.
    File(PathBuf),
    /// The file was absent; built-in defaults apply.
    Defaults,
    /// Parsed from a string or built in code.
    Inline,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Defaults => f.write_str("built-in defaults"),
            Self::Inline => f.write_str("inline configuration"),
        }
    }
}

/// A configuration with its derived parts resolved.
#[derive(Debug, Clone)]
pub struct Deployment {
    config: GeoLbConfig,
    source: ConfigSource,
    advertise_address: String,
    directory: BackendDirectory,
}

impl Deployment {
    /// Resolve `config` without running any validator.
    ///
    /// # Errors
    ///
    /// Fails if the advertise address is not a `host:port` pair or a backend
    /// entry is invalid.
    pub fn resolve(config: GeoLbConfig) -> ConfigResult<Self> {
        Self::resolve_from(config, ConfigSource::Inline)
    }

    fn resolve_from(config: GeoLbConfig, source: ConfigSource) -> ConfigResult<Self> {
        let advertise_address = resolve_advertise(&config)?;
        let directory = BackendDirectory::from_configs(&config.backends)?;

        debug!(
            %source,
            advertise = %advertise_address,
            backends = directory.len(),
            "Configuration resolved"
        );

        Ok(Self {
            config,
            source,
            advertise_address,
            directory,
        })
    }

    /// The configuration as loaded.
    #[must_use]
    pub fn config(&self) -> &GeoLbConfig {
        &self.config
    }

    /// Where the configuration came from.
    #[must_use]
    pub fn source(&self) -> &ConfigSource {
        &self.source
    }

    /// Address recorded in the active slot and probed by standby instances.
    #[must_use]
    pub fn advertise_address(&self) -> &str {
        &self.advertise_address
    }

    /// The backend directory.
    #[must_use]
    pub fn directory(&self) -> &BackendDirectory {
        &self.directory
    }

    /// Split into configuration, advertise address and directory.
    #[must_use]
    pub fn into_parts(self) -> (GeoLbConfig, String, BackendDirectory) {
        (self.config, self.advertise_address, self.directory)
    }
}

/// Standby instances probe the advertised address with a TCP connect, so it
/// must name a host and a port.
fn resolve_advertise(config: &GeoLbConfig) -> ConfigResult<String> {
    let address = config.instance.advertise();
    let invalid = |reason: &str| ConfigError::InvalidAdvertiseAddress {
        address: address.clone(),
        reason: reason.to_string(),
    };

    let authority: Authority = address.parse().map_err(|_| invalid("not a host:port pair"))?;
    if authority.host().is_empty() {
        return Err(invalid("missing host"));
    }
    let Some(port) = authority.port_u16() else {
        return Err(invalid("missing port"));
    };

    let listen_port = config.instance.listen_address.port();
    if port != listen_port {
        warn!(
            advertise = %address,
            listen_port,
            "Advertised port differs from the listen port; it must forward to the listener"
        );
    }

    Ok(address)
}

/// Loads deployments, running validators before resolution.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    validators: Vec<Box<dyn Validator>>,
}

impl ConfigLoader {
    /// Loader without validators.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loader with the built-in validators.
    #[must_use]
    pub fn with_default_validators() -> Self {
        Self::new()
            .with_validator(BasicValidator::new())
            .with_validator(AddressConflictValidator::new())
    }

    /// Add a validator.
    #[must_use]
    pub fn with_validator<V: Validator + 'static>(mut self, validator: V) -> Self {
        self.validators.push(Box::new(validator));
        self
    }

    /// Load the deployment described by the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotFound`] if the file is absent, or any read,
    /// parse, validation or resolution error.
    pub fn load(&self, path: impl AsRef<Path>) -> ConfigResult<Deployment> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => ConfigError::NotFound(path.to_path_buf()),
            _ => ConfigError::ReadError {
                path: path.to_path_buf(),
                source: e,
            },
        })?;

        self.finish(toml::from_str(&content)?, ConfigSource::File(path.to_path_buf()))
    }

    /// Like [`load`](Self::load), but an absent file yields the defaults.
    /// The defaults are validated like any other configuration.
    ///
    /// # Errors
    ///
    /// Any error of [`load`](Self::load) other than a missing file.
    pub fn load_or_default(&self, path: impl AsRef<Path>) -> ConfigResult<Deployment> {
        match self.load(path) {
            Err(ConfigError::NotFound(path)) => {
                debug!(path = %path.display(), "No configuration file, using defaults");
                self.finish(GeoLbConfig::default(), ConfigSource::Defaults)
            },
            other => other,
        }
    }

    /// Load a deployment from TOML text.
    ///
    /// # Errors
    ///
    /// Any parse, validation or resolution error.
    pub fn load_str(&self, content: &str) -> ConfigResult<Deployment> {
        self.finish(toml::from_str(content)?, ConfigSource::Inline)
    }

    /// Write `config` as TOML.
    ///
    /// # Errors
    ///
    /// Fails if serialization or the write fails.
    pub fn save(&self, config: &GeoLbConfig, path: impl AsRef<Path>) -> ConfigResult<()> {
        let path = path.as_ref();
        std::fs::write(path, toml::to_string_pretty(config)?).map_err(|e| {
            ConfigError::WriteError {
                path: path.to_path_buf(),
                source: e,
            }
        })
    }

    fn finish(&self, config: GeoLbConfig, source: ConfigSource) -> ConfigResult<Deployment> {
        let mut errors = Vec::new();
        for validator in &self.validators {
            let result = validator.validate(&config);
            for warning in result.warnings() {
                warn!(%source, field = %warning.field, "{}", warning.message);
            }
            errors.extend(result.errors().iter().map(|e| format!("{}: {}", e.field, e.message)));
        }

        if !errors.is_empty() {
            return Err(ConfigError::ValidationError(errors.join("; ")));
        }

        Deployment::resolve_from(config, source)
    }
}
