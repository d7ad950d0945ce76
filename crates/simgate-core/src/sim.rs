//! Sim identifiers and gateway configuration records.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Type-Safe Identifiers
// ============================================================================

/// Unique identifier for a simulation instance.
///
/// Wraps the SimSig sim code (e.g., "royston", "exeter"). The code doubles
/// as the registry key for the gateway connection belonging to that sim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SimId(String);

impl SimId {
    /// Creates a new SimId from a string.
    ///
    /// Note: This does not validate the sim code. The hosting application
    /// provides the code, so we trust its format.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the underlying string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SimId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SimId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SimId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for SimId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// Inbound Configuration Records
// ============================================================================

/// Interface gateway block of a sim record, as configured by the host
/// application.
///
/// Both fields mirror the JSON wire shape: a record may name a gateway
/// without a port (misconfiguration caught at resolution time), and
/// `enabled` defaults to off.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// TCP port the sim's interface gateway listens on.
    #[serde(default)]
    pub port: Option<u16>,

    /// Whether the connection should be started as soon as it is created.
    #[serde(default)]
    pub enabled: bool,
}

/// Inbound configuration record for one sim.
///
/// Field names follow the host application's JSON config (camelCase), so a
/// record can be deserialized straight out of it. Presence of the gateway
/// block and of the host is checked exactly once, in [`resolve_gateway`];
/// nothing downstream ever re-inspects raw optionals.
///
/// [`resolve_gateway`]: SimConfig::resolve_gateway
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimConfig {
    /// Sim code, also the registry key for this endpoint.
    pub sim: SimId,

    /// Hostname of the machine running the sim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    /// Interface gateway block; absent when the sim exposes no gateway.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interface_gateway: Option<GatewayConfig>,
}

impl SimConfig {
    /// Creates a bare record with no host and no gateway block.
    pub fn new(sim: impl Into<SimId>) -> Self {
        Self {
            sim: sim.into(),
            host: None,
            interface_gateway: None,
        }
    }

    /// Sets the host, consuming and returning the record.
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Sets the gateway block, consuming and returning the record.
    #[must_use]
    pub fn with_gateway(mut self, port: u16, enabled: bool) -> Self {
        self.interface_gateway = Some(GatewayConfig {
            port: Some(port),
            enabled,
        });
        self
    }

    /// Resolves the raw record into a usable gateway endpoint.
    ///
    /// This is the single validation boundary: a returned
    /// [`GatewayEndpoint`] always carries a non-empty host and a port.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::GatewayMissing`] - no `interfaceGateway` block
    /// - [`ConfigError::HostMissing`] - no host, or an empty host string
    /// - [`ConfigError::PortMissing`] - gateway block without a port
    pub fn resolve_gateway(&self) -> Result<GatewayEndpoint, ConfigError> {
        let gateway = self
            .interface_gateway
            .as_ref()
            .ok_or_else(|| ConfigError::GatewayMissing(self.sim.clone()))?;

        let host = match self.host.as_deref() {
            Some(host) if !host.is_empty() => host.to_string(),
            _ => return Err(ConfigError::HostMissing(self.sim.clone())),
        };

        let port = gateway
            .port
            .ok_or_else(|| ConfigError::PortMissing(self.sim.clone()))?;

        Ok(GatewayEndpoint {
            host,
            port,
            enabled: gateway.enabled,
        })
    }
}

// ============================================================================
// Resolved Endpoint
// ============================================================================

/// A validated gateway endpoint: where to dial and whether to start at once.
///
/// Produced by [`SimConfig::resolve_gateway`]; host and port are always
/// usable here. `enabled` is the *initial* intent from the config record -
/// the supervisor owns the live flag afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayEndpoint {
    /// Hostname of the machine running the sim.
    pub host: String,

    /// TCP port of the interface gateway.
    pub port: u16,

    /// Whether to activate the connection immediately after creation.
    pub enabled: bool,
}

impl GatewayEndpoint {
    /// Returns the `host:port` dial string for logs and diagnostics.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for GatewayEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}
