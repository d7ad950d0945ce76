//! Error types for gateway configuration handling.

use crate::sim::SimId;
use thiserror::Error;

/// Errors raised while resolving a sim's gateway configuration.
///
/// All variants are validation failures: the offending record is rejected
/// and nothing else changes. Every variant carries the sim id so the
/// diagnostic names the endpoint that was misconfigured.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The sim record carries no `interfaceGateway` block at all.
    #[error("no interface gateway configuration for sim {0}")]
    GatewayMissing(SimId),

    /// An interface gateway is configured but the record has no usable host.
    #[error("interface gateway for sim {0} does not include a host")]
    HostMissing(SimId),

    /// An interface gateway is configured but carries no port.
    #[error("interface gateway for sim {0} does not include a port")]
    PortMissing(SimId),
}
