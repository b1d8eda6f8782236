//! SQL endpoint and port selection.
//!
//! SQL ports follow the `3<instance><selector>` scheme: instance `00` with
//! selector `15` listens on `30015`. The system database always uses
//! selector `13`.

use hanasnap_core::DeploymentMode;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Port selector of the system database.
pub const SYSTEM_DATABASE_SELECTOR: u8 = 13;

/// The last two digits of a SQL port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortSelector {
    /// The system database of a multi-tenant deployment.
    SystemDatabase,

    /// A tenant (or single-tenant) database with the given selector.
    Tenant(u8),
}

impl PortSelector {
    /// Chooses the selector for administrative statements in `mode`.
    pub fn for_mode(mode: DeploymentMode, tenant_port: u8) -> Self {
        match mode {
            DeploymentMode::MultiTenant => Self::SystemDatabase,
            DeploymentMode::SingleTenant => Self::Tenant(tenant_port),
        }
    }

    /// Returns the two-digit selector value.
    pub fn digits(self) -> u8 {
        match self {
            Self::SystemDatabase => SYSTEM_DATABASE_SELECTOR,
            Self::Tenant(port) => port,
        }
    }
}

impl fmt::Display for PortSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}", self.digits())
    }
}

/// Computes the SQL port for an instance number and selector.
pub fn sql_port(instance_number: u8, selector: PortSelector) -> u16 {
    30_000 + u16::from(instance_number) * 100 + u16::from(selector.digits())
}

/// Where a statement is sent: a host and a port selector.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    /// SQL host address.
    pub host: String,

    /// Port selector.
    pub selector: PortSelector,
}

impl Endpoint {
    /// Creates a new endpoint.
    pub fn new(host: impl Into<String>, selector: PortSelector) -> Self {
        Self {
            host: host.into(),
            selector,
        }
    }

    /// Returns `host:port` for the given instance number.
    pub fn address(&self, instance_number: u8) -> String {
        format!("{}:{}", self.host, sql_port(instance_number, self.selector))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.host, self.selector)
    }
}
