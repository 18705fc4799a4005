use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use std::net::IpAddr;
use std::str::FromStr;

use gatelease_core::{AppError, AppResult};
use ipnet::IpNet;
use serde::{Deserialize, Serialize};

/// Single source IP address a perimeter rule is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceAddress(IpAddr);

impl SourceAddress {
    /// Parses a source address from its textual form.
    pub fn parse(value: &str) -> AppResult<Self> {
        let value = value.trim();
        if value.is_empty() {
            return Err(AppError::Validation(
                "source address must not be empty".to_owned(),
            ));
        }

        IpAddr::from_str(value)
            .map(Self)
            .map_err(|error| AppError::Validation(format!("invalid source address '{value}': {error}")))
    }

    /// Returns the underlying IP address.
    #[must_use]
    pub fn as_ip(&self) -> IpAddr {
        self.0
    }

    /// Returns the exact-host network the rule covers (/32 for v4, /128 for v6).
    #[must_use]
    pub fn cidr(&self) -> IpNet {
        match self.0 {
            IpAddr::V4(address) => IpNet::V4(ipnet::Ipv4Net::from(address)),
            IpAddr::V6(address) => IpNet::V6(ipnet::Ipv6Net::from(address)),
        }
    }
}

impl Display for SourceAddress {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Process-wide allow-list of ports a grant may open.
///
/// Loaded once at startup and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortAllowList(BTreeSet<u16>);

impl PortAllowList {
    /// Creates an allow-list from the configured ports.
    pub fn new(ports: impl IntoIterator<Item = u16>) -> AppResult<Self> {
        let ports: BTreeSet<u16> = ports.into_iter().collect();
        if ports.is_empty() {
            return Err(AppError::Validation(
                "port allow-list must contain at least one port".to_owned(),
            ));
        }

        Ok(Self(ports))
    }

    /// Returns whether the allow-list permits the given port.
    #[must_use]
    pub fn permits(&self, port: u16) -> bool {
        self.0.contains(&port)
    }

    /// Returns the permitted ports in ascending order.
    pub fn ports(&self) -> impl Iterator<Item = u16> + '_ {
        self.0.iter().copied()
    }
}
