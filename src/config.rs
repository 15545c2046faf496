//! Operator configuration read from the environment

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use crate::controller::Error;

pub const ENV_NAMESPACE: &str = "ADDON_OPERATOR_NAMESPACE";
pub const ENV_RESYNC_SECONDS: &str = "ADDON_OPERATOR_RESYNC_SECONDS";
pub const ENV_REQUEUE_SECONDS: &str = "ADDON_OPERATOR_REQUEUE_SECONDS";
pub const ENV_STATUS_REPORTING: &str = "ADDON_OPERATOR_STATUS_REPORTING";
pub const ENV_HEALTH_ADDR: &str = "ADDON_OPERATOR_HEALTH_ADDR";

pub const DEFAULT_NAMESPACE: &str = "openshift-addon-operator";
pub const DEFAULT_HEALTH_ADDR: SocketAddr =
    SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 8080);

#[derive(Clone, Debug, PartialEq)]
pub struct OperatorConfig {
    /// Namespace the operator itself runs in
    pub namespace: String,
    /// Requeue interval after a fully reconciled pass
    pub resync_interval: Duration,
    /// Delay used when a phase asks to be retried
    pub requeue_interval: Duration,
    /// Mirror addon conditions to the fleet API
    pub status_reporting_enabled: bool,
    /// Listen address of the health and metrics server
    pub health_addr: SocketAddr,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            resync_interval: Duration::from_secs(600),
            requeue_interval: Duration::from_secs(10),
            status_reporting_enabled: true,
            health_addr: DEFAULT_HEALTH_ADDR,
        }
    }
}

impl OperatorConfig {
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(ns) = lookup(ENV_NAMESPACE).filter(|v| !v.is_empty()) {
            config.namespace = ns;
        }
        if let Some(secs) = lookup(ENV_RESYNC_SECONDS) {
            config.resync_interval = Duration::from_secs(parse_seconds(ENV_RESYNC_SECONDS, &secs)?);
        }
        if let Some(secs) = lookup(ENV_REQUEUE_SECONDS) {
            config.requeue_interval =
                Duration::from_secs(parse_seconds(ENV_REQUEUE_SECONDS, &secs)?);
        }
        if let Some(flag) = lookup(ENV_STATUS_REPORTING) {
            config.status_reporting_enabled = match flag.to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => true,
                "false" | "0" | "no" => false,
                other => {
                    return Err(Error::InvalidConfig(format!(
                        "{} must be a boolean, got {:?}",
                        ENV_STATUS_REPORTING, other
                    )));
                }
            };
        }
        if let Some(addr) = lookup(ENV_HEALTH_ADDR) {
            config.health_addr = addr.parse().map_err(|e| {
                Error::InvalidConfig(format!("{} is not a socket address: {}", ENV_HEALTH_ADDR, e))
            })?;
        }

        Ok(config)
    }
}

fn parse_seconds(key: &str, value: &str) -> Result<u64, Error> {
    match value.trim().parse::<u64>() {
        Ok(0) | Err(_) => Err(Error::InvalidConfig(format!(
            "{} must be a positive number of seconds, got {:?}",
            key, value
        ))),
        Ok(secs) => Ok(secs),
    }
}
