use std::env;
use std::time::Duration;

use serde_derive::Serialize;

use crate::ip::{is_valid_ip, split_ip_port};
use crate::{Error, Result};

pub const ENV_NODE_NAME: &str = "OPT_NODE_NAME";
pub const ENV_INTERVAL_MS: &str = "OPT_INTERVAL_MS";
pub const ENV_CHECK_PODPOD: &str = "OPT_CHECK_PODPOD";
pub const ENV_CHECK_PODSERVICE: &str = "OPT_CHECK_PODSERVICE";
pub const ENV_CHECK_PODEX_ICMP: &str = "OPT_CHECK_PODEX_ICMP";
pub const ENV_CHECK_PODEX_CONN: &str = "OPT_CHECK_PODEX_CONN";

const DEFAULT_INTERVAL_MS: u64 = 5000;

#[derive(Debug, Clone, Serialize)]
pub struct ExternalTarget {
    pub ip: String,
    pub port: i32,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub node_name: String,
    pub interval: Duration,
    pub check_pod_pod: bool,
    pub check_pod_service: bool,
    pub external_icmp: Vec<String>,
    pub external_conn: Vec<ExternalTarget>,
}

impl Config {
    pub fn from_env() -> Result<Config> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// An empty value counts as unset, so e.g. OPT_CHECK_PODPOD="" keeps
    /// the default.
    fn from_lookup<F>(lookup: F) -> Result<Config>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let node_name = get(ENV_NODE_NAME)
            .ok_or_else(|| Error::ConfigError(format!("node name isn't set: {ENV_NODE_NAME}")))?;

        let interval_ms = match get(ENV_INTERVAL_MS) {
            Some(v) => v
                .parse::<u64>()
                .map_err(|_| Error::ConfigError(format!("wrong interval: {v}")))?,
            None => DEFAULT_INTERVAL_MS,
        };

        let check_pod_pod = parse_bool(get(ENV_CHECK_PODPOD), true, ENV_CHECK_PODPOD)?;
        let check_pod_service = parse_bool(get(ENV_CHECK_PODSERVICE), true, ENV_CHECK_PODSERVICE)?;

        let mut external_icmp = Vec::new();
        if let Some(list) = get(ENV_CHECK_PODEX_ICMP) {
            for icmp_ip in list.split(',') {
                if !is_valid_ip(icmp_ip) {
                    return Err(Error::ConfigError(format!(
                        "wrong external ICMP IP format: {icmp_ip}"
                    )));
                }
                external_icmp.push(icmp_ip.to_string());
            }
        }

        let mut external_conn = Vec::new();
        if let Some(list) = get(ENV_CHECK_PODEX_CONN) {
            for conn_ip_port in list.split(',') {
                let (ip, port) = split_ip_port(conn_ip_port).map_err(|_| {
                    Error::ConfigError(format!(
                        "wrong external connection IP/port format: {conn_ip_port}"
                    ))
                })?;
                external_conn.push(ExternalTarget { ip, port });
            }
        }

        if !check_pod_pod && !check_pod_service {
            return Err(Error::ConfigError(
                "pod-pod and pod-service checks are both disabled".to_string(),
            ));
        }

        Ok(Config {
            node_name,
            interval: Duration::from_millis(interval_ms),
            check_pod_pod,
            check_pod_service,
            external_icmp,
            external_conn,
        })
    }
}

fn parse_bool(value: Option<String>, default: bool, key: &str) -> Result<bool> {
    match value {
        Some(v) => v
            .parse::<bool>()
            .map_err(|_| Error::ConfigError(format!("wrong bool for {key}: {v}"))),
        None => Ok(default),
    }
}
