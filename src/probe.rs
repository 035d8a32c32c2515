use lazy_static::lazy_static;
use regex::Regex;
use serde_derive::Serialize;
use tokio::process::Command;

use crate::{Error, Result};

static CNSENTER_BIN: &str = "cnsenter";
static REGEX_CONTAINER_ID: &str = "^(?P<runtime>[a-z0-9-]+)://(?P<id>[0-9a-zA-Z]+)$";

lazy_static! {
    static ref CONTAINER_ID: Regex = Regex::new(REGEX_CONTAINER_ID).unwrap();
}

/// Everything cnsenter needs to enter a container's network namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContainerRef {
    pub runtime: String,
    pub id: String,
}

impl ContainerRef {
    /// Parse a container-status identifier of the form `<runtime>://<id>`,
    /// e.g. `containerd://3f6e...` or `docker://abc`.
    pub fn parse(container_id: &str) -> Result<ContainerRef> {
        let caps = CONTAINER_ID.captures(container_id).ok_or_else(|| {
            Error::ContainerResolveError(format!("unparseable container id: {container_id}"))
        })?;
        Ok(ContainerRef {
            runtime: caps["runtime"].to_string(),
            id: caps["id"].to_string(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProbeMethod {
    Icmp,
    Connect,
}

#[derive(Debug, Clone, Serialize)]
pub enum ProbeOutcome {
    Ok { latency_ms: f64, method: ProbeMethod },
    Failed { cause: String },
}

impl ProbeOutcome {
    pub fn from_result(result: Result<f64>, method: ProbeMethod) -> ProbeOutcome {
        match result {
            Ok(latency_ms) => ProbeOutcome::Ok { latency_ms, method },
            Err(e) => ProbeOutcome::Failed {
                cause: e.to_string(),
            },
        }
    }
}

/// One active latency probe issued from inside a container's network
/// namespace. Implementations are stateless and never retry; both probes
/// block for at most their tool timeout (1s ping, 5s ncat).
#[allow(async_fn_in_trait)]
pub trait ProbeRunner {
    async fn icmp_probe(&self, source: &ContainerRef, target_ip: &str) -> Result<f64>;
    async fn connect_probe(&self, source: &ContainerRef, target_ip: &str, port: i32)
        -> Result<f64>;
}

/// Runs probes through the external cnsenter helper, which relays the probe
/// tool's stdout/stderr and exit status unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Cnsenter;

impl Cnsenter {
    async fn enter(&self, source: &ContainerRef, probe_cmd: &[&str]) -> Result<std::process::Output> {
        let output = Command::new(CNSENTER_BIN)
            .args(["-R", source.runtime.as_str(), "-c", source.id.as_str(), "-n", "--"])
            .args(probe_cmd)
            .output()
            .await?;
        if !output.status.success() {
            return Err(Error::ProbeExecError(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        Ok(output)
    }
}

impl ProbeRunner for Cnsenter {
    async fn icmp_probe(&self, source: &ContainerRef, target_ip: &str) -> Result<f64> {
        let output = self
            .enter(source, &["ping", "-w", "1", "-c", "1", target_ip])
            .await?;
        parse_ping_latency(&String::from_utf8_lossy(&output.stdout))
    }

    async fn connect_probe(
        &self,
        source: &ContainerRef,
        target_ip: &str,
        port: i32,
    ) -> Result<f64> {
        let port = port.to_string();
        let output = self
            .enter(source, &["ncat", "-w", "5", "-z", "-v", target_ip, &port])
            .await?;
        parse_ncat_latency(&String::from_utf8_lossy(&output.stderr))
    }
}

/// Extract the average round-trip time from ping stdout, which ends with
/// `round-trip min/avg/max = 0.025/0.025/0.025 ms`.
pub fn parse_ping_latency(stdout: &str) -> Result<f64> {
    let tokens: Vec<&str> = stdout.split('/').collect();
    if tokens.len() < 4 {
        return Err(Error::ProbeParseError(format!("ping output: {stdout}")));
    }
    tokens[3]
        .trim()
        .parse::<f64>()
        .map_err(|_| Error::ProbeParseError(format!("ping output: {stdout}")))
}

/// Extract the elapsed time from ncat stderr, which ends with
/// `Ncat: 0 bytes sent, 0 bytes received in 0.01 seconds.`, and convert it
/// to milliseconds.
pub fn parse_ncat_latency(stderr: &str) -> Result<f64> {
    let tokens: Vec<&str> = stderr.split_whitespace().collect();
    match tokens.as_slice() {
        [.., elapsed, marker] if marker.contains("seconds.") => elapsed
            .parse::<f64>()
            .map(|secs| secs * 1000.0)
            .map_err(|_| Error::ProbeParseError(format!("ncat output: {stderr}"))),
        _ => Err(Error::ProbeParseError(format!("ncat output: {stderr}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_container_ids() {
        let c = ContainerRef::parse("docker://abc").unwrap();
        assert_eq!(c.runtime, "docker");
        assert_eq!(c.id, "abc");

        let c = ContainerRef::parse("containerd://3f6e9af02d41").unwrap();
        assert_eq!(c.runtime, "containerd");
        assert_eq!(c.id, "3f6e9af02d41");

        assert!(ContainerRef::parse("3f6e9af02d41").is_err());
        assert!(ContainerRef::parse("containerd://").is_err());
        assert!(ContainerRef::parse("").is_err());
    }

    #[test]
    fn parses_ping_summary_line() {
        let out = "round-trip min/avg/max = 0.025/0.025/0.025 ms";
        assert_eq!(parse_ping_latency(out).unwrap(), 0.025);
    }

    #[test]
    fn parses_full_ping_output() {
        let out = "PING 10.1.1.2 (10.1.1.2): 56 data bytes\n\
                   64 bytes from 10.1.1.2: seq=0 ttl=64 time=0.025 ms\n\
                   \n\
                   --- 10.1.1.2 ping statistics ---\n\
                   1 packets transmitted, 1 packets received, 0% packet loss\n\
                   round-trip min/avg/max = 0.031/0.042/0.053 ms\n";
        assert_eq!(parse_ping_latency(out).unwrap(), 0.042);
    }

    #[test]
    fn rejects_short_or_garbled_ping_output() {
        assert!(parse_ping_latency("").is_err());
        assert!(parse_ping_latency("1 packets transmitted").is_err());
        assert!(parse_ping_latency("a/b/c = x/y/z ms").is_err());
    }

    #[test]
    fn parses_ncat_elapsed_time() {
        let err = "Ncat: Version 7.92 ( https://nmap.org/ncat )\n\
                   Ncat: Connected to 10.96.0.1:443.\n\
                   Ncat: 0 bytes sent, 0 bytes received in 0.01 seconds.";
        assert_eq!(parse_ncat_latency(err).unwrap(), 10.0);
    }

    #[test]
    fn rejects_ncat_output_without_marker() {
        assert!(parse_ncat_latency("").is_err());
        assert!(parse_ncat_latency("Ncat: Connection refused.").is_err());
        assert!(parse_ncat_latency("received in many seconds.").is_err());
    }
}
