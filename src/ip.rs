use std::net::IpAddr;

use crate::{Error, Result};

pub fn is_valid_ip(addr: &str) -> bool {
    addr.parse::<IpAddr>().is_ok()
}

pub fn is_valid_port(port: i64) -> bool {
    (0..=65535).contains(&port)
}

/// Split an `ip/port` pair as found in OPT_CHECK_PODEX_CONN. The separator
/// is `/` so the value stays unambiguous for IPv6 addresses.
pub fn split_ip_port(ip_port: &str) -> Result<(String, i32)> {
    let (ip, port) = ip_port
        .split_once('/')
        .ok_or_else(|| Error::ConfigError(format!("wrong IP/port format: {ip_port}")))?;
    let port: i64 = port
        .parse()
        .map_err(|_| Error::ConfigError(format!("wrong port in: {ip_port}")))?;
    if !is_valid_ip(ip) || !is_valid_port(port) {
        return Err(Error::ConfigError(format!("wrong IP/port: {ip_port}")));
    }
    Ok((ip.to_string(), port as i32))
}

pub fn is_valid_ip_port(ip_port: &str) -> bool {
    split_ip_port(ip_port).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_and_invalid_ips() {
        assert!(is_valid_ip("127.0.0.1"));
        assert!(is_valid_ip("10.0.0.5"));
        assert!(is_valid_ip("::1"));
        assert!(!is_valid_ip("999.0.0.1"));
        assert!(!is_valid_ip("fffff::1"));
        assert!(!is_valid_ip(""));
    }

    #[test]
    fn valid_and_invalid_ports() {
        assert!(is_valid_port(80));
        assert!(is_valid_port(0));
        assert!(is_valid_port(65535));
        assert!(!is_valid_port(200000));
        assert!(!is_valid_port(-1));
    }

    #[test]
    fn splits_ip_port_pairs() {
        let (ip, port) = split_ip_port("10.0.0.5/80").unwrap();
        assert_eq!(ip, "10.0.0.5");
        assert_eq!(port, 80);

        assert!(split_ip_port("10.0.0.5/99999").is_err());
        assert!(split_ip_port("999.0.0.1/80").is_err());
        assert!(split_ip_port("10.0.0.5").is_err());
        assert!(split_ip_port("10.0.0.5/http").is_err());
    }

    #[test]
    fn validates_ip_port_strings() {
        assert!(is_valid_ip_port("10.0.0.5/80"));
        assert!(!is_valid_ip_port("10.0.0.5:80"));
    }
}
