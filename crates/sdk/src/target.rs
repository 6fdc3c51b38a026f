//! Connection target resolution.
//!
//! A client is pointed at the server in exactly one of three ways, checked in
//! this order:
//! 1. An explicit target string (`dns:///events.internal:5005`, `ipv4:10.0.0.1:5005`),
//!    used verbatim.
//! 2. A comma-separated host list, each host combined with the shared port.
//! 3. A single `host:port`.
//!
//! The resolved destination is kept as a string; [`ConnectionTarget::endpoint_uris`]
//! turns it into the `http://` URIs tonic endpoints are built from.

use std::{fmt, str::FromStr};

use snafu::ensure;

use crate::error::{ConfigSnafu, Result, SdkError};

/// Separator between hosts in a manual multi-endpoint address list.
const HOST_SEPARATOR: char = ',';

/// Channel load-balancing policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum LoadBalancingPolicy {
    /// Spread calls across all endpoints.
    #[default]
    RoundRobin,
    /// Use the first endpoint that accepts a connection.
    PickFirst,
}

impl LoadBalancingPolicy {
    /// Returns the policy identifier (`round_robin` or `pick_first`).
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RoundRobin => "round_robin",
            Self::PickFirst => "pick_first",
        }
    }
}

impl fmt::Display for LoadBalancingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LoadBalancingPolicy {
    type Err = SdkError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "round_robin" => Ok(Self::RoundRobin),
            "pick_first" => Ok(Self::PickFirst),
            _ => ConfigSnafu {
                message: format!(
                    "load balancing policy must be either \"round_robin\" or \"pick_first\", \
                     got \"{s}\""
                ),
            }
            .fail(),
        }
    }
}

/// Resolved destination plus the policy used to spread calls over it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionTarget {
    destination: String,
    policy: LoadBalancingPolicy,
}

impl ConnectionTarget {
    /// Resolves a destination from mutually exclusive inputs.
    ///
    /// # Errors
    ///
    /// Returns [`SdkError::Config`] if:
    /// - Neither `host` nor `target` is given
    /// - `port` is outside `1..=65535`
    /// - `host` is given without `target` and `port` is missing
    /// - The host list contains an empty entry
    pub fn resolve(
        host: Option<&str>,
        port: Option<u32>,
        target: Option<&str>,
        policy: LoadBalancingPolicy,
    ) -> Result<Self> {
        let target = target.map(str::trim).filter(|t| !t.is_empty());
        let host = host.map(str::trim).filter(|h| !h.is_empty());

        if let Some(port) = port {
            ensure!(
                (1..=65535).contains(&port),
                ConfigSnafu { message: format!("port must be between 1 and 65535, got {port}") }
            );
        }

        let destination = match (target, host) {
            (Some(target), _) => target.to_owned(),
            (None, Some(host)) => {
                let port = port.ok_or_else(|| {
                    ConfigSnafu { message: "port must be provided when using host without target" }
                        .build()
                })?;
                join_hosts(host, port)?
            },
            (None, None) => {
                return ConfigSnafu { message: "either host or target must be provided" }.fail();
            },
        };

        Ok(Self { destination, policy })
    }

    /// Returns the resolved destination string.
    #[must_use]
    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// Returns the load-balancing policy.
    #[must_use]
    pub fn policy(&self) -> LoadBalancingPolicy {
        self.policy
    }

    /// Returns one `http://host:port` URI per destination entry.
    ///
    /// Resolver schemes (`dns:`, `ipv4:`, `ipv6:`) are dropped; entries that already
    /// carry a URL scheme are kept as they are.
    #[must_use]
    pub fn endpoint_uris(&self) -> Vec<String> {
        self.destination
            .split(HOST_SEPARATOR)
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(|entry| {
                let address = strip_resolver_scheme(entry);
                if address.contains("://") {
                    address.to_owned()
                } else {
                    format!("http://{address}")
                }
            })
            .collect()
    }
}

impl fmt::Display for ConnectionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.destination, self.policy)
    }
}

/// Combines each host of a (possibly comma-separated) host list with `port`.
fn join_hosts(host: &str, port: u32) -> Result<String> {
    if !host.contains(HOST_SEPARATOR) {
        return Ok(format!("{host}:{port}"));
    }

    let hosts: Vec<&str> = host.split(HOST_SEPARATOR).map(str::trim).collect();
    ensure!(
        hosts.iter().all(|h| !h.is_empty()),
        ConfigSnafu { message: format!("host list '{host}' contains an empty entry") }
    );
    Ok(hosts.iter().map(|h| format!("{h}:{port}")).collect::<Vec<_>>().join(","))
}

/// Removes a gRPC name-resolver prefix from a target entry.
fn strip_resolver_scheme(entry: &str) -> &str {
    if let Some(rest) = entry.strip_prefix("dns:") {
        // dns:[//authority/]host[:port]
        return match rest.strip_prefix("//") {
            Some(after) => after.split_once('/').map_or(after, |(_, host)| host),
            None => rest,
        };
    }
    entry.strip_prefix("ipv4:").or_else(|| entry.strip_prefix("ipv6:")).unwrap_or(entry)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, clippy::disallowed_methods)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn resolve(
        host: Option<&str>,
        port: Option<u32>,
        target: Option<&str>,
    ) -> Result<ConnectionTarget> {
        ConnectionTarget::resolve(host, port, target, LoadBalancingPolicy::RoundRobin)
    }

    #[test]
    fn test_single_host() {
        let target = resolve(Some("localhost"), Some(5005), None).unwrap();
        assert_eq!(target.destination(), "localhost:5005");
        assert_eq!(target.endpoint_uris(), vec!["http://localhost:5005"]);
    }

    #[test]
    fn test_host_list() {
        let target = resolve(Some("node1, node2 ,node3"), Some(5005), None).unwrap();
        assert_eq!(target.destination(), "node1:5005,node2:5005,node3:5005");
        assert_eq!(target.endpoint_uris().len(), 3);
        assert_eq!(target.endpoint_uris()[1], "http://node2:5005");
    }

    #[test]
    fn test_target_wins_over_host() {
        let target =
            resolve(Some("ignored"), Some(1), Some("dns:///events.internal:5005")).unwrap();
        assert_eq!(target.destination(), "dns:///events.internal:5005");
        assert_eq!(target.endpoint_uris(), vec!["http://events.internal:5005"]);
    }

    #[test]
    fn test_target_without_port() {
        assert!(resolve(None, None, Some("ipv4:10.0.0.10:5005")).is_ok());
    }

    #[test]
    fn test_missing_host_and_target() {
        let err = resolve(None, Some(5005), None).unwrap_err();
        assert!(err.to_string().contains("either host or target"));

        let err = resolve(Some("  "), Some(5005), Some("")).unwrap_err();
        assert!(matches!(err, SdkError::Config { .. }));
    }

    #[test]
    fn test_host_without_port() {
        let err = resolve(Some("localhost"), None, None).unwrap_err();
        assert!(err.to_string().contains("port must be provided"));
    }

    #[test]
    fn test_empty_host_entry() {
        let err = resolve(Some("a,,b"), Some(5005), None).unwrap_err();
        assert!(err.to_string().contains("empty entry"));
    }

    #[test]
    fn test_resolver_schemes_stripped() {
        assert_eq!(strip_resolver_scheme("dns:///h:1"), "h:1");
        assert_eq!(strip_resolver_scheme("dns://8.8.8.8/h:1"), "h:1");
        assert_eq!(strip_resolver_scheme("dns:h:1"), "h:1");
        assert_eq!(strip_resolver_scheme("ipv4:10.0.0.1:1"), "10.0.0.1:1");
        assert_eq!(strip_resolver_scheme("ipv6:[::1]:1"), "[::1]:1");
        assert_eq!(strip_resolver_scheme("h:1"), "h:1");
    }

    #[test]
    fn test_url_scheme_kept() {
        let target = resolve(None, None, Some("https://events.example.com:443")).unwrap();
        assert_eq!(target.endpoint_uris(), vec!["https://events.example.com:443"]);
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!(
            "round_robin".parse::<LoadBalancingPolicy>().unwrap(),
            LoadBalancingPolicy::RoundRobin
        );
        assert_eq!(
            "pick_first".parse::<LoadBalancingPolicy>().unwrap(),
            LoadBalancingPolicy::PickFirst
        );
        let err = "random".parse::<LoadBalancingPolicy>().unwrap_err();
        assert!(err.to_string().contains("round_robin"));
        assert_eq!(LoadBalancingPolicy::default().as_str(), "round_robin");
    }

    proptest! {
        #[test]
        fn prop_ports_in_range_resolve(port in 1u32..=65535) {
            let target = resolve(Some("localhost"), Some(port), None).unwrap();
            prop_assert_eq!(target.destination(), format!("localhost:{port}"));
        }

        #[test]
        fn prop_ports_out_of_range_fail(port in prop_oneof![Just(0u32), 65536u32..=u32::MAX]) {
            let err = resolve(Some("localhost"), Some(port), None).unwrap_err();
            let is_config = matches!(err, SdkError::Config { .. });
            prop_assert!(is_config, "expected a config error, got {:?}", err);
        }
    }
}
