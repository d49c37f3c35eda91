// ── Pool member addresses ──
//
// Addresses are written as `ip` or `ip%rd`. One without a suffix lives in
// the member's `routeDomain`, else the tenant's `defaultRouteDomain`,
// else route domain 0. Device node keys drop a `%0` suffix, so searching
// uses the short form for route domain 0.

use std::net::IpAddr;

use serde_json::Value;

/// A declared member address, split and normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MemberAddress {
    /// Minimized IP text, or the host part verbatim when it is not an IP.
    pub ip: String,
    pub route_domain: u32,
}

impl MemberAddress {
    pub fn parse(raw: &str, implicit_route_domain: u32) -> Self {
        let (host, route_domain) = match raw.split_once('%') {
            Some((host, suffix)) => match suffix.parse() {
                Ok(rd) => (host, rd),
                Err(_) => (raw, implicit_route_domain),
            },
            None => (raw, implicit_route_domain),
        };
        let ip = host
            .parse::<IpAddr>()
            .map_or_else(|_| host.to_owned(), |ip| ip.to_string());
        Self { ip, route_domain }
    }

    /// `ip%rd`, always carrying the route domain.
    pub fn qualified(&self) -> String {
        format!("{}%{}", self.ip, self.route_domain)
    }

    /// The form device node keys use.
    pub fn search_key(&self) -> String {
        if self.route_domain == 0 {
            self.ip.clone()
        } else {
            self.qualified()
        }
    }
}

/// `serverAddresses` followed by each `servers[].address`.
pub(crate) fn member_addresses(member: &Value) -> Vec<String> {
    let listed = member
        .get("serverAddresses")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str);
    let servers = member
        .get("servers")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|server| server.get("address").and_then(Value::as_str));
    listed.chain(servers).map(str::to_owned).collect()
}

pub(crate) fn server_names(member: &Value) -> Vec<String> {
    member
        .get("servers")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|server| server.get("name").and_then(Value::as_str))
        .map(str::to_owned)
        .collect()
}

/// Drops the first occurrence of `raw` from `serverAddresses`, or failing
/// that the first `servers` entry with that address.
pub(crate) fn remove_address(member: &mut Value, raw: &str) {
    if let Some(list) = member.get_mut("serverAddresses").and_then(Value::as_array_mut) {
        if let Some(pos) = list.iter().position(|a| a.as_str() == Some(raw)) {
            list.remove(pos);
            return;
        }
    }
    if let Some(list) = member.get_mut("servers").and_then(Value::as_array_mut) {
        if let Some(pos) = list
            .iter()
            .position(|s| s.get("address").and_then(Value::as_str) == Some(raw))
        {
            list.remove(pos);
        }
    }
}
