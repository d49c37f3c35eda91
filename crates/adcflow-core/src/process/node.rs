// ── Live-node reconciliation ──
//
// Pool members declared by address or FQDN can collide with nodes that
// already exist on the device. A member whose node already lives in
// /Common is rewritten to reference that node; one that collides with a
// node owned by another tenant, or with an address a DNS node resolved
// to, is a conflict. Nodes in the member's own tenant are left alone for
// the audit that runs after post-processing.
//
// Each tagged member list is scanned as a working copy and written back
// only when the whole list checks out, so a rejected list leaves the
// declaration untouched.

use std::collections::HashSet;

use serde_json::{Value, json};
use tracing::debug;

use crate::error::PostProcessError;
use crate::model::{Context, NodeList};
use crate::process::address::{MemberAddress, member_addresses, remove_address, server_names};
use crate::tag::{ErrorRecord, PostProcessTag, ProcessOutput, TagProcessor, TaggedItem};
use crate::value;

/// Properties an FQDN member loses when it is resolved to a device node.
const FQDN_PROPERTIES: [&str; 6] = [
    "addressDiscovery",
    "hostname",
    "addressFamily",
    "autoPopulate",
    "queryInterval",
    "downInterval",
];

/// Properties a static member loses when it is resolved to a device node.
const STATIC_PROPERTIES: [&str; 3] = ["addressDiscovery", "serverAddresses", "servers"];

/// Hostnames longer than this are shortened in remarks.
const REMARK_HOSTNAME_MAX: usize = 45;

/// Processor for the `node` tag.
#[derive(Debug, Clone, Copy)]
pub struct NodeProcessor {
    reconcile: bool,
}

impl Default for NodeProcessor {
    fn default() -> Self {
        Self { reconcile: true }
    }
}

impl NodeProcessor {
    /// `reconcile: false` keeps the duplicate checks but skips matching
    /// members against device nodes.
    pub fn new(reconcile: bool) -> Self {
        Self { reconcile }
    }

    fn process_item(
        self,
        ctx: &mut Context,
        declaration: &mut Value,
        item: &TaggedItem,
    ) -> Result<(), Vec<ErrorRecord>> {
        if !item.data.is_array() {
            return Ok(());
        }
        let Some(Value::Array(members)) = declaration.pointer(&item.instance_path).cloned() else {
            debug!(path = %item.instance_path, "tagged member list not found in declaration");
            return Ok(());
        };

        let segments = value::pointer_segments(&item.instance_path).unwrap_or_default();
        let tenant = item
            .tenant
            .clone()
            .or_else(|| segments.first().cloned())
            .unwrap_or_default();
        let default_route_domain = declaration
            .get(&tenant)
            .and_then(|t| t.get("defaultRouteDomain"))
            .and_then(Value::as_u64)
            .and_then(|rd| u32::try_from(rd).ok())
            .unwrap_or(0);

        let mut list = MemberList {
            path: &item.instance_path,
            tenant,
            default_route_domain,
            members,
        };

        let duplicates = list.duplicates();
        if !duplicates.is_empty() {
            return Err(duplicates);
        }

        let live = self.reconcile && declaration.get("scratch").is_none() && !ctx.nodes.is_empty();
        let scan = if live {
            list.scan(&ctx.nodes)
        } else {
            Scan::default()
        };
        if !scan.conflicts.is_empty() {
            return Err(scan.conflicts);
        }

        // ── Commit ──
        let references = list.discovery_references();
        if let Some(slot) = declaration.pointer_mut(&item.instance_path) {
            *slot = Value::Array(list.members);
        }
        for idx in scan.shared {
            ctx.nodes.mark_common(idx);
        }
        register_resources(declaration, item, &list.tenant, &segments, references);
        Ok(())
    }
}

impl TagProcessor for NodeProcessor {
    const TAG: PostProcessTag = PostProcessTag::Node;

    fn process(
        &self,
        ctx: &mut Context,
        declaration: &mut Value,
        items: Option<&[TaggedItem]>,
        _original: Option<&Value>,
    ) -> Result<Option<ProcessOutput>, PostProcessError> {
        let Some(items) = items else {
            return Ok(None);
        };

        let mut errors = Vec::new();
        for item in items {
            if let Err(found) = self.process_item(ctx, declaration, item) {
                debug!(path = %item.instance_path, count = found.len(), "member list rejected");
                errors.extend(found);
            }
        }

        if errors.is_empty() {
            Ok(Some(ProcessOutput::default()))
        } else {
            Err(PostProcessError::new(errors))
        }
    }
}

// ── Member list working copy ────────────────────────────────────────

enum Discovery {
    Static,
    Fqdn,
    Other,
}

fn discovery(member: &Value) -> Discovery {
    match member.get("addressDiscovery") {
        None => Discovery::Static,
        Some(Value::String(kind)) if kind == "static" => Discovery::Static,
        Some(Value::String(kind)) if kind == "fqdn" => Discovery::Fqdn,
        Some(_) => Discovery::Other,
    }
}

#[derive(Default)]
struct Scan {
    conflicts: Vec<ErrorRecord>,
    /// Node indices of shared Common nodes deferred to audit.
    shared: Vec<usize>,
}

struct MemberList<'a> {
    path: &'a str,
    tenant: String,
    default_route_domain: u32,
    members: Vec<Value>,
}

impl MemberList<'_> {
    fn member_path(&self, idx: usize) -> String {
        format!("{}/{idx}", self.path)
    }

    fn error(&self, idx: usize, message: String, params: Value) -> ErrorRecord {
        ErrorRecord::new(PostProcessTag::Node, self.member_path(idx), message).with_params(params)
    }

    fn implicit_route_domain(&self, member: &Value) -> u32 {
        member
            .get("routeDomain")
            .and_then(Value::as_u64)
            .and_then(|rd| u32::try_from(rd).ok())
            .unwrap_or(self.default_route_domain)
    }

    /// Every repeated route-domain-qualified address and server name.
    fn duplicates(&self) -> Vec<ErrorRecord> {
        let mut addresses = HashSet::new();
        let mut names = HashSet::new();
        let mut found = Vec::new();

        for (idx, member) in self.members.iter().enumerate() {
            let implicit = self.implicit_route_domain(member);
            for raw in member_addresses(member) {
                let qualified = MemberAddress::parse(&raw, implicit).qualified();
                if !addresses.insert(qualified.clone()) {
                    let message = format!(
                        "pool member {} has duplicate address {qualified}",
                        self.member_path(idx)
                    );
                    found.push(self.error(idx, message, json!({ "address": qualified })));
                }
            }
            for name in server_names(member) {
                if !names.insert(name.clone()) {
                    let message = format!(
                        "pool member {} has duplicate server name {name}",
                        self.member_path(idx)
                    );
                    found.push(self.error(idx, message, json!({ "serverName": name })));
                }
            }
        }
        found
    }

    /// Matches the members present before the scan against device nodes.
    /// Split-off members appended during the scan are not revisited.
    fn scan(&mut self, nodes: &NodeList) -> Scan {
        let mut scan = Scan::default();
        let original_len = self.members.len();
        for idx in 0..original_len {
            if self.members[idx].get("bigip").is_some() {
                continue;
            }
            match discovery(&self.members[idx]) {
                Discovery::Fqdn => self.scan_fqdn(nodes, idx, &mut scan),
                Discovery::Static => self.scan_static(nodes, idx, &mut scan),
                Discovery::Other => {}
            }
        }
        scan
    }

    fn scan_fqdn(&mut self, nodes: &NodeList, idx: usize, scan: &mut Scan) {
        let Some(hostname) = self.members[idx]
            .get("hostname")
            .and_then(Value::as_str)
            .map(str::to_owned)
        else {
            return;
        };
        let Some((pos, node)) = nodes.find(&hostname).and_then(|pos| Some((pos, nodes.get(pos)?)))
        else {
            return;
        };

        if node.partition == self.tenant {
            return;
        }
        if node.is_shared_common_reference() {
            scan.shared.push(pos);
            return;
        }
        if !node.is_common() {
            let message = format!(
                "{} fqdn hostname {hostname} conflicts with bigip fqdn node {}",
                self.member_path(idx),
                node.full_path
            );
            let params = json!({ "hostname": hostname, "node": node.full_path });
            scan.conflicts.push(self.error(idx, message, params));
            return;
        }

        let remark = format!("(replaces AS3 {})", remark_hostname(&hostname));
        debug!(member = %self.member_path(idx), node = %node.full_path, "fqdn member resolved to existing node");
        resolve(&mut self.members[idx], &FQDN_PROPERTIES, &node.full_path, remark);
    }

    fn scan_static(&mut self, nodes: &NodeList, idx: usize, scan: &mut Scan) {
        let member = &self.members[idx];
        let implicit = self.implicit_route_domain(member);
        let share_nodes = member
            .get("shareNodes")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let addresses = member_addresses(member);
        let mut remaining = addresses.len();

        for raw in addresses {
            let key = MemberAddress::parse(&raw, implicit).search_key();
            let Some((pos, node)) = nodes.find(&key).and_then(|pos| Some((pos, nodes.get(pos)?)))
            else {
                continue;
            };

            if node.partition == self.tenant {
                continue;
            }
            if node.is_common() && node.has_metadata() && !share_nodes {
                let message = format!(
                    "The node /{}/{key} conflicts with /Common/{key}",
                    self.tenant
                );
                let params = json!({ "address": key, "node": node.full_path });
                scan.conflicts.push(self.error(idx, message, params));
                continue;
            }
            if node.is_shared_common_reference() {
                scan.shared.push(pos);
                continue;
            }
            if node.ephemeral {
                let message = format!(
                    "{} static address {key} conflicts with the ephemeral address of bigip fqdn node {}",
                    self.member_path(idx),
                    node.full_path
                );
                let params = json!({ "address": key, "node": node.full_path });
                scan.conflicts.push(self.error(idx, message, params));
                continue;
            }
            if !node.is_common() {
                let message = format!(
                    "{} static address {key} conflicts with bigip node {}",
                    self.member_path(idx),
                    node.full_path
                );
                let params = json!({ "address": key, "node": node.full_path });
                scan.conflicts.push(self.error(idx, message, params));
                continue;
            }

            let remark = format!("(replaces AS3 {key})");
            debug!(member = %self.member_path(idx), node = %node.full_path, remaining, "static address resolved to existing node");
            if remaining == 1 {
                resolve(&mut self.members[idx], &STATIC_PROPERTIES, &node.full_path, remark);
                break;
            }
            let mut split = self.members[idx].clone();
            resolve(&mut split, &STATIC_PROPERTIES, &node.full_path, remark);
            self.members.push(split);
            remove_address(&mut self.members[idx], &raw);
            remaining -= 1;
        }
    }

    /// `(use target, member)` for members discovered through another object.
    fn discovery_references(&self) -> Vec<(String, Value)> {
        self.members
            .iter()
            .filter_map(|member| {
                let target = member.pointer("/addressDiscovery/use")?.as_str()?;
                Some((target.to_owned(), member.clone()))
            })
            .collect()
    }
}

/// Rewrites a member in place to reference an existing device node.
fn resolve(member: &mut Value, strip: &[&str], full_path: &str, remark: String) {
    if let Value::Object(map) = member {
        for property in strip {
            map.shift_remove(*property);
        }
        map.insert("bigip".into(), Value::String(full_path.to_owned()));
        map.insert("remark".into(), Value::String(remark));
    }
}

fn remark_hostname(hostname: &str) -> String {
    if hostname.chars().count() > REMARK_HOSTNAME_MAX {
        let mut short: String = hostname.chars().take(REMARK_HOSTNAME_MAX - 1).collect();
        short.push('~');
        short
    } else {
        hostname.to_owned()
    }
}

/// Records each discovery-backed member on the object its `use` names,
/// under that object's `resources` list.
fn register_resources(
    declaration: &mut Value,
    item: &TaggedItem,
    tenant: &str,
    segments: &[String],
    references: Vec<(String, Value)>,
) {
    let owner = item
        .instance_path
        .strip_suffix("/members")
        .unwrap_or(&item.instance_path);
    let application = segments.get(1).map_or("", String::as_str);

    for (target, member) in references {
        let pointer = if target.starts_with('/') {
            target
        } else {
            value::pointer_join([tenant, application, target.as_str()])
        };
        let Some(Value::Object(object)) = declaration.pointer_mut(&pointer) else {
            debug!(%pointer, "address discovery target not found");
            continue;
        };
        let resources = object
            .entry("resources")
            .or_insert_with(|| Value::Array(Vec::new()));
        if let Value::Array(list) = resources {
            list.push(json!({ "item": member, "path": owner }));
        }
    }
}
