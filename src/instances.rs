//! Instance cache and node lookup facade
//!
//! Presents a consistent, TTL-bounded view of all instances relevant to
//! the cluster, each annotated with a typed, ordered address list, and
//! answers the orchestrator's existence, shutdown, and metadata queries
//! from it.
//!
//! # Concurrency
//!
//! The snapshot sits behind a single readers-writer lock. A refresh takes
//! the writer side and performs the TTL check inside the critical
//! section, so at most one refresh is in flight; late arrivals find a
//! fresh timestamp and return immediately. Readers take the shared side
//! strictly after the refresh returns. Cancelling an in-flight refresh
//! (dropping its future) leaves the snapshot and its timestamp untouched
//! because the map is only replaced after every await has completed.

use std::collections::{HashMap, HashSet};
use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::Arc;
use std::time::Instant;

use ipnet::Ipv4Net;
use k8s_openapi::api::core::v1::{Node, NodeAddress};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::client::{Instance, LinodeApi};
use crate::config::Options;
use crate::provider_id::{format_provider_id, is_linode_provider_id, parse_provider_id};
use crate::vpc::VpcCache;
use crate::{Error, Result};

/// Node address kind for the instance label
pub const ADDRESS_TYPE_HOSTNAME: &str = "Hostname";
/// Node address kind for private/VPC addresses
pub const ADDRESS_TYPE_INTERNAL_IP: &str = "InternalIP";
/// Node address kind for publicly routable addresses
pub const ADDRESS_TYPE_EXTERNAL_IP: &str = "ExternalIP";

/// A cached instance together with its typed address list
#[derive(Clone, Debug)]
pub struct CachedInstance {
    /// The provider's instance record as of the last refresh
    pub instance: Instance,
    /// Typed addresses in contract order (VPC IPv4, instance IPv4,
    /// VPC IPv6, instance IPv6)
    pub ips: Vec<NodeAddress>,
}

/// Metadata returned to the orchestrator for a resolved node
///
/// There is deliberately no zone field; the cluster-zone concept does not
/// apply to this provider.
#[derive(Clone, Debug, PartialEq)]
pub struct InstanceMetadata {
    /// Canonical `linode://<id>` identifier
    pub provider_id: String,
    /// Hostname first, then the typed addresses
    pub node_addresses: Vec<NodeAddress>,
    /// Instance type slug, copied verbatim
    pub instance_type: String,
    /// Region slug, copied verbatim
    pub region: String,
}

#[derive(Default)]
struct Snapshot {
    nodes: HashMap<i64, CachedInstance>,
    last_refresh: Option<Instant>,
}

/// TTL-bounded instance snapshot and the lookup facade over it
pub struct Instances {
    client: Arc<dyn LinodeApi>,
    vpc: Arc<VpcCache>,
    options: Options,
    cache: RwLock<Snapshot>,
}

impl Instances {
    /// Create a facade over the given client, shared VPC cache, and
    /// validated options
    pub fn new(client: Arc<dyn LinodeApi>, vpc: Arc<VpcCache>, options: Options) -> Self {
        Self {
            client,
            vpc,
            options,
            cache: RwLock::new(Snapshot::default()),
        }
    }

    /// True iff the node resolves to a cached instance
    pub async fn exists(&self, node: &Node) -> Result<bool> {
        match self.lookup_by_node(node).await {
            Ok(_) => Ok(true),
            Err(Error::InstanceNotFound) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// True iff the node's instance is offline or shutting down
    ///
    /// Every other status, including transient ones, counts as up.
    pub async fn shutdown(&self, node: &Node) -> Result<bool> {
        let cached = self.lookup_by_node(node).await?;
        Ok(cached.instance.status.is_shut_down())
    }

    /// Assemble the metadata the orchestrator records on the node
    pub async fn metadata(&self, node: &Node) -> Result<InstanceMetadata> {
        let cached = self.lookup_by_node(node).await?;
        let node_addresses = assemble_addresses(&cached, node)?;

        Ok(InstanceMetadata {
            provider_id: format_provider_id(cached.instance.id),
            node_addresses,
            instance_type: cached.instance.instance_type.clone(),
            region: cached.instance.region.clone(),
        })
    }

    /// Materialise a snapshot of all cached instance records
    pub async fn list_all(&self) -> Result<Vec<Instance>> {
        self.refresh().await?;
        let snapshot = self.cache.read().await;
        Ok(snapshot
            .nodes
            .values()
            .map(|cached| cached.instance.clone())
            .collect())
    }

    /// Resolve a node to its cached instance record
    ///
    /// Resolution priority: provider ID when it uses the Linode scheme
    /// (a malformed remainder is an error, a foreign scheme is not),
    /// then the node name against instance labels, then intersection of
    /// the node's observed addresses with instance public IPv4s.
    pub async fn lookup_by_node(&self, node: &Node) -> Result<CachedInstance> {
        self.refresh().await?;
        let snapshot = self.cache.read().await;
        resolve(&snapshot, node, self.options.linode_external_network.as_ref())
    }

    async fn refresh(&self) -> Result<()> {
        let mut snapshot = self.cache.write().await;
        if let Some(last) = snapshot.last_refresh {
            if last.elapsed() < self.options.instance_cache_ttl {
                return Ok(());
            }
        }

        let instances = self.client.list_instances(None).await?;

        // Per-VPC enrichment. A failing VPC contributes nothing but does
        // not abort the refresh; the other VPCs and the bare enumeration
        // still go through.
        let mut vpc_v4: HashMap<i64, Vec<Ipv4Addr>> = HashMap::new();
        let mut vpc_v6: HashMap<i64, Vec<(Ipv6Addr, bool)>> = HashMap::new();
        for name in &self.options.vpc_names {
            match self
                .vpc
                .vpc_ipv4_addresses(self.client.as_ref(), &self.options, name)
                .await
            {
                Ok(ips) => {
                    for ip in ips {
                        if let Some(address) = ip.address {
                            vpc_v4.entry(ip.linode_id).or_default().push(address);
                        }
                    }
                }
                Err(e) => {
                    warn!(vpc = %name, error = %e, "Skipping IPv4 enrichment for VPC")
                }
            }

            match self
                .vpc
                .vpc_ipv6_addresses(self.client.as_ref(), name)
                .await
            {
                Ok(records) => {
                    for record in records {
                        let entry = vpc_v6.entry(record.linode_id).or_default();
                        for slaac in record.ipv6_addresses {
                            entry.push((slaac.slaac_address, record.is_public));
                        }
                    }
                }
                Err(e) => {
                    warn!(vpc = %name, error = %e, "Skipping IPv6 enrichment for VPC")
                }
            }
        }

        let vpc_filtering = !self.options.vpc_names.is_empty();
        let mut nodes = HashMap::with_capacity(instances.len());
        for instance in instances {
            let v4 = vpc_v4.remove(&instance.id).unwrap_or_default();
            let v6 = vpc_v6.remove(&instance.id).unwrap_or_default();
            if vpc_filtering && v4.is_empty() && v6.is_empty() {
                continue;
            }

            let ips = typed_addresses(
                &instance,
                &v4,
                &v6,
                self.options.linode_external_network.as_ref(),
            );
            nodes.insert(instance.id, CachedInstance { instance, ips });
        }

        debug!(instances = nodes.len(), "Instance cache refreshed");
        snapshot.nodes = nodes;
        snapshot.last_refresh = Some(Instant::now());
        Ok(())
    }
}

fn resolve(
    snapshot: &Snapshot,
    node: &Node,
    external_network: Option<&Ipv4Net>,
) -> Result<CachedInstance> {
    let provider_id = node
        .spec
        .as_ref()
        .and_then(|spec| spec.provider_id.as_deref())
        .unwrap_or_default();
    if is_linode_provider_id(provider_id) {
        let id = parse_provider_id(provider_id)?;
        return snapshot
            .nodes
            .get(&id)
            .cloned()
            .ok_or(Error::InstanceNotFound);
    }

    // The orchestrator's node name is the instance label.
    if let Some(name) = node.metadata.name.as_deref() {
        if let Some(found) = snapshot
            .nodes
            .values()
            .find(|cached| cached.instance.label == name)
        {
            return Ok(found.clone());
        }
    }

    // Last resort: intersect the node's already-observed addresses with
    // instance public IPv4s.
    let observed: HashSet<Ipv4Addr> = node
        .status
        .as_ref()
        .and_then(|status| status.addresses.as_ref())
        .map(|addresses| {
            addresses
                .iter()
                .filter_map(|a| a.address.parse().ok())
                .collect()
        })
        .unwrap_or_default();
    if !observed.is_empty() {
        for cached in snapshot.nodes.values() {
            if cached
                .instance
                .ipv4
                .iter()
                .any(|ip| !is_private(ip, external_network) && observed.contains(ip))
            {
                return Ok(cached.clone());
            }
        }
    }

    Err(Error::InstanceNotFound)
}

/// Compute the typed address list for an instance
///
/// The ordering is load-bearing: downstream consumers take the first
/// ExternalIP as the node's external address, which must be an IPv4 when
/// one exists. VPC IPv4 addresses come first (in provider order), then
/// the instance's own IPv4s classified against the external-network
/// override, then VPC IPv6 SLAAC addresses, then the instance's IPv6
/// primary with a trailing `/128` stripped.
fn typed_addresses(
    instance: &Instance,
    vpc_v4: &[Ipv4Addr],
    vpc_v6: &[(Ipv6Addr, bool)],
    external_network: Option<&Ipv4Net>,
) -> Vec<NodeAddress> {
    let mut addresses = Vec::new();

    for addr in vpc_v4 {
        addresses.push(node_address(ADDRESS_TYPE_INTERNAL_IP, addr));
    }

    for addr in &instance.ipv4 {
        let kind = if is_private(addr, external_network) {
            ADDRESS_TYPE_INTERNAL_IP
        } else {
            ADDRESS_TYPE_EXTERNAL_IP
        };
        addresses.push(node_address(kind, addr));
    }

    for (addr, public) in vpc_v6 {
        let kind = if *public {
            ADDRESS_TYPE_EXTERNAL_IP
        } else {
            ADDRESS_TYPE_INTERNAL_IP
        };
        addresses.push(node_address(kind, addr));
    }

    if let Some(ipv6) = instance.ipv6.as_deref().filter(|s| !s.is_empty()) {
        let addr = ipv6.strip_suffix("/128").unwrap_or(ipv6);
        addresses.push(NodeAddress {
            address: addr.to_string(),
            type_: ADDRESS_TYPE_EXTERNAL_IP.to_string(),
        });
    }

    addresses
}

fn node_address(kind: &str, address: &impl std::fmt::Display) -> NodeAddress {
    NodeAddress {
        address: address.to_string(),
        type_: kind.to_string(),
    }
}

/// An IPv4 address is private iff it is RFC1918 and not inside the
/// configured external-network override.
fn is_private(addr: &Ipv4Addr, external_network: Option<&Ipv4Net>) -> bool {
    if let Some(network) = external_network {
        if network.contains(addr) {
            return false;
        }
    }
    addr.is_private()
}

/// Hostname first, then the typed addresses deduplicated by address
/// string (first occurrence wins for kind), then any InternalIP the
/// orchestrator had already recorded on the node that is not present yet.
fn assemble_addresses(cached: &CachedInstance, node: &Node) -> Result<Vec<NodeAddress>> {
    if cached.ips.is_empty() {
        return Err(Error::NoAddresses(cached.instance.id));
    }

    let mut addresses = vec![NodeAddress {
        address: cached.instance.label.clone(),
        type_: ADDRESS_TYPE_HOSTNAME.to_string(),
    }];
    let mut seen: HashSet<String> = addresses.iter().map(|a| a.address.clone()).collect();

    for address in &cached.ips {
        if seen.insert(address.address.clone()) {
            addresses.push(address.clone());
        }
    }

    if let Some(existing) = node.status.as_ref().and_then(|s| s.addresses.as_ref()) {
        for address in existing {
            if address.type_ == ADDRESS_TYPE_INTERNAL_IP && seen.insert(address.address.clone()) {
                addresses.push(address.clone());
            }
        }
    }

    Ok(addresses)
}
