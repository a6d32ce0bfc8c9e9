//! VPC and subnet name-to-ID resolution cache
//!
//! Process-wide mapping tables resolving symbolic VPC and subnet labels
//! to provider IDs, shared by every instance-resolution call site.
//!
//! A cache entry means "at the last successful lookup this label mapped
//! to this ID"; absence does not imply nonexistence, and the cache is
//! never the source of truth for whether a label exists. Entries are
//! evicted only when a VPC-level listing answers 404 for the looked-up
//! label; transient failures and subnet-level 404s leave the cache
//! untouched.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use tracing::warn;

use crate::client::{LinodeApi, Vpc, VpcIp, VpcIpv6};
use crate::config::Options;
use crate::{Error, Result};

/// Locked name-to-ID mapping tables for VPCs and their subnets
#[derive(Debug, Default)]
pub struct VpcCache {
    vpc_ids: Mutex<HashMap<String, i64>>,
    subnet_ids: Mutex<HashMap<(i64, String), i64>>,
}

impl VpcCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached ID for a VPC label, if present
    pub fn vpc_id(&self, name: &str) -> Option<i64> {
        self.vpc_ids.lock().unwrap().get(name).copied()
    }

    /// Record a VPC label-to-ID mapping
    pub fn insert_vpc(&self, label: &str, id: i64) {
        self.vpc_ids.lock().unwrap().insert(label.to_string(), id);
    }

    /// Drop a VPC label from the cache
    ///
    /// Called when a VPC-level listing answers 404 for the label; the
    /// next resolution will consult the provider again.
    pub fn forget_vpc(&self, name: &str) {
        self.vpc_ids.lock().unwrap().remove(name);
    }

    /// Cached ID for a subnet label under a VPC, if present
    pub fn subnet_id(&self, vpc_id: i64, name: &str) -> Option<i64> {
        self.subnet_ids
            .lock()
            .unwrap()
            .get(&(vpc_id, name.to_string()))
            .copied()
    }

    /// Record a subnet label-to-ID mapping under its VPC
    pub fn insert_subnet(&self, vpc_id: i64, label: &str, id: i64) {
        self.subnet_ids
            .lock()
            .unwrap()
            .insert((vpc_id, label.to_string()), id);
    }

    /// Snapshot of all cached VPC IDs, sorted
    pub fn all_vpc_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self.vpc_ids.lock().unwrap().values().copied().collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// Resolve a VPC label to its ID
    ///
    /// Serves from the cache when possible. On a miss, lists all VPCs and
    /// caches every returned label so sibling lookups are free. Listing
    /// errors propagate verbatim.
    pub async fn resolve_vpc_id(&self, client: &dyn LinodeApi, name: &str) -> Result<i64> {
        if let Some(id) = self.vpc_id(name) {
            return Ok(id);
        }

        let vpcs = client.list_vpcs(None).await?;
        let mut resolved = None;
        for Vpc { id, label, .. } in &vpcs {
            self.insert_vpc(label, *id);
            if label == name {
                resolved = Some(*id);
            }
        }

        resolved.ok_or_else(|| Error::vpc_not_found(name))
    }

    /// Resolve a subnet label to its ID within a VPC
    pub async fn resolve_subnet_id(
        &self,
        client: &dyn LinodeApi,
        vpc_id: i64,
        name: &str,
    ) -> Result<i64> {
        if let Some(id) = self.subnet_id(vpc_id, name) {
            return Ok(id);
        }

        let subnets = client.list_vpc_subnets(vpc_id, None).await?;
        let mut resolved = None;
        for subnet in &subnets {
            self.insert_subnet(vpc_id, &subnet.label, subnet.id);
            if subnet.label == name {
                resolved = Some(subnet.id);
            }
        }

        resolved.ok_or_else(|| Error::subnet_not_found(name))
    }

    /// List the IPv4 addresses assigned within a named VPC
    ///
    /// A 404 from the IP listing means the previously resolved VPC is
    /// gone: the label is evicted and the error surfaces. Any other
    /// failure is transient and leaves the cache untouched. When subnet
    /// filtering is configured, returned IPs are restricted to subnets
    /// whose label is configured; subnet mappings discovered on the way
    /// are cached.
    pub async fn vpc_ipv4_addresses(
        &self,
        client: &dyn LinodeApi,
        options: &Options,
        name: &str,
    ) -> Result<Vec<VpcIp>> {
        let vpc_id = self.resolve_vpc_id(client, name).await?;

        let ips = match client.list_vpc_ips(vpc_id, None).await {
            Ok(ips) => ips,
            Err(e) if e.is_not_found() => {
                warn!(vpc = %name, "VPC disappeared, evicting from name cache");
                self.forget_vpc(name);
                return Err(e.into());
            }
            Err(e) => return Err(e.into()),
        };

        if options.subnet_names.is_empty() {
            return Ok(ips);
        }

        let subnets = client.list_vpc_subnets(vpc_id, None).await?;
        let mut allowed = HashSet::new();
        for subnet in &subnets {
            self.insert_subnet(vpc_id, &subnet.label, subnet.id);
            if options.subnet_names.iter().any(|n| n == &subnet.label) {
                allowed.insert(subnet.id);
            }
        }

        Ok(ips
            .into_iter()
            .filter(|ip| allowed.contains(&ip.subnet_id))
            .collect())
    }

    /// List the IPv6 SLAAC assignments within a named VPC
    ///
    /// Same eviction contract as [`Self::vpc_ipv4_addresses`].
    pub async fn vpc_ipv6_addresses(
        &self,
        client: &dyn LinodeApi,
        name: &str,
    ) -> Result<Vec<VpcIpv6>> {
        let vpc_id = self.resolve_vpc_id(client, name).await?;

        match client.list_vpc_ipv6s(vpc_id, None).await {
            Ok(ips) => Ok(ips),
            Err(e) if e.is_not_found() => {
                warn!(vpc = %name, "VPC disappeared, evicting from name cache");
                self.forget_vpc(name);
                Err(e.into())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Resolve the subnet backing NodeBalancer IPv4 backends
    ///
    /// Resolves the first configured VPC name and the configured backend
    /// subnet name to a subnet ID, returning the first error encountered.
    pub async fn node_balancer_backend_ipv4_subnet_id(
        &self,
        client: &dyn LinodeApi,
        options: &Options,
    ) -> Result<i64> {
        let vpc_name = options.vpc_names.first().ok_or_else(|| {
            Error::config_invalid("node-balancer backend subnet requires a configured VPC")
        })?;
        let subnet_name = options
            .node_balancer_backend_ipv4_subnet_name
            .as_deref()
            .ok_or_else(|| {
                Error::config_invalid("node-balancer-backend-ipv4-subnet-name is not configured")
            })?;

        let vpc_id = self.resolve_vpc_id(client, vpc_name).await?;
        self.resolve_subnet_id(client, vpc_id, subnet_name).await
    }
}
