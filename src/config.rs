//! Configuration surface, flag validation, and bootstrap resolver
//!
//! [`Options`] is initialised once at startup and consumed read-only by
//! every other component. VPC/subnet selectors may be given as names or
//! IDs, never both; [`resolve_configured_ids`] turns ID-based selectors
//! into name-space eagerly so downstream code operates uniformly on
//! names, and refuses to start on any provider error.

use std::time::Duration;

use ipnet::Ipv4Net;
use tracing::info;

use crate::client::LinodeApi;
use crate::vpc::VpcCache;
use crate::{Error, Result};

/// Instance cache TTL used when the environment does not override it
pub const DEFAULT_INSTANCE_CACHE_TTL: Duration = Duration::from_secs(15);

/// Environment variable overriding the instance cache TTL, in seconds
pub const INSTANCE_CACHE_TTL_ENV: &str = "LINODE_INSTANCE_CACHE_TTL";

/// Runtime configuration for the resolution core
#[derive(Clone, Debug)]
pub struct Options {
    /// VPCs selected by label; mutually exclusive with `vpc_ids`.
    /// Empty means no VPC filtering.
    pub vpc_names: Vec<String>,
    /// VPCs selected by ID; mutually exclusive with `vpc_names`
    pub vpc_ids: Vec<i64>,
    /// Subnets selected by label; only meaningful with `vpc_names`
    pub subnet_names: Vec<String>,
    /// Subnets selected by ID; only meaningful with `vpc_ids`
    pub subnet_ids: Vec<i64>,
    /// Subnet whose ID is materialised on demand for the NodeBalancer
    /// backend
    pub node_balancer_backend_ipv4_subnet_name: Option<String>,
    /// CIDR treated as external even where RFC1918 would say private
    pub linode_external_network: Option<Ipv4Net>,
    /// Maximum age of the instance snapshot before a refresh
    pub instance_cache_ttl: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            vpc_names: Vec::new(),
            vpc_ids: Vec::new(),
            subnet_names: Vec::new(),
            subnet_ids: Vec::new(),
            node_balancer_backend_ipv4_subnet_name: None,
            linode_external_network: None,
            instance_cache_ttl: DEFAULT_INSTANCE_CACHE_TTL,
        }
    }
}

impl Options {
    /// Validate the VPC/subnet selector flags
    ///
    /// Violations are fatal; the process must refuse to start rather than
    /// run with partial configuration.
    pub fn validate(&self) -> Result<()> {
        if !self.vpc_names.is_empty() && !self.vpc_ids.is_empty() {
            return Err(Error::config_invalid(
                "vpc-names and vpc-ids are mutually exclusive",
            ));
        }
        if !self.subnet_names.is_empty() && !self.subnet_ids.is_empty() {
            return Err(Error::config_invalid(
                "subnet-names and subnet-ids are mutually exclusive",
            ));
        }
        if !self.subnet_names.is_empty() && self.vpc_names.is_empty() {
            return Err(Error::config_invalid(
                "subnet-names can only be used together with vpc-names",
            ));
        }
        if !self.subnet_ids.is_empty() && self.vpc_ids.is_empty() {
            return Err(Error::config_invalid(
                "subnet-ids can only be used together with vpc-ids",
            ));
        }
        if !self.vpc_ids.is_empty() && self.subnet_ids.is_empty() {
            return Err(Error::config_invalid(
                "vpc-ids requires subnet-ids to be set",
            ));
        }
        Ok(())
    }
}

/// Read the instance cache TTL from the environment
///
/// `LINODE_INSTANCE_CACHE_TTL` must be a positive integer number of
/// seconds; absence means [`DEFAULT_INSTANCE_CACHE_TTL`].
pub fn instance_cache_ttl_from_env() -> Result<Duration> {
    parse_instance_cache_ttl(std::env::var(INSTANCE_CACHE_TTL_ENV).ok().as_deref())
}

fn parse_instance_cache_ttl(raw: Option<&str>) -> Result<Duration> {
    let Some(raw) = raw else {
        return Ok(DEFAULT_INSTANCE_CACHE_TTL);
    };

    let secs: u64 = raw.trim().parse().map_err(|_| {
        Error::config_invalid(format!(
            "{INSTANCE_CACHE_TTL_ENV} must be a positive integer number of seconds, got {raw:?}"
        ))
    })?;
    if secs == 0 {
        return Err(Error::config_invalid(format!(
            "{INSTANCE_CACHE_TTL_ENV} must be greater than zero"
        )));
    }

    Ok(Duration::from_secs(secs))
}

/// One-shot bootstrap: validate the flags and resolve ID-based selectors
///
/// When VPCs are selected by ID, every configured VPC and subnet ID is
/// fetched from the provider, the name caches are pre-populated with the
/// returned labels, and equivalent name lists are synthesised onto
/// `options`. Any provider error aborts startup. Name-based selection
/// makes no provider call here; resolution is lazy.
pub async fn resolve_configured_ids(
    options: &mut Options,
    client: &dyn LinodeApi,
    cache: &VpcCache,
) -> Result<()> {
    options.validate()?;

    if options.vpc_ids.is_empty() {
        return Ok(());
    }

    for &vpc_id in &options.vpc_ids {
        let vpc = client.get_vpc(vpc_id).await?;
        cache.insert_vpc(&vpc.label, vpc.id);
        options.vpc_names.push(vpc.label);
    }

    // Subnet IDs are resolved against the first configured VPC.
    let primary_vpc = options.vpc_ids[0];
    for &subnet_id in &options.subnet_ids {
        let subnet = client.get_vpc_subnet(primary_vpc, subnet_id).await?;
        cache.insert_subnet(primary_vpc, &subnet.label, subnet.id);
        options.subnet_names.push(subnet.label);
    }

    info!(
        vpcs = options.vpc_names.len(),
        subnets = options.subnet_names.len(),
        "Resolved configured VPC and subnet IDs to names"
    );
    Ok(())
}
