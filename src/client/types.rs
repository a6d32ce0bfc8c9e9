//! Wire types for the consumed slice of the Linode API v4

use std::net::{Ipv4Addr, Ipv6Addr};

use serde::{Deserialize, Serialize};

/// Lifecycle status of a Linode instance
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceStatus {
    /// Booted and serving
    Running,
    /// Powered off
    Offline,
    /// Boot in progress
    Booting,
    /// Reboot in progress
    Rebooting,
    /// Shutdown in progress
    ShuttingDown,
    /// Initial provisioning
    Provisioning,
    /// Deletion in progress
    Deleting,
    /// Cross-region migration in progress
    Migrating,
    /// Rebuild from image in progress
    Rebuilding,
    /// Clone in progress
    Cloning,
    /// Restore from backup in progress
    Restoring,
    /// Status string this build does not know about
    #[serde(other)]
    Unknown,
}

impl InstanceStatus {
    /// An instance is shut down iff it is offline or on its way there.
    /// Every other status, including transient ones, counts as up.
    pub fn is_shut_down(self) -> bool {
        matches!(self, Self::Offline | Self::ShuttingDown)
    }
}

/// A compute instance as returned by `GET /linode/instances`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    /// Numeric ID, stable for the instance's lifetime
    pub id: i64,
    /// Human label, unique within the tenant but mutable
    pub label: String,
    /// Region slug (e.g. "us-ord")
    pub region: String,
    /// Instance type slug (e.g. "g6-standard-2")
    #[serde(rename = "type")]
    pub instance_type: String,
    /// Current lifecycle status
    pub status: InstanceStatus,
    /// IPv4 addresses on the instance, public and private
    #[serde(default)]
    pub ipv4: Vec<Ipv4Addr>,
    /// Primary IPv6, usually suffixed with `/128`
    #[serde(default)]
    pub ipv6: Option<String>,
}

/// A VPC as returned by `GET /vpcs`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Vpc {
    /// Numeric VPC ID
    pub id: i64,
    /// Human label, unique within the tenant
    pub label: String,
    /// Region slug the VPC lives in
    #[serde(default)]
    pub region: String,
}

/// A subnet scoped under a VPC
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VpcSubnet {
    /// Numeric subnet ID
    pub id: i64,
    /// Human label, unique within the VPC
    pub label: String,
    /// IPv4 CIDR of the subnet
    #[serde(default)]
    pub ipv4: Option<String>,
}

/// An IPv4 address assignment within a VPC
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VpcIp {
    /// Assigned address; absent for pure address-range rows
    #[serde(default)]
    pub address: Option<Ipv4Addr>,
    /// VPC the assignment belongs to
    pub vpc_id: i64,
    /// Subnet the assignment belongs to
    pub subnet_id: i64,
    /// Instance holding the address
    pub linode_id: i64,
}

/// An IPv6 SLAAC assignment within a VPC
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VpcIpv6 {
    /// VPC the assignment belongs to
    pub vpc_id: i64,
    /// Instance holding the addresses
    pub linode_id: i64,
    /// SLAAC addresses autoconfigured for the instance
    #[serde(default)]
    pub ipv6_addresses: Vec<VpcIpv6Slaac>,
    /// Whether the range is publicly routable
    #[serde(default)]
    pub is_public: bool,
}

/// A single SLAAC address within a [`VpcIpv6`] record
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VpcIpv6Slaac {
    /// The autoconfigured address
    pub slaac_address: Ipv6Addr,
}

/// Builder for Linode `X-Filter` expressions
///
/// The API filters listings via a JSON object passed in the `X-Filter`
/// header. Only simple equality filters are needed here.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Filter(serde_json::Map<String, serde_json::Value>);

impl Filter {
    /// Create an empty filter
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `field == value`
    pub fn eq(mut self, field: &str, value: impl Into<serde_json::Value>) -> Self {
        self.0.insert(field.to_string(), value.into());
        self
    }

    /// Render as the `X-Filter` header value
    pub fn to_header_value(&self) -> String {
        serde_json::Value::Object(self.0.clone()).to_string()
    }

    /// True when no conditions are set
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
