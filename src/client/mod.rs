//! Linode API client capability
//!
//! The resolution core consumes a narrow slice of the Linode API v4:
//! listing instances, listing and fetching VPCs, listing VPC IPv4/IPv6
//! addresses, and listing and fetching VPC subnets. [`LinodeApi`] is the
//! seam between the core and the provider; production wiring binds the
//! `reqwest`-based [`http::LinodeClient`], tests bind a recording mock.

pub mod http;
mod types;

#[cfg(test)]
pub(crate) mod mock;

use async_trait::async_trait;
use thiserror::Error;

pub use types::{
    Filter, Instance, InstanceStatus, Vpc, VpcIp, VpcIpv6, VpcIpv6Slaac, VpcSubnet,
};

/// Error returned by the Linode API client
///
/// Errors are classified by an HTTP-style numeric status where one is
/// available. Transport failures (DNS, TLS, connection reset) carry no
/// status and are never treated as a definitive "not found".
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApiError {
    /// The API answered with a non-success HTTP status
    #[error("status {status}: {message}")]
    Status {
        /// HTTP status code of the response
        status: u16,
        /// Error reason reported by the API
        message: String,
    },

    /// The request never produced an HTTP response
    #[error("transport: {0}")]
    Transport(String),
}

impl ApiError {
    /// Create a status-classified error
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            message: message.into(),
        }
    }

    /// Create a transport error with no HTTP status
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// The HTTP status code, if the API produced a response
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport(_) => None,
        }
    }

    /// True iff the API definitively reported the resource missing
    pub fn is_not_found(&self) -> bool {
        self.status_code() == Some(404)
    }
}

/// Capability surface the resolution core consumes from the Linode API
///
/// Every component depends only on this trait, never on the HTTP binding,
/// so test doubles can replace the provider wholesale. All listings
/// return fully materialised vectors; pagination is the binding's
/// concern.
#[async_trait]
pub trait LinodeApi: Send + Sync {
    /// List all instances visible to the tenant
    async fn list_instances(&self, filter: Option<&Filter>) -> Result<Vec<Instance>, ApiError>;

    /// List all VPCs visible to the tenant
    async fn list_vpcs(&self, filter: Option<&Filter>) -> Result<Vec<Vpc>, ApiError>;

    /// Fetch a single VPC by ID
    async fn get_vpc(&self, vpc_id: i64) -> Result<Vpc, ApiError>;

    /// List IPv4 addresses assigned within a VPC
    async fn list_vpc_ips(
        &self,
        vpc_id: i64,
        filter: Option<&Filter>,
    ) -> Result<Vec<VpcIp>, ApiError>;

    /// List IPv6 SLAAC assignments within a VPC
    async fn list_vpc_ipv6s(
        &self,
        vpc_id: i64,
        filter: Option<&Filter>,
    ) -> Result<Vec<VpcIpv6>, ApiError>;

    /// List subnets of a VPC
    async fn list_vpc_subnets(
        &self,
        vpc_id: i64,
        filter: Option<&Filter>,
    ) -> Result<Vec<VpcSubnet>, ApiError>;

    /// Fetch a single subnet of a VPC by ID
    async fn get_vpc_subnet(&self, vpc_id: i64, subnet_id: i64) -> Result<VpcSubnet, ApiError>;
}
