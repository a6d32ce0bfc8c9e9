//! Error types for the resolution core

use thiserror::Error;

use crate::client::ApiError;

/// Main error type for instance and VPC resolution
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Provider ID did not match the `linode://<id>` grammar
    #[error("invalid provider ID {0:?}")]
    InvalidProviderId(String),

    /// No instance matched the node's provider ID, label, or addresses
    #[error("instance not found")]
    InstanceNotFound,

    /// The instance exists but its typed address list is empty
    #[error("instance {0} has no addresses")]
    NoAddresses(i64),

    /// No VPC with the given label is known to the provider
    #[error("VPC {0:?} not found")]
    VpcNotFound(String),

    /// No subnet with the given label exists under the resolved VPC
    #[error("subnet {0:?} not found")]
    SubnetNotFound(String),

    /// Linode API error, surfaced verbatim
    #[error("linode API error: {0}")]
    Api(#[from] ApiError),

    /// Configuration rejected at startup
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),
}

impl Error {
    /// Create an invalid-provider-ID error for the rejected value
    pub fn invalid_provider_id(value: impl Into<String>) -> Self {
        Self::InvalidProviderId(value.into())
    }

    /// Create a VPC-not-found error for the given label
    pub fn vpc_not_found(name: impl Into<String>) -> Self {
        Self::VpcNotFound(name.into())
    }

    /// Create a subnet-not-found error for the given label
    pub fn subnet_not_found(name: impl Into<String>) -> Self {
        Self::SubnetNotFound(name.into())
    }

    /// Create a configuration error with the given reason
    pub fn config_invalid(reason: impl Into<String>) -> Self {
        Self::ConfigInvalid(reason.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_rejected_provider_id() {
        let err = Error::invalid_provider_id("aws://i-abc123");
        assert!(err.to_string().contains("aws://i-abc123"));
    }

    #[test]
    fn display_names_the_missing_vpc() {
        let err = Error::vpc_not_found("prod-vpc");
        assert!(err.to_string().contains("prod-vpc"));
        match err {
            Error::VpcNotFound(name) => assert_eq!(name, "prod-vpc"),
            _ => panic!("expected VpcNotFound variant"),
        }
    }

    #[test]
    fn api_errors_convert_and_keep_status() {
        let err: Error = ApiError::status(404, "Not found").into();
        match err {
            Error::Api(api) => assert!(api.is_not_found()),
            _ => panic!("expected Api variant"),
        }
    }

    #[test]
    fn no_addresses_names_the_instance() {
        let err = Error::NoAddresses(123);
        assert!(err.to_string().contains("123"));
    }
}
