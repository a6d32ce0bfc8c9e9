//! Instance and VPC resolution core for the Linode Kubernetes cloud provider
//!
//! For every `Node` the orchestrator asks about, this crate produces a
//! canonical provider identity, a typed list of node addresses, and a
//! shutdown/existence verdict, amortising Linode API calls behind
//! TTL-bounded in-memory caches.
//!
//! # Architecture
//!
//! - A narrow [`client::LinodeApi`] capability is the only way the core
//!   talks to the provider; production binds the `reqwest`-based
//!   [`client::http::LinodeClient`], tests bind a recording mock.
//! - [`vpc::VpcCache`] amortises symbolic VPC/subnet name resolution and
//!   implements the targeted 404 eviction protocol.
//! - [`instances::Instances`] holds the TTL-bounded instance snapshot and
//!   exposes the lookup facade the orchestrator calls.
//! - [`config::Options`] is validated once at startup; ID-based selectors
//!   are resolved eagerly and their labels synthesised into name-space so
//!   downstream code operates uniformly on names.
//!
//! # Modules
//!
//! - [`client`] - Linode API capability, wire types, and HTTP binding
//! - [`config`] - configuration surface, validation, and bootstrap resolver
//! - [`error`] - error types for the resolution core
//! - [`instances`] - instance cache and node lookup facade
//! - [`provider_id`] - canonical provider-ID formatting and parsing
//! - [`vpc`] - VPC/subnet name-to-ID cache

#![deny(missing_docs)]

pub mod client;
pub mod config;
pub mod error;
pub mod instances;
pub mod provider_id;
pub mod vpc;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;
