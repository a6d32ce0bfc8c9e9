//! Production binding of [`LinodeApi`] over HTTP
//!
//! Speaks Linode API v4: bearer authentication, `X-Filter` headers for
//! filtered listings, and page-walking of the paginated list envelope.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::{ApiError, Filter, Instance, LinodeApi, Vpc, VpcIp, VpcIpv6, VpcSubnet};

/// Default base URL of the Linode API
pub const DEFAULT_API_URL: &str = "https://api.linode.com/v4";

const USER_AGENT: &str = concat!("linode-cloud-provider/", env!("CARGO_PKG_VERSION"));

/// `reqwest`-backed Linode API v4 client
pub struct LinodeClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

/// Paginated list envelope returned by every list endpoint
#[derive(Debug, Deserialize)]
struct Page<T> {
    data: Vec<T>,
    page: u64,
    pages: u64,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    errors: Vec<ErrorReason>,
}

#[derive(Debug, Deserialize)]
struct ErrorReason {
    #[serde(default)]
    reason: String,
}

impl LinodeClient {
    /// Create a client authenticated with the given personal access token
    pub fn new(token: impl Into<String>) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| ApiError::transport(e.to_string()))?;

        Ok(Self {
            http,
            base_url: DEFAULT_API_URL.to_string(),
            token: token.into(),
        })
    }

    /// Point the client at a different API root
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn get_one<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self
            .http
            .get(format!("{}{path}", self.base_url))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| ApiError::transport(e.to_string()))?;

        Self::decode(response).await
    }

    async fn get_paged<T: DeserializeOwned>(
        &self,
        path: &str,
        filter: Option<&Filter>,
    ) -> Result<Vec<T>, ApiError> {
        let mut items = Vec::new();
        let mut page = 1u64;

        loop {
            let mut request = self
                .http
                .get(format!("{}{path}", self.base_url))
                .bearer_auth(&self.token)
                .query(&[("page", page)]);

            if let Some(filter) = filter.filter(|f| !f.is_empty()) {
                request = request.header("X-Filter", filter.to_header_value());
            }

            let response = request
                .send()
                .await
                .map_err(|e| ApiError::transport(e.to_string()))?;
            let envelope: Page<T> = Self::decode(response).await?;

            items.extend(envelope.data);
            if envelope.page >= envelope.pages {
                break;
            }
            page = envelope.page + 1;
        }

        Ok(items)
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        let status = response.status();
        if !status.is_success() {
            // The API reports failures as {"errors": [{"reason": ...}]}.
            let message = match response.json::<ErrorEnvelope>().await {
                Ok(envelope) if !envelope.errors.is_empty() => envelope
                    .errors
                    .into_iter()
                    .map(|e| e.reason)
                    .collect::<Vec<_>>()
                    .join("; "),
                _ => status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string(),
            };
            return Err(ApiError::status(status.as_u16(), message));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::transport(e.to_string()))
    }
}

#[async_trait]
impl LinodeApi for LinodeClient {
    async fn list_instances(&self, filter: Option<&Filter>) -> Result<Vec<Instance>, ApiError> {
        self.get_paged("/linode/instances", filter).await
    }

    async fn list_vpcs(&self, filter: Option<&Filter>) -> Result<Vec<Vpc>, ApiError> {
        self.get_paged("/vpcs", filter).await
    }

    async fn get_vpc(&self, vpc_id: i64) -> Result<Vpc, ApiError> {
        self.get_one(&format!("/vpcs/{vpc_id}")).await
    }

    async fn list_vpc_ips(
        &self,
        vpc_id: i64,
        filter: Option<&Filter>,
    ) -> Result<Vec<VpcIp>, ApiError> {
        self.get_paged(&format!("/vpcs/{vpc_id}/ips"), filter).await
    }

    async fn list_vpc_ipv6s(
        &self,
        vpc_id: i64,
        filter: Option<&Filter>,
    ) -> Result<Vec<VpcIpv6>, ApiError> {
        self.get_paged(&format!("/vpcs/{vpc_id}/ipv6s"), filter)
            .await
    }

    async fn list_vpc_subnets(
        &self,
        vpc_id: i64,
        filter: Option<&Filter>,
    ) -> Result<Vec<VpcSubnet>, ApiError> {
        self.get_paged(&format!("/vpcs/{vpc_id}/subnets"), filter)
            .await
    }

    async fn get_vpc_subnet(&self, vpc_id: i64, subnet_id: i64) -> Result<VpcSubnet, ApiError> {
        self.get_one(&format!("/vpcs/{vpc_id}/subnets/{subnet_id}"))
            .await
    }
}
