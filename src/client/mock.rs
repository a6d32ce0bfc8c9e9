//! Recording test double for [`LinodeApi`]
//!
//! Configured builder-style with canned data and injectable failures.
//! Records per-method call counts so tests can assert on provider-call
//! amortisation.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{ApiError, Filter, Instance, LinodeApi, Vpc, VpcIp, VpcIpv6, VpcSubnet};

/// Configurable in-memory [`LinodeApi`] implementation
#[derive(Default)]
pub(crate) struct MockLinodeApi {
    instances: Mutex<Vec<Instance>>,
    vpcs: Mutex<Vec<Vpc>>,
    subnets: Mutex<HashMap<i64, Vec<VpcSubnet>>>,
    vpc_ips: Mutex<HashMap<i64, Vec<VpcIp>>>,
    vpc_ipv6s: Mutex<HashMap<i64, Vec<VpcIpv6>>>,
    failures: Mutex<HashMap<&'static str, ApiError>>,
    calls: Mutex<HashMap<&'static str, u32>>,
}

impl MockLinodeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_instances(self, instances: Vec<Instance>) -> Self {
        *self.instances.lock().unwrap() = instances;
        self
    }

    pub fn with_vpcs(self, vpcs: Vec<Vpc>) -> Self {
        *self.vpcs.lock().unwrap() = vpcs;
        self
    }

    pub fn with_subnets(self, vpc_id: i64, subnets: Vec<VpcSubnet>) -> Self {
        self.subnets.lock().unwrap().insert(vpc_id, subnets);
        self
    }

    pub fn with_vpc_ips(self, vpc_id: i64, ips: Vec<VpcIp>) -> Self {
        self.vpc_ips.lock().unwrap().insert(vpc_id, ips);
        self
    }

    pub fn with_vpc_ipv6s(self, vpc_id: i64, ips: Vec<VpcIpv6>) -> Self {
        self.vpc_ipv6s.lock().unwrap().insert(vpc_id, ips);
        self
    }

    /// Make the named method fail with the given error on every call
    pub fn fail_with(self, method: &'static str, err: ApiError) -> Self {
        self.failures.lock().unwrap().insert(method, err);
        self
    }

    /// Replace the instance listing after construction
    pub fn set_instances(&self, instances: Vec<Instance>) {
        *self.instances.lock().unwrap() = instances;
    }

    /// Inject a failure after construction
    pub fn inject_failure(&self, method: &'static str, err: ApiError) {
        self.failures.lock().unwrap().insert(method, err);
    }

    /// Number of times the named method has been called
    pub fn calls(&self, method: &str) -> u32 {
        self.calls.lock().unwrap().get(method).copied().unwrap_or(0)
    }

    fn enter(&self, method: &'static str) -> Result<(), ApiError> {
        *self.calls.lock().unwrap().entry(method).or_insert(0) += 1;
        if let Some(err) = self.failures.lock().unwrap().get(method) {
            return Err(err.clone());
        }
        Ok(())
    }
}

#[async_trait]
impl LinodeApi for MockLinodeApi {
    async fn list_instances(&self, _filter: Option<&Filter>) -> Result<Vec<Instance>, ApiError> {
        self.enter("list_instances")?;
        Ok(self.instances.lock().unwrap().clone())
    }

    async fn list_vpcs(&self, _filter: Option<&Filter>) -> Result<Vec<Vpc>, ApiError> {
        self.enter("list_vpcs")?;
        Ok(self.vpcs.lock().unwrap().clone())
    }

    async fn get_vpc(&self, vpc_id: i64) -> Result<Vpc, ApiError> {
        self.enter("get_vpc")?;
        self.vpcs
            .lock()
            .unwrap()
            .iter()
            .find(|vpc| vpc.id == vpc_id)
            .cloned()
            .ok_or_else(|| ApiError::status(404, "Not found"))
    }

    async fn list_vpc_ips(
        &self,
        vpc_id: i64,
        _filter: Option<&Filter>,
    ) -> Result<Vec<VpcIp>, ApiError> {
        self.enter("list_vpc_ips")?;
        Ok(self
            .vpc_ips
            .lock()
            .unwrap()
            .get(&vpc_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_vpc_ipv6s(
        &self,
        vpc_id: i64,
        _filter: Option<&Filter>,
    ) -> Result<Vec<VpcIpv6>, ApiError> {
        self.enter("list_vpc_ipv6s")?;
        Ok(self
            .vpc_ipv6s
            .lock()
            .unwrap()
            .get(&vpc_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_vpc_subnets(
        &self,
        vpc_id: i64,
        _filter: Option<&Filter>,
    ) -> Result<Vec<VpcSubnet>, ApiError> {
        self.enter("list_vpc_subnets")?;
        Ok(self
            .subnets
            .lock()
            .unwrap()
            .get(&vpc_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_vpc_subnet(&self, vpc_id: i64, subnet_id: i64) -> Result<VpcSubnet, ApiError> {
        self.enter("get_vpc_subnet")?;
        self.subnets
            .lock()
            .unwrap()
            .get(&vpc_id)
            .and_then(|subnets| subnets.iter().find(|s| s.id == subnet_id))
            .cloned()
            .ok_or_else(|| ApiError::status(404, "Not found"))
    }
}
