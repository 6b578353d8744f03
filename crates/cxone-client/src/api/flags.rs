//! Feature flags API.

use std::collections::HashMap;

use crate::dispatch::{ApiRequest, Dispatcher, Surface};
use crate::error::Result;
use crate::types::FlagRecord;

/// Feature flags API client.
pub struct FlagsApi {
    dispatcher: Dispatcher,
}

impl FlagsApi {
    pub(crate) fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    /// List the tenant's flags.
    pub async fn list(&self, tenant_id: &str) -> Result<Vec<FlagRecord>> {
        let path = format!("/flags?filter={}", urlencoding::encode(tenant_id));
        self.dispatcher
            .send_json(ApiRequest::get(Surface::Api, path))
            .await
    }

    /// The tenant's flags keyed by name.
    pub async fn map(&self, tenant_id: &str) -> Result<HashMap<String, bool>> {
        let records = self.list(tenant_id).await?;
        Ok(records
            .into_iter()
            .map(|record| (record.name, record.status))
            .collect())
    }
}
