//! Tenant identity API (identity-provider admin surface).

use cxone_oauth::API_KEY_CLIENT_ID;

use crate::dispatch::{ApiRequest, Dispatcher, Surface};
use crate::error::{Error, Result};
use crate::types::{IamClient, TenantInfo};

/// Tenant identity API client.
pub struct TenantApi {
    dispatcher: Dispatcher,
}

impl TenantApi {
    pub(crate) fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    /// Get the tenant realm.
    pub async fn info(&self) -> Result<TenantInfo> {
        self.dispatcher
            .send_json(ApiRequest::get(Surface::realm_admin(), ""))
            .await
    }

    /// Internal tenant id.
    pub async fn id(&self) -> Result<String> {
        Ok(self.info().await?.id)
    }

    /// Find realm clients by client id.
    pub async fn clients(&self, client_id: &str) -> Result<Vec<IamClient>> {
        let path = format!(
            "/clients?first=0&max=1&clientId={}",
            urlencoding::encode(client_id)
        );
        self.dispatcher
            .send_json(ApiRequest::get(Surface::realm_admin(), path))
            .await
    }

    /// Internal id of the platform application client.
    pub async fn app_id(&self) -> Result<String> {
        self.clients(API_KEY_CLIENT_ID)
            .await?
            .into_iter()
            .next()
            .map(|client| client.id)
            .ok_or_else(|| Error::NotFound(format!("client '{}'", API_KEY_CLIENT_ID)))
    }
}
