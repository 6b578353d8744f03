//! Response types for the bootstrap endpoints.

use serde::{Deserialize, Serialize};

/// One feature flag from `GET /api/flags`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagRecord {
    pub name: String,
    pub status: bool,
}

/// Realm representation returned by the admin API for the tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantInfo {
    /// Internal tenant id.
    pub id: String,
    /// Realm (tenant) name.
    #[serde(default)]
    pub realm: String,
}

/// OAuth client registered in the tenant realm.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IamClient {
    /// Internal id.
    pub id: String,
    #[serde(rename = "clientId", default)]
    pub client_id: String,
}
