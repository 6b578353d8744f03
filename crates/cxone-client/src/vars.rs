//! Polling limits for long-running backend operations.

use serde::{Deserialize, Serialize};

/// Maximum wait and poll interval, in seconds, per long-running operation.
///
/// A max of `0` means wait indefinitely. Intervals are not checked against
/// their max.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ClientVars {
    pub migration_polling_max_seconds: u64,
    pub migration_polling_delay_seconds: u64,
    pub audit_engine_polling_max_seconds: u64,
    pub audit_engine_polling_delay_seconds: u64,
    pub audit_scan_polling_max_seconds: u64,
    pub audit_scan_polling_delay_seconds: u64,
    pub audit_language_polling_max_seconds: u64,
    pub audit_language_polling_delay_seconds: u64,
    pub audit_compile_polling_max_seconds: u64,
    pub audit_compile_polling_delay_seconds: u64,
    pub scan_polling_max_seconds: u64,
    pub scan_polling_delay_seconds: u64,
    pub project_application_link_polling_max_seconds: u64,
    pub project_application_link_polling_delay_seconds: u64,
}

impl Default for ClientVars {
    fn default() -> Self {
        Self {
            migration_polling_max_seconds: 300,
            migration_polling_delay_seconds: 15,
            audit_engine_polling_max_seconds: 300,
            audit_engine_polling_delay_seconds: 15,
            audit_scan_polling_max_seconds: 600,
            audit_scan_polling_delay_seconds: 15,
            audit_language_polling_max_seconds: 300,
            audit_language_polling_delay_seconds: 15,
            audit_compile_polling_max_seconds: 600,
            audit_compile_polling_delay_seconds: 15,
            scan_polling_max_seconds: 0,
            scan_polling_delay_seconds: 15,
            project_application_link_polling_max_seconds: 300,
            project_application_link_polling_delay_seconds: 5,
        }
    }
}
