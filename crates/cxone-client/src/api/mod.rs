//! Endpoints the client needs for its own bootstrap.

mod flags;
mod tenant;

pub use flags::FlagsApi;
pub use tenant::TenantApi;
