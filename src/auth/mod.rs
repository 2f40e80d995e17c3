// Authentication module
// Client-credentials token lifecycle: credential storage, refresh and caching

mod credentials;
mod manager;
mod refresh;
mod types;

pub use credentials::Credentials;
pub use manager::TokenManager;
pub use refresh::DEFAULT_TOKEN_PATH;
pub use types::{TokenRecord, EXPIRY_SKEW_SECS};
