// Cloud API client - library root

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod http_client;
pub mod models;
pub mod pipeline;
pub mod scope;
pub mod services;
pub mod transport;
pub mod validation;

pub use client::{ClientBuilder, CloudClient};
pub use error::{ApiError, ClientError, ErrorDetail, TransportError};
pub use scope::{OperationScope, ScopeError};
