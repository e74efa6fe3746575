//! HTTP API handlers for ragam-id

pub mod health;
pub mod upload;

pub use health::health_routes;
pub use upload::upload_routes;
