/// Post Service Library
///
/// Handles posts, comments, likes, comment likes and donations for the Nova social
/// platform, and serves the ranked "random" feed over gRPC.
///
/// # Modules
///
/// - `config`: Configuration management
/// - `db`: Database access layer (PostgreSQL via sqlx)
/// - `error`: Error types and gRPC/HTTP conversions
/// - `grpc`: tonic server for `nova.post_service.v1.PostService`
/// - `handlers`: HTTP handlers (health, metrics, payment gateway callbacks)
/// - `media`: Image storage for post and comment attachments
/// - `metrics`: Prometheus collectors
/// - `models`: Records and pagination types
/// - `payment`: ZaloPay gateway client
/// - `services`: Business logic, including feed ranking
pub mod config;
pub mod db;
pub mod error;
pub mod grpc;
pub mod handlers;
pub mod media;
pub mod metrics;
pub mod models;
pub mod payment;
pub mod services;

pub use config::Config;
pub use error::{AppError, Result};
