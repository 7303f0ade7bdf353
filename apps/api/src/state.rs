use std::sync::Arc;

use aws_sdk_s3::Client as S3Client;
use redis::Client as RedisClient;
use sqlx::PgPool;

use crate::ai_client::AiClient;
use crate::config::Config;
use crate::payment::StripeClient;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// Redis client used for history-cache invalidation.
    pub redis: RedisClient,
    pub s3: S3Client,
    /// Pluggable AI backend. Production wires OpenAiClient; tests substitute
    /// their own implementation.
    pub ai: Arc<dyn AiClient>,
    pub payments: StripeClient,
    pub config: Config,
}
