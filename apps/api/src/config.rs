use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    /// Max connections in the Postgres pool. Default 10.
    pub db_max_connections: u32,
    pub redis_url: String,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub openai_api_key: String,
    pub stripe_secret_key: String,
    pub stripe_webhook_secret: String,
    pub jwt_secret: String,
    pub base_url: String,
    pub port: u16,
    pub rust_log: String,
    /// Max resume size accepted by the upload handler (bytes). Default 10 MB.
    pub upload_max_file_size: usize,
    /// Max resume size accepted by the analyze handler (bytes). Default 5 MB.
    /// Configured separately from the upload limit on purpose.
    pub analyze_max_file_size: usize,
    /// Timeout for each LLM call (seconds). Default 60.
    pub ai_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            db_max_connections: parse_env_or("DB_MAX_CONNECTIONS", 10)?,
            redis_url: require_env("REDIS_URL")?,
            s3_bucket: require_env("S3_BUCKET")?,
            s3_endpoint: require_env("S3_ENDPOINT")?,
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            openai_api_key: require_env("OPENAI_API_KEY")?,
            stripe_secret_key: require_env("STRIPE_SECRET_KEY")?,
            stripe_webhook_secret: require_env("STRIPE_WEBHOOK_SECRET")?,
            jwt_secret: require_env("JWT_SECRET")?,
            base_url: std::env::var("BASE_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            upload_max_file_size: parse_env_or("UPLOAD_MAX_FILE_SIZE", 10 * 1024 * 1024)?,
            analyze_max_file_size: parse_env_or("ANALYZE_MAX_FILE_SIZE", 5 * 1024 * 1024)?,
            ai_timeout_secs: parse_env_or("AI_TIMEOUT_SECS", 60)?,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_env_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(v) => v
            .parse::<T>()
            .with_context(|| format!("'{key}' must be a valid number")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_env_or_uses_default_when_unset() {
        let pool_size: u32 = parse_env_or("ATSOPT_TEST_UNSET_POOL_SIZE", 10).unwrap();
        assert_eq!(pool_size, 10);
    }

    #[test]
    fn test_parse_env_or_reads_set_value() {
        std::env::set_var("ATSOPT_TEST_POOL_SIZE_OVERRIDE", "25");
        let pool_size: u32 = parse_env_or("ATSOPT_TEST_POOL_SIZE_OVERRIDE", 10).unwrap();
        assert_eq!(pool_size, 25);
    }

    #[test]
    fn test_parse_env_or_rejects_garbage() {
        std::env::set_var("ATSOPT_TEST_POOL_SIZE_GARBAGE", "lots");
        let result: Result<u32> = parse_env_or("ATSOPT_TEST_POOL_SIZE_GARBAGE", 10);
        assert!(result.is_err());
    }
}
