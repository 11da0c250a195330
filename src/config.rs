use std::env;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub is_dev: bool,
    /// SQLite database URL for the local catalog mirror
    pub database_url: String,
    /// Base URL of the VOD provider's RPC API
    pub vod_endpoint: String,
    /// Long-lived access key pair for the provider
    pub vod_access_key_id: String,
    pub vod_access_key_secret: String,
}

impl Config {
    /// Load configuration from environment variables.
    /// In DEV mode, provides sensible defaults. In PROD mode, all vars are required.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let is_dev = env::var("DEV_MODE")
            .unwrap_or_else(|_| "false".to_string())
            .parse()
            .unwrap_or(false);

        // Port: required in prod, defaults to 3000 in dev
        let port = if is_dev {
            env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()?
        } else {
            env::var("PORT")
                .map_err(|_| "PORT is required in production")?
                .parse()?
        };

        let database_url = if is_dev {
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:vodsync.db".to_string())
        } else {
            env::var("DATABASE_URL").map_err(|_| "DATABASE_URL is required in production")?
        };

        let vod_endpoint = if is_dev {
            env::var("VOD_ENDPOINT")
                .unwrap_or_else(|_| "https://vod.cn-shanghai.example.com".to_string())
        } else {
            env::var("VOD_ENDPOINT").map_err(|_| "VOD_ENDPOINT is required in production")?
        };

        let vod_access_key_id = if is_dev {
            env::var("VOD_ACCESS_KEY_ID").unwrap_or_else(|_| "dev-access-key".to_string())
        } else {
            env::var("VOD_ACCESS_KEY_ID")
                .map_err(|_| "VOD_ACCESS_KEY_ID is required in production")?
        };

        let vod_access_key_secret = if is_dev {
            env::var("VOD_ACCESS_KEY_SECRET").unwrap_or_else(|_| "dev-secret".to_string())
        } else {
            env::var("VOD_ACCESS_KEY_SECRET")
                .map_err(|_| "VOD_ACCESS_KEY_SECRET is required in production")?
        };

        Ok(Config {
            port,
            is_dev,
            database_url,
            vod_endpoint,
            vod_access_key_id,
            vod_access_key_secret,
        })
    }
}
