use anyhow::Result;
use std::env;

/// Storage mode value selecting the Cloudinary backend; anything else is local
pub const CLOUDINARY_MODE: &str = "cloudinary";

pub const DEFAULT_CLOUDINARY_API_BASE: &str = "https://api.cloudinary.com";

/// Database URL that selects the in-process record store
pub const MEMORY_DATABASE_URL: &str = "memory://";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StorageMode {
    Local,
    Cloudinary,
}

impl StorageMode {
    /// `cloudinary` (any case) selects the remote store, anything else local.
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case(CLOUDINARY_MODE) {
            StorageMode::Cloudinary
        } else {
            StorageMode::Local
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StorageMode::Local => "local",
            StorageMode::Cloudinary => CLOUDINARY_MODE,
        }
    }
}

#[derive(Clone, Debug)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    /// Upload/destroy API root; tests point it at a mock server
    pub api_base: String,
    /// Deadline for fetching a blob back from its delivery URL
    pub fetch_timeout_seconds: u64,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub server_address: String,
    pub storage_mode: StorageMode,
    pub upload_path: String,
    pub max_file_size_mb: u64,
    pub cloudinary_config: Option<CloudinaryConfig>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Load .env file if present
        match dotenvy::dotenv() {
            Ok(path) => println!("✅ Loaded environment variables from {}", path.display()),
            Err(_) => println!("ℹ️  No .env file found, using system environment variables"),
        }

        let database_url = Self::database_url_from_env();

        let server_address = env::var("SERVER_ADDRESS").unwrap_or_else(|_| {
            let host = env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
            let port = env::var("SERVER_PORT").unwrap_or_else(|_| "8000".to_string());
            format!("{}:{}", host, port)
        });

        let storage_mode = StorageMode::parse(&env::var("STORAGE_MODE").unwrap_or_default());

        let upload_path = env::var("FILE_UPLOAD_DIR")
            .or_else(|_| env::var("UPLOAD_PATH"))
            .unwrap_or_else(|_| "./uploads".to_string());

        let max_file_size_mb = match env::var("MAX_FILE_SIZE_MB") {
            Ok(value) => value
                .parse::<u64>()
                .map_err(|e| anyhow::anyhow!("MAX_FILE_SIZE_MB must be a positive integer: {}", e))?,
            Err(_) => 50,
        };
        if max_file_size_mb == 0 {
            anyhow::bail!("MAX_FILE_SIZE_MB must be greater than zero");
        }

        let cloudinary_config = Self::cloudinary_config_from_env()?;

        if storage_mode == StorageMode::Cloudinary && cloudinary_config.is_none() {
            anyhow::bail!(
                "STORAGE_MODE=cloudinary requires CLOUDINARY_CLOUD_NAME, CLOUDINARY_API_KEY and CLOUDINARY_API_SECRET"
            );
        }

        let config = Config {
            database_url,
            server_address,
            storage_mode,
            upload_path,
            max_file_size_mb,
            cloudinary_config,
        };

        println!("📁 STORAGE_MODE: {}", config.storage_mode.as_str());
        println!("📁 FILE_UPLOAD_DIR: {}", config.upload_path);
        println!("🌐 SERVER_ADDRESS: {}", config.server_address);

        Ok(config)
    }

    /// DATABASE_URL wins; otherwise the URL is assembled from POSTGRES_* parts.
    fn database_url_from_env() -> String {
        if let Ok(url) = env::var("DATABASE_URL") {
            return url;
        }

        let host = env::var("POSTGRES_HOST").unwrap_or_else(|_| "localhost".to_string());
        let port = env::var("POSTGRES_PORT").unwrap_or_else(|_| "5432".to_string());
        let db = env::var("POSTGRES_DB").unwrap_or_else(|_| "bookvault".to_string());
        let user = env::var("POSTGRES_USER").unwrap_or_else(|_| "bookvault".to_string());
        let password = env::var("POSTGRES_PASSWORD").unwrap_or_else(|_| "bookvault".to_string());

        format!("postgresql://{}:{}@{}:{}/{}", user, password, host, port, db)
    }

    fn cloudinary_config_from_env() -> Result<Option<CloudinaryConfig>> {
        let cloud_name = env::var("CLOUDINARY_CLOUD_NAME").unwrap_or_default();
        let api_key = env::var("CLOUDINARY_API_KEY").unwrap_or_default();
        let api_secret = env::var("CLOUDINARY_API_SECRET").unwrap_or_default();

        if cloud_name.is_empty() && api_key.is_empty() && api_secret.is_empty() {
            return Ok(None);
        }
        if cloud_name.is_empty() || api_key.is_empty() || api_secret.is_empty() {
            anyhow::bail!("Incomplete Cloudinary credentials: cloud name, API key and API secret are all required");
        }

        let fetch_timeout_seconds = match env::var("REMOTE_FETCH_TIMEOUT_SECONDS") {
            Ok(value) => value
                .parse::<u64>()
                .map_err(|e| anyhow::anyhow!("REMOTE_FETCH_TIMEOUT_SECONDS must be an integer: {}", e))?,
            Err(_) => 60,
        };

        Ok(Some(CloudinaryConfig {
            cloud_name,
            api_key,
            api_secret,
            api_base: env::var("CLOUDINARY_API_BASE")
                .unwrap_or_else(|_| DEFAULT_CLOUDINARY_API_BASE.to_string()),
            fetch_timeout_seconds,
        }))
    }

    pub fn uses_memory_store(&self) -> bool {
        self.database_url == MEMORY_DATABASE_URL
    }

    pub fn max_file_size_bytes(&self) -> usize {
        (self.max_file_size_mb as usize).saturating_mul(1024 * 1024)
    }
}
