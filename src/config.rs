use crate::services::{
    hierarchy::HierarchyConfig, image_resize::ResizeOptions, storage_service::validate_bucket_name,
};
use anyhow::{Context, Result, bail};
use clap::Parser;
use std::{env, str::FromStr, time::Duration};

const MIN_SECRET_LEN: usize = 16;

/// Centralized application configuration.
/// Combines `GALLERY_*` environment variables and CLI arguments.
#[derive(Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub storage_dir: String,
    pub database_url: String,
    /// Bucket the hierarchy lives in; created at startup when missing.
    pub bucket: String,
    pub signing_secret: String,
    /// Base URL that signed download links point at.
    pub public_url: String,
    pub url_ttl_secs: u64,
    /// `0` disables image resizing.
    pub image_max_width: u32,
    pub image_max_height: u32,
    pub image_quality: u8,
    pub upload_concurrency: usize,
    pub move_concurrency: usize,
    pub list_page_size: usize,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("storage_dir", &self.storage_dir)
            .field("database_url", &self.database_url)
            .field("bucket", &self.bucket)
            .field("public_url", &self.public_url)
            .field("url_ttl_secs", &self.url_ttl_secs)
            .field("image_max_width", &self.image_max_width)
            .field("image_max_height", &self.image_max_height)
            .field("image_quality", &self.image_quality)
            .field("upload_concurrency", &self.upload_concurrency)
            .field("move_concurrency", &self.move_concurrency)
            .field("list_page_size", &self.list_page_size)
            .finish_non_exhaustive()
    }
}

/// Command-line configuration; every flag overrides its environment variable.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Folder hierarchy manager over an object store")]
pub struct Args {
    /// Host to bind to (overrides GALLERY_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides GALLERY_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory where object payloads are stored (overrides GALLERY_STORAGE_DIR)
    #[arg(long)]
    pub storage_dir: Option<String>,

    /// Database URL (overrides GALLERY_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Bucket holding the hierarchy (overrides GALLERY_BUCKET)
    #[arg(long)]
    pub bucket: Option<String>,

    /// Base URL used in signed links (overrides GALLERY_PUBLIC_URL)
    #[arg(long)]
    pub public_url: Option<String>,

    /// Signed URL validity in seconds (overrides GALLERY_URL_TTL_SECS)
    #[arg(long)]
    pub url_ttl_secs: Option<u64>,

    /// Maximum image width after resize, 0 to disable (overrides GALLERY_IMAGE_MAX_WIDTH)
    #[arg(long)]
    pub image_max_width: Option<u32>,

    /// Maximum image height after resize (overrides GALLERY_IMAGE_MAX_HEIGHT)
    #[arg(long)]
    pub image_max_height: Option<u32>,

    /// Re-encode quality for lossy images, 1-100 (overrides GALLERY_IMAGE_QUALITY)
    #[arg(long)]
    pub image_quality: Option<u8>,

    /// Concurrent uploads per batch (overrides GALLERY_UPLOAD_CONCURRENCY)
    #[arg(long)]
    pub upload_concurrency: Option<usize>,

    /// Concurrent file moves per folder during rename (overrides GALLERY_MOVE_CONCURRENCY)
    #[arg(long)]
    pub move_concurrency: Option<usize>,

    /// Keys per listing page (overrides GALLERY_LIST_PAGE_SIZE)
    #[arg(long)]
    pub list_page_size: Option<usize>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

/// Read `name` and parse it, falling back to `default` when unset.
fn env_or<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(value) => value
            .parse::<T>()
            .with_context(|| format!("parsing {} value `{}`", name, value)),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(err) => Err(err).with_context(|| format!("reading {}", name)),
    }
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        let args = Args::parse();
        let migrate = args.migrate;
        let cfg = Self::merge(args)?;
        cfg.validate()?;
        Ok((cfg, migrate))
    }

    /// Apply `args` over the environment and built-in defaults.
    pub fn merge(args: Args) -> Result<Self> {
        let port = match args.port {
            Some(port) => port,
            None => env_or("GALLERY_PORT", 3000)?,
        };
        let public_url = match args.public_url {
            Some(url) => url,
            None => env::var("GALLERY_PUBLIC_URL")
                .unwrap_or_else(|_| format!("http://127.0.0.1:{}", port)),
        };
        let signing_secret = env::var("GALLERY_SIGNING_SECRET").unwrap_or_default();

        Ok(Self {
            host: args
                .host
                .unwrap_or_else(|| env::var("GALLERY_HOST").unwrap_or_else(|_| "0.0.0.0".into())),
            port,
            storage_dir: args.storage_dir.unwrap_or_else(|| {
                env::var("GALLERY_STORAGE_DIR").unwrap_or_else(|_| "./data/objects".into())
            }),
            database_url: args.database_url.unwrap_or_else(|| {
                env::var("GALLERY_DATABASE_URL")
                    .unwrap_or_else(|_| "sqlite://./data/meta/gallery.db".into())
            }),
            bucket: args
                .bucket
                .unwrap_or_else(|| env::var("GALLERY_BUCKET").unwrap_or_else(|_| "gallery".into())),
            signing_secret,
            public_url,
            url_ttl_secs: args
                .url_ttl_secs
                .map_or_else(|| env_or("GALLERY_URL_TTL_SECS", 3600), Ok)?,
            image_max_width: args
                .image_max_width
                .map_or_else(|| env_or("GALLERY_IMAGE_MAX_WIDTH", 1920), Ok)?,
            image_max_height: args
                .image_max_height
                .map_or_else(|| env_or("GALLERY_IMAGE_MAX_HEIGHT", 1080), Ok)?,
            image_quality: args
                .image_quality
                .map_or_else(|| env_or("GALLERY_IMAGE_QUALITY", 90), Ok)?,
            upload_concurrency: args
                .upload_concurrency
                .map_or_else(|| env_or("GALLERY_UPLOAD_CONCURRENCY", 4), Ok)?,
            move_concurrency: args
                .move_concurrency
                .map_or_else(|| env_or("GALLERY_MOVE_CONCURRENCY", 8), Ok)?,
            list_page_size: args
                .list_page_size
                .map_or_else(|| env_or("GALLERY_LIST_PAGE_SIZE", 1000), Ok)?,
        })
    }

    /// Fail fast on settings no store call could succeed with.
    pub fn validate(&self) -> Result<()> {
        validate_bucket_name(&self.bucket)
            .with_context(|| {
                format!("GALLERY_BUCKET `{}` is not a valid bucket name", self.bucket)
            })?;
        if self.signing_secret.len() < MIN_SECRET_LEN {
            bail!(
                "GALLERY_SIGNING_SECRET must be set to at least {} bytes",
                MIN_SECRET_LEN
            );
        }
        if !(1..=1000).contains(&self.list_page_size) {
            bail!("list page size must be 1-1000, got {}", self.list_page_size);
        }
        self.hierarchy_config().validate()?;
        Ok(())
    }

    pub fn hierarchy_config(&self) -> HierarchyConfig {
        let enabled = self.image_max_width > 0 && self.image_max_height > 0;
        let resize = enabled.then_some(ResizeOptions {
            max_width: self.image_max_width,
            max_height: self.image_max_height,
            quality: self.image_quality,
        });
        HierarchyConfig {
            url_ttl: Duration::from_secs(self.url_ttl_secs),
            resize,
            upload_concurrency: self.upload_concurrency,
            move_concurrency: self.move_concurrency,
            ..HierarchyConfig::default()
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
