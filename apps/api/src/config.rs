use std::path::PathBuf;

use anyhow::{Context, Result};

const DEFAULT_GCS_ENDPOINT: &str = "https://storage.googleapis.com";
const DEFAULT_S3_REGION: &str = "us-east-1";
const DEFAULT_CODE_STAGE_SECONDS: u64 = 1800;

/// Credentials for the GCS-backed artifact store.
/// Present only when `GCS_PROJECT_ID` and `GCS_BUCKET` are both set.
#[derive(Debug, Clone)]
pub struct GcsConfig {
    pub project_id: String,
    pub bucket: String,
    /// Optional OAuth bearer token. Public or emulator buckets work without one.
    pub access_token: Option<String>,
    /// Override for emulators (e.g. fake-gcs-server). Defaults to the real API.
    pub endpoint: String,
}

/// Credentials for the S3-backed artifact store.
/// Present only when `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY` and
/// `S3_BUCKET` are all set.
#[derive(Debug, Clone)]
pub struct S3Config {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bucket: String,
    /// Override for MinIO in local development. Defaults to AWS proper.
    pub endpoint: Option<String>,
    pub region: String,
}

/// Application configuration loaded from environment variables.
///
/// Storage backend selection is driven purely by which credential groups are
/// present; there is no explicit backend flag.
#[derive(Debug, Clone)]
pub struct Config {
    pub gcs: Option<GcsConfig>,
    pub s3: Option<S3Config>,
    /// Base directory for the local-disk fallback provider.
    pub upload_dir: PathBuf,
    /// Base URL under which locally stored artifacts are served.
    pub public_base_url: String,
    /// Wall-clock budget for the coding challenge stage.
    pub code_stage_seconds: u64,
    /// When set, question generation goes through the LLM instead of the
    /// deterministic keyword generator.
    pub anthropic_api_key: Option<String>,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()
            .context("PORT must be a valid port number")?;

        let gcs = match (optional_env("GCS_PROJECT_ID"), optional_env("GCS_BUCKET")) {
            (Some(project_id), Some(bucket)) => Some(GcsConfig {
                project_id,
                bucket,
                access_token: optional_env("GCS_ACCESS_TOKEN"),
                endpoint: optional_env("GCS_ENDPOINT")
                    .unwrap_or_else(|| DEFAULT_GCS_ENDPOINT.to_string()),
            }),
            _ => None,
        };

        let s3 = match (
            optional_env("AWS_ACCESS_KEY_ID"),
            optional_env("AWS_SECRET_ACCESS_KEY"),
            optional_env("S3_BUCKET"),
        ) {
            (Some(access_key_id), Some(secret_access_key), Some(bucket)) => Some(S3Config {
                access_key_id,
                secret_access_key,
                bucket,
                endpoint: optional_env("S3_ENDPOINT"),
                region: optional_env("S3_REGION")
                    .unwrap_or_else(|| DEFAULT_S3_REGION.to_string()),
            }),
            _ => None,
        };

        Ok(Config {
            gcs,
            s3,
            upload_dir: PathBuf::from(
                optional_env("UPLOAD_DIR").unwrap_or_else(|| "./uploads".to_string()),
            ),
            public_base_url: optional_env("PUBLIC_BASE_URL")
                .unwrap_or_else(|| format!("http://localhost:{port}")),
            code_stage_seconds: match optional_env("CODE_STAGE_SECONDS") {
                Some(raw) => raw
                    .parse::<u64>()
                    .context("CODE_STAGE_SECONDS must be a number of seconds")?,
                None => DEFAULT_CODE_STAGE_SECONDS,
            },
            anthropic_api_key: optional_env("ANTHROPIC_API_KEY"),
            port,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

/// Reads an environment variable, treating missing and empty values alike.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
