//! ACRCloud identification client
//!
//! Requests are signed with HMAC-SHA1 over
//! `POST\n/v1/identify\n<access_key>\naudio\n1\n<timestamp>` and sent as a
//! multipart form together with the raw sample.

use super::{AudioSample, IdentificationResult, IdentifyError, TrackIdentifier};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine};
use hmac::{Hmac, Mac};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha1::Sha1;
use std::time::Duration;
use tracing::{debug, info, warn};

type HmacSha1 = Hmac<Sha1>;

pub const DEFAULT_ACR_HOST: &str = "identify-ap-southeast-1.acrcloud.com";
pub const DEFAULT_CONTENT_TYPE: &str = "audio/mpeg";

const HTTP_METHOD: &str = "POST";
const HTTP_URI: &str = "/v1/identify";
const DATA_TYPE: &str = "audio";
const SIGNATURE_VERSION: &str = "1";
const USER_AGENT: &str = concat!("ragam-id/", env!("CARGO_PKG_VERSION"));

/// Connection settings
#[derive(Clone)]
pub struct AcrCloudConfig {
    /// Bare host (`identify-….acrcloud.com`) or a full base URL
    pub host: String,
    pub access_key: String,
    pub access_secret: String,
}

impl std::fmt::Debug for AcrCloudConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AcrCloudConfig")
            .field("host", &self.host)
            .field("access_key", &self.access_key)
            .field("access_secret", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct AcrResponse {
    status: AcrStatus,
    #[serde(default)]
    metadata: Option<AcrMetadata>,
}

#[derive(Debug, Deserialize)]
struct AcrStatus {
    code: i64,
    #[serde(default)]
    msg: String,
}

#[derive(Debug, Deserialize)]
struct AcrMetadata {
    #[serde(default)]
    music: Vec<AcrMusic>,
}

#[derive(Debug, Deserialize)]
struct AcrMusic {
    title: Option<String>,
}

/// Canonical string covered by the signature
pub fn string_to_sign(access_key: &str, timestamp: i64) -> String {
    format!(
        "{}\n{}\n{}\n{}\n{}\n{}",
        HTTP_METHOD, HTTP_URI, access_key, DATA_TYPE, SIGNATURE_VERSION, timestamp
    )
}

/// base64(HMAC-SHA1(secret, string_to_sign))
pub fn sign(access_secret: &str, access_key: &str, timestamp: i64) -> Result<String, IdentifyError> {
    let mut mac = HmacSha1::new_from_slice(access_secret.as_bytes())
        .map_err(|e| IdentifyError::Parse(format!("invalid signing key: {}", e)))?;
    mac.update(string_to_sign(access_key, timestamp).as_bytes());
    Ok(BASE64_STANDARD.encode(mac.finalize().into_bytes()))
}

fn endpoint_for(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        format!("{}{}", host, HTTP_URI)
    } else {
        format!("https://{}{}", host, HTTP_URI)
    }
}

/// ACRCloud API client
pub struct AcrCloudClient {
    http_client: reqwest::Client,
    endpoint: String,
    access_key: String,
    access_secret: String,
}

impl AcrCloudClient {
    pub fn new(config: AcrCloudConfig) -> Result<Self, IdentifyError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| IdentifyError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            endpoint: endpoint_for(&config.host),
            access_key: config.access_key,
            access_secret: config.access_secret,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn sample_part(sample: &AudioSample) -> Result<Part, IdentifyError> {
        let part = Part::bytes(sample.bytes.clone()).file_name(sample.file_name.clone());
        match part.mime_str(&sample.content_type) {
            Ok(part) => Ok(part),
            Err(_) => {
                warn!(
                    content_type = %sample.content_type,
                    "Declared content type is not a valid MIME type, sending {}",
                    DEFAULT_CONTENT_TYPE
                );
                Part::bytes(sample.bytes.clone())
                    .file_name(sample.file_name.clone())
                    .mime_str(DEFAULT_CONTENT_TYPE)
                    .map_err(|e| IdentifyError::Parse(e.to_string()))
            }
        }
    }

    /// Identify with an explicit timestamp (epoch seconds)
    pub async fn identify_at(
        &self,
        sample: &AudioSample,
        timestamp: i64,
    ) -> Result<IdentificationResult, IdentifyError> {
        let signature = sign(&self.access_secret, &self.access_key, timestamp)?;

        let form = Form::new()
            .text("access_key", self.access_key.clone())
            .text("sample_bytes", sample.bytes.len().to_string())
            .part("sample", Self::sample_part(sample)?)
            .text("timestamp", timestamp.to_string())
            .text("signature", signature)
            .text("data_type", DATA_TYPE)
            .text("signature_version", SIGNATURE_VERSION);

        debug!(
            sample_bytes = sample.bytes.len(),
            endpoint = %self.endpoint,
            "Querying ACRCloud"
        );

        let response = self
            .http_client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| IdentifyError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| IdentifyError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(IdentifyError::Api(status.as_u16(), body));
        }

        let parsed: AcrResponse =
            serde_json::from_str(&body).map_err(|e| IdentifyError::Parse(e.to_string()))?;

        let title = parsed
            .metadata
            .and_then(|m| m.music.into_iter().next())
            .and_then(|music| music.title);

        info!(
            code = parsed.status.code,
            msg = %parsed.status.msg,
            title = ?title,
            "ACRCloud result"
        );

        Ok(IdentificationResult {
            status_code: parsed.status.code,
            status_message: parsed.status.msg,
            title,
        })
    }
}

#[async_trait]
impl TrackIdentifier for AcrCloudClient {
    fn source_id(&self) -> &'static str {
        "ACRCloud"
    }

    async fn identify(&self, sample: &AudioSample) -> Result<IdentificationResult, IdentifyError> {
        self.identify_at(sample, chrono::Utc::now().timestamp()).await
    }
}
