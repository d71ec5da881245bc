//! COS Storage - 腾讯云对象存储上传
//!
//! 实现 ObjectStoragePort trait，使用 COS XML API 的 PUT Object
//!
//! 签名算法（q-sign-algorithm=sha1）:
//! 1. KeyTime = `{start};{end}`
//! 2. SignKey = HEX(HMAC-SHA1(SecretKey, KeyTime))
//! 3. HttpString = `{method}\n{path}\n{params}\n{headers}\n`
//! 4. StringToSign = `sha1\n{KeyTime}\n{HEX(SHA1(HttpString))}\n`
//! 5. Signature = HEX(HMAC-SHA1(SignKey, StringToSign))

use async_trait::async_trait;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::Client;
use sha1::{Digest, Sha1};
use std::time::Duration;

use crate::application::ports::{ObjectStoragePort, StorageError};

type HmacSha1 = Hmac<Sha1>;

/// COS 签名用的 URL 编码，保留 RFC 3986 unreserved 字符
const COS_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// 对象路径编码，额外保留 `/`
const PATH_ENCODE_SET: &AsciiSet = &COS_ENCODE_SET.remove(b'/');

/// COS 存储配置
#[derive(Debug, Clone)]
pub struct CosStorageConfig {
    pub bucket: String,
    pub region: String,
    pub secret_id: String,
    pub secret_key: String,
    /// 自定义域名，None 时使用 `{bucket}.cos.{region}.myqcloud.com`
    pub endpoint: Option<String>,
    pub scheme: String,
    /// 上传时附带 Content-MD5
    pub enable_md5: bool,
    /// 签名有效期（秒）
    pub sign_expire_secs: u64,
    /// 上传超时（秒）
    pub timeout_secs: u64,
}

impl Default for CosStorageConfig {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            region: String::new(),
            secret_id: String::new(),
            secret_key: String::new(),
            endpoint: None,
            scheme: "https".to_string(),
            enable_md5: false,
            sign_expire_secs: 600,
            timeout_secs: 60,
        }
    }
}

impl CosStorageConfig {
    /// 访问域名
    pub fn host(&self) -> String {
        match self.endpoint.as_deref().map(str::trim).filter(|e| !e.is_empty()) {
            Some(endpoint) => endpoint
                .trim_start_matches("https://")
                .trim_start_matches("http://")
                .trim_end_matches('/')
                .to_string(),
            None => format!("{}.cos.{}.myqcloud.com", self.bucket, self.region),
        }
    }
}

/// 规范化对象 key：去掉前导 `/`，拒绝空 key 和 `..`
fn normalize_key(key: &str) -> Result<&str, StorageError> {
    let trimmed = key.trim_start_matches('/');
    if trimmed.is_empty() || trimmed.split('/').any(|seg| seg == "..") {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(trimmed)
}

fn hmac_sha1_hex(key: &[u8], data: &str) -> Result<String, StorageError> {
    let mut mac = HmacSha1::new_from_slice(key)
        .map_err(|e| StorageError::InvalidKey(format!("hmac key: {}", e)))?;
    mac.update(data.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// COS 请求签名器
#[derive(Debug, Clone)]
pub struct CosSigner {
    secret_id: String,
    secret_key: String,
}

impl CosSigner {
    pub fn new(secret_id: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            secret_id: secret_id.into(),
            secret_key: secret_key.into(),
        }
    }

    /// 生成 Authorization 头
    ///
    /// `headers` 为参与签名的请求头（名称大小写不敏感）
    pub fn authorization(
        &self,
        method: &str,
        path: &str,
        headers: &[(&str, &str)],
        start: i64,
        end: i64,
    ) -> Result<String, StorageError> {
        let key_time = format!("{};{}", start, end);
        let sign_key = hmac_sha1_hex(self.secret_key.as_bytes(), &key_time)?;

        let mut signed: Vec<(String, String)> = headers
            .iter()
            .map(|(name, value)| {
                (
                    utf8_percent_encode(&name.to_ascii_lowercase(), COS_ENCODE_SET).to_string(),
                    utf8_percent_encode(value, COS_ENCODE_SET).to_string(),
                )
            })
            .collect();
        signed.sort();

        let header_list = signed
            .iter()
            .map(|(name, _)| name.as_str())
            .collect::<Vec<_>>()
            .join(";");
        let http_headers = signed
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join("&");

        let http_string = format!(
            "{}\n{}\n{}\n{}\n",
            method.to_ascii_lowercase(),
            path,
            "",
            http_headers
        );
        let string_to_sign = format!(
            "sha1\n{}\n{}\n",
            key_time,
            hex::encode(Sha1::digest(http_string.as_bytes()))
        );
        let signature = hmac_sha1_hex(sign_key.as_bytes(), &string_to_sign)?;

        Ok(format!(
            "q-sign-algorithm=sha1&q-ak={}&q-sign-time={}&q-key-time={}&q-header-list={}&q-url-param-list=&q-signature={}",
            self.secret_id, key_time, key_time, header_list, signature
        ))
    }
}

/// 腾讯云 COS 对象存储
pub struct CosObjectStorage {
    client: Client,
    config: CosStorageConfig,
    signer: CosSigner,
    host: String,
}

impl CosObjectStorage {
    pub fn new(config: CosStorageConfig) -> Result<Self, StorageError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| StorageError::Network(e.to_string()))?;
        let signer = CosSigner::new(&config.secret_id, &config.secret_key);
        let host = config.host();

        tracing::info!(bucket = %config.bucket, host = %host, "CosObjectStorage initialized");

        Ok(Self {
            client,
            config,
            signer,
            host,
        })
    }

    fn encoded_path(key: &str) -> String {
        utf8_percent_encode(key, PATH_ENCODE_SET).to_string()
    }
}

#[async_trait]
impl ObjectStoragePort for CosObjectStorage {
    async fn put_object(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError> {
        let key = normalize_key(key)?;
        let url = self.object_url(key);
        let path = format!("/{}", key);

        let content_md5 = self.config.enable_md5.then(|| {
            base64::engine::general_purpose::STANDARD.encode(md5::compute(&data).0)
        });

        let mut signed_headers = vec![("host", self.host.as_str())];
        if let Some(md5) = content_md5.as_deref() {
            signed_headers.push(("content-md5", md5));
        }

        let start = chrono::Utc::now().timestamp();
        let end = start + self.config.sign_expire_secs as i64;
        let authorization = self
            .signer
            .authorization("put", &path, &signed_headers, start, end)?;

        let size = data.len();
        let mut request = self
            .client
            .put(&url)
            .header(reqwest::header::HOST, &self.host)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header(reqwest::header::CONTENT_LENGTH, size)
            .header(reqwest::header::AUTHORIZATION, authorization);
        if let Some(md5) = content_md5 {
            request = request.header("Content-MD5", md5);
        }

        let response = request.body(data).send().await.map_err(|e| {
            if e.is_timeout() {
                StorageError::Network(format!("Upload timed out: {}", e))
            } else {
                StorageError::Network(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(key = %key, status = status.as_u16(), "COS rejected upload");
            return Err(StorageError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(key = %key, size = size, "Uploaded object to COS");
        Ok(())
    }

    fn object_url(&self, key: &str) -> String {
        format!(
            "{}://{}/{}",
            self.config.scheme,
            self.host,
            Self::encoded_path(key.trim_start_matches('/'))
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> CosStorageConfig {
        CosStorageConfig {
            bucket: "tts-1250000000".to_string(),
            region: "ap-guangzhou".to_string(),
            secret_id: "AKIDtest".to_string(),
            secret_key: "secret".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_hmac_sha1_known_vector() {
        let mac = hmac_sha1_hex(b"Jefe", "what do ya want for nothing?").unwrap();
        assert_eq!(mac, "effcdf6ae5eb2fa2d27416d5f184df9c259a7c79");
    }

    #[test]
    fn test_default_host_and_endpoint_override() {
        assert_eq!(config().host(), "tts-1250000000.cos.ap-guangzhou.myqcloud.com");

        let mut custom = config();
        custom.endpoint = Some("https://cdn.example.com/".to_string());
        assert_eq!(custom.host(), "cdn.example.com");

        custom.endpoint = Some("  ".to_string());
        assert_eq!(custom.host(), "tts-1250000000.cos.ap-guangzhou.myqcloud.com");
    }

    #[test]
    fn test_object_url_encodes_segments() {
        let storage = CosObjectStorage::new(config()).unwrap();
        assert_eq!(
            storage.object_url("/TTS/TASK_RESULT/202401021530_p 1_t.wav"),
            "https://tts-1250000000.cos.ap-guangzhou.myqcloud.com/TTS/TASK_RESULT/202401021530_p%201_t.wav"
        );
    }

    #[test]
    fn test_authorization_layout() {
        let signer = CosSigner::new("AKIDtest", "secret");
        let auth = signer
            .authorization(
                "PUT",
                "/TTS/a.wav",
                &[("Host", "bucket.cos.ap-guangzhou.myqcloud.com"), ("Content-MD5", "abc==")],
                1700000000,
                1700000600,
            )
            .unwrap();

        assert!(auth.starts_with("q-sign-algorithm=sha1&q-ak=AKIDtest&"));
        assert!(auth.contains("&q-sign-time=1700000000;1700000600&"));
        assert!(auth.contains("&q-key-time=1700000000;1700000600&"));
        assert!(auth.contains("&q-header-list=content-md5;host&"));
        assert!(auth.contains("&q-url-param-list=&"));

        let signature = auth.rsplit("q-signature=").next().unwrap();
        assert_eq!(signature.len(), 40);
        assert!(signature.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_authorization_is_deterministic_and_time_bound() {
        let signer = CosSigner::new("id", "key");
        let headers = [("host", "h")];
        let a = signer.authorization("put", "/k", &headers, 1, 2).unwrap();
        let b = signer.authorization("put", "/k", &headers, 1, 2).unwrap();
        let c = signer.authorization("put", "/k", &headers, 1, 3).unwrap();
        let d = signer.authorization("put", "/other", &headers, 1, 2).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
    }

    #[test]
    fn test_normalize_key() {
        assert_eq!(normalize_key("/TTS/a.wav").unwrap(), "TTS/a.wav");
        assert!(normalize_key("/").is_err());
        assert!(normalize_key("/TTS/../secret").is_err());
    }

    #[tokio::test]
    async fn test_upload_to_unreachable_endpoint_fails() {
        let mut cfg = config();
        cfg.endpoint = Some("127.0.0.1:1".to_string());
        cfg.scheme = "http".to_string();
        cfg.timeout_secs = 2;
        let storage = CosObjectStorage::new(cfg).unwrap();

        let result = storage
            .put_object("/TTS/a.wav", b"RIFF".to_vec(), "audio/wav")
            .await;
        assert!(matches!(result, Err(StorageError::Network(_))));
    }
}
