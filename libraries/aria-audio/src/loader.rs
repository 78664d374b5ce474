//! Fetching source bytes
//!
//! `SourceLoader` only gets the raw bytes; decoding happens afterwards on a
//! blocking worker so both halves can be swapped out independently.

use crate::error::LoadError;
use async_trait::async_trait;
use aria_core::AudioSource;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use url::Url;

/// Raw source bytes plus a format hint
#[derive(Debug, Clone)]
pub struct FetchedBytes {
    pub data: Bytes,
    pub extension: Option<String>,
}

impl FetchedBytes {
    pub fn new(data: Bytes, extension: Option<String>) -> Self {
        Self { data, extension }
    }
}

#[async_trait]
pub trait SourceLoader: Send + Sync {
    async fn fetch(&self, source: &AudioSource) -> Result<FetchedBytes, LoadError>;
}

/// HTTP(S) via reqwest, local files via tokio, in-memory bytes as-is
#[derive(Debug, Clone, Default)]
pub struct DefaultSourceLoader {
    client: reqwest::Client,
}

impl DefaultSourceLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn fetch_http(&self, url: &Url) -> Result<FetchedBytes, LoadError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| LoadError::unreachable(url.as_str(), e))?;
        let data = response
            .bytes()
            .await
            .map_err(|e| LoadError::unreachable(url.as_str(), e))?;
        Ok(FetchedBytes::new(data, extension_of(url.path())))
    }

    async fn fetch_file(&self, path: &Path) -> Result<FetchedBytes, LoadError> {
        let data = tokio::fs::read(path)
            .await
            .map_err(|e| LoadError::unreachable(path.display().to_string(), e))?;
        Ok(FetchedBytes::new(
            Bytes::from(data),
            path.extension().and_then(|e| e.to_str()).map(str::to_lowercase),
        ))
    }
}

#[async_trait]
impl SourceLoader for DefaultSourceLoader {
    async fn fetch(&self, source: &AudioSource) -> Result<FetchedBytes, LoadError> {
        match source {
            AudioSource::Bytes(data) => Ok(FetchedBytes::new(data.clone(), None)),
            AudioSource::Url(raw) => match Url::parse(raw) {
                Ok(url) if matches!(url.scheme(), "http" | "https") => self.fetch_http(&url).await,
                Ok(url) if url.scheme() == "file" => {
                    let path = url
                        .to_file_path()
                        .map_err(|()| LoadError::unreachable(raw.as_str(), "invalid file URL"))?;
                    self.fetch_file(&path).await
                }
                // Anything without a scheme (or a drive letter) is a local path
                Err(url::ParseError::RelativeUrlWithoutBase) => {
                    self.fetch_file(&PathBuf::from(raw)).await
                }
                Ok(url) if url.scheme().len() == 1 => self.fetch_file(&PathBuf::from(raw)).await,
                Ok(url) => Err(LoadError::Unsupported(format!(
                    "unsupported URL scheme '{}'",
                    url.scheme()
                ))),
                Err(e) => Err(LoadError::unreachable(raw.as_str(), e)),
            },
            AudioSource::Embedded { provider, .. } => Err(LoadError::Unsupported(format!(
                "embedded '{provider}' sources need a dedicated backend"
            ))),
        }
    }
}

fn extension_of(path: &str) -> Option<String> {
    let name = path.rsplit('/').next()?;
    let (_, ext) = name.rsplit_once('.')?;
    (!ext.is_empty()).then(|| ext.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_from_url_path() {
        assert_eq!(extension_of("/music/song.MP3"), Some("mp3".into()));
        assert_eq!(extension_of("/stream"), None);
        assert_eq!(extension_of("/dir.v2/stream"), None);
    }

    #[tokio::test]
    async fn bytes_pass_through() {
        let loader = DefaultSourceLoader::new();
        let fetched = loader
            .fetch(&AudioSource::bytes(vec![1u8, 2, 3]))
            .await
            .unwrap();
        assert_eq!(fetched.data.as_ref(), &[1, 2, 3]);
    }

    #[tokio::test]
    async fn missing_file_is_unreachable() {
        let loader = DefaultSourceLoader::new();
        let err = loader
            .fetch(&AudioSource::url("/definitely/not/here.wav"))
            .await
            .unwrap_err();
        assert!(matches!(err, LoadError::Unreachable { .. }));
    }

    #[tokio::test]
    async fn reads_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        std::fs::write(&path, b"RIFF").unwrap();

        let loader = DefaultSourceLoader::new();
        let url = Url::from_file_path(&path).unwrap();
        let fetched = loader.fetch(&AudioSource::url(url.as_str())).await.unwrap();
        assert_eq!(fetched.extension.as_deref(), Some("wav"));
        assert_eq!(fetched.data.len(), 4);
    }

    #[tokio::test]
    async fn unknown_scheme_is_unsupported() {
        let loader = DefaultSourceLoader::new();
        let err = loader
            .fetch(&AudioSource::url("ftp://example.com/a.mp3"))
            .await
            .unwrap_err();
        assert!(matches!(err, LoadError::Unsupported(_)));
    }

    #[tokio::test]
    async fn embedded_needs_backend() {
        let loader = DefaultSourceLoader::new();
        let err = loader
            .fetch(&AudioSource::embedded("video", "xyz"))
            .await
            .unwrap_err();
        assert!(matches!(err, LoadError::Unsupported(_)));
    }
}
