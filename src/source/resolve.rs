use std::sync::Arc;

use crate::{
    foundation::error::{DocsealError, DocsealResult},
    source::{abort::AbortSignal, mime},
};

/// A local file blob handed over by the host (upload input, drag and drop, ...).
#[derive(Clone, Debug)]
pub struct FileBlob {
    /// Raw file bytes.
    pub bytes: Arc<Vec<u8>>,
    /// MIME type declared by the host, if any.
    pub mime_type: Option<String>,
    /// Original file name, used as an extension hint.
    pub name: Option<String>,
}

impl FileBlob {
    /// Wrap raw bytes without any metadata.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: Arc::new(bytes.into()),
            mime_type: None,
            name: None,
        }
    }
}

/// Where a document comes from: a remote URL, a local blob, or both (blob wins).
#[derive(Clone, Debug, Default)]
pub struct DocumentDescriptor {
    /// Remote (`http(s)://`), `file://` URL or plain filesystem path.
    pub url: Option<String>,
    /// Local blob.
    pub file: Option<FileBlob>,
}

impl DocumentDescriptor {
    /// Descriptor for a URL or path.
    pub fn url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            file: None,
        }
    }

    /// Descriptor for a local blob.
    pub fn file(file: FileBlob) -> Self {
        Self {
            url: None,
            file: Some(file),
        }
    }
}

/// Bytes plus their detected MIME type, ready for rendering or finalization.
#[derive(Clone, Debug)]
pub struct ResolvedSource {
    /// Document bytes.
    pub bytes: Arc<Vec<u8>>,
    /// Detected MIME type (lowercase essence).
    pub mime_type: String,
    /// URL the bytes were fetched from, when remote.
    pub origin: Option<String>,
}

impl ResolvedSource {
    /// Build from in-memory bytes, sniffing the type.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        let bytes = bytes.into();
        let mime_type = mime::detect(None, None, &bytes, None);
        Self {
            bytes: Arc::new(bytes),
            mime_type,
            origin: None,
        }
    }

    /// Whether the source is a PDF document.
    pub fn is_pdf(&self) -> bool {
        mime::is_pdf(&self.mime_type)
    }

    /// Whether the source is a raster image.
    pub fn is_image(&self) -> bool {
        mime::is_image(&self.mime_type)
    }
}

/// Raw fetch result.
#[derive(Clone, Debug)]
pub struct Fetched {
    /// Response body or file contents.
    pub bytes: Vec<u8>,
    /// `Content-Type` header for HTTP fetches.
    pub content_type: Option<String>,
}

/// Turns document descriptors, font URLs and image URLs into bytes.
///
/// Never retries: failures surface to the caller, whose UI owns retry.
#[derive(Clone, Debug, Default)]
pub struct SourceResolver {
    client: reqwest::Client,
}

impl SourceResolver {
    /// Resolver with a default HTTP client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolver reusing a caller-configured HTTP client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Resolve a document descriptor into bytes and a MIME type.
    #[tracing::instrument(skip(self, desc, abort), fields(url = desc.url.as_deref()))]
    pub async fn resolve(
        &self,
        desc: &DocumentDescriptor,
        abort: &AbortSignal,
    ) -> DocsealResult<ResolvedSource> {
        if let Some(file) = &desc.file {
            let mime_type = mime::detect(
                file.mime_type.as_deref(),
                None,
                &file.bytes,
                file.name.as_deref(),
            );
            return Ok(ResolvedSource {
                bytes: Arc::clone(&file.bytes),
                mime_type,
                origin: None,
            });
        }

        let url = desc
            .url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| DocsealError::validation("document descriptor has neither url nor file"))?;

        let fetched = self.fetch(url, abort).await?;
        let mime_type = mime::detect(
            None,
            fetched.content_type.as_deref(),
            &fetched.bytes,
            Some(url),
        );
        Ok(ResolvedSource {
            bytes: Arc::new(fetched.bytes),
            mime_type,
            origin: Some(url.to_string()),
        })
    }

    /// Fetch raw bytes from a URL or path.
    pub async fn fetch_bytes(&self, url: &str, abort: &AbortSignal) -> DocsealResult<Vec<u8>> {
        Ok(self.fetch(url, abort).await?.bytes)
    }

    /// Fetch bytes and the content type, observing `abort` for the whole transfer.
    pub async fn fetch(&self, url: &str, abort: &AbortSignal) -> DocsealResult<Fetched> {
        if abort.is_aborted() {
            return Err(DocsealError::aborted(url));
        }
        tokio::select! {
            biased;
            _ = abort.aborted() => Err(DocsealError::aborted(url)),
            res = self.fetch_unguarded(url) => res,
        }
    }

    async fn fetch_unguarded(&self, url: &str) -> DocsealResult<Fetched> {
        if url.starts_with("http://") || url.starts_with("https://") {
            return self.fetch_http(url).await;
        }
        let path = if let Some(rest) = url.strip_prefix("file://") {
            rest
        } else if url.contains("://") {
            return Err(DocsealError::source_fetch(url, "unsupported URL scheme"));
        } else {
            url
        };
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| DocsealError::source_fetch(url, e))?;
        Ok(Fetched {
            bytes,
            content_type: None,
        })
    }

    async fn fetch_http(&self, url: &str) -> DocsealResult<Fetched> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DocsealError::source_fetch(url, e))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(DocsealError::source_fetch(
                url,
                format!("HTTP status {status}"),
            ));
        }
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| DocsealError::source_fetch(url, e))?;
        Ok(Fetched {
            bytes: bytes.to_vec(),
            content_type,
        })
    }
}
