/// Convenience result type used across docseal.
pub type DocsealResult<T> = Result<T, DocsealError>;

/// Top-level error taxonomy used by pipeline APIs.
///
/// Nothing here is fatal to the host process: every variant is scoped to the current
/// document or session and is recoverable by retrying the user action.
#[derive(thiserror::Error, Debug)]
pub enum DocsealError {
    /// Network or URL failure while fetching document, font or image bytes.
    #[error("source fetch error: {url}: {reason}")]
    SourceFetch {
        /// The URL (or path) that was attempted.
        url: String,
        /// Human readable failure reason.
        reason: String,
    },

    /// A fetch was cancelled through its [`crate::AbortSignal`]. Never retried.
    #[error("aborted: {url}")]
    Aborted {
        /// The URL (or path) whose fetch was cancelled.
        url: String,
    },

    /// Image type is not PNG/JPEG, or the document is neither PDF nor image.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Slides never appeared within the bounded retry window.
    #[error("render timeout: no slides after {attempts} attempts")]
    RenderTimeout {
        /// Number of polls performed before giving up.
        attempts: u32,
    },

    /// A page failed to render; remaining pages were not attempted.
    #[error("render error on page {page}: {reason}")]
    Render {
        /// Zero-based page index.
        page: usize,
        /// Failure reason.
        reason: String,
    },

    /// Text or image embedding failed for a field.
    #[error("embed error: {0}")]
    Embed(String),

    /// Invalid caller-provided data.
    #[error("validation error: {0}")]
    Validation(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DocsealError {
    /// Build a [`DocsealError::SourceFetch`] value.
    pub fn source_fetch(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::SourceFetch {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    /// Build a [`DocsealError::Aborted`] value.
    pub fn aborted(url: impl Into<String>) -> Self {
        Self::Aborted { url: url.into() }
    }

    /// Build a [`DocsealError::UnsupportedFormat`] value.
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::UnsupportedFormat(msg.into())
    }

    /// Build a [`DocsealError::Render`] value.
    pub fn render(page: usize, reason: impl ToString) -> Self {
        Self::Render {
            page,
            reason: reason.to_string(),
        }
    }

    /// Build a [`DocsealError::Embed`] value.
    pub fn embed(msg: impl Into<String>) -> Self {
        Self::Embed(msg.into())
    }

    /// Build a [`DocsealError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`DocsealError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Whether retrying the same user action can succeed.
    ///
    /// Aborts are final for the session scope that issued them.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Aborted { .. } | Self::Validation(_))
    }
}

impl From<serde_json::Error> for DocsealError {
    fn from(e: serde_json::Error) -> Self {
        Self::serde(e.to_string())
    }
}

impl From<lopdf::Error> for DocsealError {
    fn from(e: lopdf::Error) -> Self {
        Self::Other(anyhow::Error::new(e))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
