//! Host identity lookup.
//!
//! The archive action keys every object under the id of the host that
//! produced it, and the pre-flight probe bucket is named after the same
//! id, so a run cannot proceed without one.

const METADATA_URL: &str = "http://169.254.169.254/latest/meta-data/instance-id";

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("metadata request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected instance id {0:?}")]
    Malformed(String),
}

/// Where the host id comes from. `Fixed` serves tests and the `HOST_ID`
/// environment override; `Metadata` queries the EC2 metadata endpoint.
#[derive(Clone)]
pub enum IdentityProvider {
    Metadata { client: reqwest::Client, url: String },
    Fixed { id: String },
}

impl IdentityProvider {
    /// Provider backed by the instance metadata endpoint, with a bounded
    /// timeout so an unattended run cannot hang on a dead endpoint.
    pub fn metadata() -> Result<Self, IdentityError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()?;
        Ok(Self::Metadata {
            client,
            url: METADATA_URL.to_string(),
        })
    }

    pub fn fixed(id: impl Into<String>) -> Self {
        Self::Fixed { id: id.into() }
    }

    /// Resolve the host id. Instance ids arrive as `i-<hex>`; the leading
    /// `i-` is stripped so the id doubles as a bucket name.
    pub async fn host_id(&self) -> Result<String, IdentityError> {
        match self {
            Self::Fixed { id } => Ok(id.clone()),
            Self::Metadata { client, url } => {
                let content = client.get(url).send().await?.text().await?;
                match content.trim().strip_prefix("i-") {
                    Some(id) if !id.is_empty() => Ok(id.to_string()),
                    _ => Err(IdentityError::Malformed(content)),
                }
            }
        }
    }
}
