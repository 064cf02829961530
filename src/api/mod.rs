pub mod rest;
pub mod types;

use async_trait::async_trait;
use thiserror::Error;
use types::{FilterCriteria, PageRequest, PageResult, RawDownload};

pub const FILTER_ENDPOINT: &str = "/filter";
pub const DOWNLOAD_ENDPOINT: &str = "/download_fasta";

/// Failures at the API boundary. `Transport` means no response came back at
/// all; the others mean the server answered with something unusable.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request to {endpoint} failed: {message}")]
    Transport {
        endpoint: &'static str,
        message: String,
    },
    #[error("{endpoint} returned HTTP {status}: {body}")]
    Status {
        endpoint: &'static str,
        status: u16,
        body: String,
    },
    #[error("failed to decode {endpoint} response: {message}")]
    Decode {
        endpoint: &'static str,
        message: String,
    },
}

impl ApiError {
    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Transport { .. })
    }
}

#[async_trait]
pub trait ProteomeApi: Send + Sync {
    /// POST /filter for one page of the filtered listing.
    async fn filter(&self, request: &PageRequest) -> Result<PageResult, ApiError>;

    /// POST /download_fasta. Returns whatever the server answered; the
    /// caller classifies it by content type.
    async fn download_fasta(&self, criteria: &FilterCriteria) -> Result<RawDownload, ApiError>;
}
