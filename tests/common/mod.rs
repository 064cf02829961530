//! In-memory backend shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use proteome_picker::api::types::{FilterCriteria, PageRequest, PageResult, RawDownload, Row};
use proteome_picker::api::{ApiError, ProteomeApi, DOWNLOAD_ENDPOINT};
use std::sync::Mutex;

/// Serves `total` synthetic rows and records every request it sees.
pub struct FakeBackend {
    pub total: usize,
    pub download: Mutex<Option<Result<RawDownload, String>>>,
    pub filter_calls: Mutex<Vec<PageRequest>>,
    pub download_calls: Mutex<Vec<FilterCriteria>>,
}

impl FakeBackend {
    pub fn with_rows(total: usize) -> Self {
        Self {
            total,
            download: Mutex::new(None),
            filter_calls: Mutex::new(Vec::new()),
            download_calls: Mutex::new(Vec::new()),
        }
    }

    pub fn answer_download(&self, raw: RawDownload) {
        *self.download.lock().unwrap() = Some(Ok(raw));
    }

    pub fn fail_download(&self, message: &str) {
        *self.download.lock().unwrap() = Some(Err(message.to_string()));
    }

    pub fn filter_requests(&self) -> Vec<PageRequest> {
        self.filter_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProteomeApi for FakeBackend {
    async fn filter(&self, request: &PageRequest) -> Result<PageResult, ApiError> {
        self.filter_calls.lock().unwrap().push(request.clone());
        let size = request.page_size as usize;
        let start = (request.page as usize - 1) * size;
        let preview = (start..(start + size).min(self.total))
            .map(|i| Row {
                proteome_id: format!("UP{:09}", i),
                organism: format!("Organism {}", i),
                protein_count: 100 + i as u64,
            })
            .collect();
        Ok(PageResult {
            count: self.total as u64,
            page: request.page,
            page_size: Some(request.page_size),
            preview,
        })
    }

    async fn download_fasta(&self, criteria: &FilterCriteria) -> Result<RawDownload, ApiError> {
        self.download_calls.lock().unwrap().push(criteria.clone());
        match self.download.lock().unwrap().clone() {
            Some(Ok(raw)) => Ok(raw),
            Some(Err(message)) => Err(ApiError::Transport {
                endpoint: DOWNLOAD_ENDPOINT,
                message,
            }),
            None => Err(ApiError::Transport {
                endpoint: DOWNLOAD_ENDPOINT,
                message: "no answer configured".to_string(),
            }),
        }
    }
}
