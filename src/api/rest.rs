use super::types::*;
use super::{ApiError, ProteomeApi, DOWNLOAD_ENDPOINT, FILTER_ENDPOINT};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use std::time::Duration;

pub struct ProteomeRest {
    client: Client,
    base_url: String,
}

impl ProteomeRest {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder().pool_max_idle_per_host(4);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Multipart body: text fields first, then the optional taxa file.
fn multipart_form(fields: Vec<(&'static str, String)>, taxa_file: Option<&TaxaFile>) -> Form {
    let mut form = fields
        .into_iter()
        .fold(Form::new(), |form, (name, value)| form.text(name, value));
    if let Some(file) = taxa_file {
        let part = Part::bytes(file.bytes.clone()).file_name(file.file_name.clone());
        form = form.part("taxa_file", part);
    }
    form
}

fn transport(endpoint: &'static str, err: reqwest::Error) -> ApiError {
    ApiError::Transport {
        endpoint,
        message: err.to_string(),
    }
}

#[async_trait]
impl ProteomeApi for ProteomeRest {
    async fn filter(&self, request: &PageRequest) -> Result<PageResult, ApiError> {
        let form = multipart_form(request.form_fields(), request.criteria.taxa_file.as_ref());

        // page/page_size also go on the query string; some backends only read them there.
        let resp = self
            .client
            .post(self.url(FILTER_ENDPOINT))
            .query(&[("page", request.page), ("page_size", request.page_size)])
            .multipart(form)
            .send()
            .await
            .map_err(|e| transport(FILTER_ENDPOINT, e))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                endpoint: FILTER_ENDPOINT,
                status: status.as_u16(),
                body,
            });
        }

        let bytes = resp.bytes().await.map_err(|e| transport(FILTER_ENDPOINT, e))?;
        serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode {
            endpoint: FILTER_ENDPOINT,
            message: e.to_string(),
        })
    }

    async fn download_fasta(&self, criteria: &FilterCriteria) -> Result<RawDownload, ApiError> {
        let form = multipart_form(criteria.form_fields(), criteria.taxa_file.as_ref());

        let resp = self
            .client
            .post(self.url(DOWNLOAD_ENDPOINT))
            .multipart(form)
            .send()
            .await
            .map_err(|e| transport(DOWNLOAD_ENDPOINT, e))?;

        let status = resp.status().as_u16();
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = resp
            .bytes()
            .await
            .map_err(|e| transport(DOWNLOAD_ENDPOINT, e))?
            .to_vec();

        tracing::debug!(
            status,
            content_type = ?content_type,
            bytes = body.len(),
            "download response received"
        );

        Ok(RawDownload {
            status,
            content_type,
            body,
        })
    }
}
