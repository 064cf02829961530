use super::form::FilterForm;
use crate::api::types::{DownloadErrorBody, FilterCriteria, RawDownload};
use crate::api::{ApiError, ProteomeApi};
use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

pub const TRANSPORT_FAILURE_MESSAGE: &str =
    "Failed to download FASTA file, the Uniprot API may be down. Please try again later.";

/// Title shown above an application-reported error list.
pub const ERROR_REPORT_TITLE: &str = "Errors occurred while downloading FASTA files";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    FileBlob(Vec<u8>),
    ErrorReport { errors: Vec<String> },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClassifyError {
    #[error("error report is not valid JSON: {0}")]
    MalformedReport(String),
}

pub fn is_json_media_type(content_type: &str) -> bool {
    content_type.to_ascii_lowercase().contains("application/json")
}

/// Decide what a download response is from its declared content type alone.
pub fn classify(
    content_type: Option<&str>,
    body: Vec<u8>,
) -> Result<DownloadOutcome, ClassifyError> {
    if !content_type.is_some_and(is_json_media_type) {
        return Ok(DownloadOutcome::FileBlob(body));
    }

    let text = String::from_utf8_lossy(&body);
    let report: DownloadErrorBody =
        serde_json::from_str(&text).map_err(|e| ClassifyError::MalformedReport(e.to_string()))?;

    let mut errors = report.errors.unwrap_or_default();
    if let Some(single) = report.error {
        errors.push(single);
    }
    Ok(DownloadOutcome::ErrorReport { errors })
}

/// Downloaded bytes staged in a temporary file next to the final target.
/// Dropping it removes the file, so a blob never outlives one save.
#[derive(Debug)]
pub struct StagedBlob {
    file: NamedTempFile,
}

impl StagedBlob {
    pub fn write_in(dir: &Path, bytes: &[u8]) -> Result<Self> {
        let mut file = tempfile::Builder::new()
            .prefix(".proteome-picker-")
            .suffix(".part")
            .tempfile_in(dir)
            .with_context(|| format!("Failed to stage download in {}", dir.display()))?;
        let path = file.path().to_path_buf();
        file.write_all(bytes)
            .and_then(|_| file.flush())
            .with_context(|| format!("Failed to stage download: {}", path.display()))?;
        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

/// Where downloaded files end up. `save_as` takes the staged blob by value;
/// whatever it does not persist is released when the blob drops.
pub trait DownloadSink: Send {
    fn stage(&mut self, bytes: &[u8]) -> Result<StagedBlob>;
    fn save_as(&mut self, blob: StagedBlob, file_name: &str) -> Result<PathBuf>;
}

/// Stages into the output directory, then renames onto the target name.
pub struct FsDownloadSink {
    output_dir: PathBuf,
}

impl FsDownloadSink {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }
}

impl DownloadSink for FsDownloadSink {
    fn stage(&mut self, bytes: &[u8]) -> Result<StagedBlob> {
        std::fs::create_dir_all(&self.output_dir).with_context(|| {
            format!("Failed to create output directory: {}", self.output_dir.display())
        })?;
        StagedBlob::write_in(&self.output_dir, bytes)
    }

    fn save_as(&mut self, blob: StagedBlob, file_name: &str) -> Result<PathBuf> {
        let target = self.output_dir.join(file_name);
        blob.file
            .persist(&target)
            .with_context(|| format!("Failed to save {}", target.display()))?;
        Ok(target)
    }
}

/// What the user should see once a download finishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadReport {
    Saved { path: PathBuf, bytes: usize },
    /// Application-reported errors, one per line.
    Errors { message: String },
    /// JSON answer carrying no errors; nothing to show.
    Empty,
    Failed { message: String },
}

impl DownloadReport {
    /// Alert text, if this report warrants one.
    pub fn alert(&self) -> Option<&str> {
        match self {
            DownloadReport::Errors { message } | DownloadReport::Failed { message } => {
                Some(message.as_str())
            }
            DownloadReport::Saved { .. } | DownloadReport::Empty => None,
        }
    }
}

pub struct DownloadController {
    file_name: String,
    sink: Box<dyn DownloadSink>,
    in_flight: usize,
}

impl DownloadController {
    pub fn new(file_name: &str, sink: Box<dyn DownloadSink>) -> Self {
        Self {
            file_name: file_name.to_string(),
            sink,
            in_flight: 0,
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Build the export criteria from the form as it is right now.
    pub fn begin(&mut self, form: &FilterForm) -> Result<FilterCriteria> {
        let criteria = form.criteria()?;
        self.in_flight += 1;
        tracing::info!(
            taxa_file = criteria.taxa_file.is_some(),
            remove_redundancy = criteria.remove_redundancy,
            "download requested"
        );
        Ok(criteria)
    }

    pub fn handle_response(
        &mut self,
        response: Result<RawDownload, ApiError>,
    ) -> DownloadReport {
        self.in_flight = self.in_flight.saturating_sub(1);

        let raw = match response {
            Ok(raw) => raw,
            Err(err) => {
                tracing::error!(error = %err, "error downloading FASTA file");
                return DownloadReport::Failed {
                    message: TRANSPORT_FAILURE_MESSAGE.to_string(),
                };
            }
        };

        let status = raw.status;
        let success = raw.is_success();
        let outcome = match classify(raw.content_type.as_deref(), raw.body) {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::error!(status, error = %err, "unreadable download error report");
                return DownloadReport::Failed {
                    message: format!("{}:\n{}", ERROR_REPORT_TITLE, err),
                };
            }
        };

        match outcome {
            DownloadOutcome::ErrorReport { errors } if errors.is_empty() => {
                tracing::warn!(status, "download returned JSON without errors");
                DownloadReport::Empty
            }
            DownloadOutcome::ErrorReport { errors } => {
                tracing::warn!(status, count = errors.len(), "download reported errors");
                DownloadReport::Errors {
                    message: errors.join("\n"),
                }
            }
            // A failed status with a non-JSON body is an error page, not a FASTA file.
            DownloadOutcome::FileBlob(_) if !success => {
                tracing::error!(status, "download failed with non-JSON error body");
                DownloadReport::Failed {
                    message: TRANSPORT_FAILURE_MESSAGE.to_string(),
                }
            }
            DownloadOutcome::FileBlob(bytes) => self.save(&bytes),
        }
    }

    fn save(&mut self, bytes: &[u8]) -> DownloadReport {
        let blob = match self.sink.stage(bytes) {
            Ok(blob) => blob,
            Err(e) => {
                let message = format!("{:#}", e);
                tracing::error!(error = %message, "failed to stage download");
                return DownloadReport::Failed { message };
            }
        };
        match self.sink.save_as(blob, &self.file_name) {
            Ok(path) => {
                tracing::info!(path = %path.display(), bytes = bytes.len(), "FASTA file saved");
                DownloadReport::Saved {
                    path,
                    bytes: bytes.len(),
                }
            }
            Err(e) => {
                let message = format!("{:#}", e);
                tracing::error!(error = %message, "failed to save download");
                DownloadReport::Failed { message }
            }
        }
    }

    /// begin + request + handle, for callers that can await in place.
    pub async fn download_export(
        &mut self,
        api: &dyn ProteomeApi,
        form: &FilterForm,
    ) -> DownloadReport {
        let criteria = match self.begin(form) {
            Ok(criteria) => criteria,
            Err(e) => {
                return DownloadReport::Failed {
                    message: format!("{:#}", e),
                }
            }
        };
        let response = api.download_fasta(&criteria).await;
        self.handle_response(response)
    }
}
