use serde::{Deserialize, Serialize};

/// An uploaded taxa file, read from disk when the criteria are built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxaFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Filter inputs sent with every request. Rebuilt from the form each time.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterCriteria {
    pub taxa_list: String,
    pub taxa_file: Option<TaxaFile>,
    pub remove_redundancy: bool,
}

impl FilterCriteria {
    /// Text fields of the multipart body, in the order the backend documents them.
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("taxa_list", self.taxa_list.clone()),
            ("remove_redundancy", self.remove_redundancy.to_string()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub criteria: FilterCriteria,
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = self.criteria.form_fields();
        fields.push(("page", self.page.to_string()));
        fields.push(("page_size", self.page_size.to_string()));
        fields
    }
}

/// /filter response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageResult {
    pub count: u64,
    pub page: u32,
    /// Echoed by the backend; informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
    #[serde(default)]
    pub preview: Vec<Row>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    #[serde(rename = "Proteome Id")]
    pub proteome_id: String,
    #[serde(rename = "Organism")]
    pub organism: String,
    #[serde(rename = "Protein count")]
    pub protein_count: u64,
}

/// Unclassified /download_fasta answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDownload {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl RawDownload {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// JSON error shapes the download endpoint may send instead of a file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DownloadErrorBody {
    #[serde(default)]
    pub errors: Option<Vec<String>>,
    #[serde(default)]
    pub error: Option<String>,
}
