use crate::api::types::{FilterCriteria, TaxaFile};
use anyhow::{Context, Result};
use std::path::Path;

/// Editable filter inputs. Both controllers read criteria from here at the
/// moment an action fires, never from a cached copy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterForm {
    pub taxa_list: String,
    /// Path typed by the user; blank means no file.
    pub taxa_file_path: String,
    pub remove_redundancy: bool,
}

impl FilterForm {
    pub fn criteria(&self) -> Result<FilterCriteria> {
        let path = self.taxa_file_path.trim();
        let taxa_file = if path.is_empty() {
            None
        } else {
            Some(read_taxa_file(Path::new(path))?)
        };
        Ok(FilterCriteria {
            taxa_list: self.taxa_list.clone(),
            taxa_file,
            remove_redundancy: self.remove_redundancy,
        })
    }
}

fn read_taxa_file(path: &Path) -> Result<TaxaFile> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read taxa file: {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "taxa.txt".to_string());
    Ok(TaxaFile { file_name, bytes })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_path_means_no_file() {
        let form = FilterForm {
            taxa_list: "P12345".to_string(),
            taxa_file_path: "   ".to_string(),
            remove_redundancy: true,
        };
        let criteria = form.criteria().unwrap();
        assert_eq!(criteria.taxa_list, "P12345");
        assert!(criteria.remove_redundancy);
        assert!(criteria.taxa_file.is_none());
    }

    #[test]
    fn test_file_is_read_at_call_time() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("taxa.txt");
        std::fs::write(&path, "homo sapiens\n").unwrap();

        let form = FilterForm {
            taxa_file_path: path.display().to_string(),
            ..Default::default()
        };
        let first = form.criteria().unwrap().taxa_file.unwrap();
        assert_eq!(first.file_name, "taxa.txt");
        assert_eq!(first.bytes, b"homo sapiens\n");

        std::fs::write(&path, "mus musculus\n").unwrap();
        let second = form.criteria().unwrap().taxa_file.unwrap();
        assert_eq!(second.bytes, b"mus musculus\n");
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let form = FilterForm {
            taxa_file_path: "/definitely/not/here/taxa.txt".to_string(),
            ..Default::default()
        };
        let err = form.criteria().unwrap_err();
        assert!(err.to_string().contains("Failed to read taxa file"));
    }
}
