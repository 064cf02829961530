use crate::controller::{FilterForm, TableView};
use std::collections::VecDeque;

const MAX_LOGS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    TaxaList,
    TaxaFile,
    RemoveRedundancy,
}

impl FormField {
    pub fn next(self) -> Self {
        match self {
            FormField::TaxaList => FormField::TaxaFile,
            FormField::TaxaFile => FormField::RemoveRedundancy,
            FormField::RemoveRedundancy => FormField::TaxaList,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            FormField::TaxaList => FormField::RemoveRedundancy,
            FormField::TaxaFile => FormField::TaxaList,
            FormField::RemoveRedundancy => FormField::TaxaFile,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub title: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub time: String,
    pub level: String,
    pub message: String,
}

/// Everything the renderer needs. Controllers push their view in via `sync_*`.
#[derive(Debug, Clone)]
pub struct AppState {
    pub server: String,
    pub form: FilterForm,
    pub focus: FormField,
    pub table: TableView,
    pub current_page: u32,
    pub page_size: u32,
    pub pending_pages: usize,
    pub pending_downloads: usize,
    pub alert: Option<Alert>,
    pub status: String,
    pub logs: VecDeque<LogEntry>,
}

impl AppState {
    pub fn new(server: &str, page_size: u32) -> Self {
        Self {
            server: server.to_string(),
            form: FilterForm::default(),
            focus: FormField::TaxaList,
            table: TableView::default(),
            current_page: 1,
            page_size,
            pending_pages: 0,
            pending_downloads: 0,
            alert: None,
            status: String::new(),
            logs: VecDeque::with_capacity(MAX_LOGS),
        }
    }

    pub fn push_log(&mut self, level: &str, message: String) {
        let time = chrono::Local::now().format("%H:%M:%S%.3f").to_string();
        if self.logs.len() >= MAX_LOGS {
            self.logs.pop_front();
        }
        self.logs.push_back(LogEntry {
            time,
            level: level.to_string(),
            message,
        });
    }

    pub fn show_alert(&mut self, title: &str, message: String) {
        self.alert = Some(Alert {
            title: title.to_string(),
            message,
        });
    }

    pub fn dismiss_alert(&mut self) {
        self.alert = None;
    }

    /// The text field under focus, if the focused field is one.
    pub fn focused_text_mut(&mut self) -> Option<&mut String> {
        match self.focus {
            FormField::TaxaList => Some(&mut self.form.taxa_list),
            FormField::TaxaFile => Some(&mut self.form.taxa_file_path),
            FormField::RemoveRedundancy => None,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.pending_pages > 0 || self.pending_downloads > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_focus_cycles_both_ways() {
        let mut f = FormField::TaxaList;
        for _ in 0..3 {
            f = f.next();
        }
        assert_eq!(f, FormField::TaxaList);
        assert_eq!(FormField::TaxaList.prev(), FormField::RemoveRedundancy);
    }

    #[test]
    fn test_log_is_bounded() {
        let mut state = AppState::new("http://x", 30);
        for i in 0..250 {
            state.push_log("INFO", format!("line {i}"));
        }
        assert_eq!(state.logs.len(), 200);
        assert_eq!(state.logs.front().unwrap().message, "line 50");
    }

    #[test]
    fn test_checkbox_has_no_text() {
        let mut state = AppState::new("http://x", 30);
        state.focus = FormField::RemoveRedundancy;
        assert!(state.focused_text_mut().is_none());
        state.focus = FormField::TaxaFile;
        state.focused_text_mut().unwrap().push_str("a.txt");
        assert_eq!(state.form.taxa_file_path, "a.txt");
    }
}
