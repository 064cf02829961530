pub mod download;
pub mod form;
pub mod query;

pub use download::{DownloadController, DownloadOutcome, DownloadReport};
pub use form::FilterForm;
pub use query::{PageOutcome, QueryController, TableView};
