pub mod downloader;
pub mod workbook_importer;

pub use downloader::SpreadsheetDownloader;
pub use workbook_importer::{WorkbookExtract, WorkbookImporter};
