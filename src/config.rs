use std::env;

/// Sheet holding the observation grid in an RBNZ statistical workbook.
pub const DATA_SHEET: &str = "Data";

/// Sheet holding the series metadata table.
pub const DEFINITIONS_SHEET: &str = "Series Definitions";

/// Row of the "Data" sheet carrying series identifiers (0-indexed).
pub const ID_HEADER_ROW: u32 = 4;

/// First data row of the "Data" sheet; the date axis starts here.
pub const DATA_START_ROW: u32 = 5;

/// Series that must never be persisted (discontinued/restricted).
pub const EXCLUDED_SERIES: &[&str] = &["EXRT.YS45.ZZB17"];

#[derive(Debug, Clone)]
pub struct Config {
    pub index_url: String,
    pub download_delay_secs: u64,
}

impl Config {
    pub fn from_env() -> Self {
        Config {
            index_url: env::var("RBNZ_INDEX_URL").unwrap_or_else(|_| {
                "https://www.rbnz.govt.nz/statistics/series/data-file-index-page".to_string()
            }),
            // Portal terms of use require a pause between file requests
            download_delay_secs: env::var("DOWNLOAD_DELAY_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60),
        }
    }
}
