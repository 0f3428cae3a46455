use reqwest::{Client, Url};
use scraper::{Html, Selector};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("File not found (404): {0}")]
    NotFound(String),

    #[error("Server error (5xx): {0}")]
    ServerError(String),

    #[error("Invalid index URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to write downloaded file: {0}")]
    Io(#[from] std::io::Error),
}

/// Downloader for the RBNZ statistics data file index
///
/// The index page lists one table row per statistical release; the fourth
/// cell of each row holds the download links. Only xlsx links are taken.
/// The portal's terms of use require a pause between successive file
/// requests, so downloads are strictly sequential with an enforced delay.
pub struct SpreadsheetDownloader {
    client: Client,
    index_url: String,
    delay: Duration,
}

impl SpreadsheetDownloader {
    pub fn new(index_url: impl Into<String>, delay: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(60))
                .build()
                .expect("Failed to create HTTP client"),
            index_url: index_url.into(),
            delay,
        }
    }

    /// Spreadsheet URLs from the index page, in page order.
    pub async fn list_download_links(&self) -> Result<Vec<Url>, DownloadError> {
        debug!("Fetching index page: {}", self.index_url);
        let response = self
            .client
            .get(&self.index_url)
            .send()
            .await?
            .error_for_status()?;
        let html = response.text().await?;
        debug!("Retrieved index page, size: {} bytes", html.len());

        let base = Url::parse(&self.index_url)
            .map_err(|e| DownloadError::InvalidUrl(format!("{}: {e}", self.index_url)))?;
        Ok(parse_download_links(&html, &base))
    }

    /// Download one spreadsheet into `dest_dir`, returning the local path.
    ///
    /// The file name is the URL's last path segment; the query string does
    /// not take part in it.
    pub async fn download(&self, url: &Url, dest_dir: &Path) -> Result<PathBuf, DownloadError> {
        let filename = filename_from_url(url);
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();

        if status.is_success() {
            let bytes = response.bytes().await?;
            debug!("Downloaded {filename} ({} bytes)", bytes.len());
            let path = dest_dir.join(&filename);
            std::fs::write(&path, &bytes)?;
            Ok(path)
        } else if status.as_u16() == 404 {
            Err(DownloadError::NotFound(format!(
                "{filename} not found on server"
            )))
        } else if status.is_server_error() {
            Err(DownloadError::ServerError(format!(
                "Server error {status} while downloading {filename}"
            )))
        } else {
            Err(DownloadError::Http(
                response.error_for_status().unwrap_err(),
            ))
        }
    }

    /// Download every spreadsheet listed on the index page into `dest_dir`.
    ///
    /// Files are fetched one at a time with the configured delay before each
    /// subsequent request. A failed individual download is logged and
    /// skipped; it is simply absent from the returned file set. An index
    /// page failure propagates.
    pub async fn download_all(&self, dest_dir: &Path) -> Result<Vec<PathBuf>, DownloadError> {
        let links = self.list_download_links().await?;
        info!("Found {} spreadsheet links on index page", links.len());

        let mut files = Vec::new();
        for (i, url) in links.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.delay).await;
            }
            match self.download(url, dest_dir).await {
                Ok(path) => files.push(path),
                Err(e) => warn!("Skipping {url}: {e}"),
            }
        }

        info!("Downloaded {} of {} spreadsheets", files.len(), links.len());
        Ok(files)
    }
}

/// Extract spreadsheet links from the index page HTML.
///
/// Links live in the fourth cell of each `.table-wrapper` body row. Relative
/// hrefs resolve against `base`; anything whose path is not an .xlsx file is
/// dropped (case-insensitive).
pub fn parse_download_links(html: &str, base: &Url) -> Vec<Url> {
    let document = Html::parse_document(html);
    let row_selector = Selector::parse(".table-wrapper tbody > tr").unwrap();
    let link_selector = Selector::parse("td:nth-child(4) a").unwrap();

    let mut urls = Vec::new();
    for row in document.select(&row_selector) {
        for link in row.select(&link_selector) {
            let Some(href) = link.value().attr("href") else {
                continue;
            };
            match base.join(href) {
                Ok(url) if is_spreadsheet(&url) => urls.push(url),
                Ok(_) => {}
                Err(e) => warn!("Ignoring unparseable link {href}: {e}"),
            }
        }
    }

    urls
}

fn is_spreadsheet(url: &Url) -> bool {
    url.path().to_ascii_lowercase().ends_with(".xlsx")
}

/// Local file name for a download URL: last path segment, query dropped.
pub fn filename_from_url(url: &Url) -> String {
    url.path_segments()
        .and_then(|segments| segments.last())
        .filter(|segment| !segment.is_empty())
        .unwrap_or("download.xlsx")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_is_last_path_segment_without_query() {
        let url = Url::parse("https://example.org/stats/hb1-daily.xlsx?revision=3").unwrap();
        assert_eq!(filename_from_url(&url), "hb1-daily.xlsx");
    }

    #[test]
    fn filename_falls_back_for_bare_host() {
        let url = Url::parse("https://example.org/").unwrap();
        assert_eq!(filename_from_url(&url), "download.xlsx");
    }

    #[test]
    fn parses_links_from_fourth_column_only() {
        let html = r#"
            <div class="table-wrapper"><table><tbody>
              <tr>
                <td><a href="/one.xlsx">wrong column</a></td>
                <td>B1</td>
                <td>Daily</td>
                <td><a href="/stats/b1-daily.xlsx">xlsx</a>
                    <a href="/stats/b1-daily.pdf">pdf</a></td>
              </tr>
              <tr>
                <td>name</td>
                <td>B2</td>
                <td>Monthly</td>
                <td><a href="https://cdn.example.org/b2.XLSX?v=2">xlsx</a></td>
              </tr>
            </tbody></table></div>
        "#;
        let base = Url::parse("https://www.rbnz.govt.nz/statistics/index").unwrap();

        let links = parse_download_links(html, &base);
        assert_eq!(
            links,
            vec![
                Url::parse("https://www.rbnz.govt.nz/stats/b1-daily.xlsx").unwrap(),
                Url::parse("https://cdn.example.org/b2.XLSX?v=2").unwrap(),
            ]
        );
    }

    #[test]
    fn ignores_rows_outside_the_table_wrapper() {
        let html = r#"
            <table><tbody><tr>
              <td>a</td><td>b</td><td>c</td>
              <td><a href="/elsewhere.xlsx">xlsx</a></td>
            </tr></tbody></table>
        "#;
        let base = Url::parse("https://www.rbnz.govt.nz/statistics/index").unwrap();
        assert!(parse_download_links(html, &base).is_empty());
    }
}
