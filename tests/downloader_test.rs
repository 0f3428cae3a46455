// Tests for SpreadsheetDownloader
// Uses mockito for HTTP mocking

use std::time::Duration;

use mockito::Server;
use rbnz_series_scraper::importers::downloader::{DownloadError, SpreadsheetDownloader};
use reqwest::Url;

fn index_html(rows: &str) -> String {
    format!(
        r#"<html><body>
        <div class="table-wrapper"><table><tbody>{rows}</tbody></table></div>
        </body></html>"#
    )
}

// Delay of zero keeps the tests fast; the pause length itself is
// configuration, not logic.
fn test_downloader(index_url: String) -> SpreadsheetDownloader {
    SpreadsheetDownloader::new(index_url, Duration::from_secs(0))
}

#[tokio::test]
async fn test_list_download_links_filters_to_xlsx() {
    let mut server = Server::new_async().await;

    let body = index_html(
        r#"<tr>
             <td>Exchange rates</td><td>B1</td><td>Daily</td>
             <td><a href="/stats/b1-daily.xlsx">xlsx</a>
                 <a href="/stats/b1-daily.pdf">pdf</a></td>
           </tr>
           <tr>
             <td>Wholesale rates</td><td>B2</td><td>Monthly</td>
             <td><a href="/stats/b2-monthly.XLSX">xlsx</a></td>
           </tr>"#,
    );

    let mock = server
        .mock("GET", "/index")
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body(body)
        .create_async()
        .await;

    let downloader = test_downloader(server.url() + "/index");
    let links = downloader.list_download_links().await.unwrap();

    assert_eq!(links.len(), 2);
    assert!(links[0].path().ends_with("/stats/b1-daily.xlsx"));
    assert!(links[1].path().ends_with("/stats/b2-monthly.XLSX"));

    mock.assert_async().await;
}

#[tokio::test]
async fn test_list_download_links_empty_page() {
    let mut server = Server::new_async().await;

    let mock = server
        .mock("GET", "/index")
        .with_status(200)
        .with_body("<html><body><p>No data today</p></body></html>")
        .create_async()
        .await;

    let downloader = test_downloader(server.url() + "/index");
    let links = downloader.list_download_links().await.unwrap();
    assert!(links.is_empty());

    mock.assert_async().await;
}

#[tokio::test]
async fn test_index_page_failure_propagates() {
    let mut server = Server::new_async().await;

    let mock = server
        .mock("GET", "/index")
        .with_status(500)
        .create_async()
        .await;

    let downloader = test_downloader(server.url() + "/index");
    let result = downloader.list_download_links().await;
    assert!(matches!(result, Err(DownloadError::Http(_))));

    mock.assert_async().await;
}

#[tokio::test]
async fn test_download_writes_file_named_from_url() {
    let mut server = Server::new_async().await;

    let mock = server
        .mock("GET", "/stats/b1-daily.xlsx")
        .match_query(mockito::Matcher::Any)
        .with_status(200)
        .with_body(b"fake workbook bytes")
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let downloader = test_downloader(server.url() + "/index");
    let url = Url::parse(&(server.url() + "/stats/b1-daily.xlsx?revision=4")).unwrap();

    let path = downloader.download(&url, dir.path()).await.unwrap();
    assert_eq!(path.file_name().unwrap(), "b1-daily.xlsx");
    assert_eq!(std::fs::read(&path).unwrap(), b"fake workbook bytes");

    mock.assert_async().await;
}

#[tokio::test]
async fn test_download_404_is_typed() {
    let mut server = Server::new_async().await;

    let mock = server
        .mock("GET", "/stats/gone.xlsx")
        .with_status(404)
        .create_async()
        .await;

    let downloader = test_downloader(server.url() + "/index");
    let url = Url::parse(&(server.url() + "/stats/gone.xlsx")).unwrap();

    match downloader.download(&url, tempfile::tempdir().unwrap().path()).await {
        Err(DownloadError::NotFound(msg)) => assert!(msg.contains("gone.xlsx")),
        other => panic!("Expected NotFound, got {other:?}"),
    }

    mock.assert_async().await;
}

#[tokio::test]
async fn test_download_all_skips_failed_files() {
    let mut server = Server::new_async().await;

    let body = index_html(
        r#"<tr><td>a</td><td>b</td><td>c</td>
             <td><a href="/stats/ok.xlsx">xlsx</a></td></tr>
           <tr><td>a</td><td>b</td><td>c</td>
             <td><a href="/stats/missing.xlsx">xlsx</a></td></tr>"#,
    );

    let index = server
        .mock("GET", "/index")
        .with_status(200)
        .with_body(body)
        .create_async()
        .await;
    let ok = server
        .mock("GET", "/stats/ok.xlsx")
        .with_status(200)
        .with_body(b"workbook")
        .create_async()
        .await;
    let missing = server
        .mock("GET", "/stats/missing.xlsx")
        .with_status(404)
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let downloader = test_downloader(server.url() + "/index");
    let files = downloader.download_all(dir.path()).await.unwrap();

    // The failed file is simply absent; the run continues.
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].file_name().unwrap(), "ok.xlsx");

    index.assert_async().await;
    ok.assert_async().await;
    missing.assert_async().await;
}
