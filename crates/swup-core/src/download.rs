//! Artifact download.
//!
//! Streams the response body straight to disk; nothing is buffered in
//! memory. Failures are not retried.

use std::path::Path;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::error::{Error, Result};

/// Fetches a URL into a local file.
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Download `url` to `dest`, returning the number of bytes written.
    async fn download(&self, url: &str, dest: &Path) -> Result<u64>;
}

/// [`Downloader`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpDownloader {
    client: Client,
}

impl HttpDownloader {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    async fn download(&self, url: &str, dest: &Path) -> Result<u64> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, crate::USER_AGENT)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| Error::network(url, e))?;

        let mut file = File::create(dest).await?;
        let mut stream = response.bytes_stream();
        let mut downloaded: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| Error::network(url, e))?;
            file.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;
        }

        file.flush().await?;
        Ok(downloaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_download_writes_body() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/artifact.tar.gz")
            .with_status(200)
            .with_body(b"payload-bytes")
            .create_async()
            .await;

        let dir = tempdir().unwrap();
        let dest = dir.path().join("artifact.tar.gz");
        let downloader = HttpDownloader::new(Client::new());
        let url = format!("{}/artifact.tar.gz", server.url());

        let n = downloader.download(&url, &dest).await.unwrap();
        assert_eq!(n, 13);
        assert_eq!(std::fs::read(&dest).unwrap(), b"payload-bytes");
    }

    #[tokio::test]
    async fn test_download_404_is_network_error() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/missing.pkg")
            .with_status(404)
            .create_async()
            .await;

        let dir = tempdir().unwrap();
        let downloader = HttpDownloader::new(Client::new());
        let url = format!("{}/missing.pkg", server.url());

        let err = downloader
            .download(&url, &dir.path().join("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Network { url: ref u, .. } if *u == url));
        assert!(!dir.path().join("x").exists());
    }
}
