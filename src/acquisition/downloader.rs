use crate::error::{ProcessingError, Result};
use crate::models::AcquisitionSettings;
use reqwest::Client;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info};

/// Outcome of a download run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadReport {
    pub downloaded: Vec<String>,
    pub skipped: Vec<String>,
}

impl DownloadReport {
    pub fn summary(&self) -> String {
        format!(
            "Downloaded {} file(s), skipped {} already present",
            self.downloaded.len(),
            self.skipped.len()
        )
    }
}

/// Fetch-if-absent of raster files from an object store prefix.
pub struct Downloader {
    client: Client,
    base_url: String,
    max_concurrent: usize,
}

impl Downloader {
    pub fn new(base_url: &str, timeout: Duration, max_concurrent: usize) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.to_string(),
            max_concurrent: max_concurrent.max(1),
        })
    }

    pub fn from_settings(settings: &AcquisitionSettings) -> Result<Self> {
        Self::new(
            &settings.base_url,
            Duration::from_secs(settings.timeout_secs),
            settings.max_concurrent,
        )
    }

    pub fn url_for(&self, file_name: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), file_name)
    }

    /// Download every missing file into `data_dir`. Files already present are left alone.
    pub async fn fetch_missing(&self, file_names: &[String], data_dir: &Path) -> Result<DownloadReport> {
        tokio::fs::create_dir_all(data_dir).await?;

        let mut report = DownloadReport::default();
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut join_set = JoinSet::new();

        for name in file_names {
            let target = data_dir.join(name);
            if target.exists() {
                info!(file = %name, "already present, skipping download");
                report.skipped.push(name.clone());
                continue;
            }

            let client = self.client.clone();
            let url = self.url_for(name);
            let name = name.clone();
            let dir = data_dir.to_path_buf();
            let semaphore = Arc::clone(&semaphore);

            join_set.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| ProcessingError::Configuration(e.to_string()))?;
                let bytes = fetch_to(&client, &url, &dir, &target).await?;
                info!(file = %name, bytes, "downloaded");
                Ok::<String, ProcessingError>(name)
            });
        }

        while let Some(result) = join_set.join_next().await {
            match result {
                Ok(Ok(name)) => report.downloaded.push(name),
                Ok(Err(e)) => return Err(e),
                Err(e) => return Err(ProcessingError::TaskJoin(e)),
            }
        }

        report.downloaded.sort();
        Ok(report)
    }
}

/// Stream `url` into a temporary file in `dir`, then move it to `target`.
async fn fetch_to(client: &Client, url: &str, dir: &Path, target: &Path) -> Result<u64> {
    debug!(%url, "requesting");
    let mut response = client.get(url).send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(ProcessingError::Download {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let mut partial = PartialFile::create(dir).await?;
    while let Some(chunk) = response.chunk().await? {
        partial.append(&chunk).await?;
    }
    partial.commit(target).await
}

/// A download in progress: a temporary file next to its final location.
/// Dropping it without `commit` removes the temporary file.
struct PartialFile {
    temp: NamedTempFile,
    file: tokio::fs::File,
    written: u64,
}

impl PartialFile {
    async fn create(dir: &Path) -> Result<Self> {
        let dir = dir.to_path_buf();
        let temp = tokio::task::spawn_blocking(move || NamedTempFile::new_in(dir)).await??;
        let file = tokio::fs::File::from_std(temp.reopen()?);

        Ok(Self {
            temp,
            file,
            written: 0,
        })
    }

    async fn append(&mut self, chunk: &[u8]) -> Result<()> {
        self.file.write_all(chunk).await?;
        self.written += chunk.len() as u64;
        Ok(())
    }

    /// Flush and move the file to `target`, returning the number of bytes written.
    async fn commit(mut self, target: &Path) -> Result<u64> {
        self.file.flush().await?;
        self.file.sync_all().await?;

        let Self { temp, file, written } = self;
        drop(file);

        let target = target.to_path_buf();
        tokio::task::spawn_blocking(move || temp.persist(target))
            .await?
            .map_err(|e| ProcessingError::Io(e.error))?;

        Ok(written)
    }
}
