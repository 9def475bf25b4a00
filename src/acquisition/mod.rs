pub mod downloader;

pub use downloader::{DownloadReport, Downloader};
