//! Async orchestration over the B-rep kernel: fetches and caches product data
//! per object, builds pick interfaces once, and answers measurement, picking
//! and outline queries directly or through a channel worker.

pub mod dispatch;
pub mod download;
pub mod error;
pub mod messages;
pub mod scene;
pub mod worker;

pub use dispatch::dispatch;
pub use download::{DirectoryDownloader, Downloader, OfflineCache};
pub use error::{DownloadError, SceneError};
pub use messages::{Request, Response};
pub use scene::{Scene, SceneConfig};
pub use worker::{WorkerHandle, spawn_worker};
