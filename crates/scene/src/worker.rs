//! A scene owned by a background task, queried over a channel.

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::dispatch::dispatch;
use crate::download::Downloader;
use crate::error::SceneError;
use crate::messages::{Request, Response};
use crate::scene::Scene;

type Job = (Request, oneshot::Sender<Response>);

/// Cloneable handle to a running scene worker.
#[derive(Debug, Clone)]
pub struct WorkerHandle {
    tx: mpsc::Sender<Job>,
}

impl WorkerHandle {
    /// Send a request and wait for its response.
    pub async fn call(&self, request: Request) -> Result<Response, SceneError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send((request, reply))
            .await
            .map_err(|_| SceneError::WorkerClosed)?;
        rx.await.map_err(|_| SceneError::WorkerClosed)
    }
}

/// Move `scene` onto a tokio task that answers requests in arrival order.
/// The task ends when every handle is dropped.
pub fn spawn_worker<D: Downloader>(scene: Scene<D>, capacity: usize) -> WorkerHandle {
    let (tx, mut rx) = mpsc::channel::<Job>(capacity.max(1));
    tokio::spawn(async move {
        info!("scene worker started");
        while let Some((request, reply)) = rx.recv().await {
            let response = dispatch(&scene, request).await;
            if reply.send(response).is_err() {
                debug!("caller dropped before the response was ready");
            }
        }
        info!("scene worker stopped");
    });
    WorkerHandle { tx }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::SceneConfig;
    use crate::scene::tests::{MemoryDownloader, PLATE};
    use brep_kernel::GeometryFactory;

    #[tokio::test]
    async fn test_worker_answers_in_order() {
        let scene = Scene::new(
            MemoryDownloader::new(&[("brep/plate.json", PLATE)]),
            SceneConfig::default(),
            GeometryFactory::default(),
        );
        let worker = spawn_worker(scene, 4);
        let manhole = worker
            .call(Request::Manhole {
                object_id: "plate".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(manhole, Response::Manhole { values: None });
        assert_eq!(worker.call(Request::Reload).await.unwrap(), Response::Reloaded);
    }

    #[tokio::test]
    async fn test_handles_share_one_worker() {
        let scene = Scene::new(
            MemoryDownloader::new(&[]),
            SceneConfig::default(),
            GeometryFactory::default(),
        );
        let worker = spawn_worker(scene, 1);
        let other = worker.clone();
        let (a, b) = tokio::join!(worker.call(Request::Reload), other.call(Request::Reload));
        assert_eq!(a.unwrap(), Response::Reloaded);
        assert_eq!(b.unwrap(), Response::Reloaded);
    }
}
