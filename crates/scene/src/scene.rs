//! Per-object caches and the async query surface.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use brep_kernel::geometry::point::Point3d;
use brep_kernel::geometry::transform::Transform;
use brep_kernel::{
    EntityRef, GeometryFactory, ManholeMeasureValues, MeasureEntity, MeasureSettings,
    MeasurementValues, PickConfig, PickInterface, PickResult, PickTolerance, ProductData,
    ProfilePoint, detect_manhole, measure, segment_profile,
};
use brep_outline::{OutlineConfig, ProjectedLoops, object_outlines, projected_loops};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info, instrument, warn};

use crate::download::{DirectoryDownloader, Downloader, OfflineCache};
use crate::error::SceneError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SceneConfig {
    /// Directory served by [`DirectoryDownloader`].
    pub asset_root: PathBuf,
    /// Directory of product payloads, relative to the asset root.
    pub product_dir: String,
    /// JSON object mapping object ids to payload names. Ids are used
    /// directly when absent.
    pub hash_table_path: Option<String>,
    pub offline_cache: bool,
    pub pick: PickConfig,
    pub outline: OutlineConfig,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            asset_root: PathBuf::from("."),
            product_dir: "brep".to_string(),
            hash_table_path: None,
            offline_cache: false,
            pick: PickConfig::default(),
            outline: OutlineConfig::default(),
        }
    }
}

/// Cached products, keyed by object id. `None` marks an object confirmed
/// missing.
type ProductCache = HashMap<String, Option<Arc<ProductData>>>;

pub struct Scene<D> {
    downloader: D,
    config: SceneConfig,
    factory: GeometryFactory,
    products: Mutex<ProductCache>,
    picks: Mutex<HashMap<String, Arc<PickInterface>>>,
    hashes: OnceCell<HashMap<String, String>>,
}

impl Scene<OfflineCache<DirectoryDownloader>> {
    /// Scene reading from `config.asset_root`.
    pub fn from_config(config: SceneConfig) -> Self {
        let downloader = OfflineCache::new(
            DirectoryDownloader::new(config.asset_root.clone()),
            config.offline_cache,
        );
        Self::new(downloader, config, GeometryFactory::default())
    }
}

impl<D: Downloader> Scene<D> {
    pub fn new(downloader: D, config: SceneConfig, factory: GeometryFactory) -> Self {
        Self {
            downloader,
            config,
            factory,
            products: Mutex::new(HashMap::new()),
            picks: Mutex::new(HashMap::new()),
            hashes: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    pub fn factory(&self) -> &GeometryFactory {
        &self.factory
    }

    pub fn downloader(&self) -> &D {
        &self.downloader
    }

    /// Drop every cached product and pick interface.
    pub async fn reload(&self) {
        self.products.lock().await.clear();
        self.picks.lock().await.clear();
        info!("scene caches cleared");
    }

    async fn hash_table(&self) -> Result<&HashMap<String, String>, SceneError> {
        self.hashes
            .get_or_try_init(|| async {
                let Some(path) = &self.config.hash_table_path else {
                    return Ok(HashMap::new());
                };
                let bytes = self.downloader.fetch(path).await.map_err(|e| {
                    SceneError::HashTable {
                        path: path.clone(),
                        reason: e.to_string(),
                    }
                })?;
                let table: HashMap<String, String> =
                    serde_json::from_slice(&bytes).map_err(|e| SceneError::HashTable {
                        path: path.clone(),
                        reason: e.to_string(),
                    })?;
                info!(entries = table.len(), "hash table loaded");
                Ok::<_, SceneError>(table)
            })
            .await
    }

    async fn product_path(&self, object_id: &str) -> Result<String, SceneError> {
        let table = self.hash_table().await?;
        let name = table.get(object_id).map_or(object_id, String::as_str);
        Ok(format!("{}/{}.json", self.config.product_dir, name))
    }

    /// Product data of an object, `None` when the object has none.
    ///
    /// Failed downloads are remembered as missing; malformed payloads are
    /// errors and are not cached.
    #[instrument(skip(self))]
    pub async fn product(&self, object_id: &str) -> Result<Option<Arc<ProductData>>, SceneError> {
        if let Some(entry) = self.products.lock().await.get(object_id) {
            return Ok(entry.clone());
        }
        let path = self.product_path(object_id).await?;
        let product = match self.downloader.fetch(&path).await {
            Ok(bytes) => {
                let product = ProductData::from_slice(&bytes)?;
                product.validate()?;
                debug!(
                    faces = product.faces.len(),
                    edges = product.edges.len(),
                    "product loaded"
                );
                Some(Arc::new(product))
            }
            Err(e) => {
                warn!(error = %e, "no product data, caching as missing");
                None
            }
        };
        self.products
            .lock()
            .await
            .insert(object_id.to_string(), product.clone());
        Ok(product)
    }

    async fn pick_interface(
        &self,
        object_id: &str,
    ) -> Result<Option<Arc<PickInterface>>, SceneError> {
        if let Some(pick) = self.picks.lock().await.get(object_id) {
            return Ok(Some(pick.clone()));
        }
        let Some(product) = self.product(object_id).await? else {
            return Ok(None);
        };
        let pick = Arc::new(PickInterface::build(
            &self.factory,
            &product,
            object_id,
            self.config.pick,
        )?);
        self.picks
            .lock()
            .await
            .insert(object_id.to_string(), pick.clone());
        Ok(Some(pick))
    }

    #[instrument(skip(self, tolerance))]
    pub async fn pick(
        &self,
        object_id: &str,
        position: &Point3d,
        tolerance: &PickTolerance,
    ) -> Result<Option<PickResult>, SceneError> {
        let Some(pick) = self.pick_interface(object_id).await? else {
            return Ok(None);
        };
        Ok(pick.pick(position, tolerance)?)
    }

    /// Measure one entity, or the distance between two.
    #[instrument(skip_all, fields(a = a.draw_kind(), b = b.map(|b| b.draw_kind())))]
    pub async fn measure(
        &self,
        a: &MeasureEntity,
        b: Option<&MeasureEntity>,
        settings_a: Option<&MeasureSettings>,
        settings_b: Option<&MeasureSettings>,
    ) -> Result<Option<MeasurementValues>, SceneError> {
        let product_a = self.product(a.object_id()).await?;
        let product_b = match b {
            Some(b) => self.product(b.object_id()).await?,
            None => None,
        };
        let values = measure(
            &self.factory,
            EntityRef::new(a, product_a.as_deref()),
            b.map(|b| EntityRef::new(b, product_b.as_deref())),
            settings_a,
            settings_b,
        )?;
        Ok(values)
    }

    #[instrument(skip(self, view))]
    pub async fn projected_loops(
        &self,
        object_id: &str,
        instance: usize,
        face: usize,
        view: &Transform,
    ) -> Result<Option<ProjectedLoops>, SceneError> {
        let Some(product) = self.product(object_id).await? else {
            return Ok(None);
        };
        let loops = projected_loops(
            &self.factory,
            &product,
            instance,
            face,
            view,
            &self.config.outline,
        )?;
        Ok(Some(loops))
    }

    #[instrument(skip(self, view))]
    pub async fn object_outlines(
        &self,
        object_id: &str,
        instance: usize,
        view: &Transform,
    ) -> Result<Option<ProjectedLoops>, SceneError> {
        let Some(product) = self.product(object_id).await? else {
            return Ok(None);
        };
        let loops = object_outlines(&self.factory, &product, instance, view, &self.config.outline)?;
        Ok(Some(loops))
    }

    #[instrument(skip(self))]
    pub async fn manhole(
        &self,
        object_id: &str,
    ) -> Result<Option<ManholeMeasureValues>, SceneError> {
        let Some(product) = self.product(object_id).await? else {
            return Ok(None);
        };
        Ok(detect_manhole(&self.factory, &product, object_id)?)
    }

    #[instrument(skip(self))]
    pub async fn segment_profile(
        &self,
        object_id: &str,
        instance: usize,
        segments: &[usize],
        step: f64,
    ) -> Result<Option<Vec<ProfilePoint>>, SceneError> {
        let Some(product) = self.product(object_id).await? else {
            return Ok(None);
        };
        Ok(Some(segment_profile(
            &self.factory,
            &product,
            instance,
            segments,
            step,
        )?))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::DownloadError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-memory assets with a fetch counter.
    pub(crate) struct MemoryDownloader {
        assets: HashMap<String, Vec<u8>>,
        pub fetches: AtomicUsize,
    }

    impl MemoryDownloader {
        pub(crate) fn new(assets: &[(&str, &str)]) -> Self {
            Self {
                assets: assets
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.as_bytes().to_vec()))
                    .collect(),
                fetches: AtomicUsize::new(0),
            }
        }
    }

    impl Downloader for MemoryDownloader {
        async fn fetch(&self, path: &str) -> Result<Vec<u8>, DownloadError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.assets.get(path).cloned().ok_or(DownloadError::Status {
                path: path.to_string(),
                status: 404,
            })
        }
    }

    /// A 1 m square plate at z = 0 with one isolated line segment above it.
    pub(crate) const PLATE: &str = r#"{
        "vertices": [
            {"position": [0, 0, 0]}, {"position": [1, 0, 0]},
            {"position": [1, 1, 0]}, {"position": [0, 1, 0]}
        ],
        "geometries": [{"shells": [0], "curveSegments": [0]}],
        "instances": [{"geometry": 0}],
        "shells": [{"faces": [0]}],
        "faces": [{"surface": 0, "outerLoop": 0}],
        "loops": [{"halfEdges": [0, 1, 2, 3]}],
        "surfaces": [{"kind": "plane"}],
        "curves3D": [
            {"kind": "line", "origin": [0, 0, 0], "direction": [1, 0, 0]},
            {"kind": "line", "origin": [1, 0, 0], "direction": [0, 1, 0]},
            {"kind": "line", "origin": [1, 1, 0], "direction": [-1, 0, 0]},
            {"kind": "line", "origin": [0, 1, 0], "direction": [0, -1, 0]},
            {"kind": "line", "origin": [0, 0.5, 2], "direction": [1, 0, 0]}
        ],
        "edges": [
            {"curve3D": 0, "parameterBounds": [0, 1], "vertices": [0, 1], "halfEdges": [0]},
            {"curve3D": 1, "parameterBounds": [0, 1], "vertices": [1, 2], "halfEdges": [1]},
            {"curve3D": 2, "parameterBounds": [0, 1], "vertices": [2, 3], "halfEdges": [2]},
            {"curve3D": 3, "parameterBounds": [0, 1], "vertices": [3, 0], "halfEdges": [3]}
        ],
        "halfEdges": [
            {"edge": 0, "face": 0, "loop": 0},
            {"edge": 1, "face": 0, "loop": 0},
            {"edge": 2, "face": 0, "loop": 0},
            {"edge": 3, "face": 0, "loop": 0}
        ],
        "curveSegments": [{"curve3D": 4, "parameterBounds": [0, 1]}]
    }"#;

    fn scene(assets: &[(&str, &str)], config: SceneConfig) -> Scene<MemoryDownloader> {
        Scene::new(
            MemoryDownloader::new(assets),
            config,
            GeometryFactory::default(),
        )
    }

    #[tokio::test]
    async fn test_missing_product_is_cached() {
        let scene = scene(&[], SceneConfig::default());
        assert!(scene.product("ghost").await.unwrap().is_none());
        assert!(scene.product("ghost").await.unwrap().is_none());
        assert_eq!(scene.downloader().fetches.load(Ordering::SeqCst), 1);

        scene.reload().await;
        assert!(scene.product("ghost").await.unwrap().is_none());
        assert_eq!(scene.downloader().fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_hash_table_indirection() {
        let config = SceneConfig {
            hash_table_path: Some("hashes.json".to_string()),
            ..Default::default()
        };
        let scene = scene(
            &[
                ("hashes.json", r#"{"plate": "abc123"}"#),
                ("brep/abc123.json", PLATE),
            ],
            config,
        );
        let product = scene.product("plate").await.unwrap().unwrap();
        assert_eq!(product.faces.len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_product_is_error() {
        let scene = scene(&[("brep/bad.json", "{\"faces\": 3}")], SceneConfig::default());
        let err = scene.product("bad").await.unwrap_err();
        assert_eq!(err.tag(), "parse");
    }

    #[tokio::test]
    async fn test_pick_segment_and_measure() {
        let scene = scene(&[("brep/plate.json", PLATE)], SceneConfig::default());
        let tolerance = PickTolerance {
            segment: Some(0.05),
            face: Some(0.05),
            ..Default::default()
        };
        let picked = scene
            .pick("plate", &Point3d::new(0.5, 0.5, 1.98), &tolerance)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(picked.entity.draw_kind(), "curveSegment");

        let face = scene
            .pick("plate", &Point3d::new(0.3, 0.3, 0.01), &tolerance)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(face.entity.draw_kind(), "face");

        let values = scene
            .measure(&picked.entity, Some(&face.entity), None, None)
            .await
            .unwrap()
            .unwrap();
        let MeasurementValues::Duo(duo) = values else {
            panic!("expected a two-entity measurement");
        };
        assert!((duo.distance - 2.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_queries_on_missing_object_are_none() {
        let scene = scene(&[], SceneConfig::default());
        let view = Transform::identity();
        assert!(scene.manhole("ghost").await.unwrap().is_none());
        assert!(scene.object_outlines("ghost", 0, &view).await.unwrap().is_none());
        assert!(
            scene
                .pick("ghost", &Point3d::ORIGIN, &PickTolerance::default())
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_profile_rejects_multiple_segments() {
        let scene = scene(&[("brep/plate.json", PLATE)], SceneConfig::default());
        let err = scene
            .segment_profile("plate", 0, &[0, 0], 0.1)
            .await
            .unwrap_err();
        assert_eq!(err.tag(), "profile");
        assert_eq!(err.to_string(), "multiple segments in profile");
    }
}
