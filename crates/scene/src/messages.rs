use brep_kernel::geometry::point::Point3d;
use brep_kernel::{
    ManholeMeasureValues, MeasureEntity, MeasureSettings, MeasurementValues, PickResult,
    PickTolerance, ProfilePoint,
};
use brep_outline::ProjectedLoops;
use serde::{Deserialize, Serialize};

/// Queries sent to a scene worker.
/// Serialized as JSON with a `type` tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum Request {
    /// Resolve a world point to an entity of one object.
    Pick {
        object_id: String,
        position: Point3d,
        tolerance: PickTolerance,
    },
    /// Measure `a`, or the distance from `a` to `b`.
    Measure {
        a: MeasureEntity,
        #[serde(default)]
        b: Option<MeasureEntity>,
        #[serde(default)]
        settings_a: Option<MeasureSettings>,
        #[serde(default)]
        settings_b: Option<MeasureSettings>,
    },
    /// Outlines of one face; `view` is a column-major world-to-view matrix.
    ProjectedLoops {
        object_id: String,
        instance: usize,
        face: usize,
        view: [f64; 16],
    },
    ObjectOutlines {
        object_id: String,
        instance: usize,
        view: [f64; 16],
    },
    Manhole {
        object_id: String,
    },
    SegmentProfile {
        object_id: String,
        instance: usize,
        segments: Vec<usize>,
        step: f64,
    },
    /// Forget all cached products.
    Reload,
}

/// Replies from a scene worker. `None` payloads mean "nothing applicable".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum Response {
    Picked { result: Option<PickResult> },

    Measured { values: Option<MeasurementValues> },

    Outlines { loops: Option<ProjectedLoops> },

    Manhole { values: Option<ManholeMeasureValues> },

    Profile { points: Option<Vec<ProfilePoint>> },

    Reloaded,

    /// The query failed; `tag` classifies the failure.
    Error { tag: String, message: String },
}
