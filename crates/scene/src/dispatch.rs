use brep_kernel::geometry::transform::Transform;

use crate::download::Downloader;
use crate::error::SceneError;
use crate::messages::{Request, Response};
use crate::scene::Scene;

/// Run one request against a scene.
///
/// Errors become [`Response::Error`] carrying the error's tag and message.
pub async fn dispatch<D: Downloader>(scene: &Scene<D>, request: Request) -> Response {
    match handle_request(scene, request).await {
        Ok(response) => response,
        Err(e) => Response::Error {
            tag: e.tag().to_string(),
            message: e.to_string(),
        },
    }
}

async fn handle_request<D: Downloader>(
    scene: &Scene<D>,
    request: Request,
) -> Result<Response, SceneError> {
    match request {
        Request::Pick {
            object_id,
            position,
            tolerance,
        } => Ok(Response::Picked {
            result: scene.pick(&object_id, &position, &tolerance).await?,
        }),

        Request::Measure {
            a,
            b,
            settings_a,
            settings_b,
        } => Ok(Response::Measured {
            values: scene
                .measure(&a, b.as_ref(), settings_a.as_ref(), settings_b.as_ref())
                .await?,
        }),

        Request::ProjectedLoops {
            object_id,
            instance,
            face,
            view,
        } => Ok(Response::Outlines {
            loops: scene
                .projected_loops(&object_id, instance, face, &Transform::from_column_major(view))
                .await?,
        }),

        Request::ObjectOutlines {
            object_id,
            instance,
            view,
        } => Ok(Response::Outlines {
            loops: scene
                .object_outlines(&object_id, instance, &Transform::from_column_major(view))
                .await?,
        }),

        Request::Manhole { object_id } => Ok(Response::Manhole {
            values: scene.manhole(&object_id).await?,
        }),

        Request::SegmentProfile {
            object_id,
            instance,
            segments,
            step,
        } => Ok(Response::Profile {
            points: scene
                .segment_profile(&object_id, instance, &segments, step)
                .await?,
        }),

        Request::Reload => {
            scene.reload().await;
            Ok(Response::Reloaded)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::SceneConfig;
    use crate::scene::tests::{MemoryDownloader, PLATE};
    use brep_kernel::GeometryFactory;

    fn scene() -> Scene<MemoryDownloader> {
        Scene::new(
            MemoryDownloader::new(&[("brep/plate.json", PLATE)]),
            SceneConfig::default(),
            GeometryFactory::default(),
        )
    }

    #[tokio::test]
    async fn test_request_from_json() {
        let json = r#"{
            "type": "Pick",
            "objectId": "plate",
            "position": {"x": 0.5, "y": 0.5, "z": 1.99},
            "tolerance": {"segment": 0.05}
        }"#;
        let request: Request = serde_json::from_str(json).unwrap();
        let response = dispatch(&scene(), request).await;
        let Response::Picked { result: Some(result) } = response else {
            panic!("expected a pick, got {response:?}");
        };
        assert_eq!(result.entity.draw_kind(), "curveSegment");
    }

    #[tokio::test]
    async fn test_error_response_carries_tag() {
        let request = Request::SegmentProfile {
            object_id: "plate".to_string(),
            instance: 0,
            segments: vec![],
            step: 0.1,
        };
        let response = dispatch(&scene(), request).await;
        assert_eq!(
            response,
            Response::Error {
                tag: "profile".to_string(),
                message: "no segment in profile".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_reload_round_trip() {
        let scene = scene();
        assert_eq!(dispatch(&scene, Request::Reload).await, Response::Reloaded);
        let json = serde_json::to_string(&Response::Reloaded).unwrap();
        assert_eq!(json, r#"{"type":"Reloaded"}"#);
    }
}
