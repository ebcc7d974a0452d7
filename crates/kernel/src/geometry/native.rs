//! Contract with the numeric library that evaluates NURBS geometry.
//!
//! The library works on raw `f64` buffers and hands out opaque handles: the
//! caller allocates a resource (`make_curve` / `make_surface`), evaluates it
//! any number of times and releases it with `dispose`. [`NativeResource`]
//! wraps one handle per curve or surface object so that it is created on
//! first use and released exactly once.

use std::fmt;
use std::sync::{Arc, Mutex};

use slotmap::{SlotMap, new_key_type};
use tracing::{debug, warn};

use crate::error::NativeError;

use super::nurbs::{BSplineCurve, BSplineSurface};
use super::point::Point3d;

new_key_type! {
    /// Opaque handle to a resource owned by a [`NumericLibrary`].
    pub struct NativeHandle;
}

/// Input buffers of a NURBS curve. Control points are flat xyz triples.
#[derive(Debug, Clone, PartialEq)]
pub struct CurveSpec {
    pub order: usize,
    pub knots: Vec<f64>,
    pub control_points: Vec<f64>,
    pub weights: Option<Vec<f64>>,
}

/// Input buffers of a NURBS surface. Control points are flat xyz triples,
/// u-major.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceSpec {
    pub order_u: usize,
    pub order_v: usize,
    pub count_u: usize,
    pub count_v: usize,
    pub knots_u: Vec<f64>,
    pub knots_v: Vec<f64>,
    pub control_points: Vec<f64>,
    pub weights: Option<Vec<f64>>,
}

/// Allocate / evaluate / release lifecycle over raw float buffers.
pub trait NumericLibrary: Send + Sync + fmt::Debug {
    fn make_curve(&self, spec: &CurveSpec) -> Result<NativeHandle, NativeError>;

    /// Evaluate position and/or tangent at `t`; either output may be omitted.
    fn eval_curve(
        &self,
        handle: NativeHandle,
        t: f64,
        point: Option<&mut [f64; 3]>,
        tangent: Option<&mut [f64; 3]>,
    ) -> Result<(), NativeError>;

    fn invert_curve(&self, handle: NativeHandle, point: &[f64; 3]) -> Result<f64, NativeError>;

    fn make_surface(&self, spec: &SurfaceSpec) -> Result<NativeHandle, NativeError>;

    fn eval_surface_position(
        &self,
        handle: NativeHandle,
        uv: [f64; 2],
        out: &mut [f64; 3],
    ) -> Result<(), NativeError>;

    fn eval_surface_normal(
        &self,
        handle: NativeHandle,
        uv: [f64; 2],
        out: &mut [f64; 3],
    ) -> Result<(), NativeError>;

    fn invert_surface(&self, handle: NativeHandle, point: &[f64; 3])
    -> Result<[f64; 2], NativeError>;

    fn dispose(&self, handle: NativeHandle) -> Result<(), NativeError>;
}

#[derive(Debug)]
enum Entry {
    Curve(BSplineCurve),
    Surface(BSplineSurface),
}

impl Entry {
    fn name(&self) -> &'static str {
        match self {
            Entry::Curve(_) => "curve",
            Entry::Surface(_) => "surface",
        }
    }
}

/// In-process [`NumericLibrary`] backed by a slot-map handle table.
#[derive(Debug, Default)]
pub struct SoftwareNumerics {
    entries: Mutex<SlotMap<NativeHandle, Entry>>,
}

impl SoftwareNumerics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (allocated, not yet disposed) resources.
    pub fn live_handles(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    fn with_curve<R>(
        &self,
        handle: NativeHandle,
        f: impl FnOnce(&BSplineCurve) -> R,
    ) -> Result<R, NativeError> {
        let entries = self.entries.lock().map_err(|_| NativeError::Poisoned)?;
        match entries.get(handle) {
            Some(Entry::Curve(c)) => Ok(f(c)),
            Some(other) => Err(NativeError::WrongResource {
                expected: "curve",
                actual: other.name(),
            }),
            None => Err(NativeError::StaleHandle),
        }
    }

    fn with_surface<R>(
        &self,
        handle: NativeHandle,
        f: impl FnOnce(&BSplineSurface) -> R,
    ) -> Result<R, NativeError> {
        let entries = self.entries.lock().map_err(|_| NativeError::Poisoned)?;
        match entries.get(handle) {
            Some(Entry::Surface(s)) => Ok(f(s)),
            Some(other) => Err(NativeError::WrongResource {
                expected: "surface",
                actual: other.name(),
            }),
            None => Err(NativeError::StaleHandle),
        }
    }
}

impl NumericLibrary for SoftwareNumerics {
    fn make_curve(&self, spec: &CurveSpec) -> Result<NativeHandle, NativeError> {
        let curve = BSplineCurve::from_spec(spec)?;
        let mut entries = self.entries.lock().map_err(|_| NativeError::Poisoned)?;
        Ok(entries.insert(Entry::Curve(curve)))
    }

    fn eval_curve(
        &self,
        handle: NativeHandle,
        t: f64,
        point: Option<&mut [f64; 3]>,
        tangent: Option<&mut [f64; 3]>,
    ) -> Result<(), NativeError> {
        self.with_curve(handle, |c| {
            if let Some(out) = point {
                *out = c.evaluate(t).to_array();
            }
            if let Some(out) = tangent {
                *out = c.derivative(t).to_array();
            }
        })
    }

    fn invert_curve(&self, handle: NativeHandle, point: &[f64; 3]) -> Result<f64, NativeError> {
        let p = Point3d::from_array(*point);
        self.with_curve(handle, |c| c.invert(&p))
    }

    fn make_surface(&self, spec: &SurfaceSpec) -> Result<NativeHandle, NativeError> {
        let surface = BSplineSurface::from_spec(spec)?;
        let mut entries = self.entries.lock().map_err(|_| NativeError::Poisoned)?;
        Ok(entries.insert(Entry::Surface(surface)))
    }

    fn eval_surface_position(
        &self,
        handle: NativeHandle,
        uv: [f64; 2],
        out: &mut [f64; 3],
    ) -> Result<(), NativeError> {
        self.with_surface(handle, |s| *out = s.evaluate(uv[0], uv[1]).to_array())
    }

    fn eval_surface_normal(
        &self,
        handle: NativeHandle,
        uv: [f64; 2],
        out: &mut [f64; 3],
    ) -> Result<(), NativeError> {
        self.with_surface(handle, |s| *out = s.normal(uv[0], uv[1]).to_array())
    }

    fn invert_surface(
        &self,
        handle: NativeHandle,
        point: &[f64; 3],
    ) -> Result<[f64; 2], NativeError> {
        let p = Point3d::from_array(*point);
        self.with_surface(handle, |s| s.invert(&p))
    }

    fn dispose(&self, handle: NativeHandle) -> Result<(), NativeError> {
        let mut entries = self.entries.lock().map_err(|_| NativeError::Poisoned)?;
        entries
            .remove(handle)
            .map(|_| ())
            .ok_or(NativeError::StaleHandle)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResourceSpec {
    Curve(CurveSpec),
    Surface(SurfaceSpec),
}

/// One lazily allocated native resource.
///
/// The handle is created on the first call to [`NativeResource::handle`] and
/// disposed when the wrapper drops. Cloning copies the input buffers but not
/// the handle, so every clone owns (and releases) its own resource.
pub struct NativeResource {
    numerics: Arc<dyn NumericLibrary>,
    spec: ResourceSpec,
    handle: Mutex<Option<NativeHandle>>,
}

impl NativeResource {
    pub fn new(numerics: Arc<dyn NumericLibrary>, spec: ResourceSpec) -> Self {
        Self {
            numerics,
            spec,
            handle: Mutex::new(None),
        }
    }

    pub fn numerics(&self) -> &dyn NumericLibrary {
        self.numerics.as_ref()
    }

    pub fn spec(&self) -> &ResourceSpec {
        &self.spec
    }

    /// Whether the native side has been allocated yet.
    pub fn is_allocated(&self) -> bool {
        self.handle.lock().map(|h| h.is_some()).unwrap_or(false)
    }

    pub fn handle(&self) -> Result<NativeHandle, NativeError> {
        let mut slot = self.handle.lock().map_err(|_| NativeError::Poisoned)?;
        if let Some(handle) = *slot {
            return Ok(handle);
        }
        let handle = match &self.spec {
            ResourceSpec::Curve(spec) => self.numerics.make_curve(spec)?,
            ResourceSpec::Surface(spec) => self.numerics.make_surface(spec)?,
        };
        debug!(?handle, "allocated native resource");
        *slot = Some(handle);
        Ok(handle)
    }
}

impl Clone for NativeResource {
    fn clone(&self) -> Self {
        Self::new(Arc::clone(&self.numerics), self.spec.clone())
    }
}

impl fmt::Debug for NativeResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeResource")
            .field("spec", &self.spec)
            .field("allocated", &self.is_allocated())
            .finish()
    }
}

impl Drop for NativeResource {
    fn drop(&mut self) {
        let Some(handle) = self.handle.get_mut().ok().and_then(Option::take) else {
            return;
        };
        if let Err(e) = self.numerics.dispose(handle) {
            warn!(?handle, error = %e, "failed to dispose native resource");
        }
    }
}
