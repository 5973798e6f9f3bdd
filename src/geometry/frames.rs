//! Coordinate frame conventions and the camera-to-world landmark transform.
//!
//! # Frames
//!
//! There are three frames a landmark passes through:
//!
//! 1. **Sensor view frame** - where the sensor reports palm, wrist and
//!    fingertip coordinates (right-handed).
//! 2. **Camera frame** - obtained by inverting the per-frame camera view
//!    transform (right-handed).
//! 3. **World frame** - the host application's frame (left-handed, Y-up).
//!
//! ```text
//! p_view (x, y, z, 1)
//!     │
//!     ▼ view⁻¹
//! p_cam
//!     │
//!     ▼ T_world_cam  (identity when the coordinate handle is unavailable)
//! p_world_h (x, y, z, w)
//!     │
//!     ▼ perspective divide + z flip
//! p_world = (x/w, y/w, -z/w)
//! ```
//!
//! # Matrix convention
//!
//! Matrices are column-vector matrices (`p' = M * p`), the nalgebra
//! convention. Sensors that hand out row-vector matrices must be transposed
//! before they reach this module.

use nalgebra::{Matrix4, Vector3, Vector4};
use tracing::debug;

/// Divide by the homogeneous coordinate and flip to the left-handed world.
///
/// Returns `None` when `w` is zero or any resulting component is not finite,
/// so degenerate samples never reach smoothed track state.
pub fn perspective_divide(p: &Vector4<f64>) -> Option<Vector3<f64>> {
    let w = p.w;
    if w == 0.0 || !w.is_finite() {
        return None;
    }
    let out = Vector3::new(p.x / w, p.y / w, -p.z / w);
    if out.iter().all(|c| c.is_finite()) {
        Some(out)
    } else {
        None
    }
}

/// Maps camera-space landmarks into world space for one sensor frame.
///
/// Built once per frame from the frame's camera view transform and the
/// current camera-to-world relation, then applied to every landmark of every
/// hand in that frame.
#[derive(Debug, Clone)]
pub struct CoordinateTransformer {
    /// Combined `T_world_cam * view⁻¹`.
    view_to_world: Matrix4<f64>,
}

impl CoordinateTransformer {
    /// Build a transformer for one frame.
    ///
    /// A missing `camera_to_world` is replaced by the identity, so positions
    /// degrade to camera-relative instead of being dropped. Returns `None` if
    /// the view matrix cannot be inverted.
    pub fn new(view: &Matrix4<f64>, camera_to_world: Option<&Matrix4<f64>>) -> Option<Self> {
        let view_inv = match view.try_inverse() {
            Some(inv) => inv,
            None => {
                debug!("Camera view transform is not invertible, dropping frame");
                return None;
            }
        };
        let t_world_cam = match camera_to_world {
            Some(m) => *m,
            None => {
                debug!("No camera-to-world transform, using identity");
                Matrix4::identity()
            }
        };
        Some(Self {
            view_to_world: t_world_cam * view_inv,
        })
    }

    /// Transformer for callers that already work in world space.
    pub fn identity() -> Self {
        Self {
            view_to_world: Matrix4::identity(),
        }
    }

    /// Transform one homogeneous camera-space point into world space.
    pub fn apply(&self, point: &Vector4<f64>) -> Option<Vector3<f64>> {
        perspective_divide(&(self.view_to_world * point))
    }
}

/// One-shot form of [`CoordinateTransformer`].
pub fn transform(
    point: &Vector4<f64>,
    view: &Matrix4<f64>,
    camera_to_world: Option<&Matrix4<f64>>,
) -> Option<Vector3<f64>> {
    CoordinateTransformer::new(view, camera_to_world)?.apply(point)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_identity_transform_is_perspective_divide() {
        let p = Vector4::new(0.3, -1.2, 2.5, 2.0);
        let id = Matrix4::identity();
        let out = transform(&p, &id, Some(&id)).unwrap();
        assert_eq!(out, perspective_divide(&p).unwrap());
        assert_relative_eq!(out, Vector3::new(0.15, -0.6, -1.25), epsilon = 1e-12);
    }

    #[test]
    fn test_missing_camera_to_world_falls_back_to_identity() {
        let p = Vector4::new(1.0, 2.0, 3.0, 1.0);
        let id = Matrix4::identity();
        assert_eq!(transform(&p, &id, None), transform(&p, &id, Some(&id)));
        assert_eq!(transform(&p, &id, None), Some(Vector3::new(1.0, 2.0, -3.0)));
    }

    #[test]
    fn test_view_is_inverted_before_camera_to_world() {
        // View translates by +1 in x, so its inverse moves the point back.
        let view = Matrix4::new_translation(&Vector3::new(1.0, 0.0, 0.0));
        let cam_to_world = Matrix4::new_translation(&Vector3::new(0.0, 0.0, 5.0));
        let p = Vector4::new(1.0, 1.0, 1.0, 1.0);

        let out = transform(&p, &view, Some(&cam_to_world)).unwrap();
        assert_relative_eq!(out, Vector3::new(0.0, 1.0, -6.0), epsilon = 1e-12);
    }

    #[test]
    fn test_zero_w_is_rejected() {
        assert!(perspective_divide(&Vector4::new(1.0, 1.0, 1.0, 0.0)).is_none());
    }

    #[test]
    fn test_non_finite_components_are_rejected() {
        assert!(perspective_divide(&Vector4::new(f64::NAN, 1.0, 1.0, 1.0)).is_none());
        assert!(perspective_divide(&Vector4::new(1.0, 1.0, f64::INFINITY, 1.0)).is_none());
        assert!(perspective_divide(&Vector4::new(1.0, 1.0, 1.0, f64::NAN)).is_none());
    }

    #[test]
    fn test_singular_view_is_rejected() {
        let p = Vector4::new(1.0, 1.0, 1.0, 1.0);
        assert!(transform(&p, &Matrix4::zeros(), None).is_none());
    }
}
