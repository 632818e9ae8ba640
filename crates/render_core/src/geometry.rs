// crates/render_core/src/geometry.rs
//! Camera placement, Euler composition and the facing test.
//!
//! Everything here is a pure function of its arguments; the functions are
//! shared between scene emission (camera blocks) and occlusion accounting
//! (depth ordering, facing filter) so the two can never drift apart.

use crate::scene::{Glyph, Viewpoint};
use glam::DVec3;

/// Fixed distance from the camera to the scene origin.
pub const CAMERA_DISTANCE: f64 = 20.0;

/// A glyph counts as legible when the angle between its extruded front and
/// the direction to the camera is at most this. The same limit is applied to
/// the reversed front: the back face of the extrusion is readable too, so
/// the accepted region is a double cone.
pub const FACING_LIMIT_RAD: f64 = 61.0 * std::f64::consts::PI / 180.0;

/// Camera position for a viewpoint: spherical parametrization at
/// [`CAMERA_DISTANCE`], looking at the origin with up = +Y.
pub fn camera_position(vp: Viewpoint) -> DVec3 {
    let pitch = (vp.pitch as f64).to_radians();
    let yaw = (vp.yaw as f64).to_radians();

    DVec3::new(
        CAMERA_DISTANCE * yaw.sin() * pitch.cos(),
        CAMERA_DISTANCE * pitch.sin(),
        CAMERA_DISTANCE * yaw.cos() * pitch.cos(),
    )
}

/// Unit forward vector of the camera (toward the origin).
pub fn camera_forward(vp: Viewpoint) -> DVec3 {
    (-camera_position(vp)).normalize_or_zero()
}

/// Rotates `v` by Euler angles in radians, applying X, then Y, then Z —
/// the same order the renderer applies its `rotate` vector.
pub fn rotate_euler(v: DVec3, rot: DVec3) -> DVec3 {
    let DVec3 { mut x, mut y, mut z } = v;

    if rot.x != 0.0 {
        let (s, c) = rot.x.sin_cos();
        let (ny, nz) = (y * c - z * s, y * s + z * c);
        y = ny;
        z = nz;
    }
    if rot.y != 0.0 {
        let (s, c) = rot.y.sin_cos();
        let (nx, nz) = (x * c + z * s, -x * s + z * c);
        x = nx;
        z = nz;
    }
    if rot.z != 0.0 {
        let (s, c) = rot.z.sin_cos();
        let (nx, ny) = (x * c - y * s, x * s + y * c);
        x = nx;
        y = ny;
    }

    DVec3::new(x, y, z)
}

/// Double-cone facing test. The glyph's local front is +Z; after applying
/// its Euler rotation the angle to the camera direction must fall inside
/// [`FACING_LIMIT_RAD`] on either the front or the back side.
pub fn is_facing(glyph: &Glyph, vp: Viewpoint) -> bool {
    let to_camera = (camera_position(vp) - glyph.position).normalize_or_zero();
    let front = rotate_euler(DVec3::Z, glyph.rotation).normalize_or_zero();

    let angle = front.dot(to_camera).clamp(-1.0, 1.0).acos();
    angle <= FACING_LIMIT_RAD || (std::f64::consts::PI - angle) <= FACING_LIMIT_RAD
}

/// Projection of (position − camera) onto the camera forward vector.
/// Larger means farther from the camera.
pub fn depth_along_view(position: DVec3, vp: Viewpoint) -> f64 {
    (position - camera_position(vp)).dot(camera_forward(vp))
}
