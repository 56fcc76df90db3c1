//! World-space pose reconciliation.
//!
//! Raw tracker output lives in the tracking camera's space: right-handed,
//! centimeters. The host engine works in a left-handed, meter-scaled scene.
//! [`compute_tracking_to_world`] builds the transform between the two from
//! the host camera's current world pose and, when present, the positional
//! tracking reference device; [`Pose::update`] applies it and folds in the
//! user's zero-position / zero-yaw corrections.

use glam::{Mat4, Quat, Vec3};

/// Conversion from tracker centimeters to scene units (100 cm per unit).
pub const CM_TO_UNITS: f32 = 1.0 / 100.0;
pub const UNITS_TO_CM: f32 = 100.0;

// Fallback tracking-camera frustum when no reference device is present.
const DEFAULT_TRACKING_HFOV_DEGREES: f32 = 74.0;
const DEFAULT_TRACKING_VFOV_DEGREES: f32 = 54.0;
const DEFAULT_TRACKING_DISTANCE: f32 = 1.5; // meters in front of the host camera
const DEFAULT_TRACKING_NEAR_PLANE: f32 = 0.4;
const DEFAULT_TRACKING_FAR_PLANE: f32 = 2.5;

/// Pose of the positional tracking reference device, in the player
/// reference frame, plus its reported frustum.
#[derive(Debug, Clone, Copy)]
pub struct TrackingReference {
    pub position: Vec3,
    pub orientation: Quat,
    /// Horizontal field of view in degrees.
    pub h_fov_degrees: f32,
    /// Vertical field of view in degrees.
    pub v_fov_degrees: f32,
    pub near_plane: f32,
    pub far_plane: f32,
}

/// The host engine's view of the world for one reconciliation step.
///
/// Supplied per computation; when the host has no current camera the caller
/// passes no frame and the previous pose is retained.
#[derive(Debug, Clone, Copy)]
pub struct HostCameraFrame {
    /// World position of the scene camera.
    pub camera_position: Vec3,
    /// World orientation of the scene camera.
    pub camera_orientation: Quat,
    /// HMD orientation in the player reference frame.
    pub hmd_orientation: Quat,
    /// Present and enabled positional tracking reference device, if any.
    pub tracking_reference: Option<TrackingReference>,
}

/// Tracking camera frustum in scene units, derived alongside the transform.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrackingFrustum {
    pub h_half_radians: f32,
    pub v_half_radians: f32,
    pub near_plane: f32,
    pub far_plane: f32,
}

/// Transforms taking raw tracking-space data into the host's world space.
#[derive(Debug, Clone, Copy)]
pub struct TrackingToWorld {
    /// Position transform, tracking-space centimeters to world-space units.
    pub position_transform: Mat4,
    /// Applied on the right of the (converted) controller orientation.
    pub orientation_transform: Quat,
    pub frustum: TrackingFrustum,
}

/// Convert a native-SDK quaternion into the host's coordinate system by
/// negating the depth-axis imaginary component.
pub fn native_quat_to_world(q: Quat) -> Quat {
    Quat::from_xyzw(q.x, q.y, -q.z, q.w)
}

/// Right-handed centimeters to left-handed scene units: negate the depth
/// axis and scale by the centimeters-per-unit factor.
pub fn rhs_cm_to_world_units() -> Mat4 {
    Mat4::from_scale(Vec3::new(CM_TO_UNITS, CM_TO_UNITS, -CM_TO_UNITS))
}

/// Build the tracking-space to world-space transforms for this frame.
pub fn compute_tracking_to_world(frame: &HostCameraFrame) -> TrackingToWorld {
    let mut frustum = TrackingFrustum::default();

    let position_transform = if let Some(reference) = frame.tracking_reference {
        // Undo the HMD orientation, then apply the scene camera orientation.
        let hmd_to_camera = frame.hmd_orientation.inverse() * frame.camera_orientation;
        let tracking_to_world_rotation = reference.orientation * hmd_to_camera;
        let camera_world_origin = hmd_to_camera * reference.position + frame.camera_position;

        frustum.h_half_radians = reference.h_fov_degrees.to_radians() / 2.0;
        frustum.v_half_radians = reference.v_fov_degrees.to_radians() / 2.0;
        frustum.near_plane = reference.near_plane;
        frustum.far_plane = reference.far_plane;

        rhs_cm_to_world_units()
            * Mat4::from_rotation_translation(tracking_to_world_rotation, camera_world_origin)
    } else {
        // Pretend the tracking camera sits a fixed distance directly in
        // front of the scene camera, sharing its orientation.
        let camera_world_origin = frame.camera_position
            + frame.camera_orientation * Vec3::Z * DEFAULT_TRACKING_DISTANCE;

        frustum.h_half_radians = DEFAULT_TRACKING_HFOV_DEGREES.to_radians() / 2.0;
        frustum.v_half_radians = DEFAULT_TRACKING_VFOV_DEGREES.to_radians() / 2.0;
        frustum.near_plane = DEFAULT_TRACKING_NEAR_PLANE;
        frustum.far_plane = DEFAULT_TRACKING_FAR_PLANE;

        rhs_cm_to_world_units()
            * Mat4::from_rotation_translation(frame.camera_orientation, camera_world_origin)
    };

    TrackingToWorld {
        position_transform,
        orientation_transform: frame.camera_orientation,
        frustum,
    }
}

/// World-space controller pose with user zero-pose corrections.
///
/// Invariant: the corrected pose is the uncorrected pose composed with the
/// zero references; clearing both references makes them equal.
#[derive(Debug, Clone, Copy)]
pub struct Pose {
    pub world_position: Vec3,
    pub zero_position: Vec3,
    pub uncorrected_world_position: Vec3,
    pub world_orientation: Quat,
    pub zero_yaw: Quat,
    pub uncorrected_world_orientation: Quat,
}

impl Pose {
    pub fn new() -> Self {
        Pose {
            world_position: Vec3::ZERO,
            zero_position: Vec3::ZERO,
            uncorrected_world_position: Vec3::ZERO,
            world_orientation: Quat::IDENTITY,
            zero_yaw: Quat::IDENTITY,
            uncorrected_world_orientation: Quat::IDENTITY,
        }
    }

    pub fn clear(&mut self) {
        *self = Pose::new();
    }

    /// Reconcile a raw tracking-space position/orientation against the host
    /// frame. With no frame the previous pose is retained untouched.
    pub fn update(&mut self, raw_position: Vec3, raw_orientation: Quat, frame: Option<&HostCameraFrame>) {
        let Some(frame) = frame else {
            return;
        };
        let transforms = compute_tracking_to_world(frame);

        let world_position = transforms
            .position_transform
            .transform_point3(raw_position);

        // Apply the controller orientation first, then the host transform.
        let world_orientation =
            native_quat_to_world(raw_orientation) * transforms.orientation_transform;

        self.uncorrected_world_position = world_position;
        self.world_position = world_position - self.zero_position;
        self.uncorrected_world_orientation = world_orientation;
        self.world_orientation = self.zero_yaw * world_orientation;
    }

    /// Clear the yaw correction; the corrected orientation becomes the
    /// uncorrected one on the next update.
    pub fn reset_yaw_snapshot(&mut self) {
        self.zero_yaw = Quat::IDENTITY;
    }

    /// Capture a yaw-only correction from the current uncorrected
    /// orientation: strip the pitch/roll imaginary components, negate the
    /// yaw axis, and renormalize.
    pub fn snapshot_orientation_yaw(&mut self) {
        let q = self.uncorrected_world_orientation;
        let magnitude = (q.y * q.y + q.w * q.w).sqrt();
        if magnitude <= f32::EPSILON {
            self.zero_yaw = Quat::IDENTITY;
            return;
        }
        self.zero_yaw = Quat::from_xyzw(0.0, -q.y / magnitude, 0.0, q.w / magnitude);
    }

    /// Clear the position correction.
    pub fn reset_position_snapshot(&mut self) {
        self.zero_position = Vec3::ZERO;
    }

    /// Use the current uncorrected position as the new origin.
    pub fn snapshot_position(&mut self) {
        self.zero_position = self.uncorrected_world_position;
    }
}

impl Default for Pose {
    fn default() -> Self {
        Pose::new()
    }
}
