//! Opaque boundary to the native move/tracker/fusion SDK.
//!
//! The worker never touches the SDK directly; it goes through [`MoveApi`],
//! which mirrors the native surface one call per method. Handles are opaque
//! ids minted by the implementation and are wrapped in owning types
//! ([`OwnedMove`], [`OwnedTracker`], [`OwnedFusion`]) so release is tied to
//! scope exit. Raw handles never leave the session/worker boundary.

use crate::types::{Buttons, SmoothingSettings, TrackerErrorCode, TrackerSettings, TrackerStatus};
use crate::Result;
use glam::{Quat, Vec3};
use std::sync::Arc;

/// Protocol version passed to `init`.
pub const CURRENT_VERSION: u32 = 3;

/// Opaque handle to a connected controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MoveHandle(pub u64);

/// Opaque handle to a camera tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TrackerHandle(pub u64);

/// Opaque handle to a fusion object derived from a tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FusionHandle(pub u64);

/// The native SDK surface consumed by the worker.
///
/// Implementations are expected to be cheap to call and internally
/// synchronized; the worker guarantees it never invokes a method while
/// holding a slot guard.
pub trait MoveApi: Send + Sync {
    // -- Lifecycle --
    fn init(&self, version: u32) -> bool;
    fn shutdown(&self);

    // -- Device --
    fn connect_by_id(&self, id: usize) -> Option<MoveHandle>;
    fn disconnect(&self, controller: MoveHandle);
    fn count_connected(&self) -> usize;
    fn enable_orientation(&self, controller: MoveHandle, enabled: bool);
    fn has_orientation(&self, controller: MoveHandle) -> bool;
    /// Number of pending bluetooth updates for this controller.
    fn poll(&self, controller: MoveHandle) -> u32;
    fn buttons(&self, controller: MoveHandle) -> Buttons;
    fn trigger(&self, controller: MoveHandle) -> u8;
    fn orientation(&self, controller: MoveHandle) -> Quat;
    fn set_rumble(&self, controller: MoveHandle, strength: u8);
    fn update_leds(&self, controller: MoveHandle);

    // -- Tracker --
    fn tracker_new(&self, settings: &TrackerSettings) -> Option<TrackerHandle>;
    fn tracker_free(&self, tracker: TrackerHandle);
    fn tracker_last_error(&self) -> TrackerErrorCode;
    fn tracker_smoothing_settings(&self, tracker: TrackerHandle) -> SmoothingSettings;
    fn tracker_set_smoothing_settings(&self, tracker: TrackerHandle, settings: &SmoothingSettings);
    /// Reported camera image size as (width, height).
    fn tracker_size(&self, tracker: TrackerHandle) -> (u32, u32);
    fn tracker_enable(&self, tracker: TrackerHandle, controller: MoveHandle) -> TrackerStatus;
    fn tracker_status(&self, tracker: TrackerHandle, controller: MoveHandle) -> TrackerStatus;
    /// Grab a fresh camera frame. May fail transiently.
    fn tracker_update_image(&self, tracker: TrackerHandle) -> Result<()>;
    /// Locate the controller's sphere in the current frame.
    fn tracker_update(&self, tracker: TrackerHandle, controller: MoveHandle);
    fn tracker_cycle_color(&self, tracker: TrackerHandle, controller: MoveHandle);

    // -- Fusion --
    fn fusion_new(&self, tracker: TrackerHandle, z_near: f32, z_far: f32)
        -> Option<FusionHandle>;
    fn fusion_free(&self, fusion: FusionHandle);
    /// Fused controller location in tracker space, centimeters.
    fn fusion_transformed_location(&self, fusion: FusionHandle, controller: MoveHandle) -> Vec3;
}

/// A connected controller that disconnects when dropped.
pub struct OwnedMove {
    api: Arc<dyn MoveApi>,
    raw: MoveHandle,
}

impl OwnedMove {
    pub fn new(api: Arc<dyn MoveApi>, raw: MoveHandle) -> Self {
        OwnedMove { api, raw }
    }

    pub(crate) fn raw(&self) -> MoveHandle {
        self.raw
    }
}

impl Drop for OwnedMove {
    fn drop(&mut self) {
        self.api.disconnect(self.raw);
    }
}

/// A tracker that is freed when dropped.
pub struct OwnedTracker {
    api: Arc<dyn MoveApi>,
    raw: TrackerHandle,
}

impl OwnedTracker {
    pub fn new(api: Arc<dyn MoveApi>, raw: TrackerHandle) -> Self {
        OwnedTracker { api, raw }
    }

    pub(crate) fn raw(&self) -> TrackerHandle {
        self.raw
    }
}

impl Drop for OwnedTracker {
    fn drop(&mut self) {
        self.api.tracker_free(self.raw);
    }
}

/// A fusion object that is freed when dropped. Must not outlive the tracker
/// it was built from; the session drops fusion before tracker.
pub struct OwnedFusion {
    api: Arc<dyn MoveApi>,
    raw: FusionHandle,
}

impl OwnedFusion {
    pub fn new(api: Arc<dyn MoveApi>, raw: FusionHandle) -> Self {
        OwnedFusion { api, raw }
    }

    pub(crate) fn raw(&self) -> FusionHandle {
        self.raw
    }
}

impl Drop for OwnedFusion {
    fn drop(&mut self) {
        self.api.fusion_free(self.raw);
    }
}
