//! Demand-driven ownership of the native tracker and fusion objects.
//!
//! A [`TrackingSession`] is Uninitialized or Active. It goes Active only
//! while at least one consumer context is acquired and is torn down again
//! when the last one is released; every transition discards and reacquires
//! all native handles. The per-slot controller handles live here too so
//! teardown can disconnect everything in one place.

use crate::api::{MoveApi, OwnedFusion, OwnedMove, OwnedTracker};
use crate::error::MoveLinkError;
use crate::shared::{LocalSlotView, MAX_CONTROLLERS};
use crate::types::{ExposureMode, TrackerExposure, TrackerSettings};
use crate::worker::WorkerSettings;
use crate::Result;
use std::sync::Arc;
use std::time::Instant;

/// Fusion depth bounds in tracker centimeters.
const FUSION_Z_NEAR_CM: f32 = 1.0;
const FUSION_Z_FAR_CM: f32 = 1000.0;

pub struct TrackingSession {
    api: Arc<dyn MoveApi>,
    pub(crate) tracker: Option<OwnedTracker>,
    pub(crate) fusion: Option<OwnedFusion>,
    pub(crate) camera_width: u32,
    pub(crate) camera_height: u32,
    /// Connected controller handles, slot-indexed.
    pub(crate) controllers: [Option<OwnedMove>; MAX_CONTROLLERS],
    /// Device count reported by the last enumeration.
    pub(crate) controller_count: usize,
    /// Last time the connected-device count was polled. None forces an
    /// immediate poll on the next refresh.
    pub(crate) last_count_poll: Option<Instant>,
}

impl TrackingSession {
    pub fn new(api: Arc<dyn MoveApi>) -> Self {
        TrackingSession {
            api,
            tracker: None,
            fusion: None,
            camera_width: 0,
            camera_height: 0,
            controllers: std::array::from_fn(|_| None),
            controller_count: 0,
            last_count_poll: None,
        }
    }

    pub fn api(&self) -> &Arc<dyn MoveApi> {
        &self.api
    }

    /// Active iff both native handles are held.
    pub fn is_active(&self) -> bool {
        self.tracker.is_some() && self.fusion.is_some()
    }

    /// Build the tracker and fusion objects. On any failure the session is
    /// left Uninitialized with every partially constructed handle released.
    pub fn set_up(&mut self, settings: &WorkerSettings) -> Result<()> {
        self.reset_counters();

        log::info!("Setting up tracking session");

        let mut tracker_settings = TrackerSettings {
            // The pose pipeline owns smoothing; bypass the on-disk color
            // calibration cache entirely.
            color_mapping_max_age: 0,
            use_fit_ellipse: true,
            camera_mirror: true,
            color_list_start_index: settings.initial_color,
            ..TrackerSettings::default()
        };
        match settings.exposure {
            ExposureMode::Manual(value) => {
                tracker_settings.exposure_mode = TrackerExposure::Manual;
                tracker_settings.camera_exposure =
                    (value.clamp(0.0, 1.0) * 65535.0) as u16;
            }
            ExposureMode::Low => {
                tracker_settings.exposure_mode = TrackerExposure::Low;
            }
        }

        let raw_tracker = match self.api.tracker_new(&tracker_settings) {
            Some(raw) => raw,
            None => {
                let code = self.api.tracker_last_error();
                log::error!("Tracker failed to initialize: {:?}", code);
                return Err(MoveLinkError::TrackerSetup(code));
            }
        };
        let tracker = OwnedTracker::new(self.api.clone(), raw_tracker);
        log::info!("Tracker initialized");

        // 2D pixel-level smoothing stays off; position smoothing happens in
        // the 3D filter selected by the caller.
        let mut smoothing = self.api.tracker_smoothing_settings(raw_tracker);
        smoothing.filter_2d_xy = false;
        smoothing.filter_2d_r = false;
        smoothing.filter_3d = settings.filter_3d;
        self.api.tracker_set_smoothing_settings(raw_tracker, &smoothing);

        let (width, height) = self.api.tracker_size(raw_tracker);
        self.camera_width = width;
        self.camera_height = height;
        log::info!("Camera dimensions: {} x {}", width, height);

        let raw_fusion = match self
            .api
            .fusion_new(raw_tracker, FUSION_Z_NEAR_CM, FUSION_Z_FAR_CM)
        {
            Some(raw) => raw,
            None => {
                log::error!("Fusion failed to initialize");
                // `tracker` drops here and frees the native handle.
                return Err(MoveLinkError::FusionSetup);
            }
        };

        self.tracker = Some(tracker);
        self.fusion = Some(OwnedFusion::new(self.api.clone(), raw_fusion));
        log::info!("Fusion initialized");

        Ok(())
    }

    /// Disconnect every controller, free fusion then tracker, reset
    /// counters. Safe to call when already torn down.
    pub fn tear_down(&mut self, views: &mut [LocalSlotView]) {
        log::info!("Tearing down tracking session");

        for (slot, controller) in self.controllers.iter_mut().enumerate() {
            if controller.take().is_some() {
                log::info!("Disconnecting controller {}", slot);
                if let Some(view) = views.get_mut(slot) {
                    view.data.connected = false;
                    view.data.enabled = false;
                }
            }
        }

        if self.fusion.take().is_some() {
            log::info!("Fusion disposed");
        }
        if self.tracker.take().is_some() {
            log::info!("Tracker disposed");
        }

        self.reset_counters();
    }

    fn reset_counters(&mut self) {
        self.controller_count = 0;
        self.camera_width = 0;
        self.camera_height = 0;
        self.last_count_poll = None;
    }
}
