bitflags::bitflags! {
    /// Button bitmask reported by a move controller.
    ///
    /// The `TRIGGER` bit gives a binary down/up answer for the analog
    /// trigger; the full 0-255 value is reported separately.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Buttons: u32 {
        const L2       = 1 << 0;
        const R2       = 1 << 1;
        const L1       = 1 << 2;
        const R1       = 1 << 3;
        const TRIANGLE = 1 << 4;
        const CIRCLE   = 1 << 5;
        const CROSS    = 1 << 6;
        const SQUARE   = 1 << 7;
        const SELECT   = 1 << 8;
        const L3       = 1 << 9;
        const R3       = 1 << 10;
        const START    = 1 << 11;
        const UP       = 1 << 12;
        const RIGHT    = 1 << 13;
        const DOWN     = 1 << 14;
        const LEFT     = 1 << 15;
        const PS       = 1 << 16;
        const MOVE     = 1 << 19;
        const TRIGGER  = 1 << 20;
    }
}

/// Status of a controller as seen by the camera tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerStatus {
    /// Controller not registered with the tracker.
    NotCalibrated,
    /// Color calibration failed (check lighting, visibility).
    CalibrationError,
    /// Color calibration successful, not currently tracking.
    Calibrated,
    /// Calibrated and successfully tracked in the camera.
    Tracking,
}

/// Error code reported by the tracker when construction fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerErrorCode {
    Ok,
    NoCameraFound,
    CameraBusy,
    CaptureFailed,
}

/// Camera exposure mode used during tracker calibration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerExposure {
    /// Very low exposure: good tracking, no environment visible.
    Low,
    /// Middle ground: good tracking, environment visible.
    Medium,
    /// High exposure: fair tracking, but good environment.
    High,
    /// Explicit exposure value in `camera_exposure`.
    Manual,
}

/// 3D position smoothing filter applied by the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SmoothingType {
    /// No smoothing.
    None,
    /// Basic low pass filter.
    #[default]
    LowPass,
    /// More expensive Kalman filter.
    Kalman,
}

/// Bulb colors the tracker can calibrate against. Five distinguishable
/// colors bound the number of simultaneously tracked controllers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackingColor {
    #[default]
    Magenta = 0,
    Cyan = 1,
    Yellow = 2,
    Red = 3,
    Green = 4,
}

/// Exposure policy requested in [`crate::WorkerSettings`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExposureMode {
    /// Manual exposure, fraction of the camera's range in `[0, 1]`.
    Manual(f32),
    /// Automatic low exposure.
    Low,
}

impl Default for ExposureMode {
    fn default() -> Self {
        ExposureMode::Low
    }
}

/// Tracker construction settings passed through to the native SDK.
///
/// Only the knobs the worker actually configures are modelled; everything
/// else keeps the SDK's defaults on the native side.
#[derive(Debug, Clone)]
pub struct TrackerSettings {
    pub exposure_mode: TrackerExposure,
    /// Explicit exposure in `[0, 0xFFFF]`, used with `TrackerExposure::Manual`.
    pub camera_exposure: u16,
    /// Mirror the camera image horizontally.
    pub camera_mirror: bool,
    /// Estimate the sphere with an ellipse fit instead of a circle fit.
    pub use_fit_ellipse: bool,
    /// First color to hand out when enabling controllers.
    pub color_list_start_index: TrackingColor,
    /// Maximum age in seconds of a cached color mapping before it is
    /// recalibrated. Zero bypasses the cache entirely.
    pub color_mapping_max_age: u32,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        TrackerSettings {
            exposure_mode: TrackerExposure::Low,
            camera_exposure: (255 * 15) as u16,
            camera_mirror: false,
            use_fit_ellipse: false,
            color_list_start_index: TrackingColor::Magenta,
            color_mapping_max_age: 2 * 60 * 60,
        }
    }
}

/// Position smoothing settings read from and written back to the tracker.
#[derive(Debug, Clone, Copy, Default)]
pub struct SmoothingSettings {
    /// Adaptive x/y smoothing on the 2D pixel location.
    pub filter_2d_xy: bool,
    /// Adaptive radius smoothing on the 2D blob.
    pub filter_2d_r: bool,
    /// 3D position filter.
    pub filter_3d: SmoothingType,
}
