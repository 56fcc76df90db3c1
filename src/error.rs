use crate::types::TrackerErrorCode;

/// Errors that can occur when driving the native move API.
#[derive(Debug, thiserror::Error)]
pub enum MoveLinkError {
    #[error("native move API init failed (wrong version?)")]
    InitFailed,

    #[error("tracker failed to initialize: {0:?}")]
    TrackerSetup(TrackerErrorCode),

    #[error("fusion failed to initialize")]
    FusionSetup,

    #[error("camera image update failed: {0}")]
    ImageUpdate(String),

    #[error("controller slot {0} out of range")]
    SlotOutOfRange(usize),

    #[error("worker thread failed to spawn: {0}")]
    ThreadSpawn(String),
}
