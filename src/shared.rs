//! Cross-thread controller state table.
//!
//! One [`SharedSlot`] per controller, each independently mutex-guarded. The
//! worker and a consumer each stage their work in a thread-confined
//! [`LocalSlotView`] and move data across the boundary with the four transfer
//! operations. Every transfer copies a fixed set of fields in one direction
//! under a single guard acquisition, so a consumer observing a sequence
//! number change is guaranteed a consistent snapshot of all
//! worker-authoritative fields. No transfer ever calls into the native SDK.

use crate::types::Buttons;
use crate::watchdog::HitchWatchdog;
use glam::{Quat, Vec3};
use std::sync::{Arc, Mutex};

/// Number of controller slots, fixed at startup. Bounded by the five
/// distinguishable tracking colors.
pub const MAX_CONTROLLERS: usize = 5;

/// Transfers must complete well under this; a stall is reported, not aborted.
const TRANSFER_HITCH_THRESHOLD_US: u64 = 500;

/// Per-slot controller state as it crosses the thread boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlotState {
    // Worker-authoritative: filled by the worker, read by the consumer.
    pub position: Vec3,
    pub orientation: Quat,
    pub buttons: Buttons,
    pub trigger: u8,
    /// Whether the controller is connected.
    pub connected: bool,
    /// Whether the tracker saw the controller on the latest frame.
    pub tracking: bool,
    /// Whether the tracker is tracking this specific controller.
    pub enabled: bool,
    /// Increments with every worker publish.
    pub sequence: u32,

    // Consumer-authoritative: filled by the consumer, read by the worker.
    pub rumble_request: u8,
    /// Edge-triggered: use the current pose as zero-pose.
    pub reset_pose_request: bool,
    /// Edge-triggered: change to the next available color.
    pub cycle_color_request: bool,
}

impl SlotState {
    pub fn new() -> Self {
        SlotState {
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            buttons: Buttons::empty(),
            trigger: 0,
            connected: false,
            tracking: false,
            enabled: false,
            sequence: 0,
            rumble_request: 0,
            reset_pose_request: false,
            cycle_color_request: false,
        }
    }

    pub fn clear(&mut self) {
        *self = SlotState::new();
    }
}

impl Default for SlotState {
    fn default() -> Self {
        SlotState::new()
    }
}

/// The single cross-thread-visible copy of one slot.
pub struct SharedSlot {
    state: Mutex<SlotState>,
}

impl SharedSlot {
    fn new() -> Self {
        SharedSlot {
            state: Mutex::new(SlotState::new()),
        }
    }

    /// Run one guarded transfer between the shared copy and a local copy.
    ///
    /// The closure runs with the guard held and must only copy fields; the
    /// watchdog reports (never aborts) transfers past the threshold.
    fn transfer(&self, label: &'static str, f: impl FnOnce(&mut SlotState)) {
        let _watchdog = HitchWatchdog::new(label, TRANSFER_HITCH_THRESHOLD_US);
        let mut shared = self.state.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut shared);
    }
}

/// Fixed table of per-slot shared state plus the acquired-context counter.
pub struct SharedState {
    slots: [SharedSlot; MAX_CONTROLLERS],
    acquired: Mutex<usize>,
}

impl SharedState {
    pub fn new() -> Arc<SharedState> {
        Arc::new(SharedState {
            slots: std::array::from_fn(|_| SharedSlot::new()),
            acquired: Mutex::new(0),
        })
    }

    /// Number of consumer contexts currently bound to a slot.
    pub fn acquired_count(&self) -> usize {
        *self.acquired.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn increment_acquired(&self) {
        *self.acquired.lock().unwrap_or_else(|e| e.into_inner()) += 1;
    }

    pub(crate) fn decrement_acquired(&self) {
        let mut count = self.acquired.lock().unwrap_or_else(|e| e.into_inner());
        debug_assert!(*count > 0);
        *count = count.saturating_sub(1);
    }
}

impl Default for SharedState {
    fn default() -> Self {
        SharedState {
            slots: std::array::from_fn(|_| SharedSlot::new()),
            acquired: Mutex::new(0),
        }
    }
}

/// Thread-confined mirror of one slot.
///
/// The owning thread reads and writes `data` freely, then crosses the
/// boundary with one of the four transfer operations.
pub struct LocalSlotView {
    shared: Arc<SharedState>,
    index: usize,
    pub data: SlotState,
}

impl LocalSlotView {
    pub fn new(shared: Arc<SharedState>, index: usize) -> Self {
        debug_assert!(index < MAX_CONTROLLERS);
        LocalSlotView {
            shared,
            index,
            data: SlotState::new(),
        }
    }

    pub fn slot_index(&self) -> usize {
        self.index
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Consumer -> shared: publish request fields, then clear the local
    /// edge-triggered flags so one user request is serviced exactly once.
    pub fn component_post(&mut self) {
        let LocalSlotView { shared, index, data } = self;
        shared.slots[*index].transfer("LocalSlotView::component_post", |shared| {
            shared.rumble_request = data.rumble_request;
            shared.reset_pose_request = data.reset_pose_request;
            shared.cycle_color_request = data.cycle_color_request;

            data.reset_pose_request = false;
            data.cycle_color_request = false;
        });
    }

    /// Shared -> consumer: pull every worker-authoritative field.
    pub fn component_read(&mut self) {
        let LocalSlotView { shared, index, data } = self;
        shared.slots[*index].transfer("LocalSlotView::component_read", |shared| {
            data.position = shared.position;
            data.orientation = shared.orientation;
            data.buttons = shared.buttons;
            data.trigger = shared.trigger;
            data.connected = shared.connected;
            data.tracking = shared.tracking;
            data.enabled = shared.enabled;
            data.sequence = shared.sequence;
        });
    }

    /// Shared -> worker: pull request fields, clearing the shared
    /// edge-triggered flags in the same guard acquisition.
    pub fn worker_read(&mut self) {
        let LocalSlotView { shared, index, data } = self;
        shared.slots[*index].transfer("LocalSlotView::worker_read", |shared| {
            data.rumble_request = shared.rumble_request;
            data.reset_pose_request = shared.reset_pose_request;
            data.cycle_color_request = shared.cycle_color_request;

            shared.reset_pose_request = false;
            shared.cycle_color_request = false;
        });
    }

    /// Worker -> shared: bump the sequence number, then publish every
    /// worker-authoritative field. The sequence bump is the single
    /// authoritative "new data available" signal.
    pub fn worker_post(&mut self) {
        let LocalSlotView { shared, index, data } = self;
        data.sequence = data.sequence.wrapping_add(1);
        shared.slots[*index].transfer("LocalSlotView::worker_post", |shared| {
            shared.position = data.position;
            shared.orientation = data.orientation;
            shared.buttons = data.buttons;
            shared.trigger = data.trigger;
            shared.connected = data.connected;
            shared.tracking = data.tracking;
            shared.enabled = data.enabled;
            shared.sequence = data.sequence;
        });
    }
}
