//! Consumer-side controller handle.
//!
//! A [`MoveContext`] is bound to exactly one slot at acquisition time and is
//! the only surface game code sees: accessors gated on connection state,
//! press/release edge detection against the previous published frame, and
//! request posts that cross to the worker. Dropping a bound context clears
//! it and releases its claim on the slot table; the worker tears tracking
//! down once the last claim is gone.

use crate::pose::{HostCameraFrame, Pose};
use crate::shared::{LocalSlotView, SharedState};
use crate::types::Buttons;
use glam::{Quat, Vec3};
use std::sync::Arc;

pub struct MoveContext {
    slot: usize,
    pose: Pose,
    /// None for a detached context; every accessor then reports neutral.
    view: Option<LocalSlotView>,
    /// Counter to decrement on drop. Held only while bound.
    counter: Option<Arc<SharedState>>,
    previous_buttons: Buttons,
    previous_trigger: u8,
}

impl MoveContext {
    pub(crate) fn bind(shared: Arc<SharedState>, slot: usize) -> Self {
        shared.increment_acquired();
        MoveContext {
            slot,
            pose: Pose::new(),
            view: Some(LocalSlotView::new(shared.clone(), slot)),
            counter: Some(shared),
            previous_buttons: Buttons::empty(),
            previous_trigger: 0,
        }
    }

    /// A context bound to nothing. Reports "not connected" and neutral
    /// values from every accessor.
    pub fn detached() -> Self {
        MoveContext {
            slot: usize::MAX,
            pose: Pose::new(),
            view: None,
            counter: None,
            previous_buttons: Buttons::empty(),
            previous_trigger: 0,
        }
    }

    pub fn slot_index(&self) -> Option<usize> {
        self.view.as_ref().map(|_| self.slot)
    }

    pub fn pose(&self) -> &Pose {
        &self.pose
    }

    /// Push pending consumer requests to the shared slot.
    pub fn component_post(&mut self) {
        if let Some(view) = self.view.as_mut() {
            view.component_post();
        }
    }

    /// Pull the latest worker publish. When the sequence number advanced,
    /// commit the previous frame's button/trigger state for edge detection
    /// and refresh the world-space pose against the supplied host frame.
    pub fn component_read(&mut self, frame: Option<&HostCameraFrame>) {
        let Some(view) = self.view.as_mut() else {
            return;
        };

        // Back up state we want deltas on before the copy stomps it.
        let previous_sequence = view.data.sequence;
        let previous_buttons = view.data.buttons;
        let previous_trigger = view.data.trigger;

        view.component_read();

        if view.data.sequence != previous_sequence {
            self.previous_buttons = previous_buttons;
            self.previous_trigger = previous_trigger;

            let raw_position = view.data.position;
            let raw_orientation = view.data.orientation;
            self.pose.update(raw_position, raw_orientation, frame);
        }
    }

    // -- Requests (consumer -> worker) --

    /// Request a rumble level (0-255). Level-triggered; post 0 to stop.
    pub fn post_rumble_request(&mut self, strength: u8) {
        if self.is_connected() {
            if let Some(view) = self.view.as_mut() {
                view.data.rumble_request = strength;
            }
            self.component_post();
        }
    }

    /// Request a switch to the next available tracking color.
    pub fn post_cycle_color_request(&mut self) {
        if self.is_connected() {
            if let Some(view) = self.view.as_mut() {
                view.data.cycle_color_request = true;
            }
            self.component_post();
        }
    }

    /// Request that the current pose become the zero pose. Clears the local
    /// yaw correction immediately; the worker services the rest.
    pub fn post_reset_pose_request(&mut self) {
        if self.is_connected() {
            self.pose.reset_yaw_snapshot();
            if let Some(view) = self.view.as_mut() {
                view.data.reset_pose_request = true;
            }
            self.component_post();
        }
    }

    // -- Accessors --

    fn connected_view(&self) -> Option<&LocalSlotView> {
        self.view.as_ref().filter(|v| v.data.connected)
    }

    pub fn is_connected(&self) -> bool {
        self.connected_view().is_some()
    }

    pub fn is_tracking(&self) -> bool {
        self.connected_view().map(|v| v.data.tracking).unwrap_or(false)
    }

    pub fn is_enabled(&self) -> bool {
        self.connected_view().map(|v| v.data.enabled).unwrap_or(false)
    }

    /// Raw tracking-space position in centimeters. Independent of whether
    /// tracking is currently enabled.
    pub fn tracking_space_position(&self) -> Vec3 {
        self.connected_view()
            .map(|v| v.data.position)
            .unwrap_or(Vec3::ZERO)
    }

    /// Raw controller orientation in the native coordinate system.
    pub fn tracking_space_orientation(&self) -> Quat {
        self.connected_view()
            .map(|v| v.data.orientation)
            .unwrap_or(Quat::IDENTITY)
    }

    pub fn trigger_value(&self) -> u8 {
        self.connected_view().map(|v| v.data.trigger).unwrap_or(0)
    }

    pub fn previous_trigger_value(&self) -> u8 {
        self.previous_trigger
    }

    /// Whether every bit of `mask` is currently down.
    pub fn button(&self, mask: Buttons) -> bool {
        self.connected_view()
            .map(|v| v.data.buttons.contains(mask))
            .unwrap_or(false)
    }

    /// Down this frame but not the previous one.
    pub fn button_pressed(&self, mask: Buttons) -> bool {
        self.connected_view()
            .map(|v| !self.previous_buttons.intersects(mask) && v.data.buttons.intersects(mask))
            .unwrap_or(false)
    }

    /// Down the previous frame but not this one.
    pub fn button_released(&self, mask: Buttons) -> bool {
        self.connected_view()
            .map(|v| self.previous_buttons.intersects(mask) && !v.data.buttons.intersects(mask))
            .unwrap_or(false)
    }

    fn clear(&mut self) {
        self.slot = usize::MAX;
        self.pose.clear();
        if let Some(view) = self.view.as_mut() {
            view.clear();
        }
        self.previous_buttons = Buttons::empty();
        self.previous_trigger = 0;
    }
}

impl Drop for MoveContext {
    fn drop(&mut self) {
        if let Some(counter) = self.counter.take() {
            self.clear();
            self.view = None;
            counter.decrement_acquired();
        }
    }
}
