//! The controller worker.
//!
//! One tick: snapshot the acquired-context count, bring the tracking
//! session up or down to match demand, refresh controller connections at a
//! throttled interval, grab a camera frame, update tracked positions, then
//! drain pending bluetooth updates per controller (orientation, buttons,
//! rumble, LED push, color cycling) and publish each snapshot to the shared
//! slot table.
//!
//! Two interchangeable schedulings: a dedicated background thread ticking
//! at a short sleep interval, or cooperative mode where the host calls
//! [`MoveWorker::update`] once per frame. Nothing from inside a tick
//! propagates to the scheduler; failures are logged and retried next tick.

use crate::api::{self, MoveApi, OwnedMove};
use crate::context::MoveContext;
use crate::error::MoveLinkError;
use crate::session::TrackingSession;
use crate::shared::{LocalSlotView, SharedState, MAX_CONTROLLERS};
use crate::types::{ExposureMode, SmoothingType, TrackerStatus, TrackingColor};
use crate::watchdog::{self, HitchWatchdog, MICROSECONDS_PER_MILLISECOND};
use crate::Result;
use crossbeam_channel::{Receiver, Sender};
use glam::Vec3;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Worker configuration, fixed for the lifetime of the worker.
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    /// Run the tick loop on a dedicated background thread. When false the
    /// host drives ticks via [`MoveWorker::update`].
    pub multithreaded: bool,
    pub exposure: ExposureMode,
    pub initial_color: TrackingColor,
    pub filter_3d: SmoothingType,
    /// Fixed offset added to the fused location, tracker centimeters.
    pub position_offset: Vec3,
    /// Skip camera tracking entirely; bluetooth I/O still runs.
    pub disable_tracking: bool,
    pub emit_hitch_logging: bool,
    /// Minimum interval between connected-device enumerations.
    pub connection_poll_interval: Duration,
    /// Application resource path handed to the native SDK for calibration
    /// data. Unused while the color cache is bypassed.
    pub application_data_path: Option<PathBuf>,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        WorkerSettings {
            multithreaded: true,
            exposure: ExposureMode::Low,
            initial_color: TrackingColor::Magenta,
            filter_3d: SmoothingType::LowPass,
            position_offset: Vec3::ZERO,
            disable_tracking: false,
            emit_hitch_logging: false,
            connection_poll_interval: Duration::from_secs(1),
            application_data_path: None,
        }
    }
}

/// Handle to a running worker.
///
/// Consumer contexts are acquired per slot; dropping the last context tears
/// the tracking session down on the next tick. Dropping the worker (or
/// calling [`MoveWorker::stop`]) stops the scheduling, tears everything
/// down, and shuts the native API down.
pub struct MoveWorker {
    shared: Arc<SharedState>,
    api: Option<Arc<dyn MoveApi>>,
    scheduling: Scheduling,
}

enum Scheduling {
    Threaded {
        stop: Arc<AtomicBool>,
        exited: Receiver<()>,
        thread: Option<std::thread::JoinHandle<()>>,
    },
    Cooperative(Box<WorkerCore>),
}

impl MoveWorker {
    /// Initialize the native API and start the worker.
    ///
    /// A failed native init is the only fatal startup error; everything
    /// later is absorbed per tick and retried.
    pub fn start(api: Arc<dyn MoveApi>, settings: WorkerSettings) -> Result<MoveWorker> {
        watchdog::set_hitch_logging(settings.emit_hitch_logging);

        if !api.init(api::CURRENT_VERSION) {
            return Err(MoveLinkError::InitFailed);
        }

        let shared = SharedState::new();
        let views = (0..MAX_CONTROLLERS)
            .map(|slot| LocalSlotView::new(shared.clone(), slot))
            .collect();
        let core = WorkerCore {
            settings: settings.clone(),
            shared: shared.clone(),
            session: TrackingSession::new(api.clone()),
            views,
        };

        let scheduling = if settings.multithreaded {
            let stop = Arc::new(AtomicBool::new(false));
            let (exit_tx, exit_rx) = crossbeam_channel::bounded(1);
            let stop_clone = stop.clone();
            let thread = match std::thread::Builder::new()
                .name("movelink-worker".into())
                .spawn(move || run_worker_loop(core, stop_clone, exit_tx))
            {
                Ok(thread) => thread,
                Err(e) => {
                    // Init already succeeded; release it before bailing out.
                    api.shutdown();
                    return Err(MoveLinkError::ThreadSpawn(e.to_string()));
                }
            };
            Scheduling::Threaded {
                stop,
                exited: exit_rx,
                thread: Some(thread),
            }
        } else {
            Scheduling::Cooperative(Box::new(core))
        };

        Ok(MoveWorker {
            shared,
            api: Some(api),
            scheduling,
        })
    }

    /// Bind a consumer context to a slot. The worker brings tracking up on
    /// the next tick if this is the first acquired context.
    pub fn acquire(&self, slot: usize) -> Result<MoveContext> {
        if slot >= MAX_CONTROLLERS {
            return Err(MoveLinkError::SlotOutOfRange(slot));
        }
        Ok(MoveContext::bind(self.shared.clone(), slot))
    }

    /// Release a context. Equivalent to dropping it.
    pub fn release(&self, context: MoveContext) {
        drop(context);
    }

    /// Run one tick synchronously. No-op in multithreaded mode.
    pub fn update(&mut self) {
        if let Scheduling::Cooperative(core) = &mut self.scheduling {
            core.tick();
        }
    }

    /// Stop the worker, tearing down tracking and all connections.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        match &mut self.scheduling {
            Scheduling::Threaded {
                stop,
                exited,
                thread,
            } => {
                if let Some(thread) = thread.take() {
                    stop.store(true, Ordering::Relaxed);
                    match exited.recv_timeout(Duration::from_secs(10)) {
                        Ok(()) => {
                            let _ = thread.join();
                        }
                        Err(_) => {
                            log::warn!("Worker thread did not acknowledge stop within 10s");
                        }
                    }
                }
            }
            Scheduling::Cooperative(core) => core.teardown(),
        }

        if let Some(api) = self.api.take() {
            api.shutdown();
        }
    }
}

impl Drop for MoveWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Dedicated-thread scheduling: settle briefly, then tick / check the stop
/// flag / sleep. Teardown is attempted and the exit acknowledgement sent
/// even if a tick crashed, so a waiting `stop()` never blocks forever.
fn run_worker_loop(mut core: WorkerCore, stop: Arc<AtomicBool>, exited: Sender<()>) {
    let loop_result = catch_unwind(AssertUnwindSafe(|| {
        std::thread::sleep(Duration::from_millis(30));

        while !stop.load(Ordering::Relaxed) {
            core.tick();

            if !stop.load(Ordering::Relaxed) {
                std::thread::sleep(Duration::from_millis(1));
            }
        }
    }));
    if loop_result.is_err() {
        log::error!("Worker thread crashed; tearing down");
    }

    if catch_unwind(AssertUnwindSafe(|| core.teardown())).is_err() {
        log::error!("Worker teardown crashed");
    }

    let _ = exited.send(());
}

/// Tick state confined to whichever thread schedules the worker.
struct WorkerCore {
    settings: WorkerSettings,
    shared: Arc<SharedState>,
    session: TrackingSession,
    views: Vec<LocalSlotView>,
}

impl WorkerCore {
    fn tick(&mut self) {
        let _tick_watchdog =
            HitchWatchdog::new("MoveWorker::tick", 34 * MICROSECONDS_PER_MILLISECOND);

        let acquired = self.shared.acquired_count();

        // Demand-driven session lifecycle. Setup failures are logged and
        // retried next tick while demand persists.
        if !self.settings.disable_tracking {
            if acquired > 0 && !self.session.is_active() {
                if let Err(e) = self.session.set_up(&self.settings) {
                    log::warn!("Tracking session setup failed: {}", e);
                }
            } else if acquired == 0 && self.session.is_active() {
                self.session.tear_down(&mut self.views);
            }
        }

        if self.settings.disable_tracking || self.session.is_active() {
            self.refresh_connections();

            if !self.update_camera_image() {
                return;
            }

            for slot in 0..self.session.controller_count.min(MAX_CONTROLLERS) {
                self.update_position(slot);
                self.drain_device_updates(slot);
            }
        }
    }

    /// Grab a fresh camera frame. Returns false when the tick should be
    /// abandoned (transient capture failure; next tick retries).
    fn update_camera_image(&mut self) -> bool {
        let Some(tracker) = &self.session.tracker else {
            // Tracking disabled: nothing to refresh.
            return true;
        };
        let _watchdog =
            HitchWatchdog::new("MoveWorker::update_image", 33 * MICROSECONDS_PER_MILLISECOND);
        if let Err(e) = self.session.api().tracker_update_image(tracker.raw()) {
            log::warn!("Camera image update failed: {}", e);
            return false;
        }
        true
    }

    /// Update one slot's tracked position. With tracking disabled the
    /// tracking flag is forced false and the position passes through
    /// untouched.
    fn update_position(&mut self, slot: usize) {
        if self.settings.disable_tracking {
            self.views[slot].data.tracking = false;
            return;
        }

        let (Some(tracker), Some(fusion), Some(controller)) = (
            &self.session.tracker,
            &self.session.fusion,
            &self.session.controllers[slot],
        ) else {
            return;
        };
        let api = self.session.api();

        // Locate the sphere in the current frame.
        api.tracker_update(tracker.raw(), controller.raw());
        let status = api.tracker_status(tracker.raw(), controller.raw());
        let tracking = status == TrackerStatus::Tracking;

        let position = if tracking {
            let location_cm = api.fusion_transformed_location(fusion.raw(), controller.raw());
            Some(location_cm + self.settings.position_offset)
        } else {
            None
        };

        let view = &mut self.views[slot];
        view.data.tracking = tracking;
        if let Some(position) = position {
            view.data.position = position;
        }
    }

    /// Drain one slot's pending bluetooth updates, servicing consumer
    /// requests and publishing each snapshot.
    fn drain_device_updates(&mut self, slot: usize) {
        let api = self.session.api().clone();

        let Some(handle) = self.session.controllers[slot].as_ref().map(OwnedMove::raw) else {
            return;
        };

        while api.poll(handle) > 0 {
            let view = &mut self.views[slot];

            view.data.orientation = api.orientation(handle);
            view.data.buttons = api.buttons(handle);
            view.data.trigger = api.trigger(handle);

            // Pull pending rumble/reset/cycle-color requests.
            view.worker_read();

            api.set_rumble(handle, view.data.rumble_request);
            api.update_leds(handle);

            if view.data.cycle_color_request {
                if !self.settings.disable_tracking {
                    if let Some(tracker) = &self.session.tracker {
                        log::info!("Cycling tracking color for controller {}", slot);
                        api.tracker_cycle_color(tracker.raw(), handle);
                    }
                } else {
                    log::warn!("Cycle color ignored: tracking is disabled");
                }
                self.views[slot].data.cycle_color_request = false;
            }

            // Publish position, orientation, buttons, flags.
            self.views[slot].worker_post();
        }
    }

    /// Throttled connection refresh: re-enumerate devices, connect new
    /// slots, enable tracking for calibrated controllers, disconnect slots
    /// past the reported count.
    fn refresh_connections(&mut self) {
        let due = self
            .session
            .last_count_poll
            .map(|t| t.elapsed() >= self.settings.connection_poll_interval)
            .unwrap_or(true);
        if !due {
            return;
        }

        let api = self.session.api().clone();

        let new_count = api.count_connected().min(MAX_CONTROLLERS);
        if new_count != self.session.controller_count {
            log::info!(
                "Controller count changed: {} -> {}",
                self.session.controller_count,
                new_count
            );
            self.session.controller_count = new_count;
        }

        for slot in 0..MAX_CONTROLLERS {
            if slot < self.session.controller_count {
                if self.session.controllers[slot].is_none() {
                    match api.connect_by_id(slot) {
                        Some(handle) => {
                            api.enable_orientation(handle, true);
                            debug_assert!(api.has_orientation(handle));
                            self.session.controllers[slot] =
                                Some(OwnedMove::new(api.clone(), handle));
                            self.views[slot].data.connected = true;
                        }
                        None => {
                            self.views[slot].data.connected = false;
                            log::error!("Failed to connect to controller {}", slot);
                        }
                    }
                }

                // Connected but not yet registered with the tracker.
                if !self.settings.disable_tracking && !self.views[slot].data.enabled {
                    if let (Some(tracker), Some(controller)) =
                        (&self.session.tracker, &self.session.controllers[slot])
                    {
                        if api.tracker_enable(tracker.raw(), controller.raw())
                            == TrackerStatus::Calibrated
                        {
                            self.views[slot].data.enabled = true;
                        } else {
                            log::error!("Failed to enable tracking for controller {}", slot);
                        }
                    }
                }
            } else if self.session.controllers[slot].take().is_some() {
                // Slot fell off the end of the device list.
                let view = &mut self.views[slot];
                view.data.connected = false;
                view.data.enabled = false;
                view.worker_post();
            }
        }

        self.session.last_count_poll = Some(Instant::now());
    }

    fn teardown(&mut self) {
        self.session.tear_down(&mut self.views);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{FusionHandle, MoveHandle, TrackerHandle};
    use crate::types::{
        Buttons, SmoothingSettings, TrackerErrorCode, TrackerSettings, TrackerStatus,
    };
    use glam::{Quat, Vec3};
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct FakeState {
        fail_init: bool,
        fail_tracker: bool,
        connected_count: usize,
        /// Pending bluetooth updates per controller handle.
        pending_polls: HashMap<u64, u32>,
        buttons: Buttons,
        trigger: u8,
        orientation: Quat,
        location: Vec3,
        status: TrackerStatus,

        trackers_created: usize,
        trackers_freed: usize,
        fusions_created: usize,
        fusions_freed: usize,
        connects: Vec<usize>,
        disconnects: Vec<u64>,
        rumble_calls: Vec<(u64, u8)>,
        cycle_color_calls: usize,
        shutdown_calls: usize,
    }

    /// Scripted native SDK: reports whatever the test staged, records every
    /// lifecycle call.
    struct FakeApi {
        state: Mutex<FakeState>,
    }

    impl FakeApi {
        fn new(connected_count: usize) -> Arc<FakeApi> {
            Arc::new(FakeApi {
                state: Mutex::new(FakeState {
                    fail_init: false,
                    fail_tracker: false,
                    connected_count,
                    pending_polls: HashMap::new(),
                    buttons: Buttons::empty(),
                    trigger: 0,
                    orientation: Quat::IDENTITY,
                    location: Vec3::ZERO,
                    status: TrackerStatus::Tracking,
                    trackers_created: 0,
                    trackers_freed: 0,
                    fusions_created: 0,
                    fusions_freed: 0,
                    connects: Vec::new(),
                    disconnects: Vec::new(),
                    rumble_calls: Vec::new(),
                    cycle_color_calls: 0,
                    shutdown_calls: 0,
                }),
            })
        }

        fn with<R>(&self, f: impl FnOnce(&mut FakeState) -> R) -> R {
            f(&mut self.state.lock().unwrap())
        }

        /// Queue one pending bluetooth update for every connected handle.
        fn grant_updates(&self) {
            self.with(|s| {
                for id in 0..s.connected_count {
                    *s.pending_polls.entry(handle_for(id)).or_insert(0) += 1;
                }
            });
        }
    }

    fn handle_for(id: usize) -> u64 {
        100 + id as u64
    }

    impl MoveApi for FakeApi {
        fn init(&self, _version: u32) -> bool {
            !self.with(|s| s.fail_init)
        }

        fn shutdown(&self) {
            self.with(|s| s.shutdown_calls += 1);
        }

        fn connect_by_id(&self, id: usize) -> Option<MoveHandle> {
            self.with(|s| {
                if id < s.connected_count {
                    s.connects.push(id);
                    Some(MoveHandle(handle_for(id)))
                } else {
                    None
                }
            })
        }

        fn disconnect(&self, controller: MoveHandle) {
            self.with(|s| s.disconnects.push(controller.0));
        }

        fn count_connected(&self) -> usize {
            self.with(|s| s.connected_count)
        }

        fn enable_orientation(&self, _controller: MoveHandle, _enabled: bool) {}

        fn has_orientation(&self, _controller: MoveHandle) -> bool {
            true
        }

        fn poll(&self, controller: MoveHandle) -> u32 {
            self.with(|s| {
                let pending = s.pending_polls.entry(controller.0).or_insert(0);
                if *pending > 0 {
                    *pending -= 1;
                    1
                } else {
                    0
                }
            })
        }

        fn buttons(&self, _controller: MoveHandle) -> Buttons {
            self.with(|s| s.buttons)
        }

        fn trigger(&self, _controller: MoveHandle) -> u8 {
            self.with(|s| s.trigger)
        }

        fn orientation(&self, _controller: MoveHandle) -> Quat {
            self.with(|s| s.orientation)
        }

        fn set_rumble(&self, controller: MoveHandle, strength: u8) {
            self.with(|s| s.rumble_calls.push((controller.0, strength)));
        }

        fn update_leds(&self, _controller: MoveHandle) {}

        fn tracker_new(&self, _settings: &TrackerSettings) -> Option<TrackerHandle> {
            self.with(|s| {
                if s.fail_tracker {
                    None
                } else {
                    s.trackers_created += 1;
                    Some(TrackerHandle(1))
                }
            })
        }

        fn tracker_free(&self, _tracker: TrackerHandle) {
            self.with(|s| s.trackers_freed += 1);
        }

        fn tracker_last_error(&self) -> TrackerErrorCode {
            TrackerErrorCode::NoCameraFound
        }

        fn tracker_smoothing_settings(&self, _tracker: TrackerHandle) -> SmoothingSettings {
            SmoothingSettings::default()
        }

        fn tracker_set_smoothing_settings(
            &self,
            _tracker: TrackerHandle,
            _settings: &SmoothingSettings,
        ) {
        }

        fn tracker_size(&self, _tracker: TrackerHandle) -> (u32, u32) {
            (640, 480)
        }

        fn tracker_enable(&self, _tracker: TrackerHandle, _controller: MoveHandle) -> TrackerStatus {
            TrackerStatus::Calibrated
        }

        fn tracker_status(&self, _tracker: TrackerHandle, _controller: MoveHandle) -> TrackerStatus {
            self.with(|s| s.status)
        }

        fn tracker_update_image(&self, _tracker: TrackerHandle) -> crate::Result<()> {
            Ok(())
        }

        fn tracker_update(&self, _tracker: TrackerHandle, _controller: MoveHandle) {}

        fn tracker_cycle_color(&self, _tracker: TrackerHandle, _controller: MoveHandle) {
            self.with(|s| s.cycle_color_calls += 1);
        }

        fn fusion_new(
            &self,
            _tracker: TrackerHandle,
            _z_near: f32,
            _z_far: f32,
        ) -> Option<FusionHandle> {
            self.with(|s| {
                s.fusions_created += 1;
                Some(FusionHandle(2))
            })
        }

        fn fusion_free(&self, _fusion: FusionHandle) {
            self.with(|s| s.fusions_freed += 1);
        }

        fn fusion_transformed_location(
            &self,
            _fusion: FusionHandle,
            _controller: MoveHandle,
        ) -> Vec3 {
            self.with(|s| s.location)
        }
    }

    /// Cooperative worker ticked by the test, with the connection poll
    /// throttle disabled.
    fn cooperative_worker(api: Arc<FakeApi>, settings: WorkerSettings) -> MoveWorker {
        let _ = env_logger::builder().is_test(true).try_init();
        let settings = WorkerSettings {
            multithreaded: false,
            connection_poll_interval: Duration::ZERO,
            ..settings
        };
        MoveWorker::start(api, settings).unwrap()
    }

    #[test]
    fn test_init_failure_is_fatal() {
        let api = FakeApi::new(0);
        api.with(|s| s.fail_init = true);
        let result = MoveWorker::start(api.clone(), WorkerSettings::default());
        assert!(matches!(result, Err(MoveLinkError::InitFailed)));
        // A failed init has nothing to release.
        assert_eq!(api.with(|s| s.shutdown_calls), 0);
    }

    #[test]
    fn test_every_successful_init_is_balanced_by_one_shutdown() {
        let api = FakeApi::new(0);
        let worker = cooperative_worker(api.clone(), WorkerSettings::default());
        assert_eq!(api.with(|s| s.shutdown_calls), 0);
        drop(worker);
        assert_eq!(api.with(|s| s.shutdown_calls), 1);
    }

    #[test]
    fn test_acquire_rejects_out_of_range_slot() {
        let api = FakeApi::new(0);
        let worker = cooperative_worker(api, WorkerSettings::default());
        assert!(matches!(
            worker.acquire(MAX_CONTROLLERS),
            Err(MoveLinkError::SlotOutOfRange(_))
        ));
        assert!(worker.acquire(MAX_CONTROLLERS - 1).is_ok());
    }

    #[test]
    fn test_tracking_session_follows_demand() {
        let api = FakeApi::new(1);
        let mut worker = cooperative_worker(api.clone(), WorkerSettings::default());

        // No demand: ticks do nothing.
        worker.update();
        worker.update();
        assert_eq!(api.with(|s| s.trackers_created), 0);

        // First context brings the session up exactly once.
        let ctx = worker.acquire(0).unwrap();
        worker.update();
        worker.update();
        assert_eq!(api.with(|s| s.trackers_created), 1);
        assert_eq!(api.with(|s| s.fusions_created), 1);

        // Last release tears it down exactly once, fusion before tracker.
        drop(ctx);
        worker.update();
        worker.update();
        assert_eq!(api.with(|s| s.trackers_freed), 1);
        assert_eq!(api.with(|s| s.fusions_freed), 1);
        assert_eq!(api.with(|s| s.trackers_created), 1);
    }

    #[test]
    fn test_additional_contexts_do_not_restart_the_session() {
        let api = FakeApi::new(2);
        let mut worker = cooperative_worker(api.clone(), WorkerSettings::default());

        let first = worker.acquire(0).unwrap();
        worker.update();
        assert_eq!(api.with(|s| s.trackers_created), 1);

        // Second context: no new setup. Releasing it: no teardown.
        let second = worker.acquire(1).unwrap();
        worker.update();
        drop(second);
        worker.update();
        assert_eq!(api.with(|s| s.trackers_created), 1);
        assert_eq!(api.with(|s| s.trackers_freed), 0);

        drop(first);
        worker.update();
        assert_eq!(api.with(|s| s.trackers_freed), 1);
    }

    #[test]
    fn test_tracker_setup_failure_is_retried_next_tick() {
        let api = FakeApi::new(1);
        let mut worker = cooperative_worker(api.clone(), WorkerSettings::default());
        let _ctx = worker.acquire(0).unwrap();

        api.with(|s| s.fail_tracker = true);
        worker.update();
        assert_eq!(api.with(|s| s.trackers_created), 0);

        api.with(|s| s.fail_tracker = false);
        worker.update();
        assert_eq!(api.with(|s| s.trackers_created), 1);
        assert_eq!(api.with(|s| s.fusions_created), 1);
    }

    #[test]
    fn test_count_drop_disconnects_only_trailing_slots() {
        let api = FakeApi::new(2);
        let mut worker = cooperative_worker(api.clone(), WorkerSettings::default());
        let _ctx = worker.acquire(0).unwrap();

        worker.update();
        assert_eq!(api.with(|s| s.connects.clone()), vec![0, 1]);

        api.with(|s| s.connected_count = 1);
        worker.update();
        assert_eq!(api.with(|s| s.disconnects.clone()), vec![handle_for(1)]);
    }

    #[test]
    fn test_published_state_reaches_the_context() {
        let api = FakeApi::new(1);
        let mut worker = cooperative_worker(api.clone(), WorkerSettings::default());
        let mut ctx = worker.acquire(0).unwrap();

        api.with(|s| {
            s.buttons = Buttons::MOVE | Buttons::TRIGGER;
            s.trigger = 180;
            s.location = Vec3::new(10.0, 20.0, 30.0);
        });
        api.grant_updates();
        worker.update();

        ctx.component_read(None);
        assert!(ctx.is_connected());
        assert!(ctx.is_tracking());
        assert!(ctx.button(Buttons::MOVE));
        assert_eq!(ctx.trigger_value(), 180);
        assert_eq!(ctx.tracking_space_position(), Vec3::new(10.0, 20.0, 30.0));
    }

    #[test]
    fn test_position_offset_is_applied_to_fused_location() {
        let api = FakeApi::new(1);
        let settings = WorkerSettings {
            position_offset: Vec3::new(0.0, -5.0, 0.0),
            ..WorkerSettings::default()
        };
        let mut worker = cooperative_worker(api.clone(), settings);
        let mut ctx = worker.acquire(0).unwrap();

        api.with(|s| s.location = Vec3::new(1.0, 2.0, 3.0));
        api.grant_updates();
        worker.update();

        ctx.component_read(None);
        assert_eq!(ctx.tracking_space_position(), Vec3::new(1.0, -3.0, 3.0));
    }

    #[test]
    fn test_rumble_is_level_triggered_and_cycle_color_edge_triggered() {
        let api = FakeApi::new(1);
        let mut worker = cooperative_worker(api.clone(), WorkerSettings::default());
        let mut ctx = worker.acquire(0).unwrap();

        // One tick so the context can see itself connected.
        api.grant_updates();
        worker.update();
        ctx.component_read(None);
        assert!(ctx.is_connected());

        ctx.post_rumble_request(128);
        ctx.post_cycle_color_request();
        api.grant_updates();
        worker.update();
        assert_eq!(
            api.with(|s| s.rumble_calls.last().copied()),
            Some((handle_for(0), 128))
        );
        assert_eq!(api.with(|s| s.cycle_color_calls), 1);

        // Next tick: rumble repeats at the posted level, color does not.
        api.grant_updates();
        worker.update();
        assert_eq!(
            api.with(|s| s.rumble_calls.last().copied()),
            Some((handle_for(0), 128))
        );
        assert_eq!(api.with(|s| s.cycle_color_calls), 1);
    }

    #[test]
    fn test_disabled_tracking_still_connects_and_polls() {
        let api = FakeApi::new(1);
        let settings = WorkerSettings {
            disable_tracking: true,
            ..WorkerSettings::default()
        };
        let mut worker = cooperative_worker(api.clone(), settings);
        let mut ctx = worker.acquire(0).unwrap();

        api.with(|s| s.trigger = 99);
        api.grant_updates();
        worker.update();

        assert_eq!(api.with(|s| s.trackers_created), 0);
        ctx.component_read(None);
        assert!(ctx.is_connected());
        assert!(!ctx.is_tracking());
        assert_eq!(ctx.trigger_value(), 99);
    }

    #[test]
    fn test_threaded_stop_joins_and_shuts_down() {
        let api = FakeApi::new(0);
        let worker = MoveWorker::start(api.clone(), WorkerSettings::default()).unwrap();
        std::thread::sleep(Duration::from_millis(50));
        worker.stop();
        assert_eq!(api.with(|s| s.shutdown_calls), 1);
    }
}
