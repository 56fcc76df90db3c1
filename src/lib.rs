//! # movelink - engine integration layer for PS Move motion controllers
//!
//! Drives a native camera-tracking SDK from a background worker, multiplexes
//! up to five physical controllers onto a fixed slot table, and publishes
//! controller state across a producer/consumer boundary to the host engine's
//! per-frame update loop. Provides:
//! - Double-buffered cross-thread state handoff with sequence-number change
//!   detection
//! - Demand-driven setup/teardown of camera tracking and per-controller
//!   connections
//! - World-space pose reconciliation with yaw-zeroing and position-zeroing
//!
//! The native SDK is consumed through the [`api::MoveApi`] trait; the host
//! engine supplies a [`pose::HostCameraFrame`] per read and either drives the
//! worker cooperatively once per frame or lets it run on its own thread.
//!
//! ## Quick Start
//! ```no_run
//! use movelink::{MoveWorker, WorkerSettings};
//! # fn api() -> std::sync::Arc<dyn movelink::api::MoveApi> { unimplemented!() }
//!
//! let worker = MoveWorker::start(api(), WorkerSettings::default()).unwrap();
//! let mut ctx = worker.acquire(0).unwrap();
//! ctx.component_read(None);
//! if ctx.is_tracking() {
//!     println!("pos: {:?}", ctx.tracking_space_position());
//! }
//! drop(ctx);
//! worker.stop();
//! ```

pub mod api;
pub mod context;
pub mod error;
pub mod pose;
pub mod session;
pub mod shared;
pub mod types;
pub mod watchdog;
pub mod worker;

pub use context::MoveContext;
pub use error::MoveLinkError;
pub use pose::{HostCameraFrame, Pose, TrackingReference};
pub use types::*;
pub use worker::{MoveWorker, WorkerSettings};

/// Result type alias for movelink operations.
pub type Result<T> = std::result::Result<T, MoveLinkError>;
