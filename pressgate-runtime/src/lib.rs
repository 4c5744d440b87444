//! Async Runtime for Pressgate Gateways
//!
//! ## Overview
//!
//! `pressgate-core` holds the signal path and the lifecycle rules as plain
//! synchronous types. This crate runs them on tokio:
//!
//! - [`Supervisor`] owns the device state behind a bounded-wait lock,
//!   folds [`NotificationBus`] deliveries into it and publishes the
//!   enabled worker set.
//! - [`workers`] has one loop per stage: reader, telemetry, formatter,
//!   publisher and health. Each parks while disabled.
//! - [`run_gateway`] wires one generation of the pipeline and runs it until
//!   the supervisor reaches `ERROR` and asks for a restart.
//! - [`sim`] provides a synthetic sensor, network and transport for the
//!   `pressgate-sim` binary and for tests.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use pressgate_runtime::sim::{LogConnector, SimulatedNetwork, SimulatedSensor};
//! use pressgate_runtime::{run_gateway, NotificationBus, RuntimeConfig, Supervisor, TokioClock};
//!
//! # async fn example() -> Result<(), pressgate_runtime::RuntimeError> {
//! let config = RuntimeConfig::default();
//! let supervisor = Supervisor::new(config.supervisor, NotificationBus::new())?;
//!
//! let gateway = run_gateway(
//!     &config,
//!     &supervisor,
//!     TokioClock::start(),
//!     SimulatedSensor::new(42),
//!     LogConnector::new(),
//!     None,
//! );
//!
//! tokio::select! {
//!     exit = gateway => println!("gateway stopped: {:?}", exit?),
//!     () = SimulatedNetwork::default().run(&supervisor) => {}
//! }
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod bus;
pub mod clock;
pub mod config;
pub mod control;
pub mod errors;
pub mod gateway;
pub mod sim;
pub mod supervisor;
pub mod workers;

pub use bus::NotificationBus;
pub use clock::TokioClock;
pub use config::{RuntimeConfig, Timing};
pub use control::{WorkerControl, WorkerHandle};
pub use errors::RuntimeError;
pub use gateway::{run_gateway, HealthTransport};
pub use supervisor::{Exit, Supervisor};
