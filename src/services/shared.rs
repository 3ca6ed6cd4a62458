//! Thread-safe controller wrapper for the async services.
//!
//! `SharedTrainState` lets the axum router, the rumqttc handler and the
//! periodic update task share one [`TrainController`]. Every dispatch and
//! every tick goes through the same mutex, so commands are applied one at a
//! time in arrival order.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use rs_trackside::TrainController;
//! use rs_trackside::hal::MockBoard;
//! use rs_trackside::registry::Registry;
//! use rs_trackside::services::{CommandTarget, SharedTrainState};
//! use rs_trackside::CommandSource;
//!
//! let controller = TrainController::new(Registry::default(), MockBoard::new(), 0);
//! let mut state = Arc::new(SharedTrainState::new(controller));
//!
//! let response = state.execute("lego/train/signal/0/1/1", CommandSource::Http);
//! assert_eq!(response.as_str(), r#"{"isok":true}"#);
//!
//! // The update task ticks and queues sensor changes for MQTT
//! state.tick();
//! assert_eq!(state.take_sensor_changes().len(), 2);
//! ```

use std::sync::{Arc, Mutex, MutexGuard};

use crate::commands::CommandSource;
use crate::controller::{TickReport, TrainController};
use crate::sensors::SensorChange;
use crate::topology::{ResponseJson, TopologyJson};
use crate::traits::Board;

use super::http_handler::{render_outcome, CommandTarget};

/// Most sensor changes held for the MQTT publisher before the oldest are dropped.
pub const OUTBOX_CAPACITY: usize = 256;

// ============================================================================
// Shared Train State
// ============================================================================

/// Shared controller for all async services.
///
/// # Thread Safety
///
/// - Uses `Mutex` for controller access; dispatch and tick both mutate.
/// - The sensor-change outbox has its own lock so the MQTT publisher never
///   waits on a servo settle delay.
/// - A poisoned lock is recovered, since the controller never holds partial
///   state across a panic point.
pub struct SharedTrainState<H: Board> {
    controller: Mutex<TrainController<H>>,
    outbox: Mutex<Vec<SensorChange>>,
}

impl<H: Board> SharedTrainState<H> {
    /// Create new shared state wrapping a controller.
    pub fn new(controller: TrainController<H>) -> Self {
        Self {
            controller: Mutex::new(controller),
            outbox: Mutex::new(Vec::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, TrainController<H>> {
        self.controller
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Access the controller with a mutable lock.
    ///
    /// The closure pattern prevents accidentally holding the lock across
    /// await points.
    pub fn with_controller<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&mut TrainController<H>) -> R,
    {
        let mut guard = self.lock();
        f(&mut guard)
    }

    /// Dispatch a command and render the response document.
    pub fn dispatch(&self, command: &str, source: CommandSource) -> ResponseJson {
        self.with_controller(|controller| {
            let outcome = controller.dispatch(command, source);
            render_outcome(controller, outcome)
        })
    }

    /// Run one controller tick and queue its sensor changes for publishing.
    ///
    /// Hardware errors are logged; the sensor changes are kept either way.
    pub fn tick(&self) -> TickReport {
        let report = self.with_controller(|controller| {
            let sensor_changes = controller.poll_sensors();
            let ir_frame = controller.drain_ir().unwrap_or_else(|e| {
                log::warn!("IR transmit failed: {:?}", e);
                None
            });
            TickReport {
                sensor_changes,
                ir_frame,
            }
        });

        if !report.sensor_changes.is_empty() {
            let mut outbox = self.outbox.lock().unwrap_or_else(|p| p.into_inner());
            outbox.extend(report.sensor_changes.iter().copied());
            if outbox.len() > OUTBOX_CAPACITY {
                let excess = outbox.len() - OUTBOX_CAPACITY;
                log::warn!("sensor outbox full, dropping {} oldest changes", excess);
                outbox.drain(..excess);
            }
        }
        report
    }

    /// Take every queued sensor change, oldest first.
    pub fn take_sensor_changes(&self) -> Vec<SensorChange> {
        let mut outbox = self.outbox.lock().unwrap_or_else(|p| p.into_inner());
        std::mem::take(&mut *outbox)
    }

    /// Topology document for the controller's registry.
    pub fn topology_json(&self) -> Option<TopologyJson> {
        self.with_controller(|controller| controller.topology().to_json().ok())
    }
}

// ============================================================================
// CommandTarget Implementation for Arc<SharedTrainState>
// ============================================================================

impl<H: Board + Send + 'static> CommandTarget for Arc<SharedTrainState<H>> {
    fn execute(&mut self, command: &str, source: CommandSource) -> ResponseJson {
        self.dispatch(command, source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::MockBoard;
    use crate::registry::{ActuatorKind, Registry};
    use crate::state::Selector;
    use crate::traits::PinLevel;

    fn shared() -> Arc<SharedTrainState<MockBoard>> {
        let controller = TrainController::new(Registry::default(), MockBoard::new(), 0);
        Arc::new(SharedTrainState::new(controller))
    }

    // ========================================================================
    // SharedTrainState tests
    // ========================================================================

    #[test]
    fn test_dispatch_applies_command() {
        let state = shared();
        let json = state.dispatch("lego/train/switch/0/1", CommandSource::Http);
        assert_eq!(json.as_str(), r#"{"isok":true}"#);

        let selector =
            state.with_controller(|c| c.states().selector(ActuatorKind::Switch, 0));
        assert_eq!(selector, Some(Selector::Max));
    }

    #[test]
    fn test_dispatch_rejects_malformed() {
        let state = shared();
        let json = state.dispatch("lego/plane/config", CommandSource::Mqtt);
        assert_eq!(json.as_str(), r#"{"isok":false}"#);
    }

    #[test]
    fn test_tick_fills_outbox() {
        let state = shared();
        state.tick();
        state.with_controller(|c| c.hardware_mut().set_input(34, PinLevel::Low));
        state.tick();

        let changes = state.take_sensor_changes();
        assert_eq!(changes.len(), 3);
        assert_eq!(changes[2], SensorChange { sensor: 0, value: 1 });
        assert!(state.take_sensor_changes().is_empty());
    }

    #[test]
    fn test_tick_survives_transmit_failure() {
        let state = shared();
        state.dispatch("lego/train/motor/pf/0/0/2", CommandSource::Http);
        state.with_controller(|c| c.hardware_mut().fail_writes = true);

        let report = state.tick();
        assert!(report.ir_frame.is_none());
        assert_eq!(report.sensor_changes.len(), 2);
    }

    #[test]
    fn test_outbox_is_bounded() {
        let state = shared();
        for i in 0..OUTBOX_CAPACITY {
            let level = if i % 2 == 0 { PinLevel::Low } else { PinLevel::High };
            state.with_controller(|c| c.hardware_mut().set_input(34, level));
            state.tick();
        }
        // First tick reports both sensors, every later one reports sensor 0
        assert_eq!(state.take_sensor_changes().len(), OUTBOX_CAPACITY);
    }

    #[test]
    fn test_command_target_for_arc() {
        let mut state = shared();
        let json = state.execute("lego/train/config", CommandSource::Http);
        assert!(json.starts_with(r#"{"isok":true,"lego":{"train":"#));
    }

    #[test]
    fn test_topology_json() {
        let state = shared();
        let json = state.topology_json().unwrap();
        assert!(json.starts_with(r#"{"train":{"motors":{"pf":[{"id":0,"pin":4}]}"#));
    }

    #[test]
    fn test_shared_across_threads() {
        let state = shared();
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let mut state = Arc::clone(&state);
                std::thread::spawn(move || {
                    let command = format!("lego/train/switch/{}/1", i % 2);
                    state.execute(&command, CommandSource::Http)
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap().as_str(), r#"{"isok":true}"#);
        }
        assert_eq!(state.with_controller(|c| c.hardware().servo_writes.len()), 4);
    }
}
