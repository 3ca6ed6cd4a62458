//! Layout controller that ties the command core together.
//!
//! This module provides [`TrainController`], which owns the registry, the
//! actuator state, the IR repeat queue and the board, and is the only thing
//! that mutates any of them.
//!
//! # Overview
//!
//! The controller:
//! - Parses and validates commands from any transport ([`dispatch`])
//! - Moves servos and sets lamps through the [`Board`] traits
//! - Loads motor commands into the IR repeat queue
//! - Polls position sensors and drains one IR repeat per [`tick`]
//!
//! # Example
//!
//! ```rust
//! use rs_trackside::{CommandSource, TrainController};
//! use rs_trackside::config::LayoutConfig;
//! use rs_trackside::hal::MockBoard;
//! use rs_trackside::registry::Registry;
//!
//! let registry = Registry::from_layout(&LayoutConfig::default());
//! let mut controller = TrainController::new(registry, MockBoard::new(), 0);
//!
//! let outcome = controller.dispatch("lego/train/switch/0/1", CommandSource::Local).unwrap();
//! assert!(outcome.accepted());
//! assert_eq!(controller.hardware().angle(13), Some(135));
//!
//! // Main loop: poll sensors and send one IR repeat per tick
//! let report = controller.tick().unwrap();
//! assert_eq!(report.sensor_changes.len(), 2); // first poll reports every sensor
//! ```
//!
//! [`dispatch`]: TrainController::dispatch
//! [`tick`]: TrainController::tick

use crate::commands::{Command, CommandOutcome, CommandSource, IgnoreReason, MotorCommand};
use crate::config::Config;
use crate::ir::{IrRepeatQueue, PfFrame};
use crate::registry::{ActuatorKind, Registry};
use crate::sensors::{poll_sensors, SensorChanges};
use crate::state::{ActuatorStates, Selector, SignalAspect};
use crate::topology::Topology;
use crate::traits::Board;

/// Main layout controller.
///
/// # Type Parameter
///
/// - `H`: The board implementation ([`Board`] trait)
///
/// # Thread Safety
///
/// The controller itself is not thread-safe. For multi-threaded scenarios
/// (e.g., web server + update task), use the `SharedTrainState` wrapper from
/// the services module, which serializes every call behind one mutex.
pub struct TrainController<H: Board> {
    registry: Registry,
    states: ActuatorStates,
    ir: IrRepeatQueue,
    hw: H,
    settle_ms: u32,
}

/// What one [`TrainController::tick`] did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Sensors whose value changed, in registration order
    pub sensor_changes: SensorChanges,
    /// IR frame broadcast this tick, if the queue was loaded
    pub ir_frame: Option<PfFrame>,
}

impl<H: Board> TrainController<H> {
    /// Create a controller with default actuator state.
    ///
    /// `settle_ms` is held after every servo write before the command returns.
    pub fn new(registry: Registry, hw: H, settle_ms: u32) -> Self {
        let states = ActuatorStates::for_registry(&registry);
        Self {
            registry,
            states,
            ir: IrRepeatQueue::new(),
            hw,
            settle_ms,
        }
    }

    /// Create a controller from the layout and timing in `config`.
    pub fn from_config(config: &Config, hw: H) -> Self {
        Self::new(
            Registry::from_layout(&config.layout),
            hw,
            config.controller.servo_settle_ms,
        )
    }

    /// Drive every output to its current state.
    ///
    /// Call once at startup so the hardware matches the default state:
    /// servos at their minimum angle, lamp 0 of each signal lit.
    pub fn init(&mut self) -> Result<(), H::Error> {
        for kind in [ActuatorKind::Switch, ActuatorKind::Barrier] {
            let Some(range) = self.registry.angles(kind) else {
                continue;
            };
            for servo in self.registry.servos(kind) {
                let selector = self.states.selector(kind, servo.id).unwrap_or_default();
                self.hw.write_angle(servo.pin, selector.angle(range))?;
            }
        }
        for signal in self.registry.signals() {
            let aspect = self.states.signal(signal.id).unwrap_or_default();
            self.hw.set_lamp(signal.pins[0], aspect.is_lit(0))?;
            self.hw.set_lamp(signal.pins[1], aspect.is_lit(1))?;
        }
        log::info!(
            "layout ready: {} switches, {} barriers, {} signals, {} sensors, {} IR outputs",
            self.registry.count(ActuatorKind::Switch),
            self.registry.count(ActuatorKind::Barrier),
            self.registry.count(ActuatorKind::Signal),
            self.registry.count(ActuatorKind::PositionSensor),
            self.registry.count(ActuatorKind::MotorChannel),
        );
        Ok(())
    }

    /// Parse and apply one command string.
    ///
    /// Returns `Ok` with the outcome for every input, including malformed
    /// ones. `Err` is only returned when the board fails.
    pub fn dispatch(
        &mut self,
        command: &str,
        source: CommandSource,
    ) -> Result<CommandOutcome, H::Error> {
        let outcome = match Command::parse(command) {
            Ok(parsed) => self.apply(parsed)?,
            Err(reason) => CommandOutcome::Rejected(reason),
        };
        log::debug!("{} {:?} -> {:?}", source.as_str(), command, outcome);
        Ok(outcome)
    }

    /// Apply an already parsed command.
    pub fn apply(&mut self, command: Command) -> Result<CommandOutcome, H::Error> {
        match command {
            Command::Config => Ok(CommandOutcome::TopologyRequested),
            Command::Motor(motor) => {
                self.load_motor(motor);
                Ok(CommandOutcome::Queued)
            }
            Command::Switch { id, selector } => {
                self.move_servo(ActuatorKind::Switch, id, selector)
            }
            Command::Barrier { id, selector } => {
                self.move_servo(ActuatorKind::Barrier, id, selector)
            }
            Command::Signal { id, light, value } => self.set_signal(id, light, value),
        }
    }

    fn load_motor(&mut self, motor: MotorCommand) {
        if self.ir.pending().is_some() {
            log::debug!("IR command replaced before all repeats were sent");
        }
        self.ir.load(motor);
    }

    fn move_servo(
        &mut self,
        kind: ActuatorKind,
        id: Option<i32>,
        selector: Option<i32>,
    ) -> Result<CommandOutcome, H::Error> {
        let Some(target) = id.and_then(|raw| self.registry.resolve(kind, raw)) else {
            return Ok(CommandOutcome::Ignored(IgnoreReason::UnknownActuator(kind)));
        };
        let Some(selector) = selector.and_then(Selector::from_value) else {
            return Ok(CommandOutcome::Ignored(IgnoreReason::InvalidSelector));
        };
        let (Some(pin), Some(range)) = (self.registry.pin(target), self.registry.angles(kind))
        else {
            return Ok(CommandOutcome::Ignored(IgnoreReason::UnknownActuator(kind)));
        };

        self.hw.write_angle(pin, selector.angle(range))?;
        self.states.set_selector(kind, target.index, selector);
        if self.settle_ms > 0 {
            self.hw.delay_ms(self.settle_ms);
        }
        Ok(CommandOutcome::Applied)
    }

    fn set_signal(
        &mut self,
        id: Option<i32>,
        light: Option<i32>,
        value: Option<i32>,
    ) -> Result<CommandOutcome, H::Error> {
        let Some(signal) = id
            .and_then(|raw| self.registry.resolve(ActuatorKind::Signal, raw))
            .and_then(|target| self.registry.signal(target.index))
        else {
            return Ok(CommandOutcome::Ignored(IgnoreReason::UnknownActuator(
                ActuatorKind::Signal,
            )));
        };
        let Some(light) = light.filter(|l| matches!(l, 0 | 1)) else {
            return Ok(CommandOutcome::Ignored(IgnoreReason::InvalidLight));
        };
        let Some(value) = value.filter(|v| matches!(v, 0 | 1)) else {
            return Ok(CommandOutcome::Ignored(IgnoreReason::InvalidValue));
        };

        let (index, pins) = (signal.id, signal.pins);
        let previous = self.states.signal(index).unwrap_or_default();
        let aspect = SignalAspect::set(light as u8, value as u8);
        self.hw.set_lamp(pins[0], aspect.is_lit(0))?;
        if let Err(e) = self.hw.set_lamp(pins[1], aspect.is_lit(1)) {
            // One lamp already changed; put both back to the recorded aspect
            log::warn!("signal {} lamp write failed, restoring lamp {}", index, previous.lit());
            let _ = self.hw.set_lamp(pins[0], previous.is_lit(0));
            let _ = self.hw.set_lamp(pins[1], previous.is_lit(1));
            return Err(e);
        }
        self.states.set_signal(index, aspect);
        Ok(CommandOutcome::Applied)
    }

    /// Periodic work: poll sensors, then send one IR repeat to every output.
    ///
    /// The repeat is consumed before transmission, so a failing transmitter
    /// cannot keep the queue loaded forever.
    pub fn tick(&mut self) -> Result<TickReport, H::Error> {
        let sensor_changes = self.poll_sensors();
        let ir_frame = self.drain_ir()?;
        Ok(TickReport {
            sensor_changes,
            ir_frame,
        })
    }

    /// Read every position sensor and return the ones that changed.
    pub fn poll_sensors(&mut self) -> SensorChanges {
        poll_sensors(&self.registry, &mut self.states, &mut self.hw)
    }

    /// Send one repeat of the pending IR frame to every IR output.
    pub fn drain_ir(&mut self) -> Result<Option<PfFrame>, H::Error> {
        let Some(frame) = self.ir.next_frame() else {
            return Ok(None);
        };
        for output in self.registry.ir_outputs() {
            self.hw.transmit(output.pin, frame)?;
        }
        Ok(Some(frame))
    }

    /// The immutable topology.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Topology document for the registry.
    pub fn topology(&self) -> Topology<'_> {
        Topology::of(&self.registry)
    }

    /// Live actuator state.
    pub fn states(&self) -> &ActuatorStates {
        &self.states
    }

    /// The IR repeat queue.
    pub fn ir_queue(&self) -> &IrRepeatQueue {
        &self.ir
    }

    /// The board.
    pub fn hardware(&self) -> &H {
        &self.hw
    }

    /// Mutable access to the board.
    pub fn hardware_mut(&mut self) -> &mut H {
        &mut self.hw
    }

    /// Servo settle time in milliseconds.
    pub fn settle_ms(&self) -> u32 {
        self.settle_ms
    }
}
