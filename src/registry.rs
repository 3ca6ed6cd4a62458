//! Immutable actuator registry.
//!
//! The registry is the layout's topology: which switches, barriers, signals,
//! position sensors and IR outputs exist, and which pins drive them. It is
//! built once from a [`LayoutConfig`] and never changes afterwards; live values
//! are kept separately in [`ActuatorStates`](crate::state::ActuatorStates).
//!
//! Ids are dense: the n-th pin in a layout list becomes id `n` of that kind.
//!
//! # Example
//!
//! ```rust
//! use rs_trackside::config::LayoutConfig;
//! use rs_trackside::registry::{ActuatorId, ActuatorKind, Registry};
//!
//! let registry = Registry::from_layout(&LayoutConfig::default());
//! assert_eq!(registry.count(ActuatorKind::Switch), 2);
//! assert!(registry.contains(ActuatorId::new(ActuatorKind::Switch, 1)));
//! assert!(!registry.contains(ActuatorId::new(ActuatorKind::Switch, 2)));
//! ```

use heapless::Vec as HVec;
use serde::Serialize;

use crate::config::{AngleRange, LayoutConfig, Pin, MAX_ACTUATORS};

/// Kinds of registered actuators and inputs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ActuatorKind {
    /// Servo-driven track switch
    Switch,
    /// Servo-driven crossing barrier
    Barrier,
    /// Two-lamp signal
    Signal,
    /// Track occupancy input
    PositionSensor,
    /// IR LED output for Power Functions motors
    MotorChannel,
}

impl ActuatorKind {
    /// Lowercase name used in logs.
    pub const fn as_str(&self) -> &'static str {
        match self {
            ActuatorKind::Switch => "switch",
            ActuatorKind::Barrier => "barrier",
            ActuatorKind::Signal => "signal",
            ActuatorKind::PositionSensor => "position",
            ActuatorKind::MotorChannel => "motor",
        }
    }
}

/// Identity of one registered actuator: its kind plus a dense index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ActuatorId {
    /// Kind of actuator
    pub kind: ActuatorKind,
    /// Index within that kind, `0..count(kind)`
    pub index: u8,
}

impl ActuatorId {
    /// Create an id.
    pub const fn new(kind: ActuatorKind, index: u8) -> Self {
        Self { kind, index }
    }
}

/// A single-pin entry (IR output, position sensor, switch or barrier servo).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct PinEntry {
    /// Dense id within the kind
    pub id: u8,
    /// Pin driving or read by this entry
    pub pin: Pin,
}

/// A signal with its two lamp pins.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct SignalEntry {
    /// Dense signal id
    pub id: u8,
    /// Lamp pins, indexed by light id
    pub pins: [Pin; 2],
}

type Entries<T> = HVec<T, MAX_ACTUATORS>;

/// The fixed topology of the layout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Registry {
    ir_outputs: Entries<PinEntry>,
    sensors: Entries<PinEntry>,
    switches: Entries<PinEntry>,
    barriers: Entries<PinEntry>,
    signals: Entries<SignalEntry>,
    switch_angles: AngleRange,
    barrier_angles: AngleRange,
}

fn entries(pins: &[Pin]) -> Entries<PinEntry> {
    pins.iter()
        .take(MAX_ACTUATORS)
        .enumerate()
        .map(|(id, &pin)| PinEntry { id: id as u8, pin })
        .collect()
}

impl Registry {
    /// Build the registry from a layout.
    pub fn from_layout(layout: &LayoutConfig) -> Self {
        let signals = layout
            .signal_pins
            .iter()
            .enumerate()
            .map(|(id, &pins)| SignalEntry { id: id as u8, pins })
            .collect();

        Self {
            ir_outputs: entries(&layout.ir_pins),
            sensors: entries(&layout.sensor_pins),
            switches: entries(&layout.switch_pins),
            barriers: entries(&layout.barrier_pins),
            signals,
            switch_angles: layout.switch_angles,
            barrier_angles: layout.barrier_angles,
        }
    }

    /// Number of registered actuators of a kind.
    pub fn count(&self, kind: ActuatorKind) -> usize {
        match kind {
            ActuatorKind::Switch => self.switches.len(),
            ActuatorKind::Barrier => self.barriers.len(),
            ActuatorKind::Signal => self.signals.len(),
            ActuatorKind::PositionSensor => self.sensors.len(),
            ActuatorKind::MotorChannel => self.ir_outputs.len(),
        }
    }

    /// True if `id` resolves to a registered actuator.
    pub fn contains(&self, id: ActuatorId) -> bool {
        (id.index as usize) < self.count(id.kind)
    }

    /// Resolve a command field to an id of `kind`, if it is in range.
    ///
    /// Negative or too-large values resolve to `None`.
    pub fn resolve(&self, kind: ActuatorKind, raw: i32) -> Option<ActuatorId> {
        let index = u8::try_from(raw).ok()?;
        let id = ActuatorId::new(kind, index);
        self.contains(id).then_some(id)
    }

    /// IR outputs in registration order.
    pub fn ir_outputs(&self) -> &[PinEntry] {
        &self.ir_outputs
    }

    /// Position sensors in registration order.
    pub fn sensors(&self) -> &[PinEntry] {
        &self.sensors
    }

    /// Switches in registration order.
    pub fn switches(&self) -> &[PinEntry] {
        &self.switches
    }

    /// Barriers in registration order.
    pub fn barriers(&self) -> &[PinEntry] {
        &self.barriers
    }

    /// Signals in registration order.
    pub fn signals(&self) -> &[SignalEntry] {
        &self.signals
    }

    /// Servo entries of a servo-driven kind (switch or barrier).
    pub fn servos(&self, kind: ActuatorKind) -> &[PinEntry] {
        match kind {
            ActuatorKind::Switch => &self.switches,
            ActuatorKind::Barrier => &self.barriers,
            _ => &[],
        }
    }

    /// Angle bounds for a servo-driven kind.
    pub fn angles(&self, kind: ActuatorKind) -> Option<AngleRange> {
        match kind {
            ActuatorKind::Switch => Some(self.switch_angles),
            ActuatorKind::Barrier => Some(self.barrier_angles),
            _ => None,
        }
    }

    /// Pin of a single-pin actuator.
    ///
    /// Signals have two pins; use [`Registry::signal`] for them.
    pub fn pin(&self, id: ActuatorId) -> Option<Pin> {
        let list = match id.kind {
            ActuatorKind::Switch => &self.switches,
            ActuatorKind::Barrier => &self.barriers,
            ActuatorKind::PositionSensor => &self.sensors,
            ActuatorKind::MotorChannel => &self.ir_outputs,
            ActuatorKind::Signal => return None,
        };
        list.get(id.index as usize).map(|entry| entry.pin)
    }

    /// Signal entry by id.
    pub fn signal(&self, index: u8) -> Option<&SignalEntry> {
        self.signals.get(index as usize)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::from_layout(&LayoutConfig::default())
    }
}
