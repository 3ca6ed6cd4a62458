//! Mutable per-actuator state kept alongside the immutable registry.
//!
//! Only the dispatcher (servo positions, lamps) and the sensor poller (sensor
//! readings) write here.

use heapless::Vec as HVec;

use crate::config::{AngleRange, MAX_ACTUATORS};
use crate::registry::{ActuatorKind, Registry};

/// One of the two legal positions of a servo-driven actuator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Selector {
    /// Selector `0`, the kind's minimum angle
    #[default]
    Min,
    /// Selector `1`, the kind's maximum angle
    Max,
}

impl Selector {
    /// Map a command value to a selector. Only `0` and `1` are legal.
    pub fn from_value(value: i32) -> Option<Self> {
        match value {
            0 => Some(Selector::Min),
            1 => Some(Selector::Max),
            _ => None,
        }
    }

    /// Servo angle for this selector within `range`.
    pub const fn angle(&self, range: AngleRange) -> u8 {
        match self {
            Selector::Min => range.min,
            Selector::Max => range.max,
        }
    }
}

/// Last observed value of a position sensor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SensorReading {
    /// Not polled yet
    #[default]
    Unknown,
    /// Track free (`0`)
    Clear,
    /// Train present (`1`)
    Occupied,
}

impl SensorReading {
    /// Wire value (`0`/`1`), `None` before the first poll.
    pub const fn value(&self) -> Option<u8> {
        match self {
            SensorReading::Unknown => None,
            SensorReading::Clear => Some(0),
            SensorReading::Occupied => Some(1),
        }
    }
}

/// Which lamp of a signal is lit. Exactly one always is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct SignalAspect {
    lit: u8,
}

impl SignalAspect {
    /// Index of the lit lamp (`0` or `1`).
    pub const fn lit(&self) -> u8 {
        self.lit
    }

    /// Whether lamp `light` is lit.
    pub const fn is_lit(&self, light: u8) -> bool {
        self.lit == light
    }

    /// Apply `value` to lamp `light` and return the new aspect.
    ///
    /// `value == 1` lights `light`; `value == 0` puts it out and lights the
    /// other lamp. Callers validate both arguments are `0` or `1`.
    pub const fn set(light: u8, value: u8) -> Self {
        let lit = if value == 1 { light } else { 1 - light };
        Self { lit }
    }
}

/// Live state for every registered actuator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActuatorStates {
    switches: HVec<Selector, MAX_ACTUATORS>,
    barriers: HVec<Selector, MAX_ACTUATORS>,
    signals: HVec<SignalAspect, MAX_ACTUATORS>,
    sensors: HVec<SensorReading, MAX_ACTUATORS>,
}

fn defaults<T: Default + Clone>(count: usize) -> HVec<T, MAX_ACTUATORS> {
    let mut v = HVec::new();
    // count never exceeds MAX_ACTUATORS for a registry-sized table
    let _ = v.resize_default(count.min(MAX_ACTUATORS));
    v
}

impl ActuatorStates {
    /// Default state for every actuator in `registry`.
    pub fn for_registry(registry: &Registry) -> Self {
        Self {
            switches: defaults(registry.count(ActuatorKind::Switch)),
            barriers: defaults(registry.count(ActuatorKind::Barrier)),
            signals: defaults(registry.count(ActuatorKind::Signal)),
            sensors: defaults(registry.count(ActuatorKind::PositionSensor)),
        }
    }

    fn servo_table(&mut self, kind: ActuatorKind) -> Option<&mut HVec<Selector, MAX_ACTUATORS>> {
        match kind {
            ActuatorKind::Switch => Some(&mut self.switches),
            ActuatorKind::Barrier => Some(&mut self.barriers),
            _ => None,
        }
    }

    /// Position of a switch or barrier.
    pub fn selector(&self, kind: ActuatorKind, index: u8) -> Option<Selector> {
        let table = match kind {
            ActuatorKind::Switch => &self.switches,
            ActuatorKind::Barrier => &self.barriers,
            _ => return None,
        };
        table.get(index as usize).copied()
    }

    /// Record a new switch or barrier position.
    pub fn set_selector(&mut self, kind: ActuatorKind, index: u8, selector: Selector) {
        if let Some(slot) = self
            .servo_table(kind)
            .and_then(|table| table.get_mut(index as usize))
        {
            *slot = selector;
        }
    }

    /// Aspect of a signal.
    pub fn signal(&self, index: u8) -> Option<SignalAspect> {
        self.signals.get(index as usize).copied()
    }

    /// Record a new signal aspect.
    pub fn set_signal(&mut self, index: u8, aspect: SignalAspect) {
        if let Some(slot) = self.signals.get_mut(index as usize) {
            *slot = aspect;
        }
    }

    /// Last reading of a position sensor.
    pub fn sensor(&self, index: u8) -> Option<SensorReading> {
        self.sensors.get(index as usize).copied()
    }

    /// Store a reading, returning true if it differs from the previous one.
    pub fn update_sensor(&mut self, index: u8, reading: SensorReading) -> bool {
        match self.sensors.get_mut(index as usize) {
            Some(slot) if *slot != reading => {
                *slot = reading;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutConfig;

    fn states() -> ActuatorStates {
        ActuatorStates::for_registry(&Registry::default())
    }

    #[test]
    fn selector_from_value() {
        assert_eq!(Selector::from_value(0), Some(Selector::Min));
        assert_eq!(Selector::from_value(1), Some(Selector::Max));
        assert_eq!(Selector::from_value(2), None);
        assert_eq!(Selector::from_value(-1), None);
    }

    #[test]
    fn selector_angles() {
        let range = AngleRange::new(45, 135);
        assert_eq!(Selector::Min.angle(range), 45);
        assert_eq!(Selector::Max.angle(range), 135);
    }

    #[test]
    fn defaults_match_registry() {
        let s = states();
        assert_eq!(s.selector(ActuatorKind::Switch, 0), Some(Selector::Min));
        assert_eq!(s.selector(ActuatorKind::Switch, 2), None);
        assert_eq!(s.selector(ActuatorKind::Signal, 0), None);
        assert_eq!(s.signal(1).map(|a| a.lit()), Some(0));
        assert_eq!(s.sensor(0), Some(SensorReading::Unknown));
    }

    #[test]
    fn signal_value_one_lights_chosen_lamp() {
        let aspect = SignalAspect::set(1, 1);
        assert!(aspect.is_lit(1));
        assert!(!aspect.is_lit(0));
    }

    #[test]
    fn signal_value_zero_lights_other_lamp() {
        assert_eq!(SignalAspect::set(1, 0).lit(), 0);
        assert_eq!(SignalAspect::set(0, 0).lit(), 1);
    }

    #[test]
    fn set_selector_out_of_range_is_noop() {
        let mut s = states();
        let before = s.clone();
        s.set_selector(ActuatorKind::Barrier, 9, Selector::Max);
        s.set_selector(ActuatorKind::Signal, 0, Selector::Max);
        assert_eq!(s, before);
    }

    #[test]
    fn update_sensor_reports_changes_only() {
        let mut s = states();
        assert!(s.update_sensor(0, SensorReading::Clear));
        assert!(!s.update_sensor(0, SensorReading::Clear));
        assert!(s.update_sensor(0, SensorReading::Occupied));
        assert!(!s.update_sensor(7, SensorReading::Occupied));
    }

    #[test]
    fn empty_registry_has_no_state() {
        let s = ActuatorStates::for_registry(&Registry::from_layout(&LayoutConfig::empty()));
        assert_eq!(s.signal(0), None);
        assert_eq!(s.sensor(0), None);
    }
}
