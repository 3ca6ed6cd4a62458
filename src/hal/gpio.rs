//! Signal lamp and position sensor adapters over `embedded-hal` 1.0 pins.
//!
//! Servo PWM and IR carrier timing are chip specific and stay with the board
//! support code, but lamps and sensors are plain digital pins. These adapters
//! map the layout's pin numbers onto owned `embedded-hal` pins so a board
//! only has to hand them over.
//!
//! # Example
//!
//! ```ignore
//! use rs_trackside::hal::gpio::{InputBank, OutputBank};
//!
//! let mut lamps = OutputBank::new();
//! lamps.add(25, pins.gpio25.into_output()?)?;
//! lamps.add(26, pins.gpio26.into_output()?)?;
//!
//! let mut sensors = InputBank::new();
//! sensors.add(34, pins.gpio34.into_input()?)?;
//! ```

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use heapless::Vec as HVec;

use crate::config::{Pin, MAX_ACTUATORS};
use crate::traits::{Delay, LampDriver, Peripheral, PinInput, PinLevel};

/// Largest number of pins one bank can hold.
pub const MAX_BANK_PINS: usize = 2 * MAX_ACTUATORS;

/// Errors from a GPIO bank.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GpioError<E> {
    /// No pin with this number was added to the bank.
    UnknownPin(Pin),
    /// The bank is full.
    BankFull,
    /// The underlying pin driver failed.
    Pin(E),
}

/// Output pins indexed by layout pin number. Drives signal lamps.
pub struct OutputBank<P: OutputPin> {
    pins: HVec<(Pin, P), MAX_BANK_PINS>,
}

impl<P: OutputPin> OutputBank<P> {
    /// An empty bank.
    pub fn new() -> Self {
        Self { pins: HVec::new() }
    }

    /// Register `pin` under layout number `number`.
    pub fn add(&mut self, number: Pin, pin: P) -> Result<(), GpioError<P::Error>> {
        self.pins
            .push((number, pin))
            .map_err(|_| GpioError::BankFull)
    }

    fn get_mut(&mut self, number: Pin) -> Result<&mut P, GpioError<P::Error>> {
        self.pins
            .iter_mut()
            .find(|(n, _)| *n == number)
            .map(|(_, pin)| pin)
            .ok_or(GpioError::UnknownPin(number))
    }
}

impl<P: OutputPin> Default for OutputBank<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: OutputPin> Peripheral for OutputBank<P> {
    type Error = GpioError<P::Error>;
}

impl<P: OutputPin> LampDriver for OutputBank<P> {
    fn set_lamp(&mut self, pin: Pin, lit: bool) -> Result<(), Self::Error> {
        let output = self.get_mut(pin)?;
        let result = if lit {
            output.set_high()
        } else {
            output.set_low()
        };
        result.map_err(GpioError::Pin)
    }
}

/// Input pins indexed by layout pin number. Reads position sensors.
///
/// Unknown pins and read errors report [`PinLevel::High`], which the sensor
/// poller treats as a clear track.
pub struct InputBank<P: InputPin> {
    pins: HVec<(Pin, P), MAX_BANK_PINS>,
}

impl<P: InputPin> InputBank<P> {
    /// An empty bank.
    pub fn new() -> Self {
        Self { pins: HVec::new() }
    }

    /// Register `pin` under layout number `number`.
    pub fn add(&mut self, number: Pin, pin: P) -> Result<(), GpioError<P::Error>> {
        self.pins
            .push((number, pin))
            .map_err(|_| GpioError::BankFull)
    }
}

impl<P: InputPin> Default for InputBank<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: InputPin> PinInput for InputBank<P> {
    fn read_level(&mut self, pin: Pin) -> PinLevel {
        let Some((_, input)) = self.pins.iter_mut().find(|(n, _)| *n == pin) else {
            log::warn!("read of unregistered input pin {}", pin);
            return PinLevel::High;
        };
        match input.is_low() {
            Ok(true) => PinLevel::Low,
            Ok(false) => PinLevel::High,
            Err(_) => {
                log::warn!("input pin {} read failed", pin);
                PinLevel::High
            }
        }
    }
}

/// [`Delay`] over any `embedded-hal` delay provider.
pub struct HalDelay<D: DelayNs>(pub D);

impl<D: DelayNs> Delay for HalDelay<D> {
    fn delay_ms(&mut self, ms: u32) {
        self.0.delay_ms(ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;
    use embedded_hal::digital::ErrorType;

    #[derive(Default)]
    struct TestPin {
        high: bool,
    }

    impl ErrorType for TestPin {
        type Error = Infallible;
    }

    impl OutputPin for TestPin {
        fn set_low(&mut self) -> Result<(), Infallible> {
            self.high = false;
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Infallible> {
            self.high = true;
            Ok(())
        }
    }

    impl InputPin for TestPin {
        fn is_high(&mut self) -> Result<bool, Infallible> {
            Ok(self.high)
        }

        fn is_low(&mut self) -> Result<bool, Infallible> {
            Ok(!self.high)
        }
    }

    struct CountingDelay(u32);

    impl DelayNs for CountingDelay {
        fn delay_ns(&mut self, ns: u32) {
            self.0 += ns / 1_000_000;
        }

        fn delay_ms(&mut self, ms: u32) {
            self.0 += ms;
        }
    }

    #[test]
    fn output_bank_drives_lamps() {
        let mut bank = OutputBank::new();
        bank.add(25, TestPin::default()).unwrap();
        bank.add(26, TestPin::default()).unwrap();

        bank.set_lamp(26, true).unwrap();
        assert!(!bank.pins[0].1.high);
        assert!(bank.pins[1].1.high);
    }

    #[test]
    fn output_bank_unknown_pin() {
        let mut bank: OutputBank<TestPin> = OutputBank::new();
        assert_eq!(bank.set_lamp(7, true), Err(GpioError::UnknownPin(7)));
    }

    #[test]
    fn output_bank_capacity() {
        let mut bank = OutputBank::new();
        for n in 0..MAX_BANK_PINS as u8 {
            bank.add(n, TestPin::default()).unwrap();
        }
        assert_eq!(bank.add(99, TestPin::default()), Err(GpioError::BankFull));
    }

    #[test]
    fn input_bank_reads_active_low() {
        let mut bank = InputBank::new();
        bank.add(34, TestPin { high: false }).unwrap();
        bank.add(35, TestPin { high: true }).unwrap();

        assert_eq!(bank.read_level(34), PinLevel::Low);
        assert_eq!(bank.read_level(35), PinLevel::High);
        assert_eq!(bank.read_level(36), PinLevel::High);
    }

    #[test]
    fn hal_delay_forwards() {
        let mut delay = HalDelay(CountingDelay(0));
        delay.delay_ms(300);
        assert_eq!(delay.0 .0, 300);
    }
}
