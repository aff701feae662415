//! Push-button trigger
//!
//! The button is wired active-low: the pin reads LOW while pressed. A
//! press must persist for the debounce period before it counts, and the
//! button must be released before it can count again.

use std::time::Duration;

use crate::Result;

/// Default BCM pin for the button
pub const DEFAULT_PIN: u8 = 25;

/// Default confirmation delay for a press
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(50);

/// Something that reports whether the button is held down
pub trait ButtonInput {
    /// Whether the button is currently pressed
    ///
    /// # Errors
    ///
    /// Returns error if the pin cannot be read
    fn is_pressed(&mut self) -> Result<bool>;
}

impl<T: ButtonInput + ?Sized> ButtonInput for Box<T> {
    fn is_pressed(&mut self) -> Result<bool> {
        (**self).is_pressed()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Released,
    Pressing(Duration),
    Latched,
}

/// Turns raw pin levels into one event per deliberate press
#[derive(Debug, Clone)]
pub struct ButtonDebouncer {
    debounce: Duration,
    state: State,
}

impl ButtonDebouncer {
    /// Create a debouncer that confirms presses held for `debounce`
    #[must_use]
    pub const fn new(debounce: Duration) -> Self {
        Self {
            debounce,
            state: State::Released,
        }
    }

    /// Update with the pin level observed at `at`
    ///
    /// Returns `true` exactly once per press, on the first update at which
    /// the press has lasted at least the debounce period.
    pub fn update(&mut self, pressed: bool, at: Duration) -> bool {
        match (self.state, pressed) {
            (_, false) => {
                self.state = State::Released;
                false
            }
            (State::Released, true) => {
                if self.debounce.is_zero() {
                    self.state = State::Latched;
                    return true;
                }
                self.state = State::Pressing(at);
                false
            }
            (State::Pressing(since), true) => {
                if at.saturating_sub(since) >= self.debounce {
                    self.state = State::Latched;
                    tracing::debug!("button press confirmed");
                    true
                } else {
                    false
                }
            }
            (State::Latched, true) => false,
        }
    }

    /// Forget any press in progress
    pub const fn reset(&mut self) {
        self.state = State::Released;
    }
}

impl Default for ButtonDebouncer {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

#[cfg(feature = "rpi")]
pub use gpio::GpioButton;

#[cfg(feature = "rpi")]
mod gpio {
    use rppal::gpio::{Gpio, InputPin};

    use super::ButtonInput;
    use crate::{Error, Result};

    /// Active-low button on a GPIO pin
    pub struct GpioButton {
        pin: InputPin,
    }

    impl GpioButton {
        /// Claim `pin` (BCM numbering) as an input
        ///
        /// # Errors
        ///
        /// Returns error if the GPIO peripheral or the pin is unavailable
        pub fn new(pin: u8) -> Result<Self> {
            let pin = Gpio::new()
                .and_then(|gpio| gpio.get(pin))
                .map_err(|e| Error::Button(format!("cannot claim GPIO {pin}: {e}")))?
                .into_input();

            tracing::debug!(pin = pin.pin(), "button input ready");
            Ok(Self { pin })
        }
    }

    impl ButtonInput for GpioButton {
        fn is_pressed(&mut self) -> Result<bool> {
            Ok(self.pin.is_low())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_press_confirmed_after_debounce() {
        let mut d = ButtonDebouncer::new(ms(50));
        assert!(!d.update(true, ms(0)));
        assert!(!d.update(true, ms(30)));
        assert!(d.update(true, ms(50)));
    }

    #[test]
    fn test_held_button_fires_once() {
        let mut d = ButtonDebouncer::new(ms(50));
        d.update(true, ms(0));
        assert!(d.update(true, ms(60)));
        for t in (100..2000).step_by(100) {
            assert!(!d.update(true, ms(t)));
        }
    }

    #[test]
    fn test_bounce_is_ignored() {
        let mut d = ButtonDebouncer::new(ms(50));
        assert!(!d.update(true, ms(0)));
        assert!(!d.update(false, ms(20)));
        assert!(!d.update(true, ms(40)));
        // Only 30 ms since the bounce
        assert!(!d.update(true, ms(70)));
        assert!(d.update(true, ms(90)));
    }

    #[test]
    fn test_release_rearms() {
        let mut d = ButtonDebouncer::new(ms(50));
        d.update(true, ms(0));
        assert!(d.update(true, ms(50)));
        d.update(false, ms(200));
        d.update(true, ms(300));
        assert!(d.update(true, ms(350)));
    }

    #[test]
    fn test_zero_debounce_fires_immediately() {
        let mut d = ButtonDebouncer::new(Duration::ZERO);
        assert!(d.update(true, ms(0)));
        assert!(!d.update(true, ms(1)));
    }

    #[test]
    fn test_reset_requires_new_press_timing() {
        let mut d = ButtonDebouncer::new(ms(50));
        d.update(true, ms(0));
        d.reset();
        assert!(!d.update(true, ms(60)));
        assert!(d.update(true, ms(110)));
    }
}
