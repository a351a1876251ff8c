//! GPIO abstractions
//!
//! The only pin the core drives is the RS-485 transceiver's direction line
//! (driver-enable / receiver-enable tied together).

/// Digital output pin
///
/// Implementations handle the actual register manipulation for the chip.
pub trait OutputPin {
    /// Set the pin high (logic 1)
    fn set_high(&mut self);

    /// Set the pin low (logic 0)
    fn set_low(&mut self);

    /// Check if the pin is currently set high
    fn is_set_high(&self) -> bool;
}

/// Transceiver direction line
///
/// Wraps an [`OutputPin`] and maps "transmit" onto the electrical level,
/// honouring boards that wire the line active-low.
#[derive(Debug)]
pub struct DirectionPin<P> {
    pin: P,
    active_low: bool,
}

impl<P: OutputPin> DirectionPin<P> {
    /// Direction line where high means transmit
    pub fn new(pin: P) -> Self {
        Self {
            pin,
            active_low: false,
        }
    }

    /// Direction line where low means transmit
    pub fn inverted(pin: P) -> Self {
        Self {
            pin,
            active_low: true,
        }
    }

    /// Enable the line driver (`true`) or the receiver (`false`)
    pub fn set_transmit(&mut self, transmit: bool) {
        if transmit != self.active_low {
            self.pin.set_high();
        } else {
            self.pin.set_low();
        }
    }

    /// Whether the line driver is currently enabled
    pub fn is_transmit(&self) -> bool {
        self.pin.is_set_high() != self.active_low
    }

    /// Give the pin back
    pub fn release(self) -> P {
        self.pin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakePin(bool);

    impl OutputPin for FakePin {
        fn set_high(&mut self) {
            self.0 = true;
        }

        fn set_low(&mut self) {
            self.0 = false;
        }

        fn is_set_high(&self) -> bool {
            self.0
        }
    }

    #[test]
    fn test_direction_active_high() {
        let mut dir = DirectionPin::new(FakePin(false));
        dir.set_transmit(true);
        assert!(dir.is_transmit());
        assert!(dir.release().0);
    }

    #[test]
    fn test_direction_active_low() {
        let mut dir = DirectionPin::inverted(FakePin(true));
        dir.set_transmit(true);
        assert!(dir.is_transmit());
        assert!(!dir.release().0);

        let mut dir = DirectionPin::inverted(FakePin(false));
        dir.set_transmit(false);
        assert!(!dir.is_transmit());
    }
}
