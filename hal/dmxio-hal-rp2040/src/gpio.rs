//! Transceiver direction pins

use dmxio_hal::OutputPin;
use embassy_rp::gpio::Output;

/// Push-pull GPIO driving a transceiver's DE/RE line
pub struct DirectionOutput<'d>(Output<'d>);

impl<'d> DirectionOutput<'d> {
    pub fn new(pin: Output<'d>) -> Self {
        Self(pin)
    }

    pub fn into_inner(self) -> Output<'d> {
        self.0
    }
}

impl OutputPin for DirectionOutput<'_> {
    fn set_high(&mut self) {
        self.0.set_high();
    }

    fn set_low(&mut self) {
        self.0.set_low();
    }

    fn is_set_high(&self) -> bool {
        self.0.is_set_high()
    }
}
