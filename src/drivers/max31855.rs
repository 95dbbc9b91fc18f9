//! MAX31855 thermocouple digitizer on SPI.
//!
//! Read-only device: one 32-bit big-endian frame per conversion, no
//! command bytes.  Decoding lives in [`crate::sensors::thermocouple`].

use embedded_hal::spi::SpiDevice;

use crate::error::{Result, SensorError};

pub struct Max31855<SPI> {
    spi: SPI,
}

impl<SPI: SpiDevice> Max31855<SPI> {
    pub fn new(spi: SPI) -> Self {
        Self { spi }
    }

    /// Clock out one raw frame.
    pub fn read_frame(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.spi.read(&mut buf).map_err(|_| SensorError::Bus)?;
        Ok(u32::from_be_bytes(buf))
    }
}
