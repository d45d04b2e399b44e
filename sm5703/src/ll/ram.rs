//! A RAM-backed stand-in for the gauge, used for host testing and bring-up without hardware.
//!
//! It models just enough of the chip to exercise the driver: reading the interrupt flags clears
//! them, writing the control register marks the parameter set as loaded, and the soft reset
//! command (or [`RamRegisters::brown_out`]) returns the configuration registers to their
//! power-on values.

use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation};
use heapless::Vec;

use crate::descriptors::{
    Cntl, FgOpStatus, IntFg, SoftReset, CNTL_RESET_SENTINEL, DISABLE_RE_INIT, SOFT_RESET_CODE,
};
use crate::ll::Sm5703I2cInterface;
use device_descriptor::ReadOnlyRegister;

const WRITE_LOG_DEPTH: usize = 256;

pub const POWER_ON_DEVICE_ID: u16 = 0x0001;

pub struct RamRegisters {
    data: [u16; 256],
    failing: [bool; 256],
    detached: bool,
    writes: Vec<(u8, u16), WRITE_LOG_DEPTH>,
}

impl Default for RamRegisters {
    fn default() -> Self {
        Self::new()
    }
}

impl RamRegisters {
    pub fn new() -> Self {
        let mut this = Self {
            data: [0; 256],
            failing: [false; 256],
            detached: false,
            writes: Vec::new(),
        };
        this.data[0x00] = POWER_ON_DEVICE_ID;
        this.brown_out();
        this
    }

    /// Drops the configuration registers back to their power-on state, as a supply glitch would.
    pub fn brown_out(&mut self) {
        self.data[Cntl::ADDRESS as usize] = CNTL_RESET_SENTINEL;
        self.data[FgOpStatus::ADDRESS as usize] = 0;
        self.data[IntFg::ADDRESS as usize] = 0;
    }

    pub fn get(&self, address: u8) -> u16 {
        self.data[address as usize]
    }

    pub fn set(&mut self, address: u8, value: u16) {
        self.data[address as usize] = value;
    }

    /// Makes every transfer touching `address` fail.
    pub fn fail(&mut self, address: u8, failing: bool) {
        self.failing[address as usize] = failing;
    }

    /// Stops acknowledging the device address altogether.
    pub fn detach(&mut self, detached: bool) {
        self.detached = detached;
    }

    /// Every successful register write, oldest first. Writes past the log depth are not recorded.
    pub fn writes(&self) -> &[(u8, u16)] {
        &self.writes
    }

    pub fn clear_writes(&mut self) {
        self.writes.clear();
    }

    fn read_word(&mut self, address: u8) -> Result<u16, ErrorKind> {
        if self.failing[address as usize] {
            return Err(ErrorKind::Other);
        }

        let value = self.data[address as usize];
        if address == IntFg::ADDRESS {
            self.data[address as usize] = 0;
        }

        Ok(value)
    }

    fn write_word(&mut self, address: u8, value: u16) -> Result<(), ErrorKind> {
        if self.failing[address as usize] {
            return Err(ErrorKind::Other);
        }

        _ = self.writes.push((address, value));

        match address {
            a if a == SoftReset::ADDRESS && value == SOFT_RESET_CODE => self.brown_out(),
            a if a == SoftReset::ADDRESS => {}
            a if a == Cntl::ADDRESS => {
                self.data[a as usize] = value;
                self.data[FgOpStatus::ADDRESS as usize] = DISABLE_RE_INIT as u16;
            }
            a => self.data[a as usize] = value,
        }

        Ok(())
    }
}

impl ErrorType for RamRegisters {
    type Error = ErrorKind;
}

impl I2c for RamRegisters {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        if self.detached || address != Sm5703I2cInterface::<Self>::DEVICE_ADDR {
            return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
        }

        match operations {
            [Operation::Write([reg]), Operation::Read(buffer)] if buffer.len() == 2 => {
                let word = self.read_word(*reg)?;
                buffer.copy_from_slice(&word.to_le_bytes());
                Ok(())
            }
            [Operation::Write([reg]), Operation::Write([lo, hi])]
            | [Operation::Write([reg, lo, hi])] => {
                self.write_word(*reg, u16::from_le_bytes([*lo, *hi]))
            }
            _ => Err(ErrorKind::Other),
        }
    }
}

#[cfg(test)]
mod test {
    use register_access::RegisterAccess;

    use super::*;

    #[test]
    fn words_travel_little_endian() {
        let mut iface = Sm5703I2cInterface {
            i2c: RamRegisters::new(),
        };

        iface.write_raw(0x29, 0x1234).unwrap();

        assert_eq!(iface.i2c.get(0x29), 0x1234);
        assert_eq!(iface.read_raw(0x29).unwrap(), 0x1234);
        assert_eq!(iface.i2c.writes(), &[(0x29, 0x1234)]);
    }

    #[test]
    fn soft_reset_restores_power_on_state() {
        let mut iface = Sm5703I2cInterface {
            i2c: RamRegisters::new(),
        };

        iface.write_raw(Cntl::ADDRESS, 0xC000).unwrap();
        assert_eq!(iface.read_raw(FgOpStatus::ADDRESS).unwrap(), 0x0010);

        iface.write_raw(SoftReset::ADDRESS, SOFT_RESET_CODE).unwrap();
        assert_eq!(iface.read_raw(Cntl::ADDRESS).unwrap(), CNTL_RESET_SENTINEL);
        assert_eq!(iface.read_raw(FgOpStatus::ADDRESS).unwrap(), 0);
    }

    #[test]
    fn interrupt_flags_clear_on_read() {
        let mut iface = Sm5703I2cInterface {
            i2c: RamRegisters::new(),
        };
        iface.i2c.set(IntFg::ADDRESS, 0x0009);

        assert_eq!(iface.read_raw(IntFg::ADDRESS).unwrap(), 0x0009);
        assert_eq!(iface.read_raw(IntFg::ADDRESS).unwrap(), 0);
    }

    #[test]
    fn detached_chip_does_not_acknowledge() {
        let mut iface = Sm5703I2cInterface {
            i2c: RamRegisters::new(),
        };
        iface.i2c.detach(true);

        assert_eq!(
            iface.read_raw(0x00),
            Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address))
        );
    }
}
