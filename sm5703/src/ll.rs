use embedded_hal::i2c::{I2c, Operation};
use register_access::RegisterAccess;

pub mod ram;

/// Word-wide register access to the fuel gauge over I2C.
///
/// Registers are 16 bits wide and travel least significant byte first.
pub struct Sm5703I2cInterface<I> {
    pub i2c: I,
}

impl<I> Sm5703I2cInterface<I> {
    pub const DEVICE_ADDR: u8 = 0x71;
}

impl<I> RegisterAccess<u16> for Sm5703I2cInterface<I>
where
    I: I2c,
{
    type Error = I::Error;

    fn read_raw(&mut self, address: u8) -> Result<u16, Self::Error> {
        let mut data = [0; 2];
        self.i2c.transaction(
            Self::DEVICE_ADDR,
            &mut [Operation::Write(&[address]), Operation::Read(&mut data)],
        )?;

        Ok(u16::from_le_bytes(data))
    }

    fn write_raw(&mut self, address: u8, bits: u16) -> Result<(), Self::Error> {
        self.i2c.transaction(
            Self::DEVICE_ADDR,
            &mut [
                Operation::Write(&[address]),
                Operation::Write(&bits.to_le_bytes()),
            ],
        )
    }
}
