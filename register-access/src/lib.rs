#![cfg_attr(not(test), no_std)]

use device_descriptor::{ReadOnlyRegister, Register, RegisterWidthType};

/// Word-level access to a device's register file.
///
/// Implementors only provide raw, address-based transfers. Typed access to registers described
/// with `device_descriptor::device!` is built on top of them. Raw access stays public because
/// some register blocks (lookup tables, for example) are addressed by index.
pub trait RegisterAccess<RWT>
where
    RWT: RegisterWidthType,
{
    type Error;

    fn read_raw(&mut self, address: u8) -> Result<RWT, Self::Error>;
    fn write_raw(&mut self, address: u8, bits: RWT) -> Result<(), Self::Error>;

    fn read_register<R>(&mut self) -> Result<R, Self::Error>
    where
        R: ReadOnlyRegister<RegisterWidth = RWT>,
    {
        self.read_raw(R::ADDRESS).map(R::from_bits)
    }

    fn write_register<R>(&mut self, reg: R) -> Result<(), Self::Error>
    where
        R: Register<RegisterWidth = RWT>,
    {
        self.write_raw(R::ADDRESS, reg.bits())
    }
}
