//! The power supply property interface.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChargeStatus {
    Unknown,
    Charging,
    Discharging,
    NotCharging,
    Full,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChargerHealth {
    Unknown,
    Good,
    Overheat,
    Dead,
    OverVoltage,
    Cold,
}

/// Power source feeding the system.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CableType {
    Battery,
    Usb,
    Ac,
    Wireless,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum VoltageKind {
    Average,
    Ocv,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CapacityKind {
    /// SOC in 0.01 %, without scaling or stabilization.
    Raw,
    /// Reported percent.
    Scaled,
    /// Only meaningful when set: reset the chip.
    Reset,
}

/// Readable properties. Units: mV, mA, 0.1 °C, percent, 0.1 % for capacity limits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Property {
    Status,
    Present,
    VoltageNow,
    VoltageAvg(VoltageKind),
    CurrentNow,
    CurrentAvg,
    ChargeFull,
    EnergyNow,
    Capacity(CapacityKind),
    Temp,
    TempAmbient,
    EnergyFullDesign,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PropertyUpdate {
    Status(ChargeStatus),
    /// A full charge ended on the given power source.
    ChargeFull(CableType),
    Online(CableType),
    Capacity(CapacityKind),
    Temp(i32),
    TempAmbient(i32),
    EnergyFullDesign(i32),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PropertyError {
    /// The property is not provided by this device.
    Unsupported,
    /// The property exists but this device has no value for it.
    NoData,
    /// The chip could not be brought back after a reset.
    ResetFailed,
}
