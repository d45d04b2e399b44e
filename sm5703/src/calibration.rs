use crate::descriptors::{TABLE_COUNT, TABLE_ENTRIES};

pub type OcvTable = [u16; TABLE_ENTRIES];

#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TopOff {
    pub enabled: bool,
    pub soc: u16,
}

/// Per-battery model parameters, written into the chip when its tables need loading.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalibrationRecord {
    pub battery_type: u32,

    /// Resistance compensation, `Rce0` to `Rce2`.
    pub rce: [u16; 3],

    /// Discharge time constant.
    pub dtcd: u16,

    /// Series resistance, mix factor, maximum and minimum.
    pub rs: [u16; 4],

    /// Mixing rate and initial blanking time.
    pub mix: [u16; 2],

    /// Voltage/current/temperature sampling period.
    pub vit_period: u16,

    /// OCV to SOC lookup tables.
    pub tables: [OcvTable; TABLE_COUNT],

    pub volt_cal: u16,

    /// Base current calibration word. Temperature and charger corrections are added on top of
    /// this before every SOC read.
    pub curr_cal: u16,

    /// Reference temperature in °C.
    pub temp_std: i32,

    /// Temperature step in °C for each `temp_offset_cal` correction.
    pub temp_offset: i32,
    pub temp_offset_cal: i32,

    /// Added to the integer part of the current calibration while a charger is attached.
    pub charge_offset_cal: i32,

    pub top_off: TopOff,
}
