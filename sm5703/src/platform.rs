use enumset::{EnumSet, EnumSetType};

/// How the reported capacity is derived from the chip's SOC.
///
/// The discriminants are bit positions in the board configuration word. Bit 0 requests raw
/// readings and has no meaning as a persistent mode.
#[derive(EnumSetType, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CapacityCalculation {
    /// Stretch `[capacity_min, capacity_max]` to the full percent range.
    Scale = 1,
    /// Like `Scale`, with `capacity_max` re-learned on every full charge.
    DynamicScale = 2,
    /// Move the reported percent by at most one step per reading.
    Atomic = 3,
    /// Never report an increase while not charging.
    SkipAbnormal = 4,
}

impl CapacityCalculation {
    pub fn from_bits(bits: u32) -> EnumSet<Self> {
        EnumSet::from_u32_truncated(bits)
    }
}

/// Alarm thresholds programmed when alerts are armed. Raw register words.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AlertThresholds {
    /// 3.000 V
    pub voltage: u16,
    /// 1.00 %
    pub soc: u16,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            voltage: 0x0300,
            soc: 0x0100,
        }
    }
}

/// Board level capacity reporting parameters. Capacities are in 0.1 % units.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct PlatformData {
    pub capacity_calculation: EnumSet<CapacityCalculation>,
    pub capacity_min: i32,
    pub capacity_max: i32,
    pub capacity_max_margin: i32,

    /// Reported percent at or below which the low battery alert is expected. Negative values
    /// disable alerts.
    pub fuel_alert_soc: i32,

    /// Forward alert line edges even when the line state did not change.
    pub repeated_fuelalert: bool,

    pub alert_thresholds: AlertThresholds,
}

impl PlatformData {
    pub fn alerts_enabled(&self) -> bool {
        self.fuel_alert_soc >= 0
    }

    pub fn uses(&self, mode: CapacityCalculation) -> bool {
        self.capacity_calculation.contains(mode)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn raw_bit_is_not_a_mode() {
        assert!(CapacityCalculation::from_bits(0x01).is_empty());
        assert_eq!(
            CapacityCalculation::from_bits(0x1F),
            CapacityCalculation::Scale
                | CapacityCalculation::DynamicScale
                | CapacityCalculation::Atomic
                | CapacityCalculation::SkipAbnormal
        );
        assert_eq!(
            CapacityCalculation::from_bits(0x0A),
            CapacityCalculation::Scale | CapacityCalculation::Atomic
        );
    }
}
