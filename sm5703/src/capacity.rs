use embedded_hal::{delay::DelayNs, i2c::I2c};

use crate::{
    platform::{CapacityCalculation, PlatformData},
    Sm5703,
};

/// Turns the chip's SOC into the percentage reported to the rest of the system.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CapacityState {
    /// Last reported percent. Zero until the first report.
    pub capacity_old: i32,

    /// SOC (0.1 %) that is reported as full.
    pub capacity_max: i32,

    /// The next report is taken as is and becomes the new reference.
    pub initial_update_of_soc: bool,

    pub is_charging: bool,
}

impl CapacityState {
    pub fn new(pdata: &PlatformData) -> Self {
        Self {
            capacity_old: 0,
            capacity_max: pdata.capacity_max,
            initial_update_of_soc: true,
            is_charging: false,
        }
    }

    /// Converts a SOC reading (0.1 %) into a whole percent between 0 and 100.
    pub fn scale(&self, pdata: &PlatformData, soc: i32) -> i32 {
        // Wide enough for any configured window.
        let mut value = i64::from(soc);

        if pdata.uses(CapacityCalculation::Scale) || pdata.uses(CapacityCalculation::DynamicScale) {
            let capacity_min = i64::from(pdata.capacity_min);
            let window = i64::from(self.capacity_max) - capacity_min;

            if value < capacity_min {
                value = 0;
            } else if window > 0 {
                value = (value - capacity_min) * 1000 / window;
            } else {
                warn!(
                    "Empty capacity window ({} - {}), not scaling",
                    pdata.capacity_min, self.capacity_max
                );
            }
        }

        value.clamp(0, 1000) as i32 / 10
    }

    /// Limits how the reported percent may move relative to the previous report.
    pub fn stabilize(&mut self, pdata: &PlatformData, percent: i32) -> i32 {
        if self.initial_update_of_soc {
            self.initial_update_of_soc = false;
            self.capacity_old = percent;
            return percent;
        }

        let mut value = percent;

        if pdata.uses(CapacityCalculation::Atomic) {
            if self.capacity_old < value {
                value = self.capacity_old + 1;
            } else if self.capacity_old > value {
                value = self.capacity_old - 1;
            }
        }

        if pdata.uses(CapacityCalculation::SkipAbnormal)
            && !self.is_charging
            && self.capacity_old < value
        {
            warn!(
                "Capacity rose while discharging ({} -> {}), holding",
                self.capacity_old, value
            );
            value = self.capacity_old;
        }

        self.capacity_old = value;
        value
    }

    /// Re-learns `capacity_max` from a SOC reading (0.1 %) taken at full charge.
    pub fn apply_dynamic_scale(&mut self, pdata: &PlatformData, soc: i32) -> i32 {
        let low = pdata.capacity_max.saturating_sub(pdata.capacity_max_margin);
        let high = pdata.capacity_max.saturating_add(pdata.capacity_max_margin);

        let full = if soc < low { low } else { soc.min(high) };

        self.capacity_max = (i64::from(full) * 99 / 100) as i32;
        self.capacity_old = 100;

        info!("{} is used for capacity_max", self.capacity_max);

        self.capacity_max
    }
}

impl<I, D> Sm5703<I, D> {
    pub fn set_charging(&mut self, charging: bool) {
        self.capacity.is_charging = charging;
    }

    pub fn set_capacity_max(&mut self, capacity_max: i32) {
        info!(
            "capacity_max changed, {} -> {}",
            self.capacity.capacity_max, capacity_max
        );
        self.capacity.capacity_max = capacity_max;
        self.capacity.initial_update_of_soc = true;
    }

    pub fn request_initial_update(&mut self) {
        self.capacity.initial_update_of_soc = true;
    }

    /// See [`CapacityState::stabilize`].
    pub fn stabilize_capacity(&mut self, percent: i32) -> i32 {
        self.capacity.stabilize(&self.pdata, percent)
    }
}

impl<I, D> Sm5703<I, D>
where
    I: I2c,
    D: DelayNs,
{
    /// Returns the chip's SOC in 0.01 %, without any processing.
    pub fn raw_capacity(&mut self, charger_present: bool) -> i32 {
        self.read_soc(charger_present) * 10
    }

    /// Returns the SOC as a whole percent, scaled but not yet stabilized.
    pub fn scaled_capacity(&mut self, charger_present: bool) -> i32 {
        let soc = self.read_soc(charger_present);
        self.capacity.scale(&self.pdata, soc)
    }

    /// Re-learns `capacity_max` from the current SOC. Returns the new value.
    pub fn dynamic_scale(&mut self, charger_present: bool) -> i32 {
        let soc = self.raw_capacity(charger_present) / 10;
        self.capacity.apply_dynamic_scale(&self.pdata, soc)
    }
}
