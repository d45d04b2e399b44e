//! Builds the calibration record and platform data from device-tree style properties.
//!
//! Battery properties are named `battery<id>,<name>`, with `<id>` taken from `battery,id`. Board
//! properties live under the `fuelgauge,` prefix. Missing properties read as zero.

use core::fmt::Write as _;

use heapless::String;
use sm5703::{
    descriptors::{TABLE_COUNT, TABLE_ENTRIES},
    AlertThresholds, CalibrationRecord, CapacityCalculation, PlatformData, TopOff,
};

const PROPERTY_NAME_SIZE: usize = 64;

/// Named configuration values.
pub trait PropertySource {
    type Error;

    /// Fills `values` from the property `name`. Fails if the property is missing or shorter
    /// than `values`.
    fn read_u32_array(&self, name: &str, values: &mut [u32]) -> Result<(), Self::Error>;

    /// Flags are true when present.
    fn read_bool(&self, name: &str) -> bool;
}

fn read_array<const N: usize>(source: &impl PropertySource, name: &str) -> [u32; N] {
    let mut values = [0; N];
    if source.read_u32_array(name, &mut values).is_err() {
        warn!("Can't read {}", name);
        values = [0; N];
    }
    values
}

fn read_u32(source: &impl PropertySource, name: &str) -> u32 {
    let [value] = read_array(source, name);
    value
}

struct BatteryProperties<'a, S> {
    source: &'a S,
    id: u32,
}

impl<S> BatteryProperties<'_, S>
where
    S: PropertySource,
{
    fn name(&self, property: core::fmt::Arguments<'_>) -> String<PROPERTY_NAME_SIZE> {
        let mut name = String::new();
        if write!(name, "battery{},{}", self.id, property).is_err() {
            // Truncated names can't match anything, the lookup will report them.
            warn!("Property name too long");
        }
        name
    }

    fn array<const N: usize>(&self, property: core::fmt::Arguments<'_>) -> [u32; N] {
        read_array(self.source, &self.name(property))
    }

    fn single(&self, property: core::fmt::Arguments<'_>) -> u32 {
        let [value] = self.array(property);
        value
    }
}

fn words<const N: usize>(values: [u32; N]) -> [u16; N] {
    values.map(|value| value as u16)
}

/// Loads the model parameters of the battery selected by `battery,id`.
pub fn load_calibration(source: &impl PropertySource) -> CalibrationRecord {
    let mut id = [0];
    if source.read_u32_array("battery,id", &mut id).is_err() {
        info!("No battery,id, using battery 0");
        id = [0];
    }
    let battery = BatteryProperties {
        source,
        id: id[0],
    };

    let mut tables = [[0; TABLE_ENTRIES]; TABLE_COUNT];
    for (i, table) in tables.iter_mut().enumerate() {
        *table = words(battery.array(format_args!("battery_table{}", i)));
    }

    let [topoff_enable, topoff_soc] = battery.array(format_args!("topoff_soc"));

    let record = CalibrationRecord {
        battery_type: battery.single(format_args!("battery_type")),
        rce: words(battery.array(format_args!("rce_value"))),
        dtcd: battery.single(format_args!("dtcd_value")) as u16,
        rs: words(battery.array(format_args!("rs_value"))),
        mix: words(battery.array(format_args!("mix_value"))),
        vit_period: battery.single(format_args!("vit_period")) as u16,
        tables,
        volt_cal: battery.single(format_args!("volt_cal")) as u16,
        curr_cal: battery.single(format_args!("curr_cal")) as u16,
        temp_std: battery.single(format_args!("temp_std")) as i32,
        temp_offset: battery.single(format_args!("temp_offset")) as i32,
        temp_offset_cal: battery.single(format_args!("temp_offset_cal")) as i32,
        charge_offset_cal: battery.single(format_args!("charge_offset_cal")) as i32,
        top_off: TopOff {
            enabled: topoff_enable != 0,
            soc: topoff_soc as u16,
        },
    };

    info!(
        "Battery {} calibration: type {}, rs {:#x}, curr_cal {:#x}",
        id[0], record.battery_type, record.rs[0], record.curr_cal
    );

    record
}

/// Loads the capacity reporting and alert configuration.
pub fn load_platform_data(source: &impl PropertySource) -> PlatformData {
    let mut thresholds = [0; 2];
    let alert_thresholds = if source
        .read_u32_array("fuelgauge,fuel_alert_thresholds", &mut thresholds)
        .is_ok()
    {
        AlertThresholds {
            voltage: thresholds[0] as u16,
            soc: thresholds[1] as u16,
        }
    } else {
        AlertThresholds::default()
    };

    let pdata = PlatformData {
        capacity_calculation: CapacityCalculation::from_bits(read_u32(
            source,
            "fuelgauge,capacity_calculation_type",
        )),
        capacity_min: read_u32(source, "fuelgauge,capacity_min") as i32,
        capacity_max: read_u32(source, "fuelgauge,capacity_max") as i32,
        capacity_max_margin: read_u32(source, "fuelgauge,capacity_max_margin") as i32,
        fuel_alert_soc: read_u32(source, "fuelgauge,fuel_alert_soc") as i32,
        repeated_fuelalert: source.read_bool("fuelgauge,repeated_fuelalert"),
        alert_thresholds,
    };

    info!(
        "Capacity {} - {} (margin {}), fuel alert at {}%, repeated: {}",
        pdata.capacity_min,
        pdata.capacity_max,
        pdata.capacity_max_margin,
        pdata.fuel_alert_soc,
        pdata.repeated_fuelalert
    );

    pdata
}

#[cfg(test)]
pub(crate) mod test_utils {
    use super::PropertySource;

    /// Properties backed by a static list.
    pub struct StaticProperties(pub &'static [(&'static str, &'static [u32])]);

    impl PropertySource for StaticProperties {
        type Error = ();

        fn read_u32_array(&self, name: &str, values: &mut [u32]) -> Result<(), ()> {
            let (_, found) = self.0.iter().find(|(n, _)| *n == name).ok_or(())?;
            let found = found.get(..values.len()).ok_or(())?;
            values.copy_from_slice(found);
            Ok(())
        }

        fn read_bool(&self, name: &str) -> bool {
            self.0.iter().any(|(n, _)| *n == name)
        }
    }
}
