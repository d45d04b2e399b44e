#![cfg_attr(not(test), no_std)]

#[macro_use]
extern crate logger;

use embedded_hal::{delay::DelayNs, i2c::I2c};

pub mod alert;
pub mod calibration;
pub mod capacity;
pub mod chip;
pub mod codec;
pub mod descriptors;
pub mod ll;
pub mod measurement;
pub mod platform;

pub use alert::{AlertReport, AlertState};
pub use calibration::{CalibrationRecord, TopOff};
pub use capacity::CapacityState;
pub use chip::ChipState;
pub use measurement::MeasurementState;
pub use platform::{AlertThresholds, CapacityCalculation, PlatformData};

use ll::Sm5703I2cInterface;

#[derive(Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InitError<E> {
    /// The device ID could not be read.
    DeviceNotFound(E),
}

pub struct Sm5703<I, D> {
    iface: Sm5703I2cInterface<I>,
    delay: D,
    calibration: CalibrationRecord,
    pdata: PlatformData,
    state: ChipState,
    measurement: MeasurementState,
    capacity: CapacityState,
    alert: AlertState,
}

impl<I, D> Sm5703<I, D> {
    pub fn new(i2c: I, delay: D, calibration: CalibrationRecord, pdata: PlatformData) -> Self {
        Self {
            iface: Sm5703I2cInterface { i2c },
            delay,
            calibration,
            capacity: CapacityState::new(&pdata),
            pdata,
            state: ChipState::Uninitialized,
            measurement: MeasurementState::default(),
            alert: AlertState::default(),
        }
    }

    pub fn state(&self) -> ChipState {
        self.state
    }

    pub fn measurement(&self) -> &MeasurementState {
        &self.measurement
    }

    pub fn capacity(&self) -> &CapacityState {
        &self.capacity
    }

    pub fn alert_state(&self) -> &AlertState {
        &self.alert
    }

    pub fn calibration(&self) -> &CalibrationRecord {
        &self.calibration
    }

    pub fn platform_data(&self) -> &PlatformData {
        &self.pdata
    }

    /// Gives access to the bus, mainly for inspecting test doubles.
    pub fn bus(&mut self) -> &mut I {
        &mut self.iface.i2c
    }

    pub fn release(self) -> (I, D) {
        (self.iface.i2c, self.delay)
    }
}

impl<I, D> Sm5703<I, D>
where
    I: I2c,
    D: DelayNs,
{
    /// Brings the chip up and prepares capacity reporting.
    ///
    /// Only a missing chip is an error. Everything after the device ID check degrades to
    /// logged warnings.
    pub fn probe(&mut self, charger_present: bool) -> Result<(), InitError<I::Error>> {
        info!("SM5703 fuel gauge probing");

        self.init(false)?;

        self.capacity.capacity_max = self.pdata.capacity_max;

        let raw_soc = self.raw_capacity(charger_present) / 10;
        if raw_soc > self.pdata.capacity_max {
            self.dynamic_scale(charger_present);
        }

        if self.pdata.alerts_enabled() {
            self.init_alerts();
        }

        self.capacity.initial_update_of_soc = true;

        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test_utils {
    use embedded_hal::delay::DelayNs;

    use crate::{
        calibration::{CalibrationRecord, TopOff},
        descriptors::{TABLE_COUNT, TABLE_ENTRIES},
        ll::ram::RamRegisters,
        platform::{CapacityCalculation, PlatformData},
        Sm5703,
    };

    #[derive(Default)]
    pub struct CountingDelay {
        pub elapsed_ns: u64,
    }

    impl CountingDelay {
        pub fn elapsed_ms(&self) -> u64 {
            self.elapsed_ns / 1_000_000
        }
    }

    impl DelayNs for CountingDelay {
        fn delay_ns(&mut self, ns: u32) {
            self.elapsed_ns += ns as u64;
        }
    }

    pub fn calibration() -> CalibrationRecord {
        let mut tables = [[0; TABLE_ENTRIES]; TABLE_COUNT];
        for (t, table) in tables.iter_mut().enumerate() {
            for (e, entry) in table.iter_mut().enumerate() {
                *entry = ((t as u16) << 8) | e as u16;
            }
        }

        CalibrationRecord {
            battery_type: 1,
            rce: [0x0601, 0x0502, 0x0403],
            dtcd: 0x0011,
            rs: [0x0144, 0x0155, 0x0166, 0x0177],
            mix: [0x0A03, 0x0004],
            vit_period: 0x3506,
            tables,
            volt_cal: 0x8000,
            curr_cal: 0x8080,
            temp_std: 25,
            temp_offset: 10,
            temp_offset_cal: 1,
            charge_offset_cal: 1,
            top_off: TopOff {
                enabled: true,
                soc: 0x0300,
            },
        }
    }

    pub fn platform_data() -> PlatformData {
        PlatformData {
            capacity_calculation: CapacityCalculation::Scale | CapacityCalculation::Atomic,
            capacity_min: 0,
            capacity_max: 990,
            capacity_max_margin: 50,
            fuel_alert_soc: 1,
            ..Default::default()
        }
    }

    pub type TestGauge = Sm5703<RamRegisters, CountingDelay>;

    pub fn gauge() -> TestGauge {
        Sm5703::new(
            RamRegisters::new(),
            CountingDelay::default(),
            calibration(),
            platform_data(),
        )
    }
}

#[cfg(test)]
mod test {
    use device_descriptor::ReadOnlyRegister;

    use super::test_utils::gauge;
    use crate::{
        descriptors::{DeviceId, Soc},
        ChipState, InitError,
    };

    #[test]
    fn probe_fails_without_chip() {
        let mut gauge = gauge();
        gauge.bus().fail(DeviceId::ADDRESS, true);

        assert!(matches!(
            gauge.probe(false),
            Err(InitError::DeviceNotFound(_))
        ));
        assert_eq!(gauge.state(), ChipState::Uninitialized);
    }

    #[test]
    fn probe_relearns_capacity_max_when_soc_exceeds_it() {
        let mut gauge = gauge();
        // 110.0 %
        gauge.bus().set(Soc::ADDRESS, 0x6E00);

        gauge.probe(false).unwrap();

        assert_eq!(gauge.state(), ChipState::Operational);
        // clamped to 990 + 50, then 99 %
        assert_eq!(gauge.capacity().capacity_max, 1029);
        assert!(gauge.capacity().initial_update_of_soc);
    }

    #[test]
    fn probe_keeps_configured_capacity_max() {
        let mut gauge = gauge();
        // 50.0 %
        gauge.bus().set(Soc::ADDRESS, 0x3200);

        gauge.probe(false).unwrap();

        assert_eq!(gauge.capacity().capacity_max, 990);
    }
}
