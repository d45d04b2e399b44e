use device_descriptor::{ReadOnlyRegister, Register};
use embedded_hal::{delay::DelayNs, i2c::I2c};
use register_access::RegisterAccess;

use crate::{
    calibration::CalibrationRecord,
    codec::FixedPoint,
    descriptors::{CurrCal, Current, Ocv, Soc, Temperature, Voltage},
    Sm5703,
};

const FALLBACK_VOLTAGE: i32 = 4000;
const FALLBACK_OCV: i32 = 4000;
const FALLBACK_CURRENT: i32 = 0;
const FALLBACK_TEMPERATURE: i32 = 0;
const FALLBACK_SOC: i32 = 500;

/// Latest readings. Voltages in mV, currents in mA, temperature in 0.1 °C, SOC in 0.1 %.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MeasurementState {
    pub voltage: i32,
    pub avg_voltage: i32,
    pub current: i32,
    pub avg_current: i32,
    pub temperature: i32,
    pub ocv: i32,
    pub soc: i32,
}

fn smooth(average: i32, sample: i32) -> i32 {
    (average + 4 * sample) / 5
}

/// Current calibration word for the given temperature (0.1 °C) and charger state.
///
/// ```rust
/// # use sm5703::{calibration::CalibrationRecord, measurement::current_calibration};
/// let cal = CalibrationRecord {
///     curr_cal: 0x8080,
///     temp_std: 25,
///     temp_offset: 10,
///     temp_offset_cal: 1,
///     charge_offset_cal: 1,
///     ..Default::default()
/// };
///
/// assert_eq!(current_calibration(&cal, 250, false), 0x8080);
/// assert_eq!(current_calibration(&cal, 50, false), 0x8280);
/// assert_eq!(current_calibration(&cal, 50, true), 0x8380);
/// assert_eq!(current_calibration(&cal, 450, false), 0x7E80);
/// ```
pub fn current_calibration(
    cal: &CalibrationRecord,
    temperature: i32,
    charger_present: bool,
) -> u16 {
    let mut curr_cal = cal.curr_cal as i32;

    if charger_present {
        curr_cal += cal.charge_offset_cal << 8;
    }

    if cal.temp_offset != 0 {
        let steps = (cal.temp_std - temperature / 10) / cal.temp_offset;
        curr_cal += (steps * cal.temp_offset_cal) << 8;
    }

    curr_cal as u16
}

impl<I, D> Sm5703<I, D>
where
    I: I2c,
{
    fn read_decoded<R>(&mut self, codec: FixedPoint, fallback: i32) -> i32
    where
        R: ReadOnlyRegister<RegisterWidth = u16>,
    {
        match self.iface.read_register::<R>() {
            Ok(reg) => {
                let value = codec.decode(reg.bits());
                trace!("{}: {:#x} -> {}", R::NAME, reg.bits(), value);
                value
            }
            Err(_) => {
                warn!("Failed to read {}", R::NAME);
                fallback
            }
        }
    }

    /// Returns the cell voltage in mV and updates the running average.
    pub fn read_voltage(&mut self) -> i32 {
        let voltage = self.read_decoded::<Voltage>(FixedPoint::VOLTAGE, FALLBACK_VOLTAGE);

        self.measurement.voltage = voltage;
        self.measurement.avg_voltage = smooth(self.measurement.avg_voltage, voltage);

        voltage
    }

    /// Returns the battery current in mA and updates the running average.
    pub fn read_current(&mut self) -> i32 {
        let current = self.read_decoded::<Current>(FixedPoint::CURRENT, FALLBACK_CURRENT);

        self.measurement.current = current;
        self.measurement.avg_current = smooth(self.measurement.avg_current, current);

        current
    }

    /// Returns the battery temperature in 0.1 °C.
    pub fn read_temperature(&mut self) -> i32 {
        let temperature =
            self.read_decoded::<Temperature>(FixedPoint::TEMPERATURE, FALLBACK_TEMPERATURE);
        self.measurement.temperature = temperature;
        temperature
    }

    /// Returns the open circuit voltage in mV.
    pub fn read_ocv(&mut self) -> i32 {
        let ocv = self.read_decoded::<Ocv>(FixedPoint::OCV, FALLBACK_OCV);
        self.measurement.ocv = ocv;
        ocv
    }
}

impl<I, D> Sm5703<I, D>
where
    I: I2c,
    D: DelayNs,
{
    /// Returns the chip's SOC in 0.1 %.
    ///
    /// Recovers a chip that reset itself, then refreshes the current calibration for the
    /// present temperature and charger state before reading.
    pub fn read_soc(&mut self, charger_present: bool) -> i32 {
        self.recover_if_abnormal();

        self.read_temperature();
        self.read_ocv();

        let curr_cal = current_calibration(
            &self.calibration,
            self.measurement.temperature,
            charger_present,
        );
        debug!(
            "Current calibration: {:#x} (charger present: {})",
            curr_cal, charger_present
        );
        if self
            .iface
            .write_register(CurrCal::new(|w| w.value().write(curr_cal)))
            .is_err()
        {
            warn!("Failed to update current calibration");
        }

        let soc = self.read_decoded::<Soc>(FixedPoint::SOC, FALLBACK_SOC);
        self.measurement.soc = soc;
        soc
    }
}

#[cfg(test)]
mod test {
    use device_descriptor::ReadOnlyRegister;

    use super::*;
    use crate::{
        descriptors::{Cntl, IocvMan, SoftReset, SOFT_RESET_CODE},
        test_utils::gauge,
        ChipState,
    };

    #[test]
    fn average_converges_to_constant_input() {
        let mut average = 0;
        for _ in 0..20 {
            average = smooth(average, 3800);
        }
        assert!((3795..=3800).contains(&average));

        let mut average = 4200;
        for _ in 0..20 {
            average = smooth(average, 3800);
        }
        assert_eq!(average, 3800);
    }

    #[test]
    fn failed_reads_fall_back_to_defaults() {
        let mut gauge = gauge();
        for address in [
            Voltage::ADDRESS,
            Ocv::ADDRESS,
            Current::ADDRESS,
            Temperature::ADDRESS,
            Soc::ADDRESS,
        ] {
            gauge.bus().fail(address, true);
        }

        assert_eq!(gauge.read_voltage(), 4000);
        assert_eq!(gauge.read_ocv(), 4000);
        assert_eq!(gauge.read_current(), 0);
        assert_eq!(gauge.read_temperature(), 0);
        assert_eq!(gauge.read_soc(false), 500);
    }

    #[test]
    fn current_average_keeps_sign() {
        let mut gauge = gauge();
        // -1.5 A
        gauge.bus().set(Current::ADDRESS, 0x8180);

        assert_eq!(gauge.read_current(), -1500);
        assert_eq!(gauge.measurement().avg_current, -1200);
        assert_eq!(gauge.read_current(), -1500);
        assert_eq!(gauge.measurement().avg_current, -1440);
    }

    #[test]
    fn soc_read_updates_current_calibration() {
        let mut gauge = gauge();
        // 5.0 °C, 42.5 %
        gauge.bus().set(Temperature::ADDRESS, 0x0500);
        gauge.bus().set(Soc::ADDRESS, 0x2A80);

        assert_eq!(gauge.read_soc(true), 425);

        assert_eq!(gauge.bus().get(CurrCal::ADDRESS), 0x8380);
        assert_eq!(gauge.measurement().temperature, 50);
        assert_eq!(gauge.measurement().soc, 425);
    }

    #[test]
    fn zero_temperature_step_skips_compensation() {
        let mut gauge = gauge();
        gauge.calibration.temp_offset = 0;
        gauge.bus().set(Temperature::ADDRESS, 0x0500);

        gauge.read_soc(false);

        assert_eq!(gauge.bus().get(CurrCal::ADDRESS), 0x8080);
    }

    #[test]
    fn silently_reset_chip_is_reloaded_before_soc_read() {
        let mut gauge = gauge();
        gauge.init(false).unwrap();
        // 3.7 V, 50.0 %
        gauge.bus().set(Ocv::ADDRESS, 0x03B3);
        gauge.bus().set(Soc::ADDRESS, 0x3200);
        gauge.read_ocv();

        gauge.bus().brown_out();
        gauge.bus().clear_writes();

        assert_eq!(gauge.read_soc(false), 500);
        assert_eq!(gauge.state(), ChipState::Operational);

        let ram = gauge.bus();
        let writes = ram.writes();
        let first = |address: u8| writes.iter().position(|&(a, _)| a == address).unwrap();
        let last = |address: u8| writes.iter().rposition(|&(a, _)| a == address).unwrap();

        assert_eq!(writes[0], (SoftReset::ADDRESS, SOFT_RESET_CODE));
        assert_eq!(ram.get(Cntl::ADDRESS) & 0x0400, 0x0400);
        assert!(first(Cntl::ADDRESS) < first(IocvMan::ADDRESS));
        assert!(first(IocvMan::ADDRESS) < last(CurrCal::ADDRESS));
        assert_eq!(writes.last().map(|&(a, _)| a), Some(CurrCal::ADDRESS));
    }
}
