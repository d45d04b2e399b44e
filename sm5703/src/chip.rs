use device_descriptor::{Proxy, Register};
use embedded_hal::{delay::DelayNs, i2c::I2c};
use register_access::RegisterAccess;

use crate::{
    codec::manual_ocv_word,
    descriptors::*,
    InitError, Sm5703,
};

const RESET_SETTLE_MS: u32 = 200;

/// Registers included in a diagnostic dump. `IntFg` is left out because reading it clears
/// pending alerts.
pub const DUMPED_REGISTERS: [u8; 29] = [
    0x00, 0x01, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0C, 0x0D, 0x0E, 0x10, 0x12, 0x13, 0x1A,
    0x1B, 0x1C, 0x20, 0x21, 0x22, 0x23, 0x24, 0x25, 0x26, 0x27, 0x28, 0x29, 0x2E,
];

pub type RegisterDump = [(u8, Option<u16>); DUMPED_REGISTERS.len()];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChipState {
    Uninitialized,
    TablesLoaded,
    Operational,
    Resetting,
}

impl<I, D> Sm5703<I, D>
where
    I: I2c,
{
    fn write_or_log<R>(&mut self, reg: R)
    where
        R: Register<RegisterWidth = u16>,
    {
        if self.iface.write_register(reg).is_err() {
            warn!("Failed to write {}", R::NAME);
        }
    }

    fn write_raw_or_log(&mut self, address: u8, value: u16) {
        if self.iface.write_raw(address, value).is_err() {
            warn!("Failed to write register {:#x}", address);
        }
    }

    fn op_status(&mut self) -> Result<u8, I::Error> {
        let status = self.iface.read_register::<FgOpStatus>()?;
        Ok(status.state().read().unwrap_or(0))
    }

    /// Whether the chip lost (or never received) its parameter set.
    fn needs_reg_init(&mut self) -> bool {
        match self.op_status() {
            Ok(status) => status != DISABLE_RE_INIT,
            Err(_) => {
                warn!("Failed to read operation status, reloading parameters");
                true
            }
        }
    }

    fn param_ctrl(code: u8) -> ParamCtrl {
        ParamCtrl::new(|w| w.code().write(code).table_len().write(TABLE_LEN))
    }

    fn load_registers(&mut self, surge_recovery: bool) {
        info!("Loading fuel gauge parameters");

        let cal = self.calibration;

        self.write_or_log(ParamCtrl::new(|w| w.code().write(PARAM_UNLOCK_CODE)));

        self.write_or_log(Rce0::new(|w| w.value().write(cal.rce[0])));
        self.write_or_log(Rce1::new(|w| w.value().write(cal.rce[1])));
        self.write_or_log(Rce2::new(|w| w.value().write(cal.rce[2])));
        self.write_or_log(Dtcd::new(|w| w.value().write(cal.dtcd)));
        self.write_or_log(Rs::new(|w| w.value().write(cal.rs[0])));
        self.write_or_log(VitPeriod::new(|w| w.value().write(cal.vit_period)));

        self.write_or_log(Self::param_ctrl(PARAM_UNLOCK_CODE));

        for (t, table) in cal.tables.iter().enumerate() {
            for (e, &word) in table.iter().enumerate() {
                self.write_raw_or_log(table_entry_address(t, e), word);
            }
        }

        self.write_or_log(RsMixFactor::new(|w| w.value().write(cal.rs[1])));
        self.write_or_log(RsMax::new(|w| w.value().write(cal.rs[2])));
        self.write_or_log(RsMin::new(|w| w.value().write(cal.rs[3])));
        self.write_or_log(MixRate::new(|w| w.value().write(cal.mix[0])));
        self.write_or_log(MixInitBlank::new(|w| w.value().write(cal.mix[1])));

        self.write_or_log(VoltCal::new(|w| w.value().write(cal.volt_cal)));
        self.write_or_log(CurrCal::new(|w| w.value().write(cal.curr_cal)));
        self.write_or_log(TopOffSoc::new(|w| w.value().write(cal.top_off.soc)));

        let top_off = if cal.top_off.enabled {
            Enable::Enabled
        } else {
            Enable::Disabled
        };
        let manual_ocv = if surge_recovery {
            Enable::Enabled
        } else {
            Enable::Disabled
        };
        let cntl = Cntl::new(|w| {
            w.mix_mode()
                .write(Enable::Enabled)
                .temp_measure()
                .write(Enable::Enabled)
                .topoff_soc()
                .write(top_off)
                .manual_ocv()
                .write(manual_ocv)
        });
        debug!("Control register: {:#x}", cntl.bits());
        self.write_or_log(cntl);

        self.write_or_log(Self::param_ctrl(PARAM_LOCK_CODE));

        if surge_recovery {
            let ocv = self.measurement.ocv.max(0) as u32;
            let word = manual_ocv_word(ocv);
            info!("Restoring OCV {} mV ({:#x})", ocv, word);
            self.write_or_log(IocvMan::new(|w| w.value().write(word)));
        }
    }

    /// Reads every register in [`DUMPED_REGISTERS`]. Registers that fail to read are `None`.
    pub fn dump_registers(&mut self) -> RegisterDump {
        DUMPED_REGISTERS.map(|address| (address, self.iface.read_raw(address).ok()))
    }
}

impl<I, D> Sm5703<I, D>
where
    I: I2c,
    D: DelayNs,
{
    /// Loads the parameter set unless the chip reports it still holds one, then takes the
    /// first voltage and temperature samples.
    ///
    /// With `surge_recovery`, the chip is also told to start from the last known OCV instead of
    /// measuring a fresh one under load.
    pub fn init(&mut self, surge_recovery: bool) -> Result<(), InitError<I::Error>> {
        if let Err(e) = self.iface.read_register::<DeviceId>() {
            error!("Fuel gauge does not respond");
            self.state = ChipState::Uninitialized;
            return Err(InitError::DeviceNotFound(e));
        }

        if self.needs_reg_init() {
            self.load_registers(surge_recovery);
        } else {
            self.write_or_log(Self::param_ctrl(PARAM_LOCK_CODE));
        }
        self.state = ChipState::TablesLoaded;

        self.measurement.avg_voltage = self.read_voltage();
        self.read_temperature();

        self.state = ChipState::Operational;

        Ok(())
    }

    fn restart(&mut self, surge_recovery: bool) -> Result<(), InitError<I::Error>> {
        self.state = ChipState::Resetting;

        self.write_or_log(SoftReset::new(|w| w.code().write(SOFT_RESET_CODE)));
        self.delay.delay_ms(RESET_SETTLE_MS);

        self.init(surge_recovery)
    }

    /// Soft-resets the chip and loads the parameter set again.
    pub fn reset(&mut self) -> Result<(), InitError<I::Error>> {
        info!("Resetting fuel gauge");
        self.restart(false)
    }

    /// Detects a chip that reset itself since it was initialized, and recovers it.
    pub(crate) fn recover_if_abnormal(&mut self) {
        if self.state != ChipState::Operational {
            return;
        }

        match self.op_status() {
            Ok(DISABLE_RE_INIT) => return,
            Ok(_) => {}
            Err(_) => {
                warn!("Failed to read operation status");
                return;
            }
        }

        match self.iface.read_register::<Cntl>() {
            Ok(cntl) if cntl.bits() == CNTL_RESET_SENTINEL => {
                warn!("Fuel gauge reset itself, recovering");
                if self.restart(true).is_err() {
                    error!("Fuel gauge recovery failed");
                }
            }
            Ok(_) => warn!("Abnormal fuel gauge state, parameters not locked"),
            Err(_) => warn!("Failed to read control register"),
        }
    }
}

#[cfg(test)]
mod test {
    use device_descriptor::ReadOnlyRegister;

    use super::*;
    use crate::{ll::ram::RamRegisters, test_utils::*};

    fn position(ram: &RamRegisters, address: u8) -> usize {
        ram.writes()
            .iter()
            .position(|&(a, _)| a == address)
            .unwrap()
    }

    #[test]
    fn init_loads_parameters_in_order() {
        let mut gauge = gauge();
        gauge.init(false).unwrap();

        let ram = gauge.bus();
        let writes = ram.writes();

        assert_eq!(writes[0], (ParamCtrl::ADDRESS, 0x3700));
        assert_eq!(
            &writes[1..7],
            &[
                (Rce0::ADDRESS, 0x0601),
                (Rce1::ADDRESS, 0x0502),
                (Rce2::ADDRESS, 0x0403),
                (Dtcd::ADDRESS, 0x0011),
                (Rs::ADDRESS, 0x0144),
                (VitPeriod::ADDRESS, 0x3506),
            ]
        );
        assert_eq!(writes[7], (ParamCtrl::ADDRESS, 0x3710));

        let tables = &writes[8..8 + TABLE_COUNT * TABLE_ENTRIES];
        assert_eq!(tables[0], (0xA0, 0x0000));
        assert_eq!(tables[TABLE_ENTRIES - 1], (0xB0, 0x0010));
        assert_eq!(tables[TABLE_ENTRIES], (0xB0, 0x0100));
        assert_eq!(tables[2 * TABLE_ENTRIES + 16], (0xD0, 0x0210));

        let rest = &writes[8 + TABLE_COUNT * TABLE_ENTRIES..];
        assert_eq!(
            rest,
            &[
                (RsMixFactor::ADDRESS, 0x0155),
                (RsMax::ADDRESS, 0x0166),
                (RsMin::ADDRESS, 0x0177),
                (MixRate::ADDRESS, 0x0A03),
                (MixInitBlank::ADDRESS, 0x0004),
                (VoltCal::ADDRESS, 0x8000),
                (CurrCal::ADDRESS, 0x8080),
                (TopOffSoc::ADDRESS, 0x0300),
                (Cntl::ADDRESS, 0xE000),
                (ParamCtrl::ADDRESS, 0x0010),
            ]
        );

        assert_eq!(gauge.state(), ChipState::Operational);
    }

    #[test]
    fn loaded_chip_is_only_relocked() {
        let mut gauge = gauge();
        gauge.bus().set(FgOpStatus::ADDRESS, DISABLE_RE_INIT as u16);

        gauge.init(false).unwrap();

        assert_eq!(gauge.bus().writes(), &[(ParamCtrl::ADDRESS, 0x0010)]);
        assert_eq!(gauge.state(), ChipState::Operational);
    }

    #[test]
    fn table_write_failures_are_not_fatal() {
        let mut gauge = gauge();
        gauge.bus().fail(0xA5, true);
        gauge.bus().fail(Rce1::ADDRESS, true);

        gauge.init(false).unwrap();

        let ram = gauge.bus();
        assert!(ram.writes().iter().all(|&(a, _)| a != 0xA5));
        assert!(position(ram, 0xA6) > position(ram, 0xA4));
        assert_eq!(gauge.state(), ChipState::Operational);
    }

    #[test]
    fn init_seeds_average_voltage() {
        let mut gauge = gauge();
        // 3.5 V
        gauge.bus().set(Voltage::ADDRESS, 0x0380);

        gauge.init(false).unwrap();

        assert_eq!(gauge.measurement().voltage, 3500);
        assert_eq!(gauge.measurement().avg_voltage, 3500);
    }

    #[test]
    fn silent_reset_is_recovered_with_manual_ocv() {
        let mut gauge = gauge();
        gauge.init(false).unwrap();

        // 3.7 V
        gauge.bus().set(Ocv::ADDRESS, 0x03B3);
        gauge.read_ocv();
        let ocv = gauge.measurement().ocv;

        gauge.bus().brown_out();
        gauge.bus().clear_writes();
        let before = gauge.delay.elapsed_ms();

        gauge.recover_if_abnormal();

        assert_eq!(gauge.delay.elapsed_ms() - before, 200);

        let ram = gauge.bus();
        assert_eq!(ram.writes()[0], (SoftReset::ADDRESS, SOFT_RESET_CODE));

        let cntl = ram.get(Cntl::ADDRESS);
        assert_eq!(cntl & 0x0400, 0x0400);
        assert_eq!(cntl, 0xE400);

        assert!(position(ram, IocvMan::ADDRESS) > position(ram, Cntl::ADDRESS));
        assert_eq!(ram.get(IocvMan::ADDRESS), manual_ocv_word(ocv as u32));
        assert_eq!(gauge.state(), ChipState::Operational);
    }

    #[test]
    fn unexpected_control_value_is_left_alone() {
        let mut gauge = gauge();
        gauge.init(false).unwrap();

        gauge.bus().set(FgOpStatus::ADDRESS, 0);
        gauge.bus().set(Cntl::ADDRESS, 0x1234);
        gauge.bus().clear_writes();

        gauge.recover_if_abnormal();

        assert!(gauge.bus().writes().is_empty());
        assert_eq!(gauge.delay.elapsed_ms(), 0);
    }

    #[test]
    fn uninitialized_chip_is_not_recovered() {
        let mut gauge = gauge();

        gauge.recover_if_abnormal();

        assert!(gauge.bus().writes().is_empty());
    }

    #[test]
    fn explicit_reset_reloads_without_manual_ocv() {
        let mut gauge = gauge();
        gauge.init(false).unwrap();
        gauge.bus().clear_writes();

        gauge.reset().unwrap();

        assert_eq!(gauge.delay.elapsed_ms(), 200);
        let ram = gauge.bus();
        assert_eq!(ram.writes()[0], (SoftReset::ADDRESS, SOFT_RESET_CODE));
        assert_eq!(ram.get(Cntl::ADDRESS), 0xE000);
        assert!(ram.writes().iter().all(|&(a, _)| a != IocvMan::ADDRESS));
    }

    #[test]
    fn dump_skips_interrupt_flags() {
        let mut gauge = gauge();
        gauge.bus().set(IntFg::ADDRESS, 0x0009);
        gauge.bus().fail(Rs::ADDRESS, true);

        let dump = gauge.dump_registers();

        assert!(dump.iter().all(|&(a, _)| a != IntFg::ADDRESS));
        assert_eq!(dump[0], (DeviceId::ADDRESS, Some(0x0001)));
        assert!(dump.contains(&(Cntl::ADDRESS, Some(CNTL_RESET_SENTINEL))));
        assert!(dump.contains(&(Rs::ADDRESS, None)));
        assert_eq!(gauge.bus().get(IntFg::ADDRESS), 0x0009);
    }
}
