use device_descriptor::{Proxy, Register};
use embedded_hal::i2c::I2c;
use register_access::RegisterAccess;

use crate::{
    descriptors::{Alert, Enable, IntFg, IntFgMask, SocAlarm, Status, VAlarm},
    Sm5703,
};

/// Chip side alert bookkeeping.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AlertState {
    /// Interrupt sources enabled in `IntFgMask`.
    pub armed: u16,
    pub soc_alert: bool,
    pub volt_alert: bool,
}

/// Interrupt sources found pending by [`Sm5703::process_alerts`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AlertReport {
    pub flags: u16,
    pub low_soc: bool,
    pub low_voltage: bool,
}

impl<I, D> Sm5703<I, D>
where
    I: I2c,
{
    /// Arms the low SOC and low voltage interrupts and clears anything pending.
    pub fn init_alerts(&mut self) {
        // Reading the flags acknowledges them.
        if self.iface.read_register::<IntFg>().is_err() {
            warn!("Failed to clear pending alerts");
        }
        if self.iface.read_register::<Status>().is_err() {
            warn!("Failed to read status");
        }

        let thresholds = self.pdata.alert_thresholds;
        let mask = IntFgMask::new(|w| {
            w.low_soc()
                .write(Enable::Enabled)
                .low_voltage()
                .write(Enable::Enabled)
        });

        let writes = [
            self.iface.write_register(IntFgMask::new(|w| w)),
            self.iface.write_register(mask),
            self.iface
                .write_register(VAlarm::new(|w| w.threshold().write(thresholds.voltage))),
            self.iface
                .write_register(SocAlarm::new(|w| w.threshold().write(thresholds.soc))),
        ];
        if writes.iter().any(Result::is_err) {
            warn!("Failed to configure alerts");
        }

        self.alert.armed = mask.bits();
        self.alert.soc_alert = false;
    }

    /// Reads (and thereby clears) the pending interrupt sources and latches them.
    pub fn process_alerts(&mut self) -> Result<AlertReport, I::Error> {
        let flags = self.iface.read_register::<IntFg>()?;

        let report = AlertReport {
            flags: flags.bits(),
            low_soc: flags.low_soc().read() == Some(Alert::Alert),
            low_voltage: flags.low_voltage().read() == Some(Alert::Alert),
        };

        if report.low_soc {
            self.alert.soc_alert = true;
        }
        if report.low_voltage {
            self.alert.volt_alert = true;
        }

        debug!("Alert flags: {:#x}", report.flags);

        Ok(report)
    }
}
