use embassy_sync::blocking_mutex::raw::RawMutex;
use embedded_hal::{delay::DelayNs, i2c::I2c};
use sm5703::{CapacityCalculation, InitError, Sm5703};

use crate::{
    alert::{AlertLine, WakeLock},
    charger::ChargerLink,
    property::{
        CableType, CapacityKind, ChargeStatus, ChargerHealth, Property, PropertyError,
        PropertyUpdate, VoltageKind,
    },
};

/// Charger state sampled before every property read.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChargerFlags {
    pub full: bool,
    pub charging: bool,
}

/// The chip together with the board level state the property interface needs.
pub struct Sm5703Device<I, D, C> {
    chip: Sm5703<I, D>,
    charger: C,
    cable: CableType,
    charger_flags: ChargerFlags,
    full_charged: bool,
}

impl<I, D, C> Sm5703Device<I, D, C> {
    pub fn new(chip: Sm5703<I, D>, charger: C) -> Self {
        Self {
            chip,
            charger,
            cable: CableType::Battery,
            charger_flags: ChargerFlags::default(),
            full_charged: false,
        }
    }

    pub fn chip(&self) -> &Sm5703<I, D> {
        &self.chip
    }

    pub fn chip_mut(&mut self) -> &mut Sm5703<I, D> {
        &mut self.chip
    }

    pub fn cable(&self) -> CableType {
        self.cable
    }

    pub fn charger_flags(&self) -> ChargerFlags {
        self.charger_flags
    }

    /// Set once the battery layer declared the battery full.
    pub fn is_full_charged(&self) -> bool {
        self.full_charged
    }

    /// Last SOC read from the chip, in 0.1 %.
    pub fn last_soc(&self) -> i32 {
        self.chip.measurement().soc
    }
}

impl<I, D, C> Sm5703Device<I, D, C>
where
    I: I2c,
    D: DelayNs,
    C: ChargerLink,
{
    fn sample_charger(&mut self) {
        let status = self.charger.status();
        self.charger_flags = ChargerFlags {
            full: status == ChargeStatus::Full,
            charging: status == ChargeStatus::Charging,
        };
    }

    /// A charger is attached, judging by its health or the cable type.
    fn charger_present(&mut self) -> bool {
        self.charger.health() == ChargerHealth::Good || self.chip.capacity().is_charging
    }

    pub fn probe(&mut self) -> Result<(), InitError<I::Error>> {
        let charger_present = self.charger_present();
        self.chip.probe(charger_present)
    }

    pub fn get_property<M, W>(
        &mut self,
        property: Property,
        alert: &AlertLine<M, W>,
    ) -> Result<i32, PropertyError>
    where
        M: RawMutex,
        W: WakeLock,
    {
        self.sample_charger();

        let value = match property {
            Property::Present => 1,
            Property::VoltageNow => self.chip.read_voltage(),
            Property::VoltageAvg(VoltageKind::Average) => {
                self.chip.read_voltage();
                self.chip.measurement().avg_voltage
            }
            Property::VoltageAvg(VoltageKind::Ocv) => self.chip.read_ocv(),
            Property::CurrentNow => self.chip.read_current(),
            Property::CurrentAvg => {
                self.chip.read_current();
                self.chip.measurement().avg_current
            }
            Property::Capacity(CapacityKind::Raw) => {
                let charger_present = self.charger_present();
                self.chip.raw_capacity(charger_present)
            }
            Property::Capacity(_) => self.reported_capacity(alert),
            Property::Temp | Property::TempAmbient => self.chip.read_temperature(),
            Property::EnergyFullDesign => self.chip.capacity().capacity_max,
            Property::Status | Property::ChargeFull => return Err(PropertyError::NoData),
            Property::EnergyNow => return Err(PropertyError::Unsupported),
        };

        Ok(value)
    }

    fn reported_capacity<M, W>(&mut self, alert: &AlertLine<M, W>) -> i32
    where
        M: RawMutex,
        W: WakeLock,
    {
        let charger_present = self.charger_present();
        let percent = self.chip.scaled_capacity(charger_present);

        let fuel_alert_soc = self.chip.platform_data().fuel_alert_soc;
        if percent > fuel_alert_soc && alert.is_alerted() {
            debug!("Capacity recovered to {}%, re-arming alerts", percent);
            alert.release_wake_lock();
            self.chip.init_alerts();
        }

        self.chip.stabilize_capacity(percent)
    }

    pub fn set_property(&mut self, update: PropertyUpdate) -> Result<(), PropertyError> {
        match update {
            PropertyUpdate::Status(ChargeStatus::Full) => {
                debug!("Full charge reported");
                self.full_charged = true;
            }
            PropertyUpdate::Status(_) => {}
            PropertyUpdate::ChargeFull(CableType::Battery) => {
                if self
                    .chip
                    .platform_data()
                    .uses(CapacityCalculation::DynamicScale)
                {
                    let charger_present = self.charger_present();
                    self.chip.dynamic_scale(charger_present);
                }
            }
            PropertyUpdate::ChargeFull(_) => {}
            PropertyUpdate::Online(cable) => {
                self.cable = cable;
                self.chip.set_charging(cable != CableType::Battery);
            }
            PropertyUpdate::Capacity(CapacityKind::Reset) => {
                self.chip.request_initial_update();
                self.chip
                    .reset()
                    .map_err(|_| PropertyError::ResetFailed)?;
            }
            PropertyUpdate::Capacity(_)
            | PropertyUpdate::Temp(_)
            | PropertyUpdate::TempAmbient(_) => {}
            PropertyUpdate::EnergyFullDesign(capacity_max) => {
                self.chip.set_capacity_max(capacity_max);
            }
        }

        Ok(())
    }
}
