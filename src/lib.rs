#![cfg_attr(not(test), no_std)]

//! Power supply front-end for the SM5703 fuel gauge.
//!
//! [`FuelGauge`] owns the chip behind a blocking mutex and exposes it through a property
//! interface. Fuel alert interrupts enter through [`FuelGauge::on_alert_edge`] and are handled
//! by [`FuelGauge::run_alert_worker`].
//!
//! The chip and the alert line are guarded separately. Bus transfers, including the 200 ms
//! settle time of a reset, run under the chip mutex `M`, which only needs to be a thread level
//! mutex. The edge handler only takes the alert line mutex `A`, so `A` is the one that must be
//! safe to take from interrupt context (for example `CriticalSectionRawMutex`).

#[macro_use]
extern crate logger;

use core::cell::RefCell;

use embassy_sync::blocking_mutex::{raw::RawMutex, Mutex};
use embedded_hal::{delay::DelayNs, i2c::I2c};
use sm5703::{chip::RegisterDump, AlertReport, InitError, Sm5703};

pub mod alert;
pub mod charger;
pub mod config;
pub mod device;
pub mod property;

pub use alert::{AlertLine, NoWakeLock, WakeLock};
pub use charger::{ChargerLink, NoCharger};
pub use config::{load_calibration, load_platform_data, PropertySource};
pub use device::Sm5703Device;
pub use property::{Property, PropertyError, PropertyUpdate};

pub struct FuelGauge<M, A, W, I, D, C>
where
    M: RawMutex,
    A: RawMutex,
{
    device: Mutex<M, RefCell<Sm5703Device<I, D, C>>>,
    alert: AlertLine<A, W>,
}

impl<M, A, W, I, D, C> FuelGauge<M, A, W, I, D, C>
where
    M: RawMutex,
    A: RawMutex,
    W: WakeLock,
{
    pub fn new(chip: Sm5703<I, D>, charger: C, wake_lock: W) -> Self {
        let pdata = *chip.platform_data();
        Self {
            alert: AlertLine::new(
                wake_lock,
                pdata.alerts_enabled(),
                pdata.repeated_fuelalert,
            ),
            device: Mutex::new(RefCell::new(Sm5703Device::new(chip, charger))),
        }
    }

    pub fn with_device<R>(&self, f: impl FnOnce(&mut Sm5703Device<I, D, C>) -> R) -> R {
        self.device.lock(|device| f(&mut device.borrow_mut()))
    }

    pub fn alert_line(&self) -> &AlertLine<A, W> {
        &self.alert
    }

    pub fn is_fuel_alerted(&self) -> bool {
        self.alert.is_alerted()
    }

    /// Interrupt entry point. `alerted` is the current state of the alert line.
    pub fn on_alert_edge(&self, alerted: bool) {
        self.alert.on_edge(alerted);
    }

    /// Last SOC read from the chip, in 0.1 %.
    pub fn last_soc(&self) -> i32 {
        self.with_device(|device| device.last_soc())
    }

    pub fn suspend(&self) {
        debug!("Fuel gauge suspend");
    }

    pub fn resume(&self) {
        debug!("Fuel gauge resume");
    }
}

impl<M, A, W, I, D, C> FuelGauge<M, A, W, I, D, C>
where
    M: RawMutex,
    A: RawMutex,
    W: WakeLock,
    I: I2c,
    D: DelayNs,
    C: ChargerLink,
{
    pub fn probe(&self) -> Result<(), InitError<I::Error>> {
        self.with_device(|device| device.probe())?;
        info!("SM5703 fuel gauge ready");
        Ok(())
    }

    pub fn get_property(&self, property: Property) -> Result<i32, PropertyError> {
        self.with_device(|device| device.get_property(property, &self.alert))
    }

    pub fn set_property(&self, update: PropertyUpdate) -> Result<(), PropertyError> {
        self.with_device(|device| device.set_property(update))
    }

    pub fn dump_registers(&self) -> RegisterDump {
        self.with_device(|device| device.chip_mut().dump_registers())
    }

    /// Waits for the next alert edge and reads the chip's alert flags.
    ///
    /// Returns `None` if the flags could not be read.
    pub async fn process_next_alert(&self) -> Option<(AlertReport, bool)> {
        let event = self.alert.next_event().await;

        let report = self.with_device(|device| device.chip_mut().process_alerts());
        match report {
            Ok(report) => Some((report, event.alerted)),
            Err(_) => {
                warn!("Failed to read alert flags");
                None
            }
        }
    }

    /// Handles alert edges forever, passing each result and the line state to `callback`.
    pub async fn run_alert_worker(&self, mut callback: impl FnMut(AlertReport, bool)) {
        loop {
            if let Some((report, alerted)) = self.process_next_alert().await {
                callback(report, alerted);
            }
        }
    }
}
