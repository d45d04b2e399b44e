use crate::property::{ChargeStatus, ChargerHealth};

/// The companion charger, as seen by the fuel gauge.
pub trait ChargerLink {
    fn status(&mut self) -> ChargeStatus;
    fn health(&mut self) -> ChargerHealth;
}

/// Stand-in for boards without a charger that reports its state.
pub struct NoCharger;

impl ChargerLink for NoCharger {
    fn status(&mut self) -> ChargeStatus {
        ChargeStatus::Unknown
    }

    fn health(&mut self) -> ChargerHealth {
        ChargerHealth::Unknown
    }
}

impl<C> ChargerLink for &mut C
where
    C: ChargerLink,
{
    fn status(&mut self) -> ChargeStatus {
        C::status(self)
    }

    fn health(&mut self) -> ChargerHealth {
        C::health(self)
    }
}
