#![no_std]

//! Logging front-end shared by the workspace crates.
//!
//! The macros expand in the calling crate, so it is the caller's `log` / `defmt` feature that
//! decides where a message goes. With neither feature enabled, messages compile to nothing.
//! Format strings must stay within the subset both backends accept (`{}`, `{:?}`, `{:#x}`).

#[doc(hidden)]
#[macro_export]
macro_rules! __dispatch {
    ($level:ident, $($args:tt)*) => {{
        #[cfg(feature = "defmt")]
        defmt::$level!($($args)*);
        #[cfg(feature = "log")]
        log::$level!($($args)*);
    }};
}

#[macro_export]
macro_rules! trace {
    ($($args:tt)*) => { $crate::__dispatch!(trace, $($args)*) };
}

#[macro_export]
macro_rules! debug {
    ($($args:tt)*) => { $crate::__dispatch!(debug, $($args)*) };
}

#[macro_export]
macro_rules! info {
    ($($args:tt)*) => { $crate::__dispatch!(info, $($args)*) };
}

#[macro_export]
macro_rules! warn {
    ($($args:tt)*) => { $crate::__dispatch!(warn, $($args)*) };
}

#[macro_export]
macro_rules! error {
    ($($args:tt)*) => { $crate::__dispatch!(error, $($args)*) };
}
