//! Logging shims
//!
//! Route log statements to `defmt` on the device and to `tracing` on hosted builds. With neither
//! feature enabled the statements compile to nothing.
#![allow(unused_macros)]

macro_rules! trace {
    ($s:literal $(, $x:expr)* $(,)?) => {
        {
            #[cfg(feature = "defmt-impl")]
            ::defmt::trace!($s $(, $x)*);
            #[cfg(all(feature = "tracing", not(feature = "defmt-impl")))]
            ::tracing::trace!($s $(, $x)*);
            #[cfg(not(any(feature = "defmt-impl", feature = "tracing")))]
            let _ = ($( & $x ),*);
        }
    };
}

macro_rules! debug {
    ($s:literal $(, $x:expr)* $(,)?) => {
        {
            #[cfg(feature = "defmt-impl")]
            ::defmt::debug!($s $(, $x)*);
            #[cfg(all(feature = "tracing", not(feature = "defmt-impl")))]
            ::tracing::debug!($s $(, $x)*);
            #[cfg(not(any(feature = "defmt-impl", feature = "tracing")))]
            let _ = ($( & $x ),*);
        }
    };
}

macro_rules! info {
    ($s:literal $(, $x:expr)* $(,)?) => {
        {
            #[cfg(feature = "defmt-impl")]
            ::defmt::info!($s $(, $x)*);
            #[cfg(all(feature = "tracing", not(feature = "defmt-impl")))]
            ::tracing::info!($s $(, $x)*);
            #[cfg(not(any(feature = "defmt-impl", feature = "tracing")))]
            let _ = ($( & $x ),*);
        }
    };
}

macro_rules! warn {
    ($s:literal $(, $x:expr)* $(,)?) => {
        {
            #[cfg(feature = "defmt-impl")]
            ::defmt::warn!($s $(, $x)*);
            #[cfg(all(feature = "tracing", not(feature = "defmt-impl")))]
            ::tracing::warn!($s $(, $x)*);
            #[cfg(not(any(feature = "defmt-impl", feature = "tracing")))]
            let _ = ($( & $x ),*);
        }
    };
}
