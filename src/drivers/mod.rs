//! Input debouncing and indicator output drivers.

pub mod debounce;
pub mod indicator;
