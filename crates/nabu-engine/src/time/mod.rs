//! Time subsystem.
//!
//! [`FixedRateTimer`] turns wall-clock time into whole logical frames so game
//! logic and clip animation advance at a fixed rate regardless of the host's
//! refresh rate.

mod fixed_rate;

pub use fixed_rate::{FixedRateConfig, FixedRateTimer};
