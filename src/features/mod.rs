//! Feature engineering module
//!
//! Derives named numeric columns from candles and assembles them into the
//! validated matrix consumed by the detectors.

mod indicators;
mod kind;
mod matrix;

pub use indicators::*;
pub use kind::*;
pub use matrix::*;
