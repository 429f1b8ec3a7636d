//! Data module for loading and preparing candle data
//!
//! This module provides:
//! - Candle (OHLCV) data structures
//! - CSV/JSON loading and saving
//! - Column statistics and standardization
//! - Cleaning, feature enrichment and matrix preparation

mod loader;
mod ohlcv;
mod processor;
mod stats;

pub use loader::*;
pub use ohlcv::*;
pub use processor::*;
pub use stats::*;
