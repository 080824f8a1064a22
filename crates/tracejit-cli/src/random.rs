//! Standard normal samples from the OS random source.

use anyhow::{Result, anyhow};
use std::f64::consts::TAU;

/// `count` independent N(0, 1) samples (Box-Muller).
pub fn standard_normal(count: usize) -> Result<Vec<f64>> {
    (0..count)
        .map(|_| {
            let radius = (-2.0 * open_unit()?.ln()).sqrt();
            Ok(radius * (TAU * open_unit()?).cos())
        })
        .collect()
}

/// Uniform in (0, 1], so the logarithm above stays finite.
fn open_unit() -> Result<f64> {
    let bits = getrandom::u64().map_err(|error| anyhow!("random source unavailable: {error}"))?;
    Ok(((bits >> 11) as f64 + 1.0) / (1u64 << 53) as f64)
}
