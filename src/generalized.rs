//! Gain normalization and gamma conversion of generalized cepstra.

use crate::buffer::Buffer;

/// Error in gain (de)normalization.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum GeneralizedError {
    /// `gain` is negative, and raising it to a non-integer power has no real value.
    #[error("cannot raise negative gain {gain} to a non-integer power (gamma = {gamma})")]
    NegativeGain { gain: f64, gamma: f64 },
    /// The logarithm of a non-positive gain was requested (gamma = 0).
    #[error("gain must be positive to take its logarithm, got {gain}")]
    NonPositiveGain { gain: f64 },
}

fn checked_powf(base: f64, exponent: f64, gamma: f64) -> Result<f64, GeneralizedError> {
    if base < 0.0 && exponent.fract() != 0.0 {
        return Err(GeneralizedError::NegativeGain { gain: base, gamma });
    }
    Ok(base.powf(exponent))
}

/// Gain normalization, in place.
///
/// - `gamma != 0`: `K = (1 + gamma c[0])^(1/gamma)`, `c'[i] = c[i] / (1 + gamma c[0])`
/// - `gamma == 0`: `K = exp(c[0])`, shape unchanged
pub fn gnorm(c: &mut [f64], gamma: f64) -> Result<(), GeneralizedError> {
    let Some((c0, shape)) = c.split_first_mut() else {
        return Ok(());
    };
    if gamma != 0.0 {
        let k = 1.0 + gamma * *c0;
        *c0 = checked_powf(k, 1.0 / gamma, gamma)?;
        for ci in shape {
            *ci /= k;
        }
    } else {
        *c0 = c0.exp();
    }
    Ok(())
}

/// Inverse of [`gnorm`], in place.
///
/// - `gamma != 0`: `k = K^gamma`, `c[0] = (k - 1) / gamma`, `c[i] = k c'[i]`
/// - `gamma == 0`: `c[0] = ln(K)`, shape unchanged
pub fn ignorm(c: &mut [f64], gamma: f64) -> Result<(), GeneralizedError> {
    let Some((c0, shape)) = c.split_first_mut() else {
        return Ok(());
    };
    if gamma != 0.0 {
        let k = checked_powf(*c0, gamma, gamma)?;
        *c0 = (k - 1.0) / gamma;
        for ci in shape {
            *ci *= k;
        }
    } else {
        if *c0 <= 0.0 {
            return Err(GeneralizedError::NonPositiveGain { gain: *c0 });
        }
        *c0 = c0.ln();
    }
    Ok(())
}

/// Convert normalized generalized cepstrum `c1` (gamma `g1`) into `c2` (gamma `g2`).
///
/// The order of the result is `c2.len() - 1`. `c1[0]` (the gain) is copied unchanged.
pub fn gc2gc(c1: &[f64], g1: f64, c2: &mut [f64], g2: f64) {
    let Some(first) = c1.first() else {
        c2.fill(0.0);
        return;
    };
    let m1 = c1.len() - 1;
    let Some(c20) = c2.first_mut() else {
        return;
    };
    *c20 = *first;

    for i in 1..c2.len() {
        let mut ss1 = 0.0;
        let mut ss2 = 0.0;
        for k in 1..=m1.min(i - 1) {
            let mk = i - k;
            let cc = c1[k] * c2[mk];
            ss2 += k as f64 * cc;
            ss1 += mk as f64 * cc;
        }
        let correction = (g2 * ss2 - g1 * ss1) / i as f64;
        c2[i] = if i <= m1 { c1[i] + correction } else { correction };
    }
}

/// Buffers which carry their own gamma.
pub trait Generalized: Clone + Buffer {
    fn gamma(&self) -> f64;

    fn gnorm(&self) -> Result<Self, GeneralizedError> {
        let mut target = self.clone();
        gnorm(&mut target, self.gamma())?;
        Ok(target)
    }

    fn ignorm(&self) -> Result<Self, GeneralizedError> {
        let mut target = self.clone();
        ignorm(&mut target, self.gamma())?;
        Ok(target)
    }
}
