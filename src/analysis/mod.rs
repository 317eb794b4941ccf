//! Mel-generalized cepstral analysis.
//!
//! ## Example
//!
//! ```rust
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use jsptk::analysis::{AnalysisConfig, InputType, MgcepAnalyzer};
//!
//! let config = AnalysisConfig {
//!     order: 12,
//!     fft_len: 64,
//!     input: InputType::Periodogram,
//!     ..Default::default()
//! };
//! let mut analyzer = MgcepAnalyzer::new(&config)?;
//!
//! // white noise: flat periodogram
//! let analysis = analyzer.analyze(&[1.0; 33])?;
//! assert_eq!(analysis.coefficients.len(), 13);
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};

use crate::{
    allpass,
    fourier::Fourier,
    generalized::{self, GeneralizedError},
};

use self::newton::Newton;

mod newton;
mod theq;

/// Errors in mel-generalized cepstral analysis.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AnalysisError {
    #[error("FFT length must be a power of two greater than twice the order and the recursion order, got {0}")]
    InvalidFftLength(usize),
    #[error("order {0} is too large for the FFT length")]
    InvalidOrder(usize),
    #[error("all-pass constant must be in (-1, 1), got {0}")]
    InvalidAlpha(f64),
    #[error("gamma must be in [-1, 0], got {0}")]
    InvalidGamma(f64),
    #[error("value of e must be e >= 0, got {0}")]
    NegativeFloor(f64),
    #[error("value of E must be E < 0, got {0}")]
    NonNegativeRelativeFloor(f64),
    #[error("expected a frame of {expected} values, got {got}")]
    FrameLength { expected: usize, got: usize },
    /// The normal equations could not be solved; the frame should be skipped.
    #[error("normal matrix is singular at iteration {iteration}")]
    Singular { iteration: usize },
    #[error("analysis produced non-finite coefficients")]
    NonFinite,
    #[error(transparent)]
    Generalized(#[from] GeneralizedError),
}

/// Representation of the input frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputType {
    /// Windowed waveform, `fft_len` samples
    #[default]
    Windowed,
    /// `20 log10 |X(w)|`, `fft_len / 2 + 1` bins
    Decibel,
    /// `ln |X(w)|`, `fft_len / 2 + 1` bins
    Log,
    /// `|X(w)|`, `fft_len / 2 + 1` bins
    Amplitude,
    /// `|X(w)|^2`, `fft_len / 2 + 1` bins
    Periodogram,
}

/// Floor on the periodogram.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Floor {
    #[default]
    None,
    /// Added to every bin, `e >= 0`
    Additive(f64),
    /// Lower bound relative to the peak, in dB, `E < 0`
    Relative(f64),
}

/// Representation of the output coefficients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputType {
    /// `c~(m)`
    #[default]
    MelGeneralizedCepstrum,
    /// `b(m)`
    FilterCoefficients,
    /// `(K, c~'(1), ..., c~'(m))`
    NormalizedCepstrum,
    /// `(K, b'(1), ..., b'(m))`
    NormalizedCoefficients,
    /// `(K, gamma c~'(1), ..., gamma c~'(m))`
    ScaledCepstrum,
    /// `(K, gamma b'(1), ..., gamma b'(m))`
    ScaledCoefficients,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Order of the mel-generalized cepstrum
    pub order: usize,
    /// All-pass constant
    pub alpha: f64,
    /// Power parameter, `-1 <= gamma <= 0`
    pub gamma: f64,
    /// FFT length, a power of two
    pub fft_len: usize,
    pub input: InputType,
    pub output: OutputType,
    pub floor: Floor,
    pub min_iterations: usize,
    pub max_iterations: usize,
    /// Relative change of the log error below which the iteration stops
    pub end_condition: f64,
    /// Smallest accepted determinant in the normal equations
    pub min_determinant: f64,
    /// Order of the all-pass recursion; `fft_len - 1` if `None`
    pub recursion_order: Option<usize>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            order: 25,
            alpha: 0.35,
            gamma: 0.0,
            fft_len: 256,
            input: InputType::Windowed,
            output: OutputType::MelGeneralizedCepstrum,
            floor: Floor::None,
            min_iterations: 2,
            max_iterations: 30,
            end_condition: 0.001,
            min_determinant: 1.0e-6,
            recursion_order: None,
        }
    }
}

impl AnalysisConfig {
    /// Number of values in one input frame.
    pub fn frame_len(&self) -> usize {
        match self.input {
            InputType::Windowed => self.fft_len,
            _ => self.fft_len / 2 + 1,
        }
    }

    fn recursion_order(&self) -> usize {
        self.recursion_order
            .unwrap_or(self.fft_len.saturating_sub(1))
    }

    fn validate(&self) -> Result<(), AnalysisError> {
        if !self.fft_len.is_power_of_two() || self.fft_len < 2 {
            return Err(AnalysisError::InvalidFftLength(self.fft_len));
        }
        if 2 * self.order >= self.fft_len {
            return Err(AnalysisError::InvalidOrder(self.order));
        }
        if self.recursion_order() >= self.fft_len {
            return Err(AnalysisError::InvalidFftLength(self.fft_len));
        }
        if !(self.alpha.abs() < 1.0) {
            return Err(AnalysisError::InvalidAlpha(self.alpha));
        }
        if !(-1.0..=0.0).contains(&self.gamma) {
            return Err(AnalysisError::InvalidGamma(self.gamma));
        }
        match self.floor {
            Floor::Additive(e) if !(e >= 0.0) => Err(AnalysisError::NegativeFloor(e)),
            Floor::Relative(e) if !(e < 0.0) => Err(AnalysisError::NonNegativeRelativeFloor(e)),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Convergence {
    Converged,
    /// `max_iterations` was exhausted; the coefficients are the last estimate.
    NotConverged,
}

/// Result of analyzing one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    /// Coefficients in the configured [`OutputType`]
    pub coefficients: Vec<f64>,
    pub convergence: Convergence,
    /// Number of Newton-Raphson iterations at the target gamma
    pub iterations: usize,
    /// Log of the final model error
    pub log_error: f64,
}

/// Mel-generalized cepstral analysis session.
///
/// Owns every buffer the analysis needs; frames of one stream are analyzed one after another.
#[derive(Debug, Clone)]
pub struct MgcepAnalyzer {
    config: AnalysisConfig,
    fourier: Fourier,
    newton: Newton,
    x: Vec<f64>,
    y: Vec<f64>,
    d: Vec<f64>,
}

impl MgcepAnalyzer {
    pub fn new(config: &AnalysisConfig) -> Result<Self, AnalysisError> {
        config.validate()?;
        let fft_len = config.fft_len;
        Ok(Self {
            config: config.clone(),
            fourier: Fourier::new(fft_len),
            newton: Newton::new(
                fft_len,
                config.order,
                config.recursion_order(),
                config.alpha,
                config.min_determinant,
            ),
            x: vec![0.0; fft_len],
            y: vec![0.0; fft_len],
            d: vec![0.0; config.order + 1],
        })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Analyze one frame of [`AnalysisConfig::frame_len`] values.
    pub fn analyze(&mut self, frame: &[f64]) -> Result<Analysis, AnalysisError> {
        let expected = self.config.frame_len();
        if frame.len() != expected {
            return Err(AnalysisError::FrameLength {
                expected,
                got: frame.len(),
            });
        }

        self.periodogram(frame);
        let (mut b, convergence, iterations, log_error) = self.mgcep()?;
        self.convert_output(&mut b)?;

        if b.iter().any(|v| !v.is_finite()) {
            return Err(AnalysisError::NonFinite);
        }
        Ok(Analysis {
            coefficients: b,
            convergence,
            iterations,
            log_error,
        })
    }

    /// Fill `self.x` with the floored periodogram of `frame`.
    fn periodogram(&mut self, frame: &[f64]) {
        let fft_len = self.config.fft_len;
        let half = fft_len / 2;
        let eps = match self.config.floor {
            Floor::Additive(e) => e,
            _ => 0.0,
        };

        let x = &mut self.x;
        match self.config.input {
            InputType::Windowed => {
                x.copy_from_slice(frame);
                self.fourier.fftr(x, &mut self.y);
                for (x, y) in x.iter_mut().zip(&self.y) {
                    *x = *x * *x + y * y + eps;
                }
            }
            input => {
                for (x, &v) in x.iter_mut().zip(frame) {
                    let amplitude = match input {
                        InputType::Decibel => (v / 20.0 * std::f64::consts::LN_10).exp(),
                        InputType::Log => v.exp(),
                        _ => v,
                    };
                    *x = match input {
                        InputType::Periodogram => v + eps,
                        _ => amplitude * amplitude + eps,
                    };
                }
                for i in 1..half {
                    x[fft_len - i] = x[i];
                }
            }
        }

        if let Floor::Relative(e) = self.config.floor {
            let max = x.iter().copied().fold(f64::NEG_INFINITY, f64::max).sqrt();
            let min = max * 10f64.powf(e / 20.0);
            let min = min * min;
            for x in x.iter_mut() {
                if *x < min {
                    *x = min;
                }
            }
        }
    }

    /// Returns normalized `(K, b')` with the convergence status.
    fn mgcep(&mut self) -> Result<(Vec<f64>, Convergence, usize, f64), AnalysisError> {
        let AnalysisConfig {
            order: m,
            alpha,
            gamma,
            min_iterations,
            max_iterations,
            end_condition,
            ..
        } = self.config;

        // linear prediction gives the starting point
        let mut b = vec![0.0; m + 1];
        let mut ep = self
            .newton
            .step(&mut self.fourier, &self.x, &mut b, -1.0, 0)?;

        if gamma == -1.0 {
            return Ok((b, Convergence::Converged, 0, ep));
        }

        let d = &mut self.d;
        if alpha != 0.0 {
            generalized::ignorm(&mut b, -1.0)?;
            allpass::b2mc(&mut b, alpha);
            generalized::gnorm(&mut b, -1.0)?;
        }
        d.copy_from_slice(&b);
        generalized::gc2gc(d, -1.0, &mut b, gamma);
        if alpha != 0.0 {
            generalized::ignorm(&mut b, gamma)?;
            allpass::mc2b(&mut b, alpha);
            generalized::gnorm(&mut b, gamma)?;
        }

        for j in 1..=max_iterations {
            let epo = ep;
            ep = self
                .newton
                .step(&mut self.fourier, &self.x, &mut b, gamma, j)?;
            if j >= min_iterations && (epo == ep || ((epo - ep) / ep).abs() < end_condition) {
                log::debug!("converged after {j} iterations (log error {ep})");
                return Ok((b, Convergence::Converged, j, ep));
            }
        }

        log::debug!("not converged after {max_iterations} iterations (log error {ep})");
        Ok((b, Convergence::NotConverged, max_iterations, ep))
    }

    fn convert_output(&self, b: &mut [f64]) -> Result<(), GeneralizedError> {
        use OutputType::*;

        let AnalysisConfig {
            alpha,
            gamma,
            output,
            ..
        } = self.config;

        if matches!(
            output,
            MelGeneralizedCepstrum | FilterCoefficients | NormalizedCepstrum | ScaledCepstrum
        ) {
            generalized::ignorm(b, gamma)?;
        }
        if matches!(
            output,
            MelGeneralizedCepstrum | NormalizedCepstrum | ScaledCepstrum
        ) {
            allpass::b2mc(b, alpha);
        }
        if matches!(output, NormalizedCepstrum | ScaledCepstrum) {
            generalized::gnorm(b, gamma)?;
        }
        if matches!(output, ScaledCepstrum | ScaledCoefficients) {
            for v in &mut b[1..] {
                *v *= gamma;
            }
        }
        Ok(())
    }
}
