//! Stability check of MLSA filter coefficients.

use serde::{Deserialize, Serialize};

use crate::{filter::PadeOrder, fourier::Fourier};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StabilityError {
    #[error("FFT length must be a power of two, got {0}")]
    InvalidFftLength(usize),
    #[error("order {order} does not fit in FFT length {fft_len}")]
    InvalidOrder { order: usize, fft_len: usize },
    #[error("all-pass constant must be in (-1, 1), got {0}")]
    InvalidAlpha(f64),
    #[error("expected {expected} coefficients, got {got}")]
    LengthMismatch { expected: usize, got: usize },
}

/// Which bound the log-amplitude spectrum must stay within.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    /// Keep the log approximation error of the Pade approximant small
    #[default]
    ApproximationError,
    /// Keep the filter stable
    Stable,
}

/// How an unstable frame is rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Correction {
    /// Report only
    #[default]
    None,
    /// Clip each frequency bin above the threshold
    Clip,
    /// Scale the whole spectrum so that its peak meets the threshold
    Scale,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilityConfig {
    /// Order of the mel-cepstrum
    pub order: usize,
    /// All-pass constant
    pub alpha: f64,
    pub fft_len: usize,
    pub pade: PadeOrder,
    pub condition: Condition,
    pub correction: Correction,
}

impl Default for StabilityConfig {
    fn default() -> Self {
        Self {
            order: 25,
            alpha: 0.35,
            fft_len: 256,
            pade: PadeOrder::Four,
            condition: Condition::ApproximationError,
            correction: Correction::None,
        }
    }
}

impl StabilityConfig {
    /// Largest accepted magnitude of the gain-normalized log spectrum.
    pub fn threshold(&self) -> f64 {
        match (self.pade, self.condition) {
            (PadeOrder::Four, Condition::ApproximationError) => 4.5,
            (PadeOrder::Four, Condition::Stable) => 6.2,
            (PadeOrder::Five, Condition::ApproximationError) => 6.0,
            (PadeOrder::Five, Condition::Stable) => 7.65,
        }
    }
}

/// Outcome of one checked frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StabilityReport {
    /// Index of the frame in this session
    pub frame: usize,
    pub max_magnitude: f64,
    pub stable: bool,
    /// The coefficients were rewritten
    pub corrected: bool,
}

/// Checks (and optionally corrects) a stream of mel-cepstra.
#[derive(Debug, Clone)]
pub struct StabilityChecker {
    config: StabilityConfig,
    fourier: Fourier,
    x: Vec<f64>,
    y: Vec<f64>,
    frame: usize,
}

impl StabilityChecker {
    pub fn new(config: &StabilityConfig) -> Result<Self, StabilityError> {
        let fft_len = config.fft_len;
        if fft_len < 2 || !fft_len.is_power_of_two() {
            return Err(StabilityError::InvalidFftLength(fft_len));
        }
        if config.order >= fft_len / 2 {
            return Err(StabilityError::InvalidOrder {
                order: config.order,
                fft_len,
            });
        }
        if !(config.alpha.abs() < 1.0) {
            return Err(StabilityError::InvalidAlpha(config.alpha));
        }
        Ok(Self {
            config: config.clone(),
            fourier: Fourier::new(fft_len),
            x: vec![0.0; fft_len],
            y: vec![0.0; fft_len],
            frame: 0,
        })
    }

    pub fn config(&self) -> &StabilityConfig {
        &self.config
    }

    /// Check one frame, rewriting it in place if it is unstable and a correction is configured.
    pub fn check(&mut self, mcep: &mut [f64]) -> Result<StabilityReport, StabilityError> {
        let expected = self.config.order + 1;
        if mcep.len() != expected {
            return Err(StabilityError::LengthMismatch {
                expected,
                got: mcep.len(),
            });
        }
        let frame = self.frame;
        self.frame += 1;

        let fft_len = self.config.fft_len;
        let half = fft_len / 2;
        let threshold = self.config.threshold();

        // gain of the filter at z = infinity
        let alpha = self.config.alpha;
        let mut gain = 0.0;
        let mut power = 1.0;
        for c in mcep.iter() {
            gain += c * power;
            power *= alpha;
        }

        self.x.fill(0.0);
        self.x[..expected].copy_from_slice(mcep);
        self.x[0] -= gain;
        let normalized = self.x[..expected].to_vec();
        self.fourier.fftr(&mut self.x, &mut self.y);

        let magnitude = |x: f64, y: f64| (x * x + y * y).sqrt();
        let max_magnitude = (0..=half)
            .map(|i| magnitude(self.x[i], self.y[i]))
            .fold(0.0, f64::max);
        let stable = max_magnitude <= threshold;

        let corrected = !stable && self.config.correction != Correction::None;
        if !stable {
            log::warn!("[No. {frame}] is unstable frame");
        }
        if corrected {
            match self.config.correction {
                Correction::Clip => {
                    for i in 0..=half {
                        let mag = magnitude(self.x[i], self.y[i]);
                        if mag > threshold {
                            let r = threshold / mag;
                            self.x[i] *= r;
                            self.y[i] *= r;
                            if i != 0 && i != half {
                                self.x[fft_len - i] *= r;
                                self.y[fft_len - i] *= r;
                            }
                        }
                    }
                    self.fourier.ifft(&mut self.x, &mut self.y);
                    mcep.copy_from_slice(&self.x[..expected]);
                }
                Correction::Scale => {
                    let r = threshold / max_magnitude;
                    for (c, x) in mcep.iter_mut().zip(&normalized) {
                        *c = x * r;
                    }
                }
                Correction::None => {}
            }
            mcep[0] += gain;
        }

        Ok(StabilityReport {
            frame,
            max_magnitude,
            stable,
            corrected,
        })
    }
}
