//! Typed mel-cepstra and mel-generalized cepstra.

use crate::{
    allpass::{self, AllPassWarp},
    buffer::*,
    coefficients::{Coefficients, CoefficientsT, GeneralizedCoefficients},
    fourier::Fourier,
    generalized::{self, Generalized, GeneralizedError},
};

#[derive(Debug, Clone, PartialEq)]
pub struct MelCepstrum {
    pub(crate) buffer: Box<[f64]>,
    pub(crate) alpha: f64,
}

deref_buffer!(MelCepstrum);

impl MelCepstrum {
    pub fn new(c: &[f64], alpha: f64) -> Self {
        Self {
            buffer: c.into(),
            alpha,
        }
    }

    /// Emphasize formant peaks by `beta` while keeping the frame energy.
    pub fn postfilter_mcp(&mut self, beta: f64) {
        if beta > 0.0 && self.len() > 2 {
            let mut coefficients = self.mc2b();
            let e1 = coefficients.b2en(self.alpha);

            coefficients[1] -= beta * self.alpha * coefficients[2];
            for k in 2..self.len() {
                coefficients[k] *= 1.0 + beta;
            }

            let e2 = coefficients.b2en(self.alpha);
            coefficients[0] += (e1 / e2).ln() / 2.0;
            *self = coefficients.b2mc(self.alpha);
        }
    }
}

impl CepstrumT for MelCepstrum {
    type Coef = Coefficients;

    fn alpha(&self) -> f64 {
        self.alpha
    }

    fn to_coef(&self) -> Self::Coef {
        Self::Coef::new(self)
    }

    fn clone_with_size(&self, size: usize) -> Self {
        Self {
            buffer: boxed_slice![0.0; size],
            alpha: self.alpha,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MelGeneralizedCepstrum {
    pub(crate) buffer: Box<[f64]>,
    pub(crate) alpha: f64,
    pub(crate) gamma: f64,
}

deref_buffer!(MelGeneralizedCepstrum);

impl MelGeneralizedCepstrum {
    pub fn new(c: &[f64], alpha: f64, gamma: f64) -> Self {
        Self {
            buffer: c.into(),
            alpha,
            gamma,
        }
    }

    /// Re-express with another gamma and order `m2`. `self` must be gain-normalized.
    pub fn gc2gc(&self, m2: usize, gamma: f64) -> Self {
        let mut cepstrum = Self {
            buffer: boxed_slice![0.0; m2 + 1],
            alpha: self.alpha,
            gamma,
        };
        generalized::gc2gc(self, self.gamma, &mut cepstrum, gamma);
        cepstrum
    }

    /// Convert into order `m2`, warping `alpha` and gamma `gamma`.
    pub fn mgc2mgc(&self, m2: usize, alpha: f64, gamma: f64) -> Result<Self, GeneralizedError> {
        let converted = if self.alpha == alpha {
            self.gnorm()?.gc2gc(m2, gamma).ignorm()?
        } else {
            let warped = Self {
                alpha,
                ..self.freqt(m2, allpass::warp_factor(self.alpha, alpha))
            };
            warped.gnorm()?.gc2gc(m2, gamma).ignorm()?
        };
        Ok(converted)
    }

    /// Log-amplitude spectrum `ln|H(e^jw)|` at `fft_len / 2 + 1` equally spaced bins in `[0, pi]`.
    pub fn log_spectrum(&self, fft_len: usize) -> Result<Vec<f64>, GeneralizedError> {
        let half = fft_len / 2;
        let cepstrum = self.mgc2mgc(half, 0.0, 0.0)?;

        let mut x = vec![0.0; fft_len];
        let mut y = vec![0.0; fft_len];
        x[..=half].copy_from_slice(&cepstrum);
        Fourier::new(fft_len).fftr(&mut x, &mut y);

        x.truncate(half + 1);
        Ok(x)
    }
}

impl CepstrumT for MelGeneralizedCepstrum {
    type Coef = GeneralizedCoefficients;

    fn alpha(&self) -> f64 {
        self.alpha
    }

    fn to_coef(&self) -> Self::Coef {
        Self::Coef::new(self, self.gamma)
    }

    fn clone_with_size(&self, size: usize) -> Self {
        Self {
            buffer: boxed_slice![0.0; size],
            alpha: self.alpha,
            gamma: self.gamma,
        }
    }
}

impl Generalized for MelGeneralizedCepstrum {
    fn gamma(&self) -> f64 {
        self.gamma
    }
}

pub trait CepstrumT: Buffer + Sized {
    type Coef: CoefficientsT;

    fn alpha(&self) -> f64;

    fn to_coef(&self) -> Self::Coef;

    fn mc2b(&self) -> Self::Coef {
        let mut coefficients = self.to_coef();
        allpass::mc2b(&mut coefficients, self.alpha());
        coefficients
    }

    fn clone_with_size(&self, size: usize) -> Self;

    /// Frequency transformation into order `m2` by the all-pass constant `alpha`.
    fn freqt(&self, m2: usize, alpha: f64) -> Self {
        let mut cepstrum = self.clone_with_size(m2 + 1);
        cepstrum.copy_from_slice(AllPassWarp::new(alpha).freqt(self, m2));
        cepstrum
    }

    /// Minimum-phase impulse response of length `len`.
    fn c2ir(&self, len: usize) -> Box<[f64]> {
        let mut ir = boxed_slice![0.0; len];
        if len == 0 {
            return ir;
        }
        ir[0] = self[0].exp();
        for n in 1..len {
            let mut d = 0.0;
            for k in 1..self.len().min(n + 1) {
                d += k as f64 * self[k] * ir[n - k];
            }
            ir[n] = d / n as f64;
        }
        ir
    }
}
