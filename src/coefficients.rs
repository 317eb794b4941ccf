//! Filter coefficients and their per-sample interpolation.

use crate::{
    allpass,
    buffer::*,
    cepstrum::{CepstrumT, MelCepstrum, MelGeneralizedCepstrum},
    generalized::Generalized,
};

/// Length of the impulse response used to measure filter energy.
const ENERGY_IR_LENGTH: usize = 576;

#[derive(Debug, Clone, PartialEq)]
pub struct Coefficients {
    buffer: Vec<f64>,
}

deref_buffer!(Coefficients);

impl Coefficients {
    pub fn new(c: &[f64]) -> Self {
        Self { buffer: c.to_vec() }
    }
}

impl CoefficientsT for Coefficients {
    type Cep = MelCepstrum;

    fn to_cep(&self, alpha: f64) -> Self::Cep {
        Self::Cep {
            buffer: boxed_slice![0.0; self.len()],
            alpha,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneralizedCoefficients {
    buffer: Vec<f64>,
    gamma: f64,
}

deref_buffer!(GeneralizedCoefficients);

impl GeneralizedCoefficients {
    pub fn new(c: &[f64], gamma: f64) -> Self {
        Self {
            buffer: c.to_vec(),
            gamma,
        }
    }
}

impl CoefficientsT for GeneralizedCoefficients {
    type Cep = MelGeneralizedCepstrum;

    fn to_cep(&self, alpha: f64) -> Self::Cep {
        Self::Cep {
            buffer: boxed_slice![0.0; self.len()],
            alpha,
            gamma: self.gamma,
        }
    }
}

impl Generalized for GeneralizedCoefficients {
    fn gamma(&self) -> f64 {
        self.gamma
    }
}

pub trait CoefficientsT: Buffer + Sized {
    type Cep: CepstrumT;

    fn to_cep(&self, alpha: f64) -> Self::Cep;

    fn b2mc(&self, alpha: f64) -> Self::Cep {
        let mut cepstrum = self.to_cep(alpha);
        cepstrum.copy_from_slice(self);
        allpass::b2mc(&mut cepstrum, alpha);
        cepstrum
    }

    /// Energy of the impulse response of the MLSA filter built from these coefficients.
    fn b2en(&self, alpha: f64) -> f64 {
        let ir = self
            .b2mc(alpha)
            .freqt(ENERGY_IR_LENGTH - 1, -alpha)
            .c2ir(ENERGY_IR_LENGTH);
        ir.iter().map(|x| x * x).sum()
    }
}

/// Linear walk of coefficients from the current frame to the next one.
///
/// `fperiod` samples are produced per frame and the coefficients are updated every `iperiod`
/// samples, the first update happening after `(iperiod + 1) / 2` samples.
/// Dropping the session leaves the coefficients at exactly the target frame.
pub struct CoefficientsSession<'a> {
    current: &'a mut [f64],
    increment: Vec<f64>,
    target: &'a [f64],
    iperiod: usize,
    countdown: usize,
}

impl<'a> CoefficientsSession<'a> {
    /// `current.len() == target.len()`, `1 <= iperiod <= fperiod`
    pub fn start(
        current: &'a mut [f64],
        target: &'a [f64],
        fperiod: usize,
        iperiod: usize,
    ) -> Self {
        debug_assert_eq!(current.len(), target.len());
        let scale = iperiod as f64 / fperiod as f64;
        let increment = current
            .iter()
            .zip(target)
            .map(|(current, target)| (target - current) * scale)
            .collect();
        Self {
            current,
            increment,
            target,
            iperiod,
            countdown: iperiod.div_ceil(2),
        }
    }

    /// Coefficients to use for the next sample.
    pub fn current(&self) -> &[f64] {
        &self.current[..]
    }

    /// Call once after each filtered sample.
    pub fn advance(&mut self) {
        self.countdown -= 1;
        if self.countdown == 0 {
            for (current, inc) in self.current.iter_mut().zip(&self.increment) {
                *current += inc;
            }
            self.countdown = self.iperiod;
        }
    }
}

impl Drop for CoefficientsSession<'_> {
    fn drop(&mut self) {
        self.current.copy_from_slice(self.target);
    }
}
