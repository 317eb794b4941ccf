use std::sync::Arc;

use rustfft::{Fft, FftPlanner, num_complex::Complex};

/// Planned transforms of one length, with split real/imaginary arrays.
///
/// Scaling follows SPTK: forward transforms are unscaled, inverse transforms divide by the length.
#[derive(Clone)]
pub(crate) struct Fourier {
    forward: Arc<dyn Fft<f64>>,
    inverse: Arc<dyn Fft<f64>>,
    buffer: Vec<Complex<f64>>,
    scratch: Vec<Complex<f64>>,
}

impl std::fmt::Debug for Fourier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fourier")
            .field("len", &self.buffer.len())
            .finish()
    }
}

impl Fourier {
    pub fn new(len: usize) -> Self {
        let mut planner = FftPlanner::new();
        let forward = planner.plan_fft_forward(len);
        let inverse = planner.plan_fft_inverse(len);
        let scratch_len = forward
            .get_inplace_scratch_len()
            .max(inverse.get_inplace_scratch_len());
        Self {
            forward,
            inverse,
            buffer: vec![Complex::new(0.0, 0.0); len],
            scratch: vec![Complex::new(0.0, 0.0); scratch_len],
        }
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// DFT of the real sequence `x`; real part is written back to `x`, imaginary part to `y`.
    pub fn fftr(&mut self, x: &mut [f64], y: &mut [f64]) {
        for (bi, xi) in self.buffer.iter_mut().zip(x.iter()) {
            *bi = Complex::new(*xi, 0.0);
        }
        self.forward
            .process_with_scratch(&mut self.buffer, &mut self.scratch);
        self.unpack(x, y, 1.0);
    }

    /// Inverse DFT of a real spectrum `x`, scaled by `1 / len`.
    /// `y` receives the (negated, scaled) imaginary part, which vanishes for symmetric input.
    pub fn ifftr(&mut self, x: &mut [f64], y: &mut [f64]) {
        self.fftr(x, y);
        let scale = self.len() as f64;
        for xi in x.iter_mut() {
            *xi /= scale;
        }
        for yi in y.iter_mut() {
            *yi /= -scale;
        }
    }

    /// Inverse DFT of the complex sequence `x + jy`, scaled by `1 / len`.
    pub fn ifft(&mut self, x: &mut [f64], y: &mut [f64]) {
        for ((bi, xi), yi) in self.buffer.iter_mut().zip(x.iter()).zip(y.iter()) {
            *bi = Complex::new(*xi, *yi);
        }
        self.inverse
            .process_with_scratch(&mut self.buffer, &mut self.scratch);
        let scale = 1.0 / self.len() as f64;
        self.unpack(x, y, scale);
    }

    fn unpack(&self, x: &mut [f64], y: &mut [f64], scale: f64) {
        for ((bi, xi), yi) in self.buffer.iter().zip(x.iter_mut()).zip(y.iter_mut()) {
            *xi = bi.re * scale;
            *yi = bi.im * scale;
        }
    }
}
