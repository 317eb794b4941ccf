use crate::{allpass::AllPassWarp, fourier::Fourier};

use super::{
    AnalysisError,
    theq::{Singular, ToeplitzHankel},
};

/// Buffers of one Newton-Raphson step, sized once per analyzer.
#[derive(Debug, Clone)]
pub(super) struct Newton {
    /// Order of the all-pass recursion
    n: usize,
    cr: Vec<f64>,
    ci: Vec<f64>,
    pr: Vec<f64>,
    qr: Vec<f64>,
    qi: Vec<f64>,
    rr: Vec<f64>,
    ri: Vec<f64>,
    update: Vec<f64>,
    warp: AllPassWarp,
    unwarp: AllPassWarp,
    solver: ToeplitzHankel,
}

/// Expand `buffer[..=m1]` into `buffer[..=m2]` through `warp`, zeroing the rest.
fn b2c(warp: &mut AllPassWarp, buffer: &mut [f64], m1: usize, m2: usize) {
    let expanded = warp.b2c(&buffer[..=m1], m2);
    buffer[..=m2].copy_from_slice(expanded);
    buffer[m2 + 1..].fill(0.0);
}

/// Gain (epsilon) of the model.
fn gain(er: &[f64], c: &[f64], gamma: f64) -> f64 {
    if gamma != 0.0 {
        let t: f64 = er[1..c.len()].iter().zip(&c[1..]).map(|(e, c)| e * c).sum();
        er[0] + gamma * t
    } else {
        er[0]
    }
}

/// Warp the autocorrelation-like sequence `p[..=m]`.
fn ptrans(p: &mut [f64], m: usize, alpha: f64) {
    let mut d = p[m];
    for k in (1..m).rev() {
        let o = p[k] + alpha * d;
        d = p[k];
        p[k] = o;
    }
    let o = alpha * d;
    p[0] = (1.0 - alpha * alpha) * p[0] + o + o;
}

fn qtrans(q: &mut [f64], m: usize, alpha: f64) {
    let mut d = q[1];
    for i in 2..=2 * m {
        let o = q[i] + alpha * d;
        d = q[i];
        q[i] = o;
    }
}

impl Newton {
    /// `2m < fft_len`, `n < fft_len`
    pub fn new(fft_len: usize, m: usize, n: usize, alpha: f64, min_determinant: f64) -> Self {
        Self {
            n,
            cr: vec![0.0; fft_len],
            ci: vec![0.0; fft_len],
            pr: vec![0.0; fft_len],
            qr: vec![0.0; fft_len],
            qi: vec![0.0; fft_len],
            rr: vec![0.0; fft_len],
            ri: vec![0.0; fft_len],
            update: vec![0.0; m],
            warp: AllPassWarp::with_capacity(alpha, n.max(2 * m)),
            unwarp: AllPassWarp::with_capacity(-alpha, n),
            solver: ToeplitzHankel::new(m, min_determinant),
        }
    }

    /// One step on the periodogram `x`, updating `(K, b')` in `c` in place.
    ///
    /// Returns the log of the model error.
    pub fn step(
        &mut self,
        fourier: &mut Fourier,
        x: &[f64],
        c: &mut [f64],
        gamma: f64,
        iteration: usize,
    ) -> Result<f64, AnalysisError> {
        let m = c.len() - 1;
        let m2 = 2 * m;
        let n = self.n;
        let alpha = self.warp.alpha();

        self.cr.fill(0.0);
        self.cr[1..=m].copy_from_slice(&c[1..]);
        if alpha != 0.0 {
            b2c(&mut self.unwarp, &mut self.cr, m, n);
        }
        fourier.fftr(&mut self.cr, &mut self.ci);

        if gamma == -1.0 {
            self.pr.copy_from_slice(x);
        } else if gamma == 0.0 {
            for ((p, x), c) in self.pr.iter_mut().zip(x).zip(&self.cr) {
                *p = x / (c + c).exp();
            }
        } else {
            for i in 0..x.len() {
                let tr = 1.0 + gamma * self.cr[i];
                let ti = gamma * self.ci[i];
                let trr = tr * tr;
                let tii = ti * ti;
                let s = trr + tii;
                let t = x[i] * s.powf(-1.0 / gamma) / s;
                self.pr[i] = t;
                self.rr[i] = tr * t;
                self.ri[i] = ti * t;
                let t = t / s;
                self.qr[i] = (trr - tii) * t;
                self.qi[i] = 2.0 * tr * ti * t;
            }
        }

        fourier.ifftr(&mut self.pr, &mut self.ci);
        if alpha != 0.0 {
            b2c(&mut self.warp, &mut self.pr, n, m2);
        }

        if gamma == 0.0 || gamma == -1.0 {
            self.qr[..=m2].copy_from_slice(&self.pr[..=m2]);
            self.rr[..=m].copy_from_slice(&self.pr[..=m]);
        } else {
            fourier.ifft(&mut self.qr, &mut self.qi);
            fourier.ifft(&mut self.rr, &mut self.ri);
            if alpha != 0.0 {
                b2c(&mut self.warp, &mut self.qr, n, n);
                b2c(&mut self.warp, &mut self.rr, n, m);
            }
        }

        if alpha != 0.0 {
            ptrans(&mut self.pr, m, alpha);
            qtrans(&mut self.qr, m, alpha);
        }

        let mut error = 0.0;
        if gamma != -1.0 {
            error = gain(&self.rr, c, gamma);
            c[0] = error.sqrt();
        }

        if gamma == -1.0 {
            self.qr[..=m2].fill(0.0);
        } else if gamma != 0.0 {
            for q in &mut self.qr[2..=m2] {
                *q *= 1.0 + gamma;
            }
        }

        if m > 0 {
            self.solver
                .solve(&self.pr, &self.qr[2..], &self.rr[1..=m], &mut self.update)
                .map_err(|Singular { determinant }| {
                    log::warn!(
                        "determinant of the normal matrix is too small ({determinant:e}) at iteration {iteration}"
                    );
                    AnalysisError::Singular { iteration }
                })?;
            for (c, u) in c[1..].iter_mut().zip(&self.update) {
                *c += u;
            }
        }

        if gamma == -1.0 {
            error = gain(&self.rr, c, gamma);
            c[0] = error.sqrt();
        }

        log::trace!("newton iteration {iteration}: epsilon = {error}");
        Ok(error.ln())
    }
}
