//! All-pass frequency warping.
//!
//! Each unit delay `z^-1` is replaced with the first-order all-pass section
//! `(z^-1 - alpha) / (1 - alpha z^-1)`. `alpha == 0.0` leaves every transform an identity.

/// Composite warping factor which converts a sequence warped by `alpha1` into one warped by `alpha2`.
pub fn warp_factor(alpha1: f64, alpha2: f64) -> f64 {
    (alpha2 - alpha1) / (1.0 - alpha1 * alpha2)
}

/// Mel-cepstrum to MLSA filter coefficients, in place.
///
/// `b[m] = mc[m]`, `b[i] = mc[i] - alpha b[i+1]`
pub fn mc2b(c: &mut [f64], alpha: f64) {
    if alpha == 0.0 || c.len() < 2 {
        return;
    }
    for i in (0..c.len() - 1).rev() {
        c[i] -= alpha * c[i + 1];
    }
}

/// MLSA filter coefficients to mel-cepstrum, in place. Inverse of [`mc2b`].
///
/// `mc[m] = b[m]`, `mc[i] = b[i] + alpha b[i+1]`
pub fn b2mc(c: &mut [f64], alpha: f64) {
    if alpha == 0.0 || c.len() < 2 {
        return;
    }
    // b[i+1] before it was overwritten
    let mut next = c[c.len() - 1];
    for i in (0..c.len() - 1).rev() {
        let current = c[i];
        c[i] = current + alpha * next;
        next = current;
    }
}

/// Recursive all-pass substitution with its own delay memory.
///
/// Output is held in the struct and borrowed by the caller, so the input
/// may be a view into the same buffer that the result is copied back into.
#[derive(Debug, Clone)]
pub struct AllPassWarp {
    alpha: f64,
    d: Vec<f64>,
    g: Vec<f64>,
}

impl AllPassWarp {
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha,
            d: Vec::new(),
            g: Vec::new(),
        }
    }

    /// Pre-size the memory so that no allocation happens for outputs up to order `m2`.
    pub fn with_capacity(alpha: f64, m2: usize) -> Self {
        Self {
            alpha,
            d: vec![0.0; m2 + 1],
            g: vec![0.0; m2 + 1],
        }
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Expand all-pass taps `b` (order `b.len() - 1`) into a cepstrum of order `m2`.
    ///
    /// This is the cascade of `b.len()` all-pass filterings used by mel-generalized cepstral analysis.
    pub fn b2c(&mut self, b: &[f64], m2: usize) -> &[f64] {
        self.recursion(b, m2, false)
    }

    /// Re-express cepstrum `c` (order `c.len() - 1`) with order `m2` under warping `alpha`.
    pub fn freqt(&mut self, c: &[f64], m2: usize) -> &[f64] {
        self.recursion(c, m2, true)
    }

    fn recursion(&mut self, input: &[f64], m2: usize, accumulate_first: bool) -> &[f64] {
        let alpha = self.alpha;
        let aa = 1.0 - alpha * alpha;

        self.d.resize(m2 + 1, 0.0);
        self.g.resize(m2 + 1, 0.0);
        let (d, g) = (&mut self.d[..=m2], &mut self.g[..=m2]);
        g.fill(0.0);

        for &value in input.iter().rev() {
            d[0] = g[0];
            g[0] = if accumulate_first {
                value + alpha * d[0]
            } else {
                value
            };
            if m2 >= 1 {
                d[1] = g[1];
                g[1] = aa * d[0] + alpha * d[1];
            }
            for j in 2..=m2 {
                d[j] = g[j];
                g[j] = d[j - 1] + alpha * (d[j] - g[j - 1]);
            }
        }

        &self.g[..=m2]
    }
}

/// [`AllPassWarp::freqt`] into a new vector.
pub fn freqt(c: &[f64], m2: usize, alpha: f64) -> Vec<f64> {
    AllPassWarp::new(alpha).freqt(c, m2).to_vec()
}

/// [`AllPassWarp::b2c`] into a new vector.
pub fn b2c(b: &[f64], m2: usize, alpha: f64) -> Vec<f64> {
    AllPassWarp::new(alpha).b2c(b, m2).to_vec()
}
