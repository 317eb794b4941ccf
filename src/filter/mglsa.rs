use super::{Direction, Layout};

/// Mel generalized log spectrum approximation filter.
///
/// `n` cascaded all-pole (or, inverted, all-zero) warped sections realize `(1 + gamma H(z))^(1/gamma)`
/// with `gamma = -1/n`. Coefficients are `gamma * b'` where `b'` is gain-normalized.
#[derive(Debug, Clone)]
pub struct MelGeneralizedLogSpectrumApproximation {
    layout: Layout,
    direction: Direction,
    d: Vec<Vec<f64>>,
}

impl MelGeneralizedLogSpectrumApproximation {
    /// `n`: number of stages, `m`: order of the coefficients
    pub fn new(n: usize, m: usize, layout: Layout, direction: Direction) -> Self {
        Self {
            layout,
            direction,
            d: vec![vec![0.0; m + 1]; n],
        }
    }

    pub fn reset(&mut self) {
        self.d.iter_mut().for_each(|d| d.fill(0.0));
    }

    /// `b.len() == m + 1`; `b[0]` is not used here.
    #[inline(always)]
    pub fn df(&mut self, mut x: f64, alpha: f64, b: &[f64]) -> f64 {
        if b.len() < 2 {
            return x;
        }
        for d in &mut self.d {
            x = match (self.layout, self.direction) {
                (Layout::Standard, Direction::Synthesis) => dff(d, x, alpha, b),
                (Layout::Standard, Direction::Inverse) => idff(d, x, alpha, b),
                (Layout::Transposed, Direction::Synthesis) => dff_transposed(d, x, alpha, b),
                (Layout::Transposed, Direction::Inverse) => idff_transposed(d, x, alpha, b),
            };
        }
        x
    }
}

/// Feedback sum of one section; shifts the delay line by one sample.
#[inline(always)]
fn feedback(d: &mut [f64], alpha: f64, b: &[f64]) -> f64 {
    let m = b.len() - 1;
    let mut y = d[0] * b[1];
    for i in 1..m {
        d[i] += alpha * (d[i + 1] - d[i - 1]);
        y += d[i] * b[i + 1];
    }
    d.copy_within(0..m, 1);
    y
}

#[inline(always)]
fn dff(d: &mut [f64], x: f64, alpha: f64, b: &[f64]) -> f64 {
    let x = x - feedback(d, alpha, b);
    d[0] = alpha * d[0] + (1.0 - alpha * alpha) * x;
    x
}

#[inline(always)]
fn idff(d: &mut [f64], x: f64, alpha: f64, b: &[f64]) -> f64 {
    let y = x + feedback(d, alpha, b);
    d[0] = alpha * d[0] + (1.0 - alpha * alpha) * x;
    y
}

/// Feeds `x` into the transposed delay line and shifts it.
#[inline(always)]
fn feed_transposed(d: &mut [f64], x: f64, alpha: f64, b: &[f64]) {
    let m = b.len() - 1;
    d[m] = b[m] * x + alpha * d[m - 1];
    for i in (1..m).rev() {
        d[i] += b[i] * x + alpha * (d[i - 1] - d[i + 1]);
    }
    d.copy_within(1..=m, 0);
}

#[inline(always)]
fn dff_transposed(d: &mut [f64], x: f64, alpha: f64, b: &[f64]) -> f64 {
    let x = x - d[0] * (1.0 - alpha * alpha);
    feed_transposed(d, x, alpha, b);
    x
}

#[inline(always)]
fn idff_transposed(d: &mut [f64], x: f64, alpha: f64, b: &[f64]) -> f64 {
    let y = x + d[0] * (1.0 - alpha * alpha);
    feed_transposed(d, x, alpha, b);
    y
}

#[cfg(test)]
mod tests {
    use crate::filter::{Direction, Layout};

    use super::MelGeneralizedLogSpectrumApproximation;

    fn run(n: usize, b: &[f64], alpha: f64, layout: Layout, direction: Direction, x: &[f64]) -> Vec<f64> {
        let mut filter = MelGeneralizedLogSpectrumApproximation::new(n, b.len() - 1, layout, direction);
        x.iter().map(|&x| filter.df(x, alpha, b)).collect()
    }

    fn signal() -> Vec<f64> {
        (0..200)
            .map(|k| (0.3 * k as f64).sin() + 0.5 * (1.7 * k as f64).cos())
            .collect()
    }

    #[test]
    fn single_pole() {
        // 1 / (1 + 0.5 z^-1)
        let mut impulse = [0.0; 10];
        impulse[0] = 1.0;
        for layout in [Layout::Standard, Layout::Transposed] {
            let y = run(1, &[0.0, 0.5], 0.0, layout, Direction::Synthesis, &impulse);
            for (n, v) in y.iter().enumerate() {
                approx::assert_abs_diff_eq!(*v, (-0.5f64).powi(n as i32), epsilon = 1.0e-12);
            }
        }
    }

    #[test]
    fn stages_cascade() {
        // 1 / (1 - 0.5 z^-1)^2
        let mut impulse = [0.0; 10];
        impulse[0] = 1.0;
        let y = run(2, &[0.0, -0.5], 0.0, Layout::Standard, Direction::Synthesis, &impulse);
        for (n, v) in y.iter().enumerate() {
            let expected = (n + 1) as f64 * 0.5f64.powi(n as i32);
            approx::assert_abs_diff_eq!(*v, expected, epsilon = 1.0e-12);
        }
    }

    #[test]
    fn inverse_restores_input() {
        let b = [0.0, -0.2, 0.1, -0.05, 0.02];
        let x = signal();
        for n in [1, 2, 4] {
            for layout in [Layout::Standard, Layout::Transposed] {
                let y = run(n, &b, 0.35, layout, Direction::Synthesis, &x);
                let z = run(n, &b, 0.35, layout, Direction::Inverse, &y);
                for (a, b) in x.iter().zip(&z) {
                    approx::assert_abs_diff_eq!(a, b, epsilon = 1.0e-12);
                }
            }
        }
    }

    #[test]
    fn layouts_agree() {
        let b = [0.0, -0.2, 0.1, -0.05, 0.02];
        let x = signal();
        let standard = run(3, &b, 0.35, Layout::Standard, Direction::Synthesis, &x);
        let transposed = run(3, &b, 0.35, Layout::Transposed, Direction::Synthesis, &x);
        for (s, t) in standard.iter().zip(&transposed) {
            approx::assert_abs_diff_eq!(s, t, epsilon = 1.0e-12);
        }
    }

    #[test]
    fn gain_only_is_identity() {
        let x = signal();
        let y = run(2, &[0.3], 0.35, Layout::Standard, Direction::Synthesis, &x);
        assert_eq!(x, y);
    }
}
