use super::Layout;

const PADE: [f64; 21] = [
    1.00000000000f64,
    1.00000000000f64,
    0.00000000000f64,
    1.00000000000f64,
    0.00000000000f64,
    0.00000000000f64,
    1.00000000000f64,
    0.00000000000f64,
    0.00000000000f64,
    0.00000000000f64,
    1.00000000000f64,
    0.49992730000f64,
    0.10670050000f64,
    0.01170221000f64,
    0.00056562790f64,
    1.00000000000f64,
    0.49993910000f64,
    0.11070980000f64,
    0.01369984000f64,
    0.00095648530f64,
    0.00003041721f64,
];

/// Mel log spectrum approximation filter, `exp(H(z))` realized with a Pade approximant.
///
/// N == pd + 1
#[derive(Debug, Clone)]
pub struct MelLogSpectrumApproximation<const N: usize> {
    layout: Layout,
    ppade: [f64; N],
    d11: [f64; N],
    d12: [f64; N],
    d21: [FirStage; N],
    d22: [f64; N],
}

impl<const N: usize> MelLogSpectrumApproximation<N> {
    /// `m`: order of the coefficients
    pub fn new(m: usize, layout: Layout) -> Self {
        let pade_start = (N - 1) * N / 2;
        Self {
            layout,
            ppade: std::array::from_fn(|i| PADE[pade_start + i]),
            d11: [0.0; N],
            d12: [0.0; N],
            d21: std::array::from_fn(|_| FirStage::new(m)),
            d22: [0.0; N],
        }
    }

    pub fn reset(&mut self) {
        self.d11.fill(0.0);
        self.d12.fill(0.0);
        self.d21.iter_mut().for_each(FirStage::reset);
        self.d22.fill(0.0);
    }

    /// `b.len() == m + 1`; `b[0]` is not used here.
    #[inline(always)]
    pub fn df(&mut self, x: f64, alpha: f64, b: &[f64]) -> f64 {
        let x = self.df1(x, alpha, b);
        self.df2(x, alpha, b)
    }

    /// First-order section on `b[1]`.
    #[inline(always)]
    fn df1(&mut self, mut x: f64, alpha: f64, b: &[f64]) -> f64 {
        let Some(&b1) = b.get(1) else {
            return x;
        };
        let aa = 1.0 - alpha * alpha;
        let mut out = 0.0;
        for i in (1..N).rev() {
            self.d11[i] = aa * self.d12[i - 1] + alpha * self.d11[i];
            self.d12[i] = self.d11[i] * b1;
            let v = self.d12[i] * self.ppade[i];
            x += if i & 1 != 0 { v } else { -v };
            out += v;
        }
        self.d12[0] = x;
        x + out
    }

    /// Warped FIR sections on `b[2..]`.
    #[inline(always)]
    fn df2(&mut self, mut x: f64, alpha: f64, b: &[f64]) -> f64 {
        let mut out = 0.0;
        for i in (1..N).rev() {
            let stage = &mut self.d21[i - 1];
            self.d22[i] = match self.layout {
                Layout::Standard => stage.fir(self.d22[i - 1], alpha, b),
                Layout::Transposed => stage.fir_transposed(self.d22[i - 1], alpha, b),
            };
            let v = self.d22[i] * self.ppade[i];
            x += if i & 1 != 0 { v } else { -v };
            out += v;
        }
        self.d22[0] = x;
        x + out
    }
}

/// Delay line of one warped FIR section, `m + 2` taps.
#[derive(Debug, Clone)]
struct FirStage(Vec<f64>);

impl FirStage {
    fn new(m: usize) -> Self {
        Self(vec![0.0; m + 2])
    }

    fn reset(&mut self) {
        self.0.fill(0.0);
    }

    #[inline(always)]
    fn fir(&mut self, x: f64, alpha: f64, b: &[f64]) -> f64 {
        let d = &mut self.0[..];
        let m = b.len() - 1;
        debug_assert_eq!(d.len(), m + 2);

        let aa = 1.0 - alpha * alpha;
        d[0] = x;
        d[1] = aa * d[0] + alpha * d[1];
        let mut y = 0.0;
        // `prev` carries the updated tap i - 1, `d[i]` keeps it shifted by one sample
        let mut prev = d[1];
        for i in 2..=m {
            let di = d[i] + alpha * (d[i + 1] - prev);
            y += di * b[i];
            d[i] = std::mem::replace(&mut prev, di);
        }
        d[m + 1] = prev;

        y
    }

    #[inline(always)]
    fn fir_transposed(&mut self, x: f64, alpha: f64, b: &[f64]) -> f64 {
        let d = &mut self.0[..];
        let m = b.len() - 1;
        debug_assert_eq!(d.len(), m + 2);
        if m < 2 {
            return 0.0;
        }

        let y = (1.0 - alpha * alpha) * d[0];

        d[m] = b[m] * x + alpha * d[m - 1];
        for i in (2..m).rev() {
            d[i] += b[i] * x + alpha * (d[i - 1] - d[i + 1]);
        }
        d[1] += alpha * (d[0] - d[2]);

        d.copy_within(1..=m, 0);

        y
    }
}
