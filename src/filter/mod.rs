//! Mel log spectrum approximation filters (MLSA and MGLSA).

use serde::{Deserialize, Serialize};

use crate::{
    cepstrum::{CepstrumT, MelCepstrum, MelGeneralizedCepstrum},
    coefficients::{Coefficients, GeneralizedCoefficients},
    generalized::{Generalized, GeneralizedError},
};

use self::{mglsa::MelGeneralizedLogSpectrumApproximation, mlsa::MelLogSpectrumApproximation};

mod mglsa;
mod mlsa;

/// Error in filter configuration or filtering.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FilterError {
    /// Pade approximation is implemented for order 4 and 5 only.
    #[error("order of Pade approximation should be 4 or 5, got {0}")]
    InvalidPadeOrder(usize),
    #[error("all-pass constant must be in (-1, 1), got {0}")]
    InvalidAlpha(f64),
    #[error("interpolation period {iperiod} must be in 1..={fperiod}")]
    InvalidPeriod { fperiod: usize, iperiod: usize },
    #[error("expected {expected} coefficients, got {got}")]
    LengthMismatch { expected: usize, got: usize },
    /// The filter produced a non-finite sample; its memory has been cleared.
    #[error("filter output diverged")]
    Diverged,
    #[error(transparent)]
    Generalized(#[from] GeneralizedError),
}

/// Order of the Pade approximant of `exp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub enum PadeOrder {
    #[default]
    Four,
    Five,
}

impl TryFrom<usize> for PadeOrder {
    type Error = FilterError;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        match value {
            4 => Ok(Self::Four),
            5 => Ok(Self::Five),
            pd => Err(FilterError::InvalidPadeOrder(pd)),
        }
    }
}

impl From<PadeOrder> for usize {
    fn from(value: PadeOrder) -> Self {
        match value {
            PadeOrder::Four => 4,
            PadeOrder::Five => 5,
        }
    }
}

/// Arrangement of the filter memory.
///
/// States of the two layouts are not interchangeable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    #[default]
    Standard,
    Transposed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Excitation to waveform.
    #[default]
    Synthesis,
    /// Waveform to excitation.
    Inverse,
}

/// Settings of a [`LogSpectrumFilter`] session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Order of the mel-(generalized) cepstrum
    order: usize,
    /// All-pass constant
    alpha: f64,
    /// If stage = 0 then gamma = 0 else gamma = -1/stage
    stage: usize,
    /// Order of the Pade approximation (MLSA only)
    pade: PadeOrder,
    layout: Layout,
    direction: Direction,
    /// Filter without applying the gain
    without_gain: bool,
    /// Input is already filter coefficients `b` rather than a mel-cepstrum
    filter_coefficients: bool,
    /// Frame period (point)
    fperiod: usize,
    /// Interpolation period (point)
    iperiod: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            order: 25,
            alpha: 0.35,
            stage: 0,
            pade: PadeOrder::Four,
            layout: Layout::Standard,
            direction: Direction::Synthesis,
            without_gain: false,
            filter_coefficients: false,
            fperiod: 100,
            iperiod: 1,
        }
    }
}

impl FilterConfig {
    /// Set order of the mel-(generalized) cepstrum
    pub fn set_order(&mut self, m: usize) {
        self.order = m;
    }
    pub fn get_order(&self) -> usize {
        self.order
    }

    /// Set all-pass constant, |f| < 1
    pub fn set_alpha(&mut self, f: f64) {
        self.alpha = f;
    }
    pub fn get_alpha(&self) -> f64 {
        self.alpha
    }

    /// Set number of stages; 0 selects MLSA
    pub fn set_stage(&mut self, i: usize) {
        self.stage = i;
    }
    pub fn get_stage(&self) -> usize {
        self.stage
    }

    /// Gamma implied by the number of stages
    pub fn get_gamma(&self) -> f64 {
        if self.stage == 0 {
            0.0
        } else {
            -1.0 / self.stage as f64
        }
    }

    /// Set stage from gamma. Returns `false` (and leaves the stage untouched) unless
    /// `gamma == -1/n` for some natural `n`, or `gamma == 0`.
    pub fn set_gamma(&mut self, gamma: f64) -> bool {
        if gamma == 0.0 {
            self.stage = 0;
            return true;
        }
        if !(-1.0..0.0).contains(&gamma) {
            return false;
        }
        let stage = (-1.0 / gamma).round();
        if approx::relative_eq!(-1.0 / stage, gamma, max_relative = 1.0e-9) {
            self.stage = stage as usize;
            true
        } else {
            false
        }
    }

    pub fn set_pade(&mut self, pade: PadeOrder) {
        self.pade = pade;
    }
    pub fn get_pade(&self) -> PadeOrder {
        self.pade
    }

    pub fn set_layout(&mut self, layout: Layout) {
        self.layout = layout;
    }
    pub fn get_layout(&self) -> Layout {
        self.layout
    }

    pub fn set_direction(&mut self, direction: Direction) {
        self.direction = direction;
    }
    pub fn get_direction(&self) -> Direction {
        self.direction
    }

    /// Set flag to filter without the gain `exp(b[0])`
    pub fn set_without_gain(&mut self, b: bool) {
        self.without_gain = b;
    }
    pub fn get_without_gain(&self) -> bool {
        self.without_gain
    }

    /// Set flag for input given as filter coefficients
    pub fn set_filter_coefficients(&mut self, b: bool) {
        self.filter_coefficients = b;
    }
    pub fn get_filter_coefficients(&self) -> bool {
        self.filter_coefficients
    }

    /// Set frame period (point), 1 <= i; checked when a session is created
    pub fn set_fperiod(&mut self, i: usize) {
        self.fperiod = i;
    }
    pub fn get_fperiod(&self) -> usize {
        self.fperiod
    }

    /// Set interpolation period (point), 1 <= i <= fperiod; checked when a session is created
    pub fn set_iperiod(&mut self, i: usize) {
        self.iperiod = i;
    }
    pub fn get_iperiod(&self) -> usize {
        self.iperiod
    }

    pub(crate) fn validate(&self) -> Result<(), FilterError> {
        if !(self.alpha.abs() < 1.0) {
            return Err(FilterError::InvalidAlpha(self.alpha));
        }
        if self.fperiod == 0 || self.iperiod == 0 || self.iperiod > self.fperiod {
            return Err(FilterError::InvalidPeriod {
                fperiod: self.fperiod,
                iperiod: self.iperiod,
            });
        }
        Ok(())
    }
}

/// Pade cascade; `MelLogSpectrumApproximation<N>` has `N == pd + 1`.
#[derive(Debug, Clone)]
enum Cascade {
    Four(MelLogSpectrumApproximation<5>),
    Five(MelLogSpectrumApproximation<6>),
}

/// One session holds exactly one variant for its whole life, so the size difference is not boxed away.
#[derive(Debug, Clone)]
#[allow(clippy::large_enum_variant)]
enum Stage {
    NonZero {
        gamma: f64,
        filter: MelGeneralizedLogSpectrumApproximation,
    },
    Zero(Cascade),
}

impl Stage {
    fn new(config: &FilterConfig) -> Self {
        let m = config.order;
        if config.stage == 0 {
            Self::Zero(match config.pade {
                PadeOrder::Four => Cascade::Four(MelLogSpectrumApproximation::new(m, config.layout)),
                PadeOrder::Five => Cascade::Five(MelLogSpectrumApproximation::new(m, config.layout)),
            })
        } else {
            Self::NonZero {
                gamma: config.get_gamma(),
                filter: MelGeneralizedLogSpectrumApproximation::new(
                    config.stage,
                    m,
                    config.layout,
                    config.direction,
                ),
            }
        }
    }
}

/// One filter session: the delay line of a single stream.
///
/// Frame coefficients are first converted with [`LogSpectrumFilter::coefficients`], then fed
/// sample by sample to [`LogSpectrumFilter::filter`].
#[derive(Debug, Clone)]
pub struct LogSpectrumFilter {
    config: FilterConfig,
    stage: Stage,
}

impl LogSpectrumFilter {
    pub fn new(config: &FilterConfig) -> Result<Self, FilterError> {
        config.validate()?;
        Ok(Self {
            config: config.clone(),
            stage: Stage::new(config),
        })
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    /// Clear the filter memory.
    pub fn reset(&mut self) {
        match &mut self.stage {
            Stage::Zero(Cascade::Four(filter)) => filter.reset(),
            Stage::Zero(Cascade::Five(filter)) => filter.reset(),
            Stage::NonZero { filter, .. } => filter.reset(),
        }
    }

    /// Convert one frame of mel-(generalized) cepstrum (or filter coefficients) into the
    /// coefficients this session filters with.
    ///
    /// - MLSA: `b`, negated for the inverse filter
    /// - MGLSA: `(ln K, gamma b'[1], ..., gamma b'[m])`
    pub fn coefficients(&self, c: &[f64]) -> Result<Vec<f64>, FilterError> {
        let expected = self.config.order + 1;
        if c.len() != expected {
            return Err(FilterError::LengthMismatch {
                expected,
                got: c.len(),
            });
        }

        let FilterConfig {
            alpha,
            filter_coefficients,
            direction,
            without_gain,
            ..
        } = self.config;

        match &self.stage {
            Stage::Zero(_) => {
                let mut b = if filter_coefficients {
                    Coefficients::new(c)
                } else {
                    MelCepstrum::new(c, alpha).mc2b()
                };
                if direction == Direction::Inverse {
                    b.iter_mut().for_each(|bi| *bi = -*bi);
                    if without_gain {
                        b[0] = 0.0;
                    }
                }
                Ok(b.to_vec())
            }
            Stage::NonZero { gamma, .. } => {
                let b = if filter_coefficients {
                    GeneralizedCoefficients::new(c, *gamma)
                } else {
                    MelGeneralizedCepstrum::new(c, alpha, *gamma).mc2b()
                };
                let mut b = b.gnorm()?;
                if b[0] <= 0.0 {
                    return Err(GeneralizedError::NonPositiveGain { gain: b[0] }.into());
                }
                b[0] = b[0].ln();
                for bi in &mut b[1..] {
                    *bi *= gamma;
                }
                Ok(b.to_vec())
            }
        }
    }

    /// Filter one sample with coefficients from [`LogSpectrumFilter::coefficients`].
    ///
    /// `b.len() == order + 1`; other lengths may panic.
    #[inline]
    pub fn filter(&mut self, mut x: f64, b: &[f64]) -> f64 {
        debug_assert_eq!(b.len(), self.config.order + 1, "coefficients of a wrong order");
        let alpha = self.config.alpha;
        if !self.config.without_gain {
            match (&self.stage, self.config.direction) {
                (Stage::NonZero { .. }, Direction::Inverse) => x /= b[0].exp(),
                _ => x *= b[0].exp(),
            }
        }
        match &mut self.stage {
            Stage::Zero(Cascade::Four(filter)) => filter.df(x, alpha, b),
            Stage::Zero(Cascade::Five(filter)) => filter.df(x, alpha, b),
            Stage::NonZero { filter, .. } => filter.df(x, alpha, b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Direction, FilterConfig, FilterError, Layout, LogSpectrumFilter, PadeOrder};

    fn config(order: usize, stage: usize) -> FilterConfig {
        let mut config = FilterConfig::default();
        config.set_order(order);
        config.set_stage(stage);
        config.set_alpha(0.42);
        config
    }

    fn signal() -> Vec<f64> {
        (0..400)
            .map(|k| (0.21 * k as f64).sin() + 0.3 * (1.3 * k as f64).cos())
            .collect()
    }

    #[test]
    fn pade_order() {
        assert_eq!(PadeOrder::try_from(4), Ok(PadeOrder::Four));
        assert_eq!(PadeOrder::try_from(5), Ok(PadeOrder::Five));
        assert_eq!(PadeOrder::try_from(6), Err(FilterError::InvalidPadeOrder(6)));
        assert_eq!(usize::from(PadeOrder::Five), 5);
    }

    #[test]
    fn gamma_to_stage() {
        let mut config = FilterConfig::default();
        assert!(config.set_gamma(-0.25));
        assert_eq!(config.get_stage(), 4);
        assert!(config.set_gamma(-1.0 / 3.0));
        assert_eq!(config.get_stage(), 3);
        assert!(!config.set_gamma(-0.3));
        assert_eq!(config.get_stage(), 3);
        assert!(!config.set_gamma(0.5));
        assert!(config.set_gamma(0.0));
        assert_eq!(config.get_gamma(), 0.0);
    }

    #[test]
    fn rejects_invalid_config() {
        let mut config = config(4, 0);
        config.set_alpha(1.0);
        assert!(matches!(
            LogSpectrumFilter::new(&config),
            Err(FilterError::InvalidAlpha(_))
        ));

        let mut config = self::config(4, 0);
        config.set_fperiod(10);
        config.set_iperiod(11);
        assert_eq!(
            LogSpectrumFilter::new(&config).unwrap_err(),
            FilterError::InvalidPeriod {
                fperiod: 10,
                iperiod: 11
            }
        );

        config.set_iperiod(0);
        assert_eq!(
            LogSpectrumFilter::new(&config).unwrap_err(),
            FilterError::InvalidPeriod {
                fperiod: 10,
                iperiod: 0
            }
        );

        config.set_fperiod(0);
        config.set_iperiod(1);
        assert_eq!(
            LogSpectrumFilter::new(&config).unwrap_err(),
            FilterError::InvalidPeriod {
                fperiod: 0,
                iperiod: 1
            }
        );
    }

    #[test]
    fn rejects_wrong_frame_length() {
        let filter = LogSpectrumFilter::new(&config(4, 0)).unwrap();
        assert_eq!(
            filter.coefficients(&[0.0; 3]),
            Err(FilterError::LengthMismatch {
                expected: 5,
                got: 3
            })
        );
    }

    #[test]
    fn mlsa_applies_gain() {
        let filter_config = config(3, 0);
        let mut filter = LogSpectrumFilter::new(&filter_config).unwrap();
        let b = filter.coefficients(&[0.5, 0.0, 0.0, 0.0]).unwrap();
        assert_eq!(b, vec![0.5, 0.0, 0.0, 0.0]);
        approx::assert_abs_diff_eq!(filter.filter(2.0, &b), 2.0 * 0.5f64.exp(), epsilon = 1.0e-12);
        approx::assert_abs_diff_eq!(filter.filter(0.0, &b), 0.0);
    }

    #[test]
    fn mglsa_inverse_restores_input() {
        let c = [0.3, 0.2, -0.1, 0.05, 0.02];
        for layout in [Layout::Standard, Layout::Transposed] {
            let mut synthesis = config(4, 2);
            synthesis.set_layout(layout);
            let mut inverse = synthesis.clone();
            inverse.set_direction(Direction::Inverse);

            let mut forward = LogSpectrumFilter::new(&synthesis).unwrap();
            let mut backward = LogSpectrumFilter::new(&inverse).unwrap();
            let bf = forward.coefficients(&c).unwrap();
            let bb = backward.coefficients(&c).unwrap();
            assert_eq!(bf, bb);

            for x in signal() {
                let y = forward.filter(x, &bf);
                approx::assert_abs_diff_eq!(backward.filter(y, &bb), x, epsilon = 1.0e-9);
            }
        }
    }

    #[test]
    fn mlsa_inverse_approximately_restores_input() {
        let c = [0.3, 0.2, -0.1, 0.05, 0.02];
        let mut synthesis = config(4, 0);
        synthesis.set_pade(PadeOrder::Five);
        let mut inverse = synthesis.clone();
        inverse.set_direction(Direction::Inverse);

        let mut forward = LogSpectrumFilter::new(&synthesis).unwrap();
        let mut backward = LogSpectrumFilter::new(&inverse).unwrap();
        let bf = forward.coefficients(&c).unwrap();
        let bb = backward.coefficients(&c).unwrap();
        for (f, b) in bf.iter().zip(&bb) {
            assert_eq!(*f, -*b);
        }

        let x = signal();
        let restored: Vec<f64> = x
            .iter()
            .map(|&x| {
                let y = forward.filter(x, &bf);
                backward.filter(y, &bb)
            })
            .collect();
        let error: f64 = x.iter().zip(&restored).map(|(a, b)| (a - b).powi(2)).sum();
        let energy: f64 = x.iter().map(|a| a * a).sum();
        assert!(error < 1.0e-4 * energy);
    }

    #[test]
    fn inverse_without_gain_drops_gain() {
        let mut config = config(2, 0);
        config.set_direction(Direction::Inverse);
        config.set_without_gain(true);
        config.set_filter_coefficients(true);
        let filter = LogSpectrumFilter::new(&config).unwrap();
        assert_eq!(filter.coefficients(&[1.0, 0.5, -0.25]).unwrap(), vec![0.0, -0.5, 0.25]);
    }

    #[test]
    fn mglsa_coefficients() {
        // alpha = 0 skips warping; gamma = -1: K = 1 / (1 - c0), b' = c / (1 - c0)
        let mut config = FilterConfig::default();
        config.set_order(2);
        config.set_alpha(0.0);
        config.set_stage(1);
        let filter = LogSpectrumFilter::new(&config).unwrap();
        let b = filter.coefficients(&[0.5, 0.2, -0.4]).unwrap();
        approx::assert_abs_diff_eq!(b[0], 2.0f64.ln(), epsilon = 1.0e-12);
        approx::assert_abs_diff_eq!(b[1], -0.4, epsilon = 1.0e-12);
        approx::assert_abs_diff_eq!(b[2], 0.8, epsilon = 1.0e-12);
    }

    #[test]
    fn filter_coefficient_input_skips_warping() {
        let c = [0.3, 0.2, -0.1, 0.05, 0.02];
        let mut b = c;
        crate::allpass::mc2b(&mut b, 0.42);
        for stage in [0, 1, 3] {
            let mcep_config = config(4, stage);
            let mut coef_config = mcep_config.clone();
            coef_config.set_filter_coefficients(true);

            let from_mcep = LogSpectrumFilter::new(&mcep_config)
                .unwrap()
                .coefficients(&c)
                .unwrap();
            let from_coef = LogSpectrumFilter::new(&coef_config)
                .unwrap()
                .coefficients(&b)
                .unwrap();
            assert_eq!(from_mcep, from_coef);
        }
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "coefficients of a wrong order")]
    fn filter_rejects_wrong_order() {
        let mut filter = LogSpectrumFilter::new(&config(4, 0)).unwrap();
        filter.filter(1.0, &[0.0; 6]);
    }

    #[test]
    fn reset_clears_memory() {
        let mut filter = LogSpectrumFilter::new(&config(4, 0)).unwrap();
        let b = filter.coefficients(&[0.0, 0.4, -0.2, 0.1, 0.05]).unwrap();
        let first: Vec<f64> = signal().iter().map(|&x| filter.filter(x, &b)).collect();
        filter.reset();
        let second: Vec<f64> = signal().iter().map(|&x| filter.filter(x, &b)).collect();
        assert_eq!(first, second);
    }
}
