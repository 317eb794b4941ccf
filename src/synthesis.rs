//! Frame driver for the MLSA/MGLSA filters.

use serde::{Deserialize, Serialize};

use crate::{
    cepstrum::MelCepstrum,
    coefficients::CoefficientsSession,
    filter::{FilterConfig, FilterError, LogSpectrumFilter},
};

/// Which block of samples a frame of coefficients starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    /// Frame `k` starts block `k`, which walks towards frame `k + 1`.
    ///
    /// The first frame only primes the session, so `n` frames give `n - 1` blocks.
    #[default]
    Leading,
    /// Frame `k` ends block `k`, which walks from frame `k - 1`.
    ///
    /// The first block is filtered with the first frame held constant.
    Trailing,
}

/// Filters an excitation (or, inverted, a waveform) frame by frame.
///
/// Each block of `fperiod` samples is filtered with coefficients interpolated between two
/// successive frames; [`Alignment`] decides which block a frame belongs to.
#[derive(Debug, Clone)]
pub struct Synthesizer {
    filter: LogSpectrumFilter,
    alignment: Alignment,
    /// Postfiltering coefficient (MLSA with mel-cepstral input only)
    beta: f64,
    /// is_first := c.is_none()
    c: Option<Vec<f64>>,
}

impl Synthesizer {
    pub fn new(config: &FilterConfig) -> Result<Self, FilterError> {
        Ok(Self {
            filter: LogSpectrumFilter::new(config)?,
            alignment: Alignment::Leading,
            beta: 0.0,
            c: None,
        })
    }

    pub fn config(&self) -> &FilterConfig {
        self.filter.config()
    }

    /// Set which block a frame of coefficients belongs to; takes effect after [`Synthesizer::reset`]
    pub fn set_alignment(&mut self, alignment: Alignment) {
        self.alignment = alignment;
    }
    pub fn get_alignment(&self) -> Alignment {
        self.alignment
    }

    /// Set postfiltering coefficient parameter beta
    pub fn set_beta(&mut self, f: f64) {
        self.beta = f.max(0.0);
    }
    /// Get postfiltering coefficient parameter beta
    pub fn get_beta(&self) -> f64 {
        self.beta
    }

    /// Forget the previous frame and clear the filter memory.
    pub fn reset(&mut self) {
        self.filter.reset();
        self.c = None;
    }

    /// Filter one block of `fperiod` samples up to `frame`.
    ///
    /// With [`Alignment::Leading`], `input` belongs to the frame given in the previous call. The
    /// first call (and the first one after a reset) only stores `frame`, leaves `output`
    /// untouched and returns `Ok(false)`.
    ///
    /// `frame.len() == order + 1`, `input.len() == output.len() == fperiod`
    pub fn synthesize(
        &mut self,
        frame: &[f64],
        input: &[f64],
        output: &mut [f64],
    ) -> Result<bool, FilterError> {
        let fperiod = self.config().get_fperiod();
        let iperiod = self.config().get_iperiod();
        for len in [input.len(), output.len()] {
            if len != fperiod {
                return Err(FilterError::LengthMismatch {
                    expected: fperiod,
                    got: len,
                });
            }
        }

        let cc = self.prepare(frame)?;
        if self.c.is_none() && self.alignment == Alignment::Leading {
            self.c = Some(cc);
            return Ok(false);
        }
        let Self { filter, c, .. } = self;
        let c = c.get_or_insert_with(|| cc.clone());

        let mut session = CoefficientsSession::start(c, &cc, fperiod, iperiod);
        for (x, y) in input.iter().zip(output.iter_mut()) {
            *y = filter.filter(*x, session.current());
            session.advance();
        }
        drop(session);

        if output.iter().any(|y| !y.is_finite()) {
            log::warn!("filter diverged; clearing its memory");
            self.reset();
            return Err(FilterError::Diverged);
        }
        Ok(true)
    }

    fn prepare(&self, frame: &[f64]) -> Result<Vec<f64>, FilterError> {
        let config = self.config();
        if self.beta > 0.0 && config.get_stage() == 0 && !config.get_filter_coefficients() {
            let expected = config.get_order() + 1;
            if frame.len() != expected {
                return Err(FilterError::LengthMismatch {
                    expected,
                    got: frame.len(),
                });
            }
            let mut cepstrum = MelCepstrum::new(frame, config.get_alpha());
            cepstrum.postfilter_mcp(self.beta);
            self.filter.coefficients(&cepstrum)
        } else {
            self.filter.coefficients(frame)
        }
    }
}
