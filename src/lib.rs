//! Numerical core of a speech signal processing toolkit.
//!
//! - [`analysis`]: mel-generalized cepstral analysis of periodograms by Newton-Raphson iteration
//! - [`filter`], [`synthesis`]: MLSA and MGLSA filters (and their inverses) driven frame by frame
//! - [`cepstrum`], [`coefficients`], [`generalized`], [`allpass`]: transforms between
//!   mel-generalized cepstra and filter coefficients
//! - [`stability`]: stability check of MLSA filter coefficients
//! - [`stream`]: fixed-size float records used to pass frames between tools
//!
//! Every filter and analyzer is a session value owning its own memory, so independent streams
//! can be processed side by side.

mod buffer;
mod fourier;

pub mod allpass;
pub mod analysis;
pub mod cepstrum;
pub mod coefficients;
pub mod filter;
pub mod generalized;
pub mod stability;
pub mod stream;
pub mod synthesis;

pub use buffer::Buffer;

pub use analysis::{AnalysisConfig, AnalysisError, MgcepAnalyzer};
pub use filter::{FilterConfig, FilterError, LogSpectrumFilter};
pub use stability::{StabilityChecker, StabilityConfig, StabilityError};
pub use synthesis::Synthesizer;
