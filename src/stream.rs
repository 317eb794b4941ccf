//! Fixed-size record streams of little-endian floats.
//!
//! One record is one frame: `m + 1` coefficients, a periodogram or a block of samples. A short
//! read at the end of the input ends the stream.

use std::io::{self, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::{Deserialize, Serialize};

/// Width of one value on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Precision {
    #[default]
    F64,
    F32,
}

impl Precision {
    pub fn size(self) -> usize {
        match self {
            Self::F64 => 8,
            Self::F32 => 4,
        }
    }
}

#[derive(Debug)]
pub struct FrameReader<R> {
    inner: R,
    precision: Precision,
    narrow: Vec<f32>,
}

impl<R: Read> FrameReader<R> {
    pub fn new(inner: R, precision: Precision) -> Self {
        Self {
            inner,
            precision,
            narrow: Vec::new(),
        }
    }

    /// Fill `frame` with the next record.
    ///
    /// Returns `Ok(false)` when the input ends before a whole record was read; the contents of
    /// `frame` are unspecified in that case.
    pub fn read_frame(&mut self, frame: &mut [f64]) -> io::Result<bool> {
        let result = match self.precision {
            Precision::F64 => self.inner.read_f64_into::<LittleEndian>(frame),
            Precision::F32 => {
                self.narrow.resize(frame.len(), 0.0);
                self.inner
                    .read_f32_into::<LittleEndian>(&mut self.narrow)
                    .map(|()| {
                        for (x, v) in frame.iter_mut().zip(&self.narrow) {
                            *x = f64::from(*v);
                        }
                    })
            }
        };
        match result {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Read records of `len` values until the input ends.
    pub fn frames(mut self, len: usize) -> impl Iterator<Item = io::Result<Vec<f64>>> {
        std::iter::from_fn(move || {
            let mut frame = vec![0.0; len];
            match self.read_frame(&mut frame) {
                Ok(true) => Some(Ok(frame)),
                Ok(false) => None,
                Err(e) => Some(Err(e)),
            }
        })
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

#[derive(Debug)]
pub struct FrameWriter<W> {
    inner: W,
    precision: Precision,
}

impl<W: Write> FrameWriter<W> {
    pub fn new(inner: W, precision: Precision) -> Self {
        Self { inner, precision }
    }

    pub fn write_frame(&mut self, frame: &[f64]) -> io::Result<()> {
        for &x in frame {
            match self.precision {
                Precision::F64 => self.inner.write_f64::<LittleEndian>(x)?,
                Precision::F32 => self.inner.write_f32::<LittleEndian>(x as f32)?,
            }
        }
        Ok(())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}
