pub use std::ops::{Deref, DerefMut};

/// Coefficient vector of order `m`, stored as `m + 1` values.
pub trait Buffer: Deref<Target = [f64]> + DerefMut {
    /// Order `m`, i.e. the index of the last coefficient.
    fn order(&self) -> usize {
        self.len().saturating_sub(1)
    }
}

macro_rules! deref_buffer {
    ($t:ty) => {
        impl std::ops::Deref for $t {
            type Target = [f64];

            fn deref(&self) -> &Self::Target {
                &self.buffer
            }
        }

        impl std::ops::DerefMut for $t {
            fn deref_mut(&mut self) -> &mut Self::Target {
                &mut self.buffer
            }
        }

        impl $crate::buffer::Buffer for $t {}
    };
}

macro_rules! boxed_slice {
    ($value:expr; $len:expr) => {
        vec![$value; $len].into_boxed_slice()
    };
}

pub(crate) use {boxed_slice, deref_buffer};
