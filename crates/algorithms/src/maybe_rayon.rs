//! Row iteration that is parallel with the `parallel` feature and sequential
//! without it.
//!
//! Focal statistics call `into_par_iter()` on a row range either way; without
//! rayon the shim below turns that into a plain iterator.

#[cfg(feature = "parallel")]
pub use rayon::prelude::*;

#[cfg(not(feature = "parallel"))]
pub trait IntoParallelIterator: IntoIterator + Sized {
    fn into_par_iter(self) -> Self::IntoIter {
        self.into_iter()
    }
}

#[cfg(not(feature = "parallel"))]
impl<I: IntoIterator> IntoParallelIterator for I {}
