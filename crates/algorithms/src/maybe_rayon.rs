//! Parallel or sequential iteration behind one name.
//!
//! With the `parallel` feature the overlay and repair loops run on rayon's
//! pool. Without it, `into_par_iter()` falls back to `into_iter()` so the
//! same call sites build single-threaded.
#[cfg(feature = "parallel")]
pub use rayon::prelude::*;

#[cfg(not(feature = "parallel"))]
mod sequential {
    /// Sequential stand-in for `rayon::prelude::IntoParallelIterator`.
    ///
    /// The rest of the chain (`.map()`, `.flat_map()`, `.collect()`)
    /// resolves to the standard `Iterator` methods, which keep input order
    /// just as rayon's indexed collect does.
    pub trait IntoParallelIterator {
        type Iter;
        type Item;
        fn into_par_iter(self) -> Self::Iter;
    }

    impl<I: IntoIterator> IntoParallelIterator for I {
        type Iter = I::IntoIter;
        type Item = I::Item;
        fn into_par_iter(self) -> Self::Iter {
            self.into_iter()
        }
    }
}

#[cfg(not(feature = "parallel"))]
pub use sequential::*;
