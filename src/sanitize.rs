//! Exit-point sanitising of report values
//!
//! Any value that can be undefined (a statistic on degenerate input, an
//! effect size with zero spread, a power estimate for a vanishing effect) is
//! carried as `Option<f64>`. Before a report leaves the engine, every such
//! value that is NaN or infinite is replaced by `None`, so serialized output
//! never contains non-finite numbers. Finite values pass through untouched.

/// Replace non-finite floating values with `None`, recursively
pub trait Sanitize {
    fn sanitize(&mut self);
}

impl Sanitize for Option<f64> {
    fn sanitize(&mut self) {
        if matches!(self, Some(v) if !v.is_finite()) {
            *self = None;
        }
    }
}

impl<T: Sanitize> Sanitize for Vec<T> {
    fn sanitize(&mut self) {
        for item in self.iter_mut() {
            item.sanitize();
        }
    }
}

/// Implements [`Sanitize`] for structs whose nested values are listed
///
/// Listed fields must themselves implement `Sanitize`. Nested struct fields
/// should be listed as `Option<T>` via the `opt` group.
#[macro_export]
macro_rules! impl_sanitize {
    ($ty:ty { $($field:ident),* $(,)? } $(opt { $($nested:ident),* $(,)? })?) => {
        impl $crate::sanitize::Sanitize for $ty {
            fn sanitize(&mut self) {
                $( $crate::sanitize::Sanitize::sanitize(&mut self.$field); )*
                $($(
                    if let Some(inner) = self.$nested.as_mut() {
                        $crate::sanitize::Sanitize::sanitize(inner);
                    }
                )*)?
            }
        }
    };
}
