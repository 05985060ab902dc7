//! Cell value types

use num_traits::{NumCast, Zero};
use std::fmt::Debug;

/// Types that can be stored in a raster cell.
///
/// Float cells treat NaN as no-data in addition to any explicit sentinel;
/// integer cells only match their explicit sentinel.
pub trait RasterElement:
    Copy + Debug + PartialOrd + PartialEq + NumCast + Zero + Send + Sync + 'static
{
    /// Sentinel used when a raster has no explicit no-data value
    fn nodata_sentinel() -> Self;

    /// Check if this value represents no-data
    fn is_nodata(&self, nodata: Option<Self>) -> bool;

    /// Convert to f64, `None` if not representable
    fn as_f64(self) -> Option<f64> {
        NumCast::from(self)
    }
}

macro_rules! impl_integer_cell {
    ($($t:ty),*) => {
        $(
            impl RasterElement for $t {
                fn nodata_sentinel() -> Self {
                    <$t>::MAX
                }

                fn is_nodata(&self, nodata: Option<Self>) -> bool {
                    nodata.is_some_and(|nd| *self == nd)
                }
            }
        )*
    };
}

macro_rules! impl_float_cell {
    ($($t:ty),*) => {
        $(
            impl RasterElement for $t {
                fn nodata_sentinel() -> Self {
                    <$t>::NAN
                }

                fn is_nodata(&self, nodata: Option<Self>) -> bool {
                    self.is_nan()
                        || nodata.is_some_and(|nd| (self - nd).abs() < <$t>::EPSILON * 100.0)
                }
            }
        )*
    };
}

impl_integer_cell!(u8, u16, i32);
impl_float_cell!(f32, f64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_nodata() {
        assert!(f64::NAN.is_nodata(None));
        assert!((-9999.0_f64).is_nodata(Some(-9999.0)));
        assert!(!0.0_f64.is_nodata(Some(-9999.0)));
    }

    #[test]
    fn test_integer_nodata() {
        assert!(!255u8.is_nodata(None));
        assert!(255u8.is_nodata(Some(255)));
    }
}
