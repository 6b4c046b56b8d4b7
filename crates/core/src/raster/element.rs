//! Cell value trait

use num_traits::{NumCast, Zero};
use std::fmt::Debug;

/// Types that can be stored in a raster cell.
///
/// Floating point rasters use NaN as their null marker, so a cell is null
/// either because it is NaN or because it equals the raster's no-data value.
pub trait RasterElement:
    Copy + Debug + PartialOrd + PartialEq + NumCast + Zero + Send + Sync + 'static
{
    /// Marker written into cells that hold no data
    fn null() -> Self;

    /// Whether this value is null given the raster's no-data value
    fn is_null(&self, nodata: Option<Self>) -> bool;

    fn to_f64(self) -> Option<f64> {
        NumCast::from(self)
    }
}

macro_rules! impl_raster_element_int {
    ($t:ty) => {
        impl RasterElement for $t {
            fn null() -> Self {
                <$t>::MIN
            }

            fn is_null(&self, nodata: Option<Self>) -> bool {
                nodata == Some(*self)
            }
        }
    };
}

macro_rules! impl_raster_element_float {
    ($t:ty) => {
        impl RasterElement for $t {
            fn null() -> Self {
                <$t>::NAN
            }

            fn is_null(&self, nodata: Option<Self>) -> bool {
                if self.is_nan() {
                    return true;
                }
                match nodata {
                    Some(nd) => (self - nd).abs() < <$t>::EPSILON * 100.0,
                    None => false,
                }
            }
        }
    };
}

impl_raster_element_int!(i32);
impl_raster_element_int!(u8);
impl_raster_element_float!(f32);
impl_raster_element_float!(f64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_null() {
        assert!(f64::NAN.is_null(None));
        assert!((-9999.0f64).is_null(Some(-9999.0)));
        assert!(!0.0f64.is_null(Some(-9999.0)));
    }

    #[test]
    fn test_int_null() {
        assert!(i32::null().is_null(Some(i32::MIN)));
        assert!(!5i32.is_null(None));
    }
}
