// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

pub(crate) mod scalar {
    /// Divide by 255 with rounding to nearest.
    ///
    /// This is exact for every product of two 8-bit values, i.e. `div_255(a * b)` is
    /// `round(a * b / 255)` for all `a, b` in `0..=255`. Note that the bias has to be added
    /// before the correction term: `(x + (x >> 8) + 128) >> 8` is off by one for
    /// 24 of those products.
    #[inline(always)]
    pub(crate) const fn div_255(val: u32) -> u32 {
        let val = val + 128;
        (val + (val >> 8)) >> 8
    }

    /// Add two 8-bit values, saturating at 255.
    #[inline(always)]
    pub(crate) const fn addus8(a: u32, b: u32) -> u32 {
        let c = a + b;
        if c >> 8 != 0 {
            255
        } else {
            c
        }
    }

    /// Multiply two 8-bit values.
    #[inline(always)]
    pub(crate) const fn mul_255(a: u32, b: u32) -> u32 {
        div_255(a * b)
    }

    #[cfg(test)]
    mod tests {
        use crate::util::scalar::{addus8, div_255, mul_255};

        #[test]
        fn div_255_is_exact_for_products() {
            for a in 0_u32..256 {
                for b in 0_u32..256 {
                    let expected = (f64::from(a * b) / 255.0).round() as u32;
                    assert_eq!(div_255(a * b), expected, "{a} * {b}");
                }
            }
        }

        #[test]
        fn div_255_preserves_multiples() {
            for i in 0_u32..256 {
                assert_eq!(div_255(i * 255), i);
                assert_eq!(mul_255(i, 255), i);
            }
        }

        #[test]
        fn addus8_saturates() {
            assert_eq!(addus8(100, 100), 200);
            assert_eq!(addus8(200, 100), 255);
            assert_eq!(addus8(255, 255), 255);
            assert_eq!(addus8(0, 0), 0);
        }
    }
}
