#[cfg(target_arch = "x86_64")]
use std::arch::x86_64::{
    _mm256_add_pd, _mm256_loadu_pd, _mm256_max_pd, _mm256_min_pd, _mm256_set1_pd,
    _mm256_setzero_pd, _mm256_storeu_pd,
};

/// Minimum, maximum and sum of a slice of floats.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    pub min: f64,
    pub max: f64,
    pub sum: f64,
}

/// Reduces `values` in one pass, using AVX2 when the CPU has it.
///
/// Returns `None` for an empty slice. Values are expected to be finite.
pub fn extent_f64(values: &[f64]) -> Option<Extent> {
    if values.is_empty() {
        return None;
    }

    #[cfg(target_arch = "x86_64")]
    {
        if is_x86_feature_detected!("avx2") {
            return Some(unsafe { extent_f64_avx2(values) });
        }
    }

    Some(extent_f64_scalar(values))
}

fn extent_f64_scalar(values: &[f64]) -> Extent {
    values.iter().fold(
        Extent {
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            sum: 0.0,
        },
        |acc, &v| Extent {
            min: acc.min.min(v),
            max: acc.max.max(v),
            sum: acc.sum + v,
        },
    )
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2")]
unsafe fn extent_f64_avx2(values: &[f64]) -> Extent {
    const LANES: usize = 4; // __m256d holds 4 f64s
    let mut sum = _mm256_setzero_pd();
    let mut min = _mm256_set1_pd(f64::INFINITY);
    let mut max = _mm256_set1_pd(f64::NEG_INFINITY);

    let chunks = values.chunks_exact(LANES);
    let remainder = chunks.remainder();

    for chunk in chunks {
        let v = unsafe { _mm256_loadu_pd(chunk.as_ptr()) };
        sum = _mm256_add_pd(sum, v);
        min = _mm256_min_pd(min, v);
        max = _mm256_max_pd(max, v);
    }

    // horizontal reduction
    let mut sum_arr = [0f64; LANES];
    let mut min_arr = [f64::INFINITY; LANES];
    let mut max_arr = [f64::NEG_INFINITY; LANES];
    unsafe { _mm256_storeu_pd(sum_arr.as_mut_ptr(), sum) };
    unsafe { _mm256_storeu_pd(min_arr.as_mut_ptr(), min) };
    unsafe { _mm256_storeu_pd(max_arr.as_mut_ptr(), max) };

    let mut extent = Extent {
        min: min_arr.iter().copied().fold(f64::INFINITY, f64::min),
        max: max_arr.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        sum: sum_arr.iter().sum(),
    };

    for &v in remainder {
        extent.sum += v;
        extent.min = extent.min.min(v);
        extent.max = extent.max.max(v);
    }

    extent
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_has_no_extent() {
        assert_eq!(extent_f64(&[]), None);
    }

    #[test]
    fn test_extent_matches_scalar() {
        // 11 values: two full lanes plus a remainder
        let values: Vec<f64> = (0..11).map(|i| ((i * 37) % 11) as f64 * 1000.0).collect();
        let fast = extent_f64(&values).unwrap();
        let scalar = extent_f64_scalar(&values);

        assert_eq!(fast.min, 0.0);
        assert_eq!(fast.max, 10000.0);
        assert_eq!(fast.min, scalar.min);
        assert_eq!(fast.max, scalar.max);
        assert!((fast.sum - scalar.sum).abs() < 1e-6);
        assert_eq!(scalar.sum, 55000.0);
    }

    #[test]
    fn test_single_value() {
        let e = extent_f64(&[42.5]).unwrap();
        assert_eq!(e, Extent { min: 42.5, max: 42.5, sum: 42.5 });
    }
}
