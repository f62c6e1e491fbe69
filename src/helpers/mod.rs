pub mod simd_helpers;
