// FallWatch — Feature Normalizer
//
// Maps physical units onto [-1, 1] using the sensor's configured full-scale
// range: ±2 g for the accelerometer, ±250 °/s for the gyroscope.  Anything
// beyond full scale is clamped.

use crate::config::{ACCEL_FULL_SCALE_G, FEATURES, GYRO_FULL_SCALE_DPS};
use crate::error::{PipelineError, Result};

#[inline]
fn clamp_unit(value: f32) -> f32 {
    // `f32::min`/`max` ignore NaN, so a NaN reading saturates to +1.
    (-1.0f32).max(1.0f32.min(value))
}

/// Normalise a single channel value given its position in the flattened window.
#[inline]
pub fn normalize_value(index: usize, value: f32) -> f32 {
    if index % FEATURES < 3 {
        clamp_unit(value / ACCEL_FULL_SCALE_G)
    } else {
        clamp_unit(value / GYRO_FULL_SCALE_DPS)
    }
}

/// Normalise a flattened sequence of feature vectors in place.
///
/// The slice length must be a whole number of feature vectors.
pub fn normalize_in_place(data: &mut [f32]) -> Result<()> {
    if data.len() % FEATURES != 0 {
        return Err(PipelineError::InvalidArgument(format!(
            "input length {} is not a multiple of {}",
            data.len(),
            FEATURES
        )));
    }
    for (i, v) in data.iter_mut().enumerate() {
        *v = normalize_value(i, *v);
    }
    Ok(())
}

/// Pure variant returning new storage.
pub fn normalize<const N: usize>(input: &[f32; N]) -> Result<[f32; N]> {
    let mut out = *input;
    normalize_in_place(&mut out)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scales_accel_and_gyro_channels() {
        let out = normalize(&[1.0, -0.5, 2.0, 125.0, -250.0, 25.0]).expect("normalize");
        assert_eq!(out, [0.5, -0.25, 1.0, 0.5, -1.0, 0.1]);
    }

    #[test]
    fn clamps_out_of_range_spikes() {
        let out = normalize(&[16.0, -3.0, 0.0, 2000.0, -999.0, 0.0, 4.0, 0.0, 0.0, 0.0, 0.0, 300.0])
            .expect("normalize");
        assert_eq!(out, [1.0, -1.0, 0.0, 1.0, -1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn output_always_within_unit_range() {
        let input = [
            f32::MAX,
            f32::MIN,
            f32::INFINITY,
            f32::NEG_INFINITY,
            f32::NAN,
            -0.0,
        ];
        let out = normalize(&input).expect("normalize");
        assert!(out.iter().all(|v| (-1.0..=1.0).contains(v)), "{out:?}");
    }

    #[test]
    fn clamp_stage_is_idempotent() {
        let input: [f32; 12] = [
            0.3, -1.7, 9.81, 12.5, -480.0, 0.0, -0.01, 1.99, -2.01, 249.0, 251.0, -3.3,
        ];
        for v in input {
            assert_eq!(clamp_unit(clamp_unit(v)), clamp_unit(v));
        }

        // A second full pass rescales again but never leaves the range or
        // flips a sign.
        let once = normalize(&input).expect("normalize");
        let twice = normalize(&once).expect("normalize");
        for (a, b) in once.iter().zip(twice.iter()) {
            assert!((-1.0..=1.0).contains(b));
            assert!(a * b >= 0.0);
        }
    }

    #[test]
    fn rejects_partial_feature_vector() {
        let mut data = [0.0f32; 7];
        assert!(matches!(
            normalize_in_place(&mut data),
            Err(PipelineError::InvalidArgument(_))
        ));
    }
}
