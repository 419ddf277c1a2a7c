//! Feature vectors from a spectrum
//!
//! Each spectrum is first shifted so its strongest low partial sits at
//! +100 dB (negative values clamp to 0). From that we read:
//! - seven peak levels, every 6th bin starting at bin 6
//! - per frequency band and amplitude threshold, how many of the band's
//!   stride-6 bins exceed the threshold
//!
//! The resulting matrix is z-scored column by column before embedding.

/// Spacing between sampled bins.
pub const STRIDE: usize = 6;

/// Number of peak features.
pub const PEAK_COUNT: usize = 7;

/// Bins whose maximum defines the reference level.
pub const REFERENCE_BINS: [usize; 3] = [6, 12, 18];

/// Level the reference is moved to.
pub const REFERENCE_LEVEL: f64 = 100.0;

/// Lower edges of the counted bands. The last band runs to the end.
pub const BAND_EDGES_HZ: [f64; 7] = [500.0, 1000.0, 2000.0, 3000.0, 4000.0, 6000.0, 10000.0];

/// Amplitude thresholds, compared with strict `>`.
pub const THRESHOLDS_DB: [f64; 13] = [
    0.0, 10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 80.0, 90.0, 100.0, 110.0, 120.0,
];

pub const FEATURE_COUNT: usize = PEAK_COUNT + BAND_EDGES_HZ.len() * THRESHOLDS_DB.len();

/// Shortest spectrum the peak features can be read from.
pub const MIN_BINS: usize = STRIDE * PEAK_COUNT + 1;

pub fn feature_names() -> Vec<String> {
    let mut names: Vec<String> = (0..PEAK_COUNT).map(|i| format!("peak_{}", i)).collect();
    for edge in BAND_EDGES_HZ {
        for threshold in THRESHOLDS_DB {
            names.push(format!("count_{}_{}", edge as u32, threshold as u32));
        }
    }
    names
}

/// Shift the spectrum so the loudest reference bin reads `REFERENCE_LEVEL`,
/// clamping everything below zero.
pub fn normalize_to_peaks(powers: &[f64]) -> Vec<f64> {
    let reference = REFERENCE_BINS
        .iter()
        .filter_map(|&i| powers.get(i).copied())
        .fold(f64::NEG_INFINITY, f64::max);
    if !reference.is_finite() {
        return powers.iter().map(|p| p.max(0.0)).collect();
    }
    powers
        .iter()
        .map(|p| (p - reference + REFERENCE_LEVEL).max(0.0))
        .collect()
}

/// Index of the first bin at or above each band edge. An edge above the
/// highest frequency yields `frequencies.len()`, an empty band.
pub fn band_starts(frequencies: &[f64]) -> [usize; 7] {
    let mut starts = [frequencies.len(); 7];
    for (slot, edge) in starts.iter_mut().zip(BAND_EDGES_HZ) {
        if let Some(idx) = frequencies.iter().position(|&f| f >= edge) {
            *slot = idx;
        }
    }
    starts
}

/// Feature vector for one normalized spectrum.
pub fn extract(normalized: &[f64], starts: &[usize; 7]) -> Vec<f64> {
    let mut features = Vec::with_capacity(FEATURE_COUNT);

    for i in 0..PEAK_COUNT {
        features.push(normalized.get(STRIDE * (i + 1)).copied().unwrap_or(0.0));
    }

    for (band, &start) in starts.iter().enumerate() {
        let end = starts
            .get(band + 1)
            .copied()
            .unwrap_or(normalized.len())
            .max(start)
            .min(normalized.len());
        let start = start.min(end);
        let sampled: Vec<f64> = normalized[start..end].iter().step_by(STRIDE).copied().collect();
        for threshold in THRESHOLDS_DB {
            features.push(sampled.iter().filter(|&&v| v > threshold).count() as f64);
        }
    }

    features
}

/// Standardize each column in place: mean 0, population std 1.
/// Constant columns become all zeros.
pub fn zscore_columns(rows: &mut [Vec<f64>]) {
    let Some(width) = rows.first().map(|r| r.len()) else {
        return;
    };
    let n = rows.len() as f64;

    for col in 0..width {
        let mean = rows.iter().map(|r| r[col]).sum::<f64>() / n;
        let variance = rows.iter().map(|r| (r[col] - mean).powi(2)).sum::<f64>() / n;
        let std = variance.sqrt();
        for row in rows.iter_mut() {
            row[col] = if std > 0.0 { (row[col] - mean) / std } else { 0.0 };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn axis(bins: usize, spacing: f64) -> Vec<f64> {
        (1..=bins).map(|i| i as f64 * spacing).collect()
    }

    // ==========================================================================
    // NORMALIZATION
    // ==========================================================================

    #[test]
    fn test_normalize_moves_reference_to_100() {
        let mut powers = vec![-60.0; 50];
        powers[6] = -20.0;
        powers[12] = -10.0;
        powers[18] = -30.0;
        let normalized = normalize_to_peaks(&powers);

        assert_eq!(normalized[12], 100.0);
        assert_eq!(normalized[6], 90.0);
        assert_eq!(normalized[0], 50.0);
    }

    #[test]
    fn test_normalize_clamps_at_zero() {
        let mut powers = vec![-200.0; 50];
        powers[6] = 0.0;
        let normalized = normalize_to_peaks(&powers);
        assert_eq!(normalized[0], 0.0);
        assert!(normalized.iter().all(|&v| v >= 0.0));
    }

    // ==========================================================================
    // FEATURES
    // ==========================================================================

    #[test]
    fn test_feature_names_match_count() {
        let names = feature_names();
        assert_eq!(names.len(), FEATURE_COUNT);
        assert_eq!(names[0], "peak_0");
        assert_eq!(names[PEAK_COUNT], "count_500_0");
        assert_eq!(names.last().unwrap(), "count_10000_120");
    }

    #[test]
    fn test_band_starts_from_axis() {
        // 21.533 Hz spacing, as a 2048-point FFT at 44.1 kHz
        let freqs = axis(1024, 21.533);
        let starts = band_starts(&freqs);
        assert_eq!(starts[0], 23); // 24 * 21.533 = 516.8
        assert!(freqs[starts[0]] >= 500.0 && freqs[starts[0] - 1] < 500.0);
        assert!(starts.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_band_above_axis_is_empty() {
        let freqs = axis(100, 50.0); // tops out at 5000 Hz
        let starts = band_starts(&freqs);
        assert_eq!(starts[5], 100);
        assert_eq!(starts[6], 100);

        let features = extract(&vec![50.0; 100], &starts);
        let last_band = &features[PEAK_COUNT + 6 * THRESHOLDS_DB.len()..];
        assert!(last_band.iter().all(|&c| c == 0.0));
    }

    #[test]
    fn test_extract_peaks_and_counts() {
        let freqs = axis(400, 50.0);
        let starts = band_starts(&freqs);
        // level ramps 0, 1, 2, ...
        let normalized: Vec<f64> = (0..400).map(|i| i as f64).collect();
        let features = extract(&normalized, &starts);

        assert_eq!(features.len(), FEATURE_COUNT);
        assert_eq!(&features[..PEAK_COUNT], &[6.0, 12.0, 18.0, 24.0, 30.0, 36.0, 42.0]);

        // first band: bins 9..19 (500 Hz .. 1000 Hz), sampled at 9 and 15
        assert_eq!(starts[0], 9);
        assert_eq!(starts[1], 19);
        let band0 = &features[PEAK_COUNT..PEAK_COUNT + THRESHOLDS_DB.len()];
        assert_eq!(band0[0], 2.0); // 9 > 0, 15 > 0
        assert_eq!(band0[1], 1.0); // only 15 > 10
        assert_eq!(band0[2], 0.0);
    }

    #[test]
    fn test_threshold_is_strict() {
        let starts = [0, 6, 12, 18, 24, 30, 36];
        let normalized = vec![10.0; 42];
        let features = extract(&normalized, &starts);
        let band0 = &features[PEAK_COUNT..PEAK_COUNT + THRESHOLDS_DB.len()];
        assert_eq!(band0[0], 1.0); // 10 > 0
        assert_eq!(band0[1], 0.0); // 10 > 10 is false
    }

    // ==========================================================================
    // Z-SCORE
    // ==========================================================================

    #[test]
    fn test_zscore_population_std() {
        let mut rows = vec![vec![1.0, 5.0], vec![3.0, 5.0]];
        zscore_columns(&mut rows);
        assert_eq!(rows[0][0], -1.0);
        assert_eq!(rows[1][0], 1.0);
        // constant column
        assert_eq!(rows[0][1], 0.0);
        assert_eq!(rows[1][1], 0.0);
    }

    #[test]
    fn test_zscore_empty_is_noop() {
        let mut rows: Vec<Vec<f64>> = Vec::new();
        zscore_columns(&mut rows);
        assert!(rows.is_empty());
    }
}
