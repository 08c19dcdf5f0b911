//! Feature extraction from a spectrum frame
//!
//! Dominant frequency plus average dB per configured band. Pure functions,
//! deterministic for a given frame.

pub mod bands;

pub use bands::{band_energies, band_energy_db, BandDefinition, BandEnergies, BandEnergy};

use crate::spectrum::SpectrumFrame;

/// Features derived from one block
#[derive(Debug, Clone, PartialEq)]
pub struct Features {
    /// Frequency of the strongest bin in Hz
    pub dominant_frequency_hz: f64,

    /// Average dB per resolvable band
    pub band_energies_db: BandEnergies,
}

/// Index of the maximum-power bin; the lowest index wins ties
///
/// An empty or all-silent frame resolves to bin 0.
pub fn dominant_bin(frame: &SpectrumFrame) -> usize {
    let mut best = 0;
    let mut best_power = f64::NEG_INFINITY;

    for (i, &p) in frame.power.iter().enumerate() {
        if p > best_power {
            best = i;
            best_power = p;
        }
    }

    best
}

/// Dominant frequency in Hz, `binIndex * sampleRate / N`
pub fn dominant_frequency_hz(frame: &SpectrumFrame) -> f64 {
    if !(frame.sample_rate.is_finite() && frame.sample_rate > 0.0) || frame.fft_size == 0 {
        return 0.0;
    }
    frame.bin_to_hz(dominant_bin(frame))
}

/// Extract dominant frequency and band energies from a frame
pub fn extract(frame: &SpectrumFrame, bands: &[BandDefinition]) -> Features {
    Features {
        dominant_frequency_hz: dominant_frequency_hz(frame),
        band_energies_db: band_energies(frame, bands),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectrum::{transform, DB_FLOOR};
    use crate::spectrum::windowing::apply_window;
    use std::f64::consts::PI;

    fn sine(freq_hz: f64, sample_rate: f64, n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| (2.0 * PI * freq_hz * i as f64 / sample_rate).sin())
            .collect()
    }

    fn spectrum_of(samples: &[f64], sample_rate: f64) -> SpectrumFrame {
        let windowed = apply_window(samples).unwrap();
        transform(&windowed, sample_rate).unwrap()
    }

    #[test]
    fn test_dominant_frequency_within_one_bin() {
        let cases = [
            (44100.0, 1024, 260.0),
            (44100.0, 1024, 440.0),
            (44100.0, 1024, 900.0),
            (44100.0, 4096, 3333.0),
            (48000.0, 2048, 1000.0),
            (8000.0, 256, 1234.5),
            (16000.0, 512, 7000.0),
        ];

        for (sample_rate, n, freq) in cases {
            let frame = spectrum_of(&sine(freq, sample_rate, n), sample_rate);
            let features = extract(&frame, &[]);

            assert!(
                (features.dominant_frequency_hz - freq).abs() <= frame.bin_width_hz(),
                "{} Hz at {}/{}: got {}",
                freq,
                sample_rate,
                n,
                features.dominant_frequency_hz
            );
        }
    }

    #[test]
    fn test_ties_break_toward_lowest_bin() {
        let frame = SpectrumFrame {
            power: vec![0.1, 0.5, 0.2, 0.5, 0.5],
            power_db: vec![-10.0, -3.0, -7.0, -3.0, -3.0],
            sample_rate: 10.0,
            fft_size: 10,
        };
        assert_eq!(dominant_bin(&frame), 1);
        assert_eq!(dominant_frequency_hz(&frame), 1.0);
    }

    #[test]
    fn test_silence_resolves_to_bin_zero() {
        let frame = spectrum_of(&vec![0.0; 1024], 44100.0);
        let bands = vec![BandDefinition::new("low_hum", 150.0, 250.0)];
        let features = extract(&frame, &bands);

        assert_eq!(features.dominant_frequency_hz, 0.0);
        assert_eq!(features.band_energies_db.get("low_hum"), Some(DB_FLOOR));
    }

    #[test]
    fn test_band_energy_follows_tone() {
        let bands = vec![
            BandDefinition::new("low_hum", 150.0, 250.0),
            BandDefinition::new("piping", 450.0, 500.0),
        ];

        let frame = spectrum_of(&sine(200.0, 44100.0, 1024), 44100.0);
        let energies = extract(&frame, &bands).band_energies_db;

        let low = energies.get("low_hum").unwrap();
        let piping = energies.get("piping").unwrap();
        assert!(low > piping + 20.0, "low_hum {} vs piping {}", low, piping);
    }

    #[test]
    fn test_invalid_frame_sample_rate_is_guarded() {
        let frame = SpectrumFrame {
            power: vec![0.0, 1.0],
            power_db: vec![DB_FLOOR, 0.0],
            sample_rate: 0.0,
            fft_size: 4,
        };
        let features = extract(&frame, &[BandDefinition::new("b", 0.0, 1.0)]);

        assert_eq!(features.dominant_frequency_hz, 0.0);
        assert!(features.band_energies_db.is_empty());
    }
}
