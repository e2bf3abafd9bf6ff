//! Find local maxima (and minima) in a 1D signal and turn them into [`Peak`]s.
//!
//! The detector is deliberately simple: a sample is a peak when it is strictly
//! higher than both neighbors and at least as high as the requested threshold.
//! Endpoints are never peaks. A flat top, a run of equal samples rising out of
//! lower signal and falling back into it, is reported once at its first sample.
use log::{debug, trace};

use thiserror::Error;

use num_traits::Float;

use crate::arrayops::is_increasing;
use crate::peak::Peak;
use crate::peak_statistics::{full_width_at_half_max, quadratic_fit};
use crate::spectrum::Spectrum;

/// Find the indices of the local maxima of `signal` at least as high as `height_threshold`.
///
/// Signals shorter than three samples have no interior points and yield no peaks.
pub fn find_peaks<F: Float>(signal: &[F], height_threshold: F) -> Vec<usize> {
    let n = signal.len();
    let mut peaks = Vec::new();
    if n < 3 {
        return peaks;
    }

    let mut index = 1;
    while index < n - 1 {
        let current = signal[index];
        if current > signal[index - 1] {
            // Walk to the last sample of a potential plateau
            let mut end = index;
            while end + 1 < n && signal[end + 1] == current {
                end += 1;
            }
            if end + 1 < n && current > signal[end + 1] && current >= height_threshold {
                peaks.push(index);
            }
            index = end + 1;
        } else {
            index += 1;
        }
    }
    peaks
}

/// Find the indices of the local minima of `signal` by searching for peaks in its negation.
pub fn find_valleys<F: Float>(signal: &[F]) -> Vec<usize> {
    let negated: Vec<F> = signal.iter().map(|v| -*v).collect();
    find_peaks(&negated, F::neg_infinity())
}

/// How the wavelength of a detected peak is reported
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PeakFitType {
    /// Report the wavelength of the highest sample, as it was digitized.
    #[default]
    Apex,
    /// Fit a parabola through the apex and its neighbors and report its vertex,
    /// recovering some of the precision lost to the instrument's sampling.
    Quadratic,
}

/// All the ways peak picking can fail
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PeakPickerError {
    #[error("The wavelength and intensity arrays do not match in length ({0} != {1})")]
    MismatchedLengths(usize, usize),
    #[error("The wavelength array is not sorted")]
    NotSorted,
}

/// A peak picker for emission spectra
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PeakPicker {
    /// The minimum apex intensity of a reported peak, the peak height cutoff
    pub intensity_threshold: f32,
    pub fit_type: PeakFitType,
    /// Whether to estimate [`Peak::full_width_at_half_max`]
    pub estimate_width: bool,
}

/// A builder for configuring [`PeakPicker`]
#[derive(Debug, Clone, Default)]
pub struct PeakPickerBuilder {
    intensity_threshold: f32,
    fit_type: PeakFitType,
    estimate_width: bool,
}

impl PeakPickerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intensity_threshold(&mut self, intensity_threshold: f32) -> &mut Self {
        self.intensity_threshold = intensity_threshold;
        self
    }

    pub fn fit_type(&mut self, fit_type: PeakFitType) -> &mut Self {
        self.fit_type = fit_type;
        self
    }

    pub fn estimate_width(&mut self, estimate_width: bool) -> &mut Self {
        self.estimate_width = estimate_width;
        self
    }

    pub fn build(&self) -> PeakPicker {
        PeakPicker::new(self.intensity_threshold, self.fit_type, self.estimate_width)
    }
}

impl From<PeakPickerBuilder> for PeakPicker {
    fn from(value: PeakPickerBuilder) -> Self {
        value.build()
    }
}

impl PeakPicker {
    /// Create a new peak picker
    pub fn new(intensity_threshold: f32, fit_type: PeakFitType, estimate_width: bool) -> Self {
        Self {
            intensity_threshold,
            fit_type,
            estimate_width,
        }
    }

    pub fn builder() -> PeakPickerBuilder {
        PeakPickerBuilder::new()
    }

    /// Locate the peak at `index` in `wavelength_array` and `intensity_array`.
    ///
    /// `index` is assumed to be the apex of the peak, thus for [`PeakFitType::Apex`],
    /// this function is simply `wavelength_array[index]`.
    pub fn fit_peak(&self, index: usize, wavelength_array: &[f64], intensity_array: &[f32]) -> f64 {
        match self.fit_type {
            PeakFitType::Apex => wavelength_array[index],
            PeakFitType::Quadratic => quadratic_fit(wavelength_array, intensity_array, index),
        }
    }

    /// Pick peaks from `wavelength_array` and `intensity_array`, pushing new peaks into
    /// `peak_accumulator` in ascending wavelength order.
    ///
    /// Returns the number of peaks picked if successful.
    pub fn discover_peaks(
        &self,
        wavelength_array: &[f64],
        intensity_array: &[f32],
        peak_accumulator: &mut Vec<Peak>,
    ) -> Result<usize, PeakPickerError> {
        if wavelength_array.len() != intensity_array.len() {
            return Err(PeakPickerError::MismatchedLengths(
                wavelength_array.len(),
                intensity_array.len(),
            ));
        }
        if !is_increasing(wavelength_array) {
            return Err(PeakPickerError::NotSorted);
        }

        let m = peak_accumulator.len();
        for index in find_peaks(intensity_array, self.intensity_threshold) {
            let wavelength = self.fit_peak(index, wavelength_array, intensity_array);
            let mut peak = Peak::new(wavelength, intensity_array[index], index as u32);
            if self.estimate_width {
                let fit = full_width_at_half_max(wavelength_array, intensity_array, index);
                peak.full_width_at_half_max = fit.full_width_at_half_max as f32;
            }
            trace!("Picked {peak}");
            peak_accumulator.push(peak);
        }
        let count = peak_accumulator.len() - m;
        debug!(
            "Picked {count} peaks above {} from {} points",
            self.intensity_threshold,
            wavelength_array.len()
        );
        Ok(count)
    }

    /// Pick peaks from a validated [`Spectrum`]
    pub fn pick(&self, spectrum: &Spectrum) -> Vec<Peak> {
        let mut acc = Vec::new();
        // A `Spectrum`'s arrays always agree in length and are sorted
        if let Err(err) = self.discover_peaks(spectrum.wavelengths(), spectrum.intensities(), &mut acc) {
            log::error!("Failed to pick peaks from a validated spectrum: {err}");
        }
        acc
    }
}

/// A convenience function that picks apex peaks at or above `cutoff` from `spectrum`.
pub fn pick_peaks(spectrum: &Spectrum, cutoff: f32) -> Vec<Peak> {
    let picker = PeakPicker {
        intensity_threshold: cutoff,
        ..PeakPicker::default()
    };
    picker.pick(spectrum)
}
