//! Validated wavelength/intensity arrays.
//!
use std::fmt;
use std::ops::Range;

use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::arrayops::minmax;
use crate::search;

/// The minimum number of samples a [`Spectrum`] may hold
pub const MINIMUM_SPECTRUM_LENGTH: usize = 2;

/// All the ways a spectrum can be rejected before processing
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SpectrumError {
    #[error("A spectrum needs at least 2 samples, received {0}")]
    TooShort(usize),
    #[error("The wavelength and intensity arrays do not match in length ({0} != {1})")]
    MismatchedLengths(usize, usize),
    #[error("The wavelength array is not strictly increasing at index {0}")]
    NotIncreasing(usize),
    #[error("Non-finite value at index {0}")]
    NonFinite(usize),
}

/// An emission spectrum, a pair of parallel wavelength (nm) and intensity arrays.
///
/// A [`Spectrum`] is always valid: it holds at least [`MINIMUM_SPECTRUM_LENGTH`] samples,
/// every value is finite and the wavelengths are strictly increasing. Operations which
/// transform the signal return a new [`Spectrum`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Spectrum {
    wavelength: Vec<f64>,
    intensity: Vec<f32>,
}

impl Spectrum {
    /// Validate and wrap a pair of arrays
    pub fn new(wavelength: Vec<f64>, intensity: Vec<f32>) -> Result<Self, SpectrumError> {
        if wavelength.len() != intensity.len() {
            return Err(SpectrumError::MismatchedLengths(
                wavelength.len(),
                intensity.len(),
            ));
        }
        if wavelength.len() < MINIMUM_SPECTRUM_LENGTH {
            return Err(SpectrumError::TooShort(wavelength.len()));
        }
        if let Some(i) = wavelength
            .iter()
            .zip(intensity.iter())
            .position(|(x, y)| !x.is_finite() || !y.is_finite())
        {
            return Err(SpectrumError::NonFinite(i));
        }
        if let Some(i) = wavelength.windows(2).position(|w| w[0] >= w[1]) {
            return Err(SpectrumError::NotIncreasing(i + 1));
        }
        Ok(Self {
            wavelength,
            intensity,
        })
    }

    /// Build a spectrum from `(wavelength, intensity)` pairs already in order
    pub fn from_pairs<I: IntoIterator<Item = (f64, f32)>>(pairs: I) -> Result<Self, SpectrumError> {
        let (wavelength, intensity): (Vec<f64>, Vec<f32>) = pairs.into_iter().unzip();
        Self::new(wavelength, intensity)
    }

    /// Sort `(wavelength, intensity)` pairs by wavelength and drop repeated wavelengths,
    /// keeping the first sample seen for each, then validate the result.
    pub fn from_unsorted<I: IntoIterator<Item = (f64, f32)>>(
        pairs: I,
    ) -> Result<Self, SpectrumError> {
        let mut pairs: Vec<(f64, f32)> = pairs.into_iter().collect();
        if let Some(i) = pairs
            .iter()
            .position(|(x, y)| !x.is_finite() || !y.is_finite())
        {
            return Err(SpectrumError::NonFinite(i));
        }
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
        pairs.dedup_by(|next, kept| next.0 == kept.0);
        Self::from_pairs(pairs)
    }

    /// Replace the intensity array, keeping the wavelength axis
    pub fn with_intensities(&self, intensity: Vec<f32>) -> Result<Self, SpectrumError> {
        Self::new(self.wavelength.clone(), intensity)
    }

    pub fn len(&self) -> usize {
        self.wavelength.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wavelength.is_empty()
    }

    pub fn wavelengths(&self) -> &[f64] {
        &self.wavelength
    }

    pub fn intensities(&self) -> &[f32] {
        &self.intensity
    }

    pub fn get(&self, index: usize) -> Option<(f64, f32)> {
        Some((*self.wavelength.get(index)?, *self.intensity.get(index)?))
    }

    pub fn iter(&self) -> impl Iterator<Item = (f64, f32)> + '_ {
        self.wavelength
            .iter()
            .copied()
            .zip(self.intensity.iter().copied())
    }

    pub fn first_wavelength(&self) -> f64 {
        self.wavelength[0]
    }

    pub fn last_wavelength(&self) -> f64 {
        self.wavelength[self.len() - 1]
    }

    /// The lowest and highest intensity in the spectrum
    pub fn intensity_range(&self) -> (f32, f32) {
        minmax(&self.intensity)
    }

    /// The index of the sample whose wavelength is closest to `wavelength`
    pub fn nearest_index(&self, wavelength: f64) -> usize {
        search::nearest(&self.wavelength, wavelength).unwrap_or_default()
    }

    /// The index range of the samples with wavelengths in `[start, end]`
    pub fn index_range_between(&self, start: f64, end: f64) -> Range<usize> {
        search::find_between(&self.wavelength, start, end)
    }

    /// Copy out the samples in `range`
    pub fn slice(&self, range: Range<usize>) -> Result<Self, SpectrumError> {
        let end = range.end.min(self.len());
        let start = range.start.min(end);
        Self::new(
            self.wavelength[start..end].to_vec(),
            self.intensity[start..end].to_vec(),
        )
    }

    /// Copy out the samples with wavelengths in `[start, end]`
    pub fn between(&self, start: f64, end: f64) -> Result<Self, SpectrumError> {
        self.slice(self.index_range_between(start, end))
    }

    pub fn into_arrays(self) -> (Vec<f64>, Vec<f32>) {
        (self.wavelength, self.intensity)
    }
}

impl fmt::Display for Spectrum {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Spectrum({} points, {}-{} nm)",
            self.len(),
            self.first_wavelength(),
            self.last_wavelength()
        )
    }
}

impl TryFrom<(Vec<f64>, Vec<f32>)> for Spectrum {
    type Error = SpectrumError;

    fn try_from(value: (Vec<f64>, Vec<f32>)) -> Result<Self, Self::Error> {
        Self::new(value.0, value.1)
    }
}
