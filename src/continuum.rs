//! Estimate and remove the smooth continuum under an emission spectrum.
//!
//! The continuum is approximated by a polynomial fitted through the "valleys of valleys"
//! of the spectrum: the local minima of the sequence of local minima. Emission lines and
//! the small scale noise between them are skipped, leaving points on the broad background.
use log::{debug, trace};
use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::peak_picker::find_valleys;
use crate::polynomial::{Polynomial, PolynomialFitError, PolynomialFitter};
use crate::spectrum::{Spectrum, SpectrumError};

/// The polynomial degree used for a continuum unless configured otherwise
pub const DEFAULT_CONTINUUM_DEGREE: usize = 9;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ContinuumError {
    #[error("{points} anchor points cannot determine {terms} polynomial terms")]
    InsufficientDataForFit { points: usize, terms: usize },
    #[error("The continuum fit failed: {0}")]
    FitDidNotConverge(PolynomialFitError),
    #[error("At least two distinct split points are required, found {0}")]
    InvalidSections(usize),
    #[error("The continuum removed spectrum is invalid: {0}")]
    InvalidSpectrum(#[from] SpectrumError),
}

impl From<PolynomialFitError> for ContinuumError {
    fn from(value: PolynomialFitError) -> Self {
        match value {
            PolynomialFitError::InsufficientData { points, terms } => {
                Self::InsufficientDataForFit { points, terms }
            }
            err => Self::FitDidNotConverge(err),
        }
    }
}

/// The largest number of split points [`segment_points`] reduces a spectrum to by default
pub const DEFAULT_SEGMENT_POINTS: usize = 9;

/// Fits a polynomial continuum through the valleys of the valleys of a spectrum.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ContinuumEstimator {
    pub fitter: PolynomialFitter,
}

impl Default for ContinuumEstimator {
    fn default() -> Self {
        Self {
            fitter: PolynomialFitter::new(DEFAULT_CONTINUUM_DEGREE),
        }
    }
}

/// The result of [`ContinuumEstimator::remove_with_baseline`]
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ContinuumRemoval {
    /// The spectrum with the continuum subtracted and its minimum moved to zero
    pub spectrum: Spectrum,
    pub continuum: Polynomial,
    /// The continuum evaluated at every wavelength of the input spectrum
    pub baseline: Vec<f64>,
}

impl ContinuumEstimator {
    pub fn new(degree: usize) -> Self {
        Self {
            fitter: PolynomialFitter::new(degree),
        }
    }

    pub fn degree(mut self, degree: usize) -> Self {
        self.fitter = self.fitter.degree(degree);
        self
    }

    pub fn max_iterations(mut self, max_iterations: usize) -> Self {
        self.fitter = self.fitter.max_iterations(max_iterations);
        self
    }

    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.fitter = self.fitter.tolerance(tolerance);
        self
    }

    /// Select the indices of the samples the continuum will pass near, in ascending order
    pub fn anchor_indices(&self, spectrum: &Spectrum) -> Vec<usize> {
        let intensities = spectrum.intensities();
        let valleys = find_valleys(intensities);
        trace!("Found {} valleys", valleys.len());
        valleys_of(intensities, &valleys)
    }

    /// The `(wavelength, intensity)` anchor points the continuum is fitted through
    pub fn anchor_points(&self, spectrum: &Spectrum) -> (Vec<f64>, Vec<f64>) {
        self.anchor_indices(spectrum)
            .into_iter()
            .map(|i| {
                (
                    spectrum.wavelengths()[i],
                    spectrum.intensities()[i] as f64,
                )
            })
            .unzip()
    }

    /// Fit the continuum of `spectrum`
    pub fn estimate(&self, spectrum: &Spectrum) -> Result<Polynomial, ContinuumError> {
        let (x, y) = self.anchor_points(spectrum);
        debug!(
            "Fitting a degree {} continuum through {} anchor points of {spectrum}",
            self.fitter.degree,
            x.len()
        );
        let fit = self.fitter.fit(&x, &y)?;
        if fit.polynomial.iter().any(|c| !c.is_finite()) {
            return Err(ContinuumError::FitDidNotConverge(
                PolynomialFitError::FailedToSolveCoefficients("non-finite coefficients"),
            ));
        }
        Ok(fit.polynomial)
    }

    /// Fit the continuum of `spectrum` and evaluate it at every wavelength
    pub fn baseline(&self, spectrum: &Spectrum) -> Result<Vec<f64>, ContinuumError> {
        let continuum = self.estimate(spectrum)?;
        Ok(continuum.eval(spectrum.wavelengths()))
    }

    /// Subtract the continuum from `spectrum`, then shift the result so its
    /// lowest intensity is exactly zero.
    pub fn remove(&self, spectrum: &Spectrum) -> Result<Spectrum, ContinuumError> {
        Ok(self.remove_with_baseline(spectrum)?.spectrum)
    }

    /// As [`ContinuumEstimator::remove`], also returning the fitted continuum and the baseline
    pub fn remove_with_baseline(
        &self,
        spectrum: &Spectrum,
    ) -> Result<ContinuumRemoval, ContinuumError> {
        let continuum = self.estimate(spectrum)?;
        let baseline = continuum.eval(spectrum.wavelengths());
        if baseline.iter().any(|b| !b.is_finite()) {
            return Err(ContinuumError::FitDidNotConverge(
                PolynomialFitError::FailedToSolveCoefficients("non-finite continuum"),
            ));
        }

        let residuals: Vec<f64> = spectrum
            .intensities()
            .iter()
            .zip(baseline.iter())
            .map(|(y, b)| *y as f64 - b)
            .collect();
        let lowest = residuals.iter().copied().fold(f64::INFINITY, f64::min);
        let intensity: Vec<f32> = residuals.iter().map(|r| (r - lowest) as f32).collect();

        Ok(ContinuumRemoval {
            spectrum: spectrum.with_intensities(intensity)?,
            continuum,
            baseline,
        })
    }
}

/// Map the valleys of `intensities` sampled at `indices` back to positions in `intensities`
fn valleys_of(intensities: &[f32], indices: &[usize]) -> Vec<usize> {
    let sampled: Vec<f32> = indices.iter().map(|i| intensities[*i]).collect();
    find_valleys(&sampled)
        .into_iter()
        .map(|i| indices[i])
        .collect()
}

/// Choose wavelengths to split `spectrum` into sections at, for [`remove_continuum_by_section`].
///
/// Starting from every valley plus both ends of the spectrum, the valleys of that sequence
/// are taken repeatedly, re-adding the ends each time, until no more than `max_points`
/// remain or no further reduction is possible. The ends of the spectrum are always included,
/// so the sections cover the whole spectrum.
pub fn segment_points(spectrum: &Spectrum, max_points: usize) -> Vec<f64> {
    let intensities = spectrum.intensities();
    let last = spectrum.len() - 1;
    let with_ends = |mut interior: Vec<usize>| {
        interior.retain(|i| *i != 0 && *i != last);
        let mut indices = Vec::with_capacity(interior.len() + 2);
        indices.push(0);
        indices.extend(interior);
        indices.push(last);
        indices
    };

    let mut indices = with_ends(find_valleys(intensities));
    while indices.len() > max_points {
        let reduced = valleys_of(intensities, &indices);
        if reduced.is_empty() {
            break;
        }
        let reduced = with_ends(reduced);
        if reduced.len() >= indices.len() {
            break;
        }
        trace!("Reduced {} split points to {}", indices.len(), reduced.len());
        indices = reduced;
    }
    debug!("Segmented {spectrum} at {} points", indices.len());
    indices
        .into_iter()
        .map(|i| spectrum.wavelengths()[i])
        .collect()
}

/// Remove the continuum of `spectrum` with the default [`ContinuumEstimator`]
pub fn remove_continuum(spectrum: &Spectrum) -> Result<Spectrum, ContinuumError> {
    ContinuumEstimator::default().remove(spectrum)
}

/// Remove the continuum of each section of `spectrum` independently.
///
/// `split_points` are wavelengths, each snapped to the nearest sample. Every section runs
/// from one split up to, but not including, the next, except the last which also includes
/// its closing sample. The sections are concatenated, so samples before the first split
/// or after the last are dropped.
pub fn remove_continuum_by_section(
    spectrum: &Spectrum,
    split_points: &[f64],
    estimator: &ContinuumEstimator,
) -> Result<Spectrum, ContinuumError> {
    let mut splits: Vec<usize> = split_points
        .iter()
        .map(|w| spectrum.nearest_index(*w))
        .collect();
    splits.sort_unstable();
    splits.dedup();
    if splits.len() < 2 {
        return Err(ContinuumError::InvalidSections(splits.len()));
    }

    let n_sections = splits.len() - 1;
    let mut wavelength = Vec::with_capacity(spectrum.len());
    let mut intensity = Vec::with_capacity(spectrum.len());
    for (k, bounds) in splits.windows(2).enumerate() {
        let end = if k + 1 == n_sections {
            bounds[1] + 1
        } else {
            bounds[1]
        };
        let section = spectrum.slice(bounds[0]..end)?;
        debug!("Removing the continuum of section {k}, {section}");
        let (w, i) = estimator.remove(&section)?.into_arrays();
        wavelength.extend(w);
        intensity.extend(i);
    }
    Ok(Spectrum::new(wavelength, intensity)?)
}
