//! `libsid` is a library for identifying the chemical elements present in an optical
//! emission spectrum, such as one recorded by Laser-Induced Breakdown Spectroscopy (LIBS).
//!
//! A [`Spectrum`] is processed in three steps:
//! 1. Optionally, the broad continuum under the emission lines is estimated by fitting a
//!    polynomial through the valleys of its valleys and subtracted, see [`ContinuumEstimator`].
//! 2. Peaks are picked with [`PeakPicker`], a plain local maximum detector with a height cutoff.
//! 3. The peak list is matched against each element's reference lines with an
//!    [`ElementMatcher`], and an element is reported present when enough of its lines match.
//!    [`ElementScreener`] does this for many elements at once, looking tables up from a
//!    [`ReferenceSource`].
//!
//! [`SpectrumAnalyzer`] runs all three with an explicit set of [`AnalysisParameters`].
//!
//! # Usage
//! ```
//! use libsid::{
//!     LineType, PeakPicker, ReferenceLibrary, ReferenceLine, ReferenceTable,
//!     ElementScreener, ScreeningConfig, Spectrum,
//! };
//!
//! let spectrum = Spectrum::from_pairs(
//!     [1.0, 40.0, 2.0, 1.0, 35.0, 1.0, 3.0, 50.0, 2.0]
//!         .into_iter()
//!         .enumerate()
//!         .map(|(i, y)| (324.6 + i as f64 * 0.1, y)),
//! )
//! .unwrap();
//!
//! let library: ReferenceLibrary = [ReferenceTable::new(
//!     "Cu",
//!     vec![
//!         ReferenceLine::new(324.754, LineType::Persistent, 1),
//!         ReferenceLine::new(325.0, LineType::Persistent, 1),
//!         ReferenceLine::new(325.3, LineType::Persistent, 1),
//!     ],
//! )]
//! .into_iter()
//! .collect();
//!
//! let peaks = PeakPicker::new(10.0, Default::default(), false).pick(&spectrum);
//! assert_eq!(peaks.len(), 3);
//!
//! let screener = ElementScreener::new(&library, ScreeningConfig::default());
//! let report = screener.screen(&peaks, &["Cu", "Fe"]);
//! assert_eq!(report.detected_elements(), vec!["Cu"]);
//! assert!(report.error("Fe").is_some());
//! ```
//! ## Building
//! Polynomial fitting needs a linear algebra backend. `nalgebra` is used by default; to use
//! `ndarray-linalg` instead, pass one of its LAPACK backends as a `feature` to `cargo` e.g.:
//! `--no-default-features --features openblas,parallelism`
#![allow(unused_imports)]

pub mod arrayops;
pub mod continuum;
pub mod matcher;
pub mod peak;
pub mod peak_picker;
pub mod peak_statistics;
pub mod pipeline;
pub mod polynomial;
pub mod reference;
pub mod screen;
pub mod search;
pub mod spectrum;
pub mod text;

pub mod prelude;

#[cfg(test)]
mod test_data;

#[cfg(not(any(feature = "nalgebra", feature = "ndarray-linalg")))]
compile_error!("A linear algebra backend is required, enable `nalgebra` or one of the `ndarray-linalg` backends");

pub use crate::continuum::{
    remove_continuum, remove_continuum_by_section, segment_points, ContinuumError,
    ContinuumEstimator, ContinuumRemoval, DEFAULT_SEGMENT_POINTS,
};
pub use crate::matcher::{ElementMatch, ElementMatcher, MatchError, MatchRecord, MatchTolerance};
pub use crate::peak::{normalize_peaks, Peak};
pub use crate::peak_picker::{pick_peaks, PeakFitType, PeakPicker, PeakPickerError};
pub use crate::pipeline::{AnalysisError, AnalysisParameters, AnalysisReport, SpectrumAnalyzer};
pub use crate::polynomial::{Polynomial, PolynomialFitError, PolynomialFitter};
pub use crate::reference::{
    LineType, ReferenceDirectory, ReferenceError, ReferenceLibrary, ReferenceLine,
    ReferenceSource, ReferenceTable,
};
pub use crate::screen::{
    ElementResult, ElementScreener, ScreeningConfig, ScreeningError, ScreeningReport,
    DEFAULT_ELEMENTS,
};
pub use crate::spectrum::{Spectrum, SpectrumError};
pub use crate::text::TextError;
