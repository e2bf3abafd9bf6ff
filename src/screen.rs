//! Screen a peak list for many elements at once.
use std::collections::{BTreeMap, BTreeSet};

use log::{debug, warn};
use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[cfg(feature = "parallelism")]
use rayon::prelude::*;

use crate::matcher::{
    ElementMatcher, MatchError, MatchRecord, MatchTolerance, DEFAULT_MATCH_THRESHOLD,
};
use crate::peak::Peak;
use crate::reference::{LineType, ReferenceError, ReferenceSource};

/// The elements screened when none are named
pub const DEFAULT_ELEMENTS: [&str; 12] = [
    "Cu", "Al", "Ca", "Cr", "Fe", "K", "Mg", "Mn", "Na", "O", "Si", "Ti",
];

/// Why a single element could not be screened
#[derive(Debug, Error)]
pub enum ScreeningError {
    #[error("No reference data found for {0}")]
    ReferenceDataNotFound(String),
    #[error(transparent)]
    Reference(ReferenceError),
    #[error(transparent)]
    Match(#[from] MatchError),
}

impl From<ReferenceError> for ScreeningError {
    fn from(value: ReferenceError) -> Self {
        match value {
            ReferenceError::ReferenceDataNotFound(symbol) => Self::ReferenceDataNotFound(symbol),
            err => Self::Reference(err),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ScreeningConfig {
    /// Which reference lines to match against
    pub line_type: LineType,
    pub tolerance: MatchTolerance,
    pub match_threshold: usize,
}

impl Default for ScreeningConfig {
    fn default() -> Self {
        Self {
            line_type: LineType::Persistent,
            tolerance: MatchTolerance::default(),
            match_threshold: DEFAULT_MATCH_THRESHOLD,
        }
    }
}

impl ScreeningConfig {
    pub fn line_type(mut self, line_type: LineType) -> Self {
        self.line_type = line_type;
        self
    }

    pub fn tolerance(mut self, lower_error: f64, upper_error: f64) -> Self {
        self.tolerance = MatchTolerance::new(lower_error, upper_error);
        self
    }

    pub fn match_threshold(mut self, match_threshold: usize) -> Self {
        self.match_threshold = match_threshold;
        self
    }

    pub fn matcher(&self) -> ElementMatcher {
        ElementMatcher::new(self.tolerance, self.match_threshold)
    }
}

/// The outcome of screening one element
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ElementResult {
    pub symbol: String,
    pub is_match: bool,
    pub matched_peaks: Vec<MatchRecord>,
}

/// The results of screening a peak list for a set of elements, keyed by symbol
#[derive(Debug, Default)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct ScreeningReport {
    pub results: BTreeMap<String, ElementResult>,
    #[cfg_attr(feature = "serde", serde(skip))]
    pub errors: BTreeMap<String, ScreeningError>,
}

impl ScreeningReport {
    /// The symbols of the elements found, in alphabetical order
    pub fn detected_elements(&self) -> Vec<&str> {
        self.results
            .values()
            .filter(|r| r.is_match)
            .map(|r| r.symbol.as_str())
            .collect()
    }

    pub fn get(&self, symbol: &str) -> Option<&ElementResult> {
        self.results.get(symbol)
    }

    pub fn error(&self, symbol: &str) -> Option<&ScreeningError> {
        self.errors.get(symbol)
    }

    pub fn is_detected(&self, symbol: &str) -> bool {
        self.get(symbol).is_some_and(|r| r.is_match)
    }

    /// Every match of every detected element as `(symbol, record)` pairs
    pub fn matched_rows(&self) -> impl Iterator<Item = (&str, &MatchRecord)> + '_ {
        self.results
            .values()
            .filter(|r| r.is_match)
            .flat_map(|r| r.matched_peaks.iter().map(|m| (r.symbol.as_str(), m)))
    }

    fn record(&mut self, symbol: String, outcome: Result<ElementResult, ScreeningError>) {
        match outcome {
            Ok(result) => {
                self.results.insert(symbol, result);
            }
            Err(err) => {
                warn!("Failed to screen {symbol}: {err}");
                self.errors.insert(symbol, err);
            }
        }
    }
}

/// Runs an [`ElementMatcher`] for each requested element against tables from a [`ReferenceSource`]
#[derive(Debug, Clone)]
pub struct ElementScreener<'a, S: ReferenceSource> {
    source: &'a S,
    config: ScreeningConfig,
}

impl<'a, S: ReferenceSource> ElementScreener<'a, S> {
    pub fn new(source: &'a S, config: ScreeningConfig) -> Self {
        Self { source, config }
    }

    pub fn config(&self) -> &ScreeningConfig {
        &self.config
    }

    /// Screen a single element
    pub fn screen_element(
        &self,
        peaks: &[Peak],
        symbol: &str,
    ) -> Result<ElementResult, ScreeningError> {
        let table = self.source.lookup(symbol)?;
        let lines = table.filtered(self.config.line_type);
        debug!(
            "Screening {symbol} with {} of {} reference lines",
            lines.len(),
            table.len()
        );
        let found = self.config.matcher().match_lines(peaks, &lines)?;
        Ok(ElementResult {
            symbol: symbol.to_string(),
            is_match: found.is_match,
            matched_peaks: found.matches,
        })
    }

    /// Screen `peaks` for every element in `symbols`.
    ///
    /// A failure for one element is recorded in [`ScreeningReport::errors`] and does not
    /// stop the others. Repeated symbols are screened once.
    pub fn screen<T: AsRef<str>>(&self, peaks: &[Peak], symbols: &[T]) -> ScreeningReport {
        let mut report = ScreeningReport::default();
        for symbol in unique_symbols(symbols) {
            let outcome = self.screen_element(peaks, symbol);
            report.record(symbol.to_string(), outcome);
        }
        report
    }
}

#[cfg(feature = "parallelism")]
impl<'a, S: ReferenceSource + Sync> ElementScreener<'a, S> {
    /// As [`ElementScreener::screen`], screening elements concurrently
    pub fn screen_parallel<T: AsRef<str> + Sync>(
        &self,
        peaks: &[Peak],
        symbols: &[T],
    ) -> ScreeningReport {
        let symbols: Vec<&str> = unique_symbols(symbols).into_iter().collect();
        let outcomes: Vec<_> = symbols
            .par_iter()
            .map(|symbol| (symbol.to_string(), self.screen_element(peaks, symbol)))
            .collect();
        let mut report = ScreeningReport::default();
        for (symbol, outcome) in outcomes {
            report.record(symbol, outcome);
        }
        report
    }
}

fn unique_symbols<T: AsRef<str>>(symbols: &[T]) -> BTreeSet<&str> {
    symbols.iter().map(|s| s.as_ref()).collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::peak_picker::PeakPicker;
    use crate::reference::ReferenceDirectory;
    use crate::test_data::{reference_library, synthetic_spectrum, CU_LINES, FE_LINES};

    fn sample_peaks() -> Vec<Peak> {
        let lines: Vec<f64> = CU_LINES.iter().chain(FE_LINES.iter()).copied().collect();
        let spectrum = synthetic_spectrum(&lines, 0.0);
        PeakPicker::new(50.0, Default::default(), false).pick(&spectrum)
    }

    #[test_log::test]
    fn test_screen_library() {
        let library = reference_library();
        let screener = ElementScreener::new(&library, ScreeningConfig::default());
        let peaks = sample_peaks();
        let report = screener.screen(&peaks, &["Cu", "Fe", "Al", "Zz"]);

        assert_eq!(report.detected_elements(), vec!["Cu", "Fe"]);
        assert!(!report.is_detected("Al"));
        assert!(report.get("Al").unwrap().matched_peaks.is_empty());
        assert!(matches!(
            report.error("Zz"),
            Some(ScreeningError::ReferenceDataNotFound(s)) if s == "Zz"
        ));
        assert!(report.get("Zz").is_none());

        // The strong Cu line is skipped by the persistent filter
        let cu = report.get("Cu").unwrap();
        assert_eq!(cu.matched_peaks.len(), 4);
        assert!(cu
            .matched_peaks
            .iter()
            .all(|m| m.line_type == LineType::Persistent));
    }

    #[test]
    fn test_strong_lines_include_persistent() {
        let library = reference_library();
        let peaks = sample_peaks();
        let strong = ElementScreener::new(
            &library,
            ScreeningConfig::default().line_type(LineType::Strong),
        )
        .screen(&peaks, &["Cu"]);
        assert_eq!(strong.get("Cu").unwrap().matched_peaks.len(), CU_LINES.len());
    }

    #[test]
    fn test_threshold_and_duplicates() {
        let library = reference_library();
        let peaks = sample_peaks();
        let screener =
            ElementScreener::new(&library, ScreeningConfig::default().match_threshold(5));
        let report = screener.screen(&peaks, &["Fe", "Cu", "Fe"]);
        assert_eq!(report.results.len(), 2);
        assert_eq!(report.detected_elements(), vec!["Fe"]);
        assert_eq!(report.matched_rows().count(), 5);
    }

    #[test]
    fn test_unsorted_peaks_are_reported_per_element() {
        let library = reference_library();
        let screener = ElementScreener::new(&library, ScreeningConfig::default());
        let mut peaks = sample_peaks();
        peaks.reverse();
        let report = screener.screen(&peaks, &["Cu", "Zz"]);
        assert!(report.results.is_empty());
        assert!(matches!(
            report.error("Cu"),
            Some(ScreeningError::Match(MatchError::UnsortedPeaks(_)))
        ));
        assert!(matches!(
            report.error("Zz"),
            Some(ScreeningError::ReferenceDataNotFound(_))
        ));
    }

    #[test]
    fn test_screen_directory() {
        let directory = ReferenceDirectory::new("test/data/reference");
        let screener = ElementScreener::new(&directory, ScreeningConfig::default());
        let report = screener.screen(&sample_peaks(), &DEFAULT_ELEMENTS);
        assert_eq!(report.detected_elements(), vec!["Cu", "Fe"]);
        assert!(report.get("Al").is_some_and(|r| !r.is_match));
        assert!(matches!(
            report.error("Ti"),
            Some(ScreeningError::ReferenceDataNotFound(_))
        ));

        let report = screener.screen(&sample_peaks(), &["Broken"]);
        assert!(matches!(
            report.error("Broken"),
            Some(ScreeningError::Reference(ReferenceError::Malformed { .. }))
        ));
    }

    #[cfg(feature = "parallelism")]
    #[test]
    fn test_screen_parallel_matches_serial() {
        let library = reference_library();
        let screener = ElementScreener::new(&library, ScreeningConfig::default());
        let peaks = sample_peaks();
        let serial = screener.screen(&peaks, &DEFAULT_ELEMENTS);
        let parallel = screener.screen_parallel(&peaks, &DEFAULT_ELEMENTS);
        assert_eq!(serial.results, parallel.results);
        assert_eq!(
            serial.errors.keys().collect::<Vec<_>>(),
            parallel.errors.keys().collect::<Vec<_>>()
        );
    }
}
