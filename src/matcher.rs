//! Match picked peaks against the reference lines of a single element.
//!
//! Both sequences are walked once in ascending wavelength order. Each peak and each
//! reference line takes part in at most one match, and a match is never revisited once
//! made, so the pairing is the greedy leftmost one and not necessarily the one with the
//! most matches.
use log::{debug, trace};
use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::arrayops::first_descending;
use crate::peak::Peak;
use crate::reference::{LineType, ReferenceLine};

/// The minimum number of matched lines for an element to be reported present by default
pub const DEFAULT_MATCH_THRESHOLD: usize = 3;

/// The default tolerance on either side of a reference line, in nanometers
pub const DEFAULT_WAVELENGTH_ERROR: f64 = 0.1;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MatchError {
    #[error("The peak list is not sorted by wavelength at index {0}")]
    UnsortedPeaks(usize),
    #[error("The reference lines are not sorted by wavelength at index {0}")]
    UnsortedReference(usize),
    #[error("Wavelength tolerances must be finite and non-negative, received {lower_error} and {upper_error}")]
    InvalidTolerance { lower_error: f64, upper_error: f64 },
}

/// An asymmetric window around a reference wavelength.
///
/// A peak at `w` matches a reference line at `r` when
/// `r - lower_error <= w <= r + upper_error`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MatchTolerance {
    pub lower_error: f64,
    pub upper_error: f64,
}

impl Default for MatchTolerance {
    fn default() -> Self {
        Self::symmetric(DEFAULT_WAVELENGTH_ERROR)
    }
}

impl MatchTolerance {
    pub fn new(lower_error: f64, upper_error: f64) -> Self {
        Self {
            lower_error,
            upper_error,
        }
    }

    pub fn symmetric(error: f64) -> Self {
        Self::new(error, error)
    }

    pub fn validate(&self) -> Result<(), MatchError> {
        let valid = |v: f64| v.is_finite() && v >= 0.0;
        if valid(self.lower_error) && valid(self.upper_error) {
            Ok(())
        } else {
            Err(MatchError::InvalidTolerance {
                lower_error: self.lower_error,
                upper_error: self.upper_error,
            })
        }
    }

    #[inline]
    pub fn contains(&self, reference: f64, wavelength: f64) -> bool {
        reference - self.lower_error <= wavelength && wavelength <= reference + self.upper_error
    }
}

/// A peak paired with the reference line it was matched to
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MatchRecord {
    pub peak: Peak,
    pub standard_wavelength: f64,
    pub ionization_state: u8,
    pub line_type: LineType,
}

impl MatchRecord {
    pub fn new(peak: Peak, line: &ReferenceLine) -> Self {
        Self {
            peak,
            standard_wavelength: line.wavelength,
            ionization_state: line.ionization_state,
            line_type: line.line_type,
        }
    }

    /// The signed distance of the peak from the reference line
    pub fn wavelength_error(&self) -> f64 {
        self.peak.wavelength - self.standard_wavelength
    }
}

/// The matches found for one element
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ElementMatch {
    pub is_match: bool,
    pub matches: Vec<MatchRecord>,
}

impl ElementMatch {
    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ElementMatcher {
    pub tolerance: MatchTolerance,
    /// The number of matched lines at which an element is considered present
    pub match_threshold: usize,
}

impl Default for ElementMatcher {
    fn default() -> Self {
        Self {
            tolerance: MatchTolerance::default(),
            match_threshold: DEFAULT_MATCH_THRESHOLD,
        }
    }
}

impl ElementMatcher {
    pub fn new(tolerance: MatchTolerance, match_threshold: usize) -> Self {
        Self {
            tolerance,
            match_threshold,
        }
    }

    /// Pair `peaks` with `reference` lines, both of which must be sorted by wavelength.
    ///
    /// Equal neighboring wavelengths are allowed. Empty inputs produce no matches.
    pub fn match_lines(
        &self,
        peaks: &[Peak],
        reference: &[ReferenceLine],
    ) -> Result<ElementMatch, MatchError> {
        self.tolerance.validate()?;
        if let Some(i) = first_descending(&peaks.iter().map(|p| p.wavelength).collect::<Vec<_>>())
        {
            return Err(MatchError::UnsortedPeaks(i));
        }
        if let Some(i) =
            first_descending(&reference.iter().map(|r| r.wavelength).collect::<Vec<_>>())
        {
            return Err(MatchError::UnsortedReference(i));
        }

        let mut matches = Vec::new();
        let mut p = 0;
        let mut r = 0;
        while p < peaks.len() && r < reference.len() {
            let peak = &peaks[p];
            let line = &reference[r];
            if peak.wavelength > line.wavelength + self.tolerance.upper_error {
                r += 1;
            } else if self.tolerance.contains(line.wavelength, peak.wavelength) {
                trace!("Matched {peak} to {}", line.wavelength);
                matches.push(MatchRecord::new(*peak, line));
                p += 1;
                r += 1;
            } else {
                p += 1;
            }
        }

        let is_match = matches.len() >= self.match_threshold;
        debug!(
            "Matched {} of {} reference lines, threshold {} => {is_match}",
            matches.len(),
            reference.len(),
            self.match_threshold
        );
        Ok(ElementMatch { is_match, matches })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rstest::rstest;

    fn peaks(wavelengths: &[f64]) -> Vec<Peak> {
        wavelengths
            .iter()
            .enumerate()
            .map(|(i, w)| Peak::new(*w, 10.0, i as u32))
            .collect()
    }

    fn lines(wavelengths: &[f64]) -> Vec<ReferenceLine> {
        wavelengths
            .iter()
            .map(|w| ReferenceLine::new(*w, LineType::Persistent, 1))
            .collect()
    }

    #[rstest]
    #[case(2, true)]
    #[case(3, false)]
    fn test_two_line_example(#[case] threshold: usize, #[case] is_match: bool) {
        let peaks = vec![
            Peak::new(500.0, 10.0, 0),
            Peak::new(500.3, 8.0, 1),
            Peak::new(510.0, 5.0, 2),
        ];
        let reference = vec![
            ReferenceLine::new(500.1, LineType::Persistent, 0),
            ReferenceLine::new(509.9, LineType::Persistent, 1),
        ];
        let matcher = ElementMatcher::new(MatchTolerance::symmetric(0.2), threshold);
        let result = matcher.match_lines(&peaks, &reference).unwrap();
        assert_eq!(result.is_match, is_match);
        assert_eq!(result.len(), 2);
        assert_eq!(result.matches[0].peak.wavelength, 500.0);
        assert_eq!(result.matches[0].standard_wavelength, 500.1);
        assert_eq!(result.matches[0].ionization_state, 0);
        assert_eq!(result.matches[1].peak.wavelength, 510.0);
        assert_eq!(result.matches[1].standard_wavelength, 509.9);
        assert_eq!(result.matches[1].ionization_state, 1);
    }

    #[rstest]
    #[case(500.25, true)]
    #[case(500.5, false)]
    #[case(499.75, true)]
    #[case(499.5, false)]
    fn test_window_boundaries(#[case] wavelength: f64, #[case] expected: bool) {
        let matcher = ElementMatcher::new(MatchTolerance::symmetric(0.25), 1);
        let result = matcher
            .match_lines(&peaks(&[wavelength]), &lines(&[500.0]))
            .unwrap();
        assert_eq!(result.is_match, expected);
    }

    #[test]
    fn test_asymmetric_window() {
        let matcher = ElementMatcher::new(MatchTolerance::new(0.5, 0.0), 1);
        let reference = lines(&[500.0]);
        assert!(matcher.match_lines(&peaks(&[499.5]), &reference).unwrap().is_match);
        assert!(!matcher.match_lines(&peaks(&[500.25]), &reference).unwrap().is_match);
    }

    #[test]
    fn test_greedy_leftmost() {
        let matcher = ElementMatcher::new(MatchTolerance::symmetric(0.2), 1);
        let result = matcher
            .match_lines(&peaks(&[500.15]), &lines(&[500.0, 500.2]))
            .unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result.matches[0].standard_wavelength, 500.0);
    }

    #[test]
    fn test_empty_inputs() {
        let matcher = ElementMatcher::new(MatchTolerance::default(), 1);
        for (p, r) in [
            (peaks(&[]), lines(&[500.0])),
            (peaks(&[500.0]), lines(&[])),
            (peaks(&[]), lines(&[])),
        ] {
            let result = matcher.match_lines(&p, &r).unwrap();
            assert!(result.is_empty());
            assert!(!result.is_match);
        }
    }

    #[test]
    fn test_one_to_one_and_deterministic() {
        let peak_list = peaks(&[399.95, 400.0, 400.05, 400.1, 401.0, 401.02, 402.0]);
        let reference = lines(&[400.0, 400.0, 401.0, 402.05, 402.1]);
        let matcher = ElementMatcher::new(MatchTolerance::symmetric(0.1), 1);
        let first = matcher.match_lines(&peak_list, &reference).unwrap();
        let second = matcher.match_lines(&peak_list, &reference).unwrap();
        assert_eq!(first, second);

        let mut seen_peaks: Vec<u32> = first.matches.iter().map(|m| m.peak.index).collect();
        seen_peaks.dedup();
        assert_eq!(seen_peaks.len(), first.len());
        // Both reference lines at 400.0 were consumed by distinct peaks
        assert_eq!(first.len(), 4);
        assert!(first
            .matches
            .iter()
            .all(|m| matcher.tolerance.contains(m.standard_wavelength, m.peak.wavelength)));
    }

    #[test]
    fn test_threshold_is_monotonic() {
        let peak_list = peaks(&[300.0, 310.0, 320.0, 330.0]);
        let reference = lines(&[300.05, 310.05, 330.05]);
        let mut was_match = true;
        for threshold in 0..6 {
            let matcher = ElementMatcher::new(MatchTolerance::default(), threshold);
            let result = matcher.match_lines(&peak_list, &reference).unwrap();
            assert_eq!(result.len(), 3);
            assert!(was_match || !result.is_match);
            was_match = result.is_match;
        }
        assert!(!was_match);
    }

    #[test]
    fn test_validation() {
        let matcher = ElementMatcher::default();
        assert_eq!(
            matcher.match_lines(&peaks(&[400.0, 399.0]), &lines(&[400.0])),
            Err(MatchError::UnsortedPeaks(1))
        );
        assert_eq!(
            matcher.match_lines(&peaks(&[400.0]), &lines(&[400.0, 401.0, 300.0])),
            Err(MatchError::UnsortedReference(2))
        );
        assert_eq!(
            matcher.match_lines(&peaks(&[f64::NAN, 400.0]), &lines(&[400.0])),
            Err(MatchError::UnsortedPeaks(1))
        );

        let matcher = ElementMatcher::new(MatchTolerance::new(-0.1, 0.1), 1);
        assert!(matches!(
            matcher.match_lines(&[], &[]),
            Err(MatchError::InvalidTolerance { .. })
        ));
        let matcher = ElementMatcher::new(MatchTolerance::new(0.1, f64::NAN), 1);
        assert!(matcher.tolerance.validate().is_err());
    }
}
