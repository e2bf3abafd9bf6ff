//! Run the whole analysis, optional continuum removal, peak picking and element screening,
//! over a spectrum.
use log::info;
use thiserror::Error;

#[cfg(feature = "serde")]
use serde::Serialize;

use crate::continuum::{ContinuumError, ContinuumEstimator};
use crate::peak::Peak;
use crate::peak_picker::PeakPicker;
use crate::polynomial::Polynomial;
use crate::reference::ReferenceSource;
use crate::screen::{ElementScreener, ScreeningConfig, ScreeningReport, DEFAULT_ELEMENTS};
use crate::spectrum::Spectrum;

/// The default minimum apex intensity of a peak
pub const DEFAULT_PEAK_HEIGHT_CUTOFF: f32 = 0.0;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Failed to remove the continuum: {0}")]
    Continuum(#[from] ContinuumError),
}

/// Every setting an analysis depends on
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, serde::Deserialize))]
pub struct AnalysisParameters {
    pub peak_height_cutoff: f32,
    /// Remove the continuum before picking peaks when set
    pub continuum: Option<ContinuumEstimator>,
    pub screening: ScreeningConfig,
    pub elements: Vec<String>,
}

impl Default for AnalysisParameters {
    fn default() -> Self {
        Self {
            peak_height_cutoff: DEFAULT_PEAK_HEIGHT_CUTOFF,
            continuum: None,
            screening: ScreeningConfig::default(),
            elements: DEFAULT_ELEMENTS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl AnalysisParameters {
    pub fn peak_height_cutoff(mut self, peak_height_cutoff: f32) -> Self {
        self.peak_height_cutoff = peak_height_cutoff;
        self
    }

    pub fn continuum(mut self, continuum: Option<ContinuumEstimator>) -> Self {
        self.continuum = continuum;
        self
    }

    pub fn screening(mut self, screening: ScreeningConfig) -> Self {
        self.screening = screening;
        self
    }

    pub fn elements<T: AsRef<str>>(mut self, elements: &[T]) -> Self {
        self.elements = elements.iter().map(|s| s.as_ref().to_string()).collect();
        self
    }
}

/// Everything learned from analyzing one spectrum, along with the parameters used
#[derive(Debug)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct AnalysisReport {
    pub parameters: AnalysisParameters,
    /// The spectrum peaks were picked from, after any continuum removal
    pub spectrum: Spectrum,
    pub continuum: Option<Polynomial>,
    pub peaks: Vec<Peak>,
    pub screening: ScreeningReport,
}

impl AnalysisReport {
    pub fn detected_elements(&self) -> Vec<&str> {
        self.screening.detected_elements()
    }
}

pub struct SpectrumAnalyzer<'a, S: ReferenceSource> {
    source: &'a S,
    pub parameters: AnalysisParameters,
}

impl<'a, S: ReferenceSource> SpectrumAnalyzer<'a, S> {
    pub fn new(source: &'a S, parameters: AnalysisParameters) -> Self {
        Self { source, parameters }
    }

    /// Analyze `spectrum`, which is left unchanged.
    ///
    /// A failure to remove the continuum aborts the analysis, while failures to screen
    /// individual elements are collected in [`ScreeningReport::errors`].
    pub fn analyze(&self, spectrum: &Spectrum) -> Result<AnalysisReport, AnalysisError> {
        let (processed, continuum) = match &self.parameters.continuum {
            Some(estimator) => {
                let removal = estimator.remove_with_baseline(spectrum)?;
                (removal.spectrum, Some(removal.continuum))
            }
            None => (spectrum.clone(), None),
        };

        let picker = PeakPicker {
            intensity_threshold: self.parameters.peak_height_cutoff,
            ..PeakPicker::default()
        };
        let peaks = picker.pick(&processed);

        let screener = ElementScreener::new(self.source, self.parameters.screening);
        let screening = screener.screen(&peaks, &self.parameters.elements);
        info!(
            "Found {} peaks in {processed}, detected {:?}",
            peaks.len(),
            screening.detected_elements()
        );

        Ok(AnalysisReport {
            parameters: self.parameters.clone(),
            spectrum: processed,
            continuum,
            peaks,
            screening,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::screen::ScreeningError;
    use crate::test_data::{reference_library, synthetic_spectrum, CU_LINES, FE_LINES};

    fn parameters() -> AnalysisParameters {
        AnalysisParameters::default()
            .peak_height_cutoff(50.0)
            .elements(&["Al", "Cu", "Fe", "Zz"])
    }

    #[test_log::test]
    fn test_analyze_with_continuum() {
        let lines: Vec<f64> = CU_LINES.iter().chain(FE_LINES.iter()).copied().collect();
        let spectrum = synthetic_spectrum(&lines, 40.0);
        let library = reference_library();
        let params = parameters().continuum(Some(ContinuumEstimator::default()));
        let analyzer = SpectrumAnalyzer::new(&library, params.clone());

        let report = analyzer.analyze(&spectrum).unwrap();
        assert_eq!(report.parameters, params);
        assert!(report.continuum.is_some());
        assert_eq!(report.spectrum.intensity_range().0, 0.0);
        assert_eq!(report.spectrum.len(), spectrum.len());
        assert_eq!(report.detected_elements(), vec!["Cu", "Fe"]);
        assert!(matches!(
            report.screening.error("Zz"),
            Some(ScreeningError::ReferenceDataNotFound(_))
        ));
    }

    #[test]
    fn test_analyze_without_continuum() {
        let spectrum = synthetic_spectrum(&CU_LINES, 0.0);
        let library = reference_library();
        let analyzer = SpectrumAnalyzer::new(&library, parameters());
        let report = analyzer.analyze(&spectrum).unwrap();
        assert!(report.continuum.is_none());
        assert_eq!(report.spectrum, spectrum);
        assert_eq!(report.peaks.len(), CU_LINES.len());
        assert_eq!(report.detected_elements(), vec!["Cu"]);
    }

    #[test]
    fn test_continuum_failure_aborts() {
        let spectrum =
            Spectrum::from_pairs((0..50).map(|i| (400.0 + i as f64, i as f32))).unwrap();
        let library = reference_library();
        let analyzer = SpectrumAnalyzer::new(
            &library,
            parameters().continuum(Some(ContinuumEstimator::default())),
        );
        assert!(matches!(
            analyzer.analyze(&spectrum),
            Err(AnalysisError::Continuum(
                ContinuumError::InsufficientDataForFit { .. }
            ))
        ));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_report_serializes() {
        let spectrum = synthetic_spectrum(&CU_LINES, 0.0);
        let library = reference_library();
        let analyzer = SpectrumAnalyzer::new(&library, parameters());
        let report = analyzer.analyze(&spectrum).unwrap();
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["parameters"]["peak_height_cutoff"], 50.0);
        assert_eq!(value["screening"]["results"]["Cu"]["is_match"], true);

        let params: AnalysisParameters =
            serde_json::from_value(value["parameters"].clone()).unwrap();
        assert_eq!(params, parameters());
    }
}
