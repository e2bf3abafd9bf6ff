use std::{env, io};

use libsid::{
    text::{report_to_writer, spectrum_from_file},
    AnalysisParameters, ContinuumEstimator, ReferenceDirectory, SpectrumAnalyzer,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let path = env::args().nth(1).unwrap();
    let reference_root = env::args().nth(2).unwrap_or_else(|| "test/data/reference".to_string());
    let cutoff: f32 = env::args().nth(3).unwrap_or_else(|| "0".to_string()).parse()?;
    let degree: usize = env::args().nth(4).unwrap_or_else(|| "0".to_string()).parse()?;

    let spectrum = spectrum_from_file(&path)?;
    let directory = ReferenceDirectory::new(reference_root);

    let parameters = AnalysisParameters::default()
        .peak_height_cutoff(cutoff)
        .continuum((degree > 0).then(|| ContinuumEstimator::new(degree)));
    let report = SpectrumAnalyzer::new(&directory, parameters).analyze(&spectrum)?;

    eprintln!(
        "{} peaks, detected {:?}",
        report.peaks.len(),
        report.detected_elements()
    );
    for (symbol, err) in report.screening.errors.iter() {
        eprintln!("{symbol}: {err}");
    }
    report_to_writer(&report.screening, &mut io::stdout().lock())?;
    Ok(())
}
