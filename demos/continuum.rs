use std::{env, io};

use libsid::{
    remove_continuum_by_section, segment_points,
    text::{spectrum_from_file, spectrum_to_writer},
    ContinuumEstimator,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let path = env::args().nth(1).unwrap();
    let degree: usize = env::args().nth(2).unwrap_or_else(|| "9".to_string()).parse()?;
    let max_points: Option<usize> = env::args().nth(3).map(|s| s.parse()).transpose()?;

    let spectrum = spectrum_from_file(&path)?;
    let estimator = ContinuumEstimator::new(degree);

    let removed = match max_points {
        Some(max_points) => {
            let splits = segment_points(&spectrum, max_points);
            eprintln!("Sections split at: {splits:?}");
            remove_continuum_by_section(&spectrum, &splits, &estimator)?
        }
        None => {
            let removal = estimator.remove_with_baseline(&spectrum)?;
            eprintln!("Continuum coefficients: {:?}", removal.continuum.coefficients());
            removal.spectrum
        }
    };
    spectrum_to_writer(&removed, &mut io::stdout().lock())?;
    Ok(())
}
