//! Synthetic spectra and reference tables shared by the unit tests
use crate::arrayops::gridspace;
use crate::reference::{LineType, ReferenceLibrary, ReferenceLine, ReferenceTable};
use crate::spectrum::Spectrum;

pub const CU_LINES: [f64; 5] = [324.754, 327.396, 465.112, 510.554, 515.324];
pub const FE_LINES: [f64; 6] = [344.061, 358.119, 371.994, 373.486, 385.991, 404.581];
pub const AL_LINES: [f64; 4] = [308.215, 309.271, 394.401, 396.152];

/// The lines tabulated as strong rather than persistent
const STRONG_LINES: [f64; 2] = [465.112, 404.581];

const START: f64 = 300.0;
const STEP: f64 = 0.05;
const END: f64 = 550.0;
const LINE_WIDTH: f64 = 0.08;

/// A small deterministic generator for noise in `[-1, 1)`
struct Noise(u64);

impl Noise {
    fn next(&mut self) -> f64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        ((self.0 >> 33) as f64 / (1u64 << 31) as f64) * 2.0 - 1.0
    }
}

/// A 300-550 nm spectrum sampled every 0.05 nm with a gaussian emission line at each of
/// `lines`, unit amplitude noise and a gently curved continuum of height `continuum`.
pub fn synthetic_spectrum(lines: &[f64], continuum: f32) -> Spectrum {
    let mut noise = Noise(7);
    let continuum = continuum as f64;
    let amplitudes: Vec<f64> = (0..lines.len())
        .map(|k| 150.0 + 50.0 * (k % 4) as f64)
        .collect();

    Spectrum::from_pairs(gridspace(START, END, STEP).into_iter().map(|x| {
        let curve = (x - 425.0) / 125.0;
        let mut y = continuum * (1.0 + 0.8 * curve * curve) + noise.next();
        for (center, amplitude) in lines.iter().zip(amplitudes.iter()) {
            let z = (x - center) / LINE_WIDTH;
            y += amplitude * (-0.5 * z * z).exp();
        }
        (x, y as f32)
    }))
    .unwrap()
}

fn table(symbol: &str, lines: &[f64]) -> ReferenceTable {
    ReferenceTable::new(
        symbol,
        lines
            .iter()
            .map(|w| {
                let line_type = if STRONG_LINES.contains(w) {
                    LineType::Strong
                } else {
                    LineType::Persistent
                };
                ReferenceLine::new(*w, line_type, 1)
            })
            .collect(),
    )
}

pub fn reference_library() -> ReferenceLibrary {
    [
        table("Cu", &CU_LINES),
        table("Fe", &FE_LINES),
        table("Al", &AL_LINES),
    ]
    .into_iter()
    .collect()
}
