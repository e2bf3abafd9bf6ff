//! Reading and writing spectra, reference tables and screening results as delimited text.
use std::fs;
use std::io;
use std::io::prelude::*;
use std::path;

use log::{debug, warn};
use thiserror::Error;

use crate::reference::{LineType, ReferenceError, ReferenceLine, ReferenceTable};
use crate::screen::ScreeningReport;
use crate::spectrum::{Spectrum, SpectrumError};

#[derive(Debug, Error)]
pub enum TextError {
    #[error("An IO error occurred: {0}")]
    Io(#[from] io::Error),
    #[error("A delimited text error occurred: {0}")]
    Csv(#[from] csv::Error),
    #[error("Failed to parse row {row}: {reason}")]
    Parse { row: usize, reason: String },
    #[error(transparent)]
    Spectrum(#[from] SpectrumError),
}

/// Read a two column, comma separated spectrum. See [`spectrum_from_reader_with_delimiter`].
pub fn spectrum_from_reader<R: io::Read>(reader: R) -> Result<Spectrum, TextError> {
    spectrum_from_reader_with_delimiter(reader, b',')
}

/// Read a spectrum of wavelength and intensity columns separated by `delimiter`.
///
/// Lines starting with `#` are ignored, as is a first row in which neither of the first
/// two fields is a number, taken to be a header. Columns past the second are ignored.
/// Errors report rows counted from 1, after comments. The rows must
/// already be in ascending wavelength order, see [`Spectrum::from_unsorted`] otherwise.
pub fn spectrum_from_reader_with_delimiter<R: io::Read>(
    reader: R,
    delimiter: u8,
) -> Result<Spectrum, TextError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(delimiter)
        .flexible(true)
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut wavelength = Vec::new();
    let mut intensity = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record?;
        let row = i + 1;
        if record.iter().all(|field| field.is_empty()) {
            continue;
        }
        // A header names its columns, so none of them parse as numbers
        if i == 0 && record.iter().take(2).all(|field| field.parse::<f64>().is_err()) {
            debug!("Skipping header row {record:?}");
            continue;
        }
        let parsed = record
            .get(0)
            .zip(record.get(1))
            .ok_or_else(|| format!("expected 2 columns, found {}", record.len()))
            .and_then(|(w, i)| match (w.parse::<f64>(), i.parse::<f32>()) {
                (Ok(w), Ok(i)) => Ok((w, i)),
                _ => Err(format!("{w:?} and {i:?} are not numbers")),
            });
        match parsed {
            Ok((w, i)) => {
                wavelength.push(w);
                intensity.push(i);
            }
            Err(reason) => return Err(TextError::Parse { row, reason }),
        }
    }
    debug!("Read {} spectrum points", wavelength.len());
    Ok(Spectrum::new(wavelength, intensity)?)
}

pub fn spectrum_from_file<P: AsRef<path::Path>>(path: P) -> Result<Spectrum, TextError> {
    let path = path.as_ref();
    let delimiter = match path.extension().and_then(|e| e.to_str()) {
        Some("tsv") | Some("txt") => b'\t',
        _ => b',',
    };
    let file = fs::File::open(path)?;
    spectrum_from_reader_with_delimiter(io::BufReader::new(file), delimiter)
}

/// Write `spectrum` as tab separated wavelength and intensity, one sample per line
pub fn spectrum_to_writer<W: io::Write>(spectrum: &Spectrum, writer: W) -> Result<(), TextError> {
    let mut writer = io::BufWriter::new(writer);
    for (wavelength, intensity) in spectrum.iter() {
        writeln!(writer, "{wavelength}\t{intensity}")?;
    }
    writer.flush()?;
    Ok(())
}

pub fn spectrum_to_file<P: AsRef<path::Path>>(spectrum: &Spectrum, path: P) -> Result<(), TextError> {
    let file = fs::File::create(path)?;
    spectrum_to_writer(spectrum, file)
}

fn find_column(headers: &csv::StringRecord, names: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|h| names.iter().any(|name| h.eq_ignore_ascii_case(name)))
}

/// Read the reference lines of `symbol` from comma separated text.
///
/// The header must name `Line_type` (`P` or `S`), `Wavelength` in nanometers and
/// `Ionisation_state` (or `Ionization_state`), in any order and any case. Rows
/// need not be sorted. Malformed rows are reported by their 1-based position after
/// the header.
pub fn reference_table_from_reader<R: io::Read>(
    symbol: &str,
    reader: R,
) -> Result<ReferenceTable, ReferenceError> {
    let malformed = |row: usize, reason: String| ReferenceError::Malformed {
        symbol: symbol.to_string(),
        row,
        reason,
    };

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = reader.headers()?.clone();
    let line_type_col = find_column(&headers, &["line_type"])
        .ok_or_else(|| malformed(0, "missing the Line_type column".into()))?;
    let wavelength_col = find_column(&headers, &["wavelength"])
        .ok_or_else(|| malformed(0, "missing the Wavelength column".into()))?;
    let ionization_col = find_column(&headers, &["ionisation_state", "ionization_state"])
        .ok_or_else(|| malformed(0, "missing the Ionisation_state column".into()))?;

    let mut lines = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record?;
        let row = i + 1;
        let field = |col: usize| record.get(col).unwrap_or_default();

        let line_type: LineType = field(line_type_col)
            .parse()
            .map_err(|e| malformed(row, format!("{e}")))?;
        let wavelength: f64 = field(wavelength_col)
            .parse()
            .ok()
            .filter(|w: &f64| w.is_finite())
            .ok_or_else(|| {
                malformed(row, format!("invalid wavelength {:?}", field(wavelength_col)))
            })?;
        let ionization_state: u8 = field(ionization_col).parse().map_err(|_| {
            malformed(
                row,
                format!("invalid ionization state {:?}", field(ionization_col)),
            )
        })?;
        lines.push(ReferenceLine::new(wavelength, line_type, ionization_state));
    }
    if lines.is_empty() {
        warn!("No reference lines found for {symbol}");
    }
    Ok(ReferenceTable::new(symbol, lines))
}

/// Write one tab separated row per matched line of each detected element in `report`
pub fn report_to_writer<W: io::Write>(
    report: &ScreeningReport,
    writer: W,
) -> Result<(), TextError> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_writer(writer);
    writer.write_record([
        "element",
        "peak_wavelength",
        "intensity",
        "standard_wavelength",
        "ionization_state",
    ])?;
    for (symbol, record) in report.matched_rows() {
        writer.write_record([
            symbol.to_string(),
            record.peak.wavelength.to_string(),
            record.peak.intensity.to_string(),
            record.standard_wavelength.to_string(),
            record.ionization_state.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}
