//! Reference emission line tables and the sources they are read from.
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::debug;
use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::text::reference_table_from_reader;

/// The classification of a reference line.
///
/// Every persistent line is also a strong line, so filtering a table for
/// [`LineType::Strong`] keeps all of its lines.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum LineType {
    /// `P`, the lines which persist as the element's concentration falls
    #[default]
    Persistent,
    /// `S`
    Strong,
}

impl LineType {
    /// The single letter code used in reference files
    pub const fn code(&self) -> char {
        match self {
            Self::Persistent => 'P',
            Self::Strong => 'S',
        }
    }

    /// Whether a line of type `line_type` passes a filter for `self`
    pub fn admits(&self, line_type: LineType) -> bool {
        match self {
            Self::Persistent => line_type == Self::Persistent,
            Self::Strong => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown line type {0:?}, expected P or S")]
pub struct LineTypeParseError(pub String);

impl FromStr for LineType {
    type Err = LineTypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "P" | "p" => Ok(Self::Persistent),
            "S" | "s" => Ok(Self::Strong),
            other => Err(LineTypeParseError(other.to_string())),
        }
    }
}

impl fmt::Display for LineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A known emission line of an element
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ReferenceLine {
    /// In nanometers
    pub wavelength: f64,
    pub line_type: LineType,
    pub ionization_state: u8,
}

impl ReferenceLine {
    pub fn new(wavelength: f64, line_type: LineType, ionization_state: u8) -> Self {
        Self {
            wavelength,
            line_type,
            ionization_state,
        }
    }
}

/// The reference lines of one element, sorted by wavelength
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ReferenceTable {
    symbol: String,
    lines: Vec<ReferenceLine>,
}

impl ReferenceTable {
    /// Create a table, sorting `lines` by wavelength
    pub fn new(symbol: impl Into<String>, mut lines: Vec<ReferenceLine>) -> Self {
        lines.sort_by(|a, b| a.wavelength.total_cmp(&b.wavelength));
        Self {
            symbol: symbol.into(),
            lines,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn lines(&self) -> &[ReferenceLine] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ReferenceLine> {
        self.lines.iter()
    }

    /// The lines admitted by `line_type`, still in wavelength order
    pub fn filtered(&self, line_type: LineType) -> Vec<ReferenceLine> {
        self.lines
            .iter()
            .filter(|line| line_type.admits(line.line_type))
            .copied()
            .collect()
    }
}

impl<'a> IntoIterator for &'a ReferenceTable {
    type Item = &'a ReferenceLine;
    type IntoIter = std::slice::Iter<'a, ReferenceLine>;

    fn into_iter(self) -> Self::IntoIter {
        self.lines.iter()
    }
}

#[derive(Debug, Error)]
pub enum ReferenceError {
    #[error("No reference data found for {0:?}")]
    ReferenceDataNotFound(String),
    #[error("Failed to read reference data: {0}")]
    Io(#[from] io::Error),
    #[error("Failed to parse reference data: {0}")]
    Csv(#[from] csv::Error),
    #[error("Malformed reference data for {symbol} at row {row}: {reason}")]
    Malformed {
        symbol: String,
        row: usize,
        reason: String,
    },
}

/// Anything reference tables can be looked up from by element symbol
pub trait ReferenceSource {
    fn lookup(&self, symbol: &str) -> Result<ReferenceTable, ReferenceError>;
}

impl<T: ReferenceSource + ?Sized> ReferenceSource for &T {
    fn lookup(&self, symbol: &str) -> Result<ReferenceTable, ReferenceError> {
        (**self).lookup(symbol)
    }
}

/// An in-memory collection of [`ReferenceTable`]s keyed by symbol
#[derive(Debug, Default, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ReferenceLibrary {
    tables: BTreeMap<String, ReferenceTable>,
}

impl ReferenceLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `table`, returning any table it replaced
    pub fn insert(&mut self, table: ReferenceTable) -> Option<ReferenceTable> {
        self.tables.insert(table.symbol().to_string(), table)
    }

    pub fn get(&self, symbol: &str) -> Option<&ReferenceTable> {
        self.tables.get(symbol)
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> + '_ {
        self.tables.keys().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl FromIterator<ReferenceTable> for ReferenceLibrary {
    fn from_iter<I: IntoIterator<Item = ReferenceTable>>(iter: I) -> Self {
        let mut library = Self::new();
        for table in iter {
            library.insert(table);
        }
        library
    }
}

impl ReferenceSource for ReferenceLibrary {
    fn lookup(&self, symbol: &str) -> Result<ReferenceTable, ReferenceError> {
        self.get(symbol)
            .cloned()
            .ok_or_else(|| ReferenceError::ReferenceDataNotFound(symbol.to_string()))
    }
}

/// A directory holding one `<symbol>.csv` file per element.
///
/// Files are read on every lookup. See [`reference_table_from_reader`] for the format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceDirectory {
    root: PathBuf,
}

impl ReferenceDirectory {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The file `symbol` would be read from, or `None` if `symbol` is not a plain
    /// identifier and so cannot name a file in this directory.
    pub fn path_for(&self, symbol: &str) -> Option<PathBuf> {
        let plain = !symbol.is_empty()
            && symbol
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_');
        plain.then(|| self.root.join(format!("{symbol}.csv")))
    }
}

impl ReferenceSource for ReferenceDirectory {
    fn lookup(&self, symbol: &str) -> Result<ReferenceTable, ReferenceError> {
        let path = self
            .path_for(symbol)
            .ok_or_else(|| ReferenceError::ReferenceDataNotFound(symbol.to_string()))?;
        let file = match fs::File::open(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(ReferenceError::ReferenceDataNotFound(symbol.to_string()))
            }
            Err(err) => return Err(err.into()),
        };
        debug!("Reading reference lines for {symbol} from {}", path.display());
        reference_table_from_reader(symbol, io::BufReader::new(file))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn copper() -> ReferenceTable {
        ReferenceTable::new(
            "Cu",
            vec![
                ReferenceLine::new(510.554, LineType::Persistent, 1),
                ReferenceLine::new(324.754, LineType::Persistent, 1),
                ReferenceLine::new(465.112, LineType::Strong, 1),
            ],
        )
    }

    #[test]
    fn test_table_is_sorted() {
        let table = copper();
        let wavelengths: Vec<f64> = table.iter().map(|l| l.wavelength).collect();
        assert_eq!(wavelengths, vec![324.754, 465.112, 510.554]);
    }

    #[test]
    fn test_line_type_filter() {
        let table = copper();
        assert_eq!(table.filtered(LineType::Persistent).len(), 2);
        assert_eq!(table.filtered(LineType::Strong).len(), 3);
        assert!(table
            .filtered(LineType::Persistent)
            .iter()
            .all(|l| l.line_type == LineType::Persistent));
    }

    #[test]
    fn test_parse_line_type() {
        assert_eq!("P".parse::<LineType>(), Ok(LineType::Persistent));
        assert_eq!(" S ".parse::<LineType>(), Ok(LineType::Strong));
        assert!("X".parse::<LineType>().is_err());
        assert_eq!(LineType::Strong.to_string(), "S");
    }

    #[test]
    fn test_library_lookup() {
        let library: ReferenceLibrary = [copper()].into_iter().collect();
        assert_eq!(library.lookup("Cu").unwrap(), copper());
        assert!(matches!(
            library.lookup("Fe"),
            Err(ReferenceError::ReferenceDataNotFound(s)) if s == "Fe"
        ));
    }

    #[test]
    fn test_directory_lookup() {
        let directory = ReferenceDirectory::new("test/data/reference");
        let table = directory.lookup("Cu").unwrap();
        assert_eq!(table.symbol(), "Cu");
        assert!(!table.is_empty());
        assert!(table.lines().windows(2).all(|w| w[0].wavelength <= w[1].wavelength));

        assert!(matches!(
            directory.lookup("Xx"),
            Err(ReferenceError::ReferenceDataNotFound(_))
        ));
        assert!(matches!(
            directory.lookup("../Cu"),
            Err(ReferenceError::ReferenceDataNotFound(_))
        ));
        assert!(directory.path_for("").is_none());
    }

    #[test]
    fn test_directory_malformed() {
        let directory = ReferenceDirectory::new("test/data/reference");
        assert!(matches!(
            directory.lookup("Broken"),
            Err(ReferenceError::Malformed { row: 2, .. })
        ));
    }
}
