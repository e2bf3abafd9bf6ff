pub use crate::arrayops::{first_descending, gridspace, is_increasing, minmax};
pub use crate::peak_picker::{find_peaks, find_valleys};
pub use crate::reference::ReferenceSource;
pub use crate::text::{
    reference_table_from_reader, report_to_writer, spectrum_from_file, spectrum_from_reader,
    spectrum_to_writer,
};
