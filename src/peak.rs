use std::cmp::Ordering;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
/// A [`Peak`] is a local intensity maximum picked from a [`Spectrum`](crate::Spectrum),
/// located by its wavelength in nanometers.
pub struct Peak {
    pub wavelength: f64,
    pub intensity: f32,
    /// The position of the apex sample in the source spectrum
    pub index: u32,

    /// A symmetric average peak shape parameter, zero when it was not estimated
    pub full_width_at_half_max: f32,
}

impl Peak {
    pub fn new(wavelength: f64, intensity: f32, index: u32) -> Self {
        Self {
            wavelength,
            intensity,
            index,
            full_width_at_half_max: 0.0,
        }
    }

    pub fn with_width(mut self, full_width_at_half_max: f32) -> Self {
        self.full_width_at_half_max = full_width_at_half_max;
        self
    }

    /// Order two peaks by wavelength, placing NaN last
    pub fn wavelength_cmp(&self, other: &Self) -> Ordering {
        self.wavelength.total_cmp(&other.wavelength)
    }
}

impl From<(f64, f32)> for Peak {
    fn from(value: (f64, f32)) -> Self {
        Self::new(value.0, value.1, 0)
    }
}

impl fmt::Display for Peak {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Peak({}, {}, {}, {})",
            self.wavelength, self.intensity, self.index, self.full_width_at_half_max
        )
    }
}

/// Sort `peaks` by wavelength and drop peaks sharing a wavelength with an earlier one,
/// keeping the more intense of the two.
///
/// Peak lists produced by [`PeakPicker`](crate::PeakPicker) are already in this form.
pub fn normalize_peaks(mut peaks: Vec<Peak>) -> Vec<Peak> {
    peaks.retain(|p| p.wavelength.is_finite());
    peaks.sort_by(|a, b| {
        a.wavelength_cmp(b)
            .then_with(|| b.intensity.total_cmp(&a.intensity))
    });
    peaks.dedup_by(|next, kept| next.wavelength == kept.wavelength);
    peaks
}
