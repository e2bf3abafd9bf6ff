use num_traits::{Float, FromPrimitive};

pub fn _isclose<T>(x: T, y: T, rtol: T, atol: T) -> bool
where
    T: Float,
{
    (x - y).abs() <= (atol + rtol * y.abs())
}

pub fn isclose<T>(x: T, y: T) -> bool
where
    T: Float + FromPrimitive,
{
    _isclose(x, y, T::from_f64(1e-5).unwrap(), T::from_f64(1e-8).unwrap())
}

pub fn aboutzero<T>(x: T) -> bool
where
    T: Float + FromPrimitive,
{
    isclose(x, T::zero())
}

/// How far (nm) from the apex the width search may walk before giving up
const MAX_WIDTH: f64 = 1.5;

#[derive(Default, Debug, Clone)]
pub struct WidthFit {
    pub right_width: f64,
    pub left_width: f64,
    pub full_width_at_half_max: f64,
}

/// Locate the wavelength where the left side of the peak at `data_index` crosses half of
/// the apex intensity
pub fn fit_rising_side_width(
    wavelength_array: &[f64],
    intensity_array: &[f32],
    data_index: usize,
) -> f64 {
    let peak = intensity_array[data_index];
    let peak_half = peak / 2.0;
    let apex = wavelength_array[data_index];
    let mut last_y1 = peak;

    if peak <= 0.0 {
        return apex;
    }

    for index in (0..data_index).rev() {
        let y1 = intensity_array[index];
        let x1 = wavelength_array[index];
        if y1 < peak_half {
            let y2 = intensity_array[index + 1];
            let x2 = wavelength_array[index + 1];
            if aboutzero(y2 - y1) {
                return x1;
            }
            // Linear interpolation of the half-max crossing
            return x1 + (x2 - x1) * ((peak_half - y1) / (y2 - y1)) as f64;
        }
        // The signal rises again before reaching half height, or the peak is implausibly wide
        if y1 > last_y1 || (apex - x1).abs() > MAX_WIDTH {
            return wavelength_array[index + 1];
        }
        last_y1 = y1;
    }
    wavelength_array[0]
}

/// Locate the wavelength where the right side of the peak at `data_index` crosses half of
/// the apex intensity
pub fn fit_falling_side_width(
    wavelength_array: &[f64],
    intensity_array: &[f32],
    data_index: usize,
) -> f64 {
    let peak = intensity_array[data_index];
    let peak_half = peak / 2.0;
    let apex = wavelength_array[data_index];
    let n = wavelength_array.len() - 1;
    let mut last_y1 = peak;

    if peak <= 0.0 {
        return apex;
    }

    for index in (data_index + 1)..=n {
        let y1 = intensity_array[index];
        let x1 = wavelength_array[index];
        if y1 < peak_half {
            let y2 = intensity_array[index - 1];
            let x2 = wavelength_array[index - 1];
            if aboutzero(y2 - y1) {
                return x1;
            }
            return x1 - (x1 - x2) * ((peak_half - y1) / (y2 - y1)) as f64;
        }
        if y1 > last_y1 || (x1 - apex).abs() > MAX_WIDTH {
            return wavelength_array[index - 1];
        }
        last_y1 = y1;
    }
    wavelength_array[n]
}

/// Estimate the full width at half maximum of the peak whose apex is at `data_index`.
///
/// Each side is found independently, so asymmetric peaks report their left and right
/// half widths separately.
pub fn full_width_at_half_max(
    wavelength_array: &[f64],
    intensity_array: &[f32],
    data_index: usize,
) -> WidthFit {
    let mut fit = WidthFit::default();
    let n = wavelength_array.len();
    if n == 0 || data_index >= n || intensity_array.len() != n {
        return fit;
    }

    let apex = wavelength_array[data_index];
    if aboutzero(intensity_array[data_index]) {
        return fit;
    }

    let rising_side = fit_rising_side_width(wavelength_array, intensity_array, data_index);
    fit.left_width = (apex - rising_side).abs();

    let falling_side = fit_falling_side_width(wavelength_array, intensity_array, data_index);
    fit.right_width = (falling_side - apex).abs();

    fit.full_width_at_half_max = fit.left_width + fit.right_width;
    fit
}

/// Fit a parabola through the apex at `index` and its two neighbors, returning the
/// wavelength of its vertex.
pub fn quadratic_fit(wavelength_array: &[f64], intensity_array: &[f32], index: usize) -> f64 {
    let n = wavelength_array.len() - 1;
    if index < 1 {
        wavelength_array[0]
    } else if index >= n {
        wavelength_array[n]
    } else {
        let x1 = wavelength_array[index - 1];
        let x2 = wavelength_array[index];
        let x3 = wavelength_array[index + 1];
        let y1 = intensity_array[index - 1] as f64;
        let y2 = intensity_array[index] as f64;
        let y3 = intensity_array[index + 1] as f64;
        let d = (y2 - y1) * (x3 - x2) - (y3 - y2) * (x2 - x1);
        if aboutzero(d) {
            x2
        } else {
            ((x1 + x2) - ((y2 - y1) * (x3 - x2) * (x1 - x3)) / d) / 2.0
        }
    }
}
