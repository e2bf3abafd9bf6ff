use num_traits::{Float, ToPrimitive};

/// Build an evenly spaced axis from `start` up to, but not including, `end`
pub fn gridspace<T: Float + ToPrimitive>(start: T, end: T, step: T) -> Vec<T> {
    let distance = end - start;
    let steps = (distance / step).to_usize().unwrap_or_default();
    let mut result = Vec::with_capacity(steps);
    for i in 0..steps {
        result.push(start + T::from(i).unwrap() * step);
    }
    result
}

/// Check if the values in `it` are monotonically ascending or flat.
///
/// Returns the index of the first value that is lower than its predecessor,
/// or which cannot be compared with it (NaN).
pub fn first_descending<F: PartialOrd>(it: &[F]) -> Option<usize> {
    it.windows(2)
        .position(|w| !(w[0] <= w[1]))
        .map(|i| i + 1)
}

/// Check if the values in `it` are monotonically ascending or flat
pub fn is_increasing<F: PartialOrd>(it: &[F]) -> bool {
    first_descending(it).is_none()
}

pub fn minmax<T: Float>(values: &[T]) -> (T, T) {
    let mut max = -T::infinity();
    let mut min = T::infinity();

    for v in values.iter() {
        if *v > max {
            max = *v;
        }
        if *v < min {
            min = *v
        }
    }
    (min, max)
}
