use std::ops::Range;

use num_traits::Float;

/// Find the first position in the sorted `array` whose value is not less than `q`
pub fn binsearch<T: Float>(array: &[T], q: T) -> usize {
    array.partition_point(|x| *x < q)
}

/// Find the index of the value in the sorted `vec` closest to `target_val`.
///
/// Ties resolve to the lower index. Returns `None` for an empty slice.
pub fn nearest<T: Float>(vec: &[T], target_val: T) -> Option<usize> {
    let n = vec.len();
    if n == 0 {
        return None;
    }
    let near = binsearch(vec, target_val);
    if near == 0 {
        Some(0)
    } else if near >= n {
        Some(n - 1)
    } else {
        let below = target_val - vec[near - 1];
        let above = vec[near] - target_val;
        if below <= above {
            Some(near - 1)
        } else {
            Some(near)
        }
    }
}

/// Find the index range of the values in the sorted `array` lying in the closed interval `[lo, hi]`
pub fn find_between<T: Float>(array: &[T], lo: T, hi: T) -> Range<usize> {
    let start = binsearch(array, lo);
    let end = array.partition_point(|x| *x <= hi);
    if end < start {
        start..start
    } else {
        start..end
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_nearest() {
        let axis = [300.0, 300.5, 301.0, 301.5];
        assert_eq!(nearest(&axis, 299.0), Some(0));
        assert_eq!(nearest(&axis, 300.6), Some(1));
        assert_eq!(nearest(&axis, 300.9), Some(2));
        assert_eq!(nearest(&axis, 300.75), Some(1));
        assert_eq!(nearest(&axis, 305.0), Some(3));
        assert_eq!(nearest::<f64>(&[], 1.0), None);
    }

    #[test]
    fn test_find_between() {
        let axis = [300.0, 300.5, 301.0, 301.5];
        assert_eq!(find_between(&axis, 300.5, 301.0), 1..3);
        assert_eq!(find_between(&axis, 300.1, 300.2), 1..1);
        assert_eq!(find_between(&axis, 299.0, 310.0), 0..4);
        assert_eq!(find_between(&axis, 301.0, 300.0), 2..2);
    }
}
