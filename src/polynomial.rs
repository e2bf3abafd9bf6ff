//! Polynomial evaluation and least squares polynomial regression.
//!
//! Fitting is delegated to whichever linear algebra backend is enabled, `nalgebra`
//! by default or `ndarray-linalg` when one of the LAPACK features is selected.

use cfg_if::cfg_if;
use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::arrayops::minmax;

/// The coefficients a fit starts from before refinement
const INITIAL_COEFFICIENT: f64 = 1.0;
/// Singular values at or below this are treated as zero by the least squares solver
const SINGULAR_VALUE_CUTOFF: f64 = 1e-14;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PolynomialFitError {
    #[error("{points} points cannot determine {terms} polynomial terms")]
    InsufficientData { points: usize, terms: usize },
    #[error("The x and y arrays do not match in length ({0} != {1})")]
    MismatchedLengths(usize, usize),
    #[error("The fit did not converge after {0} iterations")]
    DidNotConverge(usize),
    #[error("Failed to solve for coefficients: {0}")]
    FailedToSolveCoefficients(&'static str),
}

/// A polynomial in a scaled variable.
///
/// The input `x` is mapped linearly from `domain` onto `[-1, 1]` before the power series
/// in `coefficients` (lowest order first) is evaluated. This keeps high degree fits over
/// narrow, offset ranges like 350-450 nm numerically well behaved.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Polynomial {
    coefficients: Vec<f64>,
    domain: (f64, f64),
}

impl Polynomial {
    /// A polynomial in `x` itself
    pub fn new(coefficients: Vec<f64>) -> Self {
        Self::with_domain(coefficients, (-1.0, 1.0))
    }

    pub fn with_domain(coefficients: Vec<f64>, domain: (f64, f64)) -> Self {
        Self {
            coefficients,
            domain,
        }
    }

    pub fn order(&self) -> usize {
        self.coefficients.len().saturating_sub(1)
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    pub fn domain(&self) -> (f64, f64) {
        self.domain
    }

    pub fn iter(&self) -> std::slice::Iter<'_, f64> {
        self.coefficients.iter()
    }

    #[inline]
    fn scale(&self, x: f64) -> f64 {
        let (lo, hi) = self.domain;
        if hi == lo {
            x - lo
        } else {
            (2.0 * x - (lo + hi)) / (hi - lo)
        }
    }

    /// Evaluate the polynomial at `x`
    pub fn evaluate(&self, x: f64) -> f64 {
        let u = self.scale(x);
        self.coefficients
            .iter()
            .rev()
            .fold(0.0, |acc, c| acc * u + *c)
    }

    /// Evaluate the polynomial at each of `values`
    pub fn eval(&self, values: &[f64]) -> Vec<f64> {
        values.iter().map(|v| self.evaluate(*v)).collect()
    }
}

impl AsRef<[f64]> for Polynomial {
    fn as_ref(&self) -> &[f64] {
        &self.coefficients
    }
}

/// The outcome of a [`PolynomialFitter`] run
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PolynomialFit {
    pub polynomial: Polynomial,
    /// The number of refinement iterations run
    pub iterations: usize,
    pub residual_sum_of_squares: f64,
}

/// Least squares polynomial regression of a fixed degree.
///
/// Every coefficient starts at 1.0 and is refined with Gauss-Newton steps, each solved
/// by SVD, until a step changes the coefficients by less than `tolerance` relative to
/// their magnitude. The model is linear in its coefficients so this normally settles
/// within two iterations, but a fit which produces non-finite coefficients or keeps
/// moving for `max_iterations` is reported as not converged rather than returned.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PolynomialFitter {
    pub degree: usize,
    pub max_iterations: usize,
    pub tolerance: f64,
}

impl Default for PolynomialFitter {
    fn default() -> Self {
        Self {
            degree: 9,
            max_iterations: 100,
            tolerance: 1e-10,
        }
    }
}

impl PolynomialFitter {
    pub fn new(degree: usize) -> Self {
        Self {
            degree,
            ..Self::default()
        }
    }

    pub fn degree(mut self, degree: usize) -> Self {
        self.degree = degree;
        self
    }

    pub fn max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub const fn terms(&self) -> usize {
        self.degree + 1
    }

    /// Fit a polynomial through the points `(x[i], y[i])`
    pub fn fit(&self, x: &[f64], y: &[f64]) -> Result<PolynomialFit, PolynomialFitError> {
        if x.len() != y.len() {
            return Err(PolynomialFitError::MismatchedLengths(x.len(), y.len()));
        }
        let terms = self.terms();
        if x.len() < terms {
            return Err(PolynomialFitError::InsufficientData {
                points: x.len(),
                terms,
            });
        }

        let domain = minmax(x);
        let scaled_x: Vec<f64> = {
            let scaler = Polynomial::with_domain(Vec::new(), domain);
            x.iter().map(|v| scaler.scale(*v)).collect()
        };

        let (coefficients, iterations) = self.solve(&scaled_x, y)?;
        let polynomial = Polynomial::with_domain(coefficients, domain);
        let residual_sum_of_squares = x
            .iter()
            .zip(y.iter())
            .map(|(xi, yi)| (yi - polynomial.evaluate(*xi)).powi(2))
            .sum();
        log::trace!(
            "Fit degree {} polynomial to {} points in {iterations} iterations, RSS = {residual_sum_of_squares:0.3}",
            self.degree,
            x.len()
        );
        Ok(PolynomialFit {
            polynomial,
            iterations,
            residual_sum_of_squares,
        })
    }

    fn has_converged(&self, step_norm: f64, coefficient_norm: f64) -> bool {
        step_norm <= self.tolerance * (coefficient_norm + self.tolerance)
    }

    fn solve(&self, x: &[f64], y: &[f64]) -> Result<(Vec<f64>, usize), PolynomialFitError> {
        cfg_if! {
            if #[cfg(feature = "ndarray-linalg")] {
                return self.solve_ndarray(x, y);
            } else if #[cfg(feature = "nalgebra")] {
                return self.solve_nalgebra(x, y);
            }
        }
    }

    #[cfg(feature = "ndarray-linalg")]
    fn solve_ndarray(&self, x: &[f64], y: &[f64]) -> Result<(Vec<f64>, usize), PolynomialFitError> {
        use ndarray::{Array1, Array2};
        use ndarray_linalg::LeastSquaresSvd;

        let terms = self.terms();
        let system = Array2::<f64>::from_shape_fn((x.len(), terms), |(i, j)| x[i].powi(j as i32));
        let observed = Array1::from(y.to_vec());
        let mut coefficients = Array1::<f64>::from_elem(terms, INITIAL_COEFFICIENT);

        for iteration in 1..=self.max_iterations {
            let residuals = &observed - &system.dot(&coefficients);
            let step = match system.least_squares(&residuals) {
                Ok(result) => result.solution,
                Err(_) => {
                    return Err(PolynomialFitError::FailedToSolveCoefficients(
                        "least squares solve failed",
                    ))
                }
            };
            coefficients += &step;
            if coefficients.iter().any(|c| !c.is_finite()) {
                return Err(PolynomialFitError::DidNotConverge(iteration));
            }
            if self.has_converged(step.dot(&step).sqrt(), coefficients.dot(&coefficients).sqrt()) {
                return Ok((coefficients.to_vec(), iteration));
            }
        }
        Err(PolynomialFitError::DidNotConverge(self.max_iterations))
    }

    #[cfg(feature = "nalgebra")]
    fn solve_nalgebra(&self, x: &[f64], y: &[f64]) -> Result<(Vec<f64>, usize), PolynomialFitError> {
        use nalgebra::{DMatrix, DVector};

        let terms = self.terms();
        let system = DMatrix::<f64>::from_fn(x.len(), terms, |i, j| x[i].powi(j as i32));
        let observed = DVector::from_column_slice(y);
        let mut coefficients = DVector::<f64>::from_element(terms, INITIAL_COEFFICIENT);

        // Derived from https://github.com/strawlab/lstsq
        let decomp = nalgebra::linalg::SVD::new(system.clone(), true, true);

        for iteration in 1..=self.max_iterations {
            let residuals = &observed - &system * &coefficients;
            let step = decomp
                .solve(&residuals, SINGULAR_VALUE_CUTOFF)
                .map_err(PolynomialFitError::FailedToSolveCoefficients)?;
            coefficients += &step;
            if coefficients.iter().any(|c| !c.is_finite()) {
                return Err(PolynomialFitError::DidNotConverge(iteration));
            }
            if self.has_converged(step.norm(), coefficients.norm()) {
                return Ok((coefficients.iter().copied().collect(), iteration));
            }
        }
        Err(PolynomialFitError::DidNotConverge(self.max_iterations))
    }
}
