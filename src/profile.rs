//! Investment-profile builder: a handful of optimizer-controlled poles
//! expanded into a dense annual curve by natural cubic spline evaluation.
//!
//! The map from poles to curve is linear, so it is captured once as a
//! basis matrix whose columns are the splines of unit pole vectors. The
//! matrix doubles as the jacobian block handed to external adjoint
//! machinery, and is memoized per `(pole count, target length)` pair since
//! it depends on nothing else.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

use crate::error::BalanceError;
use crate::series::{TimeSeries, YearSpan};

/// Dense row-major matrix mapping pole perturbations to curve perturbations.
#[derive(Debug, Clone, PartialEq)]
pub struct BasisMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl BasisMatrix {
    /// Builds a matrix from row-major data.
    ///
    /// # Panics
    ///
    /// Panics if `data.len() != rows * cols`.
    pub(crate) fn from_raw(rows: usize, cols: usize, data: Vec<f64>) -> Self {
        assert_eq!(data.len(), rows * cols, "row-major data must fill the matrix");
        Self { rows, cols, data }
    }

    /// Number of rows (dense curve length).
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns (pole count).
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Entry at `(row, col)`.
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols + col]
    }

    /// Matrix-vector product `B · v`.
    ///
    /// # Panics
    ///
    /// Panics if `v.len()` differs from the column count.
    pub fn mul_vec(&self, v: &[f64]) -> Vec<f64> {
        assert_eq!(v.len(), self.cols, "basis matrix operand must match pole count");
        let mut out = vec![0.0; self.rows];
        for (row, slot) in out.iter_mut().enumerate() {
            let offset = row * self.cols;
            *slot = self.data[offset..offset + self.cols]
                .iter()
                .zip(v)
                .map(|(b, x)| b * x)
                .sum();
        }
        out
    }
}

/// A built investment profile: poles, dense curve, and the basis matrix
/// linking them.
#[derive(Debug, Clone)]
pub struct InvestmentProfile {
    poles: Vec<f64>,
    curve: Vec<f64>,
    basis: Arc<BasisMatrix>,
}

impl InvestmentProfile {
    /// The dense annual curve.
    pub fn curve(&self) -> &[f64] {
        &self.curve
    }

    /// The control values this profile was built from.
    pub fn poles(&self) -> &[f64] {
        &self.poles
    }

    /// The linear map from poles to curve (jacobian block for the adjoint).
    pub fn basis(&self) -> &BasisMatrix {
        &self.basis
    }

    /// Export-at-poles mode: the representative samples of the dense curve
    /// at the pole positions, for compact storage or display.
    pub fn at_poles(&self) -> Vec<f64> {
        // Infallible: the curve is at least as long as the pole set.
        sample_at_poles(&self.curve, self.poles.len()).unwrap_or_else(|_| self.poles.clone())
    }

    /// Views the dense curve as a [`TimeSeries`] over `span`.
    ///
    /// # Errors
    ///
    /// Returns [`BalanceError::ShapeMismatch`] when `span` does not cover
    /// exactly one year per curve sample.
    pub fn to_series(&self, span: YearSpan) -> Result<TimeSeries, BalanceError> {
        if span.len != self.curve.len() {
            return Err(BalanceError::ShapeMismatch {
                what: "investment profile".to_string(),
                expected: format!("{} years", self.curve.len()),
                actual: format!("{} years ({span})", span.len),
            });
        }
        Ok(TimeSeries::new(span.start_year, self.curve.clone()))
    }
}

/// Builds the dense curve through `poles` at `target_length` samples.
///
/// The poles are control values at evenly-spaced positions spanning `[0, 1]`;
/// the curve is the natural cubic spline through them, evaluated on the
/// uniform `target_length` grid. Interpolation at the nodes is exact, so
/// `build(poles, poles.len())` reproduces `poles`.
///
/// # Errors
///
/// * [`BalanceError::EmptyPoles`] for an empty pole set.
/// * [`BalanceError::InvalidProfileLength`] when `target_length < poles.len()`.
pub fn build(poles: &[f64], target_length: usize) -> Result<InvestmentProfile, BalanceError> {
    let basis = basis_matrix(poles.len(), target_length)?;
    let curve = basis.mul_vec(poles);
    Ok(InvestmentProfile {
        poles: poles.to_vec(),
        curve,
        basis,
    })
}

/// Returns the memoized basis matrix for `(pole_count, target_length)`.
///
/// The cache is shared read-only across evaluations; entries are pure
/// functions of the key and never mutated after insertion.
///
/// # Errors
///
/// Same contract as [`build`].
pub fn basis_matrix(
    pole_count: usize,
    target_length: usize,
) -> Result<Arc<BasisMatrix>, BalanceError> {
    if pole_count == 0 {
        return Err(BalanceError::EmptyPoles);
    }
    if target_length < pole_count {
        return Err(BalanceError::InvalidProfileLength {
            pole_count,
            target_length,
        });
    }

    static CACHE: OnceLock<Mutex<HashMap<(usize, usize), Arc<BasisMatrix>>>> = OnceLock::new();
    let cache = CACHE.get_or_init(|| Mutex::new(HashMap::new()));

    let key = (pole_count, target_length);
    if let Ok(guard) = cache.lock()
        && let Some(hit) = guard.get(&key)
    {
        return Ok(Arc::clone(hit));
    }

    let fresh = Arc::new(compute_basis(pole_count, target_length));
    match cache.lock() {
        // A concurrent builder may have raced us here; duplicate work is
        // the accepted worst case, corruption is not possible.
        Ok(mut guard) => Ok(Arc::clone(guard.entry(key).or_insert(fresh))),
        Err(_) => Ok(fresh),
    }
}

/// Coefficient-weighted sum of analyst-authored base curves.
///
/// Linear in its coefficients, which is what lets an optimizer blend a few
/// trajectories instead of controlling poles directly.
///
/// # Errors
///
/// * [`BalanceError::NothingToCombine`] for an empty part list (the output
///   span would be unknowable).
/// * [`BalanceError::ShapeMismatch`] when base curves disagree on spans.
pub fn combine(parts: &[(f64, TimeSeries)]) -> Result<TimeSeries, BalanceError> {
    let Some((first_coeff, first_curve)) = parts.first() else {
        return Err(BalanceError::NothingToCombine);
    };
    let mut total = first_curve.scaled(*first_coeff);
    for (coefficient, curve) in &parts[1..] {
        total = total.plus(&curve.scaled(*coefficient))?;
    }
    Ok(total)
}

/// Samples a dense curve at `pole_count` evenly-spaced representative
/// positions (export-at-poles mode for curves not built from poles).
///
/// # Errors
///
/// * [`BalanceError::EmptyPoles`] when `pole_count` is zero.
/// * [`BalanceError::InvalidProfileLength`] when the curve is shorter than
///   the pole set.
pub fn sample_at_poles(curve: &[f64], pole_count: usize) -> Result<Vec<f64>, BalanceError> {
    if pole_count == 0 {
        return Err(BalanceError::EmptyPoles);
    }
    if curve.len() < pole_count {
        return Err(BalanceError::InvalidProfileLength {
            pole_count,
            target_length: curve.len(),
        });
    }
    if pole_count == 1 {
        return Ok(vec![curve[0]]);
    }
    let last = curve.len() - 1;
    Ok((0..pole_count)
        .map(|j| {
            let position = (j * last) as f64 / (pole_count - 1) as f64;
            curve[position.round() as usize]
        })
        .collect())
}

/// Evaluates the spline basis: column `j` is the natural cubic spline
/// through the `j`-th unit pole vector, sampled on the target grid.
fn compute_basis(pole_count: usize, target_length: usize) -> BasisMatrix {
    let mut data = vec![0.0; target_length * pole_count];

    if pole_count == 1 {
        // One pole degenerates to a constant curve.
        data.fill(1.0);
        return BasisMatrix {
            rows: target_length,
            cols: 1,
            data,
        };
    }

    let mut unit = vec![0.0; pole_count];
    for j in 0..pole_count {
        unit[j] = 1.0;
        let column = spline_on_uniform_grid(&unit, target_length);
        for (i, value) in column.into_iter().enumerate() {
            data[i * pole_count + j] = value;
        }
        unit[j] = 0.0;
    }

    BasisMatrix {
        rows: target_length,
        cols: pole_count,
        data,
    }
}

/// Natural cubic spline through `values` at uniform nodes over `[0, 1]`,
/// evaluated at `samples` uniform positions.
fn spline_on_uniform_grid(values: &[f64], samples: usize) -> Vec<f64> {
    let n = values.len();
    debug_assert!(n >= 2 && samples >= n);

    let h = 1.0 / (n - 1) as f64;
    let second = second_derivatives(values, h);

    let mut out = Vec::with_capacity(samples);
    for i in 0..samples {
        let t = i as f64 / (samples - 1) as f64;
        let k = ((t / h) as usize).min(n - 2);
        let s = (t - k as f64 * h) / h;
        let a = 1.0 - s;
        let y = a * values[k]
            + s * values[k + 1]
            + ((a * a * a - a) * second[k] + (s * s * s - s) * second[k + 1]) * h * h / 6.0;
        out.push(y);
    }
    out
}

/// Second derivatives of the natural spline at the nodes (ends pinned to
/// zero), via the Thomas algorithm on the uniform-spacing tridiagonal
/// system `m[j-1] + 4 m[j] + m[j+1] = 6 (y[j+1] - 2 y[j] + y[j-1]) / h^2`.
fn second_derivatives(values: &[f64], h: f64) -> Vec<f64> {
    let n = values.len();
    let mut second = vec![0.0; n];
    let interior = n.saturating_sub(2);
    if interior == 0 {
        return second; // two points: straight line
    }

    let mut diag = vec![4.0; interior];
    let mut rhs: Vec<f64> = (1..=interior)
        .map(|j| 6.0 * (values[j + 1] - 2.0 * values[j] + values[j - 1]) / (h * h))
        .collect();

    // Forward elimination (sub- and super-diagonals are all 1).
    for j in 1..interior {
        let w = 1.0 / diag[j - 1];
        diag[j] -= w;
        rhs[j] -= w * rhs[j - 1];
    }

    // Back substitution.
    second[interior] = rhs[interior - 1] / diag[interior - 1];
    for j in (1..interior).rev() {
        second[j] = (rhs[j - 1] - second[j + 1]) / diag[j - 1];
    }
    second
}
