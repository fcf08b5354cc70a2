//! Sampled curve tables for offline inspection.
//!
//! Each table has one independent column (normalized fiber length, fiber
//! velocity or tendon length) and one or more curve columns. Tables render as
//! tab-delimited text through [`Display`](std::fmt::Display).

use nalgebra::{DMatrix, DVector};

use crate::curves::{MuscleForceCurves, MAX_NORM_FIBER_LENGTH, MIN_NORM_FIBER_LENGTH};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Number of samples in the default grids.
pub const DEFAULT_SAMPLE_COUNT: usize = 200;

/// Default range of normalized fiber velocity.
pub const DEFAULT_FIBER_VELOCITY_RANGE: (f64, f64) = (-1.1, 1.1);

/// Lower end of the default normalized tendon length grid.
pub const DEFAULT_MIN_NORM_TENDON_LENGTH: f64 = 0.95;

/// A sampled curve table.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CurveTable {
    independent_label: String,
    column_labels: Vec<String>,
    independent: DVector<f64>,
    values: DMatrix<f64>,
}

impl CurveTable {
    /// Sample `columns` at every point of `independent`.
    fn sample<const N: usize>(
        independent_label: &str,
        column_labels: [&str; N],
        independent: DVector<f64>,
        columns: [&dyn Fn(f64) -> f64; N],
    ) -> Self {
        let values = DMatrix::from_fn(independent.len(), N, |row, col| {
            columns[col](independent[row])
        });
        Self {
            independent_label: independent_label.to_string(),
            column_labels: column_labels.iter().map(ToString::to_string).collect(),
            independent,
            values,
        }
    }

    /// Label of the independent column.
    #[must_use]
    pub fn independent_label(&self) -> &str {
        &self.independent_label
    }

    /// Labels of the curve columns.
    #[must_use]
    pub fn column_labels(&self) -> &[String] {
        &self.column_labels
    }

    /// Sample points.
    #[must_use]
    pub fn independent(&self) -> &DVector<f64> {
        &self.independent
    }

    /// Curve values, one row per sample point.
    #[must_use]
    pub fn values(&self) -> &DMatrix<f64> {
        &self.values
    }

    /// Number of sample points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.independent.len()
    }

    /// Check if the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.independent.is_empty()
    }

    /// Values of the column with the given label.
    #[must_use]
    pub fn column(&self, label: &str) -> Option<DVector<f64>> {
        let index = self.column_labels.iter().position(|l| l == label)?;
        Some(self.values.column(index).into_owned())
    }
}

impl std::fmt::Display for CurveTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.independent_label)?;
        for label in &self.column_labels {
            write!(f, "\t{label}")?;
        }
        writeln!(f)?;
        for (row, x) in self.independent.iter().enumerate() {
            write!(f, "{x}")?;
            for value in self.values.row(row).iter() {
                write!(f, "\t{value}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// `count` evenly spaced points from `start` to `end`, both included.
#[must_use]
pub fn linspace(count: usize, start: f64, end: f64) -> DVector<f64> {
    if count == 1 {
        return DVector::from_element(1, start);
    }
    let step = (end - start) / (count as f64 - 1.0);
    DVector::from_fn(count, |i, _| start + step * i as f64)
}

fn grid_or(points: Option<&[f64]>, default: impl FnOnce() -> DVector<f64>) -> DVector<f64> {
    match points {
        Some(points) if !points.is_empty() => DVector::from_column_slice(points),
        _ => default(),
    }
}

impl MuscleForceCurves {
    /// Active and passive force-length multipliers against normalized fiber length.
    ///
    /// Defaults to 200 points on `[0.2, 1.8]`.
    #[must_use]
    pub fn fiber_length_curves_table(&self, normalized_fiber_lengths: Option<&[f64]>) -> CurveTable {
        let grid = grid_or(normalized_fiber_lengths, || {
            linspace(
                DEFAULT_SAMPLE_COUNT,
                MIN_NORM_FIBER_LENGTH,
                MAX_NORM_FIBER_LENGTH,
            )
        });
        CurveTable::sample(
            "normalized_fiber_length",
            ["active_force_length_multiplier", "passive_force_multiplier"],
            grid,
            [
                &|l: f64| self.active_fl.evaluate(l),
                &|l: f64| self.passive_fl.evaluate(l),
            ],
        )
    }

    /// Force-velocity multiplier against normalized fiber velocity.
    ///
    /// Defaults to 200 points on `[-1.1, 1.1]`.
    #[must_use]
    pub fn fiber_velocity_multiplier_table(
        &self,
        normalized_fiber_velocities: Option<&[f64]>,
    ) -> CurveTable {
        let (start, end) = DEFAULT_FIBER_VELOCITY_RANGE;
        let grid = grid_or(normalized_fiber_velocities, || {
            linspace(DEFAULT_SAMPLE_COUNT, start, end)
        });
        CurveTable::sample(
            "normalized_fiber_velocity",
            ["force_velocity_multiplier"],
            grid,
            [&|v: f64| self.fv.evaluate(v)],
        )
    }

    /// Tendon force multiplier against normalized tendon length.
    ///
    /// Defaults to 200 points on `[0.95, 1 + strain]`, ending where the curve
    /// reaches one.
    #[must_use]
    pub fn tendon_force_multiplier_table(
        &self,
        normalized_tendon_lengths: Option<&[f64]>,
    ) -> CurveTable {
        let grid = grid_or(normalized_tendon_lengths, || {
            linspace(
                DEFAULT_SAMPLE_COUNT,
                DEFAULT_MIN_NORM_TENDON_LENGTH,
                1.0 + self.tendon.strain_at_one_norm_force(),
            )
        });
        CurveTable::sample(
            "normalized_tendon_length",
            ["tendon_force_multiplier"],
            grid,
            [&|l: f64| self.tendon.evaluate(l)],
        )
    }
}
