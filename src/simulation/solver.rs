//! Dense solve of the assembled equations
//!
//! Unknowns are numbered in order of first appearance, so the same equations
//! always give the same matrix. The system is solved with a partially pivoted
//! LU decomposition; a (numerically) singular matrix is an error, never a
//! silent answer.

use std::collections::{HashMap, HashSet};

use nalgebra::{DMatrix, DVector};
use tracing::debug;

use super::equations::{Element, Equation, Unknown, UnknownFactor};
use super::error::{Result, SimError};

/// Smallest accepted ratio between the smallest and largest LU pivot
const SINGULARITY_RATIO: f64 = 1e-12;

/// Resolved value of one unknown
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Solution {
    pub unknown: Unknown,
    pub value: f64,
}

/// Values of every unknown of one solve, in solver order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Solutions {
    pub values: Vec<Solution>,
}

impl Solutions {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Solution> {
        self.values.iter()
    }

    pub fn get(&self, factor: UnknownFactor, element: Element) -> Option<f64> {
        let wanted = Unknown { factor, element };
        self.values.iter().find(|s| s.unknown == wanted).map(|s| s.value)
    }

    /// Value of `u`; unknowns absent from the system evaluate to 0
    pub fn value_of(&self, u: &Unknown) -> f64 {
        self.values.iter().find(|s| s.unknown == *u).map_or(0.0, |s| s.value)
    }

    /// Element-wise sum; both sides must cover the same unknowns in the same
    /// order
    pub fn add(&self, other: &Solutions) -> Result<Solutions> {
        if self.values.len() != other.values.len() {
            return Err(SimError::SolutionMerge);
        }
        let values = self
            .values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| {
                if a.unknown != b.unknown {
                    return Err(SimError::SolutionMerge);
                }
                Ok(Solution { unknown: a.unknown, value: a.value + b.value })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Solutions { values })
    }

    pub fn scale(&self, factor: f64) -> Solutions {
        Solutions {
            values: self
                .values
                .iter()
                .map(|s| Solution { unknown: s.unknown, value: s.value * factor })
                .collect(),
        }
    }

    /// Left-hand side of every equation with these values substituted
    pub fn residuals(&self, equations: &[Equation]) -> Vec<f64> {
        equations.iter().map(|eq| eq.evaluate(|u| self.value_of(u))).collect()
    }
}

/// Turns an equation list into a unique solution
pub struct Solver<'a> {
    equations: &'a [Equation],
}

impl<'a> Solver<'a> {
    pub fn new(equations: &'a [Equation]) -> Self {
        Self { equations }
    }

    /// Distinct unknowns in first-occurrence order
    pub fn unknowns(&self) -> Vec<Unknown> {
        let mut seen = HashSet::new();
        let mut ordered = Vec::new();
        for u in self.equations.iter().flat_map(|eq| eq.terms.iter().filter_map(|t| t.unknown())) {
            if seen.insert(u) {
                ordered.push(u);
            }
        }
        ordered
    }

    /// Coefficient matrix `A` and right-hand side `b` such that `A x = b`
    pub fn build(&self, unknowns: &[Unknown]) -> (DMatrix<f64>, DVector<f64>) {
        let column: HashMap<Unknown, usize> = unknowns.iter().enumerate().map(|(i, u)| (*u, i)).collect();
        let rows = self.equations.len();
        let mut a = DMatrix::zeros(rows, unknowns.len());
        let mut b = DVector::zeros(rows);

        for (row, eq) in self.equations.iter().enumerate() {
            for term in &eq.terms {
                match term.unknown().and_then(|u| column.get(&u)) {
                    // several terms on the same unknown add up
                    Some(&col) => a[(row, col)] += term.value,
                    // constants move to the right-hand side
                    None => b[row] -= term.value,
                }
            }
        }
        (a, b)
    }

    pub fn solve(&self) -> Result<Solutions> {
        let unknowns = self.unknowns();
        let n_eq = self.equations.len();
        let n_unk = unknowns.len();

        if n_unk > n_eq {
            return Err(SimError::Overdetermined { unknowns: n_unk, equations: n_eq });
        }
        if n_unk < n_eq {
            return Err(SimError::Underdetermined { unknowns: n_unk, equations: n_eq });
        }
        if n_eq == 0 {
            return Ok(Solutions::default());
        }

        let (a, b) = self.build(&unknowns);
        let lu = a.lu();

        let u = lu.u();
        let diag = u.diagonal();
        let max_pivot = diag.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
        let min_pivot = diag.iter().fold(f64::INFINITY, |m, v| m.min(v.abs()));
        if !(min_pivot > SINGULARITY_RATIO * max_pivot) {
            return Err(SimError::Singular { size: n_eq });
        }

        let x = lu.solve(&b).ok_or(SimError::Singular { size: n_eq })?;
        if x.iter().any(|v| !v.is_finite()) {
            return Err(SimError::Singular { size: n_eq });
        }
        debug!(size = n_eq, "solved system");

        Ok(Solutions {
            values: unknowns
                .into_iter()
                .zip(x.iter())
                .map(|(unknown, &value)| Solution { unknown, value })
                .collect(),
        })
    }
}
