//! Symbolic linear equations over the per-step unknowns
//!
//! An `Equation` is a list of `EquationTerm`s whose sum is zero:
//! `Σ coefficient * value(unknown) = 0`, where terms tagged
//! `UnknownFactor::None` are plain constants.

use std::fmt;

use super::states::{ConstraintId, SolidId};

/// Which scalar a term multiplies
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum UnknownFactor {
    AccelX, // d²x/dt² of a solid
    AccelY, // d²y/dt² of a solid
    AngularAccel, // d²θ/dt² of a solid
    ForceX, // reaction on object1, x
    ForceY, // reaction on object1, y
    Torque, // reaction torque on object1, not produced by pivots or sliders
    None, // constant term
}

/// Owner of an unknown
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Element {
    Solid(SolidId),
    Constraint(ConstraintId),
    Ground,
}

/// Identity of an unknown: (factor, owner)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Unknown {
    pub factor: UnknownFactor,
    pub element: Element,
}

impl fmt::Display for Unknown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({:?})", self.factor, self.element)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EquationTerm {
    pub factor: UnknownFactor,
    pub element: Element,
    pub value: f64, // coefficient, or the constant itself for `None`
}

impl EquationTerm {
    pub fn solid(factor: UnknownFactor, solid: SolidId, value: f64) -> Self {
        Self { factor, element: Element::Solid(solid), value }
    }

    pub fn constraint(factor: UnknownFactor, constraint: ConstraintId, value: f64) -> Self {
        Self { factor, element: Element::Constraint(constraint), value }
    }

    pub fn constant(value: f64) -> Self {
        Self { factor: UnknownFactor::None, element: Element::Ground, value }
    }

    #[inline]
    pub fn is_constant(&self) -> bool {
        self.factor == UnknownFactor::None
    }

    /// `None` for constants
    pub fn unknown(&self) -> Option<Unknown> {
        if self.is_constant() {
            None
        } else {
            Some(Unknown { factor: self.factor, element: self.element })
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Equation {
    pub label: String, // what the row states, for diagnostics
    pub terms: Vec<EquationTerm>,
}

impl Equation {
    pub fn new(label: impl Into<String>) -> Self {
        Self { label: label.into(), terms: Vec::new() }
    }

    pub fn with(mut self, term: EquationTerm) -> Self {
        self.terms.push(term);
        self
    }

    pub fn push(&mut self, term: EquationTerm) {
        self.terms.push(term);
    }

    /// Sum of the constant terms
    pub fn constant(&self) -> f64 {
        self.terms.iter().filter(|t| t.is_constant()).map(|t| t.value).sum()
    }

    /// Left-hand side evaluated with `value_of` for each unknown; zero when
    /// the equation holds
    pub fn evaluate<F>(&self, mut value_of: F) -> f64
    where
        F: FnMut(&Unknown) -> f64,
    {
        self.terms
            .iter()
            .map(|t| match t.unknown() {
                Some(u) => t.value * value_of(&u),
                None => t.value,
            })
            .sum()
    }
}
