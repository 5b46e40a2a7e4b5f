//! Deferred definitional-equality constraints.
//!
//! The light inference engine accepts a constraint sink so that it can be
//! called anywhere the full checker can, but it never defers anything
//! itself: the sink passes through every call untouched.

use crate::context::Context;
use crate::term::Term;

/// An equality between two terms under a context, deferred for later
/// solving.
#[derive(Debug, Clone)]
pub struct Constraint {
  pub context: Context,
  pub lhs: Term,
  pub rhs: Term,
}

/// An append-only sequence of deferred constraints.
#[derive(Debug, Default)]
pub struct ConstraintSeq {
  constraints: Vec<Constraint>,
}

impl ConstraintSeq {
  pub fn new() -> ConstraintSeq {
    ConstraintSeq::default()
  }

  pub fn push(&mut self, constraint: Constraint) {
    self.constraints.push(constraint);
  }

  pub fn len(&self) -> usize {
    self.constraints.len()
  }

  pub fn is_empty(&self) -> bool {
    self.constraints.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = &Constraint> {
    self.constraints.iter()
  }
}
