//! The metavariable substitution store.
//!
//! Holds declared types and assignments for metavariables, and exposes a
//! monotonically increasing timestamp bumped on every mutation. The
//! inference engine never writes this store; it reads the timestamp to
//! decide whether its cache is still valid.

use rustc_hash::FxHashMap;

use crate::term::{MetaId, Term};

#[derive(Debug, Default)]
pub struct Substitution {
  types: FxHashMap<MetaId, Term>,
  assignments: FxHashMap<MetaId, Term>,
  next_id: u64,
  timestamp: u64,
}

impl Substitution {
  pub fn new() -> Substitution {
    Substitution::default()
  }

  /// Allocate a fresh metavariable, optionally recording its type.
  pub fn fresh(&mut self, ty: Option<Term>) -> MetaId {
    let id = MetaId(self.next_id);
    self.next_id += 1;
    if let Some(t) = ty {
      self.types.insert(id, t);
    }
    self.bump();
    id
  }

  /// Assign (or reassign) a metavariable.
  pub fn assign(&mut self, id: MetaId, value: Term) {
    self.assignments.insert(id, value);
    self.bump();
  }

  pub fn get_type(&self, id: MetaId) -> Option<&Term> {
    self.types.get(&id)
  }

  pub fn get_assignment(&self, id: MetaId) -> Option<&Term> {
    self.assignments.get(&id)
  }

  pub fn is_assigned(&self, id: MetaId) -> bool {
    self.assignments.contains_key(&id)
  }

  /// Incremented on every mutation of the store.
  pub fn timestamp(&self) -> u64 {
    self.timestamp
  }

  fn bump(&mut self) {
    self.timestamp += 1;
  }
}
