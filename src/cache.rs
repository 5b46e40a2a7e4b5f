//! The scoped inference cache.
//!
//! A stack of identity-keyed maps. Entering a binder pushes a scope and
//! leaving it pops the scope, discarding types that were only valid under
//! that binder; lookups search from the innermost scope outward. The
//! engine pops on every exit path, including failure propagation.

use rustc_hash::FxHashMap;

use crate::term::Term;

#[derive(Debug)]
pub struct ScopedCache {
  scopes: Vec<FxHashMap<usize, Term>>,
}

impl ScopedCache {
  pub fn new() -> ScopedCache {
    ScopedCache { scopes: vec![FxHashMap::default()] }
  }

  pub fn push_scope(&mut self) {
    self.scopes.push(FxHashMap::default());
  }

  pub fn pop_scope(&mut self) {
    debug_assert!(self.scopes.len() > 1, "popping the root cache scope");
    self.scopes.pop();
  }

  /// Number of open scopes, including the root.
  pub fn depth(&self) -> usize {
    self.scopes.len()
  }

  /// Record a type in the innermost scope.
  pub fn insert(&mut self, key: usize, ty: Term) {
    // Scopes are never empty: clear() and new() both leave the root.
    self.scopes.last_mut().expect("cache has a root scope").insert(key, ty);
  }

  pub fn get(&self, key: usize) -> Option<&Term> {
    self.scopes.iter().rev().find_map(|scope| scope.get(&key))
  }

  /// Drop every entry and every open scope, leaving one empty root.
  pub fn clear(&mut self) {
    self.scopes.clear();
    self.scopes.push(FxHashMap::default());
  }
}

impl Default for ScopedCache {
  fn default() -> ScopedCache {
    ScopedCache::new()
  }
}
