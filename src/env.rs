//! The global definition store.
//!
//! Maps constant names to declarations. The inference engine reads only
//! the recorded type; the normalizer additionally unfolds the body of
//! definitions that are not marked opaque.

use rustc_hash::FxHashMap;

use crate::term::{Name, Term};

/// A top-level constant declaration.
#[derive(Debug, Clone)]
pub struct Declaration {
  pub name: Name,
  /// The constant's type, when one was recorded.
  pub ty: Option<Term>,
  /// Definition body, absent for axioms.
  pub value: Option<Term>,
  /// Opaque bodies are hidden from reduction.
  pub opaque: bool,
}

impl Declaration {
  pub fn axiom(name: Name, ty: Term) -> Declaration {
    Declaration { name, ty: Some(ty), value: None, opaque: false }
  }

  pub fn definition(name: Name, ty: Term, value: Term) -> Declaration {
    Declaration { name, ty: Some(ty), value: Some(value), opaque: false }
  }

  pub fn opaque_definition(
    name: Name,
    ty: Term,
    value: Term,
  ) -> Declaration {
    Declaration { name, ty: Some(ty), value: Some(value), opaque: true }
  }

  pub fn has_type(&self) -> bool {
    self.ty.is_some()
  }
}

pub type Env = FxHashMap<Name, Declaration>;

/// Insert a declaration under its own name.
pub fn declare(env: &mut Env, decl: Declaration) {
  env.insert(decl.name.clone(), decl);
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::level::Level;
  use crate::term::Builder;

  #[test]
  fn test_declare_and_lookup() {
    let b = Builder::new();
    let mut env = Env::default();
    let t0 = b.sort(Level::Typ(0));
    declare(&mut env, Declaration::axiom(Name::new("A"), t0));
    let decl = env.get(&Name::new("A")).unwrap();
    assert!(decl.has_type());
    assert!(decl.value.is_none());
    assert!(!decl.opaque);
    assert!(env.get(&Name::new("B")).is_none());
  }

  #[test]
  fn test_opaque_definition() {
    let b = Builder::new();
    let mut env = Env::default();
    let t0 = b.sort(Level::Typ(0));
    let body = b.lit(crate::term::Lit::Bool);
    declare(
      &mut env,
      Declaration::opaque_definition(Name::new("B"), t0, body),
    );
    assert!(env.get(&Name::new("B")).unwrap().opaque);
  }
}
