//! Kernel terms: immutable, DAG-shared syntax nodes.
//!
//! Every term is built through a [`Builder`], which hash-conses
//! construction requests: asking for a node that already exists returns
//! the existing handle and tags it as *shared*. Identity (pointer
//! equality) therefore coincides with structural equality for terms from
//! one builder, and the inference cache can be keyed by node identity
//! alone. Only shared nodes are cache-eligible.
//!
//! Nodes carry two more pieces of construction-time metadata: a shallow
//! structural hash (variant tag, scalars, child identities) used by the
//! intern table, and an upper bound on loose de Bruijn indices that makes
//! `closed()` O(1) and lets `instantiate`/`lift` skip untouched subtrees.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use rustc_hash::{FxHashMap, FxHasher};

use crate::level::Level;

// ============================================================================
// Name, MetaId, Lit
// ============================================================================

/// An interned constant or binder name.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Name(Rc<str>);

impl Name {
  pub fn new(s: &str) -> Name {
    Name(Rc::from(s))
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl From<&str> for Name {
  fn from(s: &str) -> Name {
    Name::new(s)
  }
}

impl fmt::Display for Name {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// Identifier of a metavariable in the substitution store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MetaId(pub u64);

impl fmt::Display for MetaId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "?m{}", self.0)
  }
}

/// A builtin value with a self-described type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lit {
  /// The Bool/Prop sort value, of type `Type 0`.
  Bool,
  /// The true proposition, of type `Bool`.
  True,
  /// The false proposition, of type `Bool`.
  False,
}

impl Lit {
  /// The value's own type.
  pub fn type_of(&self, builder: &Builder) -> Term {
    match self {
      Lit::Bool => builder.sort(Level::Typ(0)),
      Lit::True | Lit::False => builder.lit(Lit::Bool),
    }
  }
}

impl fmt::Display for Lit {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Lit::Bool => write!(f, "Bool"),
      Lit::True => write!(f, "true"),
      Lit::False => write!(f, "false"),
    }
  }
}

// ============================================================================
// Term
// ============================================================================

/// The ten term shapes.
#[derive(Debug, PartialEq, Eq)]
pub enum TermNode {
  /// Bound variable (de Bruijn index, innermost binder is 0).
  Var(usize),
  /// Reference to a named constant in the environment.
  Const(Name),
  /// Application: one function, at least one argument.
  App(Term, Vec<Term>),
  /// Lambda abstraction (binder name, domain, body).
  Lam(Name, Term, Term),
  /// Dependent function type (binder name, domain, body).
  Pi(Name, Term, Term),
  /// Let binding (binder name, declared type, value, body).
  Let(Name, Term, Term, Term),
  /// Propositional equality; always of type `Bool`.
  Eq(Term, Term),
  /// Builtin value.
  Lit(Lit),
  /// Universe: `Sort l : Sort (l + 1)`.
  Sort(Level),
  /// Metavariable awaiting assignment.
  Mvar(MetaId),
}

#[derive(Debug)]
pub struct TermData {
  node: TermNode,
  hash: u64,
  loose: usize,
  shared: Cell<bool>,
}

/// A cheap-clone handle to an interned term node.
///
/// Equality and hashing are by identity, which interning makes coincide
/// with structural equality for terms from the same [`Builder`].
#[derive(Debug, Clone)]
pub struct Term(Rc<TermData>);

impl Term {
  pub fn node(&self) -> &TermNode {
    &self.0.node
  }

  /// Opaque identity token, stable for the node's lifetime.
  pub fn id(&self) -> usize {
    Rc::as_ptr(&self.0) as usize
  }

  /// Whether the interner has seen this node constructed more than once.
  pub fn is_shared(&self) -> bool {
    self.0.shared.get()
  }

  fn mark_shared(&self) {
    self.0.shared.set(true);
  }

  /// Strict upper bound on loose de Bruijn indices; 0 means closed.
  pub fn loose_bound(&self) -> usize {
    self.0.loose
  }

  /// True when the term has no loose de Bruijn indices.
  pub fn closed(&self) -> bool {
    self.0.loose == 0
  }
}

impl PartialEq for Term {
  fn eq(&self, other: &Term) -> bool {
    Rc::ptr_eq(&self.0, &other.0)
  }
}

impl Eq for Term {}

impl Hash for Term {
  fn hash<H: Hasher>(&self, state: &mut H) {
    self.0.hash.hash(state);
  }
}

impl fmt::Display for Term {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.node() {
      TermNode::Var(i) => write!(f, "#{}", i),
      TermNode::Const(n) => write!(f, "{}", n),
      TermNode::App(fun, args) => {
        write!(f, "({}", fun)?;
        for a in args {
          write!(f, " {}", a)?;
        }
        write!(f, ")")
      },
      TermNode::Lam(n, d, b) => write!(f, "(fun ({} : {}), {})", n, d, b),
      TermNode::Pi(n, d, b) => write!(f, "(Pi ({} : {}), {})", n, d, b),
      TermNode::Let(n, t, v, b) => {
        write!(f, "(let {} : {} := {} in {})", n, t, v, b)
      },
      TermNode::Eq(l, r) => write!(f, "({} = {})", l, r),
      TermNode::Lit(v) => write!(f, "{}", v),
      TermNode::Sort(Level::Prop) => write!(f, "Type"),
      TermNode::Sort(l) => write!(f, "Type {}", l),
      TermNode::Mvar(id) => write!(f, "{}", id),
    }
  }
}

fn shallow_hash(node: &TermNode) -> u64 {
  let hasher = &mut FxHasher::default();
  match node {
    TermNode::Var(i) => (3u8, i).hash(hasher),
    TermNode::Const(n) => (5u8, n).hash(hasher),
    TermNode::App(fun, args) => {
      (7u8, fun.id()).hash(hasher);
      for a in args {
        a.id().hash(hasher);
      }
    },
    TermNode::Lam(n, d, b) => (11u8, n, d.id(), b.id()).hash(hasher),
    TermNode::Pi(n, d, b) => (13u8, n, d.id(), b.id()).hash(hasher),
    TermNode::Let(n, t, v, b) => {
      (17u8, n, t.id(), v.id(), b.id()).hash(hasher)
    },
    TermNode::Eq(l, r) => (19u8, l.id(), r.id()).hash(hasher),
    TermNode::Lit(v) => (23u8, v).hash(hasher),
    TermNode::Sort(l) => (29u8, l).hash(hasher),
    TermNode::Mvar(id) => (31u8, id).hash(hasher),
  }
  hasher.finish()
}

fn loose_bound_of(node: &TermNode) -> usize {
  match node {
    TermNode::Var(i) => i + 1,
    TermNode::App(fun, args) => {
      let mut m = fun.loose_bound();
      for a in args {
        m = m.max(a.loose_bound());
      }
      m
    },
    TermNode::Lam(_, d, b) | TermNode::Pi(_, d, b) => {
      d.loose_bound().max(b.loose_bound().saturating_sub(1))
    },
    TermNode::Let(_, t, v, b) => t
      .loose_bound()
      .max(v.loose_bound())
      .max(b.loose_bound().saturating_sub(1)),
    TermNode::Eq(l, r) => l.loose_bound().max(r.loose_bound()),
    TermNode::Const(..)
    | TermNode::Lit(..)
    | TermNode::Sort(..)
    | TermNode::Mvar(..) => 0,
  }
}

// ============================================================================
// Builder
// ============================================================================

#[derive(Default)]
struct Interner {
  buckets: FxHashMap<u64, Vec<Term>>,
}

/// Shared handle to the term interner.
///
/// Cloning the handle shares the underlying table, so the engine, the
/// normalizer, and the caller all construct into one DAG.
#[derive(Clone, Default)]
pub struct Builder(Rc<RefCell<Interner>>);

impl Builder {
  pub fn new() -> Builder {
    Builder::default()
  }

  fn intern(&self, node: TermNode) -> Term {
    let hash = shallow_hash(&node);
    let mut interner = self.0.borrow_mut();
    let bucket = interner.buckets.entry(hash).or_default();
    if let Some(existing) = bucket.iter().find(|t| *t.node() == node) {
      existing.mark_shared();
      return existing.clone();
    }
    let loose = loose_bound_of(&node);
    let term = Term(Rc::new(TermData {
      node,
      hash,
      loose,
      shared: Cell::new(false),
    }));
    bucket.push(term.clone());
    term
  }

  pub fn var(&self, idx: usize) -> Term {
    self.intern(TermNode::Var(idx))
  }

  pub fn cnst(&self, name: Name) -> Term {
    self.intern(TermNode::Const(name))
  }

  /// Application node; `args` must be non-empty.
  pub fn app(&self, fun: Term, args: Vec<Term>) -> Term {
    debug_assert!(!args.is_empty(), "application with no arguments");
    self.intern(TermNode::App(fun, args))
  }

  pub fn lam(&self, name: Name, domain: Term, body: Term) -> Term {
    self.intern(TermNode::Lam(name, domain, body))
  }

  pub fn pi(&self, name: Name, domain: Term, body: Term) -> Term {
    self.intern(TermNode::Pi(name, domain, body))
  }

  #[allow(non_snake_case)]
  pub fn letE(&self, name: Name, ty: Term, value: Term, body: Term) -> Term {
    self.intern(TermNode::Let(name, ty, value, body))
  }

  pub fn eq(&self, lhs: Term, rhs: Term) -> Term {
    self.intern(TermNode::Eq(lhs, rhs))
  }

  pub fn lit(&self, lit: Lit) -> Term {
    self.intern(TermNode::Lit(lit))
  }

  pub fn sort(&self, level: Level) -> Term {
    self.intern(TermNode::Sort(level))
  }

  pub fn mvar(&self, id: MetaId) -> Term {
    self.intern(TermNode::Mvar(id))
  }

  // ==========================================================================
  // Substitution helpers
  // ==========================================================================

  /// Substitute the `args.len()` innermost loose variables of `t`.
  ///
  /// `args[0]` binds the outermost of the substituted binders and
  /// `args[args.len() - 1]` the innermost. Arguments are lifted past any
  /// binders they are substituted under, and surviving loose indices are
  /// renumbered down by `args.len()`.
  pub fn instantiate(&self, t: &Term, args: &[Term]) -> Term {
    if args.is_empty() {
      return t.clone();
    }
    self.inst_rec(t, args, 0)
  }

  fn inst_rec(&self, e: &Term, args: &[Term], offset: usize) -> Term {
    if e.loose_bound() <= offset {
      return e.clone();
    }
    match e.node() {
      TermNode::Var(i) => {
        let i = *i;
        if i < offset {
          e.clone()
        } else if i - offset < args.len() {
          self.lift(&args[args.len() - 1 - (i - offset)], offset)
        } else {
          self.var(i - args.len())
        }
      },
      TermNode::App(fun, app_args) => {
        let fun = self.inst_rec(fun, args, offset);
        let app_args = app_args
          .iter()
          .map(|a| self.inst_rec(a, args, offset))
          .collect();
        self.app(fun, app_args)
      },
      TermNode::Lam(n, d, b) => self.lam(
        n.clone(),
        self.inst_rec(d, args, offset),
        self.inst_rec(b, args, offset + 1),
      ),
      TermNode::Pi(n, d, b) => self.pi(
        n.clone(),
        self.inst_rec(d, args, offset),
        self.inst_rec(b, args, offset + 1),
      ),
      TermNode::Let(n, t, v, b) => self.letE(
        n.clone(),
        self.inst_rec(t, args, offset),
        self.inst_rec(v, args, offset),
        self.inst_rec(b, args, offset + 1),
      ),
      TermNode::Eq(l, r) => self
        .eq(self.inst_rec(l, args, offset), self.inst_rec(r, args, offset)),
      TermNode::Const(..)
      | TermNode::Lit(..)
      | TermNode::Sort(..)
      | TermNode::Mvar(..) => e.clone(),
    }
  }

  /// Shift every loose de Bruijn index of `t` up by `n`.
  pub fn lift(&self, t: &Term, n: usize) -> Term {
    if n == 0 {
      return t.clone();
    }
    self.lift_rec(t, n, 0)
  }

  fn lift_rec(&self, e: &Term, n: usize, cutoff: usize) -> Term {
    if e.loose_bound() <= cutoff {
      return e.clone();
    }
    match e.node() {
      TermNode::Var(i) => {
        if *i >= cutoff {
          self.var(i + n)
        } else {
          e.clone()
        }
      },
      TermNode::App(fun, args) => {
        let fun = self.lift_rec(fun, n, cutoff);
        let args = args.iter().map(|a| self.lift_rec(a, n, cutoff)).collect();
        self.app(fun, args)
      },
      TermNode::Lam(name, d, b) => self.lam(
        name.clone(),
        self.lift_rec(d, n, cutoff),
        self.lift_rec(b, n, cutoff + 1),
      ),
      TermNode::Pi(name, d, b) => self.pi(
        name.clone(),
        self.lift_rec(d, n, cutoff),
        self.lift_rec(b, n, cutoff + 1),
      ),
      TermNode::Let(name, t, v, b) => self.letE(
        name.clone(),
        self.lift_rec(t, n, cutoff),
        self.lift_rec(v, n, cutoff),
        self.lift_rec(b, n, cutoff + 1),
      ),
      TermNode::Eq(l, r) => {
        self.eq(self.lift_rec(l, n, cutoff), self.lift_rec(r, n, cutoff))
      },
      TermNode::Const(..)
      | TermNode::Lit(..)
      | TermNode::Sort(..)
      | TermNode::Mvar(..) => e.clone(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_interning_gives_identity() {
    let b = Builder::new();
    let x = b.var(0);
    let y = b.var(0);
    assert_eq!(x, y);
    assert_eq!(x.id(), y.id());
    assert_ne!(x, b.var(1));
  }

  #[test]
  fn test_second_construction_marks_shared() {
    let b = Builder::new();
    let first = b.sort(Level::Typ(0));
    assert!(!first.is_shared());
    let second = b.sort(Level::Typ(0));
    assert!(second.is_shared());
    assert!(first.is_shared());
  }

  #[test]
  fn test_compound_interning() {
    let b = Builder::new();
    let t0 = b.sort(Level::Typ(0));
    let p1 = b.pi(Name::new("x"), t0.clone(), b.var(0));
    let p2 = b.pi(Name::new("x"), t0.clone(), b.var(0));
    assert_eq!(p1, p2);
    assert!(p1.is_shared());
    // A different binder name is a different node.
    let p3 = b.pi(Name::new("y"), t0, b.var(0));
    assert_ne!(p1, p3);
  }

  #[test]
  fn test_loose_bound() {
    let b = Builder::new();
    assert_eq!(b.var(3).loose_bound(), 4);
    assert!(b.sort(Level::Typ(0)).closed());
    let lam = b.lam(Name::new("x"), b.sort(Level::Typ(0)), b.var(0));
    assert!(lam.closed());
    let open_lam = b.lam(Name::new("x"), b.var(0), b.var(2));
    assert_eq!(open_lam.loose_bound(), 2);
  }

  #[test]
  fn test_lift_shifts_loose_only() {
    let b = Builder::new();
    let lam = b.lam(Name::new("x"), b.sort(Level::Typ(0)), b.var(1));
    let lifted = b.lift(&lam, 2);
    // #1 under one binder is loose; it becomes #3.
    let expected = b.lam(Name::new("x"), b.sort(Level::Typ(0)), b.var(3));
    assert_eq!(lifted, expected);
    // Bound occurrences are untouched.
    let id = b.lam(Name::new("x"), b.sort(Level::Typ(0)), b.var(0));
    assert_eq!(b.lift(&id, 5), id);
  }

  #[test]
  fn test_instantiate_closes_binders() {
    let b = Builder::new();
    let bool_t = b.lit(Lit::Bool);
    // Body of Pi(T, _, Pi(x, #0, #1)) after one peel: Pi(x, #0, #1).
    let body = b.pi(Name::new("x"), b.var(0), b.var(1));
    let result = b.instantiate(&body, &[bool_t.clone()]);
    let expected = b.pi(Name::new("x"), bool_t.clone(), bool_t);
    assert_eq!(result, expected);
  }

  #[test]
  fn test_instantiate_lifts_open_argument() {
    let b = Builder::new();
    // Substituting #0 (a context variable) under one binder must lift it.
    let body = b.pi(Name::new("x"), b.var(0), b.var(1));
    let arg = b.var(0);
    let result = b.instantiate(&body, &[arg]);
    let expected = b.pi(Name::new("x"), b.var(0), b.var(1));
    assert_eq!(result, expected);
  }

  #[test]
  fn test_instantiate_renumbers_outer_indices() {
    let b = Builder::new();
    // #2 refers past one peeled binder into the outer context; after
    // substituting one argument it must become #1.
    let t = b.eq(b.var(0), b.var(2));
    let result = b.instantiate(&t, &[b.lit(Lit::True)]);
    let expected = b.eq(b.lit(Lit::True), b.var(1));
    assert_eq!(result, expected);
  }

  #[test]
  fn test_instantiate_multiple_outermost_first() {
    let b = Builder::new();
    // args[0] binds the outermost peeled binder (#1 here).
    let t = b.eq(b.var(1), b.var(0));
    let result =
      b.instantiate(&t, &[b.lit(Lit::True), b.lit(Lit::False)]);
    let expected = b.eq(b.lit(Lit::True), b.lit(Lit::False));
    assert_eq!(result, expected);
  }

  #[test]
  fn test_display() {
    let b = Builder::new();
    let t = b.pi(Name::new("x"), b.sort(Level::Typ(0)), b.var(0));
    assert_eq!(t.to_string(), "(Pi (x : Type 0), #0)");
    assert_eq!(b.lit(Lit::Bool).to_string(), "Bool");
    assert_eq!(b.mvar(MetaId(4)).to_string(), "?m4");
  }
}
