//! Persistent variable contexts.
//!
//! A context is an immutable cons list of binding entries, most recent
//! binder first, with the length cached in every node. Extending a
//! context never mutates it, so two context handles denote the same
//! bindings exactly when they are the same node; [`Context::same`] is the
//! identity comparison the engine uses as its change detector.

use std::rc::Rc;

use crate::term::{Name, Term};

/// One binding. At least one of `domain` and `value` must be present:
/// `extend` produces domain-only entries, `extend_let` value-bearing ones.
#[derive(Debug, Clone)]
pub struct Entry {
  pub name: Name,
  pub domain: Option<Term>,
  pub value: Option<Term>,
}

impl Entry {
  pub fn with_domain(name: Name, domain: Term) -> Entry {
    Entry { name, domain: Some(domain), value: None }
  }

  pub fn with_value(name: Name, value: Term) -> Entry {
    Entry { name, domain: None, value: Some(value) }
  }
}

#[derive(Debug)]
struct Node {
  entry: Entry,
  tail: Context,
  len: usize,
}

/// A persistent binding context. Cloning is O(1).
#[derive(Debug, Clone, Default)]
pub struct Context(Option<Rc<Node>>);

impl Context {
  pub fn empty() -> Context {
    Context(None)
  }

  pub fn len(&self) -> usize {
    self.0.as_ref().map_or(0, |n| n.len)
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_none()
  }

  /// Opaque identity token; all empty contexts share identity 0.
  pub fn id(&self) -> usize {
    self.0.as_ref().map_or(0, |n| Rc::as_ptr(n) as usize)
  }

  /// Identity comparison: the engine's context change detector.
  pub fn same(a: &Context, b: &Context) -> bool {
    match (&a.0, &b.0) {
      (None, None) => true,
      (Some(x), Some(y)) => Rc::ptr_eq(x, y),
      _ => false,
    }
  }

  pub fn push(&self, entry: Entry) -> Context {
    Context(Some(Rc::new(Node {
      entry,
      tail: self.clone(),
      len: self.len() + 1,
    })))
  }

  /// Extend with a plain binder `name : domain`.
  pub fn extend(&self, name: Name, domain: Term) -> Context {
    self.push(Entry::with_domain(name, domain))
  }

  /// Extend with a let-like binder carrying a bound value and an
  /// optional declared type.
  pub fn extend_let(
    &self,
    name: Name,
    ty: Option<Term>,
    value: Term,
  ) -> Context {
    self.push(Entry { name, domain: ty, value: Some(value) })
  }

  pub fn lookup(&self, idx: usize) -> Option<&Entry> {
    self.lookup_with_suffix(idx).map(|(entry, _)| entry)
  }

  /// The entry at `idx` together with the context strictly below it,
  /// the one the entry's bound value (if any) was typed in.
  pub fn lookup_with_suffix(
    &self,
    idx: usize,
  ) -> Option<(&Entry, &Context)> {
    let mut cursor = self.0.as_deref()?;
    let mut i = idx;
    loop {
      if i == 0 {
        return Some((&cursor.entry, &cursor.tail));
      }
      i -= 1;
      cursor = cursor.tail.0.as_deref()?;
    }
  }

  pub fn iter(&self) -> impl Iterator<Item = &Entry> {
    ContextIter(self)
  }
}

struct ContextIter<'a>(&'a Context);

impl<'a> Iterator for ContextIter<'a> {
  type Item = &'a Entry;

  fn next(&mut self) -> Option<Self::Item> {
    let node = self.0.0.as_deref()?;
    self.0 = &node.tail;
    Some(&node.entry)
  }
}
