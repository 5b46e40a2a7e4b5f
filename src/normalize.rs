//! Head-exposing normalization.
//!
//! The engine needs just enough reduction to see a term's outermost
//! constructor: a Pi at application sites, a sort or Bool at universe
//! sites. The normalizer therefore performs weak-head reduction only:
//! beta one argument at a time, delta for non-opaque constants, zeta for
//! lets, context-value and metavariable unfolding. Everything under
//! binders stays untouched.
//!
//! Results are memoized per (term identity, context identity) with the
//! same substitution-timestamp invalidation discipline the engine applies
//! to its own cache. The cancellation flag is checked on every reduction
//! step.

use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::context::Context;
use crate::env::Env;
use crate::error::KernelError;
use crate::metavar::Substitution;
use crate::term::{Builder, Term, TermNode};

pub struct Normalizer {
  env: Rc<Env>,
  builder: Builder,
  memo: FxHashMap<(usize, usize), Term>,
  last_subst: Option<*const Substitution>,
  last_subst_timestamp: u64,
  interrupted: Arc<AtomicBool>,
  pub reduce_calls: u64,
}

impl Normalizer {
  pub fn new(env: Rc<Env>, builder: Builder) -> Normalizer {
    Normalizer {
      env,
      builder,
      memo: FxHashMap::default(),
      last_subst: None,
      last_subst_timestamp: 0,
      interrupted: Arc::new(AtomicBool::new(false)),
      reduce_calls: 0,
    }
  }

  /// Reduce `e` under `ctx` until its head constructor is exposed.
  pub fn reduce(
    &mut self,
    e: &Term,
    ctx: &Context,
    subst: Option<&Substitution>,
  ) -> Result<Term, KernelError> {
    self.refresh_subst(subst);
    let key = (e.id(), ctx.id());
    if let Some(cached) = self.memo.get(&key) {
      return Ok(cached.clone());
    }
    self.reduce_calls += 1;
    let result = self.whnf(e, ctx, subst)?;
    self.memo.insert(key, result.clone());
    Ok(result)
  }

  fn whnf(
    &mut self,
    e: &Term,
    ctx: &Context,
    subst: Option<&Substitution>,
  ) -> Result<Term, KernelError> {
    let mut cur = e.clone();
    loop {
      self.check_interrupt()?;
      let next = match cur.node() {
        TermNode::Var(i) => match ctx.lookup(*i) {
          Some(entry) => match &entry.value {
            // The value was typed in the suffix below its entry.
            Some(v) => self.builder.lift(v, i + 1),
            None => return Ok(cur),
          },
          None => return Ok(cur),
        },
        TermNode::Const(name) => match self.env.get(name) {
          Some(decl) if !decl.opaque => match &decl.value {
            Some(v) => v.clone(),
            None => return Ok(cur),
          },
          _ => return Ok(cur),
        },
        TermNode::Mvar(id) => {
          match subst.and_then(|s| s.get_assignment(*id)) {
            Some(v) => v.clone(),
            None => return Ok(cur),
          }
        },
        TermNode::Let(_, _, value, body) => {
          self.builder.instantiate(body, std::slice::from_ref(value))
        },
        TermNode::App(fun, args) => {
          let fun_whnf = self.whnf(fun, ctx, subst)?;
          match fun_whnf.node() {
            TermNode::Lam(_, _, body) => {
              let applied = self.builder.instantiate(body, &args[..1]);
              if args.len() == 1 {
                applied
              } else {
                self.builder.app(applied, args[1..].to_vec())
              }
            },
            TermNode::App(inner_fun, inner_args) => {
              // Stuck head that is itself an application: flatten.
              let mut all = inner_args.clone();
              all.extend(args.iter().cloned());
              return Ok(self.builder.app(inner_fun.clone(), all));
            },
            _ => {
              if fun_whnf == *fun {
                return Ok(cur);
              }
              return Ok(self.builder.app(fun_whnf, args.clone()));
            },
          }
        },
        // Already head forms.
        TermNode::Lam(..)
        | TermNode::Pi(..)
        | TermNode::Eq(..)
        | TermNode::Lit(..)
        | TermNode::Sort(..) => return Ok(cur),
      };
      cur = next;
    }
  }

  fn refresh_subst(&mut self, subst: Option<&Substitution>) {
    let handle = subst.map(|s| s as *const Substitution);
    if self.last_subst == handle {
      if let Some(s) = subst {
        if s.timestamp() > self.last_subst_timestamp {
          self.last_subst_timestamp = s.timestamp();
          self.memo.clear();
        }
      }
    } else {
      self.last_subst = handle;
      self.last_subst_timestamp = subst.map_or(0, |s| s.timestamp());
      self.memo.clear();
    }
  }

  pub fn set_interrupt(&self, flag: bool) {
    self.interrupted.store(flag, Ordering::Relaxed);
  }

  fn check_interrupt(&self) -> Result<(), KernelError> {
    if self.interrupted.load(Ordering::Relaxed) {
      return Err(KernelError::Interrupted);
    }
    Ok(())
  }

  /// Drop the memo and the substitution marker.
  pub fn clear(&mut self) {
    self.memo.clear();
    self.last_subst = None;
    self.last_subst_timestamp = 0;
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::context::Entry;
  use crate::env::{declare, Declaration};
  use crate::level::Level;
  use crate::term::{Lit, Name};

  fn normalizer(env: Env, builder: &Builder) -> Normalizer {
    Normalizer::new(Rc::new(env), builder.clone())
  }

  #[test]
  fn test_beta() {
    let b = Builder::new();
    let mut norm = normalizer(Env::default(), &b);
    let id = b.lam(Name::new("x"), b.lit(Lit::Bool), b.var(0));
    let app = b.app(id, vec![b.lit(Lit::True)]);
    let r = norm.reduce(&app, &Context::empty(), None).unwrap();
    assert_eq!(r, b.lit(Lit::True));
  }

  #[test]
  fn test_beta_stepwise_over_n_ary_app() {
    let b = Builder::new();
    let mut norm = normalizer(Env::default(), &b);
    // (fun x y, x) true false --> true
    let fst = b.lam(
      Name::new("x"),
      b.lit(Lit::Bool),
      b.lam(Name::new("y"), b.lit(Lit::Bool), b.var(1)),
    );
    let app = b.app(fst, vec![b.lit(Lit::True), b.lit(Lit::False)]);
    let r = norm.reduce(&app, &Context::empty(), None).unwrap();
    assert_eq!(r, b.lit(Lit::True));
  }

  #[test]
  fn test_delta_unfolds_definitions() {
    let b = Builder::new();
    let mut env = Env::default();
    let pi = b.pi(Name::new("x"), b.lit(Lit::Bool), b.lit(Lit::Bool));
    declare(
      &mut env,
      Declaration::definition(
        Name::new("arrow"),
        b.sort(Level::Typ(0)),
        pi.clone(),
      ),
    );
    let mut norm = normalizer(env, &b);
    let r = norm
      .reduce(&b.cnst(Name::new("arrow")), &Context::empty(), None)
      .unwrap();
    assert_eq!(r, pi);
  }

  #[test]
  fn test_opaque_stays_stuck() {
    let b = Builder::new();
    let mut env = Env::default();
    declare(
      &mut env,
      Declaration::opaque_definition(
        Name::new("secret"),
        b.sort(Level::Typ(0)),
        b.lit(Lit::Bool),
      ),
    );
    let mut norm = normalizer(env, &b);
    let c = b.cnst(Name::new("secret"));
    let r = norm.reduce(&c, &Context::empty(), None).unwrap();
    assert_eq!(r, c);
  }

  #[test]
  fn test_zeta() {
    let b = Builder::new();
    let mut norm = normalizer(Env::default(), &b);
    let le = b.letE(
      Name::new("x"),
      b.lit(Lit::Bool),
      b.lit(Lit::True),
      b.var(0),
    );
    let r = norm.reduce(&le, &Context::empty(), None).unwrap();
    assert_eq!(r, b.lit(Lit::True));
  }

  #[test]
  fn test_context_value_unfolds_lifted() {
    let b = Builder::new();
    let mut norm = normalizer(Env::default(), &b);
    // [y := #0, x : Bool]: reducing #0 yields x's reference, lifted past y.
    let ctx = Context::empty()
      .extend(Name::new("x"), b.lit(Lit::Bool))
      .push(Entry::with_value(Name::new("y"), b.var(0)));
    let r = norm.reduce(&b.var(0), &ctx, None).unwrap();
    assert_eq!(r, b.var(1));
  }

  #[test]
  fn test_plain_binder_is_stuck() {
    let b = Builder::new();
    let mut norm = normalizer(Env::default(), &b);
    let ctx = Context::empty().extend(Name::new("x"), b.lit(Lit::Bool));
    let v = b.var(0);
    assert_eq!(norm.reduce(&v, &ctx, None).unwrap(), v);
  }

  #[test]
  fn test_metavar_resolution_and_invalidation() {
    let b = Builder::new();
    let mut norm = normalizer(Env::default(), &b);
    let mut subst = Substitution::new();
    let m = subst.fresh(None);
    let mv = b.mvar(m);
    // Unassigned: stuck (and memoized).
    let r = norm.reduce(&mv, &Context::empty(), Some(&subst)).unwrap();
    assert_eq!(r, mv);
    // Assigning bumps the timestamp, so the memo must not serve the old
    // answer.
    subst.assign(m, b.lit(Lit::True));
    let r = norm.reduce(&mv, &Context::empty(), Some(&subst)).unwrap();
    assert_eq!(r, b.lit(Lit::True));
  }

  #[test]
  fn test_interrupt() {
    let b = Builder::new();
    let mut norm = normalizer(Env::default(), &b);
    let id = b.lam(Name::new("x"), b.lit(Lit::Bool), b.var(0));
    let app = b.app(id, vec![b.lit(Lit::True)]);
    norm.set_interrupt(true);
    let r = norm.reduce(&app, &Context::empty(), None);
    assert!(matches!(r, Err(KernelError::Interrupted)));
    norm.set_interrupt(false);
    let r = norm.reduce(&app, &Context::empty(), None).unwrap();
    assert_eq!(r, b.lit(Lit::True));
  }
}
