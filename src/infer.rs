//! The light type inference engine.
//!
//! Computes the type of a term under a context, trusting invariants a
//! full checker would re-verify: a let binding's declared type is taken
//! at face value, and a variable's explicit domain is returned verbatim.
//! Inference is a recursive descent over the term DAG with an
//! identity-keyed memo for shared nodes, invalidated whenever the context
//! handle, the substitution handle, or the substitution timestamp moves.
//!
//! Kinds split in two tiers. Cheap kinds (metavariables, constants,
//! domain-carrying variables, equality, builtin values, sorts) answer in
//! O(1) or one context walk and are never cached. Expensive kinds
//! (value-resolved variables, applications, binders) check the
//! cancellation flag first, consult the cache, and recurse.

use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::cache::ScopedCache;
use crate::constraint::ConstraintSeq;
use crate::context::Context;
use crate::env::Env;
use crate::error::KernelError;
use crate::level::Level;
use crate::metavar::Substitution;
use crate::normalize::Normalizer;
use crate::term::{Builder, Lit, Term, TermNode};

type InferResult<T> = Result<T, KernelError>;

pub struct LightTypeChecker {
  env: Rc<Env>,
  builder: Builder,
  normalizer: Normalizer,
  cache: ScopedCache,
  last_ctx: Option<Context>,
  last_subst: Option<*const Substitution>,
  last_subst_timestamp: u64,
  interrupted: Arc<AtomicBool>,
  pub infer_calls: u64,
  pub cache_hits: u64,
}

impl LightTypeChecker {
  pub fn new(env: Rc<Env>, builder: Builder) -> LightTypeChecker {
    LightTypeChecker {
      normalizer: Normalizer::new(env.clone(), builder.clone()),
      env,
      builder,
      cache: ScopedCache::new(),
      last_ctx: None,
      last_subst: None,
      last_subst_timestamp: 0,
      interrupted: Arc::new(AtomicBool::new(false)),
      infer_calls: 0,
      cache_hits: 0,
    }
  }

  /// Infer the type of `e` under `ctx`.
  ///
  /// The constraint sink is accepted so callers can pass one wherever the
  /// full checker would; light inference defers nothing into it.
  pub fn infer(
    &mut self,
    e: &Term,
    ctx: &Context,
    subst: Option<&Substitution>,
    constraints: Option<&mut ConstraintSeq>,
  ) -> InferResult<Term> {
    let _ = constraints;
    self.set_ctx(ctx);
    self.set_subst(subst);
    self.infer_type(e, ctx, subst)
  }

  fn infer_type(
    &mut self,
    e: &Term,
    ctx: &Context,
    subst: Option<&Substitution>,
  ) -> InferResult<Term> {
    self.infer_calls += 1;
    // Cheap kinds: no caching.
    match e.node() {
      TermNode::Mvar(id) => {
        return subst
          .and_then(|s| s.get_type(*id))
          .cloned()
          .ok_or(KernelError::NoTypeForMetavar { meta: *id });
      },
      TermNode::Const(name) => {
        return self
          .env
          .get(name)
          .and_then(|decl| decl.ty.clone())
          .ok_or_else(|| KernelError::UntypedConstant {
            name: name.clone(),
          });
      },
      TermNode::Var(i) => match ctx.lookup(*i) {
        None => {
          return Err(KernelError::UnboundVariable {
            index: *i,
            context: ctx.clone(),
          });
        },
        Some(entry) => {
          if let Some(domain) = &entry.domain {
            return Ok(domain.clone());
          }
          // Resolving through the bound value is not cheap.
        },
      },
      TermNode::Eq(..) => return Ok(self.builder.lit(Lit::Bool)),
      TermNode::Lit(v) => return Ok(v.type_of(&self.builder)),
      TermNode::Sort(l) => return Ok(self.builder.sort(l.succ())),
      TermNode::App(..)
      | TermNode::Lam(..)
      | TermNode::Pi(..)
      | TermNode::Let(..) => {},
    }

    // Expensive kinds: cancellation checkpoint, then the cache.
    if self.interrupted.load(Ordering::Relaxed) {
      return Err(KernelError::Interrupted);
    }
    let shared = e.is_shared();
    if shared {
      if let Some(cached) = self.cache.get(e.id()) {
        self.cache_hits += 1;
        return Ok(cached.clone());
      }
    }

    let result = match e.node() {
      TermNode::Var(i) => {
        let Some((entry, suffix)) = ctx.lookup_with_suffix(*i) else {
          unreachable!("bounds checked above");
        };
        debug_assert!(entry.domain.is_none());
        let value = entry.value.as_ref().ok_or_else(|| {
          KernelError::KernelException {
            msg: format!(
              "context entry '{}' has neither domain nor value",
              entry.name
            ),
          }
        })?;
        let value_ty = self.infer_type(value, suffix, subst)?;
        self.builder.lift(&value_ty, ctx.len() - suffix.len())
      },
      TermNode::App(fun, _) => {
        let fun_ty = self.infer_type(fun, ctx, subst)?;
        self.get_range(fun_ty, e, ctx, subst)?
      },
      TermNode::Lam(name, domain, body) => {
        let inner = ctx.extend(name.clone(), domain.clone());
        self.cache.push_scope();
        let body_ty = self.infer_type(body, &inner, subst);
        self.cache.pop_scope();
        self.builder.pi(name.clone(), domain.clone(), body_ty?)
      },
      TermNode::Pi(name, domain, body) => {
        let l1 = self.infer_universe(domain, ctx, subst)?;
        let inner = ctx.extend(name.clone(), domain.clone());
        self.cache.push_scope();
        let l2 = self.infer_universe(body, &inner, subst);
        self.cache.pop_scope();
        self.builder.sort(l1.max(l2?))
      },
      TermNode::Let(name, ty, value, body) => {
        // The declared type is trusted, never checked against the value.
        let inner =
          ctx.extend_let(name.clone(), Some(ty.clone()), value.clone());
        self.cache.push_scope();
        let body_ty = self.infer_type(body, &inner, subst);
        self.cache.pop_scope();
        body_ty?
      },
      TermNode::Mvar(..)
      | TermNode::Const(..)
      | TermNode::Eq(..)
      | TermNode::Lit(..)
      | TermNode::Sort(..) => unreachable!("cheap kinds handled above"),
    };

    if shared {
      self.cache.insert(e.id(), result.clone());
    }
    Ok(result)
  }

  /// The universe level of the type denoted by `t`.
  fn infer_universe(
    &mut self,
    t: &Term,
    ctx: &Context,
    subst: Option<&Substitution>,
  ) -> InferResult<Level> {
    let ty = self.infer_type(t, ctx, subst)?;
    let head = self.normalizer.reduce(&ty, ctx, subst)?;
    match head.node() {
      TermNode::Sort(l) => Ok(*l),
      TermNode::Lit(Lit::Bool) => Ok(Level::Prop),
      _ => Err(KernelError::TypeExpected {
        term: t.clone(),
        context: ctx.clone(),
      }),
    }
  }

  /// Peel one Pi per argument of `app` off `fun_ty`, normalizing only
  /// when the current type is not already a syntactic Pi, and return the
  /// remaining range instantiated with the actual arguments.
  fn get_range(
    &mut self,
    fun_ty: Term,
    app: &Term,
    ctx: &Context,
    subst: Option<&Substitution>,
  ) -> InferResult<Term> {
    let TermNode::App(_, args) = app.node() else {
      unreachable!("get_range is only called on applications");
    };
    let mut ty = fun_ty;
    for _ in 0..args.len() {
      let peeled = match ty.node() {
        TermNode::Pi(_, _, body) => body.clone(),
        _ => {
          let reduced = self.normalizer.reduce(&ty, ctx, subst)?;
          match reduced.node() {
            TermNode::Pi(_, _, body) => body.clone(),
            _ => {
              return Err(KernelError::FunctionExpected {
                term: app.clone(),
                context: ctx.clone(),
              });
            },
          }
        },
      };
      ty = peeled;
    }
    if ty.closed() {
      Ok(ty)
    } else {
      Ok(self.builder.instantiate(&ty, args))
    }
  }

  fn set_ctx(&mut self, ctx: &Context) {
    let same =
      self.last_ctx.as_ref().is_some_and(|prev| Context::same(prev, ctx));
    if !same {
      self.clear();
      self.last_ctx = Some(ctx.clone());
    }
  }

  fn set_subst(&mut self, subst: Option<&Substitution>) {
    let handle = subst.map(|s| s as *const Substitution);
    if self.last_subst == handle {
      // Same store: the cache survives unless it has been mutated since
      // the last call.
      if let Some(s) = subst {
        if s.timestamp() > self.last_subst_timestamp {
          self.last_subst_timestamp = s.timestamp();
          self.cache.clear();
        }
      }
    } else {
      self.last_subst = handle;
      self.last_subst_timestamp = subst.map_or(0, |s| s.timestamp());
      self.cache.clear();
    }
  }

  /// Drop all cached state unconditionally.
  pub fn clear(&mut self) {
    self.cache.clear();
    self.normalizer.clear();
    self.last_ctx = None;
    self.last_subst = None;
    self.last_subst_timestamp = 0;
  }

  /// Arm or disarm cancellation; forwarded to the normalizer.
  pub fn set_interrupt(&self, flag: bool) {
    self.interrupted.store(flag, Ordering::Relaxed);
    self.normalizer.set_interrupt(flag);
  }

  /// Handle a supervising thread can use to arm cancellation.
  pub fn interrupt_flag(&self) -> Arc<AtomicBool> {
    self.interrupted.clone()
  }
}
