//! Failure taxonomy of the light inference engine.

use crate::context::Context;
use crate::term::{MetaId, Name, Term};

#[derive(Debug)]
pub enum KernelError {
  /// A metavariable with no recorded type was queried.
  NoTypeForMetavar {
    meta: MetaId,
  },
  /// A constant reference with no recorded type (or no declaration at
  /// all).
  UntypedConstant {
    name: Name,
  },
  /// A term required to denote a type normalized to neither a sort nor
  /// Bool.
  TypeExpected {
    term: Term,
    context: Context,
  },
  /// An applied term's type never exposed a Pi head, even after
  /// normalization.
  FunctionExpected {
    term: Term,
    context: Context,
  },
  /// A variable index with no entry in the context.
  UnboundVariable {
    index: usize,
    context: Context,
  },
  /// The cancellation flag was armed at an expensive-node checkpoint.
  /// Transient: disarm and retry; the cache stays valid.
  Interrupted,
  /// Internal contract violation.
  KernelException {
    msg: String,
  },
}

impl std::fmt::Display for KernelError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      KernelError::NoTypeForMetavar { meta } => {
        write!(f, "metavariable {} does not have a type", meta)
      },
      KernelError::UntypedConstant { name } => {
        write!(f, "constant '{}' has no recorded type", name)
      },
      KernelError::TypeExpected { term, context } => {
        write!(
          f,
          "type expected at {} (context depth {})",
          term,
          context.len()
        )
      },
      KernelError::FunctionExpected { term, context } => {
        write!(
          f,
          "function expected at {} (context depth {})",
          term,
          context.len()
        )
      },
      KernelError::UnboundVariable { index, context } => {
        write!(
          f,
          "unbound variable #{} (context depth {})",
          index,
          context.len()
        )
      },
      KernelError::Interrupted => write!(f, "interrupted"),
      KernelError::KernelException { msg } => write!(f, "{}", msg),
    }
  }
}

impl std::error::Error for KernelError {}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::term::Builder;

  #[test]
  fn test_display() {
    let b = Builder::new();
    let err = KernelError::FunctionExpected {
      term: b.lit(crate::term::Lit::True),
      context: Context::empty(),
    };
    assert_eq!(err.to_string(), "function expected at true (context depth 0)");
    assert_eq!(KernelError::Interrupted.to_string(), "interrupted");
  }
}
