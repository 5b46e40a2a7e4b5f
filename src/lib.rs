//! Light type inference for a dependently-typed proof kernel.
//!
//! This crate implements the incremental, trusting companion to a full
//! type checker: given a term and a context it computes the term's type,
//! caching results per shared node and invalidating on context or
//! substitution changes. Declared let types are trusted rather than
//! re-verified, which keeps inference cheap enough to run everywhere the
//! kernel needs a type.

pub mod cache;
pub mod constraint;
pub mod context;
pub mod env;
pub mod error;
pub mod infer;
pub mod level;
pub mod metavar;
pub mod normalize;
pub mod term;

pub use constraint::{Constraint, ConstraintSeq};
pub use context::{Context, Entry};
pub use env::{declare, Declaration, Env};
pub use error::KernelError;
pub use infer::LightTypeChecker;
pub use level::Level;
pub use metavar::Substitution;
pub use normalize::Normalizer;
pub use term::{Builder, Lit, MetaId, Name, Term, TermNode};
