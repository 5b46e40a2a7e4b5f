//! Universe levels.
//!
//! The kernel's type-of-types hierarchy is predicative: `Type 0 : Type 1`,
//! `Type 1 : Type 2`, and so on. The Bool/Prop sort sits outside the
//! numeric tower and contributes nothing when levels are joined, so a Pi
//! type whose domain or range is a proposition does not climb the
//! hierarchy.

use std::fmt;

/// A universe level: the distinguished proposition sort, or a rung of the
/// numeric `Type` tower.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Level {
  /// The Bool/Prop sort. Unit element of [`Level::max`].
  Prop,
  /// `Type n`.
  Typ(u64),
}

impl Level {
  /// Join of two levels. `Prop` is the unit: `max(Prop, l) = l`.
  pub fn max(self, other: Level) -> Level {
    match (self, other) {
      (Level::Prop, r) => r,
      (l, Level::Prop) => l,
      (Level::Typ(a), Level::Typ(b)) => Level::Typ(a.max(b)),
    }
  }

  /// The next level up: the level of `Type l` itself.
  ///
  /// The sort of propositions lives at the bottom of the numeric tower,
  /// so `Prop.succ() == Typ(0)`.
  pub fn succ(self) -> Level {
    match self {
      Level::Prop => Level::Typ(0),
      Level::Typ(n) => Level::Typ(n + 1),
    }
  }

  pub fn is_prop(self) -> bool {
    matches!(self, Level::Prop)
  }
}

impl fmt::Display for Level {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Level::Prop => write!(f, "Prop"),
      Level::Typ(n) => write!(f, "{}", n),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use proptest::prelude::*;

  #[test]
  fn test_max_prop_unit() {
    assert_eq!(Level::Prop.max(Level::Prop), Level::Prop);
    assert_eq!(Level::Prop.max(Level::Typ(3)), Level::Typ(3));
    assert_eq!(Level::Typ(3).max(Level::Prop), Level::Typ(3));
  }

  #[test]
  fn test_max_numeric() {
    assert_eq!(Level::Typ(1).max(Level::Typ(4)), Level::Typ(4));
    assert_eq!(Level::Typ(4).max(Level::Typ(1)), Level::Typ(4));
    assert_eq!(Level::Typ(2).max(Level::Typ(2)), Level::Typ(2));
  }

  #[test]
  fn test_succ() {
    assert_eq!(Level::Prop.succ(), Level::Typ(0));
    assert_eq!(Level::Typ(0).succ(), Level::Typ(1));
    assert_eq!(Level::Typ(7).succ(), Level::Typ(8));
  }

  #[test]
  fn test_is_prop() {
    assert!(Level::Prop.is_prop());
    assert!(!Level::Typ(0).is_prop());
  }

  fn level_strategy() -> impl Strategy<Value = Level> {
    prop_oneof![Just(Level::Prop), (0u64..1000).prop_map(Level::Typ)]
  }

  proptest! {
    #[test]
    fn prop_max_commutative(a in level_strategy(), b in level_strategy()) {
      prop_assert_eq!(a.max(b), b.max(a));
    }

    #[test]
    fn prop_max_associative(
      a in level_strategy(),
      b in level_strategy(),
      c in level_strategy(),
    ) {
      prop_assert_eq!(a.max(b).max(c), a.max(b.max(c)));
    }

    #[test]
    fn prop_max_idempotent(a in level_strategy()) {
      prop_assert_eq!(a.max(a), a);
    }

    #[test]
    fn prop_succ_strictly_above(a in level_strategy()) {
      prop_assert_eq!(a.succ().max(a), a.succ());
      prop_assert_ne!(a.succ(), a);
    }
  }
}
