//! Container-wide configuration.

/// What to do when a contract is registered more than once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum DuplicatePolicy {
  /// The first registration answers lookups; later ones are kept but shadowed.
  #[default]
  FirstWins,
  /// The most recent registration answers lookups.
  LastWins,
  /// `build()` fails with `BuildError::DuplicateRegistration`.
  Reject,
}

/// Options applied when a [`ServiceCollection`](crate::ServiceCollection) is built.
///
/// ```
/// use fibre_di::{ContainerOptions, DuplicatePolicy};
///
/// let options = ContainerOptions::default().duplicate_policy(DuplicatePolicy::Reject);
/// assert!(options.detect_cycles);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ContainerOptions {
  pub duplicate_policy: DuplicatePolicy,
  /// Fail with `CyclicDependency` instead of recursing forever on a cycle of
  /// transients. Singleton and scoped re-entry is reported regardless, since
  /// it would otherwise block on its own cache slot.
  pub detect_cycles: bool,
}

impl Default for ContainerOptions {
  fn default() -> Self {
    Self {
      duplicate_policy: DuplicatePolicy::FirstWins,
      detect_cycles: true,
    }
  }
}

impl ContainerOptions {
  pub fn duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
    self.duplicate_policy = policy;
    self
  }

  pub fn detect_cycles(mut self, enabled: bool) -> Self {
    self.detect_cycles = enabled;
    self
  }
}
