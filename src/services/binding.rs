//! Identity binding policy: whether a presented identity may use a license,
//! and whether this call should record a first-use binding.

/// Outcome of evaluating a presented identity against a license's lock state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingDecision {
    /// Lock disabled; the identity is never enforced.
    Unlocked,
    /// Locked and still unbound. The caller must commit the binding through
    /// the store's conditional write (hwid-is-null guard), never by a
    /// read-then-write.
    NeedsBind,
    /// Locked and already bound to exactly this identity.
    AlreadyBound,
    /// Locked and bound to a different identity.
    Mismatch,
}

impl BindingDecision {
    #[must_use]
    pub const fn is_accepted(self) -> bool {
        !matches!(self, Self::Mismatch)
    }
}

/// Pure binding decision. Comparison is exact and case-sensitive.
#[must_use]
pub fn evaluate(hwid_locked: bool, bound: Option<&str>, presented: &str) -> BindingDecision {
    if !hwid_locked {
        return BindingDecision::Unlocked;
    }

    match bound {
        None => BindingDecision::NeedsBind,
        Some(current) if current == presented => BindingDecision::AlreadyBound,
        Some(_) => BindingDecision::Mismatch,
    }
}
