//! Hook lifecycle state machine
//!
//! Every surface shares the same transitions:
//!
//! ```text
//! Disabled --enable--> Enabled(Idle) <--swap/restore--> Enabled(Swapped)
//! Enabled(_) --disable--> Disabled
//! any --dispose--> Disposed
//! ```
//!
//! Repeating a transition is a no-op; anything but `dispose` on a disposed
//! hook is rejected.

use parking_lot::Mutex;

/// Whether a hook rewrites text in the target language
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapState {
    Idle,
    Swapped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookState {
    Disabled,
    Enabled(SwapState),
    Disposed,
}

impl HookState {
    pub fn is_enabled(self) -> bool {
        matches!(self, HookState::Enabled(_))
    }

    pub fn is_swapped(self) -> bool {
        self == HookState::Enabled(SwapState::Swapped)
    }

    /// The state after `transition`, or what kind of non-change it is
    pub fn apply(self, transition: Transition) -> Outcome {
        use HookState::*;
        use SwapState::*;
        use Transition::*;

        match (self, transition) {
            (Disposed, Dispose) => Outcome::NoOp,
            (Disposed, _) => Outcome::Rejected,
            (_, Dispose) => Outcome::Changed(Disposed),

            (Disabled, Enable) => Outcome::Changed(Enabled(Idle)),
            (Disabled, Disable | Restore) => Outcome::NoOp,
            (Disabled, Swap) => Outcome::Rejected,

            (Enabled(_), Enable) => Outcome::NoOp,
            (Enabled(_), Disable) => Outcome::Changed(Disabled),
            (Enabled(Idle), Swap) => Outcome::Changed(Enabled(Swapped)),
            (Enabled(Swapped), Swap) => Outcome::NoOp,
            (Enabled(Swapped), Restore) => Outcome::Changed(Enabled(Idle)),
            (Enabled(Idle), Restore) => Outcome::NoOp,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Enable,
    Disable,
    Swap,
    Restore,
    Dispose,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Changed(HookState),
    NoOp,
    Rejected,
}

/// Current state of one hook
///
/// The lock is only held while a transition is decided, never while the
/// surface reacts to it.
pub struct Lifecycle {
    state: Mutex<HookState>,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(HookState::Disabled),
        }
    }

    pub fn state(&self) -> HookState {
        *self.state.lock()
    }

    pub fn is_swapped(&self) -> bool {
        self.state().is_swapped()
    }

    pub fn transition(&self, transition: Transition) -> Outcome {
        let mut state = self.state.lock();
        let outcome = state.apply(transition);
        if let Outcome::Changed(next) = outcome {
            *state = next;
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_cycle() {
        let lifecycle = Lifecycle::new();
        assert_eq!(lifecycle.state(), HookState::Disabled);

        assert_eq!(
            lifecycle.transition(Transition::Enable),
            Outcome::Changed(HookState::Enabled(SwapState::Idle))
        );
        assert_eq!(
            lifecycle.transition(Transition::Swap),
            Outcome::Changed(HookState::Enabled(SwapState::Swapped))
        );
        assert!(lifecycle.is_swapped());
        assert_eq!(
            lifecycle.transition(Transition::Restore),
            Outcome::Changed(HookState::Enabled(SwapState::Idle))
        );
        assert_eq!(
            lifecycle.transition(Transition::Disable),
            Outcome::Changed(HookState::Disabled)
        );
        assert_eq!(
            lifecycle.transition(Transition::Dispose),
            Outcome::Changed(HookState::Disposed)
        );
    }

    #[test]
    fn test_repeats_are_noops() {
        let lifecycle = Lifecycle::new();
        assert_eq!(lifecycle.transition(Transition::Disable), Outcome::NoOp);
        assert_eq!(lifecycle.transition(Transition::Restore), Outcome::NoOp);

        lifecycle.transition(Transition::Enable);
        assert_eq!(lifecycle.transition(Transition::Enable), Outcome::NoOp);
        assert_eq!(lifecycle.transition(Transition::Restore), Outcome::NoOp);

        lifecycle.transition(Transition::Swap);
        assert_eq!(lifecycle.transition(Transition::Swap), Outcome::NoOp);
        assert!(lifecycle.is_swapped());
    }

    #[test]
    fn test_disposed_rejects_everything_but_dispose() {
        let lifecycle = Lifecycle::new();
        lifecycle.transition(Transition::Dispose);

        for transition in [
            Transition::Enable,
            Transition::Disable,
            Transition::Swap,
            Transition::Restore,
        ] {
            assert_eq!(lifecycle.transition(transition), Outcome::Rejected);
        }
        assert_eq!(lifecycle.transition(Transition::Dispose), Outcome::NoOp);
        assert_eq!(lifecycle.state(), HookState::Disposed);
    }

    #[test]
    fn test_swap_requires_enabled() {
        assert_eq!(HookState::Disabled.apply(Transition::Swap), Outcome::Rejected);
        assert!(!HookState::Disabled.is_swapped());
    }
}
