//! Session state machine.

/// Represents the lifecycle state of a session object during one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No identifier yet; nothing has been stored for this client.
    #[default]
    Unbound,
    /// Loaded from the store with no pending changes.
    Clean,
    /// Mutated since the last load or save.
    Dirty,
    /// Persisted during this request.
    Saved,
    /// Record removed from the store; the session can no longer be written.
    Deleted,
}

impl SessionState {
    /// Check if transition to target state is valid.
    ///
    /// Valid transitions:
    /// - Unbound -> Clean (loaded), Dirty (mutated), Saved (forced write)
    /// - Clean -> Dirty, Saved (forced write), Unbound (expired)
    /// - Dirty -> Saved, Unbound (expired, or emptied and removed on save)
    /// - Saved -> Dirty, Saved, Unbound (expired)
    /// - any state -> Deleted
    pub fn can_transition_to(&self, target: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (*self, target),
            (Unbound, Clean)
                | (Unbound, Dirty)
                | (Unbound, Saved)
                | (Clean, Dirty)
                | (Clean, Saved)
                | (Clean, Unbound)
                | (Dirty, Saved)
                | (Dirty, Unbound)
                | (Saved, Dirty)
                | (Saved, Saved)
                | (Saved, Unbound)
                | (_, Deleted)
        )
    }

    /// Attempt to transition to a new state.
    ///
    /// Returns `Ok(())` if the transition is valid, or an error otherwise.
    pub fn transition_to(&mut self, target: SessionState) -> crate::Result<()> {
        if self.can_transition_to(target) {
            *self = target;
            Ok(())
        } else {
            Err(crate::error::SessionError::InvalidStateTransition {
                from: *self,
                to: target,
            })
        }
    }

    /// Check if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Deleted)
    }

    /// Check if the session has unsaved changes.
    pub fn is_dirty(&self) -> bool {
        matches!(self, SessionState::Dirty)
    }
}
