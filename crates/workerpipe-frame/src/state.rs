/// Receive-direction state: the pending payload cursor.
///
/// ```text
/// Idle ──header (len > 0)──▶ PayloadPending(len) ──drained──▶ Idle
///   └──header (len = 0)──▶ Idle
/// ```
///
/// Asking for the next message while `PayloadPending` is the only illegal
/// transition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RecvState {
    /// Positioned at a frame boundary.
    #[default]
    Idle,
    /// Inside a payload with `remaining` bytes not yet consumed.
    PayloadPending { remaining: u32 },
}

impl RecvState {
    /// The state right after a header declaring `length` payload bytes.
    pub(crate) fn pending(length: u32) -> Self {
        if length == 0 {
            RecvState::Idle
        } else {
            RecvState::PayloadPending { remaining: length }
        }
    }

    /// Payload bytes still owed by the current frame.
    pub fn remaining(&self) -> u32 {
        match self {
            RecvState::Idle => 0,
            RecvState::PayloadPending { remaining } => *remaining,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, RecvState::Idle)
    }

    /// Record that `n` payload bytes were handed to the caller.
    pub(crate) fn consume(&mut self, n: usize) {
        let consumed = u32::try_from(n).unwrap_or(u32::MAX);
        *self = Self::pending(self.remaining().saturating_sub(consumed));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_length_header_stays_idle() {
        assert_eq!(RecvState::pending(0), RecvState::Idle);
        assert!(RecvState::default().is_idle());
    }

    #[test]
    fn consuming_counts_down_to_idle() {
        let mut state = RecvState::pending(5);
        assert_eq!(state.remaining(), 5);

        state.consume(2);
        assert_eq!(state, RecvState::PayloadPending { remaining: 3 });

        state.consume(3);
        assert_eq!(state, RecvState::Idle);
    }

    #[test]
    fn consume_on_idle_is_a_no_op() {
        let mut state = RecvState::Idle;
        state.consume(0);
        assert!(state.is_idle());
    }
}
