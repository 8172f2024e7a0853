// ============================================================
// Layer 2 — Step Schedule
// ============================================================
// Periodic actions in the training loop (logging, validation,
// checkpointing) fire on a modulo schedule. The sentinel -1
// disables a schedule entirely — including step 0, which every
// positive period would otherwise match. Any non-positive
// template is treated the same way, so an unvalidated config
// can never divide by zero here.

/// Schedule template value meaning "never fire".
pub const NEVER: i64 = -1;

pub fn is_current_step_match(current_step: i64, template: i64) -> bool {
    template > 0 && current_step % template == 0
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_divides_step() {
        assert!(is_current_step_match(10, 5));
        assert!(is_current_step_match(0, 5));
        assert!(!is_current_step_match(11, 5));
    }

    #[test]
    fn test_never_sentinel_blocks_every_step() {
        assert!(!is_current_step_match(10, NEVER));
        assert!(!is_current_step_match(0, NEVER));
        assert!(!is_current_step_match(-1, NEVER));
    }

    #[test]
    fn test_non_positive_template_never_matches() {
        assert!(!is_current_step_match(0, 0));
        assert!(!is_current_step_match(10, 0));
        assert!(!is_current_step_match(10, -5));
    }
}
