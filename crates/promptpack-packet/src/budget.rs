use promptpack_utils::error::PackError;

/// Running token total against a fixed limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenBudget {
    /// Tokens consumed so far.
    pub used: usize,
    /// Maximum tokens allowed.
    pub limit: usize,
}

impl TokenBudget {
    #[must_use]
    pub const fn new(limit: usize) -> Self {
        Self { used: 0, limit }
    }

    /// Budget with `fixed` tokens already spent on the non-negotiable part of
    /// a prompt (question, title, instructions).
    ///
    /// # Errors
    ///
    /// Returns `PackError::BudgetExceeded` when `fixed` alone is over `limit`.
    pub fn reserve(limit: usize, fixed: usize) -> Result<Self, PackError> {
        if fixed > limit {
            return Err(PackError::BudgetExceeded {
                required: fixed,
                budget: limit,
            });
        }
        Ok(Self { used: fixed, limit })
    }

    #[must_use]
    pub const fn would_exceed(&self, tokens: usize) -> bool {
        match self.used.checked_add(tokens) {
            Some(total) => total > self.limit,
            None => true,
        }
    }

    pub const fn add(&mut self, tokens: usize) {
        self.used = self.used.saturating_add(tokens);
    }

    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.limit.saturating_sub(self.used)
    }

    #[must_use]
    pub const fn is_exceeded(&self) -> bool {
        self.used > self.limit
    }
}
