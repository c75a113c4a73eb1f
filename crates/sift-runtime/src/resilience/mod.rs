//! Limits on model calls: token budgets per phase and bounded retry.

mod budget;
mod retry;

pub use budget::{BudgetTracker, ModelUsage, Phase, TokenBudget};
pub use retry::RetryPolicy;
