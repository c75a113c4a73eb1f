//! Token budgets for model calls.
//!
//! A run has one global allowance and one allowance per phase. A call is
//! admitted only when its estimate fits both; actual usage reported by the
//! provider is what gets charged.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::providers::TokenUsage;

/// Pipeline phase a model call is charged to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Screening,
    Optimization,
}

impl Phase {
    pub const ALL: [Phase; 2] = [Phase::Screening, Phase::Optimization];
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Screening => f.write_str("screening"),
            Phase::Optimization => f.write_str("optimization"),
        }
    }
}

/// A token ceiling with a running total.
#[derive(Debug)]
pub struct TokenBudget {
    max_tokens: u32,
    used: AtomicU32,
}

impl TokenBudget {
    pub fn new(max_tokens: u32) -> Self {
        Self {
            max_tokens,
            used: AtomicU32::new(0),
        }
    }

    pub fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    pub fn can_afford(&self, tokens: u32) -> bool {
        self.remaining() >= tokens
    }

    pub fn charge(&self, tokens: u32) {
        // saturate instead of wrapping on absurd usage reports
        let _ = self
            .used
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |used| {
                Some(used.saturating_add(tokens))
            });
    }

    pub fn used(&self) -> u32 {
        self.used.load(Ordering::SeqCst)
    }

    pub fn remaining(&self) -> u32 {
        self.max_tokens.saturating_sub(self.used())
    }
}

/// Calls and tokens charged so far.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModelUsage {
    pub calls: u32,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl ModelUsage {
    pub fn add(&mut self, usage: &TokenUsage) {
        self.calls += 1;
        self.prompt_tokens = self.prompt_tokens.saturating_add(usage.prompt_tokens);
        self.completion_tokens = self
            .completion_tokens
            .saturating_add(usage.completion_tokens);
    }

    pub fn total_tokens(&self) -> u32 {
        self.prompt_tokens.saturating_add(self.completion_tokens)
    }

    fn merged(self, other: ModelUsage) -> Self {
        Self {
            calls: self.calls + other.calls,
            prompt_tokens: self.prompt_tokens.saturating_add(other.prompt_tokens),
            completion_tokens: self.completion_tokens.saturating_add(other.completion_tokens),
        }
    }
}

#[derive(Debug, Default)]
struct PhaseUsage {
    screening: ModelUsage,
    optimization: ModelUsage,
}

impl PhaseUsage {
    fn get_mut(&mut self, phase: Phase) -> &mut ModelUsage {
        match phase {
            Phase::Screening => &mut self.screening,
            Phase::Optimization => &mut self.optimization,
        }
    }
}

/// Shared by every gateway of a run.
#[derive(Debug)]
pub struct BudgetTracker {
    global: TokenBudget,
    screening: TokenBudget,
    optimization: TokenBudget,
    usage: RwLock<PhaseUsage>,
}

impl BudgetTracker {
    pub fn new(global_max: u32, screening_max: u32, optimization_max: u32) -> Self {
        Self {
            global: TokenBudget::new(global_max),
            screening: TokenBudget::new(screening_max),
            optimization: TokenBudget::new(optimization_max),
            usage: RwLock::new(PhaseUsage::default()),
        }
    }

    pub fn phase_budget(&self, phase: Phase) -> &TokenBudget {
        match phase {
            Phase::Screening => &self.screening,
            Phase::Optimization => &self.optimization,
        }
    }

    /// Whether a call estimated at `tokens` fits the phase and global budgets.
    pub fn can_afford(&self, phase: Phase, tokens: u32) -> bool {
        self.phase_budget(phase).can_afford(tokens) && self.global.can_afford(tokens)
    }

    pub fn record_usage(&self, phase: Phase, usage: &TokenUsage) {
        let total = usage.total();
        self.phase_budget(phase).charge(total);
        self.global.charge(total);
        self.usage.write().get_mut(phase).add(usage);
    }

    pub fn usage(&self, phase: Phase) -> ModelUsage {
        let usage = self.usage.read();
        match phase {
            Phase::Screening => usage.screening,
            Phase::Optimization => usage.optimization,
        }
    }

    pub fn total_usage(&self) -> ModelUsage {
        let usage = self.usage.read();
        usage.screening.merged(usage.optimization)
    }

    pub fn remaining_global(&self) -> u32 {
        self.global.remaining()
    }

    pub fn remaining_phase(&self, phase: Phase) -> u32 {
        self.phase_budget(phase).remaining()
    }
}

impl Default for BudgetTracker {
    fn default() -> Self {
        Self::new(2_000_000, 1_500_000, 500_000)
    }
}
