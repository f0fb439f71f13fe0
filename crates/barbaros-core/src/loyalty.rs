//! The visit-count reward ladder.
//!
//! Every recorded visit moves a client one rung up. Reaching a multiple of
//! `visits_per_reward` earns one reward, which staff can later redeem.

use serde::{Deserialize, Serialize};

use crate::client::ClientRecord;

/// Rungs per reward when not configured otherwise.
pub const DEFAULT_VISITS_PER_REWARD: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoyaltyPolicy {
  pub visits_per_reward: u32,
}

impl Default for LoyaltyPolicy {
  fn default() -> Self {
    Self { visits_per_reward: DEFAULT_VISITS_PER_REWARD }
  }
}

/// Counter changes produced by recording one visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisitCredit {
  pub visit_count:    u32,
  pub rewards_earned: u32,
}

impl LoyaltyPolicy {
  pub fn new(visits_per_reward: u32) -> Self {
    Self { visits_per_reward: visits_per_reward.max(1) }
  }

  /// Apply one visit to the current counters.
  pub fn credit_visit(&self, visit_count: u32, rewards_earned: u32) -> VisitCredit {
    let visit_count = visit_count.saturating_add(1);
    let rewards_earned = if visit_count % self.visits_per_reward == 0 {
      rewards_earned.saturating_add(1)
    } else {
      rewards_earned
    };
    VisitCredit { visit_count, rewards_earned }
  }

  /// Undo one visit. Rewards already earned are kept, whatever the policy.
  pub fn debit_visit(visit_count: u32) -> u32 { visit_count.saturating_sub(1) }

  pub fn status(&self, client: &ClientRecord) -> LoyaltyStatus {
    let per = self.visits_per_reward.max(1);
    let into_cycle = client.visit_count % per;
    LoyaltyStatus {
      visit_count:        client.visit_count,
      visits_per_reward:  per,
      visits_toward_next: into_cycle,
      visits_until_next:  per - into_cycle,
      rewards_earned:     client.rewards_earned,
      rewards_redeemed:   client.rewards_redeemed,
      rewards_available:  client
        .rewards_earned
        .saturating_sub(client.rewards_redeemed),
    }
  }
}

/// Progress report shown to a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoyaltyStatus {
  pub visit_count:        u32,
  pub visits_per_reward:  u32,
  pub visits_toward_next: u32,
  pub visits_until_next:  u32,
  pub rewards_earned:     u32,
  pub rewards_redeemed:   u32,
  pub rewards_available:  u32,
}
