//! Streak milestones and their freeze rewards.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use medwaster_core::{DomainError, DomainResult};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakMilestone {
    pub days: u32,
    /// Streak freezes granted when the milestone is first reached.
    pub freeze_reward: u32,
}

/// Milestones sorted by `days`, each length at most once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MilestoneTable {
    milestones: Vec<StreakMilestone>,
}

impl MilestoneTable {
    pub fn new(milestones: impl IntoIterator<Item = StreakMilestone>) -> DomainResult<Self> {
        let mut milestones: Vec<StreakMilestone> = milestones.into_iter().collect();
        if milestones.iter().any(|m| m.days == 0) {
            return Err(DomainError::validation("milestone must be at least one day"));
        }
        milestones.sort_by_key(|m| m.days);
        if milestones.windows(2).any(|pair| pair[0].days == pair[1].days) {
            return Err(DomainError::conflict("duplicate milestone length"));
        }
        Ok(Self { milestones })
    }

    pub fn milestones(&self) -> &[StreakMilestone] {
        &self.milestones
    }

    /// The first milestone strictly above `current`.
    pub fn next_after(&self, current: u32) -> Option<&StreakMilestone> {
        self.milestones.iter().find(|m| m.days > current)
    }

    pub fn days_until_next(&self, current: u32) -> Option<u32> {
        self.next_after(current).map(|m| m.days - current)
    }

    /// Milestones reached by `current` that are not in `achieved`, ascending.
    pub fn newly_reached<'a>(
        &'a self,
        current: u32,
        achieved: &'a BTreeSet<u32>,
    ) -> impl Iterator<Item = &'a StreakMilestone> + 'a {
        self.milestones
            .iter()
            .take_while(move |m| m.days <= current)
            .filter(move |m| !achieved.contains(&m.days))
    }
}

impl Default for MilestoneTable {
    fn default() -> Self {
        let milestones = [(3, 0), (7, 1), (14, 1), (30, 2), (60, 2), (100, 3)]
            .into_iter()
            .map(|(days, freeze_reward)| StreakMilestone { days, freeze_reward })
            .collect();
        Self { milestones }
    }
}
