use super::decision::TerminationReason;
use std::fmt;

/// Completion bookkeeping of the round currently being sampled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RoundProgress {
    pub round: usize,
    pub expected: usize,
    pub received: usize,
    pub failed: usize,
}

impl RoundProgress {
    pub fn new(round: usize, expected: usize) -> Self {
        Self {
            round,
            expected,
            received: 0,
            failed: 0,
        }
    }

    /// Every expected completion has arrived, successfully or not.
    pub fn is_settled(&self) -> bool {
        self.received + self.failed >= self.expected
    }

    pub fn outstanding(&self) -> usize {
        self.expected.saturating_sub(self.received + self.failed)
    }
}

/// Lifecycle of one campaign.
///
/// `Sampling -> Deciding -> {Expanding -> Sampling | Terminating -> Finished}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CampaignPhase {
    /// Created but not yet launched.
    Pending,
    Sampling(RoundProgress),
    Deciding,
    Expanding,
    Terminating,
    Finished { reason: TerminationReason },
}

impl CampaignPhase {
    pub fn is_finished(&self) -> bool {
        matches!(self, CampaignPhase::Finished { .. })
    }
}

impl fmt::Display for CampaignPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CampaignPhase::Pending => f.write_str("pending"),
            CampaignPhase::Sampling(progress) => write!(
                f,
                "sampling round {} ({}/{} received)",
                progress.round, progress.received, progress.expected
            ),
            CampaignPhase::Deciding => f.write_str("deciding"),
            CampaignPhase::Expanding => f.write_str("expanding"),
            CampaignPhase::Terminating => f.write_str("terminating"),
            CampaignPhase::Finished { reason } => write!(f, "finished ({})", reason),
        }
    }
}
