//! Eligibility gate: decides, before any transfer, whether a wallet may vote
//! or create a proposal. Read-only; works from a cached balance and a vote
//! count the caller already fetched.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use fomo_types::{Proposal, ProposalCategory, ProposalStatus, TokenAmount, WalletAddress};

use crate::{GovernanceError, GovernanceParams, ValidationError};

/// A connected wallet and its last known reward-token balance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WalletSession {
    pub address: WalletAddress,
    pub balance: TokenAmount,
}

/// Proposal fields as entered by the author.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalDraft {
    pub title: String,
    pub description: String,
    pub category: ProposalCategory,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub author: String,
}

#[derive(Clone, Debug)]
pub struct EligibilityGate {
    vote_cost: TokenAmount,
    proposal_cost: TokenAmount,
    required_balance: TokenAmount,
    max_votes_per_day: u32,
    max_proposal_days: u32,
    decimals: u8,
}

impl EligibilityGate {
    pub fn new(params: &GovernanceParams) -> Result<Self, GovernanceError> {
        Ok(Self {
            vote_cost: params.total_vote_cost_raw()?,
            proposal_cost: params.proposal_cost_raw()?,
            required_balance: params.required_balance_raw()?,
            max_votes_per_day: params.max_votes_per_day,
            max_proposal_days: params.max_proposal_days,
            decimals: params.reward_decimals,
        })
    }

    /// Balance threshold for seeing governance at all.
    pub fn can_view(&self, balance: TokenAmount) -> bool {
        balance >= self.required_balance
    }

    pub fn require_wallet<'a>(
        &self,
        wallet: Option<&'a WalletSession>,
    ) -> Result<&'a WalletSession, ValidationError> {
        wallet.ok_or(ValidationError::WalletNotConnected)
    }

    /// Checks, in order: connected, balance covers burn + reward, proposal
    /// active, fewer than the daily cap cast today.
    pub fn check_vote(
        &self,
        wallet: Option<&WalletSession>,
        proposal: &Proposal,
        votes_today: u32,
    ) -> Result<(), ValidationError> {
        let wallet = self.require_wallet(wallet)?;
        self.require_balance(wallet, self.vote_cost)?;
        self.check_paid_vote(proposal, votes_today)
    }

    /// The proposal and cap checks of [`Self::check_vote`], for a vote whose
    /// transfers were already made.
    pub fn check_paid_vote(&self, proposal: &Proposal, votes_today: u32) -> Result<(), ValidationError> {
        if proposal.status != ProposalStatus::Active {
            return Err(ValidationError::ProposalNotActive(proposal.status));
        }
        if votes_today >= self.max_votes_per_day {
            return Err(ValidationError::DailyCapReached {
                cap: self.max_votes_per_day,
            });
        }
        Ok(())
    }

    /// Checks, in order: connected, balance covers the creation cost,
    /// non-empty title and description, start not before `today`, end after
    /// start, span within the maximum.
    pub fn check_proposal(
        &self,
        wallet: Option<&WalletSession>,
        draft: &ProposalDraft,
        today: NaiveDate,
    ) -> Result<(), ValidationError> {
        let wallet = self.require_wallet(wallet)?;
        self.require_balance(wallet, self.proposal_cost)?;
        self.check_draft(draft, today)
    }

    /// The field and date checks of [`Self::check_proposal`], for a
    /// proposal whose cost was already paid.
    pub fn check_draft(&self, draft: &ProposalDraft, today: NaiveDate) -> Result<(), ValidationError> {
        if draft.title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        if draft.description.trim().is_empty() {
            return Err(ValidationError::EmptyDescription);
        }
        if draft.start_date < today {
            return Err(ValidationError::StartInPast);
        }
        if draft.end_date <= draft.start_date {
            return Err(ValidationError::EndNotAfterStart);
        }
        let days = (draft.end_date - draft.start_date).num_days();
        if days > i64::from(self.max_proposal_days) {
            return Err(ValidationError::DurationTooLong {
                days,
                max: self.max_proposal_days,
            });
        }
        Ok(())
    }

    fn require_balance(
        &self,
        wallet: &WalletSession,
        need: TokenAmount,
    ) -> Result<(), ValidationError> {
        if wallet.balance < need {
            return Err(ValidationError::InsufficientBalance {
                need: need.to_ui_string(self.decimals),
                have: wallet.balance.to_ui_string(self.decimals),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fomo_nullables::test_wallet;
    use fomo_types::{ProposalId, Timestamp};
    use proptest::prelude::*;

    fn gate() -> EligibilityGate {
        EligibilityGate::new(&GovernanceParams::default()).unwrap()
    }

    fn wallet(whole: u64) -> WalletSession {
        WalletSession {
            address: test_wallet(1),
            balance: TokenAmount::from_whole(whole, 6).unwrap(),
        }
    }

    fn proposal(status: ProposalStatus) -> Proposal {
        Proposal {
            id: ProposalId::from_sequence(1),
            title: "t".into(),
            description: "d".into(),
            category: ProposalCategory::Other,
            status,
            votes_for: 0,
            votes_against: 0,
            total_votes: 0,
            start_date: date(1),
            end_date: date(10),
            author: "a".into(),
            creator_wallet: test_wallet(2),
            created_at: Timestamp::new(0),
        }
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 7, day).unwrap()
    }

    fn draft(start: NaiveDate, end: NaiveDate) -> ProposalDraft {
        ProposalDraft {
            title: "Lower swap fee".into(),
            description: "From 0.3% to 0.25%".into(),
            category: ProposalCategory::Protocol,
            start_date: start,
            end_date: end,
            author: "anon".into(),
        }
    }

    #[test]
    fn vote_checks_run_in_order() {
        let g = gate();
        let active = proposal(ProposalStatus::Active);
        assert_eq!(
            g.check_vote(None, &active, 0),
            Err(ValidationError::WalletNotConnected)
        );
        assert!(matches!(
            g.check_vote(Some(&wallet(19_999)), &proposal(ProposalStatus::Passed), 9),
            Err(ValidationError::InsufficientBalance { .. })
        ));
        assert_eq!(
            g.check_vote(Some(&wallet(250_000)), &proposal(ProposalStatus::Passed), 9),
            Err(ValidationError::ProposalNotActive(ProposalStatus::Passed))
        );
        assert_eq!(
            g.check_vote(Some(&wallet(250_000)), &active, 5),
            Err(ValidationError::DailyCapReached { cap: 5 })
        );
        assert_eq!(g.check_vote(Some(&wallet(250_000)), &active, 4), Ok(()));
    }

    #[test]
    fn exact_vote_cost_is_enough() {
        assert!(gate()
            .check_vote(Some(&wallet(20_000)), &proposal(ProposalStatus::Active), 0)
            .is_ok());
    }

    #[test]
    fn start_today_accepted_yesterday_rejected() {
        let g = gate();
        let w = wallet(100_000);
        assert_eq!(g.check_proposal(Some(&w), &draft(date(5), date(6)), date(5)), Ok(()));
        assert_eq!(
            g.check_proposal(Some(&w), &draft(date(4), date(6)), date(5)),
            Err(ValidationError::StartInPast)
        );
    }

    #[test]
    fn end_equal_to_start_is_rejected() {
        assert_eq!(
            gate().check_proposal(Some(&wallet(100_000)), &draft(date(5), date(5)), date(5)),
            Err(ValidationError::EndNotAfterStart)
        );
    }

    #[test]
    fn blank_title_is_rejected_before_dates() {
        let mut d = draft(date(1), date(1));
        d.title = "   ".into();
        assert_eq!(
            gate().check_proposal(Some(&wallet(100_000)), &d, date(5)),
            Err(ValidationError::EmptyTitle)
        );
    }

    #[test]
    fn proposal_cost_gates_creation() {
        assert!(matches!(
            gate().check_proposal(Some(&wallet(99_999)), &draft(date(5), date(6)), date(5)),
            Err(ValidationError::InsufficientBalance { .. })
        ));
    }

    #[test]
    fn view_threshold() {
        let g = gate();
        assert!(g.can_view(TokenAmount::from_whole(50_000, 6).unwrap()));
        assert!(!g.can_view(TokenAmount::from_whole(49_999, 6).unwrap()));
    }

    proptest! {
        #[test]
        fn span_within_max_is_accepted(span in 1u32..=30, offset in 0u32..60) {
            let today = date(1);
            let start = today + chrono::Days::new(u64::from(offset));
            let end = start + chrono::Days::new(u64::from(span));
            prop_assert_eq!(
                gate().check_proposal(Some(&wallet(100_000)), &draft(start, end), today),
                Ok(())
            );
        }

        #[test]
        fn span_over_max_is_rejected(span in 31u32..400) {
            let start = date(1);
            let end = start + chrono::Days::new(u64::from(span));
            let is_too_long = matches!(
                gate().check_proposal(Some(&wallet(100_000)), &draft(start, end), start),
                Err(ValidationError::DurationTooLong { max: 30, .. })
            );
            prop_assert!(is_too_long);
        }

        #[test]
        fn balance_below_vote_cost_never_passes(raw in 0u64..20_000_000_000) {
            let w = WalletSession { address: test_wallet(1), balance: TokenAmount::new(raw) };
            let is_insufficient = matches!(
                gate().check_vote(Some(&w), &proposal(ProposalStatus::Active), 0),
                Err(ValidationError::InsufficientBalance { .. })
            );
            prop_assert!(is_insufficient);
        }
    }
}
