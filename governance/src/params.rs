//! Governance cost model.
//!
//! Every amount is configured in whole tokens of the reward mint and
//! converted to raw units with `reward_decimals` at the point of use.

use serde::{Deserialize, Serialize};

use fomo_types::{MintAddress, TokenAmount, WalletAddress};

use crate::GovernanceError;

/// The FOMO token mint.
pub const FOMO_MINT: &str = "DSEUEGxgDizLLLrVXmCqyAwD9GScpBsoH7HLmMYqfomo";

/// Token-program incinerator: no withdrawal authority.
pub const BURN_SINK: &str = "1nc1nerator11111111111111111111111111111111";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernanceParams {
    /// Tokens burned per vote; also the weight a vote adds to `total_votes`.
    #[serde(default = "default_burn_amount")]
    pub burn_amount: u64,

    /// Tokens paid to the proposal creator per vote.
    #[serde(default = "default_creator_reward")]
    pub creator_reward: u64,

    /// Votes per wallet, per proposal, per UTC day.
    #[serde(default = "default_max_votes_per_day")]
    pub max_votes_per_day: u32,

    /// Tokens burned to create a proposal.
    #[serde(default = "default_proposal_cost")]
    pub proposal_cost: u64,

    #[serde(default = "default_max_proposal_days")]
    pub max_proposal_days: u32,

    /// Balance needed to view governance at all.
    #[serde(default = "default_required_balance")]
    pub required_balance: u64,

    #[serde(default = "default_burn_address")]
    pub burn_address: WalletAddress,

    #[serde(default = "default_reward_mint")]
    pub reward_mint: MintAddress,

    #[serde(default = "default_reward_decimals")]
    pub reward_decimals: u8,
}

fn default_burn_amount() -> u64 {
    10_000
}

fn default_creator_reward() -> u64 {
    10_000
}

fn default_max_votes_per_day() -> u32 {
    5
}

fn default_proposal_cost() -> u64 {
    100_000
}

fn default_max_proposal_days() -> u32 {
    30
}

fn default_required_balance() -> u64 {
    50_000
}

fn default_burn_address() -> WalletAddress {
    WalletAddress::new(BURN_SINK).unwrap_or_else(|_| unreachable!("burn sink is valid base58"))
}

fn default_reward_mint() -> MintAddress {
    MintAddress::new(FOMO_MINT).unwrap_or_else(|_| unreachable!("FOMO mint is valid base58"))
}

fn default_reward_decimals() -> u8 {
    6
}

impl Default for GovernanceParams {
    fn default() -> Self {
        Self {
            burn_amount: default_burn_amount(),
            creator_reward: default_creator_reward(),
            max_votes_per_day: default_max_votes_per_day(),
            proposal_cost: default_proposal_cost(),
            max_proposal_days: default_max_proposal_days(),
            required_balance: default_required_balance(),
            burn_address: default_burn_address(),
            reward_mint: default_reward_mint(),
            reward_decimals: default_reward_decimals(),
        }
    }
}

impl GovernanceParams {
    /// Burn plus creator reward, in whole tokens.
    pub fn total_vote_cost(&self) -> u64 {
        self.burn_amount.saturating_add(self.creator_reward)
    }

    pub fn burn_raw(&self) -> Result<TokenAmount, GovernanceError> {
        self.raw(self.burn_amount)
    }

    pub fn creator_reward_raw(&self) -> Result<TokenAmount, GovernanceError> {
        self.raw(self.creator_reward)
    }

    pub fn total_vote_cost_raw(&self) -> Result<TokenAmount, GovernanceError> {
        self.raw(self.total_vote_cost())
    }

    pub fn proposal_cost_raw(&self) -> Result<TokenAmount, GovernanceError> {
        self.raw(self.proposal_cost)
    }

    pub fn required_balance_raw(&self) -> Result<TokenAmount, GovernanceError> {
        self.raw(self.required_balance)
    }

    fn raw(&self, whole: u64) -> Result<TokenAmount, GovernanceError> {
        TokenAmount::from_whole(whole, self.reward_decimals)
            .map_err(|e| GovernanceError::InvalidParams(e.to_string()))
    }

    /// Reject configurations the workflow cannot run with.
    pub fn validate(&self) -> Result<(), GovernanceError> {
        let zero = [
            ("burn_amount", self.burn_amount == 0),
            ("creator_reward", self.creator_reward == 0),
            ("max_votes_per_day", self.max_votes_per_day == 0),
            ("proposal_cost", self.proposal_cost == 0),
            ("max_proposal_days", self.max_proposal_days == 0),
        ];
        if let Some((name, _)) = zero.iter().find(|(_, is_zero)| *is_zero) {
            return Err(GovernanceError::InvalidParams(format!("{name} must be non-zero")));
        }
        if self.burn_amount.checked_add(self.creator_reward).is_none() {
            return Err(GovernanceError::InvalidParams(
                "burn_amount + creator_reward overflows".into(),
            ));
        }
        self.total_vote_cost_raw()?;
        self.proposal_cost_raw()?;
        self.required_balance_raw()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_published_costs() {
        let p = GovernanceParams::default();
        assert_eq!(p.total_vote_cost(), 20_000);
        assert_eq!(p.burn_raw().unwrap().raw(), 10_000_000_000);
        assert_eq!(p.burn_address.as_str(), BURN_SINK);
        assert!(p.validate().is_ok());
    }

    #[test]
    fn zero_cap_is_rejected() {
        let p = GovernanceParams {
            max_votes_per_day: 0,
            ..GovernanceParams::default()
        };
        let err = p.validate().unwrap_err();
        assert!(err.to_string().contains("max_votes_per_day"));
    }

    #[test]
    fn amounts_that_overflow_raw_units_are_rejected() {
        let p = GovernanceParams {
            proposal_cost: u64::MAX / 10,
            ..GovernanceParams::default()
        };
        assert!(p.validate().is_err());
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let p: GovernanceParams = toml::from_str("burn_amount = 5\nreward_decimals = 9").unwrap();
        assert_eq!(p.burn_amount, 5);
        assert_eq!(p.creator_reward, 10_000);
        assert_eq!(p.reward_decimals, 9);
    }
}
