//! LMDB implementation of VoteStore.
//!
//! `record_vote` runs every check and every write inside one write
//! transaction. LMDB admits a single writer at a time, so concurrent votes
//! on the same proposal serialize and no increment is lost.

use fomo_store::{RecordedVote, StoreError, VoteInsert, VoteStore};
use fomo_types::{DayIndex, Proposal, ProposalId, Vote, VoteChoice, WalletAddress};
use uuid::Uuid;

use crate::codec::{decode, encode, proposal_key, read_u32, timed_key, vote_day_key, wallet_prefix};
use crate::{LmdbEnvironment, LmdbError};

impl VoteStore for LmdbEnvironment {
    fn record_vote(&self, vote: VoteInsert, max_per_day: u32) -> Result<RecordedVote, StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;

        let pkey = proposal_key(&vote.proposal_id);
        let mut proposal: Proposal = match self
            .proposals_db
            .get(&wtxn, &pkey)
            .map_err(LmdbError::from)?
        {
            Some(bytes) => decode(bytes)?,
            None => return Err(StoreError::NotFound(vote.proposal_id.to_string())),
        };

        for sig in [&vote.burn_tx, &vote.reward_tx] {
            if self
                .used_signatures_db
                .get(&wtxn, sig.as_str().as_bytes())
                .map_err(LmdbError::from)?
                .is_some()
            {
                return Err(StoreError::SignatureReused(sig.to_string()));
            }
        }

        let day_key = vote_day_key(&vote.proposal_id, vote.created_at.day_index(), &vote.voter);
        let cast = read_u32(self.vote_days_db.get(&wtxn, &day_key).map_err(LmdbError::from)?)?;
        if cast >= max_per_day {
            return Err(StoreError::DailyCapReached {
                cast,
                cap: max_per_day,
            });
        }

        let row = Vote {
            id: Uuid::new_v4(),
            proposal_id: vote.proposal_id,
            voter: vote.voter,
            choice: vote.choice,
            weight: vote.weight,
            burn_tx: vote.burn_tx,
            reward_tx: vote.reward_tx,
            created_at: vote.created_at,
        };
        let vote_key = timed_key(&pkey, row.created_at, &row.id);
        let voter_key = timed_key(&wallet_prefix(&row.voter), row.created_at, &row.id);

        self.votes_db
            .put(&mut wtxn, &vote_key, &encode(&row)?)
            .map_err(LmdbError::from)?;
        self.voter_votes_db
            .put(&mut wtxn, &voter_key, &vote_key)
            .map_err(LmdbError::from)?;
        for sig in [&row.burn_tx, &row.reward_tx] {
            self.used_signatures_db
                .put(&mut wtxn, sig.as_str().as_bytes(), row.id.as_bytes())
                .map_err(LmdbError::from)?;
        }
        self.vote_days_db
            .put(&mut wtxn, &day_key, &(cast + 1).to_be_bytes())
            .map_err(LmdbError::from)?;

        match row.choice {
            VoteChoice::For => proposal.votes_for += 1,
            VoteChoice::Against => proposal.votes_against += 1,
        }
        proposal.total_votes = proposal.total_votes.saturating_add(row.weight);
        self.proposals_db
            .put(&mut wtxn, &pkey, &encode(&proposal)?)
            .map_err(LmdbError::from)?;

        wtxn.commit().map_err(LmdbError::from)?;
        Ok(RecordedVote {
            vote: row,
            proposal,
            votes_today: cast + 1,
        })
    }

    fn votes_today(
        &self,
        proposal: &ProposalId,
        wallet: &WalletAddress,
        day: DayIndex,
    ) -> Result<u32, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let key = vote_day_key(proposal, day, wallet);
        Ok(read_u32(self.vote_days_db.get(&rtxn, &key).map_err(LmdbError::from)?)?)
    }

    fn votes_by_wallet(&self, wallet: &WalletAddress) -> Result<Vec<Vote>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let prefix = wallet_prefix(wallet);
        let iter = self
            .voter_votes_db
            .rev_prefix_iter(&rtxn, &prefix)
            .map_err(LmdbError::from)?;
        let mut keys = Vec::new();
        for entry in iter {
            let (_key, vote_key) = entry.map_err(LmdbError::from)?;
            keys.push(vote_key.to_vec());
        }

        let mut results = Vec::with_capacity(keys.len());
        for key in keys {
            let bytes = self
                .votes_db
                .get(&rtxn, &key)
                .map_err(LmdbError::from)?
                .ok_or_else(|| StoreError::Corruption(format!("dangling vote index for {wallet}")))?;
            results.push(decode(bytes)?);
        }
        Ok(results)
    }

    fn votes_for_proposal(&self, proposal: &ProposalId) -> Result<Vec<Vote>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let iter = self
            .votes_db
            .prefix_iter(&rtxn, &proposal_key(proposal))
            .map_err(LmdbError::from)?;
        let mut results = Vec::new();
        for entry in iter {
            let (_key, val) = entry.map_err(LmdbError::from)?;
            results.push(decode(val)?);
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::tests::open_test_env;
    use crate::proposal::tests::draft;
    use fomo_nullables::{test_signature, test_wallet};
    use fomo_store::ProposalStore;
    use fomo_types::Timestamp;
    use std::sync::Arc;

    const DAY: u64 = 86_400;

    fn insert(proposal: &ProposalId, voter: u64, sig: u64, at: u64, choice: VoteChoice) -> VoteInsert {
        VoteInsert {
            proposal_id: proposal.clone(),
            voter: test_wallet(voter),
            choice,
            weight: 10_000,
            burn_tx: test_signature(sig),
            reward_tx: test_signature(sig + 1),
            created_at: Timestamp::new(at),
        }
    }

    #[test]
    fn vote_increments_side_and_weighted_total() {
        let (_dir, env) = open_test_env();
        let p = env.insert_proposal(draft("a"), Timestamp::new(1)).unwrap();

        let first = env.record_vote(insert(&p.id, 1, 10, DAY, VoteChoice::For), 5).unwrap();
        assert_eq!(first.proposal.votes_for, 1);
        assert_eq!(first.proposal.total_votes, 10_000);
        assert_eq!(first.votes_today, 1);

        let second = env
            .record_vote(insert(&p.id, 2, 20, DAY, VoteChoice::Against), 5)
            .unwrap();
        assert_eq!(second.proposal.votes_against, 1);
        assert_eq!(second.proposal.total_votes, 20_000);
        assert_eq!(env.get_proposal(&p.id).unwrap().unwrap(), second.proposal);
    }

    #[test]
    fn unknown_proposal_is_not_found() {
        let (_dir, env) = open_test_env();
        let err = env
            .record_vote(insert(&ProposalId::from_sequence(3), 1, 10, DAY, VoteChoice::For), 5)
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn daily_cap_is_per_wallet_per_proposal_per_day() {
        let (_dir, env) = open_test_env();
        let p = env.insert_proposal(draft("a"), Timestamp::new(1)).unwrap();
        let q = env.insert_proposal(draft("b"), Timestamp::new(2)).unwrap();

        for i in 0..5 {
            env.record_vote(insert(&p.id, 1, 100 + i * 2, DAY + i, VoteChoice::For), 5)
                .unwrap();
        }
        let err = env
            .record_vote(insert(&p.id, 1, 200, DAY + 10, VoteChoice::For), 5)
            .unwrap_err();
        assert!(matches!(err, StoreError::DailyCapReached { cast: 5, cap: 5 }));

        // Another proposal, another wallet, and the next UTC day are unaffected.
        env.record_vote(insert(&q.id, 1, 300, DAY + 10, VoteChoice::For), 5).unwrap();
        env.record_vote(insert(&p.id, 2, 400, DAY + 10, VoteChoice::For), 5).unwrap();
        env.record_vote(insert(&p.id, 1, 500, 2 * DAY, VoteChoice::For), 5).unwrap();

        let day = Timestamp::new(DAY).day_index();
        assert_eq!(env.votes_today(&p.id, &test_wallet(1), day).unwrap(), 5);
    }

    #[test]
    fn rejected_vote_leaves_no_trace() {
        let (_dir, env) = open_test_env();
        let p = env.insert_proposal(draft("a"), Timestamp::new(1)).unwrap();
        env.record_vote(insert(&p.id, 1, 10, DAY, VoteChoice::For), 1).unwrap();
        env.record_vote(insert(&p.id, 1, 20, DAY, VoteChoice::For), 1).unwrap_err();

        // Signatures of the refused vote were not consumed.
        env.record_vote(insert(&p.id, 1, 20, 2 * DAY, VoteChoice::For), 1).unwrap();
        assert_eq!(env.votes_for_proposal(&p.id).unwrap().len(), 2);
        assert_eq!(env.get_proposal(&p.id).unwrap().unwrap().total_votes, 20_000);
    }

    #[test]
    fn reused_signature_is_refused() {
        let (_dir, env) = open_test_env();
        let p = env.insert_proposal(draft("a"), Timestamp::new(1)).unwrap();
        env.record_vote(insert(&p.id, 1, 10, DAY, VoteChoice::For), 5).unwrap();
        // Burn signature of the second vote equals the first vote's reward signature.
        let err = env
            .record_vote(insert(&p.id, 2, 11, DAY, VoteChoice::For), 5)
            .unwrap_err();
        assert!(matches!(err, StoreError::SignatureReused(_)));
    }

    #[test]
    fn votes_by_wallet_are_newest_first() {
        let (_dir, env) = open_test_env();
        let p = env.insert_proposal(draft("a"), Timestamp::new(1)).unwrap();
        env.record_vote(insert(&p.id, 1, 10, DAY, VoteChoice::For), 5).unwrap();
        env.record_vote(insert(&p.id, 1, 20, DAY + 5, VoteChoice::Against), 5).unwrap();
        env.record_vote(insert(&p.id, 2, 30, DAY + 9, VoteChoice::For), 5).unwrap();

        let votes = env.votes_by_wallet(&test_wallet(1)).unwrap();
        assert_eq!(votes.len(), 2);
        assert_eq!(votes[0].choice, VoteChoice::Against);
        assert_eq!(votes[1].created_at, Timestamp::new(DAY));
    }

    #[test]
    fn concurrent_votes_lose_no_increment() {
        let (_dir, env) = open_test_env();
        let env = Arc::new(env);
        let p = env.insert_proposal(draft("a"), Timestamp::new(1)).unwrap();

        // Ten prior votes bring the total to 100000.
        for i in 0..10 {
            env.record_vote(insert(&p.id, 100 + i, 1_000 + i * 2, DAY, VoteChoice::For), 5)
                .unwrap();
        }
        assert_eq!(env.get_proposal(&p.id).unwrap().unwrap().total_votes, 100_000);

        let handles: Vec<_> = (0..2u64)
            .map(|t| {
                let env = Arc::clone(&env);
                let id = p.id.clone();
                std::thread::spawn(move || {
                    env.record_vote(insert(&id, 200 + t, 5_000 + t * 2, DAY, VoteChoice::For), 5)
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap().unwrap();
        }

        let after = env.get_proposal(&p.id).unwrap().unwrap();
        assert_eq!(after.total_votes, 120_000);
        assert_eq!(after.votes_for, 12);
    }
}
