//! LMDB implementation of ProposalStore.

use fomo_store::{ProposalStore, StoreError};
use fomo_types::{NewProposal, Proposal, ProposalId, ProposalStatus, Timestamp, TxSignature};
use heed::RwTxn;

use crate::codec::{decode, encode, proposal_key, read_u64};
use crate::{LmdbEnvironment, LmdbError};

const PROPOSAL_SEQ_KEY: &[u8] = b"proposal_seq";

impl ProposalStore for LmdbEnvironment {
    fn list_proposals(&self) -> Result<Vec<Proposal>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let iter = self.proposals_db.rev_iter(&rtxn).map_err(LmdbError::from)?;
        let mut results = Vec::new();
        for entry in iter {
            let (_key, val) = entry.map_err(LmdbError::from)?;
            results.push(decode(val)?);
        }
        Ok(results)
    }

    fn get_proposal(&self, id: &ProposalId) -> Result<Option<Proposal>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        match self
            .proposals_db
            .get(&rtxn, &proposal_key(id))
            .map_err(LmdbError::from)?
        {
            Some(bytes) => Ok(Some(decode(bytes)?)),
            None => Ok(None),
        }
    }

    fn insert_proposal(
        &self,
        proposal: NewProposal,
        now: Timestamp,
    ) -> Result<Proposal, StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let row = self.put_next_proposal(&mut wtxn, proposal, now)?;
        wtxn.commit().map_err(LmdbError::from)?;
        tracing::debug!(id = %row.id, "proposal inserted");
        Ok(row)
    }

    fn insert_paid_proposal(
        &self,
        proposal: NewProposal,
        burn_tx: &TxSignature,
        now: Timestamp,
    ) -> Result<Proposal, StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let sig_key = burn_tx.as_str().as_bytes();
        if self
            .used_signatures_db
            .get(&wtxn, sig_key)
            .map_err(LmdbError::from)?
            .is_some()
        {
            return Err(StoreError::SignatureReused(burn_tx.to_string()));
        }
        let row = self.put_next_proposal(&mut wtxn, proposal, now)?;
        self.used_signatures_db
            .put(&mut wtxn, sig_key, row.id.as_str().as_bytes())
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        tracing::debug!(id = %row.id, burn_tx = %burn_tx, "paid proposal inserted");
        Ok(row)
    }
}

impl LmdbEnvironment {
    fn put_next_proposal(
        &self,
        wtxn: &mut RwTxn<'_>,
        proposal: NewProposal,
        now: Timestamp,
    ) -> Result<Proposal, StoreError> {
        let seq = read_u64(
            self.meta_db
                .get(wtxn, PROPOSAL_SEQ_KEY)
                .map_err(LmdbError::from)?,
        )? + 1;

        let row = Proposal {
            id: ProposalId::from_sequence(seq),
            title: proposal.title,
            description: proposal.description,
            category: proposal.category,
            status: ProposalStatus::Active,
            votes_for: 0,
            votes_against: 0,
            total_votes: 0,
            start_date: proposal.start_date,
            end_date: proposal.end_date,
            author: proposal.author,
            creator_wallet: proposal.creator_wallet,
            created_at: now,
        };
        self.proposals_db
            .put(wtxn, &seq.to_be_bytes(), &encode(&row)?)
            .map_err(LmdbError::from)?;
        self.meta_db
            .put(wtxn, PROPOSAL_SEQ_KEY, &seq.to_be_bytes())
            .map_err(LmdbError::from)?;
        Ok(row)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::environment::tests::open_test_env;
    use chrono::NaiveDate;
    use fomo_nullables::test_wallet;
    use fomo_types::ProposalCategory;

    pub(crate) fn draft(title: &str) -> NewProposal {
        NewProposal {
            title: title.to_string(),
            description: "Burn 1% of treasury FOMO every epoch".into(),
            category: ProposalCategory::Treasury,
            start_date: NaiveDate::from_ymd_opt(2026, 5, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 5, 15).unwrap(),
            author: "degen".into(),
            creator_wallet: test_wallet(7),
        }
    }

    #[test]
    fn insert_assigns_sequential_ids_and_zero_tallies() {
        let (_dir, env) = open_test_env();
        let first = env.insert_proposal(draft("a"), Timestamp::new(10)).unwrap();
        let second = env.insert_proposal(draft("b"), Timestamp::new(20)).unwrap();

        assert_eq!(first.id.as_str(), "FIP-001");
        assert_eq!(second.id.as_str(), "FIP-002");
        assert_eq!(second.status, ProposalStatus::Active);
        assert_eq!((second.votes_for, second.votes_against, second.total_votes), (0, 0, 0));
    }

    #[test]
    fn list_is_newest_first() {
        let (_dir, env) = open_test_env();
        for (i, title) in ["a", "b", "c"].iter().enumerate() {
            env.insert_proposal(draft(title), Timestamp::new(i as u64)).unwrap();
        }
        let titles: Vec<_> = env
            .list_proposals()
            .unwrap()
            .into_iter()
            .map(|p| p.title)
            .collect();
        assert_eq!(titles, ["c", "b", "a"]);
    }

    #[test]
    fn get_and_creator_lookup() {
        let (_dir, env) = open_test_env();
        let p = env.insert_proposal(draft("a"), Timestamp::new(1)).unwrap();
        assert_eq!(env.get_proposal(&p.id).unwrap(), Some(p.clone()));
        assert_eq!(env.proposal_creator(&p.id).unwrap(), Some(test_wallet(7)));
        let missing = ProposalId::from_sequence(99);
        assert_eq!(env.get_proposal(&missing).unwrap(), None);
    }

    #[test]
    fn sequence_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let env = LmdbEnvironment::open(dir.path(), 16, 10 << 20).unwrap();
            env.insert_proposal(draft("a"), Timestamp::new(1)).unwrap();
        }
        let env = LmdbEnvironment::open(dir.path(), 16, 10 << 20).unwrap();
        let p = env.insert_proposal(draft("b"), Timestamp::new(2)).unwrap();
        assert_eq!(p.id.as_str(), "FIP-002");
    }

    #[test]
    fn paid_proposal_rejects_a_reused_burn() {
        let (_dir, env) = open_test_env();
        let sig = fomo_nullables::test_signature(5);
        let p = env.insert_paid_proposal(draft("a"), &sig, Timestamp::new(1)).unwrap();
        assert_eq!(p.id.as_str(), "FIP-001");

        let err = env
            .insert_paid_proposal(draft("again"), &sig, Timestamp::new(2))
            .unwrap_err();
        assert!(matches!(err, StoreError::SignatureReused(_)));
        assert_eq!(env.list_proposals().unwrap().len(), 1);
    }
}
