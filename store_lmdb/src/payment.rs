//! LMDB implementation of PaymentJournal.

use fomo_store::{PaymentJournal, StoreError};
use fomo_types::PaymentRecord;
use uuid::Uuid;

use crate::codec::{decode, encode};
use crate::{LmdbEnvironment, LmdbError};

impl PaymentJournal for LmdbEnvironment {
    fn put_payment(&self, record: &PaymentRecord) -> Result<(), StoreError> {
        let bytes = encode(record)?;
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.payments_db
            .put(&mut wtxn, record.id.as_bytes(), &bytes)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn get_payment(&self, id: &Uuid) -> Result<Option<PaymentRecord>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        match self.payments_db.get(&rtxn, id.as_bytes()).map_err(LmdbError::from)? {
            Some(bytes) => Ok(Some(decode(bytes)?)),
            None => Ok(None),
        }
    }

    fn unsettled_payments(&self) -> Result<Vec<PaymentRecord>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let iter = self.payments_db.iter(&rtxn).map_err(LmdbError::from)?;
        let mut results = Vec::new();
        for entry in iter {
            let (_key, val) = entry.map_err(LmdbError::from)?;
            let record: PaymentRecord = decode(val)?;
            if !record.is_settled() {
                results.push(record);
            }
        }
        results.sort_by_key(|r| r.created_at);
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::tests::open_test_env;
    use fomo_nullables::{test_signature, test_wallet};
    use fomo_types::{PaymentPurpose, PaymentState, ProposalId, Timestamp, VoteChoice};

    fn vote_payment(at: u64) -> PaymentRecord {
        PaymentRecord::new(
            test_wallet(1),
            PaymentPurpose::Vote {
                proposal_id: ProposalId::from_sequence(1),
                choice: VoteChoice::For,
                creator: test_wallet(2),
            },
            Timestamp::new(at),
        )
    }

    #[test]
    fn put_overwrites_and_get_reads_back() {
        let (_dir, env) = open_test_env();
        let mut record = vote_payment(10);
        env.put_payment(&record).unwrap();

        record.burn_tx = Some(test_signature(1));
        record.advance(PaymentState::BurnConfirmed, Timestamp::new(12));
        env.put_payment(&record).unwrap();

        assert_eq!(env.get_payment(&record.id).unwrap(), Some(record));
        assert_eq!(env.get_payment(&Uuid::new_v4()).unwrap(), None);
    }

    #[test]
    fn unsettled_excludes_terminal_states_oldest_first() {
        let (_dir, env) = open_test_env();
        let late = vote_payment(30);
        let early = vote_payment(10);
        let mut done = vote_payment(5);
        done.advance(PaymentState::Recorded, Timestamp::new(6));
        let mut dropped = vote_payment(7);
        dropped.advance(PaymentState::Abandoned, Timestamp::new(8));
        for r in [&late, &early, &done, &dropped] {
            env.put_payment(r).unwrap();
        }

        let ids: Vec<_> = env.unsettled_payments().unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![early.id, late.id]);
    }
}
