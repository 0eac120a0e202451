//! Nullable store: thread-safe in-memory storage for testing.
//!
//! All state sits behind one mutex, so every trait method is atomic in the
//! same way an LMDB write transaction is.

use fomo_store::{
    AdminStore, PaymentJournal, ProposalStore, RecordedVote, RegistryStore, StoreError,
    TradeStore, VoteInsert, VoteStore,
};
use fomo_types::{
    AdminCredential, AdminSession, ApplicationStatus, DayIndex, ListedToken, ListingApplication,
    MintAddress, NewListedToken, NewListingApplication, NewProposal, PaymentRecord, Proposal,
    ProposalId, ProposalStatus, Timestamp, TradeRecord, TxSignature, Vote, VoteChoice,
    WalletAddress,
};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

#[derive(Default)]
struct State {
    proposals: BTreeMap<u64, Proposal>,
    next_proposal: u64,
    votes: Vec<Vote>,
    used_signatures: HashSet<String>,
    payments: HashMap<Uuid, PaymentRecord>,
    tokens: Vec<ListedToken>,
    applications: Vec<ListingApplication>,
    credentials: HashMap<String, AdminCredential>,
    sessions: HashMap<String, AdminSession>,
    trades: Vec<TradeRecord>,
}

/// An in-memory implementation of every store trait.
#[derive(Default)]
pub struct NullStore {
    state: Mutex<State>,
    fail_vote_writes: AtomicBool,
    fail_proposal_writes: AtomicBool,
}

impl NullStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `record_vote` fail with a backend error until reset.
    pub fn fail_vote_writes(&self, fail: bool) {
        self.fail_vote_writes.store(fail, Ordering::SeqCst);
    }

    /// Make `insert_proposal` fail with a backend error until reset.
    pub fn fail_proposal_writes(&self, fail: bool) {
        self.fail_proposal_writes.store(fail, Ordering::SeqCst);
    }

    /// Overwrite a proposal's status (status transitions are external).
    pub fn set_proposal_status(&self, id: &ProposalId, status: ProposalStatus) {
        if let Some(p) = self.lock().proposals.get_mut(&id.sequence()) {
            p.status = status;
        }
    }

    pub fn vote_count(&self) -> usize {
        self.lock().votes.len()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A panicking test thread must not wedge the others.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn newest_first<T>(mut rows: Vec<T>, created: impl Fn(&T) -> Timestamp) -> Vec<T> {
    // Stable sort keeps insertion order within one second; reverse makes it newest first.
    rows.sort_by_key(|r| created(r));
    rows.reverse();
    rows
}

impl ProposalStore for NullStore {
    fn list_proposals(&self) -> Result<Vec<Proposal>, StoreError> {
        Ok(self.lock().proposals.values().rev().cloned().collect())
    }

    fn get_proposal(&self, id: &ProposalId) -> Result<Option<Proposal>, StoreError> {
        Ok(self.lock().proposals.get(&id.sequence()).cloned())
    }

    fn insert_proposal(
        &self,
        proposal: NewProposal,
        now: Timestamp,
    ) -> Result<Proposal, StoreError> {
        if self.fail_proposal_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("injected proposal write failure".into()));
        }
        Ok(self.lock().push_proposal(proposal, now))
    }

    fn insert_paid_proposal(
        &self,
        proposal: NewProposal,
        burn_tx: &TxSignature,
        now: Timestamp,
    ) -> Result<Proposal, StoreError> {
        if self.fail_proposal_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("injected proposal write failure".into()));
        }
        let mut state = self.lock();
        if !state.used_signatures.insert(burn_tx.to_string()) {
            return Err(StoreError::SignatureReused(burn_tx.to_string()));
        }
        Ok(state.push_proposal(proposal, now))
    }
}

impl State {
    fn push_proposal(&mut self, proposal: NewProposal, now: Timestamp) -> Proposal {
        self.next_proposal += 1;
        let seq = self.next_proposal;
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
        self.proposals.insert(seq, row.clone());
        row
    }
}

impl VoteStore for NullStore {
    fn record_vote(&self, vote: VoteInsert, max_per_day: u32) -> Result<RecordedVote, StoreError> {
        if self.fail_vote_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("injected vote write failure".into()));
        }
        let mut state = self.lock();
        let seq = vote.proposal_id.sequence();
        if !state.proposals.contains_key(&seq) {
            return Err(StoreError::NotFound(vote.proposal_id.to_string()));
        }
        for sig in [&vote.burn_tx, &vote.reward_tx] {
            if state.used_signatures.contains(sig.as_str()) {
                return Err(StoreError::SignatureReused(sig.to_string()));
            }
        }
        let day = vote.created_at.day_index();
        let cast = state
            .votes
            .iter()
            .filter(|v| {
                v.proposal_id == vote.proposal_id
                    && v.voter == vote.voter
                    && v.created_at.day_index() == day
            })
            .count() as u32;
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
        state.used_signatures.insert(row.burn_tx.to_string());
        state.used_signatures.insert(row.reward_tx.to_string());
        state.votes.push(row.clone());

        let proposal = state
            .proposals
            .get_mut(&seq)
            .ok_or_else(|| StoreError::NotFound(row.proposal_id.to_string()))?;
        match row.choice {
            VoteChoice::For => proposal.votes_for += 1,
            VoteChoice::Against => proposal.votes_against += 1,
        }
        proposal.total_votes = proposal.total_votes.saturating_add(row.weight);

        Ok(RecordedVote {
            proposal: proposal.clone(),
            vote: row,
            votes_today: cast + 1,
        })
    }

    fn votes_today(
        &self,
        proposal: &ProposalId,
        wallet: &WalletAddress,
        day: DayIndex,
    ) -> Result<u32, StoreError> {
        Ok(self
            .lock()
            .votes
            .iter()
            .filter(|v| &v.proposal_id == proposal && &v.voter == wallet && v.created_at.day_index() == day)
            .count() as u32)
    }

    fn votes_by_wallet(&self, wallet: &WalletAddress) -> Result<Vec<Vote>, StoreError> {
        let rows = self
            .lock()
            .votes
            .iter()
            .filter(|v| &v.voter == wallet)
            .cloned()
            .collect();
        Ok(newest_first(rows, |v: &Vote| v.created_at))
    }

    fn votes_for_proposal(&self, proposal: &ProposalId) -> Result<Vec<Vote>, StoreError> {
        Ok(self
            .lock()
            .votes
            .iter()
            .filter(|v| &v.proposal_id == proposal)
            .cloned()
            .collect())
    }
}

impl PaymentJournal for NullStore {
    fn put_payment(&self, record: &PaymentRecord) -> Result<(), StoreError> {
        self.lock().payments.insert(record.id, record.clone());
        Ok(())
    }

    fn get_payment(&self, id: &Uuid) -> Result<Option<PaymentRecord>, StoreError> {
        Ok(self.lock().payments.get(id).cloned())
    }

    fn unsettled_payments(&self) -> Result<Vec<PaymentRecord>, StoreError> {
        let mut rows: Vec<PaymentRecord> = self
            .lock()
            .payments
            .values()
            .filter(|p| !p.is_settled())
            .cloned()
            .collect();
        rows.sort_by_key(|p| p.created_at);
        Ok(rows)
    }
}

impl RegistryStore for NullStore {
    fn list_tokens(&self) -> Result<Vec<ListedToken>, StoreError> {
        let rows = self.lock().tokens.clone();
        Ok(newest_first(rows, |t: &ListedToken| t.created_at))
    }

    fn get_token(&self, mint: &MintAddress) -> Result<Option<ListedToken>, StoreError> {
        Ok(self
            .lock()
            .tokens
            .iter()
            .find(|t| &t.mint_address == mint)
            .cloned())
    }

    fn add_token(&self, token: NewListedToken, now: Timestamp) -> Result<ListedToken, StoreError> {
        let mut state = self.lock();
        if state.tokens.iter().any(|t| t.mint_address == token.mint_address) {
            return Err(StoreError::Duplicate(token.mint_address.to_string()));
        }
        let row = ListedToken {
            id: Uuid::new_v4(),
            mint_address: token.mint_address,
            symbol: token.symbol,
            name: token.name,
            logo_uri: token.logo_uri,
            decimals: token.decimals,
            listed_by: token.listed_by,
            telegram: token.telegram,
            twitter: token.twitter,
            website: token.website,
            description: token.description,
            created_at: now,
        };
        state.tokens.push(row.clone());
        Ok(row)
    }

    fn remove_token(&self, mint: &MintAddress) -> Result<bool, StoreError> {
        let mut state = self.lock();
        let before = state.tokens.len();
        state.tokens.retain(|t| &t.mint_address != mint);
        Ok(state.tokens.len() != before)
    }

    fn submit_application(
        &self,
        application: NewListingApplication,
        now: Timestamp,
    ) -> Result<ListingApplication, StoreError> {
        let row = ListingApplication {
            id: Uuid::new_v4(),
            mint_address: application.mint_address,
            symbol: application.symbol,
            name: application.name,
            logo_uri: application.logo_uri,
            telegram: application.telegram,
            twitter: application.twitter,
            website: application.website,
            description: application.description,
            contact_email: application.contact_email,
            expedite: application.expedite,
            status: ApplicationStatus::Pending,
            created_at: now,
        };
        self.lock().applications.push(row.clone());
        Ok(row)
    }

    fn list_applications(&self) -> Result<Vec<ListingApplication>, StoreError> {
        let rows = self.lock().applications.clone();
        Ok(newest_first(rows, |a: &ListingApplication| a.created_at))
    }

    fn get_application(&self, id: &Uuid) -> Result<Option<ListingApplication>, StoreError> {
        Ok(self
            .lock()
            .applications
            .iter()
            .find(|a| &a.id == id)
            .cloned())
    }

    fn set_application_status(
        &self,
        id: &Uuid,
        status: ApplicationStatus,
    ) -> Result<bool, StoreError> {
        let mut state = self.lock();
        match state.applications.iter_mut().find(|a| &a.id == id) {
            Some(app) => {
                app.status = status;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl AdminStore for NullStore {
    fn get_credential(&self, username: &str) -> Result<Option<AdminCredential>, StoreError> {
        Ok(self.lock().credentials.get(username).cloned())
    }

    fn put_credential(&self, credential: &AdminCredential) -> Result<(), StoreError> {
        self.lock()
            .credentials
            .insert(credential.username.clone(), credential.clone());
        Ok(())
    }

    fn put_session(&self, session: &AdminSession) -> Result<(), StoreError> {
        self.lock()
            .sessions
            .insert(session.token.clone(), session.clone());
        Ok(())
    }

    fn get_session(&self, token: &str) -> Result<Option<AdminSession>, StoreError> {
        Ok(self.lock().sessions.get(token).cloned())
    }

    fn delete_session(&self, token: &str) -> Result<(), StoreError> {
        self.lock().sessions.remove(token);
        Ok(())
    }

    fn purge_sessions(&self, now: Timestamp) -> Result<usize, StoreError> {
        let mut state = self.lock();
        let before = state.sessions.len();
        state.sessions.retain(|_, s| !s.is_expired(now));
        Ok(before - state.sessions.len())
    }
}

impl TradeStore for NullStore {
    fn record_trade(&self, trade: &TradeRecord) -> Result<(), StoreError> {
        self.lock().trades.push(trade.clone());
        Ok(())
    }

    fn trade_history(
        &self,
        wallet: &WalletAddress,
        limit: usize,
    ) -> Result<Vec<TradeRecord>, StoreError> {
        let rows = self
            .lock()
            .trades
            .iter()
            .filter(|t| &t.wallet_address == wallet)
            .cloned()
            .collect();
        Ok(newest_first(rows, |t: &TradeRecord| t.created_at)
            .into_iter()
            .take(limit)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{test_signature, test_wallet};
    use chrono::NaiveDate;
    use fomo_types::ProposalCategory;

    fn draft() -> NewProposal {
        NewProposal {
            title: "List BONK".into(),
            description: "Add BONK to the default token set".into(),
            category: ProposalCategory::Listing,
            start_date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 3, 8).unwrap(),
            author: "anon".into(),
            creator_wallet: test_wallet(1),
        }
    }

    fn vote(proposal: &ProposalId, voter: u64, sig: u64, at: u64) -> VoteInsert {
        VoteInsert {
            proposal_id: proposal.clone(),
            voter: test_wallet(voter),
            choice: VoteChoice::For,
            weight: 10_000,
            burn_tx: test_signature(sig),
            reward_tx: test_signature(sig + 1),
            created_at: Timestamp::new(at),
        }
    }

    #[test]
    fn proposals_get_sequential_ids() {
        let store = NullStore::new();
        let a = store.insert_proposal(draft(), Timestamp::new(1)).unwrap();
        let b = store.insert_proposal(draft(), Timestamp::new(2)).unwrap();
        assert_eq!(a.id.as_str(), "FIP-001");
        assert_eq!(b.id.as_str(), "FIP-002");
        assert_eq!(store.list_proposals().unwrap()[0].id, b.id);
    }

    #[test]
    fn record_vote_rejects_reused_signature() {
        let store = NullStore::new();
        let p = store.insert_proposal(draft(), Timestamp::new(1)).unwrap();
        store.record_vote(vote(&p.id, 2, 10, 100), 5).unwrap();
        let err = store.record_vote(vote(&p.id, 3, 10, 200), 5).unwrap_err();
        assert!(matches!(err, StoreError::SignatureReused(_)));
    }

    #[test]
    fn duplicate_mint_is_rejected() {
        let store = NullStore::new();
        let token = NewListedToken {
            mint_address: MintAddress::sol(),
            symbol: "SOL".into(),
            name: "Solana".into(),
            logo_uri: None,
            decimals: 9,
            listed_by: None,
            telegram: None,
            twitter: None,
            website: None,
            description: None,
        };
        store.add_token(token.clone(), Timestamp::new(1)).unwrap();
        assert!(matches!(
            store.add_token(token, Timestamp::new(2)),
            Err(StoreError::Duplicate(_))
        ));
    }
}
