//! LMDB environment setup.

use std::path::Path;
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};

use crate::LmdbError;

/// The schema version that the current code writes.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

const SCHEMA_VERSION_KEY: &[u8] = b"schema_version";

/// Database names, one per logical table.
pub(crate) const DATABASES: &[&str] = &[
    "meta",
    "proposals",
    "votes",
    "voter_votes",
    "vote_days",
    "used_signatures",
    "payments",
    "tokens",
    "applications",
    "credentials",
    "sessions",
    "trades",
];

/// Wraps the LMDB environment and all database handles. Implements every
/// `fomo-store` trait; each trait method runs in its own transaction.
pub struct LmdbEnvironment {
    pub(crate) env: Arc<Env>,
    pub(crate) meta_db: Database<Bytes, Bytes>,
    /// `proposal_seq (BE u64)` → `Proposal`
    pub(crate) proposals_db: Database<Bytes, Bytes>,
    /// `proposal_seq ++ created_at ++ vote_id` → `Vote`
    pub(crate) votes_db: Database<Bytes, Bytes>,
    /// `voter ++ 0x00 ++ created_at ++ vote_id` → key into `votes_db`
    pub(crate) voter_votes_db: Database<Bytes, Bytes>,
    /// `proposal_seq ++ day ++ voter` → votes cast that day (BE u32)
    pub(crate) vote_days_db: Database<Bytes, Bytes>,
    /// `signature` → vote id
    pub(crate) used_signatures_db: Database<Bytes, Bytes>,
    /// `payment_id` → `PaymentRecord`
    pub(crate) payments_db: Database<Bytes, Bytes>,
    /// `mint` → `ListedToken`
    pub(crate) tokens_db: Database<Bytes, Bytes>,
    /// `application_id` → `ListingApplication`
    pub(crate) applications_db: Database<Bytes, Bytes>,
    /// `username` → `AdminCredential`
    pub(crate) credentials_db: Database<Bytes, Bytes>,
    /// `token` → `AdminSession`
    pub(crate) sessions_db: Database<Bytes, Bytes>,
    /// `wallet ++ 0x00 ++ created_at ++ trade_id` → `TradeRecord`
    pub(crate) trades_db: Database<Bytes, Bytes>,
}

impl LmdbEnvironment {
    /// Open or create an LMDB environment at the given path.
    pub fn open(path: &Path, max_dbs: u32, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path)?;
        // SAFETY: each environment path is opened once per process; the node
        // owns its data directory exclusively.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(max_dbs.max(DATABASES.len() as u32))
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let mut open = |name: &str| -> Result<Database<Bytes, Bytes>, LmdbError> {
            Ok(env.create_database(&mut wtxn, Some(name))?)
        };
        let meta_db = open("meta")?;
        let proposals_db = open("proposals")?;
        let votes_db = open("votes")?;
        let voter_votes_db = open("voter_votes")?;
        let vote_days_db = open("vote_days")?;
        let used_signatures_db = open("used_signatures")?;
        let payments_db = open("payments")?;
        let tokens_db = open("tokens")?;
        let applications_db = open("applications")?;
        let credentials_db = open("credentials")?;
        let sessions_db = open("sessions")?;
        let trades_db = open("trades")?;
        wtxn.commit()?;

        let this = Self {
            env: Arc::new(env),
            meta_db,
            proposals_db,
            votes_db,
            voter_votes_db,
            vote_days_db,
            used_signatures_db,
            payments_db,
            tokens_db,
            applications_db,
            credentials_db,
            sessions_db,
            trades_db,
        };
        this.check_schema_version()?;
        tracing::info!(path = %path.display(), map_size, "opened LMDB environment");
        Ok(this)
    }

    pub fn schema_version(&self) -> Result<u32, LmdbError> {
        let rtxn = self.env.read_txn()?;
        match self.meta_db.get(&rtxn, SCHEMA_VERSION_KEY)? {
            Some(bytes) => {
                let arr: [u8; 4] = bytes.try_into().map_err(|_| {
                    LmdbError::Serialization("schema_version has unexpected byte length".into())
                })?;
                Ok(u32::from_be_bytes(arr))
            }
            None => Ok(0),
        }
    }

    /// Stamp a fresh database with the current version; refuse a database
    /// written by a newer build.
    fn check_schema_version(&self) -> Result<(), LmdbError> {
        let stored = self.schema_version()?;
        if stored > CURRENT_SCHEMA_VERSION {
            return Err(LmdbError::Heed(format!(
                "database schema version {} is newer than supported version {}",
                stored, CURRENT_SCHEMA_VERSION
            )));
        }
        if stored < CURRENT_SCHEMA_VERSION {
            tracing::info!(from = stored, to = CURRENT_SCHEMA_VERSION, "stamping schema version");
            let mut wtxn = self.env.write_txn()?;
            self.meta_db
                .put(&mut wtxn, SCHEMA_VERSION_KEY, &CURRENT_SCHEMA_VERSION.to_be_bytes())?;
            wtxn.commit()?;
        }
        Ok(())
    }

    /// Entry counts per database, for startup logging.
    pub fn entry_counts(&self) -> Result<Vec<(&'static str, u64)>, LmdbError> {
        let rtxn = self.env.read_txn()?;
        let dbs = [
            self.meta_db,
            self.proposals_db,
            self.votes_db,
            self.voter_votes_db,
            self.vote_days_db,
            self.used_signatures_db,
            self.payments_db,
            self.tokens_db,
            self.applications_db,
            self.credentials_db,
            self.sessions_db,
            self.trades_db,
        ];
        let mut counts = Vec::with_capacity(dbs.len());
        for (name, db) in DATABASES.iter().zip(dbs) {
            counts.push((*name, db.len(&rtxn)?));
        }
        Ok(counts)
    }
}
