use proptest::prelude::*;

use chrono::NaiveDate;
use fomo_types::{
    Proposal, ProposalCategory, ProposalId, ProposalStatus, Timestamp, TokenAmount, WalletAddress,
};

fn sample_proposal(seq: u64) -> Proposal {
    Proposal {
        id: ProposalId::from_sequence(seq),
        title: "Reduce swap fee".into(),
        description: "Drop the platform fee to 0.1%".into(),
        category: ProposalCategory::Protocol,
        status: ProposalStatus::Active,
        votes_for: 0,
        votes_against: 0,
        total_votes: 0,
        start_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
        end_date: NaiveDate::from_ymd_opt(2026, 1, 15).unwrap(),
        author: "core team".into(),
        creator_wallet: WalletAddress::new("jQW54EhGhwunKjHeBWTVzp2AuN6N5Zs555URT2ACtav").unwrap(),
        created_at: Timestamp::new(1_760_000_000),
    }
}

proptest! {
    /// Timestamp ordering: new(a) <= new(b) iff a <= b.
    #[test]
    fn timestamp_ordering(a in 0u64..u64::MAX, b in 0u64..u64::MAX) {
        let ta = Timestamp::new(a);
        let tb = Timestamp::new(b);
        prop_assert_eq!(ta <= tb, a <= b);
    }

    /// Two timestamps share a calendar day iff they fall in the same 86 400 s bucket.
    #[test]
    fn day_index_buckets(a in 0u64..4_000_000_000, b in 0u64..4_000_000_000) {
        let same = Timestamp::new(a).day_index() == Timestamp::new(b).day_index();
        prop_assert_eq!(same, a / 86_400 == b / 86_400);
    }

    /// The day index and the chrono date agree.
    #[test]
    fn day_index_matches_date(secs in 0u64..4_000_000_000) {
        let ts = Timestamp::new(secs);
        let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
        prop_assert_eq!((ts.date() - epoch).num_days() as u64, ts.day_index().as_u64());
    }

    /// Whole-token conversion scales exactly when it does not overflow.
    #[test]
    fn whole_token_conversion(tokens in 0u64..1_000_000_000, decimals in 0u8..10) {
        let raw = TokenAmount::from_whole(tokens, decimals).unwrap().raw();
        prop_assert_eq!(raw, tokens * 10u64.pow(decimals as u32));
    }

    /// Sequential ids parse back to their sequence number.
    #[test]
    fn proposal_id_sequence(seq in 1u64..1_000_000) {
        let id = ProposalId::from_sequence(seq);
        prop_assert_eq!(ProposalId::parse(id.as_str()).unwrap().sequence(), seq);
    }
}

#[test]
fn proposal_survives_bincode_storage_encoding() {
    let proposal = sample_proposal(3);
    let encoded = bincode::serialize(&proposal).unwrap();
    let decoded: Proposal = bincode::deserialize(&encoded).unwrap();
    assert_eq!(decoded, proposal);
}

#[test]
fn proposal_json_uses_lowercase_tags() {
    let json = serde_json::to_value(sample_proposal(1)).unwrap();
    assert_eq!(json["id"], "FIP-001");
    assert_eq!(json["status"], "active");
    assert_eq!(json["category"], "protocol");
    assert_eq!(json["start_date"], "2026-01-01");
}
