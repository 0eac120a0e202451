//! Request handlers, and the request and response bodies they use.
//!
//! Governance writes arrive after the caller's wallet has already made the
//! transfers: the handler confirms each signature on the ledger and then
//! records through the same [`fomo_governance::LedgerWriter`] the in-process
//! workflow uses.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use fomo_governance::{PaidVote, ProposalDraft, ValidationError};
use fomo_ledger::ConfirmationStatus;
use fomo_node::{CachedBalance, MarketSnapshot};
use fomo_registry::{ApplicationForm, ApplicationsByStatus, NewTrade, TokenForm};
use fomo_store::StoreError;
use fomo_types::{
    AdminSession, ListedToken, NewProposal, PaymentRecord, Proposal,
    ProposalId, Timestamp, TradeRecord, TxSignature, Vote, VoteChoice, WalletAddress,
};

use crate::error::{ApiResponse, RpcError};
use crate::server::{ApiStore, AppState};

type Shared<S> = State<Arc<AppState<S>>>;
type ApiResult<T> = Result<Json<ApiResponse<T>>, RpcError>;

fn wallet(raw: &str) -> Result<WalletAddress, RpcError> {
    WalletAddress::new(raw.trim()).map_err(|_| RpcError::BadRequest(format!("Invalid wallet address: {raw}")))
}

fn proposal_id(raw: &str) -> Result<ProposalId, RpcError> {
    ProposalId::parse(raw.trim()).map_err(|_| RpcError::BadRequest(format!("Invalid proposal id: {raw}")))
}

fn signature(raw: &str) -> Result<TxSignature, RpcError> {
    TxSignature::new(raw.trim())
        .map_err(|_| RpcError::BadRequest(format!("Invalid transaction signature: {raw}")))
}

fn bearer(headers: &HeaderMap) -> Result<&str, RpcError> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(RpcError::Unauthorized)
}

fn require_admin<S: ApiStore>(state: &AppState<S>, headers: &HeaderMap) -> Result<AdminSession, RpcError> {
    let token = bearer(headers)?;
    state
        .auth
        .authenticate(token, Timestamp::now())
        .map_err(|_| RpcError::Unauthorized)
}

/// A confirmed transaction or [`RpcError::NotConfirmed`].
async fn confirm_payment<S: ApiStore>(
    state: &AppState<S>,
    tx: &TxSignature,
    step: &'static str,
) -> Result<(), RpcError> {
    match state.ledger.confirm(tx).await? {
        ConfirmationStatus::Confirmed => Ok(()),
        status => {
            if let Some(m) = &state.metrics {
                m.payment_failures.with_label_values(&[step]).inc();
            }
            warn!(tx = %tx, step, ?status, "payment not confirmed");
            Err(RpcError::NotConfirmed(tx.to_string()))
        }
    }
}

// ── Node ─────────────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub listed_tokens: usize,
    pub market_tokens: usize,
    pub watched_wallets: usize,
}

pub async fn health<S: ApiStore>(State(state): Shared<S>) -> ApiResult<HealthResponse> {
    Ok(ApiResponse::ok(HealthResponse {
        status: "ok",
        listed_tokens: state.tokens.tokens().len(),
        market_tokens: state.prices.snapshot().tokens.len(),
        watched_wallets: state.balances.watched().len(),
    }))
}

pub async fn metrics<S: ApiStore>(State(state): Shared<S>) -> Result<impl IntoResponse, RpcError> {
    let Some(m) = &state.metrics else {
        return Err(RpcError::NotFound("Metrics are disabled.".into()));
    };
    let body = m.encode().map_err(|e| RpcError::Server(e.to_string()))?;
    Ok(([(CONTENT_TYPE, "text/plain; version=0.0.4")], body))
}

// ── Governance ───────────────────────────────────────────────────────────

pub async fn list_proposals<S: ApiStore>(State(state): Shared<S>) -> ApiResult<Vec<Proposal>> {
    Ok(ApiResponse::ok(state.governance.proposals()?))
}

pub async fn get_proposal<S: ApiStore>(
    State(state): Shared<S>,
    Path(id): Path<String>,
) -> ApiResult<Proposal> {
    let id = proposal_id(&id)?;
    let proposal = state
        .governance
        .proposal(&id)?
        .ok_or_else(|| RpcError::NotFound(format!("Proposal {id} not found.")))?;
    Ok(ApiResponse::ok(proposal))
}

#[derive(Serialize)]
pub struct CreatorResponse {
    pub creator_wallet: WalletAddress,
}

/// Where the creator reward for a vote on this proposal must go.
pub async fn proposal_creator<S: ApiStore>(
    State(state): Shared<S>,
    Path(id): Path<String>,
) -> ApiResult<CreatorResponse> {
    let id = proposal_id(&id)?;
    let proposal = state
        .governance
        .proposal(&id)?
        .ok_or_else(|| RpcError::NotFound(format!("Proposal {id} not found.")))?;
    Ok(ApiResponse::ok(CreatorResponse {
        creator_wallet: proposal.creator_wallet,
    }))
}

#[derive(Deserialize)]
pub struct CastVoteRequest {
    pub wallet: String,
    pub choice: VoteChoice,
    pub burn_tx: String,
    pub reward_tx: String,
}

#[derive(Serialize)]
pub struct CastVoteResponse {
    pub vote: Vote,
    pub proposal: Proposal,
    pub votes_today: u32,
}

pub async fn cast_vote<S: ApiStore>(
    State(state): Shared<S>,
    Path(id): Path<String>,
    Json(req): Json<CastVoteRequest>,
) -> Result<impl IntoResponse, RpcError> {
    let id = proposal_id(&id)?;
    let voter = wallet(&req.wallet)?;
    let burn_tx = signature(&req.burn_tx)?;
    let reward_tx = signature(&req.reward_tx)?;
    if burn_tx == reward_tx {
        return Err(RpcError::BadRequest("Burn and reward signatures must differ.".into()));
    }

    let now = Timestamp::now();
    let proposal = state
        .governance
        .proposal(&id)?
        .ok_or(ValidationError::ProposalNotFound(id.clone()))?;
    let today = state.governance.votes_today(&id, &voter, now)?;
    state.governance.gate().check_paid_vote(&proposal, today)?;

    confirm_payment(&state, &burn_tx, "burn").await?;
    confirm_payment(&state, &reward_tx, "reward").await?;

    let paid = PaidVote {
        proposal_id: id,
        voter,
        choice: req.choice,
        burn_tx,
        reward_tx,
    };
    match state.governance.writer().record_vote(paid, now) {
        Ok(recorded) => {
            if let Some(m) = &state.metrics {
                m.votes_recorded.inc();
            }
            Ok((
                StatusCode::CREATED,
                ApiResponse::ok(CastVoteResponse {
                    vote: recorded.vote,
                    proposal: recorded.proposal,
                    votes_today: recorded.votes_today,
                }),
            ))
        }
        Err(e) if e.is_replay() => Err(RpcError::Conflict(
            "These transactions were already used for a vote.".into(),
        )),
        Err(e) => {
            if let StoreError::DailyCapReached { cap, .. } = &e.source {
                return Err(ValidationError::DailyCapReached { cap: *cap }.into());
            }
            if let Some(m) = &state.metrics {
                m.ledger_write_failures.inc();
            }
            Err(RpcError::Governance(e.into()))
        }
    }
}

#[derive(Deserialize)]
pub struct CreateProposalRequest {
    #[serde(flatten)]
    pub draft: ProposalDraft,
    pub creator_wallet: String,
    pub burn_tx: String,
}

pub async fn create_proposal<S: ApiStore>(
    State(state): Shared<S>,
    Json(req): Json<CreateProposalRequest>,
) -> Result<impl IntoResponse, RpcError> {
    let creator = wallet(&req.creator_wallet)?;
    let burn_tx = signature(&req.burn_tx)?;
    let now = Timestamp::now();
    state.governance.gate().check_draft(&req.draft, now.date())?;

    confirm_payment(&state, &burn_tx, "creation").await?;

    let draft = req.draft;
    let proposal = NewProposal {
        title: draft.title.trim().to_string(),
        description: draft.description.trim().to_string(),
        category: draft.category,
        start_date: draft.start_date,
        end_date: draft.end_date,
        author: draft.author,
        creator_wallet: creator,
    };
    match state.governance.writer().record_proposal(proposal, burn_tx, now) {
        Ok(row) => {
            if let Some(m) = &state.metrics {
                m.proposals_created.inc();
            }
            Ok((StatusCode::CREATED, ApiResponse::ok(row)))
        }
        Err(e) if e.is_replay() => Err(RpcError::Conflict(
            "This transaction was already used for a proposal.".into(),
        )),
        Err(e) => {
            if let Some(m) = &state.metrics {
                m.ledger_write_failures.inc();
            }
            Err(RpcError::Governance(e.into()))
        }
    }
}

#[derive(Deserialize)]
pub struct WalletQuery {
    pub wallet: String,
}

#[derive(Serialize)]
pub struct VotesTodayResponse {
    pub votes_today: u32,
    pub cap: u32,
    pub remaining: u32,
}

pub async fn votes_today<S: ApiStore>(
    State(state): Shared<S>,
    Path(id): Path<String>,
    Query(q): Query<WalletQuery>,
) -> ApiResult<VotesTodayResponse> {
    let id = proposal_id(&id)?;
    let voter = wallet(&q.wallet)?;
    let cast = state.governance.votes_today(&id, &voter, Timestamp::now())?;
    let cap = state.governance.params().max_votes_per_day;
    Ok(ApiResponse::ok(VotesTodayResponse {
        votes_today: cast,
        cap,
        remaining: cap.saturating_sub(cast),
    }))
}

pub async fn wallet_votes<S: ApiStore>(
    State(state): Shared<S>,
    Path(raw): Path<String>,
) -> ApiResult<Vec<Vote>> {
    let voter = wallet(&raw)?;
    Ok(ApiResponse::ok(state.governance.user_votes(&voter)?))
}

#[derive(Serialize)]
pub struct BalanceResponse {
    pub wallet: WalletAddress,
    pub raw: u64,
    pub ui: String,
    /// Whether the balance meets the governance viewing threshold.
    pub can_view: bool,
    pub fetched_at: Timestamp,
}

/// Served from the balance cache; a first request reads the ledger and
/// starts tracking the wallet until it goes idle.
pub async fn wallet_balance<S: ApiStore>(
    State(state): Shared<S>,
    Path(raw): Path<String>,
) -> ApiResult<BalanceResponse> {
    let address = wallet(&raw)?;
    let now = Timestamp::now();
    let cached = match state.balances.get(&address, now) {
        Some(c) => c,
        None => {
            let session = state.governance.wallet_session(address.clone()).await?;
            state.balances.set(address.clone(), session.balance, now);
            CachedBalance {
                balance: session.balance,
                fetched_at: now,
            }
        }
    };
    let params = state.governance.params();
    Ok(ApiResponse::ok(BalanceResponse {
        wallet: address,
        raw: cached.balance.raw(),
        ui: cached.balance.to_ui_string(params.reward_decimals),
        can_view: state.governance.gate().can_view(cached.balance),
        fetched_at: cached.fetched_at,
    }))
}

pub async fn unsettled_payments<S: ApiStore>(
    State(state): Shared<S>,
    headers: HeaderMap,
) -> ApiResult<Vec<PaymentRecord>> {
    require_admin(&state, &headers)?;
    Ok(ApiResponse::ok(state.governance.unsettled_payments()?))
}

// ── Trades ───────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

pub async fn record_trade<S: ApiStore>(
    State(state): Shared<S>,
    Json(trade): Json<NewTrade>,
) -> Result<impl IntoResponse, RpcError> {
    let row = state.trades.record(trade, Timestamp::now())?;
    Ok((StatusCode::CREATED, ApiResponse::ok(row)))
}

pub async fn trade_history<S: ApiStore>(
    State(state): Shared<S>,
    Path(raw): Path<String>,
    Query(q): Query<HistoryQuery>,
) -> ApiResult<Vec<TradeRecord>> {
    let address = wallet(&raw)?;
    Ok(ApiResponse::ok(state.trades.history(&address, q.limit)?))
}

// ── Market and registry ──────────────────────────────────────────────────

pub async fn list_tokens<S: ApiStore>(State(state): Shared<S>) -> ApiResult<Vec<ListedToken>> {
    Ok(ApiResponse::ok(state.tokens.tokens()))
}

pub async fn market<S: ApiStore>(State(state): Shared<S>) -> ApiResult<MarketSnapshot> {
    Ok(ApiResponse::ok(state.prices.snapshot()))
}

pub async fn add_token<S: ApiStore>(
    State(state): Shared<S>,
    headers: HeaderMap,
    Json(form): Json<TokenForm>,
) -> Result<impl IntoResponse, RpcError> {
    let admin = require_admin(&state, &headers)?;
    let token = state.registry.add_token(form, &admin.username, Timestamp::now())?;
    Ok((StatusCode::CREATED, ApiResponse::ok(token)))
}

pub async fn remove_token<S: ApiStore>(
    State(state): Shared<S>,
    headers: HeaderMap,
    Path(mint): Path<String>,
) -> ApiResult<()> {
    let admin = require_admin(&state, &headers)?;
    state.registry.remove_token(&mint)?;
    info!(admin = %admin.username, mint = %mint, "token delisted");
    Ok(ApiResponse::ok(()))
}

pub async fn submit_application<S: ApiStore>(
    State(state): Shared<S>,
    Json(form): Json<ApplicationForm>,
) -> Result<impl IntoResponse, RpcError> {
    let app = state.registry.submit_application(form, Timestamp::now())?;
    Ok((StatusCode::CREATED, ApiResponse::ok(app)))
}

pub async fn list_applications<S: ApiStore>(
    State(state): Shared<S>,
    headers: HeaderMap,
) -> ApiResult<ApplicationsByStatus> {
    require_admin(&state, &headers)?;
    Ok(ApiResponse::ok(state.registry.list_applications()?))
}

pub async fn approve_application<S: ApiStore>(
    State(state): Shared<S>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> ApiResult<ListedToken> {
    let admin = require_admin(&state, &headers)?;
    let token = state
        .registry
        .approve_application(&id, &admin.username, Timestamp::now())?;
    Ok(ApiResponse::ok(token))
}

pub async fn reject_application<S: ApiStore>(
    State(state): Shared<S>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    require_admin(&state, &headers)?;
    state.registry.reject_application(&id)?;
    Ok(ApiResponse::ok(()))
}

pub async fn restore_application<S: ApiStore>(
    State(state): Shared<S>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    require_admin(&state, &headers)?;
    state.registry.restore_application(&id)?;
    Ok(ApiResponse::ok(()))
}

// ── Admin sessions ───────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

pub async fn login<S: ApiStore>(
    State(state): Shared<S>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<AdminSession> {
    let session = state
        .auth
        .login(&req.username, &req.password, Timestamp::now())?;
    Ok(ApiResponse::ok(session))
}

pub async fn logout<S: ApiStore>(State(state): Shared<S>, headers: HeaderMap) -> ApiResult<()> {
    let token = bearer(&headers)?;
    state.auth.logout(token)?;
    Ok(ApiResponse::ok(()))
}
