//! HTTP routes for the draw UI.
//!
//! | Method | Path                               | Operation              |
//! |--------|------------------------------------|------------------------|
//! | GET    | `/prize-status`                    | current tier + counts  |
//! | GET    | `/participants`                    | full roster            |
//! | GET    | `/winners`                         | winner ids             |
//! | GET    | `/winners/records`                 | winner records         |
//! | GET    | `/absent-participants`             | absent ids             |
//! | GET    | `/draw-count`                      | committed draws        |
//! | GET    | `/draw`                            | propose (no mutation)  |
//! | POST   | `/accept-winner/{participant_id}`  | commit                 |
//! | POST   | `/mark-absent/{participant_id}`    | exclude participant    |
//! | POST   | `/reset`                           | restore initial state  |
//!
//! `/draw` never mutates state. A proposal only becomes a winner once the
//! operator accepts it, and the accept re-checks everything inside the
//! store transaction.

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use prizedraw_core::allocator::PrizeStatus;
use prizedraw_core::roster::Participant;
use prizedraw_core::store::WinnerRecord;
use prizedraw_core::tier::PrizeTier;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::AppState;

/// Builds the router with every draw route attached.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/prize-status", get(prize_status))
        .route("/participants", get(participants))
        .route("/winners", get(winners))
        .route("/winners/records", get(winner_records))
        .route("/absent-participants", get(absent_participants))
        .route("/draw-count", get(draw_count))
        .route("/draw", get(draw))
        .route("/accept-winner/{participant_id}", post(accept_winner))
        .route("/mark-absent/{participant_id}", post(mark_absent))
        .route("/reset", post(reset))
        .with_state(state)
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DrawCountResponse {
    pub draw_count: u64,
}

/// The proposed winner as shown on stage.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProposedWinner {
    pub id: u32,
    pub name: String,
    pub photo: String,
    pub prize_type: PrizeTier,
    pub prize_status: PrizeStatus,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DrawResponse {
    pub winner: ProposedWinner,
    /// Committed draws so far; the proposal is `draw_count + 1`.
    pub draw_count: u64,
}

/// Optional body for `/accept-winner`. Without it the active tier is used.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AcceptRequest {
    pub tier: Option<PrizeTier>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AcceptResponse {
    pub status: String,
    pub prize_type: PrizeTier,
    pub prize_status: PrizeStatus,
    pub draw_count: u64,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl StatusResponse {
    fn success(message: Option<&str>) -> Self {
        Self {
            status: "success".to_string(),
            message: message.map(str::to_string),
        }
    }
}

async fn prize_status(State(state): State<AppState>) -> Result<Json<PrizeStatus>, ApiError> {
    state.run(|engine| engine.status()).await.map(Json)
}

async fn participants(State(state): State<AppState>) -> Json<Vec<Participant>> {
    Json(state.engine().roster().as_slice().to_vec())
}

async fn winners(State(state): State<AppState>) -> Result<Json<Vec<u32>>, ApiError> {
    state.run(|engine| engine.winners()).await.map(Json)
}

async fn winner_records(
    State(state): State<AppState>,
) -> Result<Json<Vec<WinnerRecord>>, ApiError> {
    state.run(|engine| engine.winner_records()).await.map(Json)
}

async fn absent_participants(State(state): State<AppState>) -> Result<Json<Vec<u32>>, ApiError> {
    state.run(|engine| engine.absent()).await.map(Json)
}

async fn draw_count(State(state): State<AppState>) -> Result<Json<DrawCountResponse>, ApiError> {
    let draw_count = state.run(|engine| engine.draw_count()).await?;
    Ok(Json(DrawCountResponse { draw_count }))
}

async fn draw(State(state): State<AppState>) -> Result<Json<DrawResponse>, ApiError> {
    let (proposal, prize_status) = state
        .run(|engine| {
            let proposal = engine.propose()?;
            Ok((proposal, engine.status()?))
        })
        .await?;

    tokio::time::sleep(state.suspense_delay()).await;

    let draw_count = proposal.draw_index - 1;
    Ok(Json(DrawResponse {
        winner: ProposedWinner {
            id: proposal.winner.id,
            name: proposal.winner.name,
            photo: proposal.winner.photo,
            prize_type: proposal.tier,
            prize_status,
        },
        draw_count,
    }))
}

async fn accept_winner(
    State(state): State<AppState>,
    Path(participant_id): Path<u32>,
    body: Option<Json<AcceptRequest>>,
) -> Result<Json<AcceptResponse>, ApiError> {
    let requested = body.and_then(|Json(req)| req.tier);

    let (prize_type, draw_count, prize_status) = state
        .run(move |engine| {
            let (tier, count) = match requested {
                Some(tier) => (tier, engine.commit(participant_id, tier)?),
                None => engine.commit_current(participant_id)?,
            };
            Ok((tier, count, engine.status()?))
        })
        .await?;

    Ok(Json(AcceptResponse {
        status: "success".to_string(),
        prize_type,
        prize_status,
        draw_count,
    }))
}

async fn mark_absent(
    State(state): State<AppState>,
    Path(participant_id): Path<u32>,
) -> Result<Json<StatusResponse>, ApiError> {
    state
        .run(move |engine| engine.mark_absent(participant_id))
        .await?;
    Ok(Json(StatusResponse::success(None)))
}

async fn reset(State(state): State<AppState>) -> Result<Json<StatusResponse>, ApiError> {
    state.run(|engine| engine.reset()).await?;
    Ok(Json(StatusResponse::success(Some("Draw reset successfully"))))
}
