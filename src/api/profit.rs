use alloy_primitives::U256;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::AppState;
use crate::domain::{ChainId, PositionContext, PositionEvent, Timestamp, Token, TokenId};
use crate::engine::{ProfitPoint, ProfitSeries};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenInput {
    pub address: String,
    pub decimals: u8,
}

/// One event as submitted over the wire. Raw amounts are base-10 strings.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum EventInput {
    Created {
        timestamp: i64,
        rate: String,
        remaining_swaps: u32,
    },
    /// Rate/duration change, classified server-side by the funds it leaves.
    Modified {
        timestamp: i64,
        old_rate: String,
        old_remaining_swaps: u32,
        new_rate: String,
        new_remaining_swaps: u32,
    },
    Swapped {
        timestamp: i64,
        rate: String,
        swapped: String,
    },
    Terminated {
        timestamp: i64,
    },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfitRequest {
    pub chain_id: u64,
    pub from: TokenInput,
    pub to: TokenInput,
    pub events: Vec<EventInput>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PointResponse {
    pub timestamp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    pub swapped_if_lump_sum: String,
    pub swapped_if_dca: String,
    pub ratio: String,
    pub percentage: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfitResponse {
    pub has_swap_history: bool,
    pub points: Vec<PointResponse>,
}

fn parse_address(input: &str, field: &str) -> Result<TokenId, AppError> {
    let valid = input.len() == 42
        && input.starts_with("0x")
        && input[2..].chars().all(|c| c.is_ascii_hexdigit());
    if !valid {
        return Err(AppError::BadRequest(format!("Invalid {} address", field)));
    }
    Ok(TokenId::new(input))
}

fn parse_amount(input: &str, field: &str) -> Result<U256, AppError> {
    if input.is_empty() || !input.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::BadRequest(format!("Invalid {}", field)));
    }
    input
        .parse::<U256>()
        .map_err(|_| AppError::BadRequest(format!("Invalid {}", field)))
}

fn to_event(input: &EventInput) -> Result<PositionEvent, AppError> {
    let event = match input {
        EventInput::Created {
            timestamp,
            rate,
            remaining_swaps,
        } => PositionEvent::Created {
            timestamp: Timestamp::new(*timestamp),
            rate: parse_amount(rate, "rate")?,
            remaining_swaps: *remaining_swaps,
        },
        EventInput::Modified {
            timestamp,
            old_rate,
            old_remaining_swaps,
            new_rate,
            new_remaining_swaps,
        } => PositionEvent::modified(
            Timestamp::new(*timestamp),
            parse_amount(old_rate, "oldRate")?,
            *old_remaining_swaps,
            parse_amount(new_rate, "newRate")?,
            *new_remaining_swaps,
        )
        .map_err(|e| AppError::BadRequest(format!("Invalid modification: {}", e)))?,
        EventInput::Swapped {
            timestamp,
            rate,
            swapped,
        } => PositionEvent::Swapped {
            timestamp: Timestamp::new(*timestamp),
            rate: parse_amount(rate, "rate")?,
            swapped: parse_amount(swapped, "swapped")?,
        },
        EventInput::Terminated { timestamp } => PositionEvent::Terminated {
            timestamp: Timestamp::new(*timestamp),
        },
    };
    Ok(event)
}

fn to_point_response(point: &ProfitPoint) -> PointResponse {
    PointResponse {
        timestamp: point.timestamp.as_secs(),
        date: point.timestamp.to_rfc3339(),
        swapped_if_lump_sum: point.swapped_if_lump_sum.to_canonical_string(),
        swapped_if_dca: point.swapped_if_dca.to_canonical_string(),
        ratio: point.ratio.to_canonical_string(),
        percentage: point.percentage.to_canonical_string(),
    }
}

fn to_response(series: &ProfitSeries) -> ProfitResponse {
    ProfitResponse {
        has_swap_history: series.has_swap_history(),
        points: series.points().iter().map(to_point_response).collect(),
    }
}

pub async fn post_profit(
    State(state): State<AppState>,
    Json(request): Json<ProfitRequest>,
) -> Result<Json<ProfitResponse>, AppError> {
    let from = parse_address(&request.from.address, "from")?;
    let to = parse_address(&request.to.address, "to")?;
    let context = PositionContext::new(
        ChainId::new(request.chain_id),
        Token::new(from, request.from.decimals),
        Token::new(to, request.to.decimals),
    );

    if request.events.is_empty() {
        return Err(AppError::BadRequest("events must not be empty".to_string()));
    }
    let events = request
        .events
        .iter()
        .map(to_event)
        .collect::<Result<Vec<_>, _>>()?;

    let series = state.engine.replay(&context, &events).await?;

    Ok(Json(to_response(&series)))
}
