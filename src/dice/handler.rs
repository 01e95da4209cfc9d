//! `/rolldice` handler.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rand::Rng;
use serde::Deserialize;

use crate::config::{DiceConfig, FaultConfig};
use crate::dice::roll::roll_the_dice;

/// State injected into the dice handlers.
#[derive(Debug, Clone, Default)]
pub struct DiceState {
    pub dice: DiceConfig,
    pub faults: FaultConfig,
}

#[derive(Debug, Deserialize)]
pub struct RollQuery {
    pub rolls: Option<String>,
}

/// Ways a roll request can fail.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RollError {
    #[error("Request parameter 'rolls' is missing or not a number.")]
    InvalidRolls,

    #[error("Request parameter 'rolls' must be at most {max}.")]
    TooManyRolls { max: u32 },

    #[error("Random error occurred.")]
    InjectedServerError,

    #[error("Random 4xx error occurred.")]
    InjectedClientError(StatusCode),
}

impl RollError {
    pub fn status(&self) -> StatusCode {
        match self {
            RollError::InvalidRolls | RollError::TooManyRolls { .. } => StatusCode::BAD_REQUEST,
            RollError::InjectedServerError => StatusCode::INTERNAL_SERVER_ERROR,
            RollError::InjectedClientError(status) => *status,
        }
    }
}

impl IntoResponse for RollError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}

/// `GET /rolldice?rolls=N`
#[tracing::instrument(name = "roll_dice", skip_all)]
pub async fn roll_dice_handler(
    State(state): State<DiceState>,
    Query(query): Query<RollQuery>,
) -> Response {
    tracing::info!(rolls = ?query.rolls, "Received request to roll dice");

    let result = roll(&state, query.rolls.as_deref(), &mut rand::thread_rng());
    match result {
        Ok(rolls) => Json(rolls).into_response(),
        Err(err) => {
            tracing::error!(status = err.status().as_u16(), "{}", err);
            err.into_response()
        }
    }
}

/// Validate the request, apply fault injection, and roll.
pub fn roll<R: Rng>(
    state: &DiceState,
    rolls: Option<&str>,
    rng: &mut R,
) -> Result<Vec<u32>, RollError> {
    let rolls = rolls.and_then(parse_rolls).ok_or(RollError::InvalidRolls)?;
    if rolls > i64::from(state.dice.max_rolls) {
        return Err(RollError::TooManyRolls {
            max: state.dice.max_rolls,
        });
    }

    if rng.gen::<f64>() < state.faults.server_error_rate {
        return Err(RollError::InjectedServerError);
    }
    if rng.gen::<f64>() < state.faults.client_error_rate {
        let status = if rng.gen::<bool>() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::FORBIDDEN
        };
        return Err(RollError::InjectedClientError(status));
    }

    // Negative counts roll nothing.
    let count = usize::try_from(rolls).unwrap_or(0);
    Ok(roll_the_dice(rng, count, 1, state.dice.sides))
}

/// Parse an optionally signed base-10 integer prefix, e.g. `"3"`, `"-2"`,
/// `"4dice"`. Returns `None` when there are no digits.
pub fn parse_rolls(value: &str) -> Option<i64> {
    let value = value.trim_start();
    let (negative, rest) = match value.as_bytes().first() {
        Some(b'-') => (true, &value[1..]),
        Some(b'+') => (false, &value[1..]),
        _ => (false, value),
    };
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    let magnitude: i64 = rest[..end].parse().ok()?;
    Some(if negative { -magnitude } else { magnitude })
}
