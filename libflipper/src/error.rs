use thiserror::Error;

use crate::body::BodyId;
use crate::charge::ChargeOwner;

#[derive(Debug, Error)]
pub enum FlipError {
    #[error("No solid type has {sides} faces (expected 4, 6, 8, 10, 12 or 20)")]
    InvalidSolidType { sides: u32 },
    #[error("Invalid dice notation: {0}")]
    InvalidNotation(String),
    #[error("No body with id {0} in the play set")]
    UnknownBody(BodyId),
    #[error("Body {0} is still rolling")]
    BodyInFlight(BodyId),
    #[error("A throw is still in progress")]
    ThrowInProgress,
    #[error("The {0} control is charging")]
    ChargeActive(ChargeOwner),
    #[error("No charge session is active for the {0} control")]
    ChargeNotActive(ChargeOwner),
    #[error("Invalid geometry: {0}")]
    Geometry(&'static str),
    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
