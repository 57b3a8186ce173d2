//! Rig construction errors.

use bevy::prelude::Entity;
use thiserror::Error;

use crate::hand::HandSide;

/// Why a climbing player could not be assembled or simulated.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum RigError {
    #[error("{0:?} hand anchor is not bound")]
    MissingAnchor(HandSide),
    #[error("{0:?} hand anchor has no parent to return to")]
    MissingAnchorParent(HandSide),
    #[error("{0:?} hand anchor {1} has no Transform")]
    AnchorNotFound(HandSide, Entity),
    #[error("climbing player {0} has no physics body and will not be simulated")]
    MissingBody(Entity),
}
