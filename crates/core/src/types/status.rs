//! Photo sizes and the checkout lifecycle.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Download size a customer selects for a photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PhotoSize {
    #[serde(rename = "S")]
    Small,
    #[default]
    #[serde(rename = "M")]
    Medium,
    #[serde(rename = "L")]
    Large,
    #[serde(rename = "XL")]
    ExtraLarge,
}

impl PhotoSize {
    pub const ALL: [Self; 4] = [Self::Small, Self::Medium, Self::Large, Self::ExtraLarge];

    /// Short code used in forms and the database.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Small => "S",
            Self::Medium => "M",
            Self::Large => "L",
            Self::ExtraLarge => "XL",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Small => "Small",
            Self::Medium => "Medium",
            Self::Large => "Large",
            Self::ExtraLarge => "Extra large",
        }
    }
}

impl fmt::Display for PhotoSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for PhotoSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "S" => Ok(Self::Small),
            "M" => Ok(Self::Medium),
            "L" => Ok(Self::Large),
            "XL" => Ok(Self::ExtraLarge),
            _ => Err(format!("invalid photo size: {s}")),
        }
    }
}

/// Lifecycle of a checkout, from provider session creation to outcome.
///
/// ```text
/// Created -> PendingVerification -> Fulfilled
///                                \-> Rejected
/// Created | PendingVerification  -> Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutState {
    #[default]
    Created,
    PendingVerification,
    Fulfilled,
    Rejected,
    Cancelled,
}

/// Something that happened to a checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutEvent {
    /// The customer came back from the provider's hosted page.
    Returned,
    /// The correlation token matched the server-held value.
    TokenVerified,
    /// The correlation token was missing or did not match.
    TokenMismatch,
    /// The customer abandoned payment.
    Cancelled,
}

/// A transition that the lifecycle does not allow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cannot apply {event:?} to a checkout in state {from}")]
pub struct InvalidTransition {
    pub from: CheckoutState,
    pub event: CheckoutEvent,
}

impl CheckoutState {
    /// Apply an event, returning the next state.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` for events that are not valid in the
    /// current state. Terminal states accept no events.
    pub const fn apply(self, event: CheckoutEvent) -> Result<Self, InvalidTransition> {
        use CheckoutEvent as E;

        match (self, event) {
            (Self::Created, E::Returned) => Ok(Self::PendingVerification),
            (Self::PendingVerification, E::TokenVerified) => Ok(Self::Fulfilled),
            (Self::PendingVerification, E::TokenMismatch) => Ok(Self::Rejected),
            (Self::Created | Self::PendingVerification, E::Cancelled) => Ok(Self::Cancelled),
            (from, event) => Err(InvalidTransition { from, event }),
        }
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Fulfilled | Self::Rejected | Self::Cancelled)
    }

    /// Whether fulfilment may still claim this checkout.
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Created | Self::PendingVerification)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::PendingVerification => "pending_verification",
            Self::Fulfilled => "fulfilled",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for CheckoutState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CheckoutState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(Self::Created),
            "pending_verification" => Ok(Self::PendingVerification),
            "fulfilled" => Ok(Self::Fulfilled),
            "rejected" => Ok(Self::Rejected),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("invalid checkout state: {s}")),
        }
    }
}
