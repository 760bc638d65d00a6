//! Blue/green promotion state machine.
//!
//! The synthesized topology is static; this models how the listener bindings
//! move when a deployment promotes the idle color.

use std::fmt;

use serde::Serialize;

use crate::domain::error::TrafficError;
use crate::domain::handles::Color;

/// Which color serves production traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TrafficState {
    BlueActive,
    GreenActive,
    /// Traffic is being shifted; bindings stay as they were until `complete`.
    Promoting { from: Color, to: Color },
}

/// `(production, test)` colors.
pub type Bindings = (Color, Color);

impl TrafficState {
    #[must_use]
    pub fn active(color: Color) -> Self {
        match color {
            Color::Blue => Self::BlueActive,
            Color::Green => Self::GreenActive,
        }
    }

    /// Start shifting production traffic to the idle color.
    ///
    /// # Errors
    ///
    /// Returns [`TrafficError::InvalidTransition`] if a promotion is running.
    pub fn begin_promotion(self) -> Result<Self, TrafficError> {
        match self {
            Self::BlueActive => Ok(Self::Promoting {
                from: Color::Blue,
                to: Color::Green,
            }),
            Self::GreenActive => Ok(Self::Promoting {
                from: Color::Green,
                to: Color::Blue,
            }),
            Self::Promoting { .. } => Err(self.invalid("begin a promotion")),
        }
    }

    /// Finish a promotion: the target color becomes live.
    ///
    /// # Errors
    ///
    /// Returns [`TrafficError::InvalidTransition`] unless promoting.
    pub fn complete(self) -> Result<Self, TrafficError> {
        match self {
            Self::Promoting { to, .. } => Ok(Self::active(to)),
            _ => Err(self.invalid("complete a promotion")),
        }
    }

    /// Roll a promotion back: the previous color stays live.
    ///
    /// # Errors
    ///
    /// Returns [`TrafficError::InvalidTransition`] unless promoting.
    pub fn abort(self) -> Result<Self, TrafficError> {
        match self {
            Self::Promoting { from, .. } => Ok(Self::active(from)),
            _ => Err(self.invalid("abort a promotion")),
        }
    }

    #[must_use]
    pub fn bindings(self) -> Bindings {
        let live = match self {
            Self::BlueActive => Color::Blue,
            Self::GreenActive => Color::Green,
            Self::Promoting { from, .. } => from,
        };
        (live, live.other())
    }

    fn invalid(self, event: &'static str) -> TrafficError {
        TrafficError::InvalidTransition {
            state: self.to_string(),
            event,
        }
    }
}

impl fmt::Display for TrafficState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BlueActive => f.write_str("blue-active"),
            Self::GreenActive => f.write_str("green-active"),
            Self::Promoting { from, to } => write!(f, "promoting {from} -> {to}"),
        }
    }
}

/// One step of a promotion plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlanStep {
    pub state: TrafficState,
    pub production: Color,
    pub test: Color,
}

impl From<TrafficState> for PlanStep {
    fn from(state: TrafficState) -> Self {
        let (production, test) = state.bindings();
        Self {
            state,
            production,
            test,
        }
    }
}

/// States a full promotion from `live` passes through.
///
/// # Errors
///
/// Never fails for a settled starting state; the error path exists because
/// each step is a checked transition.
pub fn promotion_plan(live: Color) -> Result<Vec<PlanStep>, TrafficError> {
    let start = TrafficState::active(live);
    let promoting = start.begin_promotion()?;
    let done = promoting.complete()?;
    Ok(vec![start.into(), promoting.into(), done.into()])
}
