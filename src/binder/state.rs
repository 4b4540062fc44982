use serde::Serialize;
use serde_json::Value;

use crate::fetch::TRANSPORT_STATUS;

/// View state of a bound call. Replaced wholesale on every settlement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallState {
    pub loading: bool,
    pub success: bool,
    pub err: Option<Value>,
    pub status: i32,
    pub data: Option<Value>,
}

impl CallState {
    pub fn initial(init: Option<Value>) -> Self {
        Self {
            loading: false,
            success: false,
            err: None,
            status: TRANSPORT_STATUS,
            data: init,
        }
    }
}

/// How one execution ended.
#[derive(Debug, Clone, PartialEq)]
pub enum Settlement {
    /// The state this execution committed.
    Settled(CallState),
    /// The execution was superseded and committed nothing.
    Cancelled,
}

impl Settlement {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Settlement::Cancelled)
    }

    pub fn state(&self) -> Option<&CallState> {
        match self {
            Settlement::Settled(state) => Some(state),
            Settlement::Cancelled => None,
        }
    }
}
