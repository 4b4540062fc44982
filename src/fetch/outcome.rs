use serde_json::{Value, json};

/// Status reported when no HTTP response was obtained.
pub const TRANSPORT_STATUS: i32 = -1;

/// Normalized result of one endpoint call.
///
/// Exactly one of data or error is meaningful per variant. `Cancelled` is a
/// sentinel: the call was superseded and its result must not be applied.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// 2xx response; `data` is whatever the endpoint's selector returned.
    Success { status: u16, data: Option<Value> },
    /// Non-2xx response; `err` is whatever the endpoint's error handler returned.
    ApiError { status: u16, err: Value },
    /// No usable response; `err` is whatever the endpoint's catcher returned.
    TransportError { err: Value },
    Cancelled,
}

impl Outcome {
    /// Numeric HTTP status, or [`TRANSPORT_STATUS`] when there was none.
    pub fn status(&self) -> i32 {
        match self {
            Outcome::Success { status, .. } | Outcome::ApiError { status, .. } => i32::from(*status),
            Outcome::TransportError { .. } | Outcome::Cancelled => TRANSPORT_STATUS,
        }
    }

    pub fn data(&self) -> Option<&Value> {
        match self {
            Outcome::Success { data, .. } => data.as_ref(),
            _ => None,
        }
    }

    pub fn err(&self) -> Option<&Value> {
        match self {
            Outcome::ApiError { err, .. } | Outcome::TransportError { err } => Some(err),
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Outcome::Cancelled)
    }

    /// Flattens the outcome into a `(data, status, err)` tuple.
    ///
    /// `Cancelled` flattens to `(None, -1, None)`; check [`Outcome::is_cancelled`]
    /// first when the distinction matters.
    pub fn into_parts(self) -> (Option<Value>, i32, Option<Value>) {
        let status = self.status();
        match self {
            Outcome::Success { data, .. } => (data, status, None),
            Outcome::ApiError { err, .. } | Outcome::TransportError { err } => (None, status, Some(err)),
            Outcome::Cancelled => (None, status, None),
        }
    }

    /// JSON rendering used by the CLI: `{"data": .., "status": .., "err": ..}`.
    pub fn to_json(&self) -> Value {
        json!({
            "data": self.data(),
            "status": self.status(),
            "err": self.err(),
            "cancelled": self.is_cancelled(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Success,
    ApiError,
}

/// Only `200..=299` is success; redirects and informational codes are errors.
pub fn classify(status: u16) -> StatusClass {
    if (200..300).contains(&status) {
        StatusClass::Success
    } else {
        StatusClass::ApiError
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_band_is_2xx() {
        for status in [200, 201, 204, 250, 299] {
            assert_eq!(classify(status), StatusClass::Success, "{status}");
        }
    }

    #[test]
    fn test_everything_else_is_api_error() {
        for status in [100, 101, 199, 300, 301, 304, 399, 400, 404, 418, 500, 503, 599] {
            assert_eq!(classify(status), StatusClass::ApiError, "{status}");
        }
    }

    #[test]
    fn test_parts_follow_the_tuple_contract() {
        let ok = Outcome::Success {
            status: 200,
            data: Some(json!({"id": 42})),
        };
        assert_eq!(ok.into_parts(), (Some(json!({"id": 42})), 200, None));

        let api = Outcome::ApiError {
            status: 404,
            err: json!({"message": "not found"}),
        };
        assert_eq!(api.into_parts(), (None, 404, Some(json!({"message": "not found"}))));

        let transport = Outcome::TransportError { err: json!("boom") };
        assert_eq!(transport.status(), TRANSPORT_STATUS);
        assert_eq!(transport.into_parts(), (None, -1, Some(json!("boom"))));
    }

    #[test]
    fn test_cancelled_carries_nothing() {
        let cancelled = Outcome::Cancelled;
        assert!(cancelled.is_cancelled());
        assert_eq!(cancelled.data(), None);
        assert_eq!(cancelled.err(), None);
        assert_eq!(cancelled.to_json()["cancelled"], true);
    }
}
