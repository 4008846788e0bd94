use serde::{Deserialize, Serialize};

/// Terminal state of a worker invocation.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WorkerState {
    Ok,
    Error,
}

/// Worker return shape, serialised as `{"State":"OK"}` or `{"State":"ERROR"}`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub struct WorkerResponse {
    #[serde(rename = "State")]
    pub state: WorkerState,
}

impl WorkerResponse {
    pub fn ok() -> Self {
        Self {
            state: WorkerState::Ok,
        }
    }

    pub fn error() -> Self {
        Self {
            state: WorkerState::Error,
        }
    }

    /// Serialised response text.
    pub fn to_json(&self) -> &'static str {
        match self.state {
            WorkerState::Ok => r#"{"State":"OK"}"#,
            WorkerState::Error => r#"{"State":"ERROR"}"#,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_wire_shape() {
        assert_eq!(WorkerResponse::ok().to_json(), r#"{"State":"OK"}"#);
        assert_eq!(WorkerResponse::error().to_json(), r#"{"State":"ERROR"}"#);

        // The derived serialisation and the canned text agree
        assert_eq!(
            serde_json::to_string(&WorkerResponse::ok()).unwrap(),
            WorkerResponse::ok().to_json()
        );
        assert_eq!(
            serde_json::from_str::<WorkerResponse>(r#"{"State":"ERROR"}"#).unwrap(),
            WorkerResponse::error()
        );
    }
}
