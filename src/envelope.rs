//! The JSON result envelope returned in HTTP error bodies.
use http::StatusCode;
use serde::Serialize;

/// `{"resultCode": "404-1", "msg": "...", "data": ...}`. The numeric part before the dash is the
/// HTTP status, the part after it distinguishes causes sharing a status. `data` is left out when
/// there is none.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub result_code: String,
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl Envelope {
    pub fn new(result_code: impl Into<String>, msg: impl Into<String>) -> Self {
        Envelope {
            result_code: result_code.into(),
            msg: msg.into(),
            data: None,
        }
    }

    /// The HTTP status encoded in the result code. Unparseable codes map to 500.
    pub fn status_code(&self) -> StatusCode {
        self.result_code
            .split('-')
            .next()
            .and_then(|s| s.parse::<u16>().ok())
            .and_then(|code| StatusCode::from_u16(code).ok())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn to_json(&self) -> Vec<u8> {
        serde_json::to_vec(self).unwrap_or_else(|_| br#"{"resultCode":"500-1","msg":"unserializable response"}"#.to_vec())
    }
}
