use serde::Deserialize;
use serde_json::{Map, Value};

/// Field carrying the record's creation timestamp.
pub const USER_CREATE_TIME: &str = "user_create_time";

/// One upstream lead record. Only `user_create_time` is interpreted.
pub type Lead = Map<String, Value>;

/// The `{code, data}` wrapper every upstream response comes in.
#[derive(Debug, Deserialize)]
pub struct Envelope {
    /// Kept raw; a missing or non-numeric code is simply not a success.
    #[serde(default)]
    pub code: Value,
    #[serde(default)]
    pub data: Value,
}

impl Envelope {
    pub fn is_success(&self) -> bool {
        self.code.as_i64() == Some(200) || self.code.as_f64() == Some(200.0)
    }
}
