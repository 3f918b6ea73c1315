use serde::{Deserialize, Serialize};

use crate::blockchain::Block;

/* ---------- Write API Models ---------- */

#[derive(Debug, Deserialize)]
pub struct WriteRequest {
    #[serde(rename = "BPM", alias = "measurement")]
    pub measurement: i64,
}

#[derive(Serialize)]
pub struct RejectedResponse<'a> {
    pub error: String,
    pub block: &'a Block,
}

/* ---------- Chain API Models ---------- */

#[derive(Serialize)]
pub struct ValidateResponse {
    pub valid: bool,
    pub length: usize,
    pub difficulty: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Serialize)]
pub struct ReplaceResponse {
    pub replaced: bool,
    pub length: usize,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
