//! Wire types for the interpretation backend.
//!
//! The backend speaks camelCase at the envelope level; command payloads
//! are accepted in either convention via serde aliases on the domain
//! types.

use serde::{Deserialize, Serialize};

use crate::domain::models::{CaseDocument, ParsedUpdate, UpdateCommand};

/// Request body for `POST /v1/interpret`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InterpretRequest<'a> {
    /// Raw instruction text, with any clarification turns already merged
    pub instruction: &'a str,
    /// Current workflow phase, as disambiguating context
    pub phase: &'a str,
    /// Authoritative document snapshot
    pub case: &'a CaseDocument,
}

/// Response body from the interpretation backend.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterpretResponse {
    #[serde(default)]
    pub commands: Vec<UpdateCommand>,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub needs_clarification: bool,
    #[serde(default)]
    pub clarification_prompt: Option<String>,
}

impl From<InterpretResponse> for ParsedUpdate {
    fn from(response: InterpretResponse) -> Self {
        Self {
            commands: response.commands,
            summary: response.summary,
            needs_clarification: response.needs_clarification,
            clarification_prompt: response.clarification_prompt,
        }
    }
}
