use serde::{Deserialize, Serialize};

use crate::ids::AnchorId;

/// Registered lifecycle state of an anchor.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AnchorStatus {
    Active,
    Draft,
    Deprecated,
    Revoked,
}

/// Anchor block declared on an artifact. The registry holds the matching
/// record; this struct is only the artifact's claim.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnchorMetadata {
    pub anchor_id: AnchorId,
    pub anchor_version: String,
    pub scope: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<AnchorStatus>,
}
