use serde::{Deserialize, Serialize};

/// Gate pipeline state machine. Advances only on stage success; any stage
/// failure moves directly to `Failed`.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GateState {
    Validating,
    AnchorChecking,
    BuildingManifest,
    CheckingDeterminism,
    CheckingBijectivity,
    AssemblingOverlay,
    Done,
    Failed,
}

impl GateState {
    pub fn next(self) -> GateState {
        match self {
            GateState::Validating => GateState::AnchorChecking,
            GateState::AnchorChecking => GateState::BuildingManifest,
            GateState::BuildingManifest => GateState::CheckingDeterminism,
            GateState::CheckingDeterminism => GateState::CheckingBijectivity,
            GateState::CheckingBijectivity => GateState::AssemblingOverlay,
            GateState::AssemblingOverlay => GateState::Done,
            GateState::Done => GateState::Done,
            GateState::Failed => GateState::Failed,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, GateState::Done | GateState::Failed)
    }
}
