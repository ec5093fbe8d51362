use serde::{Deserialize, Serialize};

use crate::selection::SelectionSet;

/// A pickup or drop-off stop offered by the operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopPoint {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub landmark: Option<String>,
    #[serde(default)]
    pub contact_number: Option<String>,
}

pub type BoardingPoint = StopPoint;
pub type DroppingPoint = StopPoint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SelectionError {
    #[error("Please select at least one seat")]
    IncompleteSelection,

    #[error("Please select a boarding point")]
    MissingBoardingPoint,

    #[error("Please select a dropping point")]
    MissingDroppingPoint,
}

/// Gate run before any booking submission. Reports the first missing
/// piece: seats, then boarding point, then dropping point.
pub fn validate_selection(
    selection: &SelectionSet,
    boarding: Option<&BoardingPoint>,
    dropping: Option<&DroppingPoint>,
) -> Result<(), SelectionError> {
    if selection.is_empty() {
        return Err(SelectionError::IncompleteSelection);
    }
    if boarding.is_none() {
        return Err(SelectionError::MissingBoardingPoint);
    }
    if dropping.is_none() {
        return Err(SelectionError::MissingDroppingPoint);
    }
    Ok(())
}
