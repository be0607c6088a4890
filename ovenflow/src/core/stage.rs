//! Stage kinds and the tagged stage result.

use super::Item;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the three production stages, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    /// Dough and toppings are assembled.
    Prepare,
    /// The item sits in the oven.
    Bake,
    /// The item is boxed.
    Pack,
}

impl StageKind {
    /// All stages in execution order.
    pub const ALL: [Self; 3] = [Self::Prepare, Self::Bake, Self::Pack];

    /// Returns the stage name used in logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Prepare => "prepare",
            Self::Bake => "bake",
            Self::Pack => "pack",
        }
    }

    /// Returns the span name for this stage.
    #[must_use]
    pub const fn span_name(&self) -> &'static str {
        match self {
            Self::Prepare => "stage.prepare",
            Self::Bake => "stage.bake",
            Self::Pack => "stage.pack",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of running one stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageResult {
    /// The stage completed and hands the item on.
    Success(Item),
    /// The bake ran past the threshold; the whole chain must restart.
    Burnt,
    /// The cancellation token fired during the stage.
    Cancelled,
}

impl StageResult {
    /// Returns true for [`StageResult::Success`].
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Returns the status label used in span attributes.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Success(_) => "success",
            Self::Burnt => "burnt",
            Self::Cancelled => "cancelled",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ProductKind;

    #[test]
    fn test_stage_order() {
        assert_eq!(StageKind::ALL, [StageKind::Prepare, StageKind::Bake, StageKind::Pack]);
        assert!(StageKind::Prepare < StageKind::Bake);
        assert!(StageKind::Bake < StageKind::Pack);
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(format!("{}", StageKind::Prepare), "prepare");
        assert_eq!(format!("{}", StageKind::Bake), "bake");
        assert_eq!(format!("{}", StageKind::Pack), "pack");
        assert_eq!(StageKind::Bake.span_name(), "stage.bake");
    }

    #[test]
    fn test_result_labels() {
        let item = Item::new(ProductKind::Pizza, "client");
        assert!(StageResult::Success(item.clone()).is_success());
        assert!(!StageResult::Burnt.is_success());
        assert_eq!(StageResult::Success(item).label(), "success");
        assert_eq!(StageResult::Burnt.label(), "burnt");
        assert_eq!(StageResult::Cancelled.label(), "cancelled");
    }
}
