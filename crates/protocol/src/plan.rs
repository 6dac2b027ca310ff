//! The financial plan produced by the backend.

use serde::{Deserialize, Serialize};

/// A structured financial plan. Produced only by the backend; consumed
/// read-only by the renderer.
///
/// All fields are required. The lists may be empty, but a missing list
/// is a contract violation and fails deserialization; no defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanRecord {
    pub goal: String,
    pub steps: Vec<String>,
    pub timeline: String,
    pub estimated_cost: String,
    pub risks: Vec<String>,
    pub recommendations: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_full_plan() {
        let json = r#"{
          "goal": "pay off student loans",
          "steps": ["consolidate", "overpay monthly"],
          "timeline": "36 months",
          "estimated_cost": "$18,000",
          "risks": ["income disruption", "variable rates"],
          "recommendations": ["build a 3-month buffer first"]
        }"#;

        let plan: PlanRecord = serde_json::from_str(json).expect("parse plan");
        assert_eq!(plan.goal, "pay off student loans");
        assert_eq!(plan.steps, vec!["consolidate", "overpay monthly"]);
        assert_eq!(plan.risks.len(), 2);

        let serialized = serde_json::to_string(&plan).expect("serialize");
        let reparsed: PlanRecord = serde_json::from_str(&serialized).expect("reparse");
        assert_eq!(reparsed, plan);
    }

    #[test]
    fn empty_lists_are_valid() {
        let json = r#"{
          "goal": "g",
          "steps": [],
          "timeline": "t",
          "estimated_cost": "c",
          "risks": [],
          "recommendations": []
        }"#;

        let plan: PlanRecord = serde_json::from_str(json).expect("parse plan");
        assert!(plan.steps.is_empty());
        assert!(plan.risks.is_empty());
        assert!(plan.recommendations.is_empty());
    }

    #[test]
    fn missing_list_is_a_parse_error() {
        // No `risks` field: absence is a contract violation, not an empty list.
        let json = r#"{
          "goal": "g",
          "steps": [],
          "timeline": "t",
          "estimated_cost": "c",
          "recommendations": []
        }"#;

        assert!(serde_json::from_str::<PlanRecord>(json).is_err());
    }

    #[test]
    fn missing_estimated_cost_is_a_parse_error() {
        let json = r#"{
          "goal": "g",
          "steps": [],
          "timeline": "t",
          "risks": [],
          "recommendations": []
        }"#;

        assert!(serde_json::from_str::<PlanRecord>(json).is_err());
    }
}
