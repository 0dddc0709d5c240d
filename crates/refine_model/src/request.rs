use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::aggregator::{ProjectionError, ProjectionInput, Segment, project};
use crate::booster::BoosterPolicy;
use crate::cost::{CostError, PriceSnapshot};
use crate::data::{EquipmentType, MaterialKind, Regime};
use crate::ledger::MaterialLedger;
use crate::resolver::{AdvancedAttempt, AdvancedState, AncestorDraw, BasicAttempt, BasicState};
use crate::tables::Grade;

fn default_count() -> u32 {
    1
}

/// A calculator request as the UI sends it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionRequest {
    pub equipment_type: EquipmentType,
    pub regime: Regime,
    pub current_level: u32,
    pub target_level: u32,
    #[serde(default)]
    pub booster_policy: BoosterPolicy,
    #[serde(default)]
    pub unit_prices: BTreeMap<MaterialKind, f64>,
    /// Number of identical items following the same plan.
    #[serde(default = "default_count")]
    pub count: u32,
}

impl ProjectionRequest {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn input(&self) -> ProjectionInput {
        ProjectionInput {
            equipment: self.equipment_type,
            regime: self.regime,
            current_level: self.current_level,
            target_level: self.target_level,
            policy: self.booster_policy,
        }
    }

    /// Lay `overrides` over the request's own prices. Kinds present in both
    /// take the override; kinds only in the request keep their price.
    pub fn merge_prices(&mut self, overrides: BTreeMap<MaterialKind, f64>) {
        self.unit_prices.extend(overrides);
    }

    pub fn prices(&self) -> Result<PriceSnapshot, CostError> {
        PriceSnapshot::from_map(&self.unit_prices)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionResponse {
    pub expected_attempts: f64,
    pub paid_attempts: f64,
    pub materials: MaterialLedger,
    pub flat_gold: f64,
    pub material_gold: f64,
    pub gold_total: f64,
    pub booster_key: String,
    pub segments: Vec<Segment>,
}

pub fn handle_projection(request: &ProjectionRequest) -> Result<ProjectionResponse, ProjectionError> {
    let prices = request.prices()?;
    let projection = project(&request.input(), &prices)?.scaled(request.count as f64);
    Ok(ProjectionResponse {
        expected_attempts: projection.expected_attempts,
        paid_attempts: projection.paid_attempts,
        materials: projection.materials,
        flat_gold: projection.flat_gold,
        material_gold: projection.material_gold,
        gold_total: projection.gold_total,
        booster_key: request.booster_policy.key(),
        segments: projection.segments,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PityState {
    Basic(BasicState),
    Advanced(AdvancedState),
}

/// One simulator click, as the UI renders it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probability: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grade: Option<Grade>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ancestor: Option<AncestorDraw>,
    pub new_level: u32,
    pub new_pity_state: PityState,
    pub materials_this_attempt: MaterialLedger,
    pub gold_this_attempt: f64,
}

impl From<&BasicAttempt> for AttemptResponse {
    fn from(attempt: &BasicAttempt) -> Self {
        Self {
            success: Some(attempt.success),
            probability: Some(attempt.probability),
            grade: None,
            ancestor: None,
            new_level: attempt.state.level,
            new_pity_state: PityState::Basic(attempt.state),
            materials_this_attempt: attempt.materials,
            gold_this_attempt: attempt.gold,
        }
    }
}

impl From<&AdvancedAttempt> for AttemptResponse {
    fn from(attempt: &AdvancedAttempt) -> Self {
        Self {
            success: None,
            probability: None,
            grade: Some(attempt.grade),
            ancestor: attempt.ancestor,
            new_level: attempt.state.level,
            new_pity_state: PityState::Advanced(attempt.state),
            materials_this_attempt: attempt.materials,
            gold_this_attempt: attempt.gold,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booster::BoosterCombo;
    use crate::resolver::{resolve_advanced_attempt, resolve_basic_attempt};
    use crate::tables::AdvancedTable;
    use crate::tables::BasicTable;
    use crate::data::BasicVariant;
    use rand::rngs::mock::StepRng;

    #[test]
    fn request_reads_camel_case_with_defaults() {
        let request = ProjectionRequest::from_json(
            r#"{"equipmentType":"weapon","regime":"advanced","currentLevel":0,"targetLevel":10}"#,
        )
        .unwrap();
        assert_eq!(request.equipment_type, EquipmentType::Weapon);
        assert_eq!(request.booster_policy, BoosterPolicy::default());
        assert!(request.unit_prices.is_empty());
        assert_eq!(request.count, 1);
    }

    #[test]
    fn request_reads_policy_and_prices() {
        let request = ProjectionRequest::from_json(
            r#"{
                "equipmentType": "armor",
                "regime": "succession",
                "currentLevel": 11,
                "targetLevel": 13,
                "boosterPolicy": {"normal": "breath", "breathBound": true},
                "unitPrices": {"guardianStone": 0.1, "leapstone": 20},
                "count": 3
            }"#,
        )
        .unwrap();
        assert_eq!(request.booster_policy.normal, BoosterCombo::BREATH);
        assert_eq!(request.booster_policy.bonus, BoosterCombo::NONE);
        assert!(request.booster_policy.breath_bound);
        assert_eq!(request.unit_prices[&MaterialKind::Leapstone], 20.0);
        assert_eq!(request.count, 3);
    }

    #[test]
    fn unknown_combo_is_a_parse_error() {
        let result = ProjectionRequest::from_json(
            r#"{"equipmentType":"armor","regime":"basic","currentLevel":11,"targetLevel":12,
                "boosterPolicy":{"normal":"wings"}}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn merged_prices_override_only_their_own_kinds() {
        let mut request = ProjectionRequest::from_json(
            r#"{"equipmentType":"armor","regime":"basic","currentLevel":11,"targetLevel":12,
                "unitPrices":{"guardianStone":0.1,"leapstone":20}}"#,
        )
        .unwrap();
        request.merge_prices(BTreeMap::from([
            (MaterialKind::Leapstone, 25.0),
            (MaterialKind::Shards, 0.5),
        ]));
        assert_eq!(request.unit_prices.len(), 3);
        assert_eq!(request.unit_prices[&MaterialKind::GuardianStone], 0.1);
        assert_eq!(request.unit_prices[&MaterialKind::Leapstone], 25.0);
        assert_eq!(request.unit_prices[&MaterialKind::Shards], 0.5);
    }

    #[test]
    fn count_scales_the_response() {
        let prices: BTreeMap<MaterialKind, f64> =
            MaterialKind::ALL.iter().map(|&kind| (kind, 2.0)).collect();
        let mut request = ProjectionRequest {
            equipment_type: EquipmentType::Armor,
            regime: Regime::Basic,
            current_level: 11,
            target_level: 14,
            booster_policy: BoosterPolicy::default(),
            unit_prices: prices,
            count: 1,
        };
        let single = handle_projection(&request).unwrap();
        request.count = 4;
        let four = handle_projection(&request).unwrap();
        assert!((four.gold_total - 4.0 * single.gold_total).abs() < 1e-6);
        assert!((four.expected_attempts - 4.0 * single.expected_attempts).abs() < 1e-9);
        assert_eq!(four.booster_key, "none_none");
    }

    #[test]
    fn negative_price_is_rejected() {
        let request = ProjectionRequest::from_json(
            r#"{"equipmentType":"armor","regime":"basic","currentLevel":11,"targetLevel":12,
                "unitPrices":{"shards":-3}}"#,
        )
        .unwrap();
        assert!(matches!(
            handle_projection(&request),
            Err(ProjectionError::Cost(CostError::InvalidPrice { .. }))
        ));
    }

    #[test]
    fn basic_attempt_response_serializes_pity() {
        let table = BasicTable::get(EquipmentType::Armor, BasicVariant::Standard);
        let attempt = resolve_basic_attempt(
            table,
            &BasicState::new(11),
            BoosterCombo::NONE,
            &mut StepRng::new(u64::MAX, 0),
        )
        .unwrap();
        let json = serde_json::to_value(AttemptResponse::from(&attempt)).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["newLevel"], 11);
        assert!(json["newPityState"]["pity"].as_f64().unwrap() > 0.0);
        assert_eq!(json["materialsThisAttempt"]["guardianStone"], 1000.0);
        assert!(json.get("grade").is_none());
    }

    #[test]
    fn advanced_attempt_response_serializes_grade_and_ancestor() {
        let state = AdvancedState {
            level: 0,
            exp: 60,
            bonus_turn_ready: true,
            ..Default::default()
        };
        let attempt = resolve_advanced_attempt(
            AdvancedTable::get(EquipmentType::Armor),
            &state,
            &BoosterPolicy::default(),
            &mut StepRng::new(0, 0),
        )
        .unwrap();
        let json = serde_json::to_value(AttemptResponse::from(&attempt)).unwrap();
        assert!(json.get("success").is_none());
        assert!(json.get("probability").is_none());
        assert_eq!(json["grade"], "success");
        assert_eq!(json["ancestor"]["ancestor"], "galatur");
        assert_eq!(json["ancestor"]["enhanced"], false);
        assert_eq!(json["newLevel"], 1);
        assert_eq!(json["newPityState"]["level"], 1);
        assert_eq!(json["newPityState"]["exp"], 10);
        assert_eq!(json["newPityState"]["meter"], 0);
        assert_eq!(json["newPityState"]["bonusTurnReady"], false);
        assert!(json["materialsThisAttempt"]["guardianStone"].as_f64().unwrap() > 0.0);
    }
}
