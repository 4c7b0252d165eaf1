use serde::de::{self, Deserialize, Deserializer};

// Values exchanged between the agents and returned to callers.
// Model output is not schema-enforced upstream, so list fields tolerate a missing key.

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Ingredient {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct WebSearchResult {
    #[serde(rename = "List_of_ingredients", alias = "ingredients", default)]
    pub ingredients: Vec<Ingredient>,
}

/// Safety or health label as emitted by the model.
///
/// The prompts ask for `LOW`, `MEDIUM` or `HIGH`, but models sometimes answer
/// with a bare number. Strings are kept verbatim and numbers are stored in
/// their JSON text form; the value is never checked against the canonical set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(transparent)]
pub struct SafetyLabel(String);

impl SafetyLabel {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for SafetyLabel {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::String(label) => Ok(Self(label)),
            serde_json::Value::Number(number) => Ok(Self(number.to_string())),
            other => Err(de::Error::custom(format!(
                "safety label must be a string or number, got {}",
                other
            ))),
        }
    }
}

impl std::fmt::Display for SafetyLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SafetyLabel {
    fn from(label: &str) -> Self {
        Self::new(label)
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct IngredientScore {
    pub ingredient_name: String,
    pub safety_score: SafetyLabel,
    pub reasoning: String,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ScorerResult {
    #[serde(default)]
    pub ingredient_scores: Vec<IngredientScore>,
    /// 0-10 as reported by the model; not cross-checked against `ingredient_scores`
    pub overall_score: f64,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Recommendation {
    pub product_name: String,
    pub health_score: SafetyLabel,
    pub reason: String,
}

/// Alternatives from the recommender. The prompt asks for three; callers must not rely on it.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RecommenderResult {
    #[serde(default)]
    pub recommendations: Vec<Recommendation>,
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPreferences {
    #[serde(default)]
    pub allergies: Vec<String>,
    #[serde(default, alias = "diet_goals")]
    pub diet_goals: Vec<String>,
    #[serde(default, alias = "avoid_ingredients")]
    pub avoid_ingredients: Vec<String>,
}

impl UserPreferences {
    pub fn is_empty(&self) -> bool {
        self.allergies.is_empty() && self.diet_goals.is_empty() && self.avoid_ingredients.is_empty()
    }
}

/// One recommend + rescore iteration
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LoopTurn {
    pub recommendations: RecommenderResult,
    pub score: ScorerResult,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowResult {
    pub initial_search: WebSearchResult,
    pub initial_score: ScorerResult,
    pub final_score: ScorerResult,
    pub turns: Vec<LoopTurn>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safety_label_accepts_string_or_number() {
        let score: IngredientScore = serde_json::from_str(
            r#"{"ingredient_name":"Sugar","safety_score":"LOW","reasoning":"added sugar"}"#,
        )
        .unwrap();
        assert_eq!(score.safety_score.as_str(), "LOW");

        let rec: Recommendation = serde_json::from_str(
            r#"{"product_name":"Plain Oats","health_score":3,"reason":"no additives"}"#,
        )
        .unwrap();
        assert_eq!(rec.health_score.as_str(), "3");

        let rec: Recommendation = serde_json::from_str(
            r#"{"product_name":"Plain Oats","health_score":8.5,"reason":"no additives"}"#,
        )
        .unwrap();
        assert_eq!(rec.health_score.to_string(), "8.5");
    }

    #[test]
    fn test_safety_label_keeps_non_canonical_strings() {
        let label: SafetyLabel = serde_json::from_str(r#""VERY LOW""#).unwrap();
        assert_eq!(label.as_str(), "VERY LOW");
    }

    #[test]
    fn test_safety_label_rejects_other_json_types() {
        assert!(serde_json::from_str::<SafetyLabel>("true").is_err());
        assert!(serde_json::from_str::<SafetyLabel>("null").is_err());
        assert!(serde_json::from_str::<SafetyLabel>(r#"{"level":"LOW"}"#).is_err());
    }

    #[test]
    fn test_safety_label_serializes_as_plain_string() {
        let rec = Recommendation {
            product_name: "Alt".to_string(),
            health_score: SafetyLabel::new("4"),
            reason: "r".to_string(),
        };
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["health_score"], serde_json::json!("4"));
    }

    #[test]
    fn test_search_result_wire_key_and_alias() {
        let parsed: WebSearchResult = serde_json::from_str(
            r#"{"List_of_ingredients":[{"name":"Oats","description":"Whole grain"}]}"#,
        )
        .unwrap();
        assert_eq!(parsed.ingredients.len(), 1);

        let aliased: WebSearchResult = serde_json::from_str(
            r#"{"ingredients":[{"name":"Oats","description":"Whole grain"}]}"#,
        )
        .unwrap();
        assert_eq!(aliased, parsed);

        let json = serde_json::to_value(&parsed).unwrap();
        assert!(json.get("List_of_ingredients").is_some());
    }

    #[test]
    fn test_scorer_result_requires_overall_score() {
        assert!(serde_json::from_str::<ScorerResult>(r#"{"ingredient_scores":[]}"#).is_err());
        let parsed: ScorerResult = serde_json::from_str(r#"{"overall_score":6}"#).unwrap();
        assert!(parsed.ingredient_scores.is_empty());
        assert_eq!(parsed.overall_score, 6.0);
    }

    #[test]
    fn test_user_preferences_camel_case_and_snake_alias() {
        let prefs = UserPreferences {
            allergies: vec!["peanuts".to_string()],
            diet_goals: vec!["low-sugar".to_string()],
            avoid_ingredients: vec![],
        };
        let json = serde_json::to_value(&prefs).unwrap();
        assert_eq!(json["dietGoals"], serde_json::json!(["low-sugar"]));
        assert!(json.get("avoidIngredients").is_some());

        let parsed: UserPreferences =
            serde_json::from_str(r#"{"diet_goals":["keto"],"avoid_ingredients":["msg"]}"#).unwrap();
        assert_eq!(parsed.diet_goals, vec!["keto".to_string()]);
        assert_eq!(parsed.avoid_ingredients, vec!["msg".to_string()]);
        assert!(!parsed.is_empty());
        assert!(UserPreferences::default().is_empty());
    }

    #[test]
    fn test_workflow_result_uses_camel_case_keys() {
        let score = ScorerResult {
            ingredient_scores: vec![],
            overall_score: 8.0,
        };
        let result = WorkflowResult {
            initial_search: WebSearchResult::default(),
            initial_score: score.clone(),
            final_score: score,
            turns: vec![],
        };
        let json = serde_json::to_value(&result).unwrap();
        for key in ["initialSearch", "initialScore", "finalScore", "turns"] {
            assert!(json.get(key).is_some(), "missing {}", key);
        }
    }
}
