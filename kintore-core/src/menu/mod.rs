//! Menu generation adapter: one prompt to a hosted text-generation model,
//! one bare-JSON-array reply, parsed and validated locally. No retries.

use log::{error, info};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::llm::{LlmInterface, strip_code_fences};

pub const MIN_SESSION_MINUTES: u32 = 5;
pub const MAX_SESSION_MINUTES: u32 = 180;

const MAX_SETS: i64 = 10;
const MAX_REPS: i64 = 30;
const MAX_REST_SEC: i64 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyPart {
    Chest,
    Back,
    Shoulders,
    Arms,
    Legs,
    FullBody,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Goal {
    Hypertrophy,
    Strength,
    Health,
    Toning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Beginner,
    Intermediate,
    Advanced,
}

/// The user's training preferences, embedded verbatim (as JSON) in the
/// generation prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuRequest {
    pub parts: Vec<BodyPart>,
    pub time_minutes: u32,
    pub goal: Goal,
    pub level: Level,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bench_max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadlift_max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub squat_max: Option<f64>,
}

impl MenuRequest {
    pub fn validate(&self) -> Result<(), MenuError> {
        if self.parts.is_empty() {
            return Err(MenuError::InvalidRequest(
                "select at least one body part".to_string(),
            ));
        }
        if self.time_minutes < MIN_SESSION_MINUTES || self.time_minutes > MAX_SESSION_MINUTES {
            return Err(MenuError::InvalidRequest(format!(
                "time must be between {} and {} minutes",
                MIN_SESSION_MINUTES, MAX_SESSION_MINUTES
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuWeight {
    pub is_bodyweight: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
}

/// One row of a generated menu, in the wire shape the model is asked for.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuEntry {
    pub exercise: String,
    pub sets: i64,
    pub reps: i64,
    pub rest_sec: i64,
    pub weight: MenuWeight,
}

pub type WorkoutMenu = Vec<MenuEntry>;

#[derive(Debug, Error)]
pub enum MenuError {
    #[error("the model API key is not configured")]
    MissingCredential,
    #[error("the menu could not be generated")]
    CallFailed,
    #[error("the model returned no output")]
    EmptyOutput,
    #[error("the generated menu is not valid JSON")]
    MalformedJson,
    #[error("the generated menu does not match the expected format: {0}")]
    SchemaMismatch(String),
    #[error("{0}")]
    InvalidRequest(String),
}

pub struct MenuPromptBuilder<'a> {
    request: &'a MenuRequest,
    previous: Option<&'a [MenuEntry]>,
}

impl<'a> MenuPromptBuilder<'a> {
    pub fn new(request: &'a MenuRequest, previous: Option<&'a [MenuEntry]>) -> Self {
        Self { request, previous }
    }

    pub fn system_prompt(&self) -> String {
        r#"You are an experienced personal trainer.

IMPORTANT: return only a JSON array. Explanations and code blocks are forbidden.

Generate a strength-training menu for the user's stated preferences and return only a JSON array of this shape:

[
  {
    "exercise": "movement name",
    "sets": number of sets (integer, 1-10),
    "reps": reps per set (integer, 1-30),
    "restSec": rest interval in seconds (integer, 15-300),
    "weight": {
      "isBodyweight": true for bodyweight movements, false for loaded movements,
      "value": load in kg
    }
  }
]

Constraints:
- The full menu must fit within the user's time budget.
- Match movement selection and difficulty to the experience level (beginner -> fundamental movements, advanced -> high-difficulty movements).
- Match rep ranges and loads to the goal:
  - hypertrophy: 8-12 reps, 70-80% 1RM
  - strength: 3-5 reps, 85-95% 1RM
  - health: 10-15 reps, 50-65% 1RM
  - toning: 12-20 reps, 40-60% 1RM
- When big-three max lifts are provided, compute working loads as percentages of them.
- For other movements, choose loads appropriate to the experience level.
- Return the JSON array only, without exception.

Regeneration rules (when a previous menu is listed):
- Avoid overlapping with 50% or more of the previous exercise names.
- For staples that cannot be dropped, differentiate by volume allocation, rest, or rep count."#
            .to_string()
    }

    pub fn user_prompt(&self) -> String {
        let request_json =
            serde_json::to_string(self.request).unwrap_or_else(|_| "{}".to_string());
        let mut prompt = format!("The user's training request: {}", request_json);
        if let Some(previous) = self.previous {
            let names: Vec<&str> = previous.iter().map(|e| e.exercise.as_str()).collect();
            prompt.push_str(&format!(
                "\nPrevious menu exercises: {}\nGenerate a variation following the regeneration rules.",
                names.join(", ")
            ));
        }
        prompt
    }
}

fn validate_menu(menu: &[MenuEntry]) -> Result<(), MenuError> {
    for (idx, entry) in menu.iter().enumerate() {
        let row = idx + 1;
        if entry.exercise.trim().is_empty() {
            return Err(MenuError::SchemaMismatch(format!(
                "row {}: exercise name is empty",
                row
            )));
        }
        if entry.sets < 1 || entry.sets > MAX_SETS {
            return Err(MenuError::SchemaMismatch(format!(
                "row {}: sets must be between 1 and {}",
                row, MAX_SETS
            )));
        }
        if entry.reps < 1 || entry.reps > MAX_REPS {
            return Err(MenuError::SchemaMismatch(format!(
                "row {}: reps must be between 1 and {}",
                row, MAX_REPS
            )));
        }
        if entry.rest_sec < 0 || entry.rest_sec > MAX_REST_SEC {
            return Err(MenuError::SchemaMismatch(format!(
                "row {}: rest must be between 0 and {} seconds",
                row, MAX_REST_SEC
            )));
        }
        if let Some(value) = entry.weight.value {
            if !value.is_finite() {
                return Err(MenuError::SchemaMismatch(format!(
                    "row {}: weight value is not a number",
                    row
                )));
            }
        }
    }
    Ok(())
}

/// Build the prompt, make a single model call, and parse/validate the reply.
///
/// Every failure is caught here and mapped to one user-facing `MenuError`;
/// nothing is fatal to the process.
pub async fn generate_workout_menu(
    llm: &LlmInterface,
    request: &MenuRequest,
    previous: Option<&[MenuEntry]>,
) -> Result<WorkoutMenu, MenuError> {
    request.validate()?;

    if !llm.has_credentials() {
        error!("menu generation attempted without model credentials");
        return Err(MenuError::MissingCredential);
    }

    let builder = MenuPromptBuilder::new(request, previous);
    let raw = llm
        .call(&builder.system_prompt(), &builder.user_prompt())
        .await
        .map_err(|e| {
            error!("menu generation call failed: {}", e);
            MenuError::CallFailed
        })?;

    if raw.trim().is_empty() {
        error!("menu generation returned empty output");
        return Err(MenuError::EmptyOutput);
    }

    let stripped = strip_code_fences(&raw);
    let menu: WorkoutMenu = serde_json::from_str(stripped).map_err(|e| {
        error!("cannot parse menu JSON: {} -- error: {}", stripped, e);
        MenuError::MalformedJson
    })?;

    validate_menu(&menu)?;
    info!("generated menu with {} exercises", menu.len());
    Ok(menu)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> MenuRequest {
        MenuRequest {
            parts: vec![BodyPart::Chest, BodyPart::Legs],
            time_minutes: 60,
            goal: Goal::Strength,
            level: Level::Beginner,
            bench_max: Some(100.0),
            deadlift_max: None,
            squat_max: None,
        }
    }

    const MENU_JSON: &str = r#"[
        {"exercise": "Bench Press", "sets": 3, "reps": 5, "restSec": 180,
         "weight": {"isBodyweight": false, "value": 85.0}},
        {"exercise": "Push-up", "sets": 2, "reps": 15, "restSec": 60,
         "weight": {"isBodyweight": true}}
    ]"#;

    #[tokio::test]
    async fn fenced_reply_parses_like_bare_reply() {
        let bare = LlmInterface::new_mock_fn(|_, _| MENU_JSON.to_string());
        let fenced = LlmInterface::new_mock_fn(|_, _| format!("```json\n{}\n```", MENU_JSON));

        let req = request();
        let from_bare = generate_workout_menu(&bare, &req, None).await.unwrap();
        let from_fenced = generate_workout_menu(&fenced, &req, None).await.unwrap();

        assert_eq!(from_bare.len(), 2);
        assert_eq!(from_bare[0].exercise, from_fenced[0].exercise);
        assert_eq!(from_bare[1].weight.is_bodyweight, true);
        assert_eq!(from_bare[1].weight.value, None);
    }

    #[tokio::test]
    async fn out_of_range_sets_are_rejected() {
        let reply = r#"[{"exercise": "Bench Press", "sets": 11, "reps": 5, "restSec": 120,
                         "weight": {"isBodyweight": false, "value": 80.0}}]"#;
        let llm = LlmInterface::new_mock_fn(move |_, _| reply.to_string());
        let err = generate_workout_menu(&llm, &request(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, MenuError::SchemaMismatch(_)));
    }

    #[tokio::test]
    async fn empty_output_and_bad_json_are_distinct_errors() {
        let empty = LlmInterface::new_mock_fn(|_, _| "".to_string());
        assert!(matches!(
            generate_workout_menu(&empty, &request(), None).await,
            Err(MenuError::EmptyOutput)
        ));

        let garbled = LlmInterface::new_mock_fn(|_, _| "not json at all".to_string());
        assert!(matches!(
            generate_workout_menu(&garbled, &request(), None).await,
            Err(MenuError::MalformedJson)
        ));
    }

    #[test]
    fn request_bounds_are_enforced() {
        let mut req = request();
        req.parts.clear();
        assert!(matches!(req.validate(), Err(MenuError::InvalidRequest(_))));

        let mut req = request();
        req.time_minutes = 4;
        assert!(matches!(req.validate(), Err(MenuError::InvalidRequest(_))));

        let mut req = request();
        req.time_minutes = 181;
        assert!(matches!(req.validate(), Err(MenuError::InvalidRequest(_))));
    }

    #[test]
    fn previous_menu_names_reach_the_prompt() {
        let previous: WorkoutMenu = serde_json::from_str(MENU_JSON).unwrap();
        let req = request();
        let builder = MenuPromptBuilder::new(&req, Some(&previous));
        let prompt = builder.user_prompt();
        assert!(prompt.contains("Bench Press"));
        assert!(prompt.contains("Push-up"));
        assert!(prompt.contains("regeneration rules"));
    }

    #[test]
    fn rest_bounds_allow_zero_but_not_above_300() {
        let mut menu: WorkoutMenu = serde_json::from_str(MENU_JSON).unwrap();
        menu[0].rest_sec = 0;
        assert!(validate_menu(&menu).is_ok());
        menu[0].rest_sec = 301;
        assert!(validate_menu(&menu).is_err());
    }
}
