//! Quest step definitions and per-step answer records.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The closed set of quest step kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepType {
  /// A single designated correct option; contributes to the score.
  ScoredChoice,
  /// Completion-gated upstream (all required items checked).
  Checklist,
  /// Completion-gated upstream (minimum input length met).
  FreeForm,
}

impl StepType {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::ScoredChoice => "scored_choice",
      Self::Checklist => "checklist",
      Self::FreeForm => "free_form",
    }
  }

  pub fn is_scored(self) -> bool { matches!(self, Self::ScoredChoice) }
}

impl fmt::Display for StepType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// A step as authored in the quest content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestStep {
  pub step_index:     u32,
  pub step_type:      StepType,
  /// Index of the designated correct option. Only meaningful for
  /// scored-choice steps.
  #[serde(default)]
  pub correct_option: Option<u32>,
}

/// What the user submitted for one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepResponse {
  pub step_index:      u32,
  #[serde(default)]
  pub selected_option: Option<u32>,
}

/// A graded step, the scorer's input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestCompletionAnswer {
  pub step_index: u32,
  pub step_type:  StepType,
  /// Only meaningful for scored-choice steps.
  #[serde(default)]
  pub is_correct: bool,
}
