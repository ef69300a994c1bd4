//! Quest completion scoring.
//!
//! Only scored-choice steps count. Checklist and free-form steps are gated
//! upstream (all items checked, minimum length met) and never enter the
//! denominator.

use std::collections::HashMap;

use finquest_core::quest::{QuestCompletionAnswer, QuestStep, StepResponse};

/// Percentage of scored-choice answers that are correct, rounded half up.
/// A quest with no scored-choice steps scores 100.
pub fn score(answers: &[QuestCompletionAnswer]) -> u8 {
  let (scorable, correct) = answers
    .iter()
    .filter(|a| a.step_type.is_scored())
    .fold((0u64, 0u64), |(scorable, correct), a| {
      (scorable + 1, correct + u64::from(a.is_correct))
    });

  if scorable == 0 {
    return 100;
  }
  let percent = (200 * correct + scorable) / (2 * scorable);
  u8::try_from(percent).unwrap_or(100)
}

/// Grade raw responses against the quest's steps, one answer per step.
///
/// A scored-choice step with no response, no selection, or no designated
/// correct option is incorrect. When a step has several responses the first
/// one counts.
pub fn grade(steps: &[QuestStep], responses: &[StepResponse]) -> Vec<QuestCompletionAnswer> {
  let mut selected: HashMap<u32, Option<u32>> = HashMap::new();
  for r in responses {
    selected.entry(r.step_index).or_insert(r.selected_option);
  }

  steps
    .iter()
    .map(|step| {
      let choice = selected.get(&step.step_index).copied().flatten();
      let is_correct = step.step_type.is_scored()
        && matches!((step.correct_option, choice), (Some(c), Some(s)) if c == s);
      QuestCompletionAnswer {
        step_index: step.step_index,
        step_type: step.step_type,
        is_correct,
      }
    })
    .collect()
}
