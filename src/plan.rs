use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// One exercise in a plan: how many sets of how many reps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExerciseSet {
    pub id: &'static str,
    pub name: &'static str,
    pub position: usize,
    pub sets_total: u32,
    pub reps_target: u32,
}

const fn exercise(
    id: &'static str,
    name: &'static str,
    position: usize,
    sets_total: u32,
    reps_target: u32,
) -> ExerciseSet {
    ExerciseSet {
        id,
        name,
        position,
        sets_total,
        reps_target,
    }
}

const BASIC_UPPER_BODY: [ExerciseSet; 6] = [
    exercise("w1", "Chest Press", 0, 3, 8),
    exercise("w2", "Lat Pulldown", 1, 3, 8),
    exercise("w3", "Seated Cable Fly", 2, 3, 8),
    exercise("w4", "Chest Supported Row", 3, 3, 8),
    exercise("w5", "Tricep Pushdowns", 4, 3, 8),
    exercise("w6", "Bicep Curls", 5, 3, 8),
];

const BASIC_LOWER_BODY: [ExerciseSet; 5] = [
    exercise("w1", "Hack Squat", 0, 3, 8),
    exercise("w2", "Seated Hamstring Curl", 1, 3, 8),
    exercise("w3", "Walking Lunges", 2, 3, 8),
    exercise("w4", "Calf Raises", 3, 3, 8),
    exercise("w5", "Seated Shoulder Press", 4, 3, 8),
];

#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    Hash,
    ValueEnum,
    Serialize,
    Deserialize,
    strum_macros::Display,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum WorkoutKind {
    BasicUpperBody,
    BasicLowerBody,
}

impl WorkoutKind {
    pub fn plan(&self) -> WorkoutPlan {
        match self {
            WorkoutKind::BasicUpperBody => WorkoutPlan {
                kind: *self,
                title: "Basic Upper Body",
                exercises: &BASIC_UPPER_BODY,
            },
            WorkoutKind::BasicLowerBody => WorkoutPlan {
                kind: *self,
                title: "Basic Lower Body",
                exercises: &BASIC_LOWER_BODY,
            },
        }
    }
}

/// A fixed, ordered list of exercises
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkoutPlan {
    pub kind: WorkoutKind,
    pub title: &'static str,
    pub exercises: &'static [ExerciseSet],
}

impl WorkoutPlan {
    pub fn len(&self) -> usize {
        self.exercises.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exercises.is_empty()
    }

    pub fn exercise(&self, index: usize) -> Option<&ExerciseSet> {
        self.exercises.get(index)
    }

    /// The exercise at `index` followed by up to `count - 1` upcoming ones
    pub fn window(&self, index: usize, count: usize) -> &[ExerciseSet] {
        let start = index.min(self.exercises.len());
        let end = (start + count).min(self.exercises.len());
        &self.exercises[start..end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plans_have_ordered_positions() {
        for kind in WorkoutKind::value_variants() {
            let plan = kind.plan();
            assert!(!plan.is_empty());
            for (i, ex) in plan.exercises.iter().enumerate() {
                assert_eq!(ex.position, i);
                assert!(ex.sets_total > 0);
            }
        }
    }

    #[test]
    fn lower_body_starts_with_hack_squat() {
        let plan = WorkoutKind::BasicLowerBody.plan();
        assert_eq!(plan.len(), 5);
        assert_eq!(plan.exercise(0).map(|e| e.name), Some("Hack Squat"));
    }

    #[test]
    fn window_clamps_at_end() {
        let plan = WorkoutKind::BasicUpperBody.plan();
        assert_eq!(plan.window(0, 3).len(), 3);
        assert_eq!(plan.window(4, 3).len(), 2);
        assert_eq!(plan.window(5, 3)[0].name, "Bicep Curls");
        assert!(plan.window(9, 3).is_empty());
    }

    #[test]
    fn kind_display_matches_cli_name() {
        assert_eq!(WorkoutKind::BasicUpperBody.to_string(), "basic-upper-body");
        assert_eq!(
            serde_json::to_string(&WorkoutKind::BasicLowerBody).unwrap(),
            "\"basic-lower-body\""
        );
    }
}
