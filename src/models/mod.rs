use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Number of features the classification model consumes.
pub const FEATURE_COUNT: usize = 6;

/// Maximum number of recipes assigned to one meal slot.
pub const MEAL_SLOT_CAPACITY: usize = 3;

/// Discrete label produced by the classification model.
///
/// Groups users with similar profiles and serves as the join key into the
/// recipe catalog. The model's output index is the implicit id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClusterId(pub u32);

impl ClusterId {
    /// Converts an arg-max index over the model's score vector into an id.
    pub fn from_index(index: usize) -> Self {
        Self(index as u32)
    }
}

impl Display for ClusterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Raw request fields as supplied by the caller.
///
/// Every field arrives as a string; mapping them into a [`UserProfile`]
/// (numeric parsing, unit-suffix trimming) is part of the boundary contract
/// and happens in the vectorizer, not in the transport layer.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProfileInput {
    pub weight: String,
    pub height: String,
    pub age: String,
    pub gender: String,
    pub activity_level: String,
    pub target_weight: String,
}

/// Validated user profile, constructed per request and discarded after use.
#[derive(Debug, Clone, PartialEq)]
pub struct UserProfile {
    pub weight: f32,
    pub height: f32,
    pub age: u32,
    pub gender: Gender,
    pub activity_level: ActivityLevel,
    pub target_weight: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    /// Numeric encoding consumed by the model.
    pub fn code(self) -> f32 {
        match self {
            Gender::Male => 1.0,
            Gender::Female => 0.0,
        }
    }

    /// Parses the exact form labels; anything else is rejected.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "Male" => Some(Gender::Male),
            "Female" => Some(Gender::Female),
            _ => None,
        }
    }
}

/// Activity level with its fixed calorie multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityLevel {
    InActive,
    LightlyActive,
    ModeratelyActive,
    VeryActive,
    ExtraActive,
}

impl ActivityLevel {
    /// Multiplier consumed by the model. Values are fixed by the training
    /// pipeline and must not drift.
    pub fn multiplier(self) -> f32 {
        match self {
            ActivityLevel::InActive => 1.2,
            ActivityLevel::LightlyActive => 1.375,
            ActivityLevel::ModeratelyActive => 1.55,
            ActivityLevel::VeryActive => 1.725,
            ActivityLevel::ExtraActive => 1.9,
        }
    }

    /// Parses the exact form labels; anything else is rejected.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "InActive" => Some(ActivityLevel::InActive),
            "Lightly Active" => Some(ActivityLevel::LightlyActive),
            "Moderately Active" => Some(ActivityLevel::ModeratelyActive),
            "Very Active" => Some(ActivityLevel::VeryActive),
            "Extra Active" => Some(ActivityLevel::ExtraActive),
            _ => None,
        }
    }
}

/// Names the profile field a validation failure is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileField {
    Weight,
    Height,
    Age,
    Gender,
    ActivityLevel,
    TargetWeight,
}

impl Display for ProfileField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ProfileField::Weight => "weight",
            ProfileField::Height => "height",
            ProfileField::Age => "age",
            ProfileField::Gender => "gender",
            ProfileField::ActivityLevel => "activity_level",
            ProfileField::TargetWeight => "target_weight",
        };
        write!(f, "{}", name)
    }
}

/// Fixed-order numeric encoding of a profile, consumed by the model.
///
/// Semantic order: [weight, height, age, gender code, activity multiplier,
/// target weight]. A vector only exists once every source field validated;
/// there is no partial form.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector([f32; FEATURE_COUNT]);

impl FeatureVector {
    pub fn new(features: [f32; FEATURE_COUNT]) -> Self {
        Self(features)
    }

    /// The single input row handed to the scoring function.
    pub fn as_row(&self) -> &[f32] {
        &self.0
    }
}

/// One recipe from the catalog source.
///
/// `cluster` is `None` when the source carried a value that does not parse as
/// an integer; such records stay in the snapshot but never match a predicted
/// cluster. Rows with the value absent entirely are dropped at load.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecipeRecord {
    pub name: String,
    pub calories: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub image: String,
    pub cluster: Option<ClusterId>,
}

/// Recommended recipes partitioned into the three meal slots.
#[derive(Debug, Clone, Serialize)]
pub struct MealPlan {
    pub cluster: ClusterId,
    pub morning: Vec<RecipeRecord>,
    pub afternoon: Vec<RecipeRecord>,
    pub evening: Vec<RecipeRecord>,
}

impl MealPlan {
    /// Stable partition of cluster-filtered records, in catalog order, into
    /// consecutive windows of at most [`MEAL_SLOT_CAPACITY`] each. Records
    /// beyond the first nine are dropped; slots are capped, not resized.
    pub fn partition(cluster: ClusterId, records: Vec<RecipeRecord>) -> Self {
        let mut remaining = records.into_iter();
        let morning = remaining.by_ref().take(MEAL_SLOT_CAPACITY).collect();
        let afternoon = remaining.by_ref().take(MEAL_SLOT_CAPACITY).collect();
        let evening = remaining.take(MEAL_SLOT_CAPACITY).collect();

        Self {
            cluster,
            morning,
            afternoon,
            evening,
        }
    }

    /// Total recipes across all slots.
    pub fn len(&self) -> usize {
        self.morning.len() + self.afternoon.len() + self.evening.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
