use thiserror::Error;

use crate::models::{
    ActivityLevel, FeatureVector, Gender, ProfileField, ProfileInput, UserProfile,
};

/// A profile field that failed validation.
///
/// Validation is a precondition check, not a best-effort fill: the first
/// failing field aborts the whole request and no partial vector exists.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("missing value for {0}")]
    Missing(ProfileField),
    #[error("invalid value {value:?} for {field}")]
    Invalid { field: ProfileField, value: String },
}

impl ValidationError {
    fn invalid(field: ProfileField, value: &str) -> Self {
        Self::Invalid {
            field,
            value: value.to_string(),
        }
    }

    /// The field the failure is attached to.
    pub fn field(&self) -> ProfileField {
        match self {
            Self::Missing(field) => *field,
            Self::Invalid { field, .. } => *field,
        }
    }
}

/// Maps the raw request strings into a typed profile.
///
/// Numeric fields must parse as positive numbers; gender and activity level
/// must match their form labels exactly. The target weight accepts an
/// optional "kg" unit suffix which is stripped before parsing.
pub fn parse_profile(input: &ProfileInput) -> Result<UserProfile, ValidationError> {
    let weight = parse_positive(ProfileField::Weight, &input.weight)?;
    let height = parse_positive(ProfileField::Height, &input.height)?;
    let age = parse_age(&input.age)?;

    let gender_label = input.gender.trim();
    if gender_label.is_empty() {
        return Err(ValidationError::Missing(ProfileField::Gender));
    }
    let gender = Gender::from_label(gender_label)
        .ok_or_else(|| ValidationError::invalid(ProfileField::Gender, gender_label))?;

    let activity_label = input.activity_level.trim();
    if activity_label.is_empty() {
        return Err(ValidationError::Missing(ProfileField::ActivityLevel));
    }
    let activity_level = ActivityLevel::from_label(activity_label)
        .ok_or_else(|| ValidationError::invalid(ProfileField::ActivityLevel, activity_label))?;

    let target_weight =
        parse_positive(ProfileField::TargetWeight, strip_unit(&input.target_weight))?;

    Ok(UserProfile {
        weight,
        height,
        age,
        gender,
        activity_level,
        target_weight,
    })
}

/// Encodes a validated profile in the fixed order the model was trained with.
/// Pure and total: every typed profile has exactly one encoding.
pub fn vectorize(profile: &UserProfile) -> FeatureVector {
    FeatureVector::new([
        profile.weight,
        profile.height,
        profile.age as f32,
        profile.gender.code(),
        profile.activity_level.multiplier(),
        profile.target_weight,
    ])
}

fn parse_positive(field: ProfileField, raw: &str) -> Result<f32, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Missing(field));
    }
    match trimmed.parse::<f32>() {
        Ok(value) if value.is_finite() && value > 0.0 => Ok(value),
        _ => Err(ValidationError::invalid(field, trimmed)),
    }
}

fn parse_age(raw: &str) -> Result<u32, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Missing(ProfileField::Age));
    }
    match trimmed.parse::<u32>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(ValidationError::invalid(ProfileField::Age, trimmed)),
    }
}

/// Strips an optional, case-insensitive "kg" suffix ("65 Kg" -> "65").
fn strip_unit(raw: &str) -> &str {
    let trimmed = raw.trim();
    let lower = trimmed.to_ascii_lowercase();
    if let Some(stripped_len) = lower.strip_suffix("kg").map(str::len) {
        trimmed[..stripped_len].trim_end()
    } else {
        trimmed
    }
}
