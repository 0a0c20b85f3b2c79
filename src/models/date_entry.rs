use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// One logged date. Ratings and categorical fields are stored as given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DateEntry {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub rating: Option<i32>,
    pub chemistry_rating: Option<i32>,
    pub attraction_rating: Option<i32>,
    pub vibe_check: Option<String>,
    pub emotional_impact: Option<String>,
    pub conversation_quality: Option<String>,
    pub effort_level: Option<String>,
    pub body_language: Option<String>,
    pub green_flags: Vec<String>,
    pub red_flags: Vec<String>,
    pub notes: Option<String>,
    pub profile_image: Option<String>,
    pub image_analysis: Option<serde_json::Value>,
    /// Client-formatted date label, kept verbatim.
    pub date: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Caller-supplied fields of a new entry.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DateFields {
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub name: String,
    #[validate(range(min = 1, max = 10, message = "Rating must be 1-10"))]
    #[serde(default, deserialize_with = "ratings::rating")]
    pub rating: Option<i32>,
    #[validate(range(min = 1, max = 10, message = "Chemistry rating must be 1-10"))]
    #[serde(default, deserialize_with = "ratings::chemistry_rating")]
    pub chemistry_rating: Option<i32>,
    #[validate(range(min = 1, max = 10, message = "Attraction rating must be 1-10"))]
    #[serde(default, deserialize_with = "ratings::attraction_rating")]
    pub attraction_rating: Option<i32>,
    pub vibe_check: Option<String>,
    pub emotional_impact: Option<String>,
    pub conversation_quality: Option<String>,
    pub effort_level: Option<String>,
    pub body_language: Option<String>,
    #[serde(default)]
    pub green_flags: Vec<String>,
    #[serde(default)]
    pub red_flags: Vec<String>,
    #[validate(length(max = 5000, message = "Notes must be under 5000 characters"))]
    pub notes: Option<String>,
    pub profile_image: Option<String>,
    pub image_analysis: Option<serde_json::Value>,
    pub date: Option<String>,
}

/// Partial update. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DateEntryPatch {
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub name: Option<String>,
    #[validate(range(min = 1, max = 10, message = "Rating must be 1-10"))]
    #[serde(default, deserialize_with = "ratings::rating")]
    pub rating: Option<i32>,
    #[validate(range(min = 1, max = 10, message = "Chemistry rating must be 1-10"))]
    #[serde(default, deserialize_with = "ratings::chemistry_rating")]
    pub chemistry_rating: Option<i32>,
    #[validate(range(min = 1, max = 10, message = "Attraction rating must be 1-10"))]
    #[serde(default, deserialize_with = "ratings::attraction_rating")]
    pub attraction_rating: Option<i32>,
    pub vibe_check: Option<String>,
    pub emotional_impact: Option<String>,
    pub conversation_quality: Option<String>,
    pub effort_level: Option<String>,
    pub body_language: Option<String>,
    pub green_flags: Option<Vec<String>>,
    pub red_flags: Option<Vec<String>>,
    #[validate(length(max = 5000, message = "Notes must be under 5000 characters"))]
    pub notes: Option<String>,
    pub profile_image: Option<String>,
    pub image_analysis: Option<serde_json::Value>,
    pub date: Option<String>,
}

impl DateEntry {
    pub fn new(owner_id: Uuid, fields: DateFields) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            name: fields.name,
            rating: fields.rating,
            chemistry_rating: fields.chemistry_rating,
            attraction_rating: fields.attraction_rating,
            vibe_check: fields.vibe_check,
            emotional_impact: fields.emotional_impact,
            conversation_quality: fields.conversation_quality,
            effort_level: fields.effort_level,
            body_language: fields.body_language,
            green_flags: fields.green_flags,
            red_flags: fields.red_flags,
            notes: fields.notes,
            profile_image: fields.profile_image,
            image_analysis: fields.image_analysis,
            date: fields.date,
            created_at: Utc::now(),
        }
    }
}

impl DateEntryPatch {
    /// Merge the provided fields into `entry`. `id`, `owner_id` and
    /// `created_at` are never touched.
    pub fn apply(&self, entry: &mut DateEntry) {
        fn merge<T: Clone>(slot: &mut T, value: &Option<T>) {
            if let Some(v) = value {
                *slot = v.clone();
            }
        }
        fn merge_opt<T: Clone>(slot: &mut Option<T>, value: &Option<T>) {
            if value.is_some() {
                slot.clone_from(value);
            }
        }

        merge(&mut entry.name, &self.name);
        merge_opt(&mut entry.rating, &self.rating);
        merge_opt(&mut entry.chemistry_rating, &self.chemistry_rating);
        merge_opt(&mut entry.attraction_rating, &self.attraction_rating);
        merge_opt(&mut entry.vibe_check, &self.vibe_check);
        merge_opt(&mut entry.emotional_impact, &self.emotional_impact);
        merge_opt(&mut entry.conversation_quality, &self.conversation_quality);
        merge_opt(&mut entry.effort_level, &self.effort_level);
        merge_opt(&mut entry.body_language, &self.body_language);
        merge(&mut entry.green_flags, &self.green_flags);
        merge(&mut entry.red_flags, &self.red_flags);
        merge_opt(&mut entry.notes, &self.notes);
        merge_opt(&mut entry.profile_image, &self.profile_image);
        merge_opt(&mut entry.image_analysis, &self.image_analysis);
        merge_opt(&mut entry.date, &self.date);
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Rating deserializers. A whole number (`8` or `8.0`) is accepted and
/// range-checked later by the validator. Anything else fails with the
/// field's own message instead of a serde type error.
mod ratings {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    fn whole<'de, D>(de: D, message: &'static str) -> Result<Option<i32>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = match Option::<Value>::deserialize(de)? {
            None | Some(Value::Null) => return Ok(None),
            Some(v) => v,
        };
        let n = match &value {
            Value::Number(n) => n.as_i64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && f.abs() <= i32::MAX as f64)
                    .map(|f| f as i64)
            }),
            _ => None,
        };
        n.and_then(|n| i32::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| D::Error::custom(message))
    }

    pub fn rating<'de, D: Deserializer<'de>>(de: D) -> Result<Option<i32>, D::Error> {
        whole(de, "Rating must be 1-10")
    }

    pub fn chemistry_rating<'de, D: Deserializer<'de>>(de: D) -> Result<Option<i32>, D::Error> {
        whole(de, "Chemistry rating must be 1-10")
    }

    pub fn attraction_rating<'de, D: Deserializer<'de>>(de: D) -> Result<Option<i32>, D::Error> {
        whole(de, "Attraction rating must be 1-10")
    }
}
