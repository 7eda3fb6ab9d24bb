use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub const DEFAULT_AGE_RANGE: &str = "8-12";
pub const DEFAULT_CURRENT_LESSON: i64 = 1;

fn default_age_range() -> String {
    DEFAULT_AGE_RANGE.to_string()
}

fn default_current_lesson() -> i64 {
    DEFAULT_CURRENT_LESSON
}

/// Per-user document holding every child profile of that user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(default)]
    pub uid: String,
    #[serde(default)]
    pub children: BTreeMap<String, ChildProfile>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserRecord {
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            children: BTreeMap::new(),
            extra: Map::new(),
        }
    }

    /// Decode a stored record one child at a time.
    ///
    /// A child whose profile no longer decodes (say a wrongly typed field) is
    /// dropped on its own; siblings and unknown top-level keys are kept.
    /// Anything other than a JSON object is not a record at all.
    pub(crate) fn from_stored(value: Value) -> Option<Self> {
        let Value::Object(mut extra) = value else {
            return None;
        };
        let uid = match extra.remove("uid") {
            Some(Value::String(uid)) => uid,
            _ => String::new(),
        };
        let stored_children = match extra.remove("children") {
            Some(Value::Object(children)) => children,
            None | Some(Value::Null) => Map::new(),
            Some(other) => {
                tracing::warn!("Ignoring non-object children list in record '{}': {}", uid, other);
                Map::new()
            }
        };

        let mut children = BTreeMap::new();
        for (child_id, raw) in stored_children {
            match serde_json::from_value::<ChildProfile>(raw) {
                Ok(profile) => {
                    children.insert(child_id, profile);
                }
                Err(e) => tracing::warn!("Dropping unreadable profile '{}' in record '{}': {}", child_id, uid, e),
            }
        }

        Some(Self { uid, children, extra })
    }

    /// Profiles stored without a nickname fall back to their child id.
    pub(crate) fn fill_missing_nicknames(&mut self) {
        for (child_id, profile) in self.children.iter_mut() {
            if profile.nickname.is_empty() {
                profile.nickname = child_id.clone();
            }
        }
    }
}

/// Learning progress for one child. Every field has a default, so a stored
/// profile missing keys still reads back complete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildProfile {
    #[serde(default)]
    pub nickname: String,
    #[serde(default = "default_age_range")]
    pub age_range: String,
    #[serde(default = "default_current_lesson")]
    pub current_lesson: i64,
    #[serde(default)]
    pub lessons_completed: Vec<i64>,
    #[serde(default)]
    pub challenges_completed: Vec<String>,
    #[serde(default)]
    pub badges_earned: Vec<String>,
    #[serde(default)]
    pub coins: i64,
    #[serde(default)]
    pub points: i64,
    /// Keys outside the known schema, stored verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ChildProfile {
    pub fn new(child_id: impl Into<String>) -> Self {
        Self {
            nickname: child_id.into(),
            age_range: default_age_range(),
            current_lesson: DEFAULT_CURRENT_LESSON,
            lessons_completed: Vec::new(),
            challenges_completed: Vec::new(),
            badges_earned: Vec::new(),
            coins: 0,
            points: 0,
            extra: Map::new(),
        }
    }

    /// Merge a partial update: supplied fields overwrite, omitted fields stay.
    pub fn apply(&mut self, update: ProfileUpdate) {
        let ProfileUpdate {
            nickname,
            age_range,
            current_lesson,
            lessons_completed,
            challenges_completed,
            badges_earned,
            coins,
            points,
            extra,
        } = update;

        if let Some(v) = nickname {
            self.nickname = v;
        }
        if let Some(v) = age_range {
            self.age_range = v;
        }
        if let Some(v) = current_lesson {
            self.current_lesson = v;
        }
        if let Some(v) = lessons_completed {
            self.lessons_completed = v;
        }
        if let Some(v) = challenges_completed {
            self.challenges_completed = v;
        }
        if let Some(v) = badges_earned {
            self.badges_earned = v;
        }
        if let Some(v) = coins {
            self.coins = v;
        }
        if let Some(v) = points {
            self.points = v;
        }

        // null means "not supplied", same as for the typed fields
        for (key, value) in extra {
            if !value.is_null() {
                self.extra.insert(key, value);
            }
        }
    }
}

/// Body of `PUT /progress/:child_id`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_range: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_lesson: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lessons_completed: Option<Vec<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub challenges_completed: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badges_earned: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coins: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
