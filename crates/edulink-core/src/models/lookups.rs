use serde::{Deserialize, Serialize};

/// A behaviour category from `EduLink.AchievementBehaviourLookups`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviourType {
    pub id: String,
    pub code: String,
    pub description: String,
    pub active: bool,
    pub include_in_register: bool,
    pub is_bullying_type: bool,
    pub points: i32,
    pub position: i32,
    pub system: bool,
}

/// An achievement category from `EduLink.AchievementBehaviourLookups`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AchievementType {
    pub id: String,
    pub code: String,
    pub description: String,
    pub active: bool,
    pub points: i32,
    pub position: i32,
    pub system: bool,
}
