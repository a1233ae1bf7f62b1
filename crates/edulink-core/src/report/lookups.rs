use std::collections::HashMap;

use crate::api::methods::LookupsResult;
use crate::models::{AchievementType, BehaviourType, Employee, Photo, Report};

/// In-memory reference data for rendering.
///
/// Type tables come from one lookups call per pass. Teachers and their photos
/// accumulate across every report the pass produces; the first record seen
/// for an ID wins.
#[derive(Debug, Clone, Default)]
pub struct ReportLookups {
    achievement_types: HashMap<String, AchievementType>,
    behaviour_types: HashMap<String, BehaviourType>,
    teachers: HashMap<String, Employee>,
    teacher_photos: HashMap<String, Photo>,
}

impl ReportLookups {
    pub fn new(
        achievement_types: Vec<AchievementType>,
        behaviour_types: Vec<BehaviourType>,
    ) -> Self {
        let mut lookups = Self::default();
        for t in achievement_types {
            lookups.achievement_types.entry(t.id.clone()).or_insert(t);
        }
        for t in behaviour_types {
            lookups.behaviour_types.entry(t.id.clone()).or_insert(t);
        }
        lookups
    }

    pub fn from_result(result: LookupsResult) -> Self {
        Self::new(result.achievement_types, result.behaviour_types)
    }

    pub fn achievement_type(&self, id: &str) -> Option<&AchievementType> {
        self.achievement_types.get(id)
    }

    pub fn behaviour_type(&self, id: &str) -> Option<&BehaviourType> {
        self.behaviour_types.get(id)
    }

    pub fn teacher(&self, id: &str) -> Option<&Employee> {
        self.teachers.get(id)
    }

    /// Base64 thumbnail for a teacher, if one was fetched.
    pub fn teacher_photo(&self, id: &str) -> Option<&str> {
        self.teacher_photos
            .get(id)
            .map(|p| p.photo.as_str())
            .filter(|p| !p.is_empty())
    }

    /// Merge a report's teachers and photos into the pass-wide tables.
    pub fn absorb(&mut self, report: &Report) {
        for teacher in &report.teachers {
            self.teachers
                .entry(teacher.id.clone())
                .or_insert_with(|| teacher.clone());
        }
        for photo in &report.teacher_photos {
            self.teacher_photos
                .entry(photo.id.clone())
                .or_insert_with(|| photo.clone());
        }
    }

    pub fn teacher_count(&self) -> usize {
        self.teachers.len()
    }
}
