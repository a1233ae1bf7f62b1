use serde::Serialize;

use super::{Achievement, Behaviour, Child, Employee, Establishment, Photo};

/// The learner's own thumbnail. The API can return an empty photo list,
/// so absence is a normal, typed case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "photo", rename_all = "snake_case")]
pub enum ChildPhoto {
    Available(String),
    Missing,
}

impl ChildPhoto {
    pub fn from_photos(photos: Vec<Photo>) -> Self {
        match photos.into_iter().next() {
            Some(first) if !first.photo.is_empty() => ChildPhoto::Available(first.photo),
            _ => ChildPhoto::Missing,
        }
    }

    pub fn as_base64(&self) -> Option<&str> {
        match self {
            ChildPhoto::Available(photo) => Some(photo),
            ChildPhoto::Missing => None,
        }
    }
}

/// Everything new for one child in one pass, ready for rendering.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub child: Child,
    pub photo: ChildPhoto,
    pub school: Establishment,
    pub behaviour: Vec<Behaviour>,
    pub achievement: Vec<Achievement>,
    /// Staff from both event responses, unique by ID, first-seen order.
    pub teachers: Vec<Employee>,
    pub teacher_photos: Vec<Photo>,
}

impl Report {
    pub fn has_new_events(&self) -> bool {
        !self.behaviour.is_empty() || !self.achievement.is_empty()
    }

    pub fn behaviour_points(&self) -> i32 {
        self.behaviour.iter().map(|b| b.points).sum()
    }

    pub fn achievement_points(&self) -> i32 {
        self.achievement.iter().map(|a| a.points).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn photo(id: &str, data: &str) -> Photo {
        Photo {
            id: id.to_string(),
            cache: String::new(),
            photo: data.to_string(),
        }
    }

    #[test]
    fn test_child_photo_takes_first() {
        let photo = ChildPhoto::from_photos(vec![photo("1", "AAA"), photo("1", "BBB")]);
        assert_eq!(photo, ChildPhoto::Available("AAA".to_string()));
        assert_eq!(photo.as_base64(), Some("AAA"));
    }

    #[test]
    fn test_child_photo_missing_when_empty() {
        assert_eq!(ChildPhoto::from_photos(vec![]), ChildPhoto::Missing);
        assert_eq!(ChildPhoto::from_photos(vec![photo("1", "")]), ChildPhoto::Missing);
    }

    #[test]
    fn test_has_new_events_and_points() {
        let mut report = Report {
            child: Child::default(),
            photo: ChildPhoto::Missing,
            school: Establishment::default(),
            behaviour: vec![],
            achievement: vec![],
            teachers: vec![],
            teacher_photos: vec![],
        };
        assert!(!report.has_new_events());

        report.achievement.push(Achievement {
            id: "A1".to_string(),
            points: 3,
            ..Default::default()
        });
        report.achievement.push(Achievement {
            id: "A2".to_string(),
            points: 2,
            ..Default::default()
        });
        assert!(report.has_new_events());
        assert_eq!(report.achievement_points(), 5);
        assert_eq!(report.behaviour_points(), 0);
    }
}
