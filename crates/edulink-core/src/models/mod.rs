//! Data models for EduLink entities.
//!
//! - `Child`: a learner attached to the logged-in parent account
//! - `Behaviour`, `Achievement`: dated events recorded against a learner
//! - `Employee`, `Photo`: staff referenced by events and their thumbnails
//! - `Establishment`: school details
//! - `BehaviourType`, `AchievementType`: reference data for rendering
//! - `Report`: the assembled per-child bundle

pub mod child;
pub mod employee;
pub mod event;
pub mod lookups;
pub mod report;
pub mod school;

pub use child::Child;
pub use employee::{Employee, Photo};
pub use event::{Achievement, Behaviour, Event, Recorded};
pub use lookups::{AchievementType, BehaviourType};
pub use report::{ChildPhoto, Report};
pub use school::{Establishment, FormGroup, Group, Room, Subject};
