//! Request parameters and result payloads, one marker type per API method.

use serde::{Deserialize, Serialize};

use super::protocol::{ApiMethod, ApiResult, NoParams, ResultBase};
use crate::models::{
    Achievement, AchievementType, Behaviour, BehaviourType, Child, Employee, Establishment, Photo,
};

macro_rules! api_result {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ApiResult for $ty {
                fn base(&self) -> &ResultBase {
                    &self.base
                }
            }
        )*
    };
}

// ===== Login =====

pub struct LoginCall;

#[derive(Debug, Clone, Serialize)]
pub struct LoginParams {
    pub username: String,
    pub password: String,
    pub establishment_id: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginUser {
    pub id: String,
    pub establishment_id: String,
    pub title: String,
    pub forename: String,
    pub surname: String,
    pub username: String,
    pub types: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginResult {
    #[serde(flatten)]
    pub base: ResultBase,
    pub api_version: i32,
    pub authtoken: String,
    pub user: LoginUser,
    pub login_method: String,
    pub children: Vec<Child>,
    pub establishment: Establishment,
}

impl ApiMethod for LoginCall {
    const NAME: &'static str = "EduLink.Login";
    type Params = LoginParams;
    type Output = LoginResult;
}

// ===== School details =====

pub struct SchoolDetailsCall;

#[derive(Debug, Clone, Serialize)]
pub struct SchoolDetailsParams {
    pub establishment_id: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SchoolDetailsResult {
    #[serde(flatten)]
    pub base: ResultBase,
    pub establishment: Establishment,
}

impl ApiMethod for SchoolDetailsCall {
    const NAME: &'static str = "EduLink.SchoolDetails";
    type Params = SchoolDetailsParams;
    type Output = SchoolDetailsResult;
}

// ===== Achievement and behaviour lookups =====

pub struct LookupsCall;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupsResult {
    #[serde(flatten)]
    pub base: ResultBase,
    #[serde(rename = "detentionmanagement_enabled")]
    pub detention_management_enabled: bool,
    pub behaviour_types: Vec<BehaviourType>,
    pub achievement_types: Vec<AchievementType>,
}

impl ApiMethod for LookupsCall {
    const NAME: &'static str = "EduLink.AchievementBehaviourLookups";
    type Params = NoParams;
    type Output = LookupsResult;
}

// ===== Photos =====

pub struct LearnerPhotosCall;

#[derive(Debug, Clone, Serialize)]
pub struct LearnerPhotosParams {
    pub learner_ids: Vec<String>,
    pub size: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LearnerPhotosResult {
    #[serde(flatten)]
    pub base: ResultBase,
    pub learner_photos: Vec<Photo>,
}

impl ApiMethod for LearnerPhotosCall {
    const NAME: &'static str = "EduLink.LearnerPhotos";
    type Params = LearnerPhotosParams;
    type Output = LearnerPhotosResult;
}

pub struct TeacherPhotosCall;

#[derive(Debug, Clone, Serialize)]
pub struct TeacherPhotosParams {
    pub employee_ids: Vec<String>,
    pub size: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TeacherPhotosResult {
    #[serde(flatten)]
    pub base: ResultBase,
    #[serde(rename = "employee_photos")]
    pub teacher_photos: Vec<Photo>,
}

impl ApiMethod for TeacherPhotosCall {
    const NAME: &'static str = "EduLink.TeacherPhotos";
    type Params = TeacherPhotosParams;
    type Output = TeacherPhotosResult;
}

// ===== Behaviour and achievement =====

/// Shared parameters for the per-learner event calls.
#[derive(Debug, Clone, Serialize)]
pub struct LearnerEventsParams {
    pub learner_id: String,
    pub format: u8,
}

pub struct BehaviourCall;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviourResult {
    #[serde(flatten)]
    pub base: ResultBase,
    pub behaviour: Vec<Behaviour>,
    pub employees: Vec<Employee>,
}

impl ApiMethod for BehaviourCall {
    const NAME: &'static str = "EduLink.Behaviour";
    type Params = LearnerEventsParams;
    type Output = BehaviourResult;
}

pub struct AchievementCall;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AchievementResult {
    #[serde(flatten)]
    pub base: ResultBase,
    pub achievement: Vec<Achievement>,
    pub employees: Vec<Employee>,
}

impl ApiMethod for AchievementCall {
    const NAME: &'static str = "EduLink.Achievement";
    type Params = LearnerEventsParams;
    type Output = AchievementResult;
}

api_result!(
    LoginResult,
    SchoolDetailsResult,
    LookupsResult,
    LearnerPhotosResult,
    TeacherPhotosResult,
    BehaviourResult,
    AchievementResult,
);
