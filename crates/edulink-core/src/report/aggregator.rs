//! One reporting pass: log in, pull every child's records, keep what is new.
//!
//! Ordering inside a pass:
//!
//! 1. dedup state is loaded before anything else, so every exit path persists it
//! 2. school details, login and lookups; a failure here ends the pass
//! 3. per child, all network calls run before any event is classified, so a
//!    child whose calls fail never marks its events as seen
//! 4. the dedup state is persisted; a failed write is reported in the outcome
//!    instead of discarding the reports already built
//!
//! A preview pass (`PassOptions::preview`) never touches the dedup state: it
//! reports events already seen and persists nothing.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use super::lookups::ReportLookups;
use crate::api::methods::{AchievementResult, BehaviourResult};
use crate::api::{ApiError, RpcClient};
use crate::auth::Session;
use crate::cache::CacheError;
use crate::config::Settings;
use crate::dedup::DedupTracker;
use crate::models::{Child, ChildPhoto, Employee, Establishment, Event, Photo, Report};

/// Thumbnail edge length requested for learner and teacher photos.
pub const PHOTO_SIZE: u32 = 256;

/// Event window of a preview pass.
pub const PREVIEW_MAX_AGE_DAYS: i64 = 30;

/// What to do when one child's calls fail after login.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailurePolicy {
    /// Record the failure and carry on with the next child.
    #[default]
    #[serde(rename = "isolate")]
    IsolateChild,
    /// Stop the pass at the first failing child.
    #[serde(rename = "abort")]
    AbortPass,
}

impl FromStr for FailurePolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "isolate" | "isolate-child" => Ok(FailurePolicy::IsolateChild),
            "abort" | "abort-pass" => Ok(FailurePolicy::AbortPass),
            other => Err(anyhow!(
                "Unknown failure policy '{}', expected 'isolate' or 'abort'",
                other
            )),
        }
    }
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailurePolicy::IsolateChild => write!(f, "isolate"),
            FailurePolicy::AbortPass => write!(f, "abort"),
        }
    }
}

/// Where a pass has got to. Only used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassStage {
    Idle,
    LoggedIn,
    LookupsResolved,
    Fetching,
    Filtering,
    Assembled,
    Persisted,
    Done,
}

impl fmt::Display for PassStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PassStage::Idle => "idle",
            PassStage::LoggedIn => "logged-in",
            PassStage::LookupsResolved => "lookups-resolved",
            PassStage::Fetching => "fetching",
            PassStage::Filtering => "filtering",
            PassStage::Assembled => "assembled",
            PassStage::Persisted => "persisted",
            PassStage::Done => "done",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct PassOptions {
    pub failure_policy: FailurePolicy,
    /// Events dated earlier than `today - max_event_age` are left out of the
    /// report and not marked seen. Undated events are always kept.
    pub max_event_age: Option<Duration>,
    pub photo_size: u32,
    /// Include events already reported, and leave the dedup state alone.
    pub report_previous: bool,
}

impl PassOptions {
    /// The last month of events, whether reported before or not.
    pub fn preview() -> Self {
        Self {
            max_event_age: Some(Duration::days(PREVIEW_MAX_AGE_DAYS)),
            report_previous: true,
            ..Default::default()
        }
    }
}

impl Default for PassOptions {
    fn default() -> Self {
        Self {
            failure_policy: FailurePolicy::default(),
            max_event_age: None,
            photo_size: PHOTO_SIZE,
            report_previous: false,
        }
    }
}

/// Login details for the parent account.
#[derive(Debug, Clone)]
pub struct Account {
    pub username: String,
    pub password: String,
    pub establishment_id: u32,
}

impl Account {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            username: settings.username.clone(),
            password: settings.password.clone(),
            establishment_id: settings.establishment_id,
        }
    }
}

/// A child whose calls failed under `FailurePolicy::IsolateChild`.
#[derive(Debug)]
pub struct ChildFailure {
    pub child: Child,
    pub error: ApiError,
}

#[derive(Debug)]
pub struct PassOutcome {
    /// One report per successful child, in login order. Includes reports
    /// with nothing new.
    pub reports: Vec<Report>,
    pub failures: Vec<ChildFailure>,
    pub lookups: ReportLookups,
    pub stage: PassStage,
    /// Set when the already-seen IDs could not be written back. The next
    /// pass will report this pass's events again.
    pub persist_error: Option<CacheError>,
}

impl PassOutcome {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.persist_error.is_none()
    }
}

/// Everything fetched for one child, before classification.
struct ChildData {
    photo: ChildPhoto,
    behaviour: BehaviourResult,
    achievement: AchievementResult,
    teachers: Vec<Employee>,
    teacher_photos: Vec<Photo>,
}

pub struct ReportAggregator {
    client: RpcClient,
    account: Account,
    options: PassOptions,
}

impl ReportAggregator {
    pub fn new(client: RpcClient, account: Account, options: PassOptions) -> Self {
        Self {
            client,
            account,
            options,
        }
    }

    /// Run one pass. Dedup state is persisted whether the pass succeeds or not.
    pub async fn run_pass(&self) -> Result<PassOutcome> {
        let mut stage = PassStage::Idle;
        let mut tracker = if self.options.report_previous {
            info!("Preview pass, already-seen events are included");
            None
        } else {
            Some(DedupTracker::load(self.client.cache()))
        };

        let school = self
            .client
            .school_details(self.account.establishment_id)
            .await
            .context("Failed to fetch school details")?
            .establishment;

        let session = self
            .client
            .authenticate(
                &self.account.username,
                &self.account.password,
                self.account.establishment_id,
            )
            .await
            .context("Failed to log in")?;
        stage = enter(stage, PassStage::LoggedIn);
        info!(
            user = %session.display_name(),
            children = session.children.len(),
            "Logged in"
        );

        let lookups = self
            .client
            .lookups(session.token())
            .await
            .context("Failed to fetch achievement and behaviour lookups")?;
        let mut lookups = ReportLookups::from_result(lookups);
        stage = enter(stage, PassStage::LookupsResolved);

        let cutoff = self
            .options
            .max_event_age
            .map(|age| Utc::now().date_naive() - age);

        let mut reports = Vec::with_capacity(session.children.len());
        let mut failures = Vec::new();

        for child in &session.children {
            stage = enter(stage, PassStage::Fetching);
            let data = match self.fetch_child(&session, child).await {
                Ok(data) => data,
                Err(e) => match self.options.failure_policy {
                    FailurePolicy::IsolateChild => {
                        warn!(child = %child.id, method = e.method(), error = %e, "Skipping child after failed call");
                        failures.push(ChildFailure {
                            child: child.clone(),
                            error: e,
                        });
                        continue;
                    }
                    FailurePolicy::AbortPass => {
                        error!(child = %child.id, method = e.method(), error = %e, "Aborting pass");
                        // The tracker persists on drop
                        return Err(anyhow::Error::new(e)
                            .context(format!("Failed to fetch records for {}", child.full_name())));
                    }
                },
            };

            stage = enter(stage, PassStage::Filtering);
            let report = assemble(tracker.as_mut(), &school, child, data, cutoff);
            stage = enter(stage, PassStage::Assembled);

            if report.has_new_events() {
                info!(
                    child = %child.id,
                    behaviour = report.behaviour.len(),
                    achievement = report.achievement.len(),
                    "New events"
                );
            } else {
                info!(child = %child.id, "No new achievements or behaviours for {}", child.forename);
            }

            lookups.absorb(&report);
            reports.push(report);
        }

        let mut persist_error = None;
        if let Some(tracker) = tracker {
            match tracker.persist() {
                Ok(()) => stage = enter(stage, PassStage::Persisted),
                Err(e) => {
                    error!(error = %e, "Failed to persist already-seen event IDs");
                    persist_error = Some(e);
                }
            }
        }
        stage = enter(stage, PassStage::Done);

        Ok(PassOutcome {
            reports,
            failures,
            lookups,
            stage,
            persist_error,
        })
    }

    async fn fetch_child(&self, session: &Session, child: &Child) -> Result<ChildData, ApiError> {
        let token = session.token.as_str();
        let size = self.options.photo_size;

        let photos = self
            .client
            .learner_photos(token, vec![child.id.clone()], size)
            .await?;
        let photo = ChildPhoto::from_photos(photos.learner_photos);
        if photo == ChildPhoto::Missing {
            warn!(child = %child.id, "No learner photo returned");
        }

        let behaviour = self.client.behaviour(token, &child.id).await?;
        let achievement = self.client.achievement(token, &child.id).await?;

        let teachers = merge_employees(&behaviour.employees, &achievement.employees);
        let teacher_photos = if teachers.is_empty() {
            debug!(child = %child.id, "No employees referenced, skipping teacher photos");
            Vec::new()
        } else {
            let ids = teachers.iter().map(|t| t.id.clone()).collect();
            self.client
                .teacher_photos(token, ids, size)
                .await?
                .teacher_photos
        };

        Ok(ChildData {
            photo,
            behaviour,
            achievement,
            teachers,
            teacher_photos,
        })
    }
}

fn enter(from: PassStage, to: PassStage) -> PassStage {
    debug!(from = %from, to = %to, "Pass stage");
    to
}

/// Classify a child's events and build the report. No network access.
/// Without a tracker every event in the window is kept.
fn assemble(
    tracker: Option<&mut DedupTracker>,
    school: &Establishment,
    child: &Child,
    data: ChildData,
    cutoff: Option<NaiveDate>,
) -> Report {
    let behaviour = retain_recent(data.behaviour.behaviour, cutoff);
    let achievement = retain_recent(data.achievement.achievement, cutoff);
    let (behaviour, achievement) = match tracker {
        Some(tracker) => (tracker.filter_new(behaviour), tracker.filter_new(achievement)),
        None => (behaviour, achievement),
    };

    Report {
        child: child.clone(),
        photo: data.photo,
        school: school.clone(),
        behaviour,
        achievement,
        teachers: data.teachers,
        teacher_photos: data.teacher_photos,
    }
}

/// Union of both employee lists, unique by ID, in first-seen order.
pub fn merge_employees(first: &[Employee], second: &[Employee]) -> Vec<Employee> {
    let mut seen = HashSet::new();
    first
        .iter()
        .chain(second)
        .filter(|e| seen.insert(e.id.as_str()))
        .cloned()
        .collect()
}

/// Drop events dated before `cutoff`. Undated events stay.
pub fn retain_recent<E: Event>(events: Vec<E>, cutoff: Option<NaiveDate>) -> Vec<E> {
    let Some(cutoff) = cutoff else {
        return events;
    };
    let total = events.len();
    let kept: Vec<E> = events
        .into_iter()
        .filter(|e| e.date().map_or(true, |d| d >= cutoff))
        .collect();
    if kept.len() < total {
        debug!(kind = %E::KIND, dropped = total - kept.len(), %cutoff, "Ignoring old events");
    }
    kept
}
