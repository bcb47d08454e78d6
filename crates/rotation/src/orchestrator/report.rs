//! Run report

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core::PairId;
use crate::rotation::{RotationOutcome, RotationPlan, Stage};

/// Outcome of one profile
#[derive(Debug)]
pub struct ProfileReport {
    pub profile: String,
    pub outcome: RotationOutcome,
}

/// Outcome of a whole run, in processing order
#[derive(Debug)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub profiles: Vec<ProfileReport>,
}

/// Serializable view of a [`ProfileReport`]
#[derive(Debug, Serialize)]
pub struct ProfileSummary<'a> {
    pub profile: &'a str,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_pair_id: Option<&'a PairId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<&'a RotationPlan>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Serialize)]
struct RunSummary<'a> {
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    rotated: usize,
    failed: usize,
    profiles: Vec<ProfileSummary<'a>>,
}

impl ProfileReport {
    pub fn summary(&self) -> ProfileSummary<'_> {
        let mut summary = ProfileSummary {
            profile: &self.profile,
            status: "",
            new_pair_id: self.outcome.new_pair_id(),
            plan: None,
            stage: None,
            message: None,
        };
        match &self.outcome {
            RotationOutcome::Rotated { plan, .. } => {
                summary.status = "rotated";
                summary.plan = Some(plan);
            }
            RotationOutcome::Planned { plan } => {
                summary.status = "planned";
                summary.plan = Some(plan);
            }
            RotationOutcome::NoActionPossible { reason } => {
                summary.status = "no_action";
                summary.message = Some(reason.clone());
            }
            RotationOutcome::Failed { stage, error, .. } => {
                summary.status = "failed";
                summary.stage = Some(*stage);
                summary.message = Some(error.to_string());
            }
        }
        summary
    }
}

impl RunReport {
    pub fn has_failures(&self) -> bool {
        self.profiles.iter().any(|p| p.outcome.is_failure())
    }

    pub fn rotated_count(&self) -> usize {
        self.profiles.iter().filter(|p| p.outcome.is_rotated()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.profiles.iter().filter(|p| p.outcome.is_failure()).count()
    }

    pub fn get(&self, profile: &str) -> Option<&RotationOutcome> {
        self.profiles
            .iter()
            .find(|p| p.profile == profile)
            .map(|p| &p.outcome)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&RunSummary {
            started_at: self.started_at,
            finished_at: self.finished_at,
            rotated: self.rotated_count(),
            failed: self.failed_count(),
            profiles: self.profiles.iter().map(ProfileReport::summary).collect(),
        })
    }
}
