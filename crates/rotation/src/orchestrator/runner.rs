//! Sequential multi-profile run

use chrono::Utc;

use super::report::{ProfileReport, RunReport};
use super::selection::ProfileSelection;
use crate::core::{ConfigurationError, LocalRecord};
use crate::rotation::{RotationOptions, RotationOutcome, Rotator};
use crate::store::CredentialsFile;
use crate::traits::KeyAuthority;

/// Rotates every selected profile of a credentials file, one at a time
///
/// A failing profile never stops the run; configuration problems stop it
/// before the first remote call.
pub struct Orchestrator<'a, A: ?Sized> {
    authority: &'a A,
    file: &'a CredentialsFile,
    options: RotationOptions,
}

impl<'a, A> Orchestrator<'a, A>
where
    A: KeyAuthority + ?Sized,
{
    pub fn new(authority: &'a A, file: &'a CredentialsFile, options: RotationOptions) -> Self {
        Self {
            authority,
            file,
            options,
        }
    }

    /// Read the file, resolve `selection`, and rotate each selected profile
    #[tracing::instrument(
        skip(self, selection),
        fields(path = %self.file.path().display(), dry_run = self.options.dry_run)
    )]
    pub async fn run(&self, selection: &ProfileSelection) -> Result<RunReport, ConfigurationError> {
        let started_at = Utc::now();

        let document = self.file.load().await?;
        let rotatable = document.rotatable_profiles();
        let selected = selection.apply(&rotatable)?;

        let records = selected
            .iter()
            .map(|profile| document.local_record(profile))
            .collect::<Result<Vec<LocalRecord>, _>>()?;

        tracing::info!(
            profiles = records.len(),
            skipped = document.profiles().len().saturating_sub(records.len()),
            "starting rotation run"
        );

        let rotator = Rotator::new(self.authority, self.file, self.options.clone());
        let mut profiles = Vec::with_capacity(records.len());
        for record in records {
            let outcome = rotator.rotate(&record).await;
            log_outcome(&record.profile_name, &outcome);
            profiles.push(ProfileReport {
                profile: record.profile_name,
                outcome,
            });
        }

        let report = RunReport {
            started_at,
            finished_at: Utc::now(),
            profiles,
        };
        tracing::info!(
            rotated = report.rotated_count(),
            failed = report.failed_count(),
            "rotation run finished"
        );
        Ok(report)
    }
}

fn log_outcome(profile: &str, outcome: &RotationOutcome) {
    match outcome {
        RotationOutcome::Rotated { new_pair, .. } => {
            tracing::info!(profile, new_pair = %new_pair.id, "profile rotated");
        }
        RotationOutcome::Planned { plan } => {
            tracing::info!(profile, %plan, "dry run, nothing changed");
        }
        RotationOutcome::NoActionPossible { reason } => {
            tracing::warn!(profile, %reason, "profile skipped");
        }
        RotationOutcome::Failed {
            stage,
            error,
            new_pair_id,
        } => {
            tracing::error!(
                profile,
                %stage,
                %error,
                new_pair = new_pair_id.as_ref().map(tracing::field::display),
                "profile rotation failed"
            );
        }
    }
}
