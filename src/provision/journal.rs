use chrono::{DateTime, Utc};
use serde::Serialize;
use std::net::Ipv4Addr;

use crate::config::RunMode;
use crate::error::ProvisionError;

/// Subnet created during the run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedSubnet {
    pub id: u32,
    pub subnet: String,
    pub pool: String,
}

/// Reservation created during the run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedReservation {
    pub subnet_id: u32,
    pub ip_address: Ipv4Addr,
    pub ordinal: u32,
    pub port: String,
}

/// Append-only record of the mutations a run performed.
/// In dry-run mode it lists what would have been created.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Journal {
    pub subnets: Vec<CreatedSubnet>,
    pub reservations: Vec<CreatedReservation>,
}

/// Requested subnet that was not provisioned
#[derive(Debug, Clone, Serialize)]
pub struct Skip {
    pub subnet: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunCounts {
    pub subnets_requested: usize,
    pub subnets_created: usize,
    pub subnets_skipped: usize,
    pub reservations_created: usize,
    pub reservations_failed: usize,
}

/// Outcome of a provisioning run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub message: String,
    pub mode: RunMode,
    pub hostname: String,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    pub counts: RunCounts,
    pub config_written: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skips: Vec<Skip>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    pub journal: Journal,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rolled_back: Vec<u32>,
}

impl RunSummary {
    pub fn new(hostname: &str, mode: RunMode, subnets_requested: usize) -> Self {
        Self {
            message: String::new(),
            mode,
            hostname: hostname.to_string(),
            started_at: Utc::now(),
            finished_at: None,
            counts: RunCounts {
                subnets_requested,
                ..RunCounts::default()
            },
            config_written: false,
            skips: Vec::new(),
            warnings: Vec::new(),
            journal: Journal::default(),
            rolled_back: Vec::new(),
        }
    }

    pub fn record_skip(&mut self, subnet: &str, reason: impl Into<String>) {
        let reason = reason.into();
        tracing::warn!("Skipping subnet {}: {}", subnet, reason);
        self.counts.subnets_skipped += 1;
        self.skips.push(Skip {
            subnet: subnet.to_string(),
            reason,
        });
    }

    pub fn record_warning(&mut self, warning: impl Into<String>) {
        let warning = warning.into();
        tracing::warn!("{}", warning);
        self.warnings.push(warning);
    }

    pub fn record_subnet(&mut self, subnet: CreatedSubnet) {
        self.counts.subnets_created += 1;
        self.journal.subnets.push(subnet);
    }

    pub fn record_reservation(&mut self, reservation: CreatedReservation) {
        self.counts.reservations_created += 1;
        self.journal.reservations.push(reservation);
    }

    pub fn record_failed_reservation(&mut self, warning: impl Into<String>) {
        self.counts.reservations_failed += 1;
        self.record_warning(warning);
    }

    /// Stamp the end of the run and compose the message
    pub fn finish(mut self) -> Self {
        let verb = match self.mode {
            RunMode::DryRun => "Dry run would create",
            RunMode::Apply => "Created",
        };
        self.message = format!(
            "{} {} subnet(s) and {} reservation(s) for {} ({} skipped, {} reservation failure(s))",
            verb,
            self.counts.subnets_created,
            self.counts.reservations_created,
            self.hostname,
            self.counts.subnets_skipped,
            self.counts.reservations_failed
        );
        self.finished_at = Some(Utc::now());
        self
    }
}

/// A run aborted by a fatal error, with everything recorded up to that point
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct FatalRun {
    #[source]
    pub error: ProvisionError,
    pub summary: Box<RunSummary>,
}
