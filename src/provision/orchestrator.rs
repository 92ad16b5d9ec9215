//! Provisioning orchestrator.
//!
//! # States
//! - Start: nothing resolved yet
//! - IdentityResolved: a bearer token has been minted
//! - DatasourceResolved: the datasource uid is known
//! - Installed: the dashboard has been installed
//! - Done / Failed: terminal
//!
//! # State Transitions
//! ```text
//! Start → IdentityResolved → DatasourceResolved → Installed → Done
//!   └────────────┴──────────────────┴─────→ Failed(step, cause)
//! ```
//!
//! # Design Decisions
//! - Each step consumes the previous step's output; nothing runs in parallel
//! - First failure halts the run: no retries at this level, no rollback
//! - Effects of completed steps are left in place; re-running converges

use std::path::PathBuf;

use crate::api::{Credentials, ManagementClient};
use crate::config::ProvisionConfig;
use crate::provision::credentials::CredentialResolver;
use crate::provision::dashboard::DashboardInstaller;
use crate::provision::datasource::DatasourceReconciler;
use crate::provision::types::{
    AccessToken, DashboardRef, DatasourceRef, DatasourceSpec, ProvisionError, ProvisionResult, Step,
};

/// Run state. Each variant carries what the next step needs.
#[derive(Debug)]
pub enum ProvisionState {
    Start,
    IdentityResolved {
        token: AccessToken,
    },
    DatasourceResolved {
        token: AccessToken,
        datasource: DatasourceRef,
    },
    Installed {
        datasource: DatasourceRef,
        dashboard: DashboardRef,
    },
    Done,
    Failed {
        step: Step,
        cause: ProvisionError,
    },
}

impl ProvisionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProvisionState::Done | ProvisionState::Failed { .. })
    }

    /// The step that runs from this state, if any.
    pub fn next_step(&self) -> Option<Step> {
        match self {
            ProvisionState::Start => Some(Step::Credentials),
            ProvisionState::IdentityResolved { .. } => Some(Step::Datasource),
            ProvisionState::DatasourceResolved { .. } => Some(Step::Dashboard),
            ProvisionState::Installed { .. } | ProvisionState::Done | ProvisionState::Failed { .. } => None,
        }
    }
}

/// A step that completed, with a human-readable summary.
#[derive(Debug, Clone)]
pub struct StepRecord {
    pub step: Step,
    pub detail: String,
}

/// Outcome of a run.
#[derive(Debug)]
pub struct ProvisionReport {
    pub completed: Vec<StepRecord>,
    pub datasource: Option<DatasourceRef>,
    pub dashboard: Option<DashboardRef>,
    pub failure: Option<(Step, ProvisionError)>,
}

impl ProvisionReport {
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }
}

impl std::fmt::Display for ProvisionReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for record in &self.completed {
            writeln!(f, "[ok]     {}: {}", record.step, record.detail)?;
        }
        match &self.failure {
            Some((step, cause)) => writeln!(f, "[failed] {}: {}", step, cause),
            None => writeln!(f, "Provisioning complete"),
        }
    }
}

/// Sequences credential resolution, datasource reconciliation and
/// dashboard installation.
#[derive(Debug)]
pub struct Provisioner {
    config: ProvisionConfig,
    api: ManagementClient,
}

impl Provisioner {
    pub fn new(config: ProvisionConfig) -> ProvisionResult<Self> {
        let api = ManagementClient::new(&config.grafana, &config.timeouts, &config.retries)?;
        Ok(Self { config, api })
    }

    /// Drive the state machine to a terminal state.
    pub async fn run(&self) -> ProvisionReport {
        tracing::info!(url = %self.api.base_url(), "Provisioning started");

        let mut report = ProvisionReport {
            completed: Vec::new(),
            datasource: None,
            dashboard: None,
            failure: None,
        };
        let mut state = ProvisionState::Start;

        while !state.is_terminal() {
            state = self.advance(state, &mut report).await;
        }

        if let ProvisionState::Failed { step, cause } = state {
            tracing::error!(%step, error = %cause, "Provisioning failed");
            report.failure = Some((step, cause));
        } else {
            tracing::info!("Provisioning complete");
        }
        report
    }

    /// Perform one transition.
    pub async fn advance(&self, state: ProvisionState, report: &mut ProvisionReport) -> ProvisionState {
        let Some(step) = state.next_step() else {
            return match state {
                ProvisionState::Installed { datasource, dashboard } => {
                    tracing::debug!(datasource_uid = %datasource.uid, dashboard_uid = %dashboard.uid, "All steps complete");
                    ProvisionState::Done
                }
                terminal => terminal,
            };
        };

        tracing::info!(%step, "Running step");
        let next = match state {
            ProvisionState::Start => self
                .resolve_credentials()
                .await
                .map(|token| {
                    let detail = format!("service account '{}', token '{}'", self.config.service_account.name, token.name);
                    (detail, ProvisionState::IdentityResolved { token })
                }),
            ProvisionState::IdentityResolved { token } => self
                .reconcile_datasource(&token)
                .await
                .map(|datasource| {
                    let detail = format!("datasource '{}' uid {}", self.config.datasource.name, datasource.uid);
                    (detail, ProvisionState::DatasourceResolved { token, datasource })
                }),
            ProvisionState::DatasourceResolved { token, datasource } => self
                .install_dashboard(&token, &datasource.uid)
                .await
                .map(|dashboard| {
                    let detail = match &dashboard.url {
                        Some(url) => format!("dashboard uid {} at {}", dashboard.uid, url),
                        None => format!("dashboard uid {}", dashboard.uid),
                    };
                    (detail, ProvisionState::Installed { datasource, dashboard })
                }),
            other => return other,
        };

        match next {
            Ok((detail, next_state)) => {
                report.completed.push(StepRecord { step, detail });
                match &next_state {
                    ProvisionState::DatasourceResolved { datasource, .. } => {
                        report.datasource = Some(datasource.clone());
                    }
                    ProvisionState::Installed { dashboard, .. } => {
                        report.dashboard = Some(dashboard.clone());
                    }
                    _ => {}
                }
                next_state
            }
            Err(cause) => ProvisionState::Failed { step, cause },
        }
    }

    async fn resolve_credentials(&self) -> ProvisionResult<AccessToken> {
        let resolver = CredentialResolver::new(
            &self.api,
            &self.config.service_account,
            Credentials::admin(&self.config.grafana),
        );
        resolver
            .resolve_identity_and_token(&self.config.service_account.name)
            .await
    }

    async fn reconcile_datasource(&self, token: &AccessToken) -> ProvisionResult<DatasourceRef> {
        let spec = DatasourceSpec::from_config(&self.config.datasource);
        DatasourceReconciler::new(&self.api).reconcile_datasource(token, &spec).await
    }

    async fn install_dashboard(&self, token: &AccessToken, datasource_uid: &str) -> ProvisionResult<DashboardRef> {
        let template_path = PathBuf::from(&self.config.dashboard.template_path);
        DashboardInstaller::new(&self.api, &self.config.dashboard)
            .install_dashboard(token, &template_path, datasource_uid)
            .await
    }
}
