use metrics_exporter_prometheus::PrometheusHandle;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{info, warn};
use works_council::council::{
    EmployeeRoster, InMemoryCouncilStore, InMemoryEmployeeDirectory, MembershipEngine,
    MembershipPolicy,
};
use works_council::error::AppError;

pub(crate) type ServiceEngine =
    MembershipEngine<InMemoryCouncilStore, InMemoryCouncilStore, InMemoryEmployeeDirectory>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Loads the employee directory, empty when no roster is configured.
pub(crate) fn load_directory(
    roster: Option<&Path>,
) -> Result<InMemoryEmployeeDirectory, AppError> {
    match roster {
        Some(path) => {
            let roster = EmployeeRoster::from_path(path)?;
            let summary = roster.summary();
            info!(
                path = %path.display(),
                employees = summary.total_employees,
                units = summary.employees_per_unit.len(),
                "employee directory seeded"
            );
            Ok(roster.into_directory())
        }
        None => {
            warn!("no employee roster configured; directory starts empty");
            Ok(InMemoryEmployeeDirectory::default())
        }
    }
}

pub(crate) fn build_engine(
    directory: InMemoryEmployeeDirectory,
    policy: MembershipPolicy,
) -> Arc<ServiceEngine> {
    let store = Arc::new(InMemoryCouncilStore::default());
    Arc::new(MembershipEngine::new(store.clone(), store, Arc::new(directory)).with_policy(policy))
}
