use std::sync::Arc;

use axum::response::Response;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::council::category::ElectionCategory;
use crate::council::domain::{
    Council, Employee, EmployeeId, Membership, MembershipId, UnitId,
};
use crate::council::memory::{InMemoryCouncilStore, InMemoryEmployeeDirectory};
use crate::council::policy::MembershipPolicy;
use crate::council::repository::{CouncilRepository, MembershipRepository, RepositoryError};
use crate::council::{works_council_router, MembershipEngine};

pub(super) type MemoryEngine =
    MembershipEngine<InMemoryCouncilStore, InMemoryCouncilStore, InMemoryEmployeeDirectory>;

pub(super) struct Fixture {
    pub(super) engine: Arc<MemoryEngine>,
    pub(super) store: Arc<InMemoryCouncilStore>,
    pub(super) directory: Arc<InMemoryEmployeeDirectory>,
    pub(super) unit: UnitId,
    pub(super) employees: Vec<EmployeeId>,
}

impl Fixture {
    pub(super) fn employee(&self, index: usize) -> EmployeeId {
        self.employees[index]
    }

    pub(super) fn scope(&self, category: ElectionCategory) -> Vec<(EmployeeId, u32)> {
        let mut scope = self
            .store
            .get_by_unit_and_category(&self.unit, category)
            .expect("scope readable");
        scope.sort_by_key(|membership| membership.position);
        scope
            .into_iter()
            .map(|membership| (membership.employee_id, membership.position))
            .collect()
    }
}

pub(super) fn employee(unit: UnitId, first_name: &str, last_name: &str) -> Employee {
    Employee {
        id: EmployeeId::new(),
        unit_id: unit,
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        email: None,
    }
}

const NAMES: [(&str, &str); 5] = [
    ("Lotte", "Peeters"),
    ("Jonas", "Maes"),
    ("Emma", "Claes"),
    ("Noah", "Jacobs"),
    ("Louise", "Willems"),
];

pub(super) fn fixture() -> Fixture {
    fixture_with_policy(MembershipPolicy::default())
}

pub(super) fn fixture_with_policy(policy: MembershipPolicy) -> Fixture {
    let unit = UnitId::new();
    let staff: Vec<Employee> = NAMES
        .iter()
        .map(|(first, last)| employee(unit, first, last))
        .collect();
    let employees = staff.iter().map(|employee| employee.id).collect();

    let store = Arc::new(InMemoryCouncilStore::default());
    let directory = Arc::new(InMemoryEmployeeDirectory::from_employees(staff));
    let engine = Arc::new(
        MembershipEngine::new(store.clone(), store.clone(), directory.clone())
            .with_policy(policy),
    );

    Fixture {
        engine,
        store,
        directory,
        unit,
        employees,
    }
}

pub(super) fn token() -> CancellationToken {
    CancellationToken::new()
}

pub(super) fn cancelled_token() -> CancellationToken {
    let token = CancellationToken::new();
    token.cancel();
    token
}

pub(super) fn fixture_router(fixture: &Fixture) -> axum::Router {
    works_council_router(fixture.engine.clone(), CancellationToken::new())
}

/// Store that is offline for every call.
pub(super) struct UnavailableStore;

fn offline<T>() -> Result<T, RepositoryError> {
    Err(RepositoryError::Unavailable("database offline".to_string()))
}

impl CouncilRepository for UnavailableStore {
    fn get_by_unit(&self, _unit_id: &UnitId) -> Result<Option<Council>, RepositoryError> {
        offline()
    }

    fn create(&self, _council: Council) -> Result<Council, RepositoryError> {
        offline()
    }

    fn update(&self, _council: Council) -> Result<(), RepositoryError> {
        offline()
    }
}

impl MembershipRepository for UnavailableStore {
    fn get_by_unit(&self, _unit_id: &UnitId) -> Result<Vec<Membership>, RepositoryError> {
        offline()
    }

    fn get_by_unit_and_category(
        &self,
        _unit_id: &UnitId,
        _category: ElectionCategory,
    ) -> Result<Vec<Membership>, RepositoryError> {
        offline()
    }

    fn get_by_employee_and_category(
        &self,
        _employee_id: &EmployeeId,
        _category: ElectionCategory,
    ) -> Result<Option<Membership>, RepositoryError> {
        offline()
    }

    fn get_by_employee(
        &self,
        _employee_id: &EmployeeId,
    ) -> Result<Vec<Membership>, RepositoryError> {
        offline()
    }

    fn add(&self, _membership: Membership) -> Result<Membership, RepositoryError> {
        offline()
    }

    fn bulk_add(&self, _memberships: Vec<Membership>) -> Result<Vec<Membership>, RepositoryError> {
        offline()
    }

    fn remove(&self, _id: &MembershipId) -> Result<Membership, RepositoryError> {
        offline()
    }

    fn bulk_remove_by_employees_and_category(
        &self,
        _employee_ids: &[EmployeeId],
        _category: ElectionCategory,
    ) -> Result<Vec<Membership>, RepositoryError> {
        offline()
    }

    fn update(&self, _membership: Membership) -> Result<(), RepositoryError> {
        offline()
    }
}

/// Council store that always loses the creation race: the unit has no council when read,
/// and creation reports the unique-unit violation.
pub(super) struct RacingCouncilStore;

impl CouncilRepository for RacingCouncilStore {
    fn get_by_unit(&self, _unit_id: &UnitId) -> Result<Option<Council>, RepositoryError> {
        Ok(None)
    }

    fn create(&self, _council: Council) -> Result<Council, RepositoryError> {
        Err(RepositoryError::Conflict)
    }

    fn update(&self, _council: Council) -> Result<(), RepositoryError> {
        Err(RepositoryError::NotFound)
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
