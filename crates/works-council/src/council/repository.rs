use super::category::ElectionCategory;
use super::domain::{Council, Employee, EmployeeId, Membership, MembershipId, UnitId};

/// Read-only lookup into the employee records owned by the HR side of the backend.
pub trait EmployeeDirectory: Send + Sync {
    fn get_by_id(&self, id: &EmployeeId) -> Result<Option<Employee>, RepositoryError>;
    fn get_all(&self) -> Result<Vec<Employee>, RepositoryError>;
}

/// Storage abstraction for council records, keyed by unit.
///
/// Implementations must reject a second council for the same unit with
/// [`RepositoryError::Conflict`].
pub trait CouncilRepository: Send + Sync {
    fn get_by_unit(&self, unit_id: &UnitId) -> Result<Option<Council>, RepositoryError>;
    fn create(&self, council: Council) -> Result<Council, RepositoryError>;
    fn update(&self, council: Council) -> Result<(), RepositoryError>;
}

/// Storage abstraction for memberships.
///
/// Implementations must reject a second membership for the same (employee, category) pair
/// with [`RepositoryError::Conflict`] and return memberships in insertion order.
pub trait MembershipRepository: Send + Sync {
    fn get_by_unit(&self, unit_id: &UnitId) -> Result<Vec<Membership>, RepositoryError>;
    fn get_by_unit_and_category(
        &self,
        unit_id: &UnitId,
        category: ElectionCategory,
    ) -> Result<Vec<Membership>, RepositoryError>;
    fn get_by_employee_and_category(
        &self,
        employee_id: &EmployeeId,
        category: ElectionCategory,
    ) -> Result<Option<Membership>, RepositoryError>;
    fn get_by_employee(&self, employee_id: &EmployeeId)
        -> Result<Vec<Membership>, RepositoryError>;
    fn add(&self, membership: Membership) -> Result<Membership, RepositoryError>;
    /// Writes every membership or none of them.
    fn bulk_add(&self, memberships: Vec<Membership>) -> Result<Vec<Membership>, RepositoryError>;
    fn remove(&self, id: &MembershipId) -> Result<Membership, RepositoryError>;
    fn bulk_remove_by_employees_and_category(
        &self,
        employee_ids: &[EmployeeId],
        category: ElectionCategory,
    ) -> Result<Vec<Membership>, RepositoryError>;
    fn update(&self, membership: Membership) -> Result<(), RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("referential integrity violated: {0}")]
    Integrity(String),
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
