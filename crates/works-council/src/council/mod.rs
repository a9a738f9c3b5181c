//! Works-council membership management.
//!
//! Employees are seated in one of four election categories of the council that belongs to
//! their organizational unit. Councils are created on demand the first time a unit receives a
//! member, and each (unit, category) scope keeps a dense ascending ordering of its members.

pub mod category;
pub mod domain;
pub mod engine;
pub mod memory;
pub mod policy;
pub mod repository;
pub mod roster;
pub mod router;

#[cfg(test)]
mod tests;

pub use category::{CategoryError, ElectionCategory};
pub use domain::{
    Council, CouncilId, Employee, EmployeeId, EmployeeMemberships, EmployeeView, Membership,
    MembershipId, MembershipView, UnitId, POSITION_BASE,
};
pub use engine::{CouncilResolution, ErrorKind, MembershipEngine, MembershipError};
pub use memory::{InMemoryCouncilStore, InMemoryEmployeeDirectory};
pub use policy::{BulkAddPolicy, MembershipPolicy, ReorderPolicy};
pub use repository::{
    CouncilRepository, EmployeeDirectory, MembershipRepository, RepositoryError,
};
pub use roster::{EmployeeRoster, RosterImportError, RosterSummary};
pub use router::works_council_router;
