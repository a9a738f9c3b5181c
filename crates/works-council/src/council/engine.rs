//! Membership engine: add, remove, bulk operations, reorder and listing.
//!
//! Every mutating operation resolves the unit's council first, re-reads the affected
//! (unit, category) scope and derives the next position from that fresh read. Nothing is
//! cached between operations.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::category::{CategoryError, ElectionCategory};
use super::domain::{
    sort_memberships, Council, Employee, EmployeeId, EmployeeMemberships, Membership,
    MembershipView, UnitId, POSITION_BASE,
};
use super::policy::{BulkAddPolicy, MembershipPolicy, ReorderPolicy};
use super::repository::{
    CouncilRepository, EmployeeDirectory, MembershipRepository, RepositoryError,
};

/// Outcome of looking up the council of a unit, creating it when missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CouncilResolution {
    Found(Council),
    Created(Council),
}

impl CouncilResolution {
    pub fn council(&self) -> &Council {
        match self {
            CouncilResolution::Found(council) | CouncilResolution::Created(council) => council,
        }
    }

    pub fn into_council(self) -> Council {
        match self {
            CouncilResolution::Found(council) | CouncilResolution::Created(council) => council,
        }
    }

    pub fn was_created(&self) -> bool {
        matches!(self, CouncilResolution::Created(_))
    }
}

/// Coarse classification callers branch on instead of matching every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Invalid,
    NotFound,
    Conflict,
    Cancelled,
    Storage,
}

/// Error raised by membership operations.
#[derive(Debug, thiserror::Error)]
pub enum MembershipError {
    #[error(transparent)]
    InvalidCategory(#[from] CategoryError),
    #[error("invalid ordering: {0}")]
    InvalidOrdering(String),
    #[error("employee {0} not found")]
    EmployeeNotFound(EmployeeId),
    #[error("employee {employee_id} does not belong to unit {unit_id}")]
    EmployeeOutsideUnit {
        employee_id: EmployeeId,
        unit_id: UnitId,
    },
    #[error("employee {employee_id} is not a member of the {category} category")]
    MembershipNotFound {
        employee_id: EmployeeId,
        category: ElectionCategory,
    },
    #[error("employee {employee_id} is already a member of the {category} category")]
    DuplicateMembership {
        employee_id: EmployeeId,
        category: ElectionCategory,
    },
    #[error("council for unit {0} was created by a concurrent request")]
    CouncilConflict(UnitId),
    #[error("operation cancelled")]
    Cancelled,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl MembershipError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MembershipError::InvalidCategory(_)
            | MembershipError::InvalidOrdering(_)
            | MembershipError::EmployeeOutsideUnit { .. } => ErrorKind::Invalid,
            MembershipError::EmployeeNotFound(_) | MembershipError::MembershipNotFound { .. } => {
                ErrorKind::NotFound
            }
            MembershipError::DuplicateMembership { .. } | MembershipError::CouncilConflict(_) => {
                ErrorKind::Conflict
            }
            MembershipError::Cancelled => ErrorKind::Cancelled,
            MembershipError::Repository(RepositoryError::Conflict) => ErrorKind::Conflict,
            MembershipError::Repository(_) => ErrorKind::Storage,
        }
    }
}

/// Engine composing the council store, membership store and employee directory.
pub struct MembershipEngine<C, M, E> {
    councils: Arc<C>,
    memberships: Arc<M>,
    employees: Arc<E>,
    policy: MembershipPolicy,
}

fn checkpoint(cancel: &CancellationToken) -> Result<(), MembershipError> {
    if cancel.is_cancelled() {
        Err(MembershipError::Cancelled)
    } else {
        Ok(())
    }
}

/// Next free slot after the highest position in the scope.
fn next_position(scope: &[Membership]) -> u32 {
    scope
        .iter()
        .map(|membership| membership.position + 1)
        .max()
        .unwrap_or(POSITION_BASE)
}

fn dedup_ids(ids: &[EmployeeId]) -> Vec<EmployeeId> {
    let mut seen = HashSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

impl<C, M, E> MembershipEngine<C, M, E>
where
    C: CouncilRepository + 'static,
    M: MembershipRepository + 'static,
    E: EmployeeDirectory + 'static,
{
    pub fn new(councils: Arc<C>, memberships: Arc<M>, employees: Arc<E>) -> Self {
        Self {
            councils,
            memberships,
            employees,
            policy: MembershipPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: MembershipPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> MembershipPolicy {
        self.policy
    }

    /// Look up the council of `unit_id`, creating and persisting it when the unit has none.
    ///
    /// A concurrent creation for the same unit loses on the store's unit uniqueness and is
    /// reported as [`MembershipError::CouncilConflict`].
    pub fn resolve_council(
        &self,
        unit_id: &UnitId,
        cancel: &CancellationToken,
    ) -> Result<CouncilResolution, MembershipError> {
        checkpoint(cancel)?;
        if let Some(council) = self.councils.get_by_unit(unit_id)? {
            return Ok(CouncilResolution::Found(council));
        }

        checkpoint(cancel)?;
        let council = self
            .councils
            .create(Council::new(*unit_id, Utc::now()))
            .map_err(|err| match err {
                RepositoryError::Conflict => MembershipError::CouncilConflict(*unit_id),
                other => MembershipError::Repository(other),
            })?;
        info!(unit_id = %unit_id, council_id = %council.id, "works council created");
        Ok(CouncilResolution::Created(council))
    }

    /// Seat one employee at the end of a category and return the whole scope in order.
    pub fn add_member(
        &self,
        unit_id: &UnitId,
        employee_id: &EmployeeId,
        category: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<MembershipView>, MembershipError> {
        let category = ElectionCategory::parse(category)?;
        let employee = self.require_employee(employee_id, cancel)?;
        if employee.unit_id != *unit_id {
            return Err(MembershipError::EmployeeOutsideUnit {
                employee_id: *employee_id,
                unit_id: *unit_id,
            });
        }

        let council = self
            .resolve_council(&employee.unit_id, cancel)?
            .into_council();

        checkpoint(cancel)?;
        let mut scope = self
            .memberships
            .get_by_unit_and_category(&council.unit_id, category)?;
        if scope
            .iter()
            .any(|membership| membership.employee_id == *employee_id)
        {
            return Err(MembershipError::DuplicateMembership {
                employee_id: *employee_id,
                category,
            });
        }

        let position = next_position(&scope);
        let membership = Membership::new(&council, *employee_id, category, position, Utc::now());

        checkpoint(cancel)?;
        let stored = self
            .memberships
            .add(membership)
            .map_err(|err| match err {
                RepositoryError::Conflict => MembershipError::DuplicateMembership {
                    employee_id: *employee_id,
                    category,
                },
                other => MembershipError::Repository(other),
            })?;
        info!(
            unit_id = %council.unit_id,
            employee_id = %employee_id,
            %category,
            position,
            "member added"
        );

        scope.push(stored);
        sort_memberships(&mut scope);
        self.project(scope, cancel)
    }

    /// Delete an employee's membership in a category. Remaining positions are left untouched.
    pub fn remove_member(
        &self,
        unit_id: &UnitId,
        employee_id: &EmployeeId,
        category: &str,
        cancel: &CancellationToken,
    ) -> Result<Membership, MembershipError> {
        let category = ElectionCategory::parse(category)?;
        let not_found = || MembershipError::MembershipNotFound {
            employee_id: *employee_id,
            category,
        };

        checkpoint(cancel)?;
        let existing = self
            .memberships
            .get_by_employee_and_category(employee_id, category)?
            .filter(|membership| membership.unit_id == *unit_id)
            .ok_or_else(not_found)?;

        checkpoint(cancel)?;
        let removed = self
            .memberships
            .remove(&existing.id)
            .map_err(|err| match err {
                RepositoryError::NotFound => not_found(),
                other => MembershipError::Repository(other),
            })?;
        info!(
            unit_id = %unit_id,
            employee_id = %employee_id,
            %category,
            position = removed.position,
            "member removed"
        );
        Ok(removed)
    }

    /// Seat several employees in one category, appending new members in input order.
    ///
    /// Returns the complete membership set of every input employee that resolved.
    pub fn bulk_add_members(
        &self,
        unit_id: &UnitId,
        employee_ids: &[EmployeeId],
        category: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<EmployeeMemberships>, MembershipError> {
        let category = ElectionCategory::parse(category)?;
        if employee_ids.is_empty() {
            return Ok(Vec::new());
        }

        let resolved = self.resolve_unit_employees(unit_id, employee_ids, cancel)?;
        let council = self.resolve_council(unit_id, cancel)?.into_council();

        checkpoint(cancel)?;
        let scope = self
            .memberships
            .get_by_unit_and_category(unit_id, category)?;
        let held: HashSet<EmployeeId> = scope
            .iter()
            .map(|membership| membership.employee_id)
            .collect();

        let now = Utc::now();
        let mut position = next_position(&scope);
        let mut staged = Vec::new();
        for employee in resolved.iter().filter(|employee| !held.contains(&employee.id)) {
            staged.push(Membership::new(&council, employee.id, category, position, now));
            position += 1;
        }

        let added = staged.len();
        if !staged.is_empty() {
            checkpoint(cancel)?;
            self.memberships.bulk_add(staged)?;
        }
        info!(
            unit_id = %unit_id,
            %category,
            requested = employee_ids.len(),
            resolved = resolved.len(),
            added,
            "bulk add applied"
        );

        self.employee_memberships(&resolved, cancel)
    }

    /// Remove several employees from one category.
    ///
    /// Identifiers without a membership are ignored. Returns the remaining membership sets of
    /// the input employees that resolve, mirroring [`Self::bulk_add_members`].
    pub fn bulk_remove_members(
        &self,
        unit_id: &UnitId,
        employee_ids: &[EmployeeId],
        category: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<EmployeeMemberships>, MembershipError> {
        let category = ElectionCategory::parse(category)?;
        if employee_ids.is_empty() {
            return Ok(Vec::new());
        }

        let requested = dedup_ids(employee_ids);
        checkpoint(cancel)?;
        let in_scope: HashSet<EmployeeId> = self
            .memberships
            .get_by_unit_and_category(unit_id, category)?
            .into_iter()
            .map(|membership| membership.employee_id)
            .collect();
        let targets: Vec<EmployeeId> = requested
            .iter()
            .copied()
            .filter(|id| in_scope.contains(id))
            .collect();

        let removed = if targets.is_empty() {
            Vec::new()
        } else {
            checkpoint(cancel)?;
            self.memberships
                .bulk_remove_by_employees_and_category(&targets, category)?
        };
        info!(
            unit_id = %unit_id,
            %category,
            requested = requested.len(),
            removed = removed.len(),
            "bulk remove applied"
        );

        let mut affected = Vec::new();
        for id in &requested {
            checkpoint(cancel)?;
            match self.employees.get_by_id(id)? {
                Some(employee) if employee.unit_id == *unit_id => affected.push(employee),
                _ => debug!(employee_id = %id, "bulk remove skipped unresolved employee"),
            }
        }
        self.employee_memberships(&affected, cancel)
    }

    /// Rewrite the positions of a category so listed employees come first, in the given order.
    ///
    /// Identifiers without a membership in the scope are ignored. Members missing from the
    /// ordering follow in their previous relative order, unless the policy rejects that.
    pub fn reorder_members(
        &self,
        unit_id: &UnitId,
        category: &str,
        ordered_ids: &[EmployeeId],
        cancel: &CancellationToken,
    ) -> Result<Vec<MembershipView>, MembershipError> {
        let category = ElectionCategory::parse(category)?;
        let mut seen = HashSet::new();
        if let Some(repeated) = ordered_ids.iter().find(|id| !seen.insert(**id)) {
            return Err(MembershipError::InvalidOrdering(format!(
                "employee {repeated} is listed more than once"
            )));
        }

        checkpoint(cancel)?;
        let mut scope = self
            .memberships
            .get_by_unit_and_category(unit_id, category)?;
        if scope.is_empty() {
            return Ok(Vec::new());
        }
        sort_memberships(&mut scope);

        let mut slots: Vec<Option<Membership>> = scope.into_iter().map(Some).collect();
        let index: HashMap<EmployeeId, usize> = slots
            .iter()
            .enumerate()
            .filter_map(|(idx, slot)| slot.as_ref().map(|m| (m.employee_id, idx)))
            .collect();

        let mut sequence = Vec::with_capacity(slots.len());
        for id in ordered_ids {
            match index.get(id).and_then(|idx| slots[*idx].take()) {
                Some(membership) => sequence.push(membership),
                None => debug!(employee_id = %id, "reorder ignored employee outside scope"),
            }
        }

        let unlisted: Vec<Membership> = slots.into_iter().flatten().collect();
        if !unlisted.is_empty() && self.policy.reorder == ReorderPolicy::RejectUnlisted {
            return Err(MembershipError::InvalidOrdering(format!(
                "{} existing member(s) missing from the ordering",
                unlisted.len()
            )));
        }
        sequence.extend(unlisted);

        let now = Utc::now();
        let mut changed = 0usize;
        for (offset, membership) in sequence.iter_mut().enumerate() {
            let position = POSITION_BASE + offset as u32;
            if membership.position == position {
                continue;
            }
            membership.position = position;
            membership.updated_at = now;
            checkpoint(cancel)?;
            self.memberships.update(membership.clone())?;
            changed += 1;
        }
        info!(
            unit_id = %unit_id,
            %category,
            members = sequence.len(),
            changed,
            "members reordered"
        );

        self.project(sequence, cancel)
    }

    /// List a unit's memberships ordered by category then position. Never creates a council.
    pub fn list_members(
        &self,
        unit_id: &UnitId,
        category: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Vec<MembershipView>, MembershipError> {
        let category = category.map(ElectionCategory::parse).transpose()?;

        checkpoint(cancel)?;
        let mut memberships = match category {
            Some(category) => self
                .memberships
                .get_by_unit_and_category(unit_id, category)?,
            None => self.memberships.get_by_unit(unit_id)?,
        };
        sort_memberships(&mut memberships);
        self.project(memberships, cancel)
    }

    fn require_employee(
        &self,
        employee_id: &EmployeeId,
        cancel: &CancellationToken,
    ) -> Result<Employee, MembershipError> {
        checkpoint(cancel)?;
        self.employees
            .get_by_id(employee_id)?
            .ok_or(MembershipError::EmployeeNotFound(*employee_id))
    }

    /// Resolve identifiers against the directory, keeping input order and first occurrences.
    fn resolve_unit_employees(
        &self,
        unit_id: &UnitId,
        employee_ids: &[EmployeeId],
        cancel: &CancellationToken,
    ) -> Result<Vec<Employee>, MembershipError> {
        checkpoint(cancel)?;
        let mut directory: HashMap<EmployeeId, Employee> = self
            .employees
            .get_all()?
            .into_iter()
            .filter(|employee| employee.unit_id == *unit_id)
            .map(|employee| (employee.id, employee))
            .collect();

        let mut resolved = Vec::new();
        for id in dedup_ids(employee_ids) {
            match directory.remove(&id) {
                Some(employee) => resolved.push(employee),
                None if self.policy.bulk_add == BulkAddPolicy::Strict => {
                    return Err(MembershipError::EmployeeNotFound(id));
                }
                None => warn!(unit_id = %unit_id, employee_id = %id, "bulk add skipped unresolved employee"),
            }
        }
        Ok(resolved)
    }

    fn employee_memberships(
        &self,
        employees: &[Employee],
        cancel: &CancellationToken,
    ) -> Result<Vec<EmployeeMemberships>, MembershipError> {
        let mut result = Vec::with_capacity(employees.len());
        for employee in employees {
            checkpoint(cancel)?;
            let mut memberships = self.memberships.get_by_employee(&employee.id)?;
            sort_memberships(&mut memberships);
            result.push(EmployeeMemberships {
                employee: employee.view(),
                memberships,
            });
        }
        Ok(result)
    }

    fn project(
        &self,
        memberships: Vec<Membership>,
        cancel: &CancellationToken,
    ) -> Result<Vec<MembershipView>, MembershipError> {
        let mut views = Vec::with_capacity(memberships.len());
        for membership in memberships {
            checkpoint(cancel)?;
            match self.employees.get_by_id(&membership.employee_id)? {
                Some(employee) => views.push(MembershipView {
                    employee: employee.view(),
                    membership,
                }),
                None => warn!(
                    membership_id = %membership.id,
                    employee_id = %membership.employee_id,
                    "membership references an employee missing from the directory"
                ),
            }
        }
        Ok(views)
    }
}
