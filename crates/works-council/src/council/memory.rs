//! In-process stores backing the council and membership contracts.
//!
//! Councils and memberships share one lock so the uniqueness and referential checks observe a
//! consistent view, the same guarantee a transactional relational store gives per statement.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use super::category::ElectionCategory;
use super::domain::{Council, CouncilId, Employee, EmployeeId, Membership, MembershipId, UnitId};
use super::repository::{
    CouncilRepository, EmployeeDirectory, MembershipRepository, RepositoryError,
};

#[derive(Debug, Default)]
struct StoreState {
    councils: Vec<Council>,
    memberships: Vec<Membership>,
}

impl StoreState {
    fn council(&self, id: &CouncilId) -> Option<&Council> {
        self.councils.iter().find(|council| &council.id == id)
    }

    fn holds(&self, employee_id: &EmployeeId, category: ElectionCategory) -> bool {
        self.memberships.iter().any(|membership| {
            &membership.employee_id == employee_id && membership.category == category
        })
    }

    fn check_insert(&self, membership: &Membership) -> Result<(), RepositoryError> {
        match self.council(&membership.council_id) {
            Some(council) if council.unit_id == membership.unit_id => {}
            Some(council) => {
                return Err(RepositoryError::Integrity(format!(
                    "membership {} names unit {} but council {} belongs to unit {}",
                    membership.id, membership.unit_id, council.id, council.unit_id
                )))
            }
            None => {
                return Err(RepositoryError::Integrity(format!(
                    "membership {} references missing council {}",
                    membership.id, membership.council_id
                )))
            }
        }

        if self.holds(&membership.employee_id, membership.category)
            || self.memberships.iter().any(|existing| existing.id == membership.id)
        {
            return Err(RepositoryError::Conflict);
        }

        Ok(())
    }
}

/// Council and membership storage kept in memory.
#[derive(Debug, Default, Clone)]
pub struct InMemoryCouncilStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryCouncilStore {
    fn lock(&self) -> Result<MutexGuard<'_, StoreState>, RepositoryError> {
        self.state
            .lock()
            .map_err(|_| RepositoryError::Unavailable("council store lock poisoned".to_string()))
    }

    pub fn councils(&self) -> Result<Vec<Council>, RepositoryError> {
        Ok(self.lock()?.councils.clone())
    }

    pub fn memberships(&self) -> Result<Vec<Membership>, RepositoryError> {
        Ok(self.lock()?.memberships.clone())
    }

    /// Deletes a council together with every membership it owns, returning the removed
    /// memberships.
    pub fn delete_council(&self, id: &CouncilId) -> Result<Vec<Membership>, RepositoryError> {
        let mut state = self.lock()?;
        let index = state
            .councils
            .iter()
            .position(|council| &council.id == id)
            .ok_or(RepositoryError::NotFound)?;
        state.councils.remove(index);

        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut state.memberships)
            .into_iter()
            .partition(|membership| &membership.council_id == id);
        state.memberships = kept;
        Ok(removed)
    }
}

impl CouncilRepository for InMemoryCouncilStore {
    fn get_by_unit(&self, unit_id: &UnitId) -> Result<Option<Council>, RepositoryError> {
        let state = self.lock()?;
        Ok(state
            .councils
            .iter()
            .find(|council| &council.unit_id == unit_id)
            .cloned())
    }

    fn create(&self, council: Council) -> Result<Council, RepositoryError> {
        let mut state = self.lock()?;
        if state
            .councils
            .iter()
            .any(|existing| existing.unit_id == council.unit_id || existing.id == council.id)
        {
            return Err(RepositoryError::Conflict);
        }
        state.councils.push(council.clone());
        Ok(council)
    }

    fn update(&self, council: Council) -> Result<(), RepositoryError> {
        let mut state = self.lock()?;
        if state
            .councils
            .iter()
            .any(|existing| existing.unit_id == council.unit_id && existing.id != council.id)
        {
            return Err(RepositoryError::Conflict);
        }

        let slot = state
            .councils
            .iter_mut()
            .find(|existing| existing.id == council.id)
            .ok_or(RepositoryError::NotFound)?;
        let (council_id, unit_id) = (council.id, council.unit_id);
        *slot = council;

        // Memberships carry the unit denormalized; keep them in step with their council.
        for membership in state
            .memberships
            .iter_mut()
            .filter(|membership| membership.council_id == council_id)
        {
            membership.unit_id = unit_id;
        }
        Ok(())
    }
}

impl MembershipRepository for InMemoryCouncilStore {
    fn get_by_unit(&self, unit_id: &UnitId) -> Result<Vec<Membership>, RepositoryError> {
        let state = self.lock()?;
        Ok(state
            .memberships
            .iter()
            .filter(|membership| &membership.unit_id == unit_id)
            .cloned()
            .collect())
    }

    fn get_by_unit_and_category(
        &self,
        unit_id: &UnitId,
        category: ElectionCategory,
    ) -> Result<Vec<Membership>, RepositoryError> {
        let state = self.lock()?;
        Ok(state
            .memberships
            .iter()
            .filter(|membership| &membership.unit_id == unit_id && membership.category == category)
            .cloned()
            .collect())
    }

    fn get_by_employee_and_category(
        &self,
        employee_id: &EmployeeId,
        category: ElectionCategory,
    ) -> Result<Option<Membership>, RepositoryError> {
        let state = self.lock()?;
        Ok(state
            .memberships
            .iter()
            .find(|membership| {
                &membership.employee_id == employee_id && membership.category == category
            })
            .cloned())
    }

    fn get_by_employee(
        &self,
        employee_id: &EmployeeId,
    ) -> Result<Vec<Membership>, RepositoryError> {
        let state = self.lock()?;
        Ok(state
            .memberships
            .iter()
            .filter(|membership| &membership.employee_id == employee_id)
            .cloned()
            .collect())
    }

    fn add(&self, membership: Membership) -> Result<Membership, RepositoryError> {
        let mut state = self.lock()?;
        state.check_insert(&membership)?;
        state.memberships.push(membership.clone());
        Ok(membership)
    }

    fn bulk_add(&self, memberships: Vec<Membership>) -> Result<Vec<Membership>, RepositoryError> {
        let mut state = self.lock()?;
        let mut staged: HashSet<(EmployeeId, ElectionCategory)> = HashSet::new();
        for membership in &memberships {
            state.check_insert(membership)?;
            if !staged.insert((membership.employee_id, membership.category)) {
                return Err(RepositoryError::Conflict);
            }
        }
        state.memberships.extend(memberships.iter().cloned());
        Ok(memberships)
    }

    fn remove(&self, id: &MembershipId) -> Result<Membership, RepositoryError> {
        let mut state = self.lock()?;
        let index = state
            .memberships
            .iter()
            .position(|membership| &membership.id == id)
            .ok_or(RepositoryError::NotFound)?;
        Ok(state.memberships.remove(index))
    }

    fn bulk_remove_by_employees_and_category(
        &self,
        employee_ids: &[EmployeeId],
        category: ElectionCategory,
    ) -> Result<Vec<Membership>, RepositoryError> {
        let targets: HashSet<&EmployeeId> = employee_ids.iter().collect();
        let mut state = self.lock()?;
        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut state.memberships)
            .into_iter()
            .partition(|membership| {
                membership.category == category && targets.contains(&membership.employee_id)
            });
        state.memberships = kept;
        Ok(removed)
    }

    fn update(&self, membership: Membership) -> Result<(), RepositoryError> {
        let mut state = self.lock()?;
        let slot = state
            .memberships
            .iter_mut()
            .find(|existing| existing.id == membership.id)
            .ok_or(RepositoryError::NotFound)?;
        if slot.employee_id != membership.employee_id
            || slot.category != membership.category
            || slot.council_id != membership.council_id
        {
            return Err(RepositoryError::Integrity(format!(
                "membership {} may only change its position",
                membership.id
            )));
        }
        *slot = membership;
        Ok(())
    }
}

/// Employee directory seeded from a roster import or directly by tests.
#[derive(Debug, Default, Clone)]
pub struct InMemoryEmployeeDirectory {
    employees: Arc<Mutex<HashMap<EmployeeId, Employee>>>,
}

impl InMemoryEmployeeDirectory {
    pub fn from_employees(employees: impl IntoIterator<Item = Employee>) -> Self {
        let directory = Self::default();
        if let Ok(mut guard) = directory.employees.lock() {
            guard.extend(employees.into_iter().map(|employee| (employee.id, employee)));
        }
        directory
    }

    pub fn insert(&self, employee: Employee) -> Result<(), RepositoryError> {
        let mut guard = self.lock()?;
        guard.insert(employee.id, employee);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.lock().map(|guard| guard.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<EmployeeId, Employee>>, RepositoryError> {
        self.employees
            .lock()
            .map_err(|_| RepositoryError::Unavailable("employee directory lock poisoned".to_string()))
    }
}

impl EmployeeDirectory for InMemoryEmployeeDirectory {
    fn get_by_id(&self, id: &EmployeeId) -> Result<Option<Employee>, RepositoryError> {
        Ok(self.lock()?.get(id).cloned())
    }

    fn get_all(&self) -> Result<Vec<Employee>, RepositoryError> {
        Ok(self.lock()?.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn seeded_store() -> (InMemoryCouncilStore, Council) {
        let store = InMemoryCouncilStore::default();
        let council = store
            .create(Council::new(UnitId::new(), Utc::now()))
            .expect("council stored");
        (store, council)
    }

    #[test]
    fn create_rejects_second_council_for_unit() {
        let (store, council) = seeded_store();
        let duplicate = Council::new(council.unit_id, Utc::now());
        assert_eq!(store.create(duplicate), Err(RepositoryError::Conflict));
        assert_eq!(store.councils().expect("readable").len(), 1);
    }

    #[test]
    fn add_rejects_duplicate_employee_category() {
        let (store, council) = seeded_store();
        let employee = EmployeeId::new();
        store
            .add(Membership::new(&council, employee, ElectionCategory::Workers, 0, Utc::now()))
            .expect("first membership stored");

        let second =
            Membership::new(&council, employee, ElectionCategory::Workers, 1, Utc::now());
        assert_eq!(store.add(second), Err(RepositoryError::Conflict));

        let other_category =
            Membership::new(&council, employee, ElectionCategory::Clerks, 0, Utc::now());
        store.add(other_category).expect("other category allowed");
    }

    #[test]
    fn add_requires_existing_council() {
        let store = InMemoryCouncilStore::default();
        let orphan_council = Council::new(UnitId::new(), Utc::now());
        let orphan = Membership::new(
            &orphan_council,
            EmployeeId::new(),
            ElectionCategory::Clerks,
            0,
            Utc::now(),
        );
        assert!(matches!(store.add(orphan), Err(RepositoryError::Integrity(_))));
    }

    #[test]
    fn bulk_add_is_all_or_nothing() {
        let (store, council) = seeded_store();
        let employee = EmployeeId::new();
        let batch = vec![
            Membership::new(&council, EmployeeId::new(), ElectionCategory::Clerks, 0, Utc::now()),
            Membership::new(&council, employee, ElectionCategory::Clerks, 1, Utc::now()),
            Membership::new(&council, employee, ElectionCategory::Clerks, 2, Utc::now()),
        ];

        assert_eq!(store.bulk_add(batch), Err(RepositoryError::Conflict));
        assert!(store.memberships().expect("readable").is_empty());
    }

    #[test]
    fn delete_council_cascades_to_memberships() {
        let (store, council) = seeded_store();
        let other_council = store
            .create(Council::new(UnitId::new(), Utc::now()))
            .expect("second council");
        store
            .add(Membership::new(
                &council,
                EmployeeId::new(),
                ElectionCategory::Workers,
                0,
                Utc::now(),
            ))
            .expect("stored");
        store
            .add(Membership::new(
                &other_council,
                EmployeeId::new(),
                ElectionCategory::Workers,
                0,
                Utc::now(),
            ))
            .expect("stored");

        let removed = store.delete_council(&council.id).expect("council deleted");
        assert_eq!(removed.len(), 1);
        let remaining = store.memberships().expect("readable");
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].council_id, other_council.id);
        assert_eq!(
            store.delete_council(&council.id),
            Err(RepositoryError::NotFound)
        );
    }

    #[test]
    fn update_moves_denormalized_unit_with_council() {
        let (store, mut council) = seeded_store();
        store
            .add(Membership::new(
                &council,
                EmployeeId::new(),
                ElectionCategory::Management,
                0,
                Utc::now(),
            ))
            .expect("stored");

        let new_unit = UnitId::new();
        council.unit_id = new_unit;
        council.updated_at = Utc::now();
        CouncilRepository::update(&store, council.clone()).expect("council updated");

        let moved = MembershipRepository::get_by_unit(&store, &new_unit).expect("readable");
        assert_eq!(moved.len(), 1);
        assert_eq!(
            CouncilRepository::get_by_unit(&store, &new_unit).expect("readable"),
            Some(council)
        );
    }
}
