use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::category::ElectionCategory;

/// First position handed out in every (unit, category) scope.
pub const POSITION_BASE: u32 = 0;

macro_rules! identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<Uuid> for $name {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }
    };
}

identifier!(
    /// Organizational unit owning a council.
    UnitId
);
identifier!(
    /// Employee referenced by memberships.
    EmployeeId
);
identifier!(CouncilId);
identifier!(MembershipId);

/// Employee as exposed by the employee directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub id: EmployeeId,
    pub unit_id: UnitId,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
}

impl Employee {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    pub fn view(&self) -> EmployeeView {
        EmployeeView {
            id: self.id,
            unit_id: self.unit_id,
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            full_name: self.full_name(),
            email: self.email.clone(),
        }
    }
}

/// Employee projection embedded in membership responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeView {
    pub id: EmployeeId,
    pub unit_id: UnitId,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Works-council body of one organizational unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Council {
    pub id: CouncilId,
    pub unit_id: UnitId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Council {
    pub fn new(unit_id: UnitId, now: DateTime<Utc>) -> Self {
        Self {
            id: CouncilId::new(),
            unit_id,
            created_at: now,
            updated_at: now,
        }
    }
}

/// One employee's seat in one category of one council.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Membership {
    pub id: MembershipId,
    pub council_id: CouncilId,
    pub unit_id: UnitId,
    pub employee_id: EmployeeId,
    pub category: ElectionCategory,
    pub position: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Membership {
    pub fn new(
        council: &Council,
        employee_id: EmployeeId,
        category: ElectionCategory,
        position: u32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: MembershipId::new(),
            council_id: council.id,
            unit_id: council.unit_id,
            employee_id,
            category,
            position,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Sorts memberships by category then position. The sort is stable so memberships sharing a
/// position keep their insertion order.
pub fn sort_memberships(memberships: &mut [Membership]) {
    memberships.sort_by_key(|membership| (membership.category, membership.position));
}

/// Membership paired with the employee it seats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MembershipView {
    #[serde(flatten)]
    pub membership: Membership,
    pub employee: EmployeeView,
}

/// Every membership currently held by one employee, across all categories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeMemberships {
    pub employee: EmployeeView,
    pub memberships: Vec<Membership>,
}

impl EmployeeMemberships {
    pub fn categories(&self) -> Vec<ElectionCategory> {
        self.memberships
            .iter()
            .map(|membership| membership.category)
            .collect()
    }
}
