use std::collections::{BTreeMap, HashSet};
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use super::domain::{Employee, EmployeeId, UnitId};
use super::memory::InMemoryEmployeeDirectory;

#[derive(Debug)]
pub enum RosterImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    InvalidIdentifier {
        line: u64,
        column: &'static str,
        value: String,
    },
    DuplicateEmployee {
        line: u64,
        id: EmployeeId,
    },
}

impl std::fmt::Display for RosterImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RosterImportError::Io(err) => write!(f, "failed to read employee roster: {}", err),
            RosterImportError::Csv(err) => write!(f, "invalid employee roster CSV: {}", err),
            RosterImportError::InvalidIdentifier {
                line,
                column,
                value,
            } => write!(f, "line {line}: '{value}' in column '{column}' is not a UUID"),
            RosterImportError::DuplicateEmployee { line, id } => {
                write!(f, "line {line}: employee {id} is listed more than once")
            }
        }
    }
}

impl std::error::Error for RosterImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RosterImportError::Io(err) => Some(err),
            RosterImportError::Csv(err) => Some(err),
            RosterImportError::InvalidIdentifier { .. }
            | RosterImportError::DuplicateEmployee { .. } => None,
        }
    }
}

impl From<std::io::Error> for RosterImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for RosterImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

/// Employees parsed from an HR roster export.
#[derive(Debug, Clone, Default)]
pub struct EmployeeRoster {
    employees: Vec<Employee>,
}

/// Headcount per unit, as printed by the roster check command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterSummary {
    pub total_employees: usize,
    pub employees_per_unit: BTreeMap<UnitId, usize>,
}

impl EmployeeRoster {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, RosterImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, RosterImportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut employees = Vec::new();
        let mut seen = HashSet::new();

        for (index, record) in csv_reader.deserialize::<RosterRow>().enumerate() {
            let row = record?;
            // Header occupies line 1.
            let line = index as u64 + 2;
            let id = EmployeeId(parse_uuid(&row.employee_id, line, "Employee ID")?);
            let unit_id = UnitId(parse_uuid(&row.unit_id, line, "Unit ID")?);

            if !seen.insert(id) {
                return Err(RosterImportError::DuplicateEmployee { line, id });
            }

            employees.push(Employee {
                id,
                unit_id,
                first_name: row.first_name,
                last_name: row.last_name,
                email: row.email,
            });
        }

        tracing::debug!(employees = employees.len(), "employee roster parsed");
        Ok(Self { employees })
    }

    pub fn employees(&self) -> &[Employee] {
        &self.employees
    }

    pub fn summary(&self) -> RosterSummary {
        let mut employees_per_unit = BTreeMap::new();
        for employee in &self.employees {
            *employees_per_unit.entry(employee.unit_id).or_insert(0) += 1;
        }
        RosterSummary {
            total_employees: self.employees.len(),
            employees_per_unit,
        }
    }

    pub fn into_directory(self) -> InMemoryEmployeeDirectory {
        InMemoryEmployeeDirectory::from_employees(self.employees)
    }
}

#[derive(Debug, Deserialize)]
struct RosterRow {
    #[serde(rename = "Employee ID")]
    employee_id: String,
    #[serde(rename = "Unit ID")]
    unit_id: String,
    #[serde(rename = "First Name")]
    first_name: String,
    #[serde(rename = "Last Name")]
    last_name: String,
    #[serde(rename = "Email", default, deserialize_with = "empty_string_as_none")]
    email: Option<String>,
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

fn parse_uuid(value: &str, line: u64, column: &'static str) -> Result<Uuid, RosterImportError> {
    Uuid::parse_str(value.trim()).map_err(|_| RosterImportError::InvalidIdentifier {
        line,
        column,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::council::repository::EmployeeDirectory;

    const UNIT_A: &str = "6f1c2d3e-0000-4000-8000-00000000000a";
    const UNIT_B: &str = "6f1c2d3e-0000-4000-8000-00000000000b";

    #[test]
    fn parses_roster_and_summarizes_units() {
        let csv = format!(
            "Employee ID,Unit ID,First Name,Last Name,Email\n\
1b4e28ba-2fa1-41d2-883f-0016d3cca427,{UNIT_A},Lotte,Peeters,lotte@example.be\n\
2c5f39cb-3fb2-42e3-994f-0027e4ddb538, {UNIT_A} ,Jonas,Maes,\n\
3d6a4adc-4ac3-43f4-a05a-0038f5eec649,{UNIT_B},Emma,Claes,emma@example.be\n"
        );

        let roster = EmployeeRoster::from_reader(csv.as_bytes()).expect("roster parses");
        assert_eq!(roster.employees().len(), 3);
        assert_eq!(roster.employees()[1].email, None);
        assert_eq!(roster.employees()[1].full_name(), "Jonas Maes");

        let summary = roster.summary();
        assert_eq!(summary.total_employees, 3);
        let unit_a = UnitId(Uuid::parse_str(UNIT_A).expect("valid uuid"));
        assert_eq!(summary.employees_per_unit.get(&unit_a), Some(&2));

        let first = roster.employees()[0].id;
        let directory = roster.into_directory();
        assert_eq!(directory.len(), 3);
        let found = directory
            .get_by_id(&first)
            .expect("lookup succeeds")
            .expect("employee present");
        assert_eq!(found.first_name, "Lotte");
    }

    #[test]
    fn rejects_malformed_identifier_with_line_number() {
        let csv = format!(
            "Employee ID,Unit ID,First Name,Last Name,Email\n\
not-a-uuid,{UNIT_A},Lotte,Peeters,\n"
        );

        match EmployeeRoster::from_reader(csv.as_bytes()) {
            Err(RosterImportError::InvalidIdentifier { line, column, .. }) => {
                assert_eq!(line, 2);
                assert_eq!(column, "Employee ID");
            }
            other => panic!("expected invalid identifier, got {other:?}"),
        }
    }

    #[test]
    fn rejects_duplicate_employee_rows() {
        let csv = format!(
            "Employee ID,Unit ID,First Name,Last Name,Email\n\
1b4e28ba-2fa1-41d2-883f-0016d3cca427,{UNIT_A},Lotte,Peeters,\n\
1b4e28ba-2fa1-41d2-883f-0016d3cca427,{UNIT_B},Lotte,Peeters,\n"
        );

        assert!(matches!(
            EmployeeRoster::from_reader(csv.as_bytes()),
            Err(RosterImportError::DuplicateEmployee { line: 3, .. })
        ));
    }
}
