/// How bulk-add treats identifiers that do not resolve to an employee of the unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BulkAddPolicy {
    /// Omit unresolved identifiers and seat the rest.
    #[default]
    SkipUnresolved,
    /// Fail the whole batch on the first unresolved identifier, before any write.
    Strict,
}

/// How reorder treats existing members missing from the supplied ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReorderPolicy {
    /// Unlisted members follow the listed ones in their previous relative order.
    #[default]
    AppendUnlisted,
    /// The ordering must mention every existing member of the scope.
    RejectUnlisted,
}

/// Tunable membership rules handed to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MembershipPolicy {
    pub bulk_add: BulkAddPolicy,
    pub reorder: ReorderPolicy,
}
