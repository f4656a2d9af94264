//! Collection and index layout of the local store.

use redb::TableDefinition;

/// Named record collections held by the local store.
///
/// Each maps to one redb table (JSON bytes keyed by record id) plus one
/// table per secondary index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Products,
    Sales,
    Clients,
    Shifts,
    CashMovements,
    /// Kardex: stock movements per product
    Movements,
    Categories,
    Brands,
    Suppliers,
    Users,
    Config,
}

impl Collection {
    pub const ALL: [Collection; 11] = [
        Collection::Products,
        Collection::Sales,
        Collection::Clients,
        Collection::Shifts,
        Collection::CashMovements,
        Collection::Movements,
        Collection::Categories,
        Collection::Brands,
        Collection::Suppliers,
        Collection::Users,
        Collection::Config,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Collection::Products => "products",
            Collection::Sales => "sales",
            Collection::Clients => "clients",
            Collection::Shifts => "shifts",
            Collection::CashMovements => "cash_movements",
            Collection::Movements => "movements",
            Collection::Categories => "categories",
            Collection::Brands => "brands",
            Collection::Suppliers => "suppliers",
            Collection::Users => "users",
            Collection::Config => "config",
        }
    }

    /// JSON fields carrying a secondary index.
    pub fn indexes(self) -> &'static [&'static str] {
        match self {
            Collection::Shifts => &["status"],
            Collection::CashMovements => &["shiftId", "date"],
            Collection::Sales => &["date"],
            Collection::Movements => &["date", "productId"],
            _ => &[],
        }
    }

    pub(crate) fn table(self) -> TableDefinition<'static, &'static str, &'static [u8]> {
        TableDefinition::new(self.name())
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Index tables are keyed `(field value, record id)` so one value maps to
/// many records and range scans stay ordered by value.
pub(crate) fn index_table_name(collection: Collection, field: &str) -> String {
    format!("idx_{}_{}", collection.name(), field)
}

pub(crate) fn index_table<'a>(
    name: &'a str,
) -> TableDefinition<'a, (&'static str, &'static str), ()> {
    TableDefinition::new(name)
}
