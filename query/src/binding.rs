//! Row-to-record decoding plans.

use std::collections::HashMap;
use tessera_core::{AttributeRef, HolderId};
use tessera_registry::TableId;
use tessera_sql::ColumnRef;

/// One selected attribute column.
#[derive(Debug, Clone, PartialEq)]
pub struct AliasBinding {
    pub attribute: AttributeRef,
    pub column: ColumnRef,
    /// Result alias.
    pub alias: String,
    /// A reference whose target was not joined.
    pub lazy: bool,
}

/// How one slice of a row maps to one record of a concrete type.
#[derive(Debug, Clone, PartialEq)]
pub struct MappingBinding {
    /// Concrete type of the decoded record.
    pub holder: HolderId,
    pub table: TableId,
    pub primary_key_column: ColumnRef,
    /// Result alias of the primary key.
    pub primary_key: String,
    pub attributes: Vec<AliasBinding>,
    /// One binding per concrete table reachable through a joined reference.
    pub references: HashMap<AttributeRef, Vec<MappingBinding>>,
    /// Primary-key aliases of the join tables passed on the way to this
    /// table, outermost first.
    pub join_keys: Vec<(HolderId, String)>,
}

impl MappingBinding {
    pub fn attribute(&self, attr: AttributeRef) -> Option<&AliasBinding> {
        self.attributes.iter().find(|a| a.attribute == attr)
    }

    /// Bindings of a joined reference target; empty when it was not joined.
    pub fn nested(&self, attr: AttributeRef) -> &[MappingBinding] {
        self.references.get(&attr).map(Vec::as_slice).unwrap_or(&[])
    }
}
