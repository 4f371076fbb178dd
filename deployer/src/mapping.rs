//! Schema to table mapping.
//!
//! Pure: populates a fresh TableRegistry and ConstraintRegistry without
//! touching a connection.

use crate::DeployResult;
use std::collections::HashSet;
use std::sync::Arc;
use tessera_core::HolderId;
use tessera_registry::{
    AttributeColumn, ColumnRole, ConstraintRegistry, TableId, TableKind, TableRegistry,
    UniqueConstraintInfo,
};
use tessera_schema::Schema;
use tessera_sql::{mediator, SqlType, Vendor};
use tracing::debug;

/// Suffix of join table names.
const JOIN_TABLE_SUFFIX: &str = "_J";
/// Prefix of unique-constraint table names.
const UNIQUE_TABLE_PREFIX: &str = "UQ_";

/// Registries produced by mapping a schema.
#[derive(Debug)]
pub struct TableMapping {
    pub registry: TableRegistry,
    pub constraints: ConstraintRegistry,
}

/// Map `schema` onto tables.
pub fn map_schema(schema: &Schema, vendor: Arc<dyn Vendor>) -> DeployResult<TableMapping> {
    let mut mapper = Mapper {
        schema,
        registry: TableRegistry::new(vendor),
        constraints: ConstraintRegistry::new(),
        handled: HashSet::new(),
    };

    // Pass 1: type tables and the join-table tree, per inheritance root.
    let roots: Vec<HolderId> = schema.root_types().map(|h| h.id).collect();
    for root in roots {
        mapper.map_type(root)?;
    }

    // Pass 2: mixin join tables.
    let mixins: Vec<HolderId> = schema.mixins().map(|h| h.id).collect();
    for mixin in mixins {
        mapper.map_mixin(mixin)?;
    }

    // Pass 3: unique-constraint tables.
    mapper.map_unique_constraints()?;

    // Pass 4: columns.
    mapper.add_columns()?;

    debug!(tables = mapper.registry.table_count(), "schema mapped");
    Ok(TableMapping {
        registry: mapper.registry,
        constraints: mapper.constraints,
    })
}

struct Mapper<'a> {
    schema: &'a Schema,
    registry: TableRegistry,
    constraints: ConstraintRegistry,
    /// Holders already mapped.
    handled: HashSet<HolderId>,
}

impl Mapper<'_> {
    /// Map a type and its sub types, returning the table representing it.
    fn map_type(&mut self, ty: HolderId) -> DeployResult<Option<TableId>> {
        let schema = self.schema;
        if !self.handled.insert(ty) {
            return Ok(self.registry.representative(ty).map(|t| t.id));
        }
        let holder = schema.holder(ty);
        let name = holder.name.clone();

        let own = if holder.is_concrete() {
            Some(self.registry.create_type_table(ty, &name)?)
        } else {
            None
        };

        let mut children = Vec::new();
        for &sub in schema.sub_types(ty) {
            if let Some(table) = self.map_type(sub)? {
                children.push(table);
            }
        }

        let representative = if schema.concrete_implementers(ty).len() > 1 {
            let join = self
                .registry
                .create_join_table(ty, &format!("{}{}", name, JOIN_TABLE_SUFFIX))?;
            for table in own.into_iter().chain(children) {
                self.registry.link(join, table);
            }
            Some(join)
        } else {
            own.or_else(|| children.first().copied())
        };

        if let Some(table) = representative {
            self.registry.set_representative(ty, table);
        }
        Ok(representative)
    }

    /// Map a mixin onto the tables of the types it is mixed into.
    fn map_mixin(&mut self, mixin: HolderId) -> DeployResult<()> {
        let schema = self.schema;
        if !self.handled.insert(mixin) {
            return Ok(());
        }
        let implementers = schema.concrete_implementers(mixin);
        let representative = match implementers.as_slice() {
            [] => return Ok(()),
            [single] => self.registry.type_table(*single).map(|t| t.id),
            _ => {
                let name = format!("{}{}", schema.holder_name(mixin), JOIN_TABLE_SUFFIX);
                let join = self.registry.create_join_table(mixin, &name)?;
                for &ty in schema.mixed_into(mixin) {
                    // Rows of sub types are reached through the ancestor.
                    let inherited = schema
                        .super_type(ty)
                        .is_some_and(|s| schema.is_a(s, mixin));
                    if inherited {
                        continue;
                    }
                    if let Some(table) = self.registry.representative(ty).map(|t| t.id) {
                        self.registry.link(join, table);
                    }
                }
                Some(join)
            }
        };

        if let Some(table) = representative {
            self.registry.set_representative(mixin, table);
        }
        Ok(())
    }

    fn map_unique_constraints(&mut self) -> DeployResult<()> {
        let schema = self.schema;
        for (index, constraint) in schema.unique_constraints().iter().enumerate() {
            if !schema.is_used(constraint.holder) {
                continue;
            }
            let mut name = format!("{}{}", UNIQUE_TABLE_PREFIX, schema.holder_name(constraint.holder));
            for attr in &constraint.attributes {
                name.push('_');
                name.push_str(&schema.attribute(*attr).name);
            }
            self.registry.create_unique_constraint_table(index, &name)?;
        }
        Ok(())
    }

    fn add_columns(&mut self) -> DeployResult<()> {
        let schema = self.schema;
        let vendor = self.registry.vendor().clone();
        let fk_index = !vendor.auto_indexes_foreign_keys();
        let tables: Vec<(TableId, TableKind, Vec<TableId>)> = self
            .registry
            .tables()
            .map(|t| (t.id, t.kind, t.joined.clone()))
            .collect();

        for (table, kind, joined) in tables {
            match kind {
                TableKind::Type(ty) => {
                    for attr in schema.holder_attributes(ty) {
                        let def = schema.attribute(attr);
                        let Some(sql_type) = mediator::sql_type(def) else {
                            continue;
                        };
                        let references = def
                            .kind
                            .reference_target()
                            .and_then(|target| self.registry.representative(target))
                            .map(|t| t.id);
                        let column = AttributeColumn::new(
                            vendor.identifier(&def.name),
                            ColumnRole::Attribute(attr),
                            sql_type,
                        )
                        .with_index(def.indexed || (def.kind.is_reference() && fk_index))
                        .referencing(references);
                        self.registry.add_column(table, column)?;
                    }
                }
                TableKind::Join(_) => {
                    for target in joined {
                        let name = vendor.identifier(&self.registry.table(target).name);
                        let column =
                            AttributeColumn::new(name, ColumnRole::Joined(target), SqlType::Key)
                                .with_index(fk_index)
                                .referencing(Some(target));
                        self.registry.add_column(table, column)?;
                    }
                }
                TableKind::UniqueConstraint(index) => {
                    self.add_unique_constraint_columns(table, index)?;
                }
            }
        }
        Ok(())
    }

    fn add_unique_constraint_columns(&mut self, table: TableId, index: usize) -> DeployResult<()> {
        let schema = self.schema;
        let vendor = self.registry.vendor().clone();
        let constraint = &schema.unique_constraints()[index];

        let mut holder_columns = Vec::new();
        for ty in schema.concrete_implementers(constraint.holder) {
            let name = vendor.identifier(schema.holder_name(ty));
            let target = self.registry.type_table(ty).map(|t| t.id);
            let column =
                AttributeColumn::new(name.clone(), ColumnRole::ConstraintHolder(ty), SqlType::Key)
                    .with_index(!vendor.auto_indexes_foreign_keys())
                    .referencing(target);
            self.registry.add_column(table, column)?;
            holder_columns.push((ty, name));
        }

        let mut value_columns = Vec::new();
        for &attr in &constraint.attributes {
            let def = schema.attribute(attr);
            let Some(sql_type) = mediator::sql_type(def) else {
                continue;
            };
            let name = vendor.identifier(&def.name);
            let column =
                AttributeColumn::new(name.clone(), ColumnRole::ConstraintValue(attr), sql_type)
                    .with_index(!vendor.auto_indexes_unique());
            self.registry.add_column(table, column)?;
            value_columns.push((attr, name));
        }

        let table_name = self.registry.table(table).name.clone();
        self.constraints.register(UniqueConstraintInfo {
            constraint: index,
            table,
            name: vendor.identifier(&format!("{}_UK", table_name)),
            holder_columns,
            value_columns,
        });
        Ok(())
    }
}
