//! The Deployer - create-if-missing DDL for a mapped schema.

use crate::{map_schema, DeployError, DeployOptions, DeployResult, Ddl, SchemaProblem, TableMapping};
use tessera_registry::{ColumnRole, Table, TableKind};
use tessera_schema::{AttributeKind, OnDelete, Schema};
use tessera_sql::Vendor;
use tessera_transaction::{Transaction, TransactionTemplate};
use tracing::{debug, info, warn};

/// Outcome of one deployment.
#[derive(Debug)]
pub struct Deployment {
    pub mapping: TableMapping,
    /// Every rendered statement, executed or not, in order.
    pub sql_log: Vec<String>,
    /// Problems logged instead of raised.
    pub findings: Vec<SchemaProblem>,
    /// Number of objects actually created.
    pub created: usize,
}

/// Deploys one schema through a transaction template.
pub struct Deployer<'s> {
    schema: &'s Schema,
    options: DeployOptions,
}

impl<'s> Deployer<'s> {
    pub fn new(schema: &'s Schema, options: DeployOptions) -> Self {
        Self { schema, options }
    }

    pub fn options(&self) -> DeployOptions {
        self.options
    }

    /// Map the schema onto a fresh registry, then create or validate every
    /// table, column, unique constraint, foreign key and index.
    pub fn deploy(&self, template: &TransactionTemplate) -> DeployResult<Deployment> {
        let vendor = template.vendor().clone();
        let mapping = map_schema(self.schema, vendor.clone())?;
        let mut deployment = Deployment {
            mapping,
            sql_log: Vec::new(),
            findings: Vec::new(),
            created: 0,
        };

        let statements = self.plan(vendor.as_ref(), &mut deployment)?;
        info!(
            statements = statements.len(),
            validate_only = self.options.validate_only,
            "deploying schema"
        );
        for ddl in statements {
            self.apply(template, ddl, &mut deployment)?;
        }

        info!(
            created = deployment.created,
            findings = deployment.findings.len(),
            "schema deployed"
        );
        Ok(deployment)
    }

    /// Render the DDL of every object, in dependency order.
    fn plan(&self, vendor: &dyn Vendor, out: &mut Deployment) -> DeployResult<Vec<Ddl>> {
        let registry = &out.mapping.registry;
        let mut tables = Vec::new();
        let mut columns = Vec::new();
        let mut uniques = Vec::new();
        let mut foreign_keys = Vec::new();
        let mut indexes = Vec::new();
        let mut problems = Vec::new();

        for table in registry.tables() {
            tables.push(Ddl::create_table(vendor, table));

            for column in table.columns.iter().skip(1) {
                columns.push(Ddl::add_column(vendor, table, column));
            }

            for column in &table.columns {
                if let Some(target) = column.references {
                    match self.delete_policy(table, column.role) {
                        Ok(policy) => foreign_keys.push(Ddl::add_foreign_key(
                            vendor,
                            table,
                            column,
                            registry.table(target),
                            policy,
                        )),
                        Err(problem) => problems.push(problem),
                    }
                }
                if column.requires_index {
                    indexes.push(Ddl::create_index(vendor, table, column));
                }
            }
        }

        for info in out.mapping.constraints.all() {
            uniques.push(Ddl::add_unique(registry.table(info.table), info));
        }

        for problem in problems {
            self.report(problem, &mut out.findings)?;
        }

        let mut plan = tables;
        plan.extend(columns);
        plan.extend(uniques);
        plan.extend(foreign_keys);
        plan.extend(indexes);
        Ok(plan)
    }

    /// ON DELETE policy of a reference column.
    fn delete_policy(&self, table: &Table, role: ColumnRole) -> Result<OnDelete, SchemaProblem> {
        let attr = match (table.kind, role) {
            (TableKind::Type(_), ColumnRole::Attribute(attr)) => attr,
            // Join and unique-constraint rows belong to the row they point at.
            _ => return Ok(OnDelete::Cascade),
        };

        let def = self.schema.attribute(attr);
        if let Some(policy) = def.on_delete {
            return Ok(policy);
        }
        let orphans_deleted = self.schema.inverses_of(attr).iter().any(|(_, inverse)| {
            matches!(inverse.kind, AttributeKind::Inverse { delete_orphans: true, .. })
        });
        if orphans_deleted {
            return Ok(OnDelete::Cascade);
        }
        Err(SchemaProblem::AmbiguousDeletePolicy {
            holder: self.schema.holder_name(attr.holder).to_string(),
            attribute: def.name.clone(),
        })
    }

    fn apply(&self, template: &TransactionTemplate, ddl: Ddl, out: &mut Deployment) -> DeployResult<()> {
        out.sql_log.push(ddl.sql.clone());

        let exists = template
            .with_connection(|conn, vendor| ddl.exists(vendor, conn))?
            .map_err(|e| DeployError::probe(&ddl.name, e))?;
        if exists {
            debug!(object = %ddl.name, kind = ?ddl.object, "already present");
            return Ok(());
        }

        if self.options.validate_only {
            return self.report(ddl.missing(), &mut out.findings);
        }

        let sql = ddl.sql.clone();
        let mut tx = Transaction::new();
        tx.push(move |scope| scope.execute_ddl(&sql).map(|_| ()));
        template.run(&mut tx)?;

        info!(object = %ddl.name, kind = ?ddl.object, "created");
        out.created += 1;
        Ok(())
    }

    /// Raise `problem`, or log and keep it when validation errors are ignored.
    fn report(&self, problem: SchemaProblem, findings: &mut Vec<SchemaProblem>) -> DeployResult<()> {
        if self.options.ignore_validation_errors {
            warn!(%problem, "schema problem ignored");
            findings.push(problem);
            Ok(())
        } else {
            Err(problem.into())
        }
    }
}

impl std::fmt::Debug for Deployer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Deployer")
            .field("holders", &self.schema.holder_count())
            .field("options", &self.options)
            .finish()
    }
}
