//! SchemaBuilder for constructing an immutable Schema.
//!
//! Holders are declared one at a time through `TypeBuilder` / `MixinBuilder`.
//! Names used for super types, mixins, reference targets and inverse
//! attributes are resolved in `build()`, so declaration order is free and
//! self-references (`Node { parent: Node }`) need no forward declaration.

use crate::{
    AttributeDef, AttributeKind, AttributeKindSpec, AttributeSpec, Holder, HolderKind, OnDelete,
    Schema, SchemaError, SchemaResult, TypeDef, UniqueConstraintDef,
};
use regex_lite::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;
use tessera_core::{AttributeRef, HolderId};

/// Name of the synthetic primary-key column every table carries.
pub const PRIMARY_KEY_NAME: &str = "id";

const IDENTIFIER_PATTERN: &str = r"^[A-Za-z_][A-Za-z0-9_]*$";

fn identifier_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(IDENTIFIER_PATTERN).ok()).as_ref()
}

fn validate_identifier(name: &str) -> SchemaResult<()> {
    match identifier_regex() {
        Some(re) if re.is_match(name) => Ok(()),
        _ => Err(SchemaError::InvalidIdentifier(name.to_string())),
    }
}

#[derive(Debug, Clone)]
enum PendingKind {
    Type {
        super_type: Option<String>,
        mixins: Vec<String>,
        is_abstract: bool,
        is_virtual: bool,
    },
    Mixin,
}

#[derive(Debug, Clone)]
struct PendingHolder {
    name: String,
    kind: PendingKind,
    attributes: Vec<AttributeSpec>,
}

#[derive(Debug, Clone)]
struct PendingConstraint {
    holder: String,
    attributes: Vec<String>,
}

/// Builder for constructing an immutable Schema.
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    /// Holders in declaration order; position is the HolderId.
    holders: Vec<PendingHolder>,
    /// Holder name to ID mapping.
    names: HashMap<String, HolderId>,
    /// Unique constraints, resolved at build time.
    constraints: Vec<PendingConstraint>,
}

impl SchemaBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a type definition.
    pub fn add_type(&mut self, name: impl Into<String>) -> TypeBuilder<'_> {
        TypeBuilder {
            builder: self,
            name: name.into(),
            super_type: None,
            mixins: Vec::new(),
            attributes: Vec::new(),
            is_abstract: false,
            is_virtual: false,
        }
    }

    /// Add a mixin definition.
    pub fn add_mixin(&mut self, name: impl Into<String>) -> MixinBuilder<'_> {
        MixinBuilder {
            builder: self,
            name: name.into(),
            attributes: Vec::new(),
        }
    }

    /// Add a unique constraint over attributes visible on `holder`.
    pub fn add_unique_constraint<I, S>(&mut self, holder: impl Into<String>, attributes: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.constraints.push(PendingConstraint {
            holder: holder.into(),
            attributes: attributes.into_iter().map(Into::into).collect(),
        });
    }

    fn register(&mut self, holder: PendingHolder) -> SchemaResult<HolderId> {
        validate_identifier(&holder.name)?;
        if self.names.contains_key(&holder.name) {
            return Err(SchemaError::DuplicateHolderName(holder.name));
        }

        let mut seen = HashSet::new();
        for attr in &holder.attributes {
            validate_identifier(&attr.name)?;
            if attr.name.eq_ignore_ascii_case(PRIMARY_KEY_NAME) {
                return Err(SchemaError::ReservedAttributeName(attr.name.clone()));
            }
            if !seen.insert(attr.name.as_str()) {
                return Err(SchemaError::duplicate_attribute(&holder.name, &attr.name));
            }
            if attr.cascade_delete && attr.null_on_delete {
                return Err(SchemaError::ConflictingDeletePolicy {
                    holder: holder.name.clone(),
                    attribute: attr.name.clone(),
                });
            }
        }

        let id = HolderId::new(self.holders.len() as u32);
        self.names.insert(holder.name.clone(), id);
        self.holders.push(holder);
        Ok(id)
    }

    fn lookup(&self, name: &str) -> Option<HolderId> {
        self.names.get(name).copied()
    }

    /// Build the immutable Schema.
    pub fn build(self) -> SchemaResult<Schema> {
        let count = self.holders.len();

        // Resolve super types and mixins
        let mut supers: Vec<Option<HolderId>> = vec![None; count];
        let mut mixins: Vec<Vec<HolderId>> = vec![Vec::new(); count];
        for (i, pending) in self.holders.iter().enumerate() {
            if let PendingKind::Type {
                super_type,
                mixins: mixin_names,
                ..
            } = &pending.kind
            {
                if let Some(super_name) = super_type {
                    let super_id = self
                        .lookup(super_name)
                        .ok_or_else(|| SchemaError::UnknownSuperType(super_name.clone()))?;
                    if matches!(self.holders[super_id.index()].kind, PendingKind::Mixin) {
                        return Err(SchemaError::SuperTypeIsMixin(super_name.clone()));
                    }
                    supers[i] = Some(super_id);
                }
                for mixin_name in mixin_names {
                    let mixin_id = self
                        .lookup(mixin_name)
                        .filter(|id| matches!(self.holders[id.index()].kind, PendingKind::Mixin))
                        .ok_or_else(|| SchemaError::UnknownMixin(mixin_name.clone()))?;
                    mixins[i].push(mixin_id);
                }
            }
        }

        // Detect inheritance cycles
        for (i, pending) in self.holders.iter().enumerate() {
            let mut current = supers[i];
            let mut steps = 0;
            while let Some(id) = current {
                steps += 1;
                if id.index() == i || steps > count {
                    return Err(SchemaError::InheritanceCycle(pending.name.clone()));
                }
                current = supers[id.index()];
            }
        }

        let resolver = Resolver {
            builder: &self,
            supers: &supers,
            mixins: &mixins,
        };

        // Names must be unique across everything a type can see
        for (i, pending) in self.holders.iter().enumerate() {
            let mut seen = HashSet::new();
            for holder in resolver.visible_holders(HolderId::new(i as u32)) {
                for attr in &self.holders[holder.index()].attributes {
                    if !seen.insert(attr.name.as_str()) {
                        return Err(SchemaError::duplicate_attribute(&pending.name, &attr.name));
                    }
                }
            }
        }

        // Resolve attributes
        let mut holders = Vec::with_capacity(count);
        for (i, pending) in self.holders.iter().enumerate() {
            let id = HolderId::new(i as u32);
            let attributes = pending
                .attributes
                .iter()
                .map(|spec| resolver.resolve_attribute(pending, spec))
                .collect::<SchemaResult<Vec<_>>>()?;

            let kind = match &pending.kind {
                PendingKind::Type {
                    is_abstract,
                    is_virtual,
                    ..
                } => HolderKind::Type(TypeDef {
                    super_type: supers[i],
                    is_abstract: *is_abstract,
                    is_virtual: *is_virtual,
                    mixins: mixins[i].clone(),
                }),
                PendingKind::Mixin => HolderKind::Mixin,
            };

            holders.push(Holder {
                id,
                name: pending.name.clone(),
                kind,
                attributes,
            });
        }

        // Resolve unique constraints
        let mut unique_constraints = Vec::with_capacity(self.constraints.len());
        for constraint in &self.constraints {
            let holder = self
                .lookup(&constraint.holder)
                .ok_or_else(|| SchemaError::UnknownHolder(constraint.holder.clone()))?;
            if constraint.attributes.is_empty() {
                return Err(SchemaError::EmptyUniqueConstraint(constraint.holder.clone()));
            }
            let attributes = constraint
                .attributes
                .iter()
                .map(|name| {
                    resolver
                        .find_attribute(holder, name)
                        .ok_or_else(|| SchemaError::unknown_attribute(&constraint.holder, name))
                })
                .collect::<SchemaResult<Vec<_>>>()?;
            unique_constraints.push(UniqueConstraintDef { holder, attributes });
        }

        Ok(Schema::new(holders, self.names, unique_constraints))
    }
}

/// Name resolution over the pending holders once super types and mixins
/// are known.
struct Resolver<'b> {
    builder: &'b SchemaBuilder,
    supers: &'b [Option<HolderId>],
    mixins: &'b [Vec<HolderId>],
}

impl Resolver<'_> {
    /// Root-first chain of holders whose attributes `id` carries.
    fn visible_holders(&self, id: HolderId) -> Vec<HolderId> {
        let mut chain = vec![id];
        let mut current = self.supers[id.index()];
        while let Some(super_id) = current {
            chain.push(super_id);
            current = self.supers[super_id.index()];
        }

        let mut visible = Vec::new();
        for holder in chain.into_iter().rev() {
            visible.extend(self.mixins[holder.index()].iter().copied());
            visible.push(holder);
        }
        visible
    }

    fn find_attribute(&self, holder: HolderId, name: &str) -> Option<AttributeRef> {
        self.visible_holders(holder).into_iter().find_map(|h| {
            self.builder.holders[h.index()]
                .attributes
                .iter()
                .position(|a| a.name == name)
                .map(|index| AttributeRef::new(h, index as u32))
        })
    }

    fn resolve_attribute(
        &self,
        owner: &PendingHolder,
        spec: &AttributeSpec,
    ) -> SchemaResult<AttributeDef> {
        let kind = match &spec.kind {
            AttributeKindSpec::String => AttributeKind::String,
            AttributeKindSpec::Decimal {
                length,
                decimal_places,
            } => AttributeKind::Decimal {
                length: *length,
                decimal_places: *decimal_places,
            },
            AttributeKindSpec::Boolean => AttributeKind::Boolean,
            AttributeKindSpec::Date => AttributeKind::Date,
            AttributeKindSpec::Binary => AttributeKind::Binary,
            AttributeKindSpec::Crypto => AttributeKind::Crypto,
            AttributeKindSpec::Json => AttributeKind::Json,
            AttributeKindSpec::Reference { target } => {
                let target_id = self.builder.lookup(target).ok_or_else(|| {
                    SchemaError::unknown_reference_target(&owner.name, &spec.name, target)
                })?;
                AttributeKind::Reference { target: target_id }
            }
            AttributeKindSpec::Inverse {
                holder,
                attribute,
                delete_orphans,
            } => {
                let holder_id = self
                    .builder
                    .lookup(holder)
                    .ok_or_else(|| SchemaError::UnknownHolder(holder.clone()))?;
                let attr_ref = self
                    .find_attribute(holder_id, attribute)
                    .ok_or_else(|| SchemaError::unknown_attribute(holder, attribute))?;
                let target = &self.builder.holders[attr_ref.holder.index()].attributes
                    [attr_ref.index as usize];
                if !matches!(target.kind, AttributeKindSpec::Reference { .. }) {
                    return Err(SchemaError::InverseTargetNotReference {
                        holder: holder.clone(),
                        attribute: attribute.clone(),
                    });
                }
                AttributeKind::Inverse {
                    holder: holder_id,
                    attribute: attr_ref,
                    delete_orphans: *delete_orphans,
                }
            }
        };

        let on_delete = if spec.cascade_delete {
            Some(OnDelete::Cascade)
        } else if spec.null_on_delete {
            Some(OnDelete::SetNull)
        } else {
            None
        };

        Ok(AttributeDef {
            name: spec.name.clone(),
            kind,
            mandatory: spec.mandatory,
            indexed: spec.indexed,
            is_virtual: spec.is_virtual,
            on_delete,
        })
    }
}

/// Builder for a type definition.
pub struct TypeBuilder<'a> {
    builder: &'a mut SchemaBuilder,
    name: String,
    super_type: Option<String>,
    mixins: Vec<String>,
    attributes: Vec<AttributeSpec>,
    is_abstract: bool,
    is_virtual: bool,
}

impl<'a> TypeBuilder<'a> {
    /// Set the super type by name.
    pub fn extends(mut self, super_name: impl Into<String>) -> Self {
        self.super_type = Some(super_name.into());
        self
    }

    /// Mix a mixin into this type.
    pub fn mixin(mut self, mixin_name: impl Into<String>) -> Self {
        self.mixins.push(mixin_name.into());
        self
    }

    /// Add an attribute.
    pub fn attr(mut self, attr: AttributeSpec) -> Self {
        self.attributes.push(attr);
        self
    }

    /// Mark as abstract (no own table).
    pub fn abstract_type(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    /// Mark as virtual (model only, never persisted).
    pub fn virtual_type(mut self) -> Self {
        self.is_virtual = true;
        self
    }

    /// Finish building this type.
    pub fn done(self) -> SchemaResult<HolderId> {
        self.builder.register(PendingHolder {
            name: self.name,
            kind: PendingKind::Type {
                super_type: self.super_type,
                mixins: self.mixins,
                is_abstract: self.is_abstract,
                is_virtual: self.is_virtual,
            },
            attributes: self.attributes,
        })
    }
}

/// Builder for a mixin definition.
pub struct MixinBuilder<'a> {
    builder: &'a mut SchemaBuilder,
    name: String,
    attributes: Vec<AttributeSpec>,
}

impl<'a> MixinBuilder<'a> {
    /// Add an attribute.
    pub fn attr(mut self, attr: AttributeSpec) -> Self {
        self.attributes.push(attr);
        self
    }

    /// Finish building this mixin.
    pub fn done(self) -> SchemaResult<HolderId> {
        self.builder.register(PendingHolder {
            name: self.name,
            kind: PendingKind::Mixin,
            attributes: self.attributes,
        })
    }
}
