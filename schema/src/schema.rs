//! The Schema - immutable holder lookup.

use crate::{AttributeDef, AttributeKind, Holder, HolderKind, UniqueConstraintDef};
use std::collections::HashMap;
use tessera_core::{AttributeRef, HolderId};

/// The Schema provides lookup of holders, attributes and the inheritance
/// graph. It is immutable after construction.
#[derive(Debug)]
pub struct Schema {
    /// Holders indexed by HolderId.
    holders: Vec<Holder>,
    /// Holder ID lookup by name.
    names: HashMap<String, HolderId>,
    /// Unique constraints in declaration order.
    unique_constraints: Vec<UniqueConstraintDef>,
    /// Direct sub types per holder.
    sub_types: Vec<Vec<HolderId>>,
    /// Types that declare each mixin directly.
    mixed_into: Vec<Vec<HolderId>>,
}

impl Schema {
    /// Create a schema (use SchemaBuilder for construction).
    pub(crate) fn new(
        holders: Vec<Holder>,
        names: HashMap<String, HolderId>,
        unique_constraints: Vec<UniqueConstraintDef>,
    ) -> Self {
        let mut sub_types = vec![Vec::new(); holders.len()];
        let mut mixed_into = vec![Vec::new(); holders.len()];
        for holder in &holders {
            if let HolderKind::Type(def) = &holder.kind {
                if let Some(super_id) = def.super_type {
                    sub_types[super_id.index()].push(holder.id);
                }
                for mixin in &def.mixins {
                    mixed_into[mixin.index()].push(holder.id);
                }
            }
        }

        Self {
            holders,
            names,
            unique_constraints,
            sub_types,
            mixed_into,
        }
    }

    // ==================== Holder Lookups ====================

    /// Get a holder by ID.
    pub fn get_holder(&self, id: HolderId) -> Option<&Holder> {
        self.holders.get(id.index())
    }

    /// Get a holder by ID.
    ///
    /// Panics if `id` was not produced by this schema.
    pub fn holder(&self, id: HolderId) -> &Holder {
        &self.holders[id.index()]
    }

    /// Get a holder by name.
    pub fn holder_by_name(&self, name: &str) -> Option<&Holder> {
        self.names.get(name).map(|id| &self.holders[id.index()])
    }

    /// Get a holder ID by name.
    pub fn holder_id(&self, name: &str) -> Option<HolderId> {
        self.names.get(name).copied()
    }

    /// Name of a holder.
    pub fn holder_name(&self, id: HolderId) -> &str {
        &self.holder(id).name
    }

    /// All holders in declaration order.
    pub fn holders(&self) -> impl Iterator<Item = &Holder> {
        self.holders.iter()
    }

    /// All Types in declaration order.
    pub fn types(&self) -> impl Iterator<Item = &Holder> {
        self.holders.iter().filter(|h| !h.is_mixin())
    }

    /// All Mixins in declaration order.
    pub fn mixins(&self) -> impl Iterator<Item = &Holder> {
        self.holders.iter().filter(|h| h.is_mixin())
    }

    /// Types without a super type, in declaration order.
    pub fn root_types(&self) -> impl Iterator<Item = &Holder> {
        self.types()
            .filter(|h| h.as_type().is_some_and(|t| t.super_type.is_none()))
    }

    /// Unique constraints in declaration order.
    pub fn unique_constraints(&self) -> &[UniqueConstraintDef] {
        &self.unique_constraints
    }

    /// Get the number of holders.
    pub fn holder_count(&self) -> usize {
        self.holders.len()
    }

    // ==================== Attributes ====================

    /// Get an attribute definition.
    ///
    /// Panics if `attr` was not produced by this schema.
    pub fn attribute(&self, attr: AttributeRef) -> &AttributeDef {
        &self.holder(attr.holder).attributes[attr.index as usize]
    }

    /// Root-first list of the holders whose attributes `id` carries: for each
    /// type in the super chain, its mixins followed by the type itself.
    pub fn visible_holders(&self, id: HolderId) -> Vec<HolderId> {
        let mut chain = vec![id];
        let mut current = self.super_type(id);
        while let Some(super_id) = current {
            chain.push(super_id);
            current = self.super_type(super_id);
        }

        let mut visible = Vec::new();
        for holder in chain.into_iter().rev() {
            if let Some(def) = self.holder(holder).as_type() {
                visible.extend(def.mixins.iter().copied());
            }
            visible.push(holder);
        }
        visible
    }

    /// Own, inherited and mixed-in attributes of a holder, in column order.
    pub fn holder_attributes(&self, id: HolderId) -> Vec<AttributeRef> {
        self.visible_holders(id)
            .into_iter()
            .flat_map(|h| {
                (0..self.holder(h).attributes.len()).map(move |i| AttributeRef::new(h, i as u32))
            })
            .collect()
    }

    /// Find an attribute visible on a holder by name.
    pub fn find_attribute(&self, holder: HolderId, name: &str) -> Option<AttributeRef> {
        self.visible_holders(holder)
            .into_iter()
            .find_map(|h| self.holder(h).own_attribute(name).map(|(r, _)| r))
    }

    /// Inverse attributes declared anywhere that mirror `reference`.
    pub fn inverses_of(&self, reference: AttributeRef) -> Vec<(AttributeRef, &AttributeDef)> {
        self.holders
            .iter()
            .flat_map(|h| {
                h.attributes
                    .iter()
                    .enumerate()
                    .map(move |(i, a)| (AttributeRef::new(h.id, i as u32), a))
            })
            .filter(|(_, a)| {
                matches!(a.kind, AttributeKind::Inverse { attribute, .. } if attribute == reference)
            })
            .collect()
    }

    // ==================== Hierarchy ====================

    /// Get the direct super type of a type.
    pub fn super_type(&self, id: HolderId) -> Option<HolderId> {
        self.holder(id).as_type().and_then(|t| t.super_type)
    }

    /// Get the direct sub types of a type.
    pub fn sub_types(&self, id: HolderId) -> &[HolderId] {
        &self.sub_types[id.index()]
    }

    /// Get the types that declare a mixin directly.
    pub fn mixed_into(&self, mixin: HolderId) -> &[HolderId] {
        &self.mixed_into[mixin.index()]
    }

    /// Concrete types addressable through a holder, in declaration
    /// (pre-order) order: the type itself if concrete plus all concrete
    /// descendants; for a mixin, the implementers of every type it is
    /// mixed into.
    pub fn concrete_implementers(&self, id: HolderId) -> Vec<HolderId> {
        let mut result = Vec::new();
        let mut stack = if self.holder(id).is_mixin() {
            self.mixed_into(id).iter().rev().copied().collect::<Vec<_>>()
        } else {
            vec![id]
        };

        while let Some(current) = stack.pop() {
            if self.holder(current).is_concrete() && !result.contains(&current) {
                result.push(current);
            }
            stack.extend(self.sub_types(current).iter().rev().copied());
        }
        result
    }

    /// A holder is used if at least one concrete type implements it.
    pub fn is_used(&self, id: HolderId) -> bool {
        !self.concrete_implementers(id).is_empty()
    }

    /// Returns true if `ty` is `holder`, a sub type of it, or mixes it in
    /// through its own or an inherited declaration.
    pub fn is_a(&self, ty: HolderId, holder: HolderId) -> bool {
        self.visible_holders(ty).contains(&holder)
    }
}
