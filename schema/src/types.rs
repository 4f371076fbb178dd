//! Schema definition types.

use tessera_core::{AttributeRef, HolderId};

/// What happens to a referencing row when the referenced row is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OnDelete {
    /// Delete the referencing row as well.
    Cascade,
    /// Clear the reference column.
    SetNull,
}

impl OnDelete {
    /// SQL fragment used in the foreign key clause.
    pub fn sql(&self) -> &'static str {
        match self {
            OnDelete::Cascade => "CASCADE",
            OnDelete::SetNull => "SET NULL",
        }
    }
}

/// The resolved kind of an attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeKind {
    String,
    /// Numeric value; `decimal_places == 0` stores an integer.
    Decimal {
        length: u32,
        decimal_places: u32,
    },
    Boolean,
    Date,
    Binary,
    /// Binary payload encrypted by an injected crypto provider.
    Crypto,
    /// Structured document stored as text.
    Json,
    /// Reference to a Type or Mixin.
    Reference { target: HolderId },
    /// Computed collection of the records pointing back through `attribute`.
    Inverse {
        holder: HolderId,
        attribute: AttributeRef,
        delete_orphans: bool,
    },
}

impl AttributeKind {
    /// Returns true for reference attributes.
    pub fn is_reference(&self) -> bool {
        matches!(self, AttributeKind::Reference { .. })
    }

    /// Returns true for inverse attributes.
    pub fn is_inverse(&self) -> bool {
        matches!(self, AttributeKind::Inverse { .. })
    }

    /// Target holder of a reference attribute.
    pub fn reference_target(&self) -> Option<HolderId> {
        match self {
            AttributeKind::Reference { target } => Some(*target),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AttributeKind::String => "String",
            AttributeKind::Decimal { .. } => "Decimal",
            AttributeKind::Boolean => "Boolean",
            AttributeKind::Date => "Date",
            AttributeKind::Binary => "Binary",
            AttributeKind::Crypto => "Crypto",
            AttributeKind::Json => "Json",
            AttributeKind::Reference { .. } => "Reference",
            AttributeKind::Inverse { .. } => "Inverse",
        }
    }
}

/// A resolved attribute definition.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeDef {
    /// Attribute name, unique within the declaring holder's hierarchy.
    pub name: String,
    /// Resolved kind.
    pub kind: AttributeKind,
    /// A record must carry a value before it can be inserted.
    pub mandatory: bool,
    /// Request an index on the backing column.
    pub indexed: bool,
    /// Exists only in the model; never backed by a column.
    pub is_virtual: bool,
    /// Explicit delete policy for reference attributes.
    pub on_delete: Option<OnDelete>,
}

impl AttributeDef {
    /// Returns true if the attribute is backed by a column.
    pub fn is_persistent(&self) -> bool {
        !self.is_virtual && !self.kind.is_inverse()
    }
}

/// Definition-level data that only Types carry.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDef {
    pub super_type: Option<HolderId>,
    pub is_abstract: bool,
    pub is_virtual: bool,
    /// Mixins declared directly on this type, in declaration order.
    pub mixins: Vec<HolderId>,
}

/// Type or Mixin.
#[derive(Debug, Clone, PartialEq)]
pub enum HolderKind {
    Type(TypeDef),
    Mixin,
}

/// A named attribute holder: anything that owns attributes and can be the
/// target of a reference.
#[derive(Debug, Clone, PartialEq)]
pub struct Holder {
    pub id: HolderId,
    pub name: String,
    pub kind: HolderKind,
    /// Own attributes; `AttributeRef::index` indexes into this list.
    pub attributes: Vec<AttributeDef>,
}

impl Holder {
    pub fn is_mixin(&self) -> bool {
        matches!(self.kind, HolderKind::Mixin)
    }

    pub fn as_type(&self) -> Option<&TypeDef> {
        match &self.kind {
            HolderKind::Type(t) => Some(t),
            HolderKind::Mixin => None,
        }
    }

    /// A holder has its own table if it is a Type that is neither abstract
    /// nor virtual.
    pub fn is_concrete(&self) -> bool {
        match &self.kind {
            HolderKind::Type(t) => !t.is_abstract && !t.is_virtual,
            HolderKind::Mixin => false,
        }
    }

    pub fn is_virtual(&self) -> bool {
        matches!(&self.kind, HolderKind::Type(t) if t.is_virtual)
    }

    /// Get an own attribute by name.
    pub fn own_attribute(&self, name: &str) -> Option<(AttributeRef, &AttributeDef)> {
        self.attributes
            .iter()
            .enumerate()
            .find(|(_, a)| a.name == name)
            .map(|(i, a)| (AttributeRef::new(self.id, i as u32), a))
    }
}

/// Ordered set of attributes of one holder that must be jointly unique.
#[derive(Debug, Clone, PartialEq)]
pub struct UniqueConstraintDef {
    pub holder: HolderId,
    pub attributes: Vec<AttributeRef>,
}

// ==================== Builder input ====================

/// Unresolved attribute kind as written by the schema author. Holder
/// references are names, resolved when the schema is built.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeKindSpec {
    String,
    Decimal { length: u32, decimal_places: u32 },
    Boolean,
    Date,
    Binary,
    Crypto,
    Json,
    Reference { target: String },
    Inverse {
        holder: String,
        attribute: String,
        delete_orphans: bool,
    },
}

/// Attribute declaration passed to `TypeBuilder::attr` / `MixinBuilder::attr`.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeSpec {
    pub name: String,
    pub kind: AttributeKindSpec,
    pub mandatory: bool,
    pub indexed: bool,
    pub is_virtual: bool,
    pub cascade_delete: bool,
    pub null_on_delete: bool,
}

impl AttributeSpec {
    pub fn new(name: impl Into<String>, kind: AttributeKindSpec) -> Self {
        Self {
            name: name.into(),
            kind,
            mandatory: false,
            indexed: false,
            is_virtual: false,
            cascade_delete: false,
            null_on_delete: false,
        }
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, AttributeKindSpec::String)
    }

    pub fn decimal(name: impl Into<String>, length: u32, decimal_places: u32) -> Self {
        Self::new(
            name,
            AttributeKindSpec::Decimal {
                length,
                decimal_places,
            },
        )
    }

    /// Integer-valued decimal.
    pub fn integer(name: impl Into<String>) -> Self {
        Self::decimal(name, 19, 0)
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, AttributeKindSpec::Boolean)
    }

    pub fn date(name: impl Into<String>) -> Self {
        Self::new(name, AttributeKindSpec::Date)
    }

    pub fn binary(name: impl Into<String>) -> Self {
        Self::new(name, AttributeKindSpec::Binary)
    }

    pub fn crypto(name: impl Into<String>) -> Self {
        Self::new(name, AttributeKindSpec::Crypto)
    }

    pub fn json(name: impl Into<String>) -> Self {
        Self::new(name, AttributeKindSpec::Json)
    }

    pub fn reference(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(
            name,
            AttributeKindSpec::Reference {
                target: target.into(),
            },
        )
    }

    /// Inverse of `holder.attribute`, which must be a reference attribute.
    pub fn inverse(
        name: impl Into<String>,
        holder: impl Into<String>,
        attribute: impl Into<String>,
    ) -> Self {
        Self::new(
            name,
            AttributeKindSpec::Inverse {
                holder: holder.into(),
                attribute: attribute.into(),
                delete_orphans: false,
            },
        )
    }

    pub fn mandatory(mut self) -> Self {
        self.mandatory = true;
        self
    }

    pub fn indexed(mut self) -> Self {
        self.indexed = true;
        self
    }

    pub fn virtual_attr(mut self) -> Self {
        self.is_virtual = true;
        self
    }

    pub fn cascade_delete(mut self) -> Self {
        self.cascade_delete = true;
        self
    }

    pub fn null_on_delete(mut self) -> Self {
        self.null_on_delete = true;
        self
    }

    /// Only meaningful on inverse attributes.
    pub fn delete_orphans(mut self) -> Self {
        if let AttributeKindSpec::Inverse { delete_orphans, .. } = &mut self.kind {
            *delete_orphans = true;
        }
        self
    }
}
