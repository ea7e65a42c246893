//! Attribute descriptors
//!
//! [`AttributeKind`] is a closed discriminated union: adding a kind forces
//! every dispatch site in the traversal engine to be revisited at compile
//! time instead of silently falling back to scalar treatment.

use serde::{Deserialize, Serialize};

/// Relation cardinality, including the polymorphic "morph" family whose
/// target type is only known per entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RelationKind {
    OneToOne,
    OneToMany,
    ManyToOne,
    ManyToMany,
    MorphOne,
    MorphMany,
    MorphToOne,
    MorphToMany,
}

impl RelationKind {
    /// Polymorphic relations have no fixed target schema
    pub fn is_morph(self) -> bool {
        matches!(
            self,
            RelationKind::MorphOne
                | RelationKind::MorphMany
                | RelationKind::MorphToOne
                | RelationKind::MorphToMany
        )
    }

    /// Whether the relation holds a list of entries
    pub fn is_to_many(self) -> bool {
        matches!(
            self,
            RelationKind::OneToMany
                | RelationKind::ManyToMany
                | RelationKind::MorphMany
                | RelationKind::MorphToMany
        )
    }
}

/// The kind tag of an attribute descriptor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AttributeKind {
    /// Plain value (string, number, boolean, date, ...)
    Scalar,

    /// Scalar that must never be emitted on output
    Password,

    /// Reference to another content type
    Relation {
        relation: RelationKind,
        /// Target uid; `None` for morph relations
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target: Option<String>,
    },

    /// Nested structured value typed by a component schema
    Component {
        component: String,
        #[serde(default)]
        repeatable: bool,
    },

    /// Polymorphic list; each entry picks its type from `components` via a
    /// `__component` discriminator
    #[serde(rename = "dynamiczone")]
    DynamicZone { components: Vec<String> },

    /// File reference, always targeting the built-in file type
    Media {
        #[serde(default)]
        multiple: bool,
    },
}

impl AttributeKind {
    pub fn is_relation(&self) -> bool {
        matches!(self, AttributeKind::Relation { .. })
    }

    pub fn is_component(&self) -> bool {
        matches!(self, AttributeKind::Component { .. })
    }

    pub fn is_dynamic_zone(&self) -> bool {
        matches!(self, AttributeKind::DynamicZone { .. })
    }

    pub fn is_media(&self) -> bool {
        matches!(self, AttributeKind::Media { .. })
    }

    /// Kinds that make sense in a populate clause
    pub fn is_populatable(&self) -> bool {
        self.is_relation() || self.is_component() || self.is_dynamic_zone() || self.is_media()
    }

    /// Whether this is a polymorphic relation
    pub fn is_morph_relation(&self) -> bool {
        matches!(
            self,
            AttributeKind::Relation { relation, .. } if relation.is_morph()
        )
    }
}

/// A named field of a schema: a kind plus visibility flags
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    #[serde(flatten)]
    pub kind: AttributeKind,

    /// Never emitted on output when set
    #[serde(default)]
    pub private: bool,

    /// Accepted on input when set
    #[serde(default = "default_true")]
    pub writable: bool,

    /// Exposed to enumeration (wildcard expansion) when set
    #[serde(default = "default_true")]
    pub visible: bool,
}

fn default_true() -> bool {
    true
}

impl Attribute {
    fn new(kind: AttributeKind) -> Self {
        Attribute {
            kind,
            private: false,
            writable: true,
            visible: true,
        }
    }

    pub fn scalar() -> Self {
        Attribute::new(AttributeKind::Scalar)
    }

    pub fn password() -> Self {
        Attribute::new(AttributeKind::Password)
    }

    pub fn relation(relation: RelationKind, target: impl Into<String>) -> Self {
        Attribute::new(AttributeKind::Relation {
            relation,
            target: Some(target.into()),
        })
    }

    /// Polymorphic relation with no fixed target
    pub fn morph_relation(relation: RelationKind) -> Self {
        Attribute::new(AttributeKind::Relation {
            relation,
            target: None,
        })
    }

    pub fn component(component: impl Into<String>) -> Self {
        Attribute::new(AttributeKind::Component {
            component: component.into(),
            repeatable: false,
        })
    }

    pub fn repeatable_component(component: impl Into<String>) -> Self {
        Attribute::new(AttributeKind::Component {
            component: component.into(),
            repeatable: true,
        })
    }

    pub fn dynamic_zone(components: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Attribute::new(AttributeKind::DynamicZone {
            components: components.into_iter().map(Into::into).collect(),
        })
    }

    pub fn media() -> Self {
        Attribute::new(AttributeKind::Media { multiple: false })
    }

    pub fn multiple_media() -> Self {
        Attribute::new(AttributeKind::Media { multiple: true })
    }

    /// Mark the attribute private
    pub fn private(mut self) -> Self {
        self.private = true;
        self
    }

    /// Mark the attribute read-only (rejected on input)
    pub fn read_only(mut self) -> Self {
        self.writable = false;
        self
    }

    /// Hide the attribute from enumeration
    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }
}
