//! Content-type schemas and the registry that resolves them
//!
//! A [`Schema`] is a named type definition: an ordered mapping from
//! attribute name to [`Attribute`] descriptor. Schemas are resolved on
//! demand through a [`SchemaRegistry`] keyed by a string uid, and are
//! read-only for the duration of a traversal.

pub mod attribute;
pub mod registry;

pub use attribute::{Attribute, AttributeKind, RelationKind};
pub use registry::{InMemoryRegistry, SchemaRegistry};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Uid of the built-in file type every media attribute targets
pub const FILE_UID: &str = "builtin::file";

/// Whether a schema describes a collection or a single entry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SchemaKind {
    #[default]
    CollectionType,
    SingleType,
}

/// A named content-type definition.
///
/// Attribute order is preserved (declaration order) so operations that
/// enumerate attributes, like wildcard populate expansion, are stable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schema {
    /// Type identifier, e.g. `"api::article"`
    pub uid: String,

    #[serde(default)]
    pub kind: SchemaKind,

    /// Attribute name → descriptor, in declaration order
    pub attributes: IndexMap<String, Attribute>,

    /// Attribute names the schema marks private regardless of their own flag
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub private_attributes: Vec<String>,
}

impl Schema {
    /// Start building a schema with the given uid
    pub fn builder(uid: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder {
            uid: uid.into(),
            kind: SchemaKind::CollectionType,
            attributes: IndexMap::new(),
            private_attributes: Vec::new(),
        }
    }

    /// Look up an attribute descriptor by name
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    /// Check whether an attribute is private, either by its own flag or by
    /// a schema-level override
    pub fn is_private(&self, name: &str, attribute: &Attribute) -> bool {
        attribute.private || self.private_attributes.iter().any(|n| n == name)
    }

    /// Attributes that can appear in a populate clause, in declaration order
    pub fn populatable_attributes(&self) -> impl Iterator<Item = (&str, &Attribute)> {
        self.attributes
            .iter()
            .filter(|(_, attr)| attr.kind.is_populatable())
            .map(|(name, attr)| (name.as_str(), attr))
    }

    /// The built-in file schema targeted by media attributes
    pub fn file() -> Self {
        Schema::builder(FILE_UID)
            .attribute("name", Attribute::scalar())
            .attribute("alternative_text", Attribute::scalar())
            .attribute("url", Attribute::scalar())
            .attribute("mime", Attribute::scalar())
            .attribute("size", Attribute::scalar())
            .attribute("hash", Attribute::scalar().private())
            .build()
    }
}

/// Fluent builder for [`Schema`]
pub struct SchemaBuilder {
    uid: String,
    kind: SchemaKind,
    attributes: IndexMap<String, Attribute>,
    private_attributes: Vec<String>,
}

impl SchemaBuilder {
    /// Declare an attribute
    pub fn attribute(mut self, name: impl Into<String>, attribute: Attribute) -> Self {
        self.attributes.insert(name.into(), attribute);
        self
    }

    /// Mark an attribute name private at the schema level
    pub fn private_attribute(mut self, name: impl Into<String>) -> Self {
        self.private_attributes.push(name.into());
        self
    }

    /// Make this a single-type schema
    pub fn single_type(mut self) -> Self {
        self.kind = SchemaKind::SingleType;
        self
    }

    pub fn build(self) -> Schema {
        Schema {
            uid: self.uid,
            kind: self.kind,
            attributes: self.attributes,
            private_attributes: self.private_attributes,
        }
    }
}
