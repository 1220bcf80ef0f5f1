//! Portable protocol schema types.
//!
//! These are the recovered shapes of a client/server protocol: field types,
//! classes, enums, call-site entries, and the [`Protocol`] aggregate that
//! bundles everything extracted from one compiled backend. They carry no
//! behavior beyond structural identity and ordered insert/overwrite helpers;
//! the extraction and merge crates do the actual work.

use serde::{Deserialize, Serialize};

/// List container tag. One type parameter.
pub const TAG_LIST: &str = "List";
/// Map container tag. Two type parameters (key, value).
pub const TAG_DICT: &str = "Dict";

/// The terminal scalar tags. A [`FieldType`] with one of these has no
/// parameters; anything else that is not a container tag is a reference to a
/// [`ClassType`] or [`EnumType`] by simple name.
pub const SCALAR_TAGS: [&str; 6] = ["bool", "int", "long", "float", "double", "string"];

/// One resolved field type: a scalar tag, a container tag wrapping resolved
/// element types, or a named reference to another class/enum in the same
/// [`Protocol`].
///
/// Invariant: `parameters.len()` is fully determined by `base_type` — 0 for
/// scalars and named references, 1 for [`TAG_LIST`], 2 for [`TAG_DICT`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldType {
    pub base_type: String,
    pub parameters: Vec<FieldType>,
}

impl FieldType {
    pub fn scalar(tag: &str) -> Self {
        FieldType {
            base_type: tag.to_string(),
            parameters: Vec::new(),
        }
    }

    pub fn reference(name: impl Into<String>) -> Self {
        FieldType {
            base_type: name.into(),
            parameters: Vec::new(),
        }
    }

    pub fn list(element: FieldType) -> Self {
        FieldType {
            base_type: TAG_LIST.to_string(),
            parameters: vec![element],
        }
    }

    pub fn dict(key: FieldType, value: FieldType) -> Self {
        FieldType {
            base_type: TAG_DICT.to_string(),
            parameters: vec![key, value],
        }
    }

    pub fn is_scalar(&self) -> bool {
        SCALAR_TAGS.contains(&self.base_type.as_str())
    }

    pub fn is_container(&self) -> bool {
        self.base_type == TAG_LIST || self.base_type == TAG_DICT
    }

    /// Every class/enum name this type refers to, recursing through container
    /// parameters. Scalars and containers-of-scalars yield nothing.
    pub fn referenced_names(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_referenced(&mut out);
        out
    }

    fn collect_referenced<'a>(&'a self, out: &mut Vec<&'a str>) {
        if self.is_container() {
            for p in &self.parameters {
                p.collect_referenced(out);
            }
        } else if !self.is_scalar() {
            out.push(&self.base_type);
        }
    }
}

/// A recovered class: name plus normalized field names mapped to field types,
/// in property declaration order. Insertion order is preserved because the
/// emitter renders fields in a single forward pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassType {
    pub name: String,
    pub fields: Vec<(String, FieldType)>,
}

impl ClassType {
    pub fn new(name: impl Into<String>) -> Self {
        ClassType {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Inserts a field, overwriting in place if the name already exists so
    /// declaration order is kept stable.
    pub fn insert_field(&mut self, name: impl Into<String>, ty: FieldType) {
        let name = name.into();
        if let Some(slot) = self.fields.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = ty;
        } else {
            self.fields.push((name, ty));
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldType> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, t)| t)
    }
}

/// A recovered integer enumeration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumType {
    pub name: String,
    pub values: Vec<(String, i32)>,
}

impl EnumType {
    pub fn new(name: impl Into<String>) -> Self {
        EnumType {
            name: name.into(),
            values: Vec::new(),
        }
    }

    pub fn insert_value(&mut self, name: impl Into<String>, value: i32) {
        let name = name.into();
        if let Some(slot) = self.values.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = value;
        } else {
            self.values.push((name, value));
        }
    }

    pub fn value(&self, name: &str) -> Option<i32> {
        self.values.iter().find(|(n, _)| n == name).map(|(_, v)| *v)
    }
}

/// One outbound call site: resolved URL path (empty if unresolved), request
/// class name, response class name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiCall {
    pub url: String,
    pub request: String,
    pub response: String,
}

/// Everything recovered from one compiled backend. Two of these (one per
/// backend) are merged into the final schema handed to the emitter.
///
/// `common` holds types reachable from requests/responses that are neither a
/// request nor a response root. Names are unique within each list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Protocol {
    pub apis: Vec<ApiCall>,
    pub common: Vec<ClassType>,
    pub request: Vec<ClassType>,
    pub response: Vec<ClassType>,
    pub enums: Vec<EnumType>,
}
