use serde::{Deserialize, Serialize};

/// A reference to a type as it appears in a property, parameter, or field
/// signature. Arrays and generic instantiations are recognized structurally;
/// everything else is a plain full name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeRef {
    /// A non-generic, non-array type, e.g. `System.Int32` or
    /// `Elements.UserInfo`. Nested types use `/` as the separator, e.g.
    /// `Elements.ApiManager/AccountLoginPostParam`.
    Named { full_name: String },
    /// A single-dimension array of the element type.
    Array { element: Box<TypeRef> },
    /// A generic instantiation: the open generic's full name (e.g.
    /// `System.Collections.Generic.List`1`) plus its type arguments.
    Generic { element: String, args: Vec<TypeRef> },
}

impl TypeRef {
    pub fn named(full_name: impl Into<String>) -> Self {
        TypeRef::Named {
            full_name: full_name.into(),
        }
    }

    /// The full name when this is a plain named reference.
    pub fn full_name(&self) -> Option<&str> {
        match self {
            TypeRef::Named { full_name } => Some(full_name),
            _ => None,
        }
    }
}

/// Last segment of a full type name: strips the namespace and, for nested
/// types, the declaring-type path.
pub fn simple_name(full_name: &str) -> &str {
    let tail = full_name.rsplit('/').next().unwrap_or(full_name);
    tail.rsplit('.').next().unwrap_or(tail)
}

/// Declaring-type full name for a nested type (`A.B/C` -> `A.B`), or `None`
/// for a top-level type.
pub fn declaring_type(full_name: &str) -> Option<&str> {
    full_name.rsplit_once('/').map(|(decl, _)| decl)
}

fn default_true() -> bool {
    true
}

/// One public-surface property: declared name and declared type. The dumper
/// records accessibility so the resolver can apply the public/non-static/
/// readable filter itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyDef {
    pub name: String,
    #[serde(rename = "type")]
    pub type_ref: TypeRef,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default = "default_true")]
    pub is_public: bool,
    #[serde(default = "default_true")]
    pub readable: bool,
}

/// One enum constant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstantDef {
    pub name: String,
    pub value: i32,
}

/// One method parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamDef {
    pub name: String,
    #[serde(rename = "type")]
    pub type_ref: TypeRef,
}

/// An abstracted instruction. Only the opcode classes the extractors pattern
/// match on are distinguished; the dumper collapses every other opcode to
/// [`Instruction::Other`] so instruction positions stay faithful to the
/// original stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Instruction {
    /// Duplicate top of stack.
    Dup,
    /// Integer constant load, already decoded across every encoding width
    /// (short forms, `ldc.i4.s`, full `ldc.i4`).
    LdcI4 { value: i32 },
    /// String constant load.
    #[serde(rename = "ldstr")]
    LdStr { value: String },
    /// Call to a named method on a named type.
    Call {
        target_type: String,
        method: String,
    },
    /// Object construction; `type_name` is the constructed type's full name.
    #[serde(rename = "newobj")]
    NewObj { type_name: String },
    /// Any opcode the extractors never match on.
    #[serde(other)]
    Other,
}

/// One method: name, parameters, and a linear instruction stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodDef {
    pub name: String,
    /// True for runtime-special members such as the static initializer.
    #[serde(default)]
    pub is_special_name: bool,
    #[serde(default)]
    pub params: Vec<ParamDef>,
    #[serde(default)]
    pub instructions: Vec<Instruction>,
}

/// One declared type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeDef {
    pub full_name: String,
    #[serde(default)]
    pub is_enum: bool,
    #[serde(default)]
    pub properties: Vec<PropertyDef>,
    /// Constant fields; populated for enum-like types.
    #[serde(default)]
    pub constants: Vec<ConstantDef>,
    #[serde(default)]
    pub methods: Vec<MethodDef>,
}

impl TypeDef {
    pub fn simple_name(&self) -> &str {
        simple_name(&self.full_name)
    }
}

/// One compiled module's declared types, as dumped by the external
/// disassembler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleMetadata {
    pub name: String,
    pub types: Vec<TypeDef>,
}

impl ModuleMetadata {
    pub fn get_type(&self, full_name: &str) -> Option<&TypeDef> {
        self.types.iter().find(|t| t.full_name == full_name)
    }
}
