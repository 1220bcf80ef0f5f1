//! Backend-neutral assembly metadata model.
//!
//! The extraction pipeline never touches a compiled binary directly. An
//! external disassembler dumps each backend's main module to JSON in the
//! shape modeled here: declared types with their public properties, enum
//! constants, and methods, where each method body is a linear sequence of
//! abstracted instructions. This crate is the whole provider surface:
//!
//! - [`model`]: the [`ModuleMetadata`](model::ModuleMetadata) tree and the
//!   abstracted [`Instruction`](model::Instruction) opcodes
//! - [`load`]: JSON readers for module dumps and the string-literal hint file

pub mod load;
pub mod model;

pub use load::{read_hint_literals, read_module};
pub use model::{
    declaring_type, simple_name, ConstantDef, Instruction, MethodDef, ModuleMetadata, ParamDef,
    PropertyDef, TypeDef, TypeRef,
};
