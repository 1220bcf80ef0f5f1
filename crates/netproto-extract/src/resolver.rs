//! Type graph resolution.
//!
//! Turns runtime type references into portable [`FieldType`] trees and walks
//! the graph of user-defined types reachable from the recovered call sites.
//! The analyzed application wraps most primitives in anti-cheat "obscured"
//! value types, so the scalar table aliases each wrapper to the same tag as
//! the primitive it hides.

use anyhow::Result;
use netproto_metadata::{simple_name, ModuleMetadata, TypeDef, TypeRef};
use netproto_schema::{ApiCall, ClassType, EnumType, FieldType, Protocol};
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

use crate::error::ExtractError;
use crate::names::NameMap;

const LIST_GENERIC: &str = "System.Collections.Generic.List`1";
const DICT_GENERIC: &str = "System.Collections.Generic.Dictionary`2";

/// Scalar tag for a known primitive or obscured-wrapper identity. Exactly
/// one canonical tag per group; `None` means the identity is not a scalar.
fn scalar_tag(full_name: &str) -> Option<&'static str> {
    match full_name {
        "System.Boolean" | "CodeStage.AntiCheat.ObscuredTypes.ObscuredBool" => Some("bool"),
        "System.Int32" | "CodeStage.AntiCheat.ObscuredTypes.ObscuredInt" => Some("int"),
        "System.Int64"
        | "CodeStage.AntiCheat.ObscuredTypes.ObscuredLong"
        | "System.DateTime" => Some("long"),
        "System.Single" | "CodeStage.AntiCheat.ObscuredTypes.ObscuredFloat" => Some("float"),
        "System.Double" | "CodeStage.AntiCheat.ObscuredTypes.ObscuredDouble" => Some("double"),
        "System.String" | "CodeStage.AntiCheat.ObscuredTypes.ObscuredString" => Some("string"),
        _ => None,
    }
}

/// Resolves type references against one module. The resolver holds no
/// mutable state of its own; the caller owns the work-list of referenced
/// types so the "already resolved" set stays local to one extraction run.
pub struct TypeResolver<'a> {
    module: &'a ModuleMetadata,
    names: &'a NameMap,
    app_namespace: &'a str,
}

impl<'a> TypeResolver<'a> {
    pub fn new(module: &'a ModuleMetadata, names: &'a NameMap, app_namespace: &'a str) -> Self {
        TypeResolver {
            module,
            names,
            app_namespace,
        }
    }

    /// Resolves one field-position type reference. Returns the portable type
    /// plus the full names of user-defined types it references, which the
    /// caller must resolve structurally (once each, via its work-list).
    pub fn resolve_field(&self, type_ref: &TypeRef) -> Result<(FieldType, Vec<String>)> {
        let mut refs = Vec::new();
        let field = self.resolve_field_inner(type_ref, &mut refs)?;
        Ok((field, refs))
    }

    fn resolve_field_inner(&self, type_ref: &TypeRef, refs: &mut Vec<String>) -> Result<FieldType> {
        match type_ref {
            TypeRef::Array { element } => {
                let elem = self.resolve_field_inner(element, refs)?;
                Ok(FieldType::list(elem))
            }
            TypeRef::Generic { element, args } => match element.as_str() {
                LIST_GENERIC if args.len() == 1 => {
                    let elem = self.resolve_field_inner(&args[0], refs)?;
                    Ok(FieldType::list(elem))
                }
                DICT_GENERIC if args.len() == 2 => {
                    let key = self.resolve_field_inner(&args[0], refs)?;
                    let value = self.resolve_field_inner(&args[1], refs)?;
                    Ok(FieldType::dict(key, value))
                }
                other => Err(ExtractError::UnsupportedShape(format!(
                    "generic `{}` with {} argument(s)",
                    other,
                    args.len()
                ))
                .into()),
            },
            TypeRef::Named { full_name } => {
                if let Some(tag) = scalar_tag(full_name) {
                    return Ok(FieldType::scalar(tag));
                }
                // The analysis only understands one application's type
                // universe; anything outside it is a contract violation.
                if !full_name.starts_with(self.app_namespace) {
                    return Err(ExtractError::UnsupportedShape(format!(
                        "`{}` is neither a known scalar nor in namespace `{}`",
                        full_name, self.app_namespace
                    ))
                    .into());
                }
                refs.push(full_name.clone());
                Ok(FieldType::reference(simple_name(full_name)))
            }
        }
    }

    /// Resolves a top-level class: walks every public non-static readable
    /// property in declaration order, rewriting property names through the
    /// name map. Returns the class plus all referenced user-defined types.
    pub fn resolve_class(&self, def: &TypeDef) -> Result<(ClassType, Vec<String>)> {
        let mut class = ClassType::new(def.simple_name());
        let mut refs = Vec::new();
        for prop in &def.properties {
            if prop.is_static || !prop.is_public || !prop.readable {
                continue;
            }
            let field = self.resolve_field_inner(&prop.type_ref, &mut refs)?;
            class.insert_field(self.names.rewrite(&prop.name), field);
        }
        Ok((class, refs))
    }

    pub fn resolve_enum(def: &TypeDef) -> EnumType {
        let mut out = EnumType::new(def.simple_name());
        for c in &def.constants {
            out.insert_value(&c.name, c.value);
        }
        out
    }
}

/// Assembles one backend's [`Protocol`] from its recovered call sites.
///
/// For each call site the declared request/response type names are resolved
/// into root classes, the call's names are rewritten to the resolved simple
/// names, and its URL is looked up in `urls` (empty when unresolved). Every
/// user-defined type referenced from a root is resolved structurally exactly
/// once — the `resolved` identity set is what terminates cyclic type graphs —
/// and lands in `common` (classes) or `enums`. `seed_types` are resolved the
/// same way even though no call site references them.
pub fn resolve_protocol(
    module: &ModuleMetadata,
    names: &NameMap,
    app_namespace: &str,
    urls: &BTreeMap<String, String>,
    mut apis: Vec<ApiCall>,
    seed_types: &[String],
) -> Result<Protocol> {
    let resolver = TypeResolver::new(module, names, app_namespace);
    let mut resolved: HashSet<String> = HashSet::new();
    let mut common: Vec<ClassType> = Vec::new();
    let mut enums: Vec<EnumType> = Vec::new();
    let mut request: Vec<ClassType> = Vec::new();
    let mut response: Vec<ClassType> = Vec::new();

    fn resolve_named(
        resolver: &TypeResolver<'_>,
        module: &ModuleMetadata,
        full_name: &str,
        resolved: &mut HashSet<String>,
        common: &mut Vec<ClassType>,
        enums: &mut Vec<EnumType>,
    ) -> Result<()> {
        if !resolved.insert(full_name.to_string()) {
            return Ok(());
        }
        let def = module
            .get_type(full_name)
            .ok_or_else(|| ExtractError::missing_anchor("type", full_name))?;
        if def.is_enum {
            enums.push(TypeResolver::resolve_enum(def));
            return Ok(());
        }
        let (class, refs) = resolver.resolve_class(def)?;
        // Dependencies first, so a forward pass over `common` mostly sees
        // definitions before uses; cycles fall back to first-visit order.
        for r in refs {
            resolve_named(resolver, module, &r, resolved, common, enums)?;
        }
        common.push(class);
        Ok(())
    }

    for api in &mut apis {
        let req_def = module
            .get_type(&api.request)
            .ok_or_else(|| ExtractError::missing_anchor("request type", &api.request))?;
        let resp_def = module
            .get_type(&api.response)
            .ok_or_else(|| ExtractError::missing_anchor("response type", &api.response))?;

        let (req_class, req_refs) = resolver.resolve_class(req_def)?;
        let (resp_class, resp_refs) = resolver.resolve_class(resp_def)?;
        for r in req_refs.into_iter().chain(resp_refs) {
            resolve_named(
                &resolver, module, &r, &mut resolved, &mut common, &mut enums,
            )?;
        }

        api.request = req_class.name.clone();
        api.response = resp_class.name.clone();
        api.url = urls.get(&api.url).cloned().unwrap_or_default();
        request.push(req_class);
        response.push(resp_class);
    }

    for seed in seed_types {
        resolve_named(
            &resolver, module, seed, &mut resolved, &mut common, &mut enums,
        )?;
    }

    debug!(
        apis = apis.len(),
        common = common.len(),
        enums = enums.len(),
        "resolved protocol type graph"
    );

    Ok(Protocol {
        apis,
        common,
        request,
        response,
        enums,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use netproto_metadata::PropertyDef;

    fn prop(name: &str, type_ref: TypeRef) -> PropertyDef {
        PropertyDef {
            name: name.to_string(),
            type_ref,
            is_static: false,
            is_public: true,
            readable: true,
        }
    }

    fn class_def(full_name: &str, properties: Vec<PropertyDef>) -> TypeDef {
        TypeDef {
            full_name: full_name.to_string(),
            is_enum: false,
            properties,
            constants: vec![],
            methods: vec![],
        }
    }

    fn empty_module() -> ModuleMetadata {
        ModuleMetadata {
            name: "main".to_string(),
            types: vec![],
        }
    }

    #[test]
    fn test_scalar_and_obscured_identities_alias_to_one_tag() {
        let module = empty_module();
        let names = NameMap::new();
        let resolver = TypeResolver::new(&module, &names, "Elements.");

        for (full, tag) in [
            ("System.Int32", "int"),
            ("CodeStage.AntiCheat.ObscuredTypes.ObscuredInt", "int"),
            ("System.DateTime", "long"),
            ("CodeStage.AntiCheat.ObscuredTypes.ObscuredString", "string"),
        ] {
            let (field, refs) = resolver.resolve_field(&TypeRef::named(full)).unwrap();
            assert_eq!(field, FieldType::scalar(tag), "{}", full);
            assert!(refs.is_empty());
        }
    }

    #[test]
    fn test_container_nesting_round_trips() {
        let module = empty_module();
        let names = NameMap::new();
        let resolver = TypeResolver::new(&module, &names, "Elements.");

        // Dictionary<string, List<int[]>>
        let ty = TypeRef::Generic {
            element: DICT_GENERIC.to_string(),
            args: vec![
                TypeRef::named("System.String"),
                TypeRef::Generic {
                    element: LIST_GENERIC.to_string(),
                    args: vec![TypeRef::Array {
                        element: Box::new(TypeRef::named("System.Int32")),
                    }],
                },
            ],
        };
        let (field, refs) = resolver.resolve_field(&ty).unwrap();
        assert!(refs.is_empty());
        assert_eq!(
            field,
            FieldType::dict(
                FieldType::scalar("string"),
                FieldType::list(FieldType::list(FieldType::scalar("int"))),
            )
        );
    }

    #[test]
    fn test_unknown_generic_is_unsupported_shape() {
        let module = empty_module();
        let names = NameMap::new();
        let resolver = TypeResolver::new(&module, &names, "Elements.");

        let ty = TypeRef::Generic {
            element: "System.Collections.Generic.HashSet`1".to_string(),
            args: vec![TypeRef::named("System.Int32")],
        };
        let err = resolver.resolve_field(&ty).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ExtractError>(),
            Some(ExtractError::UnsupportedShape(_))
        ));
    }

    #[test]
    fn test_identity_outside_namespace_is_fatal() {
        let module = empty_module();
        let names = NameMap::new();
        let resolver = TypeResolver::new(&module, &names, "Elements.");

        let err = resolver
            .resolve_field(&TypeRef::named("UnityEngine.Vector3"))
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ExtractError>(),
            Some(ExtractError::UnsupportedShape(_))
        ));
    }

    #[test]
    fn test_user_type_yields_reference_for_worklist() {
        let module = empty_module();
        let names = NameMap::new();
        let resolver = TypeResolver::new(&module, &names, "Elements.");

        let (field, refs) = resolver
            .resolve_field(&TypeRef::named("Elements.UserInfo"))
            .unwrap();
        assert_eq!(field, FieldType::reference("UserInfo"));
        assert_eq!(refs, vec!["Elements.UserInfo"]);
    }

    #[test]
    fn test_resolve_class_applies_name_map_and_keeps_order() {
        let module = empty_module();
        let mut names = NameMap::new();
        names.observe("user_id");
        let resolver = TypeResolver::new(&module, &names, "Elements.");

        let def = class_def(
            "Elements.UserInfo",
            vec![
                prop("UserId", TypeRef::named("System.Int64")),
                prop("Name", TypeRef::named("System.String")),
            ],
        );
        let (class, refs) = resolver.resolve_class(&def).unwrap();
        assert!(refs.is_empty());
        assert_eq!(class.name, "UserInfo");
        assert_eq!(class.fields[0].0, "user_id");
        assert_eq!(class.fields[1].0, "Name");
    }

    #[test]
    fn test_resolve_class_skips_static_and_non_public_properties() {
        let module = empty_module();
        let names = NameMap::new();
        let resolver = TypeResolver::new(&module, &names, "Elements.");

        let mut hidden = prop("Hidden", TypeRef::named("System.Int32"));
        hidden.is_public = false;
        let mut shared = prop("Shared", TypeRef::named("System.Int32"));
        shared.is_static = true;

        let def = class_def(
            "Elements.UserInfo",
            vec![hidden, shared, prop("Level", TypeRef::named("System.Int32"))],
        );
        let (class, _) = resolver.resolve_class(&def).unwrap();
        assert_eq!(class.fields.len(), 1);
        assert_eq!(class.fields[0].0, "Level");
    }

    #[test]
    fn test_cyclic_type_graph_terminates_with_one_class_per_name() {
        // A has a field of B, B has a field of A.
        let module = ModuleMetadata {
            name: "main".to_string(),
            types: vec![
                class_def(
                    "Elements.A",
                    vec![prop("b", TypeRef::named("Elements.B"))],
                ),
                class_def(
                    "Elements.B",
                    vec![prop("a", TypeRef::named("Elements.A"))],
                ),
                class_def(
                    "Elements.RootPostParam",
                    vec![prop("a", TypeRef::named("Elements.A"))],
                ),
                class_def("Elements.RootResponseData", vec![]),
            ],
        };
        let names = NameMap::new();
        let apis = vec![ApiCall {
            url: "Root".to_string(),
            request: "Elements.RootPostParam".to_string(),
            response: "Elements.RootResponseData".to_string(),
        }];
        let urls = BTreeMap::from([("Root".to_string(), "root/index".to_string())]);

        let protocol =
            resolve_protocol(&module, &names, "Elements.", &urls, apis, &[]).unwrap();

        let mut common_names: Vec<&str> =
            protocol.common.iter().map(|c| c.name.as_str()).collect();
        common_names.sort();
        assert_eq!(common_names, vec!["A", "B"]);
        assert_eq!(protocol.apis[0].url, "root/index");
        assert_eq!(protocol.apis[0].request, "RootPostParam");
        assert_eq!(protocol.apis[0].response, "RootResponseData");
    }

    #[test]
    fn test_unresolved_url_becomes_empty() {
        let module = ModuleMetadata {
            name: "main".to_string(),
            types: vec![
                class_def("Elements.RootPostParam", vec![]),
                class_def("Elements.RootResponseData", vec![]),
            ],
        };
        let names = NameMap::new();
        let apis = vec![ApiCall {
            url: "NotInTable".to_string(),
            request: "Elements.RootPostParam".to_string(),
            response: "Elements.RootResponseData".to_string(),
        }];

        let protocol =
            resolve_protocol(&module, &names, "Elements.", &BTreeMap::new(), apis, &[]).unwrap();
        assert_eq!(protocol.apis[0].url, "");
    }

    #[test]
    fn test_seed_enum_is_resolved_without_any_api() {
        let module = ModuleMetadata {
            name: "main".to_string(),
            types: vec![TypeDef {
                full_name: "Elements.eGachaDrawType".to_string(),
                is_enum: true,
                properties: vec![],
                constants: vec![netproto_metadata::ConstantDef {
                    name: "Single".to_string(),
                    value: 1,
                }],
                methods: vec![],
            }],
        };
        let names = NameMap::new();
        let protocol = resolve_protocol(
            &module,
            &names,
            "Elements.",
            &BTreeMap::new(),
            vec![],
            &["Elements.eGachaDrawType".to_string()],
        )
        .unwrap();
        assert_eq!(protocol.enums.len(), 1);
        assert_eq!(protocol.enums[0].name, "eGachaDrawType");
        assert_eq!(protocol.enums[0].value("Single"), Some(1));
    }
}
