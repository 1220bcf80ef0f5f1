//! Dialect A: the JIT-backend build.
//!
//! This build keeps full method bodies, so both tables are recovered from
//! instruction streams: the endpoint-id -> URL table from the URL table
//! type's static initializer, and the call-site table from the manager
//! type's builder methods.

use anyhow::Result;
use netproto_metadata::{Instruction, MethodDef, ModuleMetadata, TypeDef, TypeRef};
use netproto_schema::{ApiCall, Protocol};
use std::collections::BTreeMap;
use tracing::{debug, trace};

use crate::cursor::InstrCursor;
use crate::dialect::{Anchors, ProtocolExtractor};
use crate::error::ExtractError;
use crate::names::NameMap;
use crate::resolver::resolve_protocol;

pub struct MonoExtractor {
    pub anchors: Anchors,
    pub seed_types: Vec<String>,
}

impl MonoExtractor {
    pub fn new(seed_types: Vec<String>) -> Self {
        MonoExtractor {
            anchors: Anchors::default(),
            seed_types,
        }
    }

    fn anchor_type<'a>(
        &self,
        module: &'a ModuleMetadata,
        full_name: &str,
    ) -> Result<&'a TypeDef> {
        module
            .get_type(full_name)
            .ok_or_else(|| ExtractError::missing_anchor("type", full_name).into())
    }

    /// Logical id -> constant name, from the endpoint-id enumeration.
    fn endpoint_names(&self, module: &ModuleMetadata) -> Result<BTreeMap<i32, String>> {
        let def = self.anchor_type(module, &self.anchors.endpoint_enum)?;
        Ok(def
            .constants
            .iter()
            .map(|c| (c.value, c.name.clone()))
            .collect())
    }

    /// Recovers the logical-name -> URL table from the static initializer.
    ///
    /// The table is built by repeated `dup; ldc.i4 <id>; ldstr <url>` triples
    /// interleaved with unrelated instructions. A forward scan with a fixed
    /// 3-instruction window picks out the matching triples; anything else is
    /// skipped.
    fn read_url_table(
        &self,
        module: &ModuleMetadata,
        id_names: &BTreeMap<i32, String>,
    ) -> Result<BTreeMap<String, String>> {
        let table_type = self.anchor_type(module, &self.anchors.url_table_type)?;
        let cctor = table_type
            .methods
            .iter()
            .find(|m| m.is_special_name && m.name == ".cctor")
            .ok_or_else(|| {
                ExtractError::missing_anchor("static initializer", &self.anchors.url_table_type)
            })?;

        let mut urls = BTreeMap::new();
        let mut cur = InstrCursor::new(&cctor.instructions);
        while !cur.is_done() {
            if let (Some(Instruction::Dup), Some(Instruction::LdcI4 { value }), Some(Instruction::LdStr { value: url })) =
                (cur.current(), cur.peek(1), cur.peek(2))
            {
                let name = id_names.get(value).ok_or_else(|| {
                    ExtractError::missing_anchor("endpoint id constant", value.to_string())
                })?;
                if urls.insert(name.clone(), url.clone()).is_some() {
                    return Err(ExtractError::AmbiguousMatch(format!(
                        "two URL table entries for endpoint `{}`",
                        name
                    ))
                    .into());
                }
            }
            cur.advance();
        }
        debug!(entries = urls.len(), "recovered URL table");
        Ok(urls)
    }

    fn read_call_sites(
        &self,
        module: &ModuleMetadata,
        id_names: &BTreeMap<i32, String>,
    ) -> Result<Vec<ApiCall>> {
        let a = &self.anchors;
        let mgr = self.anchor_type(module, &a.manager_type)?;
        if !mgr.methods.iter().any(|m| m.name == a.submit_method) {
            return Err(ExtractError::missing_anchor("method", a.submit_method.clone()).into());
        }

        let mut methods: Vec<&MethodDef> = mgr.methods.iter().collect();
        methods.sort_by(|x, y| x.name.cmp(&y.name));

        let mut calls = Vec::new();
        for method in methods {
            if !method.name.starts_with(&a.method_prefix)
                || !method.name.ends_with(&a.method_suffix)
            {
                continue;
            }

            let submit_positions: Vec<usize> = method
                .instructions
                .iter()
                .enumerate()
                .filter(|(_, inst)| {
                    matches!(inst, Instruction::Call { target_type, method }
                        if *target_type == a.manager_type && *method == a.submit_method)
                })
                .map(|(i, _)| i)
                .collect();
            let submit_at = match submit_positions.as_slice() {
                [] => {
                    trace!(method = %method.name, "no submit call, skipping");
                    continue;
                }
                [pos] => *pos,
                many => {
                    return Err(ExtractError::AmbiguousMatch(format!(
                        "{} submit calls in `{}`",
                        many.len(),
                        method.name
                    ))
                    .into())
                }
            };

            // Fire-and-forget builders have no callback parameter and are
            // outside the endpoint table's scope.
            let Some(response) = callback_response_type(method, &a.callback_generic)? else {
                trace!(method = %method.name, "no callback parameter, skipping");
                continue;
            };

            let request = request_construction(method, &a.manager_type)?;

            // Setup code may push unrelated integer constants first; the
            // endpoint id is the last one before the submit call.
            let id = method.instructions[..submit_at]
                .iter()
                .rev()
                .find_map(|inst| match inst {
                    Instruction::LdcI4 { value } => Some(*value),
                    _ => None,
                })
                .ok_or_else(|| {
                    ExtractError::missing_anchor("endpoint id load", method.name.clone())
                })?;
            let logical = id_names.get(&id).ok_or_else(|| {
                ExtractError::missing_anchor("endpoint id constant", id.to_string())
            })?;

            calls.push(ApiCall {
                url: logical.clone(),
                request,
                response,
            });
        }
        debug!(calls = calls.len(), "recovered call sites (jit dialect)");
        Ok(calls)
    }
}

impl ProtocolExtractor for MonoExtractor {
    fn extract(&self, module: &ModuleMetadata, names: &NameMap) -> Result<Protocol> {
        let id_names = self.endpoint_names(module)?;
        let urls = self.read_url_table(module, &id_names)?;
        let apis = self.read_call_sites(module, &id_names)?;
        resolve_protocol(
            module,
            names,
            &self.anchors.app_namespace,
            &urls,
            apis,
            &self.seed_types,
        )
    }
}

/// Response type from the single callback-shaped parameter: a one-argument
/// instantiation of the callback generic, its argument being the response
/// type. `Ok(None)` when the method has no such parameter; ambiguous when it
/// has more than one.
pub(crate) fn callback_response_type(
    method: &MethodDef,
    callback_generic: &str,
) -> Result<Option<String>> {
    let mut candidates = method.params.iter().filter_map(|p| match &p.type_ref {
        TypeRef::Generic { element, args } if element == callback_generic && args.len() == 1 => {
            Some(&args[0])
        }
        _ => None,
    });
    let Some(arg) = candidates.next() else {
        return Ok(None);
    };
    if candidates.next().is_some() {
        return Err(ExtractError::AmbiguousMatch(format!(
            "multiple callback parameters in `{}`",
            method.name
        ))
        .into());
    }
    let full_name = arg.full_name().ok_or_else(|| {
        ExtractError::UnsupportedShape(format!(
            "callback argument in `{}` is not a plain type",
            method.name
        ))
    })?;
    Ok(Some(full_name.to_string()))
}

/// The payload allocation: the single object construction whose constructed
/// type is nested in the manager type. Builder methods also allocate helper
/// objects, so the declaring-type restriction is what disambiguates.
fn request_construction(method: &MethodDef, manager_type: &str) -> Result<String> {
    let mut candidates = method.instructions.iter().filter_map(|inst| match inst {
        Instruction::NewObj { type_name }
            if netproto_metadata::declaring_type(type_name) == Some(manager_type) =>
        {
            Some(type_name)
        }
        _ => None,
    });
    let first = candidates.next().ok_or_else(|| {
        ExtractError::missing_anchor("request construction", method.name.clone())
    })?;
    if candidates.next().is_some() {
        return Err(ExtractError::AmbiguousMatch(format!(
            "multiple request constructions in `{}`",
            method.name
        ))
        .into());
    }
    Ok(first.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use netproto_metadata::{ConstantDef, ParamDef, PropertyDef, TypeDef};

    fn endpoint_enum(constants: &[(&str, i32)]) -> TypeDef {
        TypeDef {
            full_name: "Elements.eApiType".to_string(),
            is_enum: true,
            properties: vec![],
            constants: constants
                .iter()
                .map(|(n, v)| ConstantDef {
                    name: n.to_string(),
                    value: *v,
                })
                .collect(),
            methods: vec![],
        }
    }

    fn url_table_type(instructions: Vec<Instruction>) -> TypeDef {
        TypeDef {
            full_name: "Elements.ApiTypeUtil".to_string(),
            is_enum: false,
            properties: vec![],
            constants: vec![],
            methods: vec![MethodDef {
                name: ".cctor".to_string(),
                is_special_name: true,
                params: vec![],
                instructions,
            }],
        }
    }

    fn callback_param(response_full_name: &str) -> ParamDef {
        ParamDef {
            name: "onComplete".to_string(),
            type_ref: TypeRef::Generic {
                element: "System.Action`1".to_string(),
                args: vec![TypeRef::named(response_full_name)],
            },
        }
    }

    fn empty_class(full_name: &str) -> TypeDef {
        TypeDef {
            full_name: full_name.to_string(),
            is_enum: false,
            properties: vec![],
            constants: vec![],
            methods: vec![],
        }
    }

    #[test]
    fn test_url_table_triple_scan_ignores_noise() {
        let extractor = MonoExtractor::new(vec![]);
        let module = ModuleMetadata {
            name: "main".to_string(),
            types: vec![
                endpoint_enum(&[("ShopBuy", 7)]),
                url_table_type(vec![
                    Instruction::Other,
                    Instruction::LdcI4 { value: 99 },
                    Instruction::Dup,
                    Instruction::LdcI4 { value: 7 },
                    Instruction::LdStr {
                        value: "shop/buy".to_string(),
                    },
                    Instruction::Other,
                    // dup followed by the wrong shapes: skipped, not an error
                    Instruction::Dup,
                    Instruction::LdStr {
                        value: "noise".to_string(),
                    },
                ]),
            ],
        };
        let id_names = extractor.endpoint_names(&module).unwrap();
        let urls = extractor.read_url_table(&module, &id_names).unwrap();
        assert_eq!(urls.len(), 1);
        assert_eq!(urls.get("ShopBuy").map(String::as_str), Some("shop/buy"));
    }

    #[test]
    fn test_missing_url_table_type_is_fatal() {
        let extractor = MonoExtractor::new(vec![]);
        let module = ModuleMetadata {
            name: "main".to_string(),
            types: vec![endpoint_enum(&[])],
        };
        let id_names = extractor.endpoint_names(&module).unwrap();
        let err = extractor.read_url_table(&module, &id_names).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ExtractError>(),
            Some(ExtractError::MissingAnchor { .. })
        ));
    }

    fn manager_with_method(method: MethodDef) -> TypeDef {
        TypeDef {
            full_name: "Elements.ApiManager".to_string(),
            is_enum: false,
            properties: vec![],
            constants: vec![],
            methods: vec![
                MethodDef {
                    name: "addTask".to_string(),
                    is_special_name: false,
                    params: vec![],
                    instructions: vec![],
                },
                method,
            ],
        }
    }

    fn submit_call() -> Instruction {
        Instruction::Call {
            target_type: "Elements.ApiManager".to_string(),
            method: "addTask".to_string(),
        }
    }

    #[test]
    fn test_call_site_takes_last_id_constant_before_submit() {
        let extractor = MonoExtractor::new(vec![]);
        let method = MethodDef {
            name: "AddShopBuyPostParam".to_string(),
            is_special_name: false,
            params: vec![callback_param("Elements.ShopBuyResponseData")],
            instructions: vec![
                Instruction::Other,                                          // 0
                Instruction::Other,                                          // 1
                Instruction::LdcI4 { value: 3 },                             // 2: setup noise
                Instruction::NewObj {
                    type_name: "Elements.ApiManager/ShopBuyPostParam".to_string(),
                },                                                           // 3
                Instruction::Other,                                          // 4
                Instruction::Other,                                          // 5
                Instruction::Other,                                          // 6
                Instruction::Other,                                          // 7
                Instruction::Other,                                          // 8
                Instruction::LdcI4 { value: 7 },                             // 9: endpoint id
                Instruction::Other,                                          // 10
                Instruction::Other,                                          // 11
                submit_call(),                                               // 12
                Instruction::LdcI4 { value: 42 },                            // after: ignored
            ],
        };
        let module = ModuleMetadata {
            name: "main".to_string(),
            types: vec![
                endpoint_enum(&[("ShopBuy", 7), ("Other", 3)]),
                manager_with_method(method),
            ],
        };
        let id_names = extractor.endpoint_names(&module).unwrap();
        let calls = extractor.read_call_sites(&module, &id_names).unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].url, "ShopBuy");
        assert_eq!(calls[0].request, "Elements.ApiManager/ShopBuyPostParam");
        assert_eq!(calls[0].response, "Elements.ShopBuyResponseData");
    }

    #[test]
    fn test_method_without_callback_is_skipped() {
        let extractor = MonoExtractor::new(vec![]);
        let method = MethodDef {
            name: "AddPingPostParam".to_string(),
            is_special_name: false,
            params: vec![],
            instructions: vec![
                Instruction::NewObj {
                    type_name: "Elements.ApiManager/PingPostParam".to_string(),
                },
                Instruction::LdcI4 { value: 1 },
                submit_call(),
            ],
        };
        let module = ModuleMetadata {
            name: "main".to_string(),
            types: vec![endpoint_enum(&[("Ping", 1)]), manager_with_method(method)],
        };
        let id_names = extractor.endpoint_names(&module).unwrap();
        let calls = extractor.read_call_sites(&module, &id_names).unwrap();
        assert!(calls.is_empty());
    }

    #[test]
    fn test_two_qualifying_constructions_is_ambiguous() {
        let extractor = MonoExtractor::new(vec![]);
        let method = MethodDef {
            name: "AddShopBuyPostParam".to_string(),
            is_special_name: false,
            params: vec![callback_param("Elements.ShopBuyResponseData")],
            instructions: vec![
                Instruction::NewObj {
                    type_name: "Elements.ApiManager/ShopBuyPostParam".to_string(),
                },
                Instruction::NewObj {
                    type_name: "Elements.ApiManager/OtherPostParam".to_string(),
                },
                // helper allocation outside the manager: never a candidate
                Instruction::NewObj {
                    type_name: "Elements.SomeHelper".to_string(),
                },
                Instruction::LdcI4 { value: 7 },
                submit_call(),
            ],
        };
        let module = ModuleMetadata {
            name: "main".to_string(),
            types: vec![
                endpoint_enum(&[("ShopBuy", 7)]),
                manager_with_method(method),
            ],
        };
        let id_names = extractor.endpoint_names(&module).unwrap();
        let err = extractor.read_call_sites(&module, &id_names).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ExtractError>(),
            Some(ExtractError::AmbiguousMatch(_))
        ));
    }

    #[test]
    fn test_extract_end_to_end() {
        let extractor = MonoExtractor::new(vec![]);
        let method = MethodDef {
            name: "AddShopBuyPostParam".to_string(),
            is_special_name: false,
            params: vec![callback_param("Elements.ShopBuyResponseData")],
            instructions: vec![
                Instruction::NewObj {
                    type_name: "Elements.ApiManager/ShopBuyPostParam".to_string(),
                },
                Instruction::LdcI4 { value: 7 },
                submit_call(),
            ],
        };
        let mut request_type = empty_class("Elements.ApiManager/ShopBuyPostParam");
        request_type.properties.push(PropertyDef {
            name: "ItemId".to_string(),
            type_ref: TypeRef::named("System.Int32"),
            is_static: false,
            is_public: true,
            readable: true,
        });
        let module = ModuleMetadata {
            name: "main".to_string(),
            types: vec![
                endpoint_enum(&[("ShopBuy", 7)]),
                url_table_type(vec![
                    Instruction::Dup,
                    Instruction::LdcI4 { value: 7 },
                    Instruction::LdStr {
                        value: "shop/buy".to_string(),
                    },
                ]),
                manager_with_method(method),
                request_type,
                empty_class("Elements.ShopBuyResponseData"),
            ],
        };
        let names = NameMap::new();
        let protocol = extractor.extract(&module, &names).unwrap();
        assert_eq!(protocol.apis.len(), 1);
        assert_eq!(protocol.apis[0].url, "shop/buy");
        assert_eq!(protocol.apis[0].request, "ShopBuyPostParam");
        assert_eq!(protocol.request[0].fields[0].0, "ItemId");
        assert_eq!(protocol.response[0].name, "ShopBuyResponseData");
    }
}
