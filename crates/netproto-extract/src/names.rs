use netproto_metadata::{simple_name, Instruction, ModuleMetadata, TypeRef};
use std::collections::HashMap;

/// Canonical-name -> preferred-literal table used to rewrite recovered field
/// names consistently across both backends.
///
/// Serialization code in the client passes field names as string literals
/// (snake_case on the wire, camelCase in property names, inconsistently).
/// Observing every such literal and keying it by canonical form lets the
/// resolver rewrite each declared property name to the spelling the wire
/// actually uses. The first-observed literal for a canonical form wins.
///
/// This table is an explicit value scoped to one analysis run; it is built
/// once up front and passed by reference into every resolution call.
#[derive(Debug, Default, Clone)]
pub struct NameMap {
    preferred: HashMap<String, String>,
}

impl NameMap {
    pub fn new() -> Self {
        NameMap::default()
    }

    /// Records one observed literal. Earlier observations win.
    pub fn observe(&mut self, literal: &str) {
        let key = canonical_form(literal);
        self.preferred
            .entry(key)
            .or_insert_with(|| literal.to_string());
    }

    pub fn observe_all<I, S>(&mut self, literals: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for lit in literals {
            self.observe(lit.as_ref());
        }
    }

    /// The preferred spelling for a declared name, or the declared name
    /// itself when nothing maps to its canonical form.
    pub fn rewrite<'a>(&'a self, declared: &'a str) -> &'a str {
        self.preferred
            .get(&canonical_form(declared))
            .map(String::as_str)
            .unwrap_or(declared)
    }

    pub fn len(&self) -> usize {
        self.preferred.len()
    }

    pub fn is_empty(&self) -> bool {
        self.preferred.is_empty()
    }
}

/// Collapses underscore-separated segments into one camel-style token: the
/// first letter of the string and of each segment after an underscore is
/// upper-cased, underscores are dropped, everything else keeps its case.
/// Used purely as a dedup key, never emitted.
pub fn canonical_form(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = true;
    for c in name.chars() {
        if c == '_' {
            upper_next = true;
            continue;
        }
        if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Collects every string literal loaded in a method that accepts the
/// loosely-typed payload parameter type. Those methods are the client's
/// hand-written serializers, so their literals are the wire spellings of
/// field names.
pub fn harvest_literals(module: &ModuleMetadata, payload_param_type: &str) -> Vec<String> {
    let mut out = Vec::new();
    for ty in &module.types {
        for method in &ty.methods {
            let takes_payload = method.params.iter().any(|p| match &p.type_ref {
                TypeRef::Named { full_name } => simple_name(full_name) == payload_param_type,
                _ => false,
            });
            if !takes_payload {
                continue;
            }
            for inst in &method.instructions {
                if let Instruction::LdStr { value } = inst {
                    out.push(value.clone());
                }
            }
        }
    }
    out
}
