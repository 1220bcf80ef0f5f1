//! Merges the two per-backend protocol schemas into one.
//!
//! The two backends are builds of the same codebase, so their recovered
//! schemas mostly agree; merging is deduplication plus a last-writer-wins
//! union of fields and constants. Ordering is deterministic throughout:
//! first-seen order is preserved, and the merged `common` list is
//! re-linearized so every class appears after the classes its fields
//! reference (the emitter renders types in a single forward pass).
//!
//! Conflict policy: on same-named collisions the second argument's fields and
//! constants overwrite the first's. No field-type conflict detection is
//! performed; the backends are allowed to disagree on a field's width.

use netproto_schema::{ApiCall, ClassType, EnumType, Protocol};
use std::collections::HashSet;
use tracing::debug;

/// Merges two recovered protocols. Deterministic and idempotent:
/// `merge(p, p)` equals `p` up to `common` re-linearization.
pub fn merge(a: Protocol, b: Protocol) -> Protocol {
    let apis = merge_apis(a.apis, b.apis);
    let common = linearize(merge_classes(a.common, b.common));
    let request = merge_classes(a.request, b.request);
    let response = merge_classes(a.response, b.response);
    let enums = merge_enums(a.enums, b.enums);

    debug!(
        apis = apis.len(),
        common = common.len(),
        request = request.len(),
        enums = enums.len(),
        "merged protocols"
    );

    Protocol {
        apis,
        common,
        request,
        response,
        enums,
    }
}

/// Union deduplicated by request-type name; the first occurrence wins.
fn merge_apis(a: Vec<ApiCall>, b: Vec<ApiCall>) -> Vec<ApiCall> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::with_capacity(a.len() + b.len());
    for api in a.into_iter().chain(b) {
        if seen.insert(api.request.clone()) {
            out.push(api);
        }
    }
    out
}

/// Union deduplicated by name; on collision `b`'s fields overwrite `a`'s
/// field of the same name, keeping `a`'s field order for fields both sides
/// declare.
fn merge_classes(a: Vec<ClassType>, b: Vec<ClassType>) -> Vec<ClassType> {
    let mut out = a;
    for class in b {
        match out.iter_mut().find(|c| c.name == class.name) {
            Some(existing) => {
                for (name, ty) in class.fields {
                    existing.insert_field(name, ty);
                }
            }
            None => out.push(class),
        }
    }
    out
}

/// Same policy as [`merge_classes`], over integer constants.
fn merge_enums(a: Vec<EnumType>, b: Vec<EnumType>) -> Vec<EnumType> {
    let mut out = a;
    for e in b {
        match out.iter_mut().find(|x| x.name == e.name) {
            Some(existing) => {
                for (name, value) in e.values {
                    existing.insert_value(name, value);
                }
            }
            None => out.push(e),
        }
    }
    out
}

/// Reorders classes dependency-first: every class a field refers to (and that
/// exists in the set) is recorded before the class itself. Each class is
/// visited at most once, so cyclic references fall back to first-visit order.
pub fn linearize(classes: Vec<ClassType>) -> Vec<ClassType> {
    let order: Vec<String> = classes.iter().map(|c| c.name.clone()).collect();
    let mut by_name: Vec<Option<ClassType>> = classes.into_iter().map(Some).collect();
    let index_of = |name: &str, by_name: &[Option<ClassType>]| {
        by_name
            .iter()
            .position(|c| c.as_ref().is_some_and(|c| c.name == name))
    };

    let mut visited: HashSet<String> = HashSet::new();
    let mut out: Vec<ClassType> = Vec::with_capacity(by_name.len());

    fn visit(
        name: &str,
        by_name: &mut [Option<ClassType>],
        visited: &mut HashSet<String>,
        out: &mut Vec<ClassType>,
        index_of: &dyn Fn(&str, &[Option<ClassType>]) -> Option<usize>,
    ) {
        if !visited.insert(name.to_string()) {
            return;
        }
        let Some(idx) = index_of(name, by_name) else {
            return;
        };
        let Some(class) = by_name[idx].take() else {
            return;
        };
        let deps: Vec<String> = class
            .fields
            .iter()
            .flat_map(|(_, ty)| ty.referenced_names())
            .map(str::to_string)
            .collect();
        for dep in deps {
            visit(&dep, by_name, visited, out, index_of);
        }
        out.push(class);
    }

    for name in order {
        visit(&name, &mut by_name, &mut visited, &mut out, &index_of);
    }
    out
}
