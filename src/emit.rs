//! Renders the merged protocol as Python/pydantic data-model sources:
//! `common.py`, `requests.py`, `responses.py`, `enums.py`.
//!
//! Naming convention consumed here (preserved from the source metadata, not
//! invented): request classes end in `PostParam` and become `<X>Request`;
//! response classes end in `ResponseData` and become `<X>Response`.

use anyhow::{Context, Result};
use netproto_schema::{ClassType, FieldType, Protocol};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

const REQUEST_SUFFIX: &str = "PostParam";
const RESPONSE_SUFFIX: &str = "ResponseData";

/// Field names that are Python keywords and need an alias.
const PY_KEYWORDS: [&str; 3] = ["def", "break", "from"];

fn strip_suffix<'a>(name: &'a str, suffix: &str) -> &'a str {
    name.strip_suffix(suffix).unwrap_or(name)
}

/// Python spelling of one field type.
fn py_type(field: &FieldType) -> String {
    if field.parameters.is_empty() {
        return match field.base_type.as_str() {
            "long" => "int".to_string(),
            "string" => "str".to_string(),
            "double" => "float".to_string(),
            other => other.to_string(),
        };
    }
    let args: Vec<String> = field.parameters.iter().map(py_type).collect();
    format!("{}[{}]", field.base_type, args.join(", "))
}

fn write_fields(w: &mut impl Write, class: &ClassType) -> Result<()> {
    for (name, ty) in &class.fields {
        if PY_KEYWORDS.contains(&name.as_str()) {
            writeln!(w, "    _{}: {} = Field(alias='{}')", name, py_type(ty), name)?;
        } else {
            writeln!(w, "    {}: {} = None", name, py_type(ty))?;
        }
    }
    Ok(())
}

fn write_class_file<F, G>(
    path: &Path,
    header: &str,
    classes: &[ClassType],
    name_of: F,
    base_of: G,
    url_of: Option<&BTreeMap<String, String>>,
) -> Result<()>
where
    F: Fn(&str) -> String,
    G: Fn(&str) -> Result<String>,
{
    let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut w = BufWriter::new(file);

    writeln!(&mut w, "{}", header)?;
    writeln!(&mut w)?;

    for class in classes {
        writeln!(
            &mut w,
            "class {}({}):",
            name_of(&class.name),
            base_of(&class.name)?
        )?;
        write_fields(&mut w, class)?;

        match url_of {
            Some(urls) => {
                let url = urls
                    .get(&class.name)
                    .with_context(|| format!("no api entry for request `{}`", class.name))?;
                writeln!(&mut w, "    @property")?;
                writeln!(&mut w, "    def url(self) -> str:")?;
                writeln!(&mut w, "        return \"{}\"", url)?;
            }
            None if class.fields.is_empty() => {
                writeln!(&mut w, "    pass")?;
            }
            None => {}
        }
        writeln!(&mut w)?;
    }
    Ok(())
}

/// Writes the four Python model files into `out_dir`.
pub fn emit_python(protocol: &Protocol, out_dir: &Path) -> Result<()> {
    // Per-request response class name and resolved URL, from the api table.
    let responses: BTreeMap<String, String> = protocol
        .apis
        .iter()
        .map(|a| (a.request.clone(), a.response.clone()))
        .collect();
    let urls: BTreeMap<String, String> = protocol
        .apis
        .iter()
        .map(|a| (a.request.clone(), a.url.clone()))
        .collect();

    write_class_file(
        &out_dir.join("common.py"),
        "from typing import List, Dict\n\
         from .enums import *\n\
         from pydantic import BaseModel, Field",
        &protocol.common,
        |name| name.to_string(),
        |_| Ok("BaseModel".to_string()),
        None,
    )?;

    write_class_file(
        &out_dir.join("requests.py"),
        "from typing import List, Dict\n\
         from .modelbase import Request\n\
         from .responses import *\n\
         from .common import *\n\
         from .enums import *\n\
         from pydantic import Field",
        &protocol.request,
        |name| format!("{}Request", strip_suffix(name, REQUEST_SUFFIX)),
        |name| {
            let response = responses
                .get(name)
                .with_context(|| format!("no api entry for request `{}`", name))?;
            Ok(format!(
                "Request[{}Response]",
                strip_suffix(response, RESPONSE_SUFFIX)
            ))
        },
        Some(&urls),
    )?;

    write_class_file(
        &out_dir.join("responses.py"),
        "from typing import List, Dict\n\
         from .modelbase import ResponseBase\n\
         from .common import *\n\
         from .enums import *\n\
         from pydantic import Field",
        &protocol.response,
        |name| format!("{}Response", strip_suffix(name, RESPONSE_SUFFIX)),
        |_| Ok("ResponseBase".to_string()),
        None,
    )?;

    let enums_path = out_dir.join("enums.py");
    let file =
        File::create(&enums_path).with_context(|| format!("create {}", enums_path.display()))?;
    let mut w = BufWriter::new(file);
    writeln!(&mut w, "from enum import IntEnum")?;
    writeln!(&mut w)?;
    for e in &protocol.enums {
        writeln!(&mut w, "class {}(IntEnum):", e.name)?;
        for (name, value) in &e.values {
            writeln!(&mut w, "    {} = {}", name, value)?;
        }
        writeln!(&mut w)?;
    }

    Ok(())
}
