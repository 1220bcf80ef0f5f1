use anyhow::Result;
use netproto_metadata::ModuleMetadata;
use netproto_schema::Protocol;

use crate::names::NameMap;

/// By-name metadata elements the extractors assume exist in the analyzed
/// application. These are anchors: their absence is fatal, because it means
/// the dialect assumptions no longer hold for this build.
#[derive(Debug, Clone)]
pub struct Anchors {
    /// Type owning the endpoint builder methods and the submit helper.
    pub manager_type: String,
    /// Enumeration mapping logical endpoint ids to names.
    pub endpoint_enum: String,
    /// Type whose static initializer builds the endpoint-id -> URL table.
    pub url_table_type: String,
    /// The submit helper every real call site invokes exactly once.
    pub submit_method: String,
    /// Builder method name prefix/suffix (`Add...PostParam`).
    pub method_prefix: String,
    pub method_suffix: String,
    /// One-argument callback generic wrapping the response type.
    pub callback_generic: String,
    /// Namespace prefix of the application's own types.
    pub app_namespace: String,
    /// Loosely-typed payload parameter type (simple name) whose methods are
    /// harvested for field-name literals.
    pub payload_param_type: String,
}

impl Default for Anchors {
    fn default() -> Self {
        Anchors {
            manager_type: "Elements.ApiManager".to_string(),
            endpoint_enum: "Elements.eApiType".to_string(),
            url_table_type: "Elements.ApiTypeUtil".to_string(),
            submit_method: "addTask".to_string(),
            method_prefix: "Add".to_string(),
            method_suffix: "PostParam".to_string(),
            callback_generic: "System.Action`1".to_string(),
            app_namespace: "Elements.".to_string(),
            payload_param_type: "JsonData".to_string(),
        }
    }
}

/// One backend-specific extraction strategy. Both dialects produce the same
/// logical output, so everything downstream of extraction (the merge, the
/// emitter) is dialect-agnostic.
pub trait ProtocolExtractor {
    fn extract(&self, module: &ModuleMetadata, names: &NameMap) -> Result<Protocol>;
}
