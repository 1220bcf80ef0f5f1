//! Dialect B: the AOT-backend build.
//!
//! Recovered metadata for this build has no usable URL table initializer,
//! but its builder-method identifiers double as path fragments. The request
//! type is looked up by its derived nested-type name instead of scanning for
//! a construction instruction, and a small fixed override table patches the
//! handful of endpoints whose method name does not match their actual path.

use anyhow::Result;
use netproto_metadata::{MethodDef, ModuleMetadata, TypeDef};
use netproto_schema::{ApiCall, Protocol};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, trace};

use crate::dialect::{Anchors, ProtocolExtractor};
use crate::error::ExtractError;
use crate::mono::callback_response_type;
use crate::names::NameMap;
use crate::resolver::resolve_protocol;

pub struct Il2CppExtractor {
    pub anchors: Anchors,
    /// Endpoint identifier -> explicit path, applied after automatic URL
    /// derivation.
    pub url_overrides: BTreeMap<String, String>,
    pub seed_types: Vec<String>,
}

impl Il2CppExtractor {
    pub fn new(seed_types: Vec<String>) -> Self {
        Il2CppExtractor {
            anchors: Anchors::default(),
            url_overrides: default_url_overrides(),
            seed_types,
        }
    }

    fn read_call_sites(&self, module: &ModuleMetadata) -> Result<Vec<ApiCall>> {
        let a = &self.anchors;
        let mgr: &TypeDef = module
            .get_type(&a.manager_type)
            .ok_or_else(|| ExtractError::missing_anchor("type", &a.manager_type))?;

        let mut methods: Vec<&MethodDef> = mgr.methods.iter().collect();
        methods.sort_by(|x, y| x.name.cmp(&y.name));

        // The AOT metadata dump repeats some method rows; process each name
        // once.
        let mut seen: HashSet<&str> = HashSet::new();
        let mut calls = Vec::new();
        for method in methods {
            if !method.name.starts_with(&a.method_prefix)
                || !method.name.ends_with(&a.method_suffix)
            {
                continue;
            }
            if !seen.insert(&method.name) {
                continue;
            }

            let stripped = &method.name[a.method_prefix.len()..];
            let request_full = format!("{}/{}", a.manager_type, stripped);
            if module.get_type(&request_full).is_none() {
                trace!(method = %method.name, "no nested request type, skipping");
                continue;
            }

            let Some(response) = callback_response_type(method, &a.callback_generic)? else {
                trace!(method = %method.name, "no callback parameter, skipping");
                continue;
            };

            let url_key = &stripped[..stripped.len() - a.method_suffix.len()];
            calls.push(ApiCall {
                url: url_key.to_string(),
                request: request_full,
                response,
            });
        }
        debug!(calls = calls.len(), "recovered call sites (aot dialect)");
        Ok(calls)
    }
}

impl ProtocolExtractor for Il2CppExtractor {
    fn extract(&self, module: &ModuleMetadata, names: &NameMap) -> Result<Protocol> {
        let apis = self.read_call_sites(module)?;
        // This dialect's endpoint identifiers serve directly as path
        // fragments; the override table corrects the exceptions.
        let urls: BTreeMap<String, String> = apis
            .iter()
            .map(|api| {
                let path = self
                    .url_overrides
                    .get(&api.url)
                    .cloned()
                    .unwrap_or_else(|| api.url.clone());
                (api.url.clone(), path)
            })
            .collect();
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

/// Endpoints whose builder-method name does not match their actual path.
pub fn default_url_overrides() -> BTreeMap<String, String> {
    [
        ("EquipEnhanceMax", "equipment/enhance_max"),
        ("SeasonPassBuyLevel", "season_ticket_new/buy_level"),
        ("SeasonPassIndex", "season_ticket_new/index"),
        ("SeasonPassMissionAccept", "season_ticket_new/accept"),
        ("SeasonPassRewardAccept", "season_ticket_new/reward"),
        ("TestBuyTicket", "test/buy_ticket"),
        ("GachaMonthlyIndex", "gacha/resident"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}
