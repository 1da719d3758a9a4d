//! Snapshot store and control lookup
//!
//!     The registry holds metadata snapshots in insertion order, keyed by a
//!     source identity (a metadata file path, a language-server push, the
//!     bundled default). Lookup structures derived from the snapshots (the
//!     markup-tag table, the tag-prefix index and the find-control memo) are
//!     invalidated wholesale on any snapshot change and rebuilt lazily on the
//!     next query.
//!
//!     A snapshot that fails to deserialize is logged and skipped; queries
//!     keep answering from whatever sources did load. The bundled default
//!     snapshot is restored whenever the last source is removed, so the
//!     registry is never empty.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use crate::snapshot::{ControlDefinition, ControlRegistration, MetadataSnapshot};
use crate::typename::TypeName;

/// Full type name of the control backing plain HTML elements.
pub const HTML_GENERIC_CONTROL: &str = "DotHtml.Controls.HtmlGenericControl";
/// Full type name of the host control for `js:` component tags.
pub const JS_COMPONENT: &str = "DotHtml.Controls.JsComponent";
/// Full type name of the base control backing markup-file registrations.
pub const MARKUP_CONTROL: &str = "DotHtml.Controls.DotControl";

const DEFAULT_SNAPSHOT_KEY: &str = "builtin";
const DEFAULT_SNAPSHOT_JSON: &str = include_str!("../resources/default-metadata.json");

/// A control found in some snapshot. Cheap to clone and hand out.
#[derive(Debug, Clone)]
pub struct FoundControl {
    pub full_name: String,
    pub definition: Arc<ControlDefinition>,
}

/// What kind of thing a markup tag resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedControlKind {
    /// A code control reached through a registered tag prefix.
    Code,
    /// A markup-file control registered under an exact tag.
    MarkupFile { src: String },
    /// A plain HTML element.
    HtmlElement,
    /// A `js:` component host.
    JsComponentHost,
}

#[derive(Debug, Clone)]
pub struct ResolvedControl {
    pub control: FoundControl,
    pub kind: ResolvedControlKind,
}

/// One loaded snapshot, with control definitions shared behind `Arc` so
/// resolver results stay valid across cache invalidations.
#[derive(Debug)]
struct SnapshotSource {
    controls: BTreeMap<String, Arc<ControlDefinition>>,
    registrations: Vec<ControlRegistration>,
}

impl From<MetadataSnapshot> for SnapshotSource {
    fn from(snapshot: MetadataSnapshot) -> Self {
        Self {
            controls: snapshot
                .controls
                .into_iter()
                .map(|(name, definition)| (name, Arc::new(definition)))
                .collect(),
            registrations: snapshot.registrations,
        }
    }
}

#[derive(Debug, Default)]
struct DerivedCaches {
    /// Exact markup tag → source path, first registration wins.
    markup_tags: HashMap<String, String>,
    /// Tag prefix → namespaces in registration order, de-duplicated by
    /// namespace + assembly.
    prefix_index: HashMap<String, Vec<(String, Option<String>)>>,
    /// Prefixes in first-seen order.
    prefix_order: Vec<String>,
}

#[derive(Debug, Default)]
struct CacheState {
    derived: Option<DerivedCaches>,
    find_memo: HashMap<String, Option<FoundControl>>,
}

#[derive(Debug)]
pub struct ControlRegistry {
    snapshots: Vec<(String, SnapshotSource)>,
    caches: Mutex<CacheState>,
}

impl Default for ControlRegistry {
    fn default() -> Self {
        Self::with_default_snapshot()
    }
}

impl ControlRegistry {
    /// An empty registry with no sources at all.
    pub fn new() -> Self {
        Self {
            snapshots: Vec::new(),
            caches: Mutex::new(CacheState::default()),
        }
    }

    /// A registry seeded with the bundled default snapshot.
    pub fn with_default_snapshot() -> Self {
        let mut registry = Self::new();
        registry.load_default_snapshot();
        registry
    }

    fn load_default_snapshot(&mut self) {
        let snapshot: MetadataSnapshot = serde_json::from_str(DEFAULT_SNAPSHOT_JSON)
            .expect("bundled default snapshot is well-formed");
        self.snapshots
            .push((DEFAULT_SNAPSHOT_KEY.to_owned(), snapshot.into()));
        self.invalidate();
    }

    pub fn snapshot_keys(&self) -> Vec<&str> {
        self.snapshots.iter().map(|(key, _)| key.as_str()).collect()
    }

    /// Add or replace the snapshot under `key`. Replacement keeps the
    /// source's position in the lookup order.
    pub fn update_snapshot(&mut self, key: &str, snapshot: MetadataSnapshot) {
        let source = SnapshotSource::from(snapshot);
        match self.snapshots.iter_mut().find(|(k, _)| k == key) {
            Some((_, existing)) => *existing = source,
            None => self.snapshots.push((key.to_owned(), source)),
        }
        self.invalidate();
    }

    /// Like [`update_snapshot`](Self::update_snapshot) but from raw JSON.
    /// Malformed input is logged and skipped; the previous snapshot under
    /// `key`, if any, stays in place.
    pub fn update_snapshot_json(&mut self, key: &str, json: &str) -> bool {
        match serde_json::from_str::<MetadataSnapshot>(json) {
            Ok(snapshot) => {
                self.update_snapshot(key, snapshot);
                true
            }
            Err(error) => {
                tracing::warn!(source = key, %error, "skipping malformed metadata snapshot");
                false
            }
        }
    }

    /// Remove the snapshot under `key`. When the last source goes away the
    /// bundled default is restored.
    pub fn remove_snapshot(&mut self, key: &str) {
        self.snapshots.retain(|(k, _)| k != key);
        if self.snapshots.is_empty() {
            self.load_default_snapshot();
        } else {
            self.invalidate();
        }
    }

    fn invalidate(&mut self) {
        let mut caches = self.caches.lock().expect("registry cache lock");
        caches.derived = None;
        caches.find_memo.clear();
    }

    /// Look up a control by (possibly assembly-qualified) type name. The
    /// first snapshot in insertion order that defines the canonical full
    /// name wins.
    pub fn find_control(&self, type_name: &str) -> Option<FoundControl> {
        let full_name = TypeName::parse(type_name)?.full_name();
        let mut caches = self.caches.lock().expect("registry cache lock");
        if let Some(memoized) = caches.find_memo.get(&full_name) {
            return memoized.clone();
        }
        let found = self.scan_snapshots(&full_name);
        caches.find_memo.insert(full_name, found.clone());
        found
    }

    fn scan_snapshots(&self, full_name: &str) -> Option<FoundControl> {
        self.snapshots.iter().find_map(|(_, source)| {
            source.controls.get(full_name).map(|definition| FoundControl {
                full_name: full_name.to_owned(),
                definition: Arc::clone(definition),
            })
        })
    }

    /// Resolve a markup tag to its backing control.
    pub fn resolve_control(&self, tag: &str) -> Option<ResolvedControl> {
        if tag.starts_with("js:") {
            return Some(ResolvedControl {
                control: self.find_control(JS_COMPONENT)?,
                kind: ResolvedControlKind::JsComponentHost,
            });
        }
        let Some((prefix, local)) = tag.split_once(':') else {
            return Some(ResolvedControl {
                control: self.find_control(HTML_GENERIC_CONTROL)?,
                kind: ResolvedControlKind::HtmlElement,
            });
        };
        if prefix.is_empty() || local.is_empty() {
            return None;
        }

        if let Some(src) = self.with_derived(|derived| derived.markup_tags.get(tag).cloned()) {
            return Some(ResolvedControl {
                control: self.find_control(MARKUP_CONTROL)?,
                kind: ResolvedControlKind::MarkupFile { src },
            });
        }

        let namespaces =
            self.with_derived(|derived| derived.prefix_index.get(prefix).cloned())?;
        namespaces.iter().find_map(|(namespace, _)| {
            self.find_control(&format!("{namespace}.{local}"))
                .map(|control| ResolvedControl {
                    control,
                    kind: ResolvedControlKind::Code,
                })
        })
    }

    /// Registered tag prefixes in first-seen order.
    pub fn tag_prefixes(&self) -> Vec<String> {
        self.with_derived(|derived| derived.prefix_order.clone())
    }

    /// Registered markup tags with their source paths.
    pub fn markup_tags(&self) -> Vec<(String, String)> {
        self.with_derived(|derived| {
            let mut tags: Vec<_> = derived
                .markup_tags
                .iter()
                .map(|(tag, src)| (tag.clone(), src.clone()))
                .collect();
            tags.sort();
            tags
        })
    }

    /// Non-abstract controls addressable as `prefix:LocalName`, with their
    /// local names. Snapshot insertion order, then name order within one
    /// snapshot.
    pub fn controls_in_prefix(&self, prefix: &str) -> Vec<(String, FoundControl)> {
        let Some(namespaces) =
            self.with_derived(|derived| derived.prefix_index.get(prefix).cloned())
        else {
            return Vec::new();
        };
        let mut out = Vec::new();
        let mut seen = std::collections::HashSet::new();
        for (namespace, _) in &namespaces {
            let ns_dot = format!("{namespace}.");
            for (_, source) in &self.snapshots {
                for (full_name, definition) in &source.controls {
                    let Some(local) = full_name.strip_prefix(&ns_dot) else {
                        continue;
                    };
                    if local.contains('.') || definition.is_abstract {
                        continue;
                    }
                    if seen.insert(local.to_owned()) {
                        out.push((
                            local.to_owned(),
                            FoundControl {
                                full_name: full_name.clone(),
                                definition: Arc::clone(definition),
                            },
                        ));
                    }
                }
            }
        }
        out
    }

    fn with_derived<T>(&self, f: impl FnOnce(&DerivedCaches) -> T) -> T {
        let mut caches = self.caches.lock().expect("registry cache lock");
        if caches.derived.is_none() {
            caches.derived = Some(self.build_derived());
        }
        f(caches.derived.as_ref().expect("caches were just built"))
    }

    fn build_derived(&self) -> DerivedCaches {
        let mut derived = DerivedCaches::default();
        for (_, source) in &self.snapshots {
            for registration in &source.registrations {
                match registration {
                    ControlRegistration::Markup { tag, src } => {
                        derived
                            .markup_tags
                            .entry(tag.clone())
                            .or_insert_with(|| src.clone());
                    }
                    ControlRegistration::Code {
                        tag_prefix,
                        namespace,
                        assembly,
                    } => {
                        let entries = derived.prefix_index.entry(tag_prefix.clone()).or_default();
                        if entries.is_empty() {
                            derived.prefix_order.push(tag_prefix.clone());
                        }
                        let entry = (namespace.clone(), assembly.clone());
                        if !entries.contains(&entry) {
                            entries.push(entry);
                        }
                    }
                }
            }
        }
        derived
    }
}
