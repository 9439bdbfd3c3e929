//! Fact parsing for `hdcryptmgr showlv <lv> -v` output.
//!
//! The status listing looks like:
//!
//! ```text
//! NAME            CRYPTO_STATUS   KEY_PROTECTION_METHODS
//! testlv          locked
//!   #0            Passphrase      initpwd
//!   #1            PKS
//!   #2            Keyfile         key1
//! ```
//!
//! The header and the summary line naming the resource are stable anchors and are
//! required. Every other line is classified by its first token and skipped when it
//! is not a slot record, since status columns change between tool versions.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::types::MethodType;

/// Status word reported for a resource that has no primary key yet.
pub const STATUS_UNINITIALIZED: &str = "uninitialized";
/// Status word reported for a resource that needs authentication before use.
pub const STATUS_LOCKED: &str = "locked";
/// Prefix of the first token on a slot line.
pub const SLOT_MARKER: char = '#';

/// Reasons the status text could not be turned into facts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FactError {
    #[error("status output is empty, expected a header line")]
    MissingHeader,

    #[error("status output has no summary line for {resource}")]
    MissingSummary { resource: String },
}

/// One configured authentication method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodEntry {
    /// Slot index as reported by the tool, without the `#` marker
    pub index: String,
    /// Human-assigned name, when the tool reports one
    pub name: Option<String>,
}

/// Current authentication configuration of one resource.
///
/// Built fresh for every query and dropped after the step that consumed it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResourceAuthState {
    pub resource_id: String,
    pub initialized: bool,
    pub locked: bool,
    pub methods: BTreeMap<MethodType, Vec<MethodEntry>>,
    pub all_names: BTreeSet<String>,
    pub all_indices: BTreeSet<String>,
}

impl ResourceAuthState {
    /// State of a resource with no key-protection methods.
    pub fn uninitialized(resource_id: impl Into<String>) -> Self {
        Self {
            resource_id: resource_id.into(),
            ..Self::default()
        }
    }

    pub fn has_name(&self, name: &str) -> bool {
        self.all_names.contains(name)
    }

    pub fn has_index(&self, index: &str) -> bool {
        self.all_indices.contains(index)
    }

    /// Whether at least one method of `method_type` is configured.
    pub fn has_method_type(&self, method_type: MethodType) -> bool {
        self.methods
            .get(&method_type)
            .is_some_and(|entries| !entries.is_empty())
    }

    /// Total number of configured methods across all types.
    pub fn method_count(&self) -> usize {
        self.methods.values().map(Vec::len).sum()
    }

    fn record_slot(&mut self, index: &str, method_type: Option<MethodType>, name: Option<&str>) {
        if !self.all_indices.insert(index.to_string()) {
            debug!("Slot #{} already recorded for {}, skipping", index, self.resource_id);
            return;
        }

        if let Some(name) = name {
            self.all_names.insert(name.to_string());
        }

        if let Some(method_type) = method_type {
            self.methods.entry(method_type).or_default().push(MethodEntry {
                index: index.to_string(),
                name: name.map(str::to_string),
            });
        }
    }
}

/// Parse `showlv -v` output for `resource_id` into a [`ResourceAuthState`].
pub fn parse(resource_id: &str, raw: &str) -> Result<ResourceAuthState, FactError> {
    let mut lines = raw.lines();

    match lines.next() {
        Some(header) if !header.trim().is_empty() => {}
        _ => return Err(FactError::MissingHeader),
    }

    let mut state = ResourceAuthState::uninitialized(resource_id);
    let mut saw_summary = false;

    for line in lines {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some(&first) = tokens.first() else {
            continue;
        };

        if first == resource_id {
            saw_summary = true;
            apply_summary(&mut state, &tokens[1..]);
        } else if let Some(index) = slot_index(first) {
            let method_type = tokens.get(1).and_then(|word| match word.parse::<MethodType>() {
                Ok(method_type) => Some(method_type),
                Err(_) => {
                    debug!("Unknown method type {:?} in slot #{}", word, index);
                    None
                }
            });
            state.record_slot(index, method_type, tokens.get(2).copied());
        }
    }

    if !saw_summary {
        return Err(FactError::MissingSummary {
            resource: resource_id.to_string(),
        });
    }

    if !state.initialized {
        state.methods.clear();
        state.all_names.clear();
        state.all_indices.clear();
        state.locked = false;
    }

    debug!(
        "Parsed facts for {}: initialized={}, locked={}, methods={}",
        state.resource_id,
        state.initialized,
        state.locked,
        state.method_count()
    );

    Ok(state)
}

fn apply_summary(state: &mut ResourceAuthState, status: &[&str]) {
    let Some(&word) = status.first() else {
        warn!("Summary line for {} has no status word", state.resource_id);
        return;
    };

    if word.eq_ignore_ascii_case(STATUS_UNINITIALIZED) {
        state.initialized = false;
        state.locked = false;
        return;
    }

    state.initialized = true;
    state.locked = status
        .iter()
        .take(2)
        .any(|w| w.eq_ignore_ascii_case(STATUS_LOCKED));
}

/// `#<digits>` → `<digits>`
fn slot_index(token: &str) -> Option<&str> {
    let digits = token.strip_prefix(SLOT_MARKER)?;
    if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
        Some(digits)
    } else {
        None
    }
}
