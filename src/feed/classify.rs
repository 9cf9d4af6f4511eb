//! Relevance of an entity update for the UI.

/// Kinds of update the UI reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateKind {
    /// A realm was created (`Realm`, `Owner`, `MetaData` and `Position`).
    RealmCreated,
    /// Only a resource balance changed.
    ResourceChanged,
    /// A trade changed (`Trade` and `Status`).
    TradeChanged,
}

const REALM_COMPONENTS: [&str; 4] = ["Realm", "Owner", "MetaData", "Position"];
const TRADE_COMPONENTS: [&str; 2] = ["Trade", "Status"];

/// Classifies a changed component set. `None` means the update is ignored.
///
/// Rules are checked in order: realm creation (superset), a lone `Resource`
/// change (exact), then trade changes (superset).
#[must_use]
pub fn classify<S: AsRef<str>>(names: &[S]) -> Option<UpdateKind> {
    let contains_all = |required: &[&str]| required.iter().all(|r| names.iter().any(|n| n.as_ref() == *r));

    if contains_all(&REALM_COMPONENTS) {
        Some(UpdateKind::RealmCreated)
    } else if names.len() == 1 && names[0].as_ref() == "Resource" {
        Some(UpdateKind::ResourceChanged)
    } else if contains_all(&TRADE_COMPONENTS) {
        Some(UpdateKind::TradeChanged)
    } else {
        None
    }
}

/// Returns true if the update belongs in the update log.
#[must_use]
pub fn is_entity_update<S: AsRef<str>>(names: &[S]) -> bool {
    classify(names).is_some()
}
