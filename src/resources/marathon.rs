//! Marathon apps, pods and groups.
//!
//! The payload is the JSON definition handed to Marathon. Marathon fills in
//! many defaults of its own, so a definition is satisfied when every field
//! the manifest sets is present with the same value in what Marathon
//! reports back.

use serde_json::{Map, Value};

use crate::config::{MarathonDecl, ResourceDecl};
use crate::model::{DesiredState, NoMembers, ResourceKind, ResourceRef, ResourceState};

use super::KindSpec;

/// Marathon application.
#[derive(Debug, Clone, Copy)]
pub struct App;

/// Marathon pod.
#[derive(Debug, Clone, Copy)]
pub struct Pod;

/// Marathon group.
#[derive(Debug, Clone, Copy)]
pub struct Group;

macro_rules! marathon_kind {
    ($name:ident, $kind:expr) => {
        impl KindSpec for $name {
            type Payload = Value;
            type Member = NoMembers;
            type Decl = MarathonDecl;

            const KIND: ResourceKind = $kind;

            fn resource_ref(decl: &MarathonDecl) -> ResourceRef {
                ResourceRef::new(Self::KIND, normalize_id(&decl.id))
            }

            fn desired(decl: &MarathonDecl) -> DesiredState<Value, NoMembers> {
                desired_definition(decl)
            }

            fn payload_eq(desired: &Value, observed: &Value) -> bool {
                is_subset(desired, observed)
            }
        }
    };
}

marathon_kind!(App, ResourceKind::App);
marathon_kind!(Pod, ResourceKind::Pod);
marathon_kind!(Group, ResourceKind::Group);

/// Normalises a Marathon identifier to exactly one leading slash.
#[must_use]
pub fn normalize_id(raw: &str) -> String {
    format!("/{}", raw.trim_matches('/'))
}

/// Returns the definition to send. Its `id` is always the normalised
/// declared id, so the payload names the resource it is stored under.
#[must_use]
pub fn definition(decl: &MarathonDecl) -> Value {
    let mut fields = match &decl.definition {
        Value::Object(fields) => fields.clone(),
        _ => Map::new(),
    };
    fields.insert("id".to_string(), Value::String(normalize_id(&decl.id)));
    Value::Object(fields)
}

/// Returns true if the declaration carries a usable definition.
#[must_use]
pub const fn has_object_definition(decl: &ResourceDecl) -> bool {
    match decl {
        ResourceDecl::App(marathon) | ResourceDecl::Pod(marathon) | ResourceDecl::Group(marathon) => {
            matches!(marathon.definition, Value::Object(_) | Value::Null)
        }
        _ => true,
    }
}

fn desired_definition(decl: &MarathonDecl) -> DesiredState<Value, NoMembers> {
    if decl.state.is_present() {
        ResourceState::Present(definition(decl))
    } else {
        ResourceState::Absent
    }
}

/// Returns true if every field set in `desired` has the same value in
/// `observed`. Arrays and scalars must match exactly.
#[must_use]
pub fn is_subset(desired: &Value, observed: &Value) -> bool {
    match (desired, observed) {
        (Value::Object(wanted), Value::Object(actual)) => wanted.iter().all(|(key, value)| {
            actual
                .get(key)
                .is_some_and(|current| is_subset(value, current))
        }),
        _ => desired == observed,
    }
}
