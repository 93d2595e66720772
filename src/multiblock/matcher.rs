//! Per-cell state matchers
//!
//! JSON forms:
//!
//! ```json
//! "minecraft:stone"                                        // shorthand for exact_state
//! {"type": "codex:exact_state", "state": "minecraft:furnace[facing=north]"}
//! {"type": "codex:predicate", "display": "minecraft:air", "predicate": "codex:air"}
//! {"type": "codex:tag", "display": "minecraft:oak_log", "tag": "minecraft:logs",
//!  "properties": {"axis": "y"}}
//! {"type": "codex:any"}
//! ```

use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

use crate::error::{LookupError, ParseError};
use crate::multiblock::MatchContext;
use crate::world::{BlockState, BlockView, ResourceId, VoxelPos};

pub const EXACT_STATE_TYPE: &str = "codex:exact_state";
pub const PREDICATE_TYPE: &str = "codex:predicate";
pub const TAG_TYPE: &str = "codex:tag";
pub const ANY_TYPE: &str = "codex:any";

/// Predicate over the state of a single grid cell
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StateMatcher {
    /// Matches exactly one block state, properties included
    ExactState { state: BlockState },
    /// Defers to a registered predicate, resolved on first use
    Predicate { display: BlockState, predicate: ResourceId },
    /// Block must be in the tag and carry every listed property value
    Tag {
        display: BlockState,
        tag: ResourceId,
        properties: BTreeMap<String, String>,
    },
    /// Matches anything
    Any,
}

impl StateMatcher {
    pub fn exact(state: BlockState) -> Self {
        StateMatcher::ExactState { state }
    }

    pub fn predicate(display: BlockState, predicate: ResourceId) -> Self {
        StateMatcher::Predicate { display, predicate }
    }

    pub fn tag(display: BlockState, tag: ResourceId) -> Self {
        StateMatcher::Tag {
            display,
            tag,
            properties: BTreeMap::new(),
        }
    }

    /// Type id written in JSON and on the wire
    pub fn type_name(&self) -> &'static str {
        match self {
            StateMatcher::ExactState { .. } => EXACT_STATE_TYPE,
            StateMatcher::Predicate { .. } => PREDICATE_TYPE,
            StateMatcher::Tag { .. } => TAG_TYPE,
            StateMatcher::Any => ANY_TYPE,
        }
    }

    pub fn is_any(&self) -> bool {
        matches!(self, StateMatcher::Any)
    }

    /// State shown for ghost previews and used by placement
    pub fn display_state(&self, _ticks: u64) -> BlockState {
        match self {
            StateMatcher::ExactState { state } => state.clone(),
            StateMatcher::Predicate { display, .. } | StateMatcher::Tag { display, .. } => {
                display.clone()
            }
            StateMatcher::Any => BlockState::air(),
        }
    }

    /// Test an observed state, surfacing unresolved predicate or tag ids
    pub fn try_matches(
        &self,
        ctx: &MatchContext,
        world: &dyn BlockView,
        pos: VoxelPos,
        observed: &BlockState,
    ) -> Result<bool, LookupError> {
        match self {
            StateMatcher::ExactState { state } => Ok(state == observed),
            StateMatcher::Predicate { predicate, .. } => {
                let predicate = ctx.predicates().resolve(predicate)?;
                Ok(predicate(world, pos, observed))
            }
            StateMatcher::Tag { tag, properties, .. } => {
                if !ctx.tags().is_member(tag, observed.block())? {
                    return Ok(false);
                }
                Ok(properties
                    .iter()
                    .all(|(key, value)| observed.property(key) == Some(value.as_str())))
            }
            StateMatcher::Any => Ok(true),
        }
    }

    /// Like [`try_matches`](Self::try_matches), but an unresolved id never matches
    pub fn matches(
        &self,
        ctx: &MatchContext,
        world: &dyn BlockView,
        pos: VoxelPos,
        observed: &BlockState,
    ) -> bool {
        self.try_matches(ctx, world, pos, observed).unwrap_or(false)
    }

    /// Parse the JSON form. `location` names where the value came from.
    pub fn from_json(value: &Value, location: &str) -> Result<Self, ParseError> {
        let object = match value {
            Value::String(literal) => {
                let state = BlockState::parse(literal).map_err(|e| e.at(location))?;
                return Ok(StateMatcher::ExactState { state });
            }
            Value::Object(object) => object,
            _ => return Err(ParseError::json(location, "matcher must be a string or an object")),
        };

        let type_id = required_str(object, "type", location)?;
        match type_id {
            EXACT_STATE_TYPE => Ok(StateMatcher::ExactState {
                state: state_field(object, "state", location)?,
            }),
            PREDICATE_TYPE => Ok(StateMatcher::Predicate {
                display: state_field(object, "display", location)?,
                predicate: id_field(object, "predicate", location)?,
            }),
            TAG_TYPE => Ok(StateMatcher::Tag {
                display: state_field(object, "display", location)?,
                tag: id_field(object, "tag", location)?,
                properties: properties_field(object, location)?,
            }),
            ANY_TYPE => Ok(StateMatcher::Any),
            other => Err(ParseError::UnknownMatcherType {
                type_id: other.to_string(),
                location: location.to_string(),
            }),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            StateMatcher::ExactState { state } => json!({
                "type": EXACT_STATE_TYPE,
                "state": state.to_string(),
            }),
            StateMatcher::Predicate { display, predicate } => json!({
                "type": PREDICATE_TYPE,
                "display": display.to_string(),
                "predicate": predicate.to_string(),
            }),
            StateMatcher::Tag { display, tag, properties } => {
                let mut value = json!({
                    "type": TAG_TYPE,
                    "display": display.to_string(),
                    "tag": tag.to_string(),
                });
                if !properties.is_empty() {
                    value["properties"] = json!(properties);
                }
                value
            }
            StateMatcher::Any => json!({ "type": ANY_TYPE }),
        }
    }
}

fn required_str<'a>(
    object: &'a Map<String, Value>,
    key: &str,
    location: &str,
) -> Result<&'a str, ParseError> {
    match object.get(key) {
        Some(Value::String(s)) => Ok(s.as_str()),
        Some(_) => Err(ParseError::json(format!("{}.{}", location, key), "expected a string")),
        None => Err(ParseError::json(location, format!("missing member `{}`", key))),
    }
}

fn state_field(
    object: &Map<String, Value>,
    key: &str,
    location: &str,
) -> Result<BlockState, ParseError> {
    let literal = required_str(object, key, location)?;
    BlockState::parse(literal).map_err(|e| e.at(format!("{}.{}", location, key)))
}

fn id_field(
    object: &Map<String, Value>,
    key: &str,
    location: &str,
) -> Result<ResourceId, ParseError> {
    let literal = required_str(object, key, location)?;
    ResourceId::parse(literal).map_err(|e| e.at(format!("{}.{}", location, key)))
}

fn properties_field(
    object: &Map<String, Value>,
    location: &str,
) -> Result<BTreeMap<String, String>, ParseError> {
    let Some(value) = object.get("properties") else {
        return Ok(BTreeMap::new());
    };
    let Value::Object(entries) = value else {
        return Err(ParseError::json(format!("{}.properties", location), "expected an object"));
    };

    entries
        .iter()
        .map(|(key, value)| match value {
            Value::String(s) => Ok((key.clone(), s.clone())),
            _ => Err(ParseError::json(
                format!("{}.properties.{}", location, key),
                "property values must be strings",
            )),
        })
        .collect()
}
