use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{ParseError, UNKNOWN_LOCATION};
use crate::world::{ResourceId, Rotation};

/// A block plus its property values, e.g. `minecraft:furnace[facing=north,lit=false]`.
///
/// Properties are kept sorted so the string form is canonical: two equal states
/// always serialize to the same bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BlockState {
    block: ResourceId,
    properties: BTreeMap<String, String>,
}

impl BlockState {
    pub fn new(block: ResourceId) -> Self {
        Self {
            block,
            properties: BTreeMap::new(),
        }
    }

    /// The "no block" state
    pub fn air() -> Self {
        Self::new(ResourceId::minecraft("air"))
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn block(&self) -> &ResourceId {
        &self.block
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    pub fn is_air(&self) -> bool {
        self.block.namespace() == "minecraft"
            && matches!(self.block.path(), "air" | "cave_air" | "void_air")
    }

    /// Rotate direction-carrying properties about the vertical axis.
    /// Handles horizontal `facing`, log-style `axis` and 16-step `rotation`.
    pub fn rotated(&self, rotation: Rotation) -> Self {
        if rotation == Rotation::None {
            return self.clone();
        }

        let mut rotated = self.clone();
        if let Some(facing) = self.property("facing") {
            if let Some(turned) = rotation.rotate_facing(facing) {
                rotated.properties.insert("facing".to_string(), turned.to_string());
            }
        }
        if let Some(axis) = self.property("axis") {
            if rotation.quarter_turns() % 2 == 1 {
                let swapped = match axis {
                    "x" => "z",
                    "z" => "x",
                    other => other,
                };
                rotated.properties.insert("axis".to_string(), swapped.to_string());
            }
        }
        if let Some(step) = self.property("rotation").and_then(|v| v.parse::<u8>().ok()) {
            if step < 16 {
                let turned = (step + 4 * rotation.quarter_turns()) % 16;
                rotated.properties.insert("rotation".to_string(), turned.to_string());
            }
        }
        rotated
    }

    /// Parse the block-state string syntax
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        let (id_part, props_part) = match input.find('[') {
            Some(open) => (&input[..open], Some((open, &input[open + 1..]))),
            None => (input, None),
        };

        let block = ResourceId::parse(id_part).map_err(|e| match e {
            ParseError::ResourceId { reason, .. } => syntax_error(input, 1, &reason),
            other => other,
        })?;
        let mut state = Self::new(block);

        let Some((open, rest)) = props_part else {
            return Ok(state);
        };
        let Some(body) = rest.strip_suffix(']') else {
            return Err(syntax_error(
                input,
                input.chars().count() + 1,
                "unterminated property list, expected `]`",
            ));
        };
        if body.is_empty() {
            return Ok(state);
        }

        // column of the first character inside the brackets, 1-based
        let mut column = input[..open].chars().count() + 2;
        for pair in body.split(',') {
            let Some((key, value)) = pair.split_once('=') else {
                return Err(syntax_error(input, column, "expected `key=value`"));
            };
            if key.is_empty() || !key.chars().all(valid_property_char) {
                return Err(syntax_error(input, column, "invalid property name"));
            }
            let value_column = column + key.chars().count() + 1;
            if value.is_empty() || !value.chars().all(valid_property_char) {
                return Err(syntax_error(input, value_column, "invalid property value"));
            }
            if state.properties.insert(key.to_string(), value.to_string()).is_some() {
                return Err(syntax_error(input, column, &format!("duplicate property `{}`", key)));
            }
            column += pair.chars().count() + 1;
        }

        Ok(state)
    }
}

fn valid_property_char(c: char) -> bool {
    matches!(c, 'a'..='z' | '0'..='9' | '_')
}

fn syntax_error(literal: &str, column: usize, reason: &str) -> ParseError {
    ParseError::BlockState {
        literal: literal.to_string(),
        location: UNKNOWN_LOCATION.to_string(),
        column,
        reason: reason.to_string(),
    }
}

impl fmt::Display for BlockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.block)?;
        if !self.properties.is_empty() {
            write!(f, "[")?;
            for (i, (key, value)) in self.properties.iter().enumerate() {
                if i > 0 {
                    write!(f, ",")?;
                }
                write!(f, "{}={}", key, value)?;
            }
            write!(f, "]")?;
        }
        Ok(())
    }
}

impl FromStr for BlockState {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for BlockState {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<BlockState> for String {
    fn from(state: BlockState) -> Self {
        state.to_string()
    }
}

impl From<ResourceId> for BlockState {
    fn from(block: ResourceId) -> Self {
        Self::new(block)
    }
}
