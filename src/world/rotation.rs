use glam::IVec3;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Quarter-turn rotation about the vertical (+Y) axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    None,
    Clockwise90,
    Clockwise180,
    CounterClockwise90,
}

/// Horizontal facings in clockwise order, as seen from above
const HORIZONTAL_FACINGS: [&str; 4] = ["north", "east", "south", "west"];

impl Rotation {
    /// All rotations in validation search order
    pub const ALL: [Rotation; 4] = [
        Rotation::None,
        Rotation::Clockwise90,
        Rotation::Clockwise180,
        Rotation::CounterClockwise90,
    ];

    pub fn quarter_turns(self) -> u8 {
        match self {
            Rotation::None => 0,
            Rotation::Clockwise90 => 1,
            Rotation::Clockwise180 => 2,
            Rotation::CounterClockwise90 => 3,
        }
    }

    pub fn from_quarter_turns(turns: u8) -> Self {
        Self::ALL[(turns % 4) as usize]
    }

    pub fn degrees(self) -> u16 {
        u16::from(self.quarter_turns()) * 90
    }

    /// Rotation that undoes this one
    pub fn inverse(self) -> Self {
        Self::from_quarter_turns(4 - self.quarter_turns())
    }

    /// Apply `other` after `self`
    pub fn then(self, other: Rotation) -> Self {
        Self::from_quarter_turns(self.quarter_turns() + other.quarter_turns())
    }

    /// Rotate an integer offset. Y is untouched.
    pub fn rotate(self, offset: IVec3) -> IVec3 {
        match self {
            Rotation::None => offset,
            Rotation::Clockwise90 => IVec3::new(-offset.z, offset.y, offset.x),
            Rotation::Clockwise180 => IVec3::new(-offset.x, offset.y, -offset.z),
            Rotation::CounterClockwise90 => IVec3::new(offset.z, offset.y, -offset.x),
        }
    }

    /// Rotate a horizontal facing name. Returns `None` for `up`, `down` and
    /// anything that isn't a facing.
    pub fn rotate_facing(self, facing: &str) -> Option<&'static str> {
        let index = HORIZONTAL_FACINGS.iter().position(|f| *f == facing)?;
        Some(HORIZONTAL_FACINGS[(index + self.quarter_turns() as usize) % 4])
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}°", self.degrees())
    }
}
