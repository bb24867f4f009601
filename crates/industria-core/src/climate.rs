use serde::{Deserialize, Serialize};

/// Climate zone of a map tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Climate {
    Water,
    Desert,
    Tropic,
    Mediterran,
    #[default]
    Temperate,
    Tundra,
    Rocky,
    Arctic,
}

impl Climate {
    pub fn all() -> [Climate; 8] {
        [
            Climate::Water,
            Climate::Desert,
            Climate::Tropic,
            Climate::Mediterran,
            Climate::Temperate,
            Climate::Tundra,
            Climate::Rocky,
            Climate::Arctic,
        ]
    }

    pub fn bit(self) -> ClimateBits {
        ClimateBits(1 << self as u16)
    }
}

/// Set of climates, one bit per [`Climate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClimateBits(pub u16);

impl ClimateBits {
    pub const NONE: ClimateBits = ClimateBits(0);
    pub const ALL: ClimateBits = ClimateBits(0xFF);
    /// Every land climate (everything except water).
    pub const ALL_LAND: ClimateBits = ClimateBits(0xFE);

    pub fn contains(self, climate: Climate) -> bool {
        self.0 & climate.bit().0 != 0
    }

    pub fn with(self, climate: Climate) -> ClimateBits {
        ClimateBits(self.0 | climate.bit().0)
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl Default for ClimateBits {
    fn default() -> Self {
        ClimateBits::ALL_LAND
    }
}

impl FromIterator<Climate> for ClimateBits {
    fn from_iter<I: IntoIterator<Item = Climate>>(iter: I) -> Self {
        iter.into_iter().fold(ClimateBits::NONE, ClimateBits::with)
    }
}
