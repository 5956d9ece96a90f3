//! Seasonal color categories
//!
//! Four seasons, each with three of the four subtypes, give twelve tones.
//! Tone ids are `"<subtype>-<season>"`, e.g. `light-spring`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{AnalysisError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Season {
    Spring,
    Summer,
    Autumn,
    Winter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Subtype {
    Light,
    Bright,
    Mute,
    Deep,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Undertone {
    Warm,
    Cool,
    Neutral,
}

impl Season {
    pub const ALL: [Season; 4] = [Season::Spring, Season::Summer, Season::Autumn, Season::Winter];

    pub fn as_str(self) -> &'static str {
        match self {
            Season::Spring => "spring",
            Season::Summer => "summer",
            Season::Autumn => "autumn",
            Season::Winter => "winter",
        }
    }

    pub fn undertone(self) -> Undertone {
        match self {
            Season::Spring | Season::Autumn => Undertone::Warm,
            Season::Summer | Season::Winter => Undertone::Cool,
        }
    }

    /// The three subtypes that exist for this season
    pub fn subtypes(self) -> [Subtype; 3] {
        match self {
            Season::Spring | Season::Summer => [Subtype::Light, Subtype::Bright, Subtype::Mute],
            Season::Autumn => [Subtype::Mute, Subtype::Deep, Subtype::Bright],
            Season::Winter => [Subtype::Bright, Subtype::Deep, Subtype::Light],
        }
    }

    pub fn has_subtype(self, subtype: Subtype) -> bool {
        self.subtypes().contains(&subtype)
    }

    /// Snap a subtype onto this season's valid set
    ///
    /// Light seasons have no deep tones and read them as mute; autumn reads
    /// light as mute; winter reads mute as deep.
    pub fn nearest_subtype(self, subtype: Subtype) -> Subtype {
        if self.has_subtype(subtype) {
            return subtype;
        }
        match (self, subtype) {
            (Season::Winter, _) => Subtype::Deep,
            _ => Subtype::Mute,
        }
    }
}

impl Subtype {
    pub const ALL: [Subtype; 4] = [Subtype::Light, Subtype::Bright, Subtype::Mute, Subtype::Deep];

    pub fn as_str(self) -> &'static str {
        match self {
            Subtype::Light => "light",
            Subtype::Bright => "bright",
            Subtype::Mute => "mute",
            Subtype::Deep => "deep",
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Subtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Season {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self> {
        Season::ALL
            .into_iter()
            .find(|season| season.as_str() == s)
            .ok_or_else(|| AnalysisError::invalid_parameter("season", s))
    }
}

impl FromStr for Subtype {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self> {
        Subtype::ALL
            .into_iter()
            .find(|subtype| subtype.as_str() == s)
            .ok_or_else(|| AnalysisError::invalid_parameter("subtype", s))
    }
}

/// One of the twelve seasonal tones
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TwelveTone {
    LightSpring,
    BrightSpring,
    MuteSpring,
    LightSummer,
    BrightSummer,
    MuteSummer,
    MuteAutumn,
    DeepAutumn,
    BrightAutumn,
    BrightWinter,
    DeepWinter,
    LightWinter,
}

impl TwelveTone {
    pub const ALL: [TwelveTone; 12] = [
        TwelveTone::LightSpring,
        TwelveTone::BrightSpring,
        TwelveTone::MuteSpring,
        TwelveTone::LightSummer,
        TwelveTone::BrightSummer,
        TwelveTone::MuteSummer,
        TwelveTone::MuteAutumn,
        TwelveTone::DeepAutumn,
        TwelveTone::BrightAutumn,
        TwelveTone::BrightWinter,
        TwelveTone::DeepWinter,
        TwelveTone::LightWinter,
    ];

    /// Combine a season and subtype
    ///
    /// # Errors
    ///
    /// Returns `InvalidToneCombination` for pairs outside the twelve tones,
    /// e.g. deep spring.
    pub fn compose(season: Season, subtype: Subtype) -> Result<Self> {
        use Season::*;
        use Subtype::*;

        let tone = match (season, subtype) {
            (Spring, Light) => TwelveTone::LightSpring,
            (Spring, Bright) => TwelveTone::BrightSpring,
            (Spring, Mute) => TwelveTone::MuteSpring,
            (Summer, Light) => TwelveTone::LightSummer,
            (Summer, Bright) => TwelveTone::BrightSummer,
            (Summer, Mute) => TwelveTone::MuteSummer,
            (Autumn, Mute) => TwelveTone::MuteAutumn,
            (Autumn, Deep) => TwelveTone::DeepAutumn,
            (Autumn, Bright) => TwelveTone::BrightAutumn,
            (Winter, Bright) => TwelveTone::BrightWinter,
            (Winter, Deep) => TwelveTone::DeepWinter,
            (Winter, Light) => TwelveTone::LightWinter,
            _ => {
                return Err(AnalysisError::InvalidToneCombination {
                    season: season.to_string(),
                    subtype: subtype.to_string(),
                })
            }
        };
        Ok(tone)
    }

    pub fn season(self) -> Season {
        match self {
            TwelveTone::LightSpring | TwelveTone::BrightSpring | TwelveTone::MuteSpring => Season::Spring,
            TwelveTone::LightSummer | TwelveTone::BrightSummer | TwelveTone::MuteSummer => Season::Summer,
            TwelveTone::MuteAutumn | TwelveTone::DeepAutumn | TwelveTone::BrightAutumn => Season::Autumn,
            TwelveTone::BrightWinter | TwelveTone::DeepWinter | TwelveTone::LightWinter => Season::Winter,
        }
    }

    pub fn subtype(self) -> Subtype {
        match self {
            TwelveTone::LightSpring | TwelveTone::LightSummer | TwelveTone::LightWinter => Subtype::Light,
            TwelveTone::BrightSpring
            | TwelveTone::BrightSummer
            | TwelveTone::BrightAutumn
            | TwelveTone::BrightWinter => Subtype::Bright,
            TwelveTone::MuteSpring | TwelveTone::MuteSummer | TwelveTone::MuteAutumn => Subtype::Mute,
            TwelveTone::DeepAutumn | TwelveTone::DeepWinter => Subtype::Deep,
        }
    }

    /// Kebab-case identifier, e.g. `"light-spring"`
    pub fn id(self) -> String {
        format!("{}-{}", self.subtype(), self.season())
    }

    pub fn parse(id: &str) -> Result<Self> {
        id.parse()
    }
}

impl fmt::Display for TwelveTone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.subtype(), self.season())
    }
}

impl FromStr for TwelveTone {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || AnalysisError::InvalidToneId { id: s.to_string() };
        let (subtype, season) = s.split_once('-').ok_or_else(invalid)?;
        let subtype: Subtype = subtype.parse().map_err(|_| invalid())?;
        let season: Season = season.parse().map_err(|_| invalid())?;
        TwelveTone::compose(season, subtype).map_err(|_| invalid())
    }
}

/// Season and subtype recovered from a tone id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ParsedTone {
    pub season: Season,
    pub subtype: Subtype,
}

/// Tone id for a season and subtype, e.g. `("spring", "light") → "light-spring"`
pub fn compose_twelve_tone(season: Season, subtype: Subtype) -> Result<String> {
    TwelveTone::compose(season, subtype).map(TwelveTone::id)
}

/// Inverse of [`compose_twelve_tone`]
pub fn parse_twelve_tone(id: &str) -> Result<ParsedTone> {
    let tone = TwelveTone::parse(id)?;
    Ok(ParsedTone {
        season: tone.season(),
        subtype: tone.subtype(),
    })
}
