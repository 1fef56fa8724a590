//! Response schemas of the lookup service.
//!
//! Bodies are decoded into explicit structs; anything that does not fit is a
//! [`LookupError::Schema`] rather than a silently missing field.

use serde::{Deserialize, Serialize};

use crate::error::LookupError;
use crate::model::search_state::ResultRecord;

/// Which endpoint layout and body shapes the service speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireFormat {
    /// `/tag/{tag}` → `{members}`, `/name/{name}` → `{name, id, imageUrl}`
    #[default]
    Generic,

    /// `/type/{tag}` and `/pokemon/{name}` of the public PokeAPI.
    PokeApi,
}

impl WireFormat {
    #[must_use]
    pub const fn tag_segment(self) -> &'static str {
        match self {
            Self::Generic => "tag",
            Self::PokeApi => "type",
        }
    }

    #[must_use]
    pub const fn name_segment(self) -> &'static str {
        match self {
            Self::Generic => "name",
            Self::PokeApi => "pokemon",
        }
    }

    pub fn decode_members(self, body: &[u8]) -> Result<Vec<String>, LookupError> {
        match self {
            Self::Generic => {
                let parsed: GenericMembers = decode(body)?;
                Ok(parsed.members)
            }
            Self::PokeApi => {
                let parsed: PokeType = decode(body)?;
                Ok(parsed
                    .pokemon
                    .into_iter()
                    .map(|slot| slot.pokemon.name)
                    .collect())
            }
        }
    }

    pub fn decode_record(self, body: &[u8]) -> Result<ResultRecord, LookupError> {
        match self {
            Self::Generic => {
                let parsed: GenericRecord = decode(body)?;
                Ok(ResultRecord {
                    name: parsed.name,
                    id: parsed.id,
                    image_url: parsed.image_url,
                })
            }
            Self::PokeApi => {
                let parsed: PokeRecord = decode(body)?;
                let image_url = parsed
                    .sprites
                    .and_then(|s| s.other)
                    .and_then(|o| o.official_artwork)
                    .and_then(|a| a.front_default);
                Ok(ResultRecord {
                    name: parsed.name,
                    id: parsed.id,
                    image_url,
                })
            }
        }
    }
}

fn decode<'de, T: Deserialize<'de>>(body: &'de [u8]) -> Result<T, LookupError> {
    serde_json::from_slice(body).map_err(|e| LookupError::Schema(e.to_string()))
}

#[derive(Debug, Deserialize)]
struct GenericMembers {
    members: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenericRecord {
    name: String,
    id: u64,
    #[serde(default)]
    image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PokeType {
    pokemon: Vec<PokeTypeSlot>,
}

#[derive(Debug, Deserialize)]
struct PokeTypeSlot {
    pokemon: NamedResource,
}

#[derive(Debug, Deserialize)]
struct NamedResource {
    name: String,
}

#[derive(Debug, Deserialize)]
struct PokeRecord {
    name: String,
    id: u64,
    #[serde(default)]
    sprites: Option<PokeSprites>,
}

#[derive(Debug, Deserialize)]
struct PokeSprites {
    #[serde(default)]
    other: Option<PokeOtherSprites>,
}

#[derive(Debug, Deserialize)]
struct PokeOtherSprites {
    #[serde(rename = "official-artwork", default)]
    official_artwork: Option<PokeArtwork>,
}

#[derive(Debug, Deserialize)]
struct PokeArtwork {
    #[serde(default)]
    front_default: Option<String>,
}
