use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;

/// Synthesis voice requested for Aura's side of the conversation.
#[derive(Debug, Clone, PartialEq)]
pub enum Voice {
    Breeze,
    Ember,
    Sage,
    Custom(String),
}

impl Serialize for Voice {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Voice::Breeze => serializer.serialize_str("breeze"),
            Voice::Ember => serializer.serialize_str("ember"),
            Voice::Sage => serializer.serialize_str("sage"),
            Voice::Custom(s) => serializer.serialize_str(s),
        }
    }
}

impl FromStr for Voice {
    type Err = serde_json::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "breeze" => Voice::Breeze,
            "ember" => Voice::Ember,
            "sage" => Voice::Sage,
            _ => Voice::Custom(s.to_string()),
        })
    }
}

impl<'de> Deserialize<'de> for Voice {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Voice::from_str(&s).unwrap())
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq)]
pub enum AudioFormat {
    #[serde(rename = "pcm16")]
    Pcm16,
}
