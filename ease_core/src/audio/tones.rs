//! Named healing tones and nature-sound kinds.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Solfeggio-style tone labels accepted by the engine
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HealingTone {
    #[serde(rename = "174Hz")]
    Hz174,
    #[serde(rename = "285Hz")]
    Hz285,
    #[serde(rename = "396Hz")]
    Hz396,
    #[serde(rename = "417Hz")]
    Hz417,
    #[serde(rename = "528Hz")]
    Hz528,
    #[serde(rename = "639Hz")]
    Hz639,
    #[serde(rename = "741Hz")]
    Hz741,
    #[serde(rename = "852Hz")]
    Hz852,
    #[serde(rename = "963Hz")]
    Hz963,
}

impl HealingTone {
    pub const ALL: [HealingTone; 9] = [
        HealingTone::Hz174,
        HealingTone::Hz285,
        HealingTone::Hz396,
        HealingTone::Hz417,
        HealingTone::Hz528,
        HealingTone::Hz639,
        HealingTone::Hz741,
        HealingTone::Hz852,
        HealingTone::Hz963,
    ];

    pub fn frequency(self) -> f32 {
        match self {
            HealingTone::Hz174 => 174.0,
            HealingTone::Hz285 => 285.0,
            HealingTone::Hz396 => 396.0,
            HealingTone::Hz417 => 417.0,
            HealingTone::Hz528 => 528.0,
            HealingTone::Hz639 => 639.0,
            HealingTone::Hz741 => 741.0,
            HealingTone::Hz852 => 852.0,
            HealingTone::Hz963 => 963.0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            HealingTone::Hz174 => "174Hz",
            HealingTone::Hz285 => "285Hz",
            HealingTone::Hz396 => "396Hz",
            HealingTone::Hz417 => "417Hz",
            HealingTone::Hz528 => "528Hz",
            HealingTone::Hz639 => "639Hz",
            HealingTone::Hz741 => "741Hz",
            HealingTone::Hz852 => "852Hz",
            HealingTone::Hz963 => "963Hz",
        }
    }

    pub fn purpose(self) -> &'static str {
        match self {
            HealingTone::Hz174 => "Pain relief",
            HealingTone::Hz285 => "Tissue healing",
            HealingTone::Hz396 => "Liberation from fear",
            HealingTone::Hz417 => "Facilitating change",
            HealingTone::Hz528 => "Repair and renewal",
            HealingTone::Hz639 => "Relationships and connection",
            HealingTone::Hz741 => "Awakening intuition",
            HealingTone::Hz852 => "Spiritual order",
            HealingTone::Hz963 => "Higher consciousness",
        }
    }

    /// Parse a label such as `528Hz`
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.label() == label)
    }
}

impl fmt::Display for HealingTone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for HealingTone {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_label(s).ok_or_else(|| Error::Other(format!("Unknown healing tone: {}", s)))
    }
}

/// Tones played back to back by the pain-relief sequence, with seconds each
pub const PAIN_RELIEF_SEQUENCE: [(HealingTone, u32); 4] = [
    (HealingTone::Hz174, 60),
    (HealingTone::Hz285, 60),
    (HealingTone::Hz528, 120),
    (HealingTone::Hz741, 60),
];

/// Ambience generated from filtered noise
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NatureSound {
    Rain,
    Ocean,
    Forest,
}

impl NatureSound {
    pub const ALL: [NatureSound; 3] = [NatureSound::Rain, NatureSound::Ocean, NatureSound::Forest];

    pub fn as_str(self) -> &'static str {
        match self {
            NatureSound::Rain => "rain",
            NatureSound::Ocean => "ocean",
            NatureSound::Forest => "forest",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == name)
    }
}

impl fmt::Display for NatureSound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NatureSound {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| Error::Other(format!("Unknown nature sound: {}", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_round_trip() {
        for tone in HealingTone::ALL {
            assert_eq!(HealingTone::from_label(tone.label()), Some(tone));
            assert_eq!(format!("{}Hz", tone.frequency() as u32), tone.label());
        }
        assert_eq!(HealingTone::from_label("440Hz"), None);
        assert!("528hz".parse::<HealingTone>().is_err());
    }

    #[test]
    fn test_serde_uses_labels() {
        let json = serde_json::to_string(&HealingTone::Hz528).unwrap();
        assert_eq!(json, "\"528Hz\"");
        let kind: NatureSound = serde_json::from_str("\"ocean\"").unwrap();
        assert_eq!(kind, NatureSound::Ocean);
    }

    #[test]
    fn test_sequence_lasts_five_minutes() {
        let total: u32 = PAIN_RELIEF_SEQUENCE.iter().map(|(_, s)| s).sum();
        assert_eq!(total, 300);
    }

    #[test]
    fn test_nature_names() {
        assert_eq!("rain".parse::<NatureSound>().unwrap(), NatureSound::Rain);
        assert_eq!(NatureSound::from_name("thunder"), None);
    }
}
