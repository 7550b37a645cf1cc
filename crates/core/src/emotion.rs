//! The closed set of sticker emotions and their static captions.
//!
//! Every pack contains exactly one sticker per [`Emotion`], in the order of
//! [`Emotion::ALL`]. Captions come from a fixed lookup and are never produced
//! by a backend.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of emotions (and therefore stickers) in a pack.
pub const EMOTION_COUNT: usize = 16;

/// One expressive state a sticker can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Emotion {
    Greeting,
    Thanks,
    Received,
    Farewell,
    Confused,
    Happy,
    Crying,
    Angry,
    Encouraging,
    GoodNight,
    Slacking,
    Shocked,
    Awkward,
    Love,
    Ok,
    Speechless,
}

impl Emotion {
    /// All emotions in canonical pack order.
    pub const ALL: [Emotion; EMOTION_COUNT] = [
        Emotion::Greeting,
        Emotion::Thanks,
        Emotion::Received,
        Emotion::Farewell,
        Emotion::Confused,
        Emotion::Happy,
        Emotion::Crying,
        Emotion::Angry,
        Emotion::Encouraging,
        Emotion::GoodNight,
        Emotion::Slacking,
        Emotion::Shocked,
        Emotion::Awkward,
        Emotion::Love,
        Emotion::Ok,
        Emotion::Speechless,
    ];

    /// Localized caption baked into the sticker.
    pub fn caption(&self) -> &'static str {
        match self {
            Emotion::Greeting => "你好",
            Emotion::Thanks => "谢谢",
            Emotion::Received => "收到",
            Emotion::Farewell => "再见",
            Emotion::Confused => "疑惑",
            Emotion::Happy => "开心",
            Emotion::Crying => "大哭",
            Emotion::Angry => "生气",
            Emotion::Encouraging => "加油",
            Emotion::GoodNight => "晚安",
            Emotion::Slacking => "摸鱼",
            Emotion::Shocked => "震惊",
            Emotion::Awkward => "尴尬",
            Emotion::Love => "比心",
            Emotion::Ok => "好的",
            Emotion::Speechless => "无语",
        }
    }

    /// What the character should be doing, phrased for an image prompt.
    pub fn intent(&self) -> &'static str {
        match self {
            Emotion::Greeting => "waving hello with a friendly smile",
            Emotion::Thanks => "bowing gratefully with hands together",
            Emotion::Received => "giving a crisp salute to acknowledge a message",
            Emotion::Farewell => "waving goodbye while turning to leave",
            Emotion::Confused => "tilting its head with a question mark expression",
            Emotion::Happy => "laughing joyfully with sparkling eyes",
            Emotion::Crying => "bawling with streams of tears",
            Emotion::Angry => "fuming with a red face and clenched fists",
            Emotion::Encouraging => "pumping a fist to cheer someone on",
            Emotion::GoodNight => "yawning sleepily while hugging a pillow",
            Emotion::Slacking => "lazing around and avoiding work",
            Emotion::Shocked => "jaw dropped with wide eyes in disbelief",
            Emotion::Awkward => "sweating nervously with an uneasy grin",
            Emotion::Love => "making a heart shape with its hands",
            Emotion::Ok => "giving an enthusiastic thumbs up",
            Emotion::Speechless => "staring blankly with a flat expression",
        }
    }

    /// Stable snake_case key used in file names and JSON.
    pub fn key(&self) -> &'static str {
        match self {
            Emotion::Greeting => "greeting",
            Emotion::Thanks => "thanks",
            Emotion::Received => "received",
            Emotion::Farewell => "farewell",
            Emotion::Confused => "confused",
            Emotion::Happy => "happy",
            Emotion::Crying => "crying",
            Emotion::Angry => "angry",
            Emotion::Encouraging => "encouraging",
            Emotion::GoodNight => "good_night",
            Emotion::Slacking => "slacking",
            Emotion::Shocked => "shocked",
            Emotion::Awkward => "awkward",
            Emotion::Love => "love",
            Emotion::Ok => "ok",
            Emotion::Speechless => "speechless",
        }
    }

    /// Zero-based position in [`Emotion::ALL`].
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Error returned when a string names no known emotion.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown emotion: {0}")]
pub struct UnknownEmotion(pub String);

impl FromStr for Emotion {
    type Err = UnknownEmotion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .flat_map(char::to_lowercase)
            .collect();

        let emotion = match normalized.as_str() {
            "greeting" | "hi" | "hello" => Emotion::Greeting,
            "thanks" | "thankyou" => Emotion::Thanks,
            "received" => Emotion::Received,
            "farewell" | "bye" | "goodbye" => Emotion::Farewell,
            "confused" => Emotion::Confused,
            "happy" => Emotion::Happy,
            "crying" => Emotion::Crying,
            "angry" => Emotion::Angry,
            "encouraging" | "fighting" => Emotion::Encouraging,
            "goodnight" => Emotion::GoodNight,
            "slacking" => Emotion::Slacking,
            "shocked" => Emotion::Shocked,
            "awkward" => Emotion::Awkward,
            "love" => Emotion::Love,
            "ok" => Emotion::Ok,
            "speechless" => Emotion::Speechless,
            _ => return Err(UnknownEmotion(s.to_string())),
        };
        Ok(emotion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_all_is_canonical_and_complete() {
        assert_eq!(Emotion::ALL.len(), EMOTION_COUNT);
        for (idx, emotion) in Emotion::ALL.iter().enumerate() {
            assert_eq!(emotion.index(), idx);
        }
        let unique: HashSet<_> = Emotion::ALL.iter().collect();
        assert_eq!(unique.len(), EMOTION_COUNT);
    }

    #[test]
    fn test_captions_are_total_and_distinct() {
        let captions: HashSet<_> = Emotion::ALL.iter().map(|e| e.caption()).collect();
        assert_eq!(captions.len(), EMOTION_COUNT);
        assert_eq!(Emotion::Received.caption(), "收到");
        assert_eq!(Emotion::Ok.caption(), "好的");
    }

    #[test]
    fn test_parse_keys_and_aliases() {
        for emotion in Emotion::ALL {
            assert_eq!(emotion.key().parse::<Emotion>().unwrap(), emotion);
            assert_eq!(format!("{:?}", emotion).parse::<Emotion>().unwrap(), emotion);
        }
        assert_eq!("Hi".parse::<Emotion>().unwrap(), Emotion::Greeting);
        assert_eq!("Bye".parse::<Emotion>().unwrap(), Emotion::Farewell);
        assert_eq!("Fighting".parse::<Emotion>().unwrap(), Emotion::Encouraging);
        assert_eq!("good-night".parse::<Emotion>().unwrap(), Emotion::GoodNight);
        assert!("sleepy".parse::<Emotion>().is_err());
    }

    #[test]
    fn test_serde_uses_keys() {
        let json = serde_json::to_string(&Emotion::GoodNight).unwrap();
        assert_eq!(json, "\"good_night\"");
        let parsed: Emotion = serde_json::from_str("\"speechless\"").unwrap();
        assert_eq!(parsed, Emotion::Speechless);
    }
}
