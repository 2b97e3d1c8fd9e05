//! The fixed set of academy classes and their static catalog data.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// Highest score a single class can hold in one slot.
pub const MAX_POINTS: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassId {
    Hexcraft,
    Alchemy,
    Arts,
    History,
    Flora,
    Oddities,
}

/// Display data for a class and its mentor.
#[derive(Debug, Clone, Copy)]
pub struct ClassInfo {
    pub name: &'static str,
    pub color: u32,
    pub icon: &'static str,
    pub description: &'static str,
    pub mentor: &'static str,
    pub portrait: &'static str,
    pub praise: &'static str,
    pub scold: &'static str,
}

impl ClassId {
    /// Catalog order, which is also the order profiles are rendered in.
    pub const ALL: [ClassId; 6] = [
        ClassId::Hexcraft,
        ClassId::Alchemy,
        ClassId::Arts,
        ClassId::History,
        ClassId::Flora,
        ClassId::Oddities,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hexcraft => "hexcraft",
            Self::Alchemy => "alchemy",
            Self::Arts => "arts",
            Self::History => "history",
            Self::Flora => "flora",
            Self::Oddities => "oddities",
        }
    }

    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(ClassId::as_str).collect()
    }

    pub fn info(&self) -> &'static ClassInfo {
        match self {
            Self::Hexcraft => &HEXCRAFT,
            Self::Alchemy => &ALCHEMY,
            Self::Arts => &ARTS,
            Self::History => &HISTORY,
            Self::Flora => &FLORA,
            Self::Oddities => &ODDITIES,
        }
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClassId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|class| class.as_str() == wanted)
            .ok_or_else(|| ValidationError::UnknownClass {
                given: s.to_string(),
            })
    }
}

const HEXCRAFT: ClassInfo = ClassInfo {
    name: "Hex Warden",
    color: 0x8e44ad,
    icon: "🧿",
    description: "Masters of mystical warding and arcane secrets.",
    mentor: "Rowena Dove, The Hex Warden",
    portrait: portrait::HEXCRAFT,
    praise: "\"Excellent progress! Your wards shimmer brighter with each lesson.\" ✨",
    scold: "This is beneath the sigils you've drawn. I expected more.",
};

const ALCHEMY: ClassInfo = ClassInfo {
    name: "Master Alchemist",
    color: 0xf1c40f,
    icon: "⚗️",
    description: "Experts in potions and transformative magic.",
    mentor: "Alaric Spellweaver, Master Alchemist",
    portrait: portrait::ALCHEMY,
    praise: "\"A potion's perfection grows with your dedication. Keep stirring!\" 🧪",
    scold: "Even spoiled brews teach us something. Barely.",
};

const ARTS: ClassInfo = ClassInfo {
    name: "Sinbound Enchanter",
    color: 0xe67e22,
    icon: "🎨",
    description: "Creators of enchantments and mystical artistry.",
    mentor: "Silas de Lioncourt, Sinbound Enchanter",
    portrait: portrait::ARTS,
    praise: "\"Your creative spells paint the ether with vibrant hues.\" 🎨",
    scold: "Art without intention is just noise.",
};

const HISTORY: ClassInfo = ClassInfo {
    name: "Coven Chronicler",
    color: 0x2980b9,
    icon: "📚",
    description: "Keepers of knowledge and ancient lore.",
    mentor: "Lena Dreamer, Coven Chronicler",
    portrait: portrait::HISTORY,
    praise: "\"The stories you preserve echo through time. Keep your quill sharp.\" 📜",
    scold: "Forgetting the past? Dangerous mistake.",
};

const FLORA: ClassInfo = ClassInfo {
    name: "Nature's Friend",
    color: 0x27ae60,
    icon: "🌿",
    description: "Friends of nature and plant magic.",
    mentor: "Florence Thistlewhim, Nature's Friend",
    portrait: portrait::FLORA,
    praise: "\"The flora responds to your touch. Let your connection grow.\" 🌿",
    scold: "Even the roots recoil from your carelessness.",
};

const ODDITIES: ClassInfo = ClassInfo {
    name: "Oddity Hunter",
    color: 0x95a5a6,
    icon: "🔮",
    description: "Seekers of the strange and unusual.",
    mentor: "Delayna Morwyn, Oddity Hunter",
    portrait: portrait::ODDITIES,
    praise: "\"Strange magic stirs where others see nothing. Trust your instincts.\" 🔮",
    scold: "Some oddities cannot be tamed by half-measures.",
};

// Full attachment URLs, kept out of the catalog tables above.
mod portrait {
    pub const HEXCRAFT: &str = "https://cdn.discordapp.com/attachments/1116595332244054079/1380074112525013082/474a4930f9a230eeaecc6cd3e5ecf1fd.jpg";
    pub const ALCHEMY: &str = "https://cdn.discordapp.com/attachments/1116595332244054079/1380074111425843280/80830-the-academys-professor-is-overpowered.png";
    pub const ARTS: &str = "https://cdn.discordapp.com/attachments/1116595332244054079/1380074111677632512/IMG_2055.jpg";
    pub const HISTORY: &str = "https://cdn.discordapp.com/attachments/1116595332244054079/1380074111899926620/06b6aa487fe5138d409a42ce244278fb.jpg";
    pub const FLORA: &str = "https://cdn.discordapp.com/attachments/1116595332244054079/1380074112189206581/d0a0d9a5d5bda80fefe1a5afe91307aa.jpg";
    pub const ODDITIES: &str = "https://cdn.discordapp.com/attachments/1116595332244054079/1380074111203807282/Copy_of_Copy_of_Character_Music_20250530_122224_0000.png";
}

/// Portrait of the academy librarian, used on help and grimoire footers.
pub const LIBRARIAN_PORTRAIT: &str = "https://cdn.discordapp.com/attachments/1116595332244054079/1380309908678901933/100d0d9e119c8ae848aedaa556e7111e.jpg";
