use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};

/// Bitmask of daemon subsystems reported by `changed:` lines while idle.
///
/// Bit positions follow the numbering used by the reference C client, so a
/// mask can be handed to hosts that already speak that convention.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct IdleEvents(u32);

const NAMES: &[(&str, IdleEvents)] = &[
    ("database", IdleEvents::DATABASE),
    ("stored_playlist", IdleEvents::STORED_PLAYLIST),
    ("playlist", IdleEvents::QUEUE),
    ("player", IdleEvents::PLAYER),
    ("mixer", IdleEvents::MIXER),
    ("output", IdleEvents::OUTPUT),
    ("options", IdleEvents::OPTIONS),
    ("update", IdleEvents::UPDATE),
    ("sticker", IdleEvents::STICKER),
    ("subscription", IdleEvents::SUBSCRIPTION),
    ("message", IdleEvents::MESSAGE),
    ("partition", IdleEvents::PARTITION),
    ("neighbor", IdleEvents::NEIGHBOR),
    ("mount", IdleEvents::MOUNT),
];

impl IdleEvents {
    pub const NONE: Self = Self(0);
    pub const DATABASE: Self = Self(0x1);
    pub const STORED_PLAYLIST: Self = Self(0x2);
    pub const QUEUE: Self = Self(0x4);
    pub const PLAYER: Self = Self(0x8);
    pub const MIXER: Self = Self(0x10);
    pub const OUTPUT: Self = Self(0x20);
    pub const OPTIONS: Self = Self(0x40);
    pub const UPDATE: Self = Self(0x80);
    pub const STICKER: Self = Self(0x100);
    pub const SUBSCRIPTION: Self = Self(0x200);
    pub const MESSAGE: Self = Self(0x400);
    pub const PARTITION: Self = Self(0x800);
    pub const NEIGHBOR: Self = Self(0x1000);
    pub const MOUNT: Self = Self(0x2000);
    /// Every bit set. Used to force a full status refresh.
    pub const ALL: Self = Self(u32::MAX);

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True if any bit of `other` is also set in `self`.
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Look up a subsystem by its wire name (`"player"`, `"options"`, ...).
    ///
    /// Unknown names yield `None`; newer daemons add subsystems and a client
    /// should ignore the ones it does not know.
    pub fn from_name(name: &str) -> Option<Self> {
        NAMES
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, ev)| *ev)
    }

    /// Parse one `changed: <subsystem>` line.
    ///
    /// Returns `None` for lines that are not `changed:` lines or that name an
    /// unknown subsystem.
    pub fn parse_changed(line: &str) -> Option<Self> {
        let line = line.trim_end_matches('\n').trim_end_matches('\r');
        let (key, value) = line.split_once(": ")?;
        if key != "changed" {
            return None;
        }
        Self::from_name(value.trim())
    }

    /// Wire names of all known subsystems set in this mask.
    pub fn names(self) -> impl Iterator<Item = &'static str> {
        NAMES
            .iter()
            .filter(move |(_, ev)| self.intersects(*ev))
            .map(|(n, _)| *n)
    }
}

impl BitOr for IdleEvents {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for IdleEvents {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for IdleEvents {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl fmt::Display for IdleEvents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.names().collect();
        if names.is_empty() {
            f.write_str("none")
        } else {
            f.write_str(&names.join("|"))
        }
    }
}
