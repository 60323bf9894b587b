use mpd_rs_protocol::RawSong;

/// The current song, or the absence of one.
///
/// Tag accessors return an empty string for missing tags, so a caller can
/// tell "no song" ([`is_found()`](Self::is_found) is false) from "song
/// without tags" without another `Option` layer.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Song {
    raw: Option<RawSong>,
}

impl Song {
    pub fn new(raw: Option<RawSong>) -> Self {
        Self { raw }
    }

    pub fn is_found(&self) -> bool {
        self.raw.is_some()
    }

    pub fn artist(&self) -> &str {
        self.tag("Artist")
    }

    pub fn album(&self) -> &str {
        self.tag("Album")
    }

    pub fn title(&self) -> &str {
        self.tag("Title")
    }

    /// Duration in whole seconds, 0 when unknown.
    pub fn duration(&self) -> u32 {
        self.raw.as_ref().map_or(0, |s| s.duration)
    }

    /// Song URI relative to the music directory.
    pub fn uri(&self) -> &str {
        self.raw.as_ref().map_or("", |s| s.uri.as_str())
    }

    pub fn id(&self) -> Option<u32> {
        self.raw.as_ref().and_then(|s| s.id)
    }

    /// Position in the queue.
    pub fn position(&self) -> Option<u32> {
        self.raw.as_ref().and_then(|s| s.pos)
    }

    /// First value of any tag, matched case-insensitively.
    pub fn tag(&self, name: &str) -> &str {
        self.raw.as_ref().and_then(|s| s.tag(name)).unwrap_or("")
    }

    pub fn raw(&self) -> Option<&RawSong> {
        self.raw.as_ref()
    }
}

impl From<Option<RawSong>> for Song {
    fn from(raw: Option<RawSong>) -> Self {
        Self::new(raw)
    }
}
