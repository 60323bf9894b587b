use crate::error::Result;
use crate::status::{parse_num, parse_seconds};

/// The decoded payload of a `currentsong` response.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawSong {
    pub uri: String,
    /// Duration in whole seconds (0 when unknown).
    pub duration: u32,
    pub pos: Option<u32>,
    pub id: Option<u32>,
    /// Tag pairs in the order the daemon sent them.
    pub tags: Vec<(String, String)>,
}

impl RawSong {
    /// Build from the pairs of a `currentsong` response.
    ///
    /// Returns `None` when the response carries no `file:` line, which is
    /// how the daemon reports "no current song".
    pub fn from_pairs<'a, I>(pairs: I) -> Result<Option<Self>>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut song = Self::default();
        let mut found = false;
        let mut precise_duration = None;

        for (key, value) in pairs {
            match key {
                "file" => {
                    song.uri = value.to_owned();
                    found = true;
                }
                "duration" => precise_duration = Some(parse_seconds(value, "duration")?),
                "Time" => song.duration = parse_num(value, "Time")?,
                "Pos" => song.pos = Some(parse_num(value, "Pos")?),
                "Id" => song.id = Some(parse_num(value, "Id")?),
                "Last-Modified" | "Added" | "Format" | "Range" => {}
                _ => song.tags.push((key.to_owned(), value.to_owned())),
            }
        }

        if !found {
            return Ok(None);
        }
        if let Some(d) = precise_duration {
            song.duration = d.round() as u32;
        }
        Ok(Some(song))
    }

    /// First value of a tag, matched case-insensitively (`"artist"` finds
    /// `Artist:`).
    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}
