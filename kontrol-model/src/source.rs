//! Origin tags attached to every state change

use serde::{Deserialize, Serialize};
use std::fmt;

/// Broad category of a change origin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Local,
    Midi,
    Osc,
    Preset,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Local => write!(f, "local"),
            SourceKind::Midi => write!(f, "midi"),
            SourceKind::Osc => write!(f, "osc"),
            SourceKind::Preset => write!(f, "preset"),
        }
    }
}

/// Identifies where a state change came from.
///
/// Two sources are the same origin iff both kind and id match. OSC peers are
/// identified by their `host:port`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChangeSource {
    pub kind: SourceKind,
    pub id: String,
}

impl ChangeSource {
    pub fn new(kind: SourceKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }

    pub fn local() -> Self {
        Self::new(SourceKind::Local, "")
    }

    pub fn midi() -> Self {
        Self::new(SourceKind::Midi, "")
    }

    pub fn preset() -> Self {
        Self::new(SourceKind::Preset, "")
    }

    pub fn osc(id: impl Into<String>) -> Self {
        Self::new(SourceKind::Osc, id)
    }

    /// Source for changes received from the OSC peer at `host:port`
    pub fn peer(host: &str, port: u16) -> Self {
        Self::osc(format!("{}:{}", host, port))
    }
}

impl fmt::Display for ChangeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.id.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}({})", self.kind, self.id)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peer_identity() {
        assert_eq!(ChangeSource::peer("10.0.0.2", 9000), ChangeSource::osc("10.0.0.2:9000"));
        assert_ne!(ChangeSource::peer("10.0.0.2", 9000), ChangeSource::peer("10.0.0.2", 9001));
        assert_ne!(ChangeSource::osc(""), ChangeSource::local());
    }

    #[test]
    fn test_display() {
        assert_eq!(ChangeSource::local().to_string(), "local");
        assert_eq!(ChangeSource::peer("host", 1).to_string(), "osc(host:1)");
    }
}
