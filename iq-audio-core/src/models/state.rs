/// Session operating mode.
///
/// Modes are mutually exclusive:
/// ```text
/// Closed ──play()──→ LiveDuplex    (capture + render + queue)
///   │  └──play()──→ FilePlayback  (render + file source)
///   ↑                     │
///   └──────stop()─────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    Closed,
    LiveDuplex,
    FilePlayback,
}

impl SessionMode {
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }

    pub fn is_playing(&self) -> bool {
        !self.is_closed()
    }
}
