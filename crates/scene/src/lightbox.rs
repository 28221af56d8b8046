use std::sync::Arc;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Direction {
    Previous,
    Next,
}

impl Direction {
    fn offset(self) -> i64 {
        match self {
            Direction::Previous => -1,
            Direction::Next => 1,
        }
    }
}

/// Keys the lightbox reacts to.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LightboxKey {
    Escape,
    ArrowLeft,
    ArrowRight,
}

impl LightboxKey {
    /// Maps a DOM `KeyboardEvent.key` value.
    pub fn from_dom_key(key: &str) -> Option<Self> {
        match key {
            "Escape" | "Esc" => Some(LightboxKey::Escape),
            "ArrowLeft" | "Left" => Some(LightboxKey::ArrowLeft),
            "ArrowRight" | "Right" => Some(LightboxKey::ArrowRight),
            _ => None,
        }
    }
}

/// What the overlay should show right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LightboxView<'a> {
    pub photo: &'a str,
    /// 0-based.
    pub index: usize,
    pub count: usize,
}

impl LightboxView<'_> {
    /// "index+1 / count", e.g. "3 / 3".
    pub fn indicator(&self) -> String {
        format!("{} / {}", self.index + 1, self.count)
    }
}

#[derive(Debug, Clone)]
struct LightboxState {
    photos: Arc<[String]>,
    index: usize,
}

/// Photo viewer state machine: closed, or open on one photo of a sequence.
#[derive(Debug, Clone, Default)]
pub struct Lightbox {
    state: Option<LightboxState>,
}

impl Lightbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.state.is_some()
    }

    pub fn index(&self) -> Option<usize> {
        self.state.as_ref().map(|s| s.index)
    }

    pub fn current(&self) -> Option<LightboxView<'_>> {
        self.state.as_ref().map(|s| LightboxView {
            photo: &s.photos[s.index],
            index: s.index,
            count: s.photos.len(),
        })
    }

    /// Opens on `photos[start]`.
    ///
    /// Empty sequences and out-of-range starts leave the state untouched and
    /// return `None`.
    pub fn open(&mut self, photos: Arc<[String]>, start: usize) -> Option<LightboxView<'_>> {
        if start >= photos.len() {
            tracing::debug!(start, count = photos.len(), "ignoring lightbox open");
            return None;
        }
        self.state = Some(LightboxState {
            photos,
            index: start,
        });
        self.current()
    }

    /// Steps one photo with wraparound. No-op while closed.
    pub fn advance(&mut self, direction: Direction) -> Option<LightboxView<'_>> {
        let state = self.state.as_mut()?;
        let count = state.photos.len() as i64;
        state.index = (state.index as i64 + direction.offset()).rem_euclid(count) as usize;
        self.current()
    }

    /// Closes the overlay. Returns whether it was open.
    pub fn close(&mut self) -> bool {
        self.state.take().is_some()
    }
}
