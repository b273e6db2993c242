use tracing::debug;

use crate::error::{EngineError, Result};
use crate::time::TimeCode;
use crate::timeline::{Chapter, ChapterList};

/// Duration assumed before the media element reports one.
const UNKNOWN_DURATION_SECS: f64 = 1.0;

/// Media element seam. The element owns the playback position; the engine only
/// reads it and writes it through explicit seeks.
pub trait Player {
    /// Current position in seconds.
    fn position(&self) -> f64;

    /// Total duration in seconds, once metadata is available.
    fn duration(&self) -> Option<f64>;

    fn seek(&mut self, seconds: f64);

    fn play(&mut self);
}

/// Maps a wire deep-link string to a start offset.
///
/// Any value that parses to zero seconds, including the `"00:00"` sentinel and
/// malformed text, means "no deep link".
///
/// # Example
/// ```
/// use codex_engine::{TimeCode, parse_deep_link};
///
/// assert_eq!(parse_deep_link("01:30"), Some(TimeCode::from_secs(90)));
/// assert_eq!(parse_deep_link("00:00"), None);
/// ```
pub fn parse_deep_link(text: &str) -> Option<TimeCode> {
    let start = TimeCode::parse(text);
    (!start.is_zero()).then_some(start)
}

/// Keeps a chapter list in step with a live media element.
#[derive(Debug)]
pub struct PlaybackSync<P> {
    chapters: ChapterList,
    player: P,
    deep_link: Option<TimeCode>,
    deep_link_consumed: bool,
}

impl<P> PlaybackSync<P>
where
    P: Player,
{
    pub fn new(chapters: ChapterList, player: P) -> Self {
        Self {
            chapters,
            player,
            deep_link: None,
            deep_link_consumed: false,
        }
    }

    /// Attaches the start offset to apply once metadata is loaded.
    pub fn with_deep_link(mut self, start: Option<TimeCode>) -> Self {
        self.deep_link = start;
        self
    }

    pub fn chapters(&self) -> &ChapterList {
        &self.chapters
    }

    pub fn player(&self) -> &P {
        &self.player
    }

    pub fn player_mut(&mut self) -> &mut P {
        &mut self.player
    }

    pub fn into_player(self) -> P {
        self.player
    }

    /// Duration used for timeline math; falls back to one second while the
    /// element has not reported one.
    pub fn effective_duration(&self) -> f64 {
        self.player
            .duration()
            .filter(|duration| duration.is_finite() && *duration > 0.0)
            .unwrap_or(UNKNOWN_DURATION_SECS)
    }

    /// Index of the chapter containing the current playback position.
    pub fn active_chapter(&self) -> Option<usize> {
        self.chapters.active_index(self.player.position())
    }

    pub fn active_chapter_entry(&self) -> Option<&Chapter> {
        self.active_chapter()
            .and_then(|index| self.chapters.get(index))
    }

    /// Proportional segment widths for the current duration.
    pub fn segment_widths(&self) -> Vec<f64> {
        self.chapters.segment_widths(self.effective_duration())
    }

    /// Seeks to the start of chapter `index` and resumes playback.
    ///
    /// A chapter starting at `00:00` is a regular target.
    pub fn seek_to_chapter(&mut self, index: usize) -> Result<TimeCode> {
        let chapter = self
            .chapters
            .get(index)
            .ok_or(EngineError::ChapterNotFound {
                index,
                len: self.chapters.len(),
            })?;
        let start = chapter.timestamp;

        debug!(index, start = %start, label = %chapter.label, "seek to chapter");
        self.player.seek(start.as_secs_f64());
        self.player.play();
        Ok(start)
    }

    /// Applies `start` to the element: seek and play when it is a non-zero
    /// offset, otherwise leave playback at its natural start.
    pub fn apply_deep_link(&mut self, start: Option<TimeCode>) -> Option<TimeCode> {
        let start = start.filter(|start| !start.is_zero())?;
        debug!(start = %start, "apply deep link");
        self.player.seek(start.as_secs_f64());
        self.player.play();
        Some(start)
    }

    /// Handles the element's loaded-metadata signal.
    ///
    /// The attached deep link is applied on the first call only, so a reload
    /// of the same source does not jump again.
    pub fn on_loaded_metadata(&mut self) -> Option<TimeCode> {
        if self.deep_link_consumed {
            return None;
        }
        self.deep_link_consumed = true;
        self.apply_deep_link(self.deep_link)
    }
}
