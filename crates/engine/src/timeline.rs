use serde::{Deserialize, Serialize};

use crate::time::TimeCode;

/// A labeled point within a media asset's timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    pub timestamp: TimeCode,
    pub label: String,
}

impl Chapter {
    pub fn new(timestamp: TimeCode, label: impl Into<String>) -> Self {
        Self {
            timestamp,
            label: label.into(),
        }
    }
}

/// Chapters of one asset, ordered by non-decreasing timestamp.
///
/// The list is immutable once built; construction stable-sorts its input so
/// chapters sharing a timestamp keep their original order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Chapter>", into = "Vec<Chapter>")]
pub struct ChapterList {
    chapters: Vec<Chapter>,
}

impl ChapterList {
    /// Builds a chapter list, sorting by timestamp when needed.
    ///
    /// # Example
    /// ```
    /// use codex_engine::{Chapter, ChapterList, TimeCode};
    ///
    /// let chapters = ChapterList::from_unsorted(vec![
    ///     Chapter::new(TimeCode::parse("02:00"), "Outro"),
    ///     Chapter::new(TimeCode::parse("00:10"), "Intro"),
    /// ]);
    /// assert_eq!(chapters.as_slice()[0].label, "Intro");
    /// ```
    pub fn from_unsorted(mut chapters: Vec<Chapter>) -> Self {
        chapters.sort_by_key(|chapter| chapter.timestamp);
        Self { chapters }
    }

    pub fn as_slice(&self) -> &[Chapter] {
        &self.chapters
    }

    pub fn len(&self) -> usize {
        self.chapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chapters.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Chapter> {
        self.chapters.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Chapter> {
        self.chapters.iter()
    }

    /// Returns the greatest index whose timestamp is at or before `position`.
    ///
    /// `None` when the list is empty or playback has not reached the first
    /// chapter yet.
    pub fn active_index(&self, position: f64) -> Option<usize> {
        if position.is_nan() {
            return None;
        }
        self.chapters
            .partition_point(|chapter| chapter.timestamp.as_secs_f64() <= position)
            .checked_sub(1)
    }

    /// Width of chapter `index` as a percentage of `duration` seconds.
    ///
    /// A chapter spans from its own timestamp to the next chapter's, the last
    /// one to the end of the media. Boundaries past `duration` are clamped to
    /// it. Returns `None` for an unknown index and `Some(0.0)` when the
    /// duration is not a positive finite number.
    pub fn segment_width(&self, index: usize, duration: f64) -> Option<f64> {
        let start = self.chapters.get(index)?.timestamp;
        if !(duration.is_finite() && duration > 0.0) {
            return Some(0.0);
        }

        let end = self
            .chapters
            .get(index + 1)
            .map_or(duration, |next| next.timestamp.as_secs_f64());
        let start = start.as_secs_f64().min(duration);
        let end = end.min(duration);
        Some((end - start) / duration * 100.0)
    }

    /// Widths of every chapter, in list order.
    pub fn segment_widths(&self, duration: f64) -> Vec<f64> {
        (0..self.chapters.len())
            .filter_map(|index| self.segment_width(index, duration))
            .collect()
    }

    /// Share of the timeline before the first chapter starts.
    ///
    /// Together with [`ChapterList::segment_widths`] it always sums to 100 for
    /// a positive duration and a non-empty list.
    pub fn lead_in_width(&self, duration: f64) -> f64 {
        if !(duration.is_finite() && duration > 0.0) {
            return 0.0;
        }
        let first = self
            .chapters
            .first()
            .map_or(duration, |chapter| chapter.timestamp.as_secs_f64());
        first.min(duration) / duration * 100.0
    }
}

impl From<Vec<Chapter>> for ChapterList {
    fn from(chapters: Vec<Chapter>) -> Self {
        Self::from_unsorted(chapters)
    }
}

impl From<ChapterList> for Vec<Chapter> {
    fn from(list: ChapterList) -> Self {
        list.chapters
    }
}

impl<'a> IntoIterator for &'a ChapterList {
    type Item = &'a Chapter;
    type IntoIter = std::slice::Iter<'a, Chapter>;

    fn into_iter(self) -> Self::IntoIter {
        self.chapters.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::{Chapter, ChapterList};
    use crate::time::TimeCode;

    fn lecture() -> ChapterList {
        ChapterList::from_unsorted(vec![
            Chapter::new(TimeCode::parse("00:10"), "Intro"),
            Chapter::new(TimeCode::parse("01:05"), "Body"),
            Chapter::new(TimeCode::parse("02:00"), "Outro"),
        ])
    }

    fn linear_scan(chapters: &ChapterList, position: f64) -> Option<usize> {
        let mut active = None;
        for (index, chapter) in chapters.iter().enumerate() {
            if chapter.timestamp.as_secs_f64() <= position {
                active = Some(index);
            }
        }
        active
    }

    #[test]
    fn active_index_picks_body_at_seventy_seconds() {
        let chapters = lecture();
        let index = chapters.active_index(70.0).expect("active chapter");
        assert_eq!(index, 1);
        assert_eq!(chapters.as_slice()[index].label, "Body");
    }

    #[test]
    fn active_index_is_none_before_first_chapter_and_for_empty_lists() {
        assert_eq!(lecture().active_index(9.99), None);
        assert_eq!(ChapterList::default().active_index(100.0), None);
    }

    #[test]
    fn active_index_matches_linear_scan() {
        let lists = [
            lecture(),
            ChapterList::from_unsorted(vec![
                Chapter::new(TimeCode::ZERO, "Start"),
                Chapter::new(TimeCode::from_secs(30), "A"),
                Chapter::new(TimeCode::from_secs(30), "B"),
                Chapter::new(TimeCode::from_secs(31), "C"),
            ]),
            ChapterList::from_unsorted(vec![Chapter::new(TimeCode::from_secs(5), "Only")]),
        ];

        for chapters in &lists {
            for tenth in 0..1_500 {
                let position = f64::from(tenth) / 10.0;
                assert_eq!(
                    chapters.active_index(position),
                    linear_scan(chapters, position),
                    "position {position}"
                );
            }
        }
    }

    #[test]
    fn from_unsorted_keeps_order_of_equal_timestamps() {
        let chapters = ChapterList::from_unsorted(vec![
            Chapter::new(TimeCode::from_secs(60), "Late"),
            Chapter::new(TimeCode::from_secs(30), "First at 30"),
            Chapter::new(TimeCode::from_secs(30), "Second at 30"),
        ]);
        let labels: Vec<_> = chapters.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, ["First at 30", "Second at 30", "Late"]);
    }

    #[test]
    fn segment_widths_sum_to_one_hundred_when_first_chapter_starts_at_zero() {
        let chapters = ChapterList::from_unsorted(vec![
            Chapter::new(TimeCode::ZERO, "Intro"),
            Chapter::new(TimeCode::from_secs(65), "Body"),
            Chapter::new(TimeCode::from_secs(120), "Outro"),
        ]);

        let total: f64 = chapters.segment_widths(180.0).iter().sum();
        assert!((total - 100.0).abs() < 1e-9, "total {total}");
    }

    #[test]
    fn lead_in_covers_the_gap_before_the_first_chapter() {
        let chapters = lecture();
        let widths = chapters.segment_widths(180.0);

        assert!((widths[0] - 55.0 / 180.0 * 100.0).abs() < 1e-9);
        let total = chapters.lead_in_width(180.0) + widths.iter().sum::<f64>();
        assert!((total - 100.0).abs() < 1e-9, "total {total}");
    }

    #[test]
    fn segment_width_handles_unknown_duration_and_overshoot() {
        let chapters = lecture();
        assert_eq!(chapters.segment_width(0, 0.0), Some(0.0));
        assert_eq!(chapters.segment_width(0, f64::NAN), Some(0.0));
        assert_eq!(chapters.segment_width(3, 180.0), None);

        // The media turned out shorter than the last chapter.
        assert_eq!(chapters.segment_width(2, 100.0), Some(0.0));
        assert!(chapters.segment_widths(100.0).iter().all(|width| *width >= 0.0));
    }
}
