use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{PlayerError, Result};
use crate::time::finite_or;

/// Smallest duration used for progress math, in seconds.
pub const MIN_CLIP_DURATION_SEC: f64 = 0.1;

/// Half-open `[start_sec, end_sec)` window over one media source.
///
/// A window is immutable; loading another clip means building a new value.
/// Degenerate windows (`end_sec <= start_sec`) are accepted because the range
/// comes from upstream search hits; progress math floors their duration.
///
/// # Example
/// ```
/// use player::ClipWindow;
///
/// let clip = ClipWindow::new(10.0, 15.0, "https://cdn.example/clip.mp4");
/// assert!(clip.contains(12.5));
/// assert!(!clip.contains(15.0));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "RawClipWindow")]
pub struct ClipWindow {
    start_sec: f64,
    end_sec: f64,
    source: String,
    poster: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawClipWindow {
    start_sec: f64,
    end_sec: f64,
    #[serde(alias = "previewUrl", alias = "src")]
    source: String,
    #[serde(default, alias = "thumbnailUrl")]
    poster: Option<String>,
}

impl From<RawClipWindow> for ClipWindow {
    fn from(raw: RawClipWindow) -> Self {
        let clip = Self::new(raw.start_sec, raw.end_sec, raw.source);
        match raw.poster {
            Some(poster) => clip.with_poster(poster),
            None => clip,
        }
    }
}

impl ClipWindow {
    /// Builds a window, sanitising non-finite or negative bounds.
    ///
    /// A bad `start_sec` becomes `0.0`; a non-finite `end_sec` collapses the
    /// window onto its start.
    pub fn new(start_sec: f64, end_sec: f64, source: impl Into<String>) -> Self {
        let start_sec = finite_or(start_sec, 0.0).max(0.0);
        let end_sec = finite_or(end_sec, start_sec);
        Self {
            start_sec,
            end_sec,
            source: source.into(),
            poster: None,
        }
    }

    /// Returns the same window with a poster image attached.
    pub fn with_poster(mut self, poster: impl Into<String>) -> Self {
        self.poster = Some(poster.into());
        self
    }

    pub fn start_sec(&self) -> f64 {
        self.start_sec
    }

    pub fn end_sec(&self) -> f64 {
        self.end_sec
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn poster(&self) -> Option<&str> {
        self.poster.as_deref()
    }

    /// Returns true when `t` falls inside `[start_sec, end_sec)`.
    pub fn contains(&self, t: f64) -> bool {
        self.start_sec <= t && t < self.end_sec
    }

    /// Returns true when `end_sec <= start_sec`.
    pub fn is_degenerate(&self) -> bool {
        self.end_sec <= self.start_sec
    }

    /// Reports a degenerate window as an error for callers that want to log it.
    pub fn check(&self) -> Result<()> {
        if self.is_degenerate() {
            return Err(PlayerError::DegenerateWindow {
                start_sec: self.start_sec,
                end_sec: self.end_sec,
            });
        }
        Ok(())
    }

    /// Duration used as the progress denominator, never below `min_duration_sec`.
    pub fn progress_duration(&self, min_duration_sec: f64) -> f64 {
        (self.end_sec - self.start_sec).max(min_duration_sec)
    }

    /// Percentage of the window covered at surface time `t`, within `[0, 100]`.
    pub fn progress_percent(&self, t: f64, min_duration_sec: f64) -> f64 {
        let elapsed = (t - self.start_sec).max(0.0);
        let duration = self.progress_duration(min_duration_sec.max(f64::EPSILON));
        (100.0 * elapsed / duration).clamp(0.0, 100.0)
    }
}

/// How a search hit matched the query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    Visual,
    Audio,
    TagBoost,
    Combined,
}

/// One clip returned by the search service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResultClip {
    pub id: String,
    pub video_id: String,
    pub video_filename: String,
    pub start_sec: f64,
    pub end_sec: f64,
    pub thumbnail_url: String,
    pub preview_url: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub score: f64,
    pub confidence: f64,
    pub match_type: MatchType,
    #[serde(default)]
    pub description: String,
}

impl SearchResultClip {
    /// Builds the preview window for this hit.
    pub fn clip_window(&self) -> ClipWindow {
        let clip = ClipWindow::new(self.start_sec, self.end_sec, self.preview_url.clone());
        if clip.is_degenerate() {
            warn!(
                id = %self.id,
                start_sec = self.start_sec,
                end_sec = self.end_sec,
                "search hit has a degenerate window"
            );
        }
        clip.with_poster(self.thumbnail_url.clone())
    }
}

/// Response body of a semantic search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub results: Vec<SearchResultClip>,
    pub total_results: usize,
    pub execution_time_ms: f64,
}

impl SearchResponse {
    /// Returns the preview window of the `index`-th hit.
    pub fn clip_window(&self, index: usize) -> Result<ClipWindow> {
        self.results
            .get(index)
            .map(SearchResultClip::clip_window)
            .ok_or(PlayerError::ResultIndexOutOfRange {
                index,
                len: self.results.len(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::{ClipWindow, MIN_CLIP_DURATION_SEC, SearchResponse};
    use crate::error::PlayerError;

    #[test]
    fn new_sanitises_negative_start_and_non_finite_end() {
        let clip = ClipWindow::new(-3.0, f64::NAN, "a.mp4");
        assert_eq!(clip.start_sec(), 0.0);
        assert_eq!(clip.end_sec(), 0.0);
        assert!(clip.is_degenerate());
    }

    #[test]
    fn degenerate_window_floors_progress_duration() {
        let clip = ClipWindow::new(5.0, 5.0, "a.mp4");
        assert_eq!(clip.progress_duration(MIN_CLIP_DURATION_SEC), MIN_CLIP_DURATION_SEC);
        assert!(matches!(
            clip.check(),
            Err(PlayerError::DegenerateWindow { .. })
        ));

        for t in [0.0, 4.99, 5.0, 5.05, 5.1, 1_000.0] {
            let percent = clip.progress_percent(t, MIN_CLIP_DURATION_SEC);
            assert!((0.0..=100.0).contains(&percent), "{t} -> {percent}");
        }
    }

    #[test]
    fn progress_percent_even_with_zero_floor_stays_finite() {
        let clip = ClipWindow::new(5.0, 5.0, "a.mp4");
        let percent = clip.progress_percent(5.0, 0.0);
        assert!(percent.is_finite());
    }

    #[test]
    fn deserialises_window_from_camel_case_clip_record() {
        let clip: ClipWindow = serde_json::from_str(
            r#"{"startSec": 2.5, "endSec": 7.0, "previewUrl": "v.mp4", "thumbnailUrl": "p.jpg"}"#,
        )
        .expect("clip record should parse");

        assert_eq!(clip.start_sec(), 2.5);
        assert_eq!(clip.end_sec(), 7.0);
        assert_eq!(clip.source(), "v.mp4");
        assert_eq!(clip.poster(), Some("p.jpg"));
    }

    #[test]
    fn search_response_maps_hit_to_window() {
        let response: SearchResponse = serde_json::from_str(
            r#"{
                "results": [{
                    "id": "c1",
                    "videoId": "v1",
                    "videoFilename": "beach.mp4",
                    "startSec": 12.0,
                    "endSec": 18.0,
                    "thumbnailUrl": "t.jpg",
                    "previewUrl": "beach.mp4",
                    "tags": ["outdoor"],
                    "score": 0.82,
                    "confidence": 82,
                    "matchType": "visual",
                    "description": "waves"
                }],
                "totalResults": 1,
                "executionTimeMs": 41.5
            }"#,
        )
        .expect("search response should parse");

        let clip = response.clip_window(0).expect("first hit exists");
        assert_eq!(clip.start_sec(), 12.0);
        assert_eq!(clip.source(), "beach.mp4");
        assert_eq!(clip.poster(), Some("t.jpg"));

        assert!(matches!(
            response.clip_window(3),
            Err(PlayerError::ResultIndexOutOfRange { index: 3, len: 1 })
        ));
    }
}
