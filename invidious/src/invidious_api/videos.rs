//! Invidious video views.

use crate::error::Error;
use crate::invidious_api::types::{Fields, View};
use jiff::Timestamp;
use serde_json::Value;

/// Prefix of the canonical YouTube watch URL.
pub const YOUTUBE_WATCH_URL: &str = "https://youtube.com/watch?v=";

/// A video as returned by `GET /api/v1/videos/{id}`.
///
/// See: <https://docs.invidious.io/api/#get-apiv1videosid>
#[derive(Debug, Clone, PartialEq)]
pub struct Video {
    data: Value,
}

impl From<Value> for Video {
    fn from(data: Value) -> Self {
        Self { data }
    }
}

impl View for Video {
    fn raw(&self) -> &Value {
        &self.data
    }

    fn into_raw(self) -> Value {
        self.data
    }
}

impl Video {
    /// The record type. This should always be `"video"`.
    pub fn kind(&self) -> Option<&str> {
        self.data.str_field("type")
    }

    pub fn title(&self) -> Option<&str> {
        self.data.str_field("title")
    }

    /// The ID YouTube uses to identify the video.
    pub fn video_id(&self) -> Option<&str> {
        self.data.str_field("videoId")
    }

    /// The video's page on YouTube itself, derived from [`Self::video_id`].
    pub fn youtube_url(&self) -> Option<String> {
        self.video_id()
            .map(|id| format!("{YOUTUBE_WATCH_URL}{id}"))
    }

    /// Plaintext description.
    pub fn description(&self) -> Option<&str> {
        self.data.str_field("description")
    }

    pub fn description_html(&self) -> Option<&str> {
        self.data.str_field("descriptionHtml")
    }

    /// When the video was published (stored upstream as POSIX seconds).
    pub fn published(&self) -> Option<Timestamp> {
        self.data.epoch_field("published")
    }

    /// Human-readable publication time, e.g. `2 weeks ago`.
    ///
    /// Localized when the client sends an `hl` parameter.
    pub fn published_text(&self) -> Option<&str> {
        self.data.str_field("publishedText")
    }

    pub fn author(&self) -> Option<&str> {
        self.data.str_field("author")
    }

    pub fn author_id(&self) -> Option<&str> {
        self.data.str_field("authorId")
    }

    pub fn length_seconds(&self) -> Option<u64> {
        self.data.u64_field("lengthSeconds")
    }

    pub fn view_count(&self) -> Option<u64> {
        self.data.u64_field("viewCount")
    }

    /// All thumbnails of the video.
    ///
    /// Fails with [`Error::MissingField`] if the record carries no `videoThumbnails`.
    pub fn video_thumbnails(&self) -> Result<Vec<Thumbnail<'_>>, Error> {
        Ok(self
            .data
            .required_array("videoThumbnails")?
            .iter()
            .map(Thumbnail::new)
            .collect())
    }

    /// Storyboards rendered on the seek bar when hovering over the timeline.
    ///
    /// Fails with [`Error::MissingField`] if the record carries no `storyboards`.
    pub fn storyboards(&self) -> Result<Vec<Storyboard<'_>>, Error> {
        Ok(self
            .data
            .required_array("storyboards")?
            .iter()
            .map(Storyboard::new)
            .collect())
    }
}

/// One entry of [`Video::video_thumbnails`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thumbnail<'a> {
    data: &'a Value,
}

impl<'a> Thumbnail<'a> {
    fn new(data: &'a Value) -> Self {
        Self { data }
    }

    /// Quality tag such as `maxres`, `high`, `medium`, `default`, `start`, `middle` or `end`.
    pub fn quality(&self) -> Option<&'a str> {
        self.data.str_field("quality")
    }

    pub fn url(&self) -> Option<&'a str> {
        self.data.str_field("url")
    }

    pub fn width(&self) -> Option<u32> {
        self.data.u32_field("width")
    }

    pub fn height(&self) -> Option<u32> {
        self.data.u32_field("height")
    }
}

/// One entry of [`Video::storyboards`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Storyboard<'a> {
    data: &'a Value,
}

impl<'a> Storyboard<'a> {
    fn new(data: &'a Value) -> Self {
        Self { data }
    }

    /// URL of the WebVTT file mapping time ranges to storyboard images.
    pub fn url(&self) -> Option<&'a str> {
        self.data.str_field("url")
    }

    pub fn template_url(&self) -> Option<&'a str> {
        self.data.str_field("templateUrl")
    }

    pub fn width(&self) -> Option<u32> {
        self.data.u32_field("width")
    }

    pub fn height(&self) -> Option<u32> {
        self.data.u32_field("height")
    }
}
