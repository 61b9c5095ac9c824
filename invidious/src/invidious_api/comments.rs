//! Invidious comment views.

use crate::error::Error;
use crate::invidious_api::types::{Continued, Fields, View};
use jiff::Timestamp;
use serde_json::Value;

/// One page of comments as returned by `GET /api/v1/comments/{id}`.
///
/// A page whose [`continuation`](Self::continuation) is absent is the last one. The last
/// page may still hold comments, and a page with a cursor may be followed by an empty one.
///
/// See: <https://docs.invidious.io/api/#get-apiv1commentsid>
#[derive(Debug, Clone, PartialEq)]
pub struct Comments {
    data: Value,
}

impl From<Value> for Comments {
    fn from(data: Value) -> Self {
        Self { data }
    }
}

impl View for Comments {
    fn raw(&self) -> &Value {
        &self.data
    }

    fn into_raw(self) -> Value {
        self.data
    }
}

impl Continued for Comments {
    fn continuation(&self) -> Option<&str> {
        Comments::continuation(self)
    }
}

impl Comments {
    /// Cursor for the next page; `None` on the last page.
    pub fn continuation(&self) -> Option<&str> {
        self.data.str_field("continuation")
    }

    pub fn comment_count(&self) -> Option<u64> {
        self.data.u64_field("commentCount")
    }

    /// The video these comments belong to.
    pub fn video_id(&self) -> Option<&str> {
        self.data.str_field("videoId")
    }

    /// The comments on this page, in server order.
    ///
    /// Fails with [`Error::MissingField`] if the record carries no `comments`.
    pub fn comments(&self) -> Result<Vec<Comment<'_>>, Error> {
        Ok(self.iter()?.collect())
    }

    /// Iterates the comments on this page, in server order.
    pub fn iter(&self) -> Result<impl Iterator<Item = Comment<'_>>, Error> {
        Ok(self
            .data
            .required_array("comments")?
            .iter()
            .map(Comment::new))
    }
}

/// A single comment inside a [`Comments`] page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Comment<'a> {
    data: &'a Value,
}

impl<'a> Comment<'a> {
    fn new(data: &'a Value) -> Self {
        Self { data }
    }

    pub fn raw(&self) -> &'a Value {
        self.data
    }

    /// Display name of the author's channel.
    pub fn author(&self) -> Option<&'a str> {
        self.data.str_field("author")
    }

    pub fn author_id(&self) -> Option<&'a str> {
        self.data.str_field("authorId")
    }

    pub fn author_url(&self) -> Option<&'a str> {
        self.data.str_field("authorUrl")
    }

    /// Fails with [`Error::MissingField`] if the record carries no `authorThumbnails`.
    pub fn author_thumbnails(&self) -> Result<Vec<AuthorThumbnail<'a>>, Error> {
        Ok(self
            .data
            .required_array("authorThumbnails")?
            .iter()
            .map(|data| AuthorThumbnail { data })
            .collect())
    }

    pub fn is_edited(&self) -> Option<bool> {
        self.data.bool_field("isEdited")
    }

    /// Plaintext content.
    pub fn content(&self) -> Option<&'a str> {
        self.data.str_field("content")
    }

    pub fn content_html(&self) -> Option<&'a str> {
        self.data.str_field("contentHtml")
    }

    /// When the comment was posted (stored upstream as POSIX seconds).
    pub fn published(&self) -> Option<Timestamp> {
        self.data.epoch_field("published")
    }

    pub fn published_text(&self) -> Option<&'a str> {
        self.data.str_field("publishedText")
    }

    pub fn like_count(&self) -> Option<u64> {
        self.data.u64_field("likeCount")
    }

    pub fn comment_id(&self) -> Option<&'a str> {
        self.data.str_field("commentId")
    }

    /// Whether the author also owns the channel the video was posted on.
    pub fn author_is_channel_owner(&self) -> Option<bool> {
        self.data.bool_field("authorIsChannelOwner")
    }

    /// The heart the uploader left on this comment, if any.
    pub fn creator_heart(&self) -> Option<CreatorHeart<'a>> {
        self.data
            .field("creatorHeart")
            .map(|data| CreatorHeart { data })
    }

    /// Number of replies; `0` when the comment has no reply thread.
    pub fn reply_count(&self) -> u64 {
        self.data
            .field("replies")
            .and_then(|replies| replies.u64_field("replyCount"))
            .unwrap_or(0)
    }

    /// Cursor for the first page of replies.
    pub fn reply_continuation(&self) -> Option<&'a str> {
        self.data
            .field("replies")
            .and_then(|replies| replies.str_field("replyContinuation"))
    }
}

/// Profile picture of a comment author.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AuthorThumbnail<'a> {
    data: &'a Value,
}

impl<'a> AuthorThumbnail<'a> {
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

/// The uploader's heart on a comment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CreatorHeart<'a> {
    data: &'a Value,
}

impl<'a> CreatorHeart<'a> {
    /// Profile picture of the channel that hearted the comment.
    pub fn creator_thumbnail(&self) -> Option<&'a str> {
        self.data.str_field("creatorThumbnail")
    }

    pub fn creator_name(&self) -> Option<&'a str> {
        self.data.str_field("creatorName")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn page() -> Comments {
        Comments::from(json!({
            "commentCount": 3,
            "videoId": "9bZkp7q19f0",
            "continuation": "XYZ",
            "comments": [
                {
                    "author": "Alice",
                    "authorId": "UCalice",
                    "authorUrl": "/channel/UCalice",
                    "authorThumbnails": [{ "url": "https://yt3.example/a.jpg", "width": 48, "height": 48 }],
                    "isEdited": false,
                    "content": "first",
                    "contentHtml": "<b>first</b>",
                    "published": 1_700_000_000,
                    "publishedText": "1 year ago",
                    "likeCount": 12,
                    "commentId": "c1",
                    "authorIsChannelOwner": true,
                    "creatorHeart": { "creatorThumbnail": "https://yt3.example/o.jpg", "creatorName": "officialpsy" },
                    "replies": { "replyCount": 4, "replyContinuation": "R1" }
                },
                {
                    "author": "Bob",
                    "authorThumbnails": [],
                    "content": "second",
                    "commentId": "c2"
                }
            ]
        }))
    }

    #[test]
    fn page_fields() {
        let page = page();
        assert_eq!(page.continuation(), Some("XYZ"));
        assert_eq!(page.comment_count(), Some(3));
        assert_eq!(page.video_id(), Some("9bZkp7q19f0"));
    }

    #[test]
    fn iterates_in_array_order() {
        let page = page();
        let ids: Vec<_> = page.iter().unwrap().map(|c| c.comment_id()).collect();
        assert_eq!(ids, vec![Some("c1"), Some("c2")]);
    }

    #[test]
    fn full_comment() {
        let page = page();
        let comment = page.comments().unwrap()[0];
        assert_eq!(comment.author(), Some("Alice"));
        assert_eq!(comment.author_is_channel_owner(), Some(true));
        assert_eq!(comment.is_edited(), Some(false));
        assert_eq!(comment.like_count(), Some(12));
        assert_eq!(comment.published().unwrap().as_second(), 1_700_000_000);
        assert_eq!(comment.author_thumbnails().unwrap()[0].width(), Some(48));

        let heart = comment.creator_heart().unwrap();
        assert_eq!(heart.creator_name(), Some("officialpsy"));
        assert_eq!(heart.creator_thumbnail(), Some("https://yt3.example/o.jpg"));

        assert_eq!(comment.reply_count(), 4);
        assert_eq!(comment.reply_continuation(), Some("R1"));
    }

    #[test]
    fn comment_without_replies() {
        let page = page();
        let comment = page.comments().unwrap()[1];
        assert_eq!(comment.reply_count(), 0);
        assert_eq!(comment.reply_continuation(), None);
        assert_eq!(comment.creator_heart(), None);
        assert_eq!(comment.like_count(), None);
    }

    #[test]
    fn terminal_page_has_no_cursor() {
        let page = Comments::from(json!({ "comments": [] }));
        assert_eq!(Continued::continuation(&page), None);
        assert!(page.comments().unwrap().is_empty());
    }

    #[test]
    fn missing_comments_and_thumbnails_are_errors() {
        let page = Comments::from(json!({ "videoId": "x" }));
        assert!(matches!(
            page.comments(),
            Err(Error::MissingField { field: "comments" })
        ));

        let page = Comments::from(json!({ "comments": [{ "author": "Carol" }] }));
        let comment = page.comments().unwrap()[0];
        assert!(matches!(
            comment.author_thumbnails(),
            Err(Error::MissingField { field: "authorThumbnails" })
        ));
    }
}
