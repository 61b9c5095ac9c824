//! The request methods an application calls.

use crate::error::Error;
use crate::invidious_api::{
    comments::Comments,
    dislikes::{RYD_VOTES_URL, Votes},
    instances::Instance,
    transport::{ReqwestTransport, Transport, decode_json},
    types::{CursorStream, View},
    videos::Video,
};
use eyre::Context;
use serde_json::Value;
use tracing::instrument;

/// Parameters only the client itself may set. Caller-supplied values for them are dropped,
/// even on requests that don't use them (the first comment page has no `continuation`).
const STRUCTURAL_PARAMETERS: &[&str] = &["continuation", "videoId", "sort_by"];

/// Pages of comments for one video, fetched one request at a time.
pub type CommentPages<'a> = CursorStream<'a, Comments>;

/// A video given either by id or by an already fetched [`Video`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VideoRef<'a> {
    Id(&'a str),
    Video(&'a Video),
}

impl<'a> VideoRef<'a> {
    /// The canonical video id.
    pub fn video_id(&self) -> Result<&'a str, Error> {
        match *self {
            VideoRef::Id(id) => Ok(id),
            VideoRef::Video(video) => video.video_id().ok_or(Error::MissingVideoId),
        }
    }
}

impl<'a> From<&'a str> for VideoRef<'a> {
    fn from(id: &'a str) -> Self {
        VideoRef::Id(id)
    }
}

impl<'a> From<&'a String> for VideoRef<'a> {
    fn from(id: &'a String) -> Self {
        VideoRef::Id(id)
    }
}

impl<'a> From<&'a Video> for VideoRef<'a> {
    fn from(video: &'a Video) -> Self {
        VideoRef::Video(video)
    }
}

/// Client for one Invidious instance.
///
/// All API calls go to `{instance_url}/api/v1/...`. Extra parameters (for example
/// `("hl", "de")` to localize `publishedText`) are added to every request, but never
/// replace a parameter the request itself needs, such as `continuation` or `videoId`.
#[derive(Debug, Clone)]
pub struct InvidiousClient<T = ReqwestTransport> {
    transport: T,
    /// Base URL without a trailing slash
    instance_url: String,
    additional_parameters: Vec<(String, String)>,
}

impl<T: Transport> InvidiousClient<T> {
    /// Creates a client for the instance at `instance_url`.
    pub fn new(transport: T, instance_url: &str) -> Self {
        Self {
            transport,
            instance_url: instance_url.trim_end_matches('/').to_string(),
            additional_parameters: Vec::new(),
        }
    }

    /// Creates a client for a directory entry.
    ///
    /// Onion instances need a transport that routes through Tor, see
    /// [`ReqwestTransport::onion`].
    pub fn for_instance(transport: T, instance: &Instance) -> Result<Self, Error> {
        let uri = instance
            .uri()
            .ok_or(Error::MissingField { field: "uri" })?;
        Ok(Self::new(transport, uri))
    }

    /// Adds parameters sent with every request.
    pub fn with_additional_parameters<K, V>(
        mut self,
        parameters: impl IntoIterator<Item = (K, V)>,
    ) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.additional_parameters
            .extend(parameters.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn instance_url(&self) -> &str {
        &self.instance_url
    }

    /// `{instance_url}/api/v1/{resource}`.
    pub fn api_url(&self, resource: &str) -> String {
        format!("{}/api/v1/{}", self.instance_url, resource)
    }

    /// The request's own parameters first, then every additional parameter that is neither
    /// structural nor already used by the request.
    fn merged_query<'q>(&'q self, required: &[(&'q str, &'q str)]) -> Vec<(&'q str, &'q str)> {
        let mut query = required.to_vec();
        for (key, value) in &self.additional_parameters {
            if !STRUCTURAL_PARAMETERS.contains(&key.as_str())
                && !required.iter().any(|(k, _)| k == key)
            {
                query.push((key.as_str(), value.as_str()));
            }
        }
        query
    }

    /// Makes a GET request with common error handling.
    ///
    /// Non-2xx statuses become [`Error::Http`]; nothing is retried.
    #[instrument(skip(self), level = tracing::Level::TRACE)]
    async fn get_json(&self, url: &str, required: &[(&str, &str)]) -> eyre::Result<Value> {
        let query = self.merged_query(required);
        let response = self
            .transport
            .get(url, &query)
            .await
            .with_context(|| format!("send GET request to {url}"))?;
        let body = decode_json(url, response).with_context(|| format!("read response of {url}"))?;
        Ok(body)
    }

    /// Fetches a video by id.
    ///
    /// # API Reference
    ///
    /// <https://docs.invidious.io/api/#get-apiv1videosid>
    #[instrument(skip(self))]
    pub async fn get_video(&self, video_id: &str) -> eyre::Result<Video> {
        let url = self.api_url(&format!("videos/{video_id}"));
        let video = Video::from(self.get_json(&url, &[]).await?);

        tracing::debug!(video_id, title = ?video.title(), "fetched video");
        Ok(video)
    }

    /// Fetches one page of comments.
    ///
    /// Without a `continuation` this is the first page. Passing a page's
    /// [`continuation`](Comments::continuation) gives the next page; passing a comment's
    /// [`reply_continuation`](crate::invidious_api::Comment::reply_continuation) gives its
    /// replies. To walk every page, use [`Self::comment_pages`].
    ///
    /// # API Reference
    ///
    /// <https://docs.invidious.io/api/#get-apiv1commentsid>
    pub async fn get_comments<'v>(
        &self,
        video: impl Into<VideoRef<'v>>,
        continuation: Option<&str>,
    ) -> eyre::Result<Comments> {
        let video_id = video.into().video_id()?;
        self.fetch_comments_page(video_id, continuation).await
    }

    #[instrument(skip(self))]
    async fn fetch_comments_page(
        &self,
        video_id: &str,
        continuation: Option<&str>,
    ) -> eyre::Result<Comments> {
        let url = self.api_url(&format!("comments/{video_id}"));
        let mut required = Vec::new();
        if let Some(cursor) = continuation {
            required.push(("continuation", cursor));
        }

        let page = Comments::from(
            self.get_json(&url, &required)
                .await
                .context("fetch comments page")?,
        );

        let returned_items = page
            .raw()
            .get("comments")
            .and_then(Value::as_array)
            .map(Vec::len);
        tracing::debug!(
            video_id,
            returned_items,
            has_next = page.continuation().is_some(),
            "fetched comments page"
        );
        Ok(page)
    }

    /// Every page of comments for a video, starting from the first.
    ///
    /// Each page is fetched only when the stream is polled for it, using the cursor of the
    /// page before. The last page (the one without a cursor) is yielded too. A failed fetch
    /// is yielded as an error and ends the stream.
    ///
    /// ```rust,no_run
    /// # use invidious_api_client::InvidiousClient;
    /// # async fn example(client: InvidiousClient) -> eyre::Result<()> {
    /// let mut pages = client.comment_pages("9bZkp7q19f0")?;
    /// while let Some(page) = pages.advance().await {
    ///     for comment in page?.iter()? {
    ///         println!("{:?}: {:?}", comment.author(), comment.content());
    ///     }
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub fn comment_pages<'v>(
        &self,
        video: impl Into<VideoRef<'v>>,
    ) -> Result<CommentPages<'_>, Error> {
        let video_id = video.into().video_id()?.to_string();
        Ok(self.pages_from(video_id, None))
    }

    /// Every page of replies to a comment, starting from its
    /// [`reply_continuation`](crate::invidious_api::Comment::reply_continuation).
    pub fn reply_pages<'v>(
        &self,
        video: impl Into<VideoRef<'v>>,
        reply_continuation: &str,
    ) -> Result<CommentPages<'_>, Error> {
        let video_id = video.into().video_id()?.to_string();
        Ok(self.pages_from(video_id, Some(reply_continuation.to_string())))
    }

    fn pages_from(&self, video_id: String, cursor: Option<String>) -> CommentPages<'_> {
        CursorStream::starting_at(cursor, move |cursor: Option<String>| {
            let video_id = video_id.clone();
            async move {
                self.fetch_comments_page(&video_id, cursor.as_deref())
                    .await
            }
        })
    }

    /// Fetches like/dislike estimates from Return YouTube Dislike.
    ///
    /// This does not go through the instance.
    #[instrument(skip(self, video))]
    pub async fn get_dislike_count<'v>(&self, video: impl Into<VideoRef<'v>>) -> eyre::Result<Votes> {
        let video_id = video.into().video_id()?;
        let body = self
            .get_json(RYD_VOTES_URL, &[("videoId", video_id)])
            .await
            .context("fetch dislike count")?;
        let votes: Votes =
            serde_json::from_value(body).context("parse Return YouTube Dislike response")?;

        tracing::debug!(video_id, dislikes = ?votes.dislikes, "fetched dislike count");
        Ok(votes)
    }
}
