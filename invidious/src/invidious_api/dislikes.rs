//! Vote counts from the Return YouTube Dislike API.
//!
//! This is a separate third-party service, independent of the chosen instance. It is rate
//! limited (100 requests per minute, 10 000 per day per client) and answers `429` when the
//! limit is hit.
//!
//! See: <https://github.com/Anarios/return-youtube-dislike#api-documentation>

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// Endpoint queried with a `videoId` parameter.
pub const RYD_VOTES_URL: &str = "https://returnyoutubedislikeapi.com/Votes";

/// Response of `GET /Votes?videoId=...`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Votes {
    /// The video ID the votes belong to.
    pub id: String,
    /// When the service first saw the video (ISO-8601 upstream).
    pub date_created: Option<Timestamp>,
    pub likes: Option<u64>,
    /// Estimated number of dislikes.
    pub dislikes: Option<u64>,
    /// Average rating on a 1..=5 scale.
    pub rating: Option<f64>,
    pub view_count: Option<u64>,
    pub deleted: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn parse_votes() {
        let votes: Votes = serde_json::from_value(json!({
            "id": "9bZkp7q19f0",
            "dateCreated": "2021-11-10T19:14:23.507226Z",
            "likes": 27_000_000,
            "dislikes": 3_000_000,
            "rating": 4.6,
            "viewCount": 4_900_000_000u64,
            "deleted": false
        }))
        .unwrap();

        assert_eq!(votes.id, "9bZkp7q19f0");
        assert_eq!(votes.dislikes, Some(3_000_000));
        assert_eq!(votes.view_count, Some(4_900_000_000));
        assert_eq!(
            votes.date_created.unwrap().as_second(),
            "2021-11-10T19:14:23Z".parse::<Timestamp>().unwrap().as_second()
        );
    }

    #[test]
    fn missing_counts_are_none() {
        let votes: Votes = serde_json::from_value(json!({ "id": "x" })).unwrap();
        assert_eq!(votes.likes, None);
        assert_eq!(votes.date_created, None);
    }
}
