//! Invidious API client library.
//!
//! [Invidious](https://invidious.io) is a federated YouTube frontend. Many independent
//! instances expose the same JSON API under `/api/v1/`, and a public directory lists them.
//!
//! # Views over raw JSON
//!
//! Responses are not deserialized into fixed structs. Each record is wrapped in a view
//! ([`Video`], [`Comments`], [`Instance`], ...) that keeps the raw [`serde_json::Value`] and
//! reads fields on access:
//! - a missing or `null` field reads as `None`;
//! - epoch-second fields become [`jiff::Timestamp`]s, ISO-8601 fields are parsed too;
//! - nested records are returned as borrowed child views, so nothing is cloned;
//! - [`View::raw`] always gives back the unmodified response.
//!
//! Instances move and change their API over time, so the views tolerate fields appearing
//! and disappearing.
//!
//! # Picking an instance
//!
//! [`InstanceSelector::choose_instance`] fetches the directory in health order, optionally
//! probes each candidate, and memoizes the outcome per [`SelectionCriteria`].
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use invidious_api_client::invidious_api::{
//!     InstanceSelector, InvidiousClient, ReqwestTransport, SelectionCriteria,
//! };
//!
//! # async fn example() -> eyre::Result<()> {
//! let transport = ReqwestTransport::new(reqwest::Client::new());
//! let selector = InstanceSelector::new(transport.clone());
//! let instance = selector
//!     .choose_instance(&SelectionCriteria::default())
//!     .await?
//!     .ok_or_else(|| eyre::eyre!("no instance available"))?;
//!
//! let client = InvidiousClient::for_instance(transport, &instance)?;
//! let video = client.get_video("9bZkp7q19f0").await?;
//! println!("{:?} by {:?}", video.title(), video.author());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod comments;
pub mod dislikes;
pub mod instances;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod selector;
pub mod transport;
pub mod types;
pub mod videos;

pub use client::{CommentPages, InvidiousClient, VideoRef};
pub use types::{Continued, CursorStream, View};

pub use comments::{AuthorThumbnail, Comment, Comments, CreatorHeart};

pub use dislikes::Votes;

pub use instances::{Instance, InstanceStats, InstanceType, InstancesList, Monitor, Ratio};

pub use selector::{InstanceSelector, SelectionCache, SelectionCriteria};

pub use transport::{RawResponse, ReqwestTransport, Transport};

pub use videos::{Storyboard, Thumbnail, Video};
