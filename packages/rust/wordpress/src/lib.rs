//! WordPress REST integration for pbnforge.
//!
//! - [`WpClient::publish`] creates a new post (the Publisher)
//! - [`WpClient::try_insert_internal_link`] rewrites a recent post to link
//!   to the target (the Internal-Link Updater)

pub mod client;
pub mod linker;

pub use client::{
    PublishError, PublishedPost, Rendered, WpClient, WpPost, post_endpoint, posts_endpoint,
    shortlink,
};
pub use linker::{LinkOutcome, count_links, insert_link, is_candidate};
