//! YouTube Data API v3 client.
//!
//! The only mutating surface this tool needs is `playlistItems.insert`
//! ([`playlist_items`]), driven through an authenticated [`client::YouTubeClient`]
//! that transparently refreshes its OAuth access token before each request.

pub mod client;
pub mod playlist_items;

pub use client::{TimeBoundAccessToken, YouTubeClient};
pub use playlist_items::insert_playlist_item;
