//! This crate implements the core of a bin collection reminder.
//!
//! It reads household waste collection dates from an iCalendar feed, works
//! out the next collection, switches OpenRGB lighting profiles to match and
//! optionally sends a Bark push notification.

pub mod bark_client;
pub mod collection_client;
pub mod config;
pub mod openrgb_client;
pub mod profile;
