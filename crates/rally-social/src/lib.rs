//! Friendship graph for Rally.
//!
//! A friendship is one directed row per unordered pair of accounts. The
//! row's direction records who sent the request; once accepted, both sides
//! see each other as friends.
//!
//! # Key types
//!
//! - [`RelationshipService`]: request / respond / remove, plus listings
//! - [`Friendship`]: one edge, with [`FriendshipStatus`]
//! - [`PairKey`]: order-independent key for a pair of accounts
//! - [`SocialError`]: what can go wrong

mod error;
mod friendship;
mod service;

pub use error::SocialError;
pub use friendship::{Friendship, FriendshipStatus, PairKey};
pub use service::RelationshipService;
