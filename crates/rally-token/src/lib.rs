//! Token codec for Rally.
//!
//! Encodes and decodes signed, expiring claim sets. The codec is a pure
//! function of (claims, key, clock): it holds no state, so any number of
//! tasks may call it at once.
//!
//! - [`TokenCodec`]: HS256 issue/decode with clock-driven expiry
//! - [`Claims`] / [`TokenKind`]: what a token says
//! - [`Clock`]: the time source every Rally component reads from
//!
//! Revocation is NOT the codec's concern. A token that decodes cleanly may
//! still be revoked; the session layer checks that separately.

mod claims;
mod clock;
mod codec;
mod error;

pub use claims::{Claims, TokenKind};
pub use clock::{Clock, ManualClock, SystemClock};
pub use codec::TokenCodec;
pub use error::TokenError;
