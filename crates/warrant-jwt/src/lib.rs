//! # warrant-jwt
//!
//! Signed credential encoding for Warrant.
//!
//! This crate provides functionality for:
//! - Generating and loading HMAC signing secrets
//! - Encoding `(name, perm, extra, issued_at)` into a compact HS256 JWT
//! - Decoding a presented token back into its claims after verifying the tag
//!
//! ## Token Format
//!
//! | Part | Contents |
//! |------|----------|
//! | Header | `alg` (`HS256`) and `kid` (fingerprint of the signing secret) |
//! | Payload | `name`, `perm`, `ext`, `iat`, `jti`, optional `exp` |
//! | Signature | HMAC-SHA256 over header and payload |
//!
//! The `kid` lets a decoder pick the right secret after a rotation: the codec
//! signs with one current key and verifies against the current key plus any
//! retired keys it was given.
//!
//! Decoding is a pure check on the bytes presented. It never consults the
//! credential store, so a revoked token still decodes successfully.

pub mod claims;
pub mod error;
pub mod keys;
pub mod token;

pub use claims::TokenClaims;
pub use error::CodecError;
pub use keys::SigningKey;
pub use token::TokenCodec;
