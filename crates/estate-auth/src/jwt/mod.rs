//! Bearer token decoding and claims.

pub mod claims;
pub mod decoder;

pub use claims::{AdminLevel, Claims, Credential, Role, SessionClaims};
pub use decoder::decode_claims;
