//! Bearer token verification.
//!
//! - `jwks` - key discovery and the verification key cache
//! - `policy` - issuer, audience, and scope requirements
//! - `claims` - token payload and normalized claims
//! - `jwt` - the verifier

pub mod claims;
pub mod jwks;
pub mod jwt;
pub mod policy;

pub use claims::Claims;
pub use jwks::{HttpKeySource, KeySet, KeySource, KeySourceError, KeyStore, VerificationKey};
pub use jwt::{Verifier, VerifyError, VerifyStage};
pub use policy::Policy;
