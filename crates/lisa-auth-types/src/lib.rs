//! Bearer-token types shared by Lisa services.
//!
//! Provides JWT issuance/validation and the `Identity` extractor.

pub mod identity;
pub mod token;
