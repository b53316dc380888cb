//! The domain: members, the principals derived from them and the contracts to obtain them.
pub mod member;
pub mod principal;
