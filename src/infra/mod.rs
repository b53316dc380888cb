//! Infra contains infrastructure specific implementations of things in the [`domain`](crate::domain)
//! module.
pub mod member_http;
pub mod member_json;

pub use member_http::HttpMemberService;
pub use member_json::JsonMemberService;
