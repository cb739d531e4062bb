//! API middleware.

pub mod request_id;
