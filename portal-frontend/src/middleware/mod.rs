pub mod auth;
pub mod policy;
pub mod session;
pub mod tenant;
