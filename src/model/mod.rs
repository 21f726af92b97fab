pub mod attendance;
pub mod batch;
pub mod meeting;
pub mod request;
pub mod role;
pub mod user;
