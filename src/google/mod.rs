pub mod gcal;
pub mod oauth;
pub mod session;
