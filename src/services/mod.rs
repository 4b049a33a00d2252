//! External service clients

pub mod license;
