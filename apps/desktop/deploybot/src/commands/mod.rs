pub mod bridge;
pub mod notification;
pub mod worker;
