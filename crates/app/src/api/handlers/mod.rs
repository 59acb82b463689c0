//! Request handlers

pub mod groups;
pub mod invitations;
pub mod users;
