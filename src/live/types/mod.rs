//! Wire types for the live connection: outbound room announcements and the
//! inbound message envelope with its typed payload views.

pub mod request;
pub mod response;
