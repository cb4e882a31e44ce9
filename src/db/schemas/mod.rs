//! Database schemas for the collector
//!
//! Defines MongoDB document structures for supporters and the three event
//! record kinds.

mod html;
mod impression;
mod supporter;
mod timeline;

pub use html::{HtmlDoc, HTML_COLLECTION};
pub use impression::{ImpressionDoc, IMPRESSION_COLLECTION};
pub use supporter::{SupporterDoc, SUPPORTER_COLLECTION};
pub use timeline::{TimelineDoc, TIMELINE_COLLECTION};
