pub mod entity;
pub mod error;
pub mod format;
pub mod gazetteer;
pub mod intent;
pub mod models;

pub use entity::{extract_date, extract_region};
pub use error::{AssistantError, ErrorKind};
pub use format::{format_commodity, format_weather};
pub use gazetteer::{Gazetteer, GazetteerProfile};
pub use intent::{classify, normalize_text, INTENT_RULES};
pub use models::*;
