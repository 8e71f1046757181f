//! Contact extraction from fetched pages

mod email;
mod phone;

pub use email::EmailExtractor;
pub use phone::{infer_region, PhoneExtractor};
