pub mod playlist;
pub mod ranking;
pub mod rating;
pub mod user;

pub use playlist::*;
pub use ranking::*;
pub use rating::*;
pub use user::*;

use mongodb::bson::DateTime as BsonDateTime;

pub(crate) fn to_rfc3339(date: &BsonDateTime) -> String {
    date.try_to_rfc3339_string().unwrap_or_default()
}
