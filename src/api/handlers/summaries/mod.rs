pub mod download;
pub mod list;
pub mod manage;
pub mod rating;
pub mod types;
pub mod upload;

pub use types::*;

pub use download::download_summary;
pub use list::{get_summary, list_summaries, my_summaries};
pub use manage::{delete_summary, update_summary};
pub use rating::{get_ratings, rate_summary};
pub use upload::upload_summary;
