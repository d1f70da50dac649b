pub mod prelude;

pub mod courses;
pub mod ratings;
pub mod stored_files;
pub mod summaries;
pub mod users;
