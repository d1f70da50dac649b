pub use super::courses::Entity as Courses;
pub use super::ratings::Entity as Ratings;
pub use super::stored_files::Entity as StoredFiles;
pub use super::summaries::Entity as Summaries;
pub use super::users::Entity as Users;
