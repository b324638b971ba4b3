pub mod projects;
pub mod suggestions;
