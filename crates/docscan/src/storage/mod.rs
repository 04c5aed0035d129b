pub mod archivist;

pub use archivist::{archive_file_name, Archivist, IdentityLayout};
