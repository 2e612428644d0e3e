pub mod archive;
pub mod classroom;
pub mod config;
pub mod db;
pub mod download;
pub mod drive;
pub mod extract;
pub mod fetch;
pub mod http;
pub mod model;
pub mod names;
pub mod paginate;
pub mod server;
pub mod sync;
pub mod transform;
