mod error;
pub use error::*;

pub mod collectors;

mod my_http_backend;
pub use my_http_backend::*;

pub mod backend;
pub mod listener;
pub mod utils;
