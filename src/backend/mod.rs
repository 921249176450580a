mod follow_redirects_backend;
pub use follow_redirects_backend::*;
mod my_http_metrics_backend;
pub use my_http_metrics_backend::*;
