mod request_metrics_state;
pub use request_metrics_state::*;
mod http_metrics_listener;
pub use http_metrics_listener::*;
