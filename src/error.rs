use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum MyHttpClientError {
    #[error("Can not connect to remote host: {0}")]
    CanNotConnectToRemoteHost(String),
    #[error("Can not execute request: {0}")]
    CanNotExecuteRequest(String),
    #[error("Disconnected")]
    Disconnected,
    #[error("Disposed")]
    Disposed,
    #[error("Request timeout: {0:?}")]
    RequestTimeout(Duration),
    #[error("Too many redirects. Max amount: {0}")]
    TooManyRedirects(usize),
    #[error("Invalid redirect location: {0}")]
    InvalidRedirectLocation(String),
    #[error("Can not register metrics collector: {0}")]
    CollectorRegistration(String),
    #[error("Latency histogram and in-progress gauge can not share the collector name '{0}'")]
    CollectorNameCollision(String),
}

impl MyHttpClientError {
    pub fn is_disconnected(&self) -> bool {
        match self {
            MyHttpClientError::Disconnected => true,
            _ => false,
        }
    }

    pub fn is_too_many_redirects(&self) -> bool {
        match self {
            MyHttpClientError::TooManyRedirects(_) => true,
            _ => false,
        }
    }

    // Configuration errors are fatal to the request which triggered the first
    // collector creation. They are never retried.
    pub fn is_configuration_error(&self) -> bool {
        match self {
            MyHttpClientError::CollectorRegistration(_) => true,
            MyHttpClientError::CollectorNameCollision(_) => true,
            _ => false,
        }
    }
}
