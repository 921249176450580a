use bytes::Bytes;
use http_body_util::{combinators::BoxBody, Full};

use crate::MyHttpClientError;

#[async_trait::async_trait]
pub trait MyHttpBackend {
    async fn execute(
        &self,
        req: hyper::Request<Full<Bytes>>,
    ) -> Result<hyper::Response<BoxBody<Bytes, String>>, MyHttpClientError>;
}

#[async_trait::async_trait]
pub trait MyHttpWebSocketBackend: MyHttpBackend {
    type WebSocketStream: Send + Sync + 'static;

    async fn execute_web_socket(
        &self,
        req: hyper::Request<Full<Bytes>>,
    ) -> Result<(Self::WebSocketStream, hyper::Response<BoxBody<Bytes, String>>), MyHttpClientError>;
}
