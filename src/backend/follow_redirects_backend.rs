use bytes::Bytes;
use http::header::LOCATION;
use http::{Method, StatusCode, Uri};
use http_body_util::{combinators::BoxBody, Full};

use crate::{MyHttpBackend, MyHttpClientError, MyHttpWebSocketBackend};

pub const DEFAULT_MAX_REDIRECTS: usize = 32;

pub struct FollowRedirectsBackend<TBackend: MyHttpBackend + Send + Sync + 'static> {
    delegate: TBackend,
    max_redirects: usize,
}

impl<TBackend: MyHttpBackend + Send + Sync + 'static> FollowRedirectsBackend<TBackend> {
    pub fn new(delegate: TBackend) -> Self {
        Self {
            delegate,
            max_redirects: DEFAULT_MAX_REDIRECTS,
        }
    }

    pub fn set_max_redirects(&mut self, max_redirects: usize) {
        self.max_redirects = max_redirects;
    }
}

#[async_trait::async_trait]
impl<TBackend: MyHttpBackend + Send + Sync + 'static> MyHttpBackend
    for FollowRedirectsBackend<TBackend>
{
    async fn execute(
        &self,
        req: hyper::Request<Full<Bytes>>,
    ) -> Result<hyper::Response<BoxBody<Bytes, String>>, MyHttpClientError> {
        let mut method = req.method().clone();
        let mut uri = req.uri().clone();
        let version = req.version();
        let headers = req.headers().clone();
        let body = req.body().clone();

        let mut redirects_no = 0;

        let mut response = self.delegate.execute(req).await?;

        while is_redirect(response.status()) {
            if redirects_no == self.max_redirects {
                return Err(MyHttpClientError::TooManyRedirects(self.max_redirects));
            }

            let location = read_location(&response)?;
            uri = resolve_location(&uri, location.as_str())?;

            let mut next_body = body.clone();

            // See Other downgrades the follow up request to a bodiless GET.
            if response.status() == StatusCode::SEE_OTHER {
                method = Method::GET;
                next_body = Full::new(Bytes::new());
            }

            let next = build_request(method.clone(), &uri, version, &headers, next_body)?;

            redirects_no += 1;
            response = self.delegate.execute(next).await?;
        }

        Ok(response)
    }
}

// Upgrade requests pass through. A redirected upgrade handshake is not
// followed by this layer.
#[async_trait::async_trait]
impl<TBackend: MyHttpWebSocketBackend + Send + Sync + 'static> MyHttpWebSocketBackend
    for FollowRedirectsBackend<TBackend>
{
    type WebSocketStream = TBackend::WebSocketStream;

    async fn execute_web_socket(
        &self,
        req: hyper::Request<Full<Bytes>>,
    ) -> Result<(Self::WebSocketStream, hyper::Response<BoxBody<Bytes, String>>), MyHttpClientError>
    {
        self.delegate.execute_web_socket(req).await
    }
}

fn is_redirect(status: StatusCode) -> bool {
    match status {
        StatusCode::MOVED_PERMANENTLY => true,
        StatusCode::FOUND => true,
        StatusCode::SEE_OTHER => true,
        StatusCode::TEMPORARY_REDIRECT => true,
        StatusCode::PERMANENT_REDIRECT => true,
        _ => false,
    }
}

fn read_location(
    response: &hyper::Response<BoxBody<Bytes, String>>,
) -> Result<String, MyHttpClientError> {
    let Some(value) = response.headers().get(LOCATION) else {
        return Err(MyHttpClientError::InvalidRedirectLocation(
            "Location header is missing".to_string(),
        ));
    };

    match value.to_str() {
        Ok(value) => Ok(value.to_string()),
        Err(err) => Err(MyHttpClientError::InvalidRedirectLocation(err.to_string())),
    }
}

fn resolve_location(base: &Uri, location: &str) -> Result<Uri, MyHttpClientError> {
    let location: Uri = location
        .parse()
        .map_err(|_| MyHttpClientError::InvalidRedirectLocation(location.to_string()))?;

    if location.scheme().is_some() {
        return Ok(location);
    }

    let mut parts = base.clone().into_parts();
    parts.path_and_query = location.path_and_query().cloned();

    Uri::from_parts(parts).map_err(|err| MyHttpClientError::InvalidRedirectLocation(err.to_string()))
}

fn build_request(
    method: Method,
    uri: &Uri,
    version: http::Version,
    headers: &http::HeaderMap,
    body: Full<Bytes>,
) -> Result<hyper::Request<Full<Bytes>>, MyHttpClientError> {
    let mut builder = hyper::Request::builder()
        .method(method)
        .uri(uri.clone())
        .version(version);

    if let Some(target) = builder.headers_mut() {
        for (name, value) in headers.iter() {
            target.append(name.clone(), value.clone());
        }
    }

    builder
        .body(body)
        .map_err(|err| MyHttpClientError::InvalidRedirectLocation(err.to_string()))
}
