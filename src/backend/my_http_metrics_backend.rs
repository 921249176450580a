use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{combinators::BoxBody, Full};
use prometheus::Registry;

use crate::collectors::DEFAULT_REGISTRY;
use crate::listener::{
    CollectorMapper, HistogramCollectorMapper, HttpMetricsListener, RequestOutcome,
};
use crate::{MyHttpBackend, MyHttpClientError, MyHttpWebSocketBackend};

use super::FollowRedirectsBackend;

// Request execution semantics of the delegate stay as they are. The listener
// hooks surround the whole redirect following execution, so a request which
// redirects N times lands in the histogram and the counters as one unit.
pub struct MyHttpMetricsBackend<TBackend: MyHttpBackend + Send + Sync + 'static> {
    delegate: FollowRedirectsBackend<TBackend>,
    listener: HttpMetricsListener,
}

impl<TBackend: MyHttpBackend + Send + Sync + 'static> MyHttpMetricsBackend<TBackend> {
    pub fn new(delegate: TBackend) -> Self {
        Self {
            delegate: FollowRedirectsBackend::new(delegate),
            listener: HttpMetricsListener::new(DEFAULT_REGISTRY.clone()),
        }
    }

    pub fn set_registry(&mut self, registry: Arc<Registry>) {
        self.listener.set_registry(registry);
    }

    pub fn set_max_redirects(&mut self, max_redirects: usize) {
        self.delegate.set_max_redirects(max_redirects);
    }

    pub fn set_request_latency_mapper(&mut self, mapper: HistogramCollectorMapper) {
        self.listener.set_request_latency_mapper(mapper);
    }

    pub fn set_requests_in_progress_mapper(&mut self, mapper: CollectorMapper) {
        self.listener.set_requests_in_progress_mapper(mapper);
    }

    pub fn set_success_counter_mapper(&mut self, mapper: CollectorMapper) {
        self.listener.set_success_counter_mapper(mapper);
    }

    pub fn set_error_counter_mapper(&mut self, mapper: CollectorMapper) {
        self.listener.set_error_counter_mapper(mapper);
    }

    pub fn set_failure_counter_mapper(&mut self, mapper: CollectorMapper) {
        self.listener.set_failure_counter_mapper(mapper);
    }
}

#[async_trait::async_trait]
impl<TBackend: MyHttpBackend + Send + Sync + 'static> MyHttpBackend
    for MyHttpMetricsBackend<TBackend>
{
    async fn execute(
        &self,
        req: hyper::Request<Full<Bytes>>,
    ) -> Result<hyper::Response<BoxBody<Bytes, String>>, MyHttpClientError> {
        let state = self.listener.before_request(&req)?;

        match self.delegate.execute(req.clone()).await {
            Ok(response) => {
                self.listener
                    .after_request(&req, RequestOutcome::Response(&response), state)?;

                Ok(response)
            }
            Err(err) => {
                // The transport error reaches the caller as is. An
                // instrumentation error on this path can not replace it.
                if let Err(listener_err) =
                    self.listener
                        .after_request(&req, RequestOutcome::TransportFailure, state)
                {
                    tracing::warn!(
                        "Can not update failure metrics for request: {}",
                        listener_err
                    );
                }

                Err(err)
            }
        }
    }
}

#[async_trait::async_trait]
impl<TBackend: MyHttpWebSocketBackend + Send + Sync + 'static> MyHttpWebSocketBackend
    for MyHttpMetricsBackend<TBackend>
{
    type WebSocketStream = TBackend::WebSocketStream;

    async fn execute_web_socket(
        &self,
        req: hyper::Request<Full<Bytes>>,
    ) -> Result<(Self::WebSocketStream, hyper::Response<BoxBody<Bytes, String>>), MyHttpClientError>
    {
        let state = self.listener.before_web_socket();

        let result = self.delegate.execute_web_socket(req).await;

        self.listener.web_socket_finished(state);

        result
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use http::header::LOCATION;
    use http::StatusCode;
    use prometheus::Registry;

    use crate::collectors::*;

    use super::*;

    struct ScriptedBackend {
        results: Mutex<VecDeque<Result<hyper::Response<BoxBody<Bytes, String>>, MyHttpClientError>>>,
    }

    impl ScriptedBackend {
        fn new(
            results: Vec<Result<hyper::Response<BoxBody<Bytes, String>>, MyHttpClientError>>,
        ) -> Self {
            Self {
                results: Mutex::new(results.into()),
            }
        }
    }

    #[async_trait::async_trait]
    impl MyHttpBackend for ScriptedBackend {
        async fn execute(
            &self,
            _req: hyper::Request<Full<Bytes>>,
        ) -> Result<hyper::Response<BoxBody<Bytes, String>>, MyHttpClientError> {
            self.results.lock().unwrap().pop_front().unwrap()
        }
    }

    struct AlwaysOkBackend;

    #[async_trait::async_trait]
    impl MyHttpBackend for AlwaysOkBackend {
        async fn execute(
            &self,
            _req: hyper::Request<Full<Bytes>>,
        ) -> Result<hyper::Response<BoxBody<Bytes, String>>, MyHttpClientError> {
            Ok(response(StatusCode::OK))
        }
    }

    fn response(status: StatusCode) -> hyper::Response<BoxBody<Bytes, String>> {
        crate::utils::into_empty_body(hyper::Response::builder().status(status))
    }

    fn request() -> hyper::Request<Full<Bytes>> {
        hyper::Request::builder()
            .method(http::Method::GET)
            .uri("http://localhost/test")
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    fn backend_on(
        registry: &Arc<Registry>,
        results: Vec<Result<hyper::Response<BoxBody<Bytes, String>>, MyHttpClientError>>,
    ) -> MyHttpMetricsBackend<ScriptedBackend> {
        let mut backend = MyHttpMetricsBackend::new(ScriptedBackend::new(results));
        backend.set_registry(registry.clone());
        backend
    }

    fn counter_value(registry: &Registry, name: &str) -> u64 {
        for family in registry.gather() {
            if family.get_name() == name {
                return family.get_metric()[0].get_counter().get_value() as u64;
            }
        }

        0
    }

    fn gauge_value(registry: &Registry, name: &str) -> i64 {
        for family in registry.gather() {
            if family.get_name() == name {
                return family.get_metric()[0].get_gauge().get_value() as i64;
            }
        }

        0
    }

    fn histogram_count(registry: &Registry, name: &str) -> u64 {
        for family in registry.gather() {
            if family.get_name() == name {
                return family.get_metric()[0].get_histogram().get_sample_count();
            }
        }

        0
    }

    fn families_with_name(registry: &Registry, name: &str) -> usize {
        registry
            .gather()
            .into_iter()
            .filter(|family| family.get_name() == name)
            .count()
    }

    #[tokio::test]
    async fn success_response_tracks_every_default_collector() {
        let registry = Arc::new(Registry::new());
        let backend = backend_on(&registry, vec![Ok(response(StatusCode::OK))]);

        backend.execute(request()).await.unwrap();

        assert_eq!(histogram_count(&registry, DEFAULT_LATENCY_NAME), 1);
        assert_eq!(gauge_value(&registry, DEFAULT_IN_PROGRESS_NAME), 0);
        assert_eq!(counter_value(&registry, DEFAULT_SUCCESS_COUNTER_NAME), 1);
        assert_eq!(counter_value(&registry, DEFAULT_ERROR_COUNTER_NAME), 0);
        assert_eq!(counter_value(&registry, DEFAULT_FAILURE_COUNTER_NAME), 0);
    }

    #[tokio::test]
    async fn error_response_lands_in_the_error_counter() {
        let registry = Arc::new(Registry::new());
        let backend = backend_on(
            &registry,
            vec![Ok(response(StatusCode::INTERNAL_SERVER_ERROR))],
        );

        let response = backend.execute(request()).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(counter_value(&registry, DEFAULT_SUCCESS_COUNTER_NAME), 0);
        assert_eq!(counter_value(&registry, DEFAULT_ERROR_COUNTER_NAME), 1);
        assert_eq!(counter_value(&registry, DEFAULT_FAILURE_COUNTER_NAME), 0);
    }

    #[tokio::test]
    async fn transport_failure_lands_in_the_failure_counter() {
        let registry = Arc::new(Registry::new());
        let backend = backend_on(&registry, vec![Err(MyHttpClientError::Disconnected)]);

        let err = backend.execute(request()).await.unwrap_err();

        assert!(err.is_disconnected());
        assert_eq!(histogram_count(&registry, DEFAULT_LATENCY_NAME), 1);
        assert_eq!(gauge_value(&registry, DEFAULT_IN_PROGRESS_NAME), 0);
        assert_eq!(counter_value(&registry, DEFAULT_SUCCESS_COUNTER_NAME), 0);
        assert_eq!(counter_value(&registry, DEFAULT_ERROR_COUNTER_NAME), 0);
        assert_eq!(counter_value(&registry, DEFAULT_FAILURE_COUNTER_NAME), 1);
    }

    #[tokio::test]
    async fn redirected_request_is_measured_once() {
        let registry = Arc::new(Registry::new());

        let redirect = |location: &str| {
            Ok(crate::utils::into_empty_body(
                hyper::Response::builder()
                    .status(StatusCode::FOUND)
                    .header(LOCATION, location),
            ))
        };

        let backend = backend_on(
            &registry,
            vec![redirect("/a"), redirect("/b"), Ok(response(StatusCode::OK))],
        );

        backend.execute(request()).await.unwrap();

        assert_eq!(histogram_count(&registry, DEFAULT_LATENCY_NAME), 1);
        assert_eq!(counter_value(&registry, DEFAULT_SUCCESS_COUNTER_NAME), 1);
    }

    #[tokio::test]
    async fn two_backends_share_one_histogram() {
        let registry = Arc::new(Registry::new());

        let first = backend_on(&registry, vec![Ok(response(StatusCode::OK))]);
        let second = backend_on(&registry, vec![Ok(response(StatusCode::OK))]);

        first.execute(request()).await.unwrap();
        second.execute(request()).await.unwrap();

        assert_eq!(families_with_name(&registry, DEFAULT_LATENCY_NAME), 1);
        assert_eq!(histogram_count(&registry, DEFAULT_LATENCY_NAME), 2);
    }

    #[tokio::test]
    async fn concurrent_requests_register_each_collector_once() {
        let registry = Arc::new(Registry::new());

        let mut backend = MyHttpMetricsBackend::new(AlwaysOkBackend);
        backend.set_registry(registry.clone());
        let backend = Arc::new(backend);

        let mut tasks = Vec::new();

        for _ in 0..100 {
            let backend = backend.clone();
            tasks.push(tokio::spawn(async move {
                backend.execute(request()).await
            }));
        }

        for result in futures::future::join_all(tasks).await {
            result.unwrap().unwrap();
        }

        assert_eq!(families_with_name(&registry, DEFAULT_LATENCY_NAME), 1);
        assert_eq!(families_with_name(&registry, DEFAULT_IN_PROGRESS_NAME), 1);
        assert_eq!(families_with_name(&registry, DEFAULT_SUCCESS_COUNTER_NAME), 1);
        assert_eq!(counter_value(&registry, DEFAULT_SUCCESS_COUNTER_NAME), 100);
        assert_eq!(gauge_value(&registry, DEFAULT_IN_PROGRESS_NAME), 0);
    }

    #[tokio::test]
    async fn clear_allows_rebuilding_against_the_same_registry() {
        let registry = Arc::new(Registry::new());

        let backend = backend_on(&registry, vec![Ok(response(StatusCode::OK))]);
        backend.execute(request()).await.unwrap();

        clear(&registry);

        let backend = backend_on(&registry, vec![Ok(response(StatusCode::OK))]);
        backend.execute(request()).await.unwrap();

        assert_eq!(counter_value(&registry, DEFAULT_SUCCESS_COUNTER_NAME), 1);
        assert_eq!(histogram_count(&registry, DEFAULT_LATENCY_NAME), 1);
    }

    #[tokio::test]
    async fn custom_labels_show_up_on_the_collector() {
        let registry = Arc::new(Registry::new());

        let mut backend =
            MyHttpMetricsBackend::new(ScriptedBackend::new(vec![Ok(response(StatusCode::OK))]));
        backend.set_registry(registry.clone());
        backend.set_success_counter_mapper(Arc::new(|req| {
            Some(
                CollectorConfig::new("requests_by_method")
                    .with_label("method", req.method().as_str()),
            )
        }));

        backend.execute(request()).await.unwrap();

        let families = registry.gather();
        let family = families
            .iter()
            .find(|family| family.get_name() == "requests_by_method")
            .unwrap();

        let labels = family.get_metric()[0].get_label();
        assert_eq!(labels.len(), 1);
        assert_eq!(labels[0].get_name(), "method");
        assert_eq!(labels[0].get_value(), "GET");
    }
}
