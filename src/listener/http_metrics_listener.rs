use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{combinators::BoxBody, Full};
use prometheus::Registry;

use crate::collectors::*;
use crate::MyHttpClientError;

use super::RequestMetricsState;

// Mappers decide which collector, if any, tracks a given request. They have
// to be total: a panicking mapper fails the request before any metric update.
pub type CollectorMapper =
    Arc<dyn Fn(&hyper::Request<Full<Bytes>>) -> Option<CollectorConfig> + Send + Sync>;
pub type HistogramCollectorMapper =
    Arc<dyn Fn(&hyper::Request<Full<Bytes>>) -> Option<HistogramCollectorConfig> + Send + Sync>;

pub enum RequestOutcome<'s> {
    Response(&'s hyper::Response<BoxBody<Bytes, String>>),
    TransportFailure,
}

pub struct HttpMetricsListener {
    registry: Arc<Registry>,
    request_latency: HistogramCollectorMapper,
    requests_in_progress: CollectorMapper,
    success_counter: CollectorMapper,
    error_counter: CollectorMapper,
    failure_counter: CollectorMapper,
}

impl HttpMetricsListener {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            request_latency: Arc::new(|_| Some(HistogramCollectorConfig::new(DEFAULT_LATENCY_NAME))),
            requests_in_progress: Arc::new(|_| Some(CollectorConfig::new(DEFAULT_IN_PROGRESS_NAME))),
            success_counter: Arc::new(|_| Some(CollectorConfig::new(DEFAULT_SUCCESS_COUNTER_NAME))),
            error_counter: Arc::new(|_| Some(CollectorConfig::new(DEFAULT_ERROR_COUNTER_NAME))),
            failure_counter: Arc::new(|_| Some(CollectorConfig::new(DEFAULT_FAILURE_COUNTER_NAME))),
        }
    }

    pub fn set_registry(&mut self, registry: Arc<Registry>) {
        self.registry = registry;
    }

    pub fn set_request_latency_mapper(&mut self, mapper: HistogramCollectorMapper) {
        self.request_latency = mapper;
    }

    pub fn set_requests_in_progress_mapper(&mut self, mapper: CollectorMapper) {
        self.requests_in_progress = mapper;
    }

    pub fn set_success_counter_mapper(&mut self, mapper: CollectorMapper) {
        self.success_counter = mapper;
    }

    pub fn set_error_counter_mapper(&mut self, mapper: CollectorMapper) {
        self.error_counter = mapper;
    }

    pub fn set_failure_counter_mapper(&mut self, mapper: CollectorMapper) {
        self.failure_counter = mapper;
    }

    pub fn before_request(
        &self,
        req: &hyper::Request<Full<Bytes>>,
    ) -> Result<RequestMetricsState, MyHttpClientError> {
        let latency_config = (self.request_latency)(req);
        let in_progress_config = (self.requests_in_progress)(req);

        // A histogram and a gauge under one name would collide inside the
        // registry namespace. Rejected up front instead of misbehaving.
        if let (Some(latency), Some(in_progress)) = (&latency_config, &in_progress_config) {
            if latency.name == in_progress.name {
                return Err(MyHttpClientError::CollectorNameCollision(latency.name.clone()));
            }
        }

        let histogram = match latency_config.as_ref() {
            Some(config) => Some(get_or_create_histogram(&self.registry, config)?),
            None => None,
        };

        let in_progress = match in_progress_config.as_ref() {
            Some(config) => Some(get_or_create_in_progress_gauge(&self.registry, config)?),
            None => None,
        };

        let timer = histogram.map(|histogram| histogram.start_timer());

        if let Some(in_progress) = in_progress.as_ref() {
            in_progress.inc();
        }

        Ok(RequestMetricsState::new(timer, in_progress))
    }

    // Single teardown point for both response and transport failure outcomes.
    // The timer stop and the gauge decrement happen before the outcome
    // counter resolution, so the in-flight view never goes negative.
    pub fn after_request(
        &self,
        req: &hyper::Request<Full<Bytes>>,
        outcome: RequestOutcome,
        state: RequestMetricsState,
    ) -> Result<(), MyHttpClientError> {
        state.complete();

        let mapper = match outcome {
            RequestOutcome::Response(response) => {
                if response.status().is_success() {
                    &self.success_counter
                } else {
                    &self.error_counter
                }
            }
            RequestOutcome::TransportFailure => &self.failure_counter,
        };

        if let Some(config) = (mapper)(req) {
            let counter = get_or_create_counter(&self.registry, &config)?;
            counter.inc();
        }

        Ok(())
    }

    // Long lived duplex channels do not map onto single request histograms
    // and gauges. Websocket upgrades are deliberately not tracked.
    pub fn before_web_socket(&self) -> RequestMetricsState {
        RequestMetricsState::empty()
    }

    pub fn web_socket_finished(&self, _state: RequestMetricsState) {}
}
