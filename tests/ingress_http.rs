// Integration tests driving the full router in-process
#[cfg(test)]
mod tests {
    use std::{io, sync::Arc};

    use axum::{
        Router,
        body::Body,
        http::{Request, StatusCode, header},
    };
    use bytes::Bytes;
    use futures_util::stream;
    use metrics_util::{
        MetricKind,
        debugging::{DebugValue, DebuggingRecorder, Snapshotter},
    };
    use tokio::sync::{mpsc, oneshot};
    use tower::ServiceExt;
    use wrp_ingress::{
        AdmissionController, Envelope, HttpHandler, IngressService, QueueDispatcher,
        adapters::DispatchedMessage, build_router, config::IngressConfig,
        metrics::IngressMetrics,
    };

    struct TestApp {
        router: Router,
        rx: mpsc::Receiver<DispatchedMessage>,
        admission: Arc<AdmissionController>,
    }

    fn create_app(threshold: i64, queue_capacity: usize, metrics: IngressMetrics) -> TestApp {
        let config = Arc::new(IngressConfig::default());
        let admission = Arc::new(AdmissionController::new(threshold));
        let (dispatcher, rx) = QueueDispatcher::channel(queue_capacity, metrics.clone());
        let ingress = Arc::new(IngressService::new(
            admission.clone(),
            metrics,
            Arc::new(dispatcher),
            config.payload.max_body_bytes,
        ));
        let handler = Arc::new(HttpHandler::new(ingress, config, None));

        TestApp {
            router: build_router(handler),
            rx,
            admission,
        }
    }

    fn captured_metrics() -> (IngressMetrics, Snapshotter, DebuggingRecorder) {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();
        let metrics = metrics::with_local_recorder(&recorder, IngressMetrics::register);
        (metrics, snapshotter, recorder)
    }

    fn counter_value(snapshotter: &Snapshotter, name: &str, reason: Option<&str>) -> u64 {
        snapshotter
            .snapshot()
            .into_vec()
            .into_iter()
            .filter(|(key, ..)| key.kind() == MetricKind::Counter && key.key().name() == name)
            .filter(|(key, ..)| {
                reason.is_none_or(|expected| {
                    key.key()
                        .labels()
                        .any(|label| label.key() == "reason" && label.value() == expected)
                })
            })
            .map(|(.., value)| match value {
                DebugValue::Counter(count) => count,
                _ => 0,
            })
            .sum()
    }

    fn encoded(content_type: &str, transaction_uuid: &str) -> Vec<u8> {
        Envelope {
            message_type: 4,
            source: "mac:112233445566".to_string(),
            destination: "event:device-status/mac:112233445566/online".to_string(),
            content_type: content_type.to_string(),
            transaction_uuid: transaction_uuid.to_string(),
            payload: br#"{"online":true}"#.to_vec(),
            ..Default::default()
        }
        .to_msgpack()
        .unwrap()
    }

    fn notify_request(body: Body) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/v3/notify")
            .header(header::CONTENT_TYPE, "application/msgpack")
            .body(body)
            .unwrap()
    }

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_valid_envelope_is_accepted_and_dispatched() {
        let mut app = create_app(0, 8, IngressMetrics::noop());

        let response = app
            .router
            .clone()
            .oneshot(notify_request(Body::from(encoded("text/plain", "txn-1"))))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(body_text(response).await, "Request placed on to queue.\n");

        let dispatched = app.rx.recv().await.unwrap();
        assert_eq!(dispatched.priority.0, 0);
        assert_eq!(dispatched.envelope.transaction_uuid, "txn-1");
        assert_eq!(dispatched.envelope.content_type, "text/plain");
        assert_eq!(dispatched.envelope.payload, br#"{"online":true}"#.to_vec());
        assert_eq!(app.admission.outstanding(), 0);
    }

    #[tokio::test]
    async fn test_any_method_reaches_notify() {
        let mut app = create_app(0, 8, IngressMetrics::noop());

        let request = Request::builder()
            .method("PUT")
            .uri("/api/v3/notify")
            .body(Body::from(encoded("text/plain", "txn-put")))
            .unwrap();
        let response = app.router.clone().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(app.rx.recv().await.unwrap().envelope.transaction_uuid, "txn-put");
    }

    #[tokio::test]
    async fn test_missing_fields_are_filled_before_dispatch() {
        let (metrics, snapshotter, _recorder) = captured_metrics();
        let mut app = create_app(0, 8, metrics);

        let response = app
            .router
            .clone()
            .oneshot(notify_request(Body::from(encoded("", ""))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);

        let envelope = app.rx.recv().await.unwrap().envelope;
        assert_eq!(envelope.content_type, "application/json");
        let generated = uuid::Uuid::parse_str(&envelope.transaction_uuid).unwrap();
        assert_eq!(generated.get_version_num(), 4);

        assert_eq!(
            counter_value(&snapshotter, "modifiedEnvelopeCount", Some("both-empty")),
            1
        );
        assert_eq!(
            counter_value(&snapshotter, "modifiedEnvelopeCount", Some("content-type-empty")),
            0
        );
    }

    #[tokio::test]
    async fn test_empty_body_is_rejected() {
        let (metrics, snapshotter, _recorder) = captured_metrics();
        let mut app = create_app(0, 8, metrics);

        let response = app
            .router
            .clone()
            .oneshot(notify_request(Body::empty()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_text(response).await, "Empty payload.\n");
        assert_eq!(counter_value(&snapshotter, "emptyRequests", None), 1);
        assert_eq!(counter_value(&snapshotter, "errorRequests", None), 0);
        assert!(app.rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_garbage_body_is_rejected() {
        let (metrics, snapshotter, _recorder) = captured_metrics();
        let mut app = create_app(0, 8, metrics);

        let response = app
            .router
            .clone()
            .oneshot(notify_request(Body::from(vec![0xc1, 0x00, 0xff])))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_text(response).await, "Invalid payload format.\n");
        assert_eq!(counter_value(&snapshotter, "invalidRequests", None), 1);
        assert_eq!(counter_value(&snapshotter, "modifiedEnvelopeCount", None), 0);
        assert!(app.rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_body_read_failure_is_rejected() {
        let (metrics, snapshotter, _recorder) = captured_metrics();
        let app = create_app(0, 8, metrics);

        let chunks: Vec<Result<Bytes, io::Error>> = vec![
            Ok(Bytes::from_static(b"\x82")),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "peer went away")),
        ];
        let response = app
            .router
            .clone()
            .oneshot(notify_request(Body::from_stream(stream::iter(chunks))))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_text(response).await, "Unable to read request body.\n");
        assert_eq!(counter_value(&snapshotter, "errorRequests", None), 1);
        assert_eq!(counter_value(&snapshotter, "emptyRequests", None), 0);
        assert_eq!(app.admission.outstanding(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_request_is_shed_at_threshold_one() {
        let mut app = create_app(1, 8, IngressMetrics::noop());

        let (release, gate) = oneshot::channel::<()>();
        let held_body = Body::from_stream(stream::once(async move {
            let _ = gate.await;
            Ok::<_, io::Error>(Bytes::from(encoded("text/plain", "held")))
        }));

        let first = tokio::spawn(app.router.clone().oneshot(notify_request(held_body)));
        while app.admission.outstanding() < 1 {
            tokio::task::yield_now().await;
        }

        let shed = app
            .router
            .clone()
            .oneshot(notify_request(Body::from(encoded("text/plain", "second"))))
            .await
            .unwrap();
        assert_eq!(shed.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body_text(shed).await, "Server overloaded, try again later.\n");

        release.send(()).unwrap();
        let accepted = first.await.unwrap().unwrap();
        assert_eq!(accepted.status(), StatusCode::ACCEPTED);
        assert_eq!(app.rx.recv().await.unwrap().envelope.transaction_uuid, "held");
        assert!(app.rx.try_recv().is_err());
        assert_eq!(app.admission.outstanding(), 0);
    }

    #[tokio::test]
    async fn test_full_queue_still_returns_accepted() {
        let (metrics, snapshotter, _recorder) = captured_metrics();
        let mut app = create_app(0, 1, metrics);

        for txn in ["first", "overflow"] {
            let response = app
                .router
                .clone()
                .oneshot(notify_request(Body::from(encoded("text/plain", txn))))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::ACCEPTED);
        }

        assert_eq!(app.rx.recv().await.unwrap().envelope.transaction_uuid, "first");
        assert!(app.rx.try_recv().is_err());
        assert_eq!(
            counter_value(&snapshotter, "droppedMessages", Some("queue-full")),
            1
        );
    }

    #[tokio::test]
    async fn test_health_endpoint_reports_admission_state() {
        let app = create_app(25, 8, IngressMetrics::noop());

        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let response = app.router.clone().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["admission"]["threshold"], 25);
        assert_eq!(json["admission"]["outstanding"], 0);
        assert_eq!(json["admission"]["unbounded"], false);
    }

    #[tokio::test]
    async fn test_metrics_route_absent_without_recorder() {
        let app = create_app(0, 8, IngressMetrics::noop());

        let request = Request::builder()
            .uri("/metrics")
            .body(Body::empty())
            .unwrap();
        let response = app.router.clone().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
