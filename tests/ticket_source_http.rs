#![cfg(feature = "http-source")]

use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use seatmap_engine::config::{CircuitBreakerConfig, SourceConfig};
use seatmap_engine::error::SourceError;
use seatmap_engine::models::ToggleIntent;
use seatmap_engine::services::{CircuitState, HttpTicketSource, TicketSource};

fn source(server: &MockServer, failure_threshold: u32) -> HttpTicketSource {
    let config = SourceConfig {
        base_url: format!("{}/api/v1/", server.uri()),
        event_id: "42".into(),
        timeout_seconds: 5,
    };
    let breaker = CircuitBreakerConfig { failure_threshold, timeout_seconds: 60 };
    HttpTicketSource::from_config(&config, &breaker).unwrap()
}

#[tokio::test]
async fn fetches_event_snapshot() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/events/42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 200,
            "status": "success",
            "data": {
                "scheme": "<svg xmlns=\"http://www.w3.org/2000/svg\"/>",
                "categories": [{"value": 1, "name": "VIP", "color": "#f00"}],
                "tickets": [
                    {"id": "seat-1-1-2", "category": 1, "row": 1, "seat": 2, "inCart": false, "price": "1500"},
                    {"id": 77, "category": 1, "row": "0", "seat": "0", "inCart": true, "bookingLimit": 1700000000000i64}
                ]
            }
        })))
        .mount(&server)
        .await;

    let snapshot = source(&server, 5).fetch_event().await.unwrap();
    assert_eq!(snapshot.categories[0].value, "1");
    assert_eq!(snapshot.tickets.len(), 2);
    assert_eq!(snapshot.tickets[0].seat_number, "2");
    assert_eq!(snapshot.tickets[0].price, Some(1500.0));
    assert!(snapshot.tickets[1].is_zone());
    assert!(snapshot.tickets[1].booking_expires_at.is_some());
}

#[tokio::test]
async fn toggles_cart_and_reports_rejection() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/cart"))
        .and(body_json(json!({"ticketId": "seat-1-1-2", "inCart": true})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": 200, "status": "success"})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/cart"))
        .and(body_json(json!({"ticketId": "seat-1-1-3", "inCart": true})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": 409, "status": "error"})))
        .mount(&server)
        .await;

    let source = source(&server, 5);
    source.toggle_in_cart(&ToggleIntent::add("seat-1-1-2".into())).await.unwrap();

    let err = source.toggle_in_cart(&ToggleIntent::add("seat-1-1-3".into())).await.unwrap_err();
    assert!(matches!(err, SourceError::Rejected { ref code, .. } if code == "409"));
    assert_eq!(source.circuit_state(), CircuitState::Closed);
}

#[tokio::test]
async fn breaker_opens_on_repeated_failures() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/events/42/tickets"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;

    let source = source(&server, 2);
    assert!(matches!(source.fetch_tickets().await, Err(SourceError::Http(_))));
    assert!(matches!(source.fetch_tickets().await, Err(SourceError::Http(_))));
    assert_eq!(source.circuit_state(), CircuitState::Open);

    // третий запрос до сервера не доходит
    assert!(matches!(source.fetch_tickets().await, Err(SourceError::CircuitOpen)));
}
