//! OData paging against a mock collection

mod common;

use common::{client, fast_config};
use serde_json::{Value, json};
use std::collections::HashMap;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

const PAGE_SIZE: usize = 100;

/// Collection of `total` products paged by `$skip`, like the live API:
/// `$top` is honoured, out-of-range pages silently return page 1
struct Collection {
    base: String,
    total: usize,
    with_count: bool,
}

impl Respond for Collection {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let query: HashMap<String, String> = request.url.query_pairs().into_owned().collect();
        let top = query
            .get("$top")
            .and_then(|v| v.parse().ok())
            .unwrap_or(PAGE_SIZE);
        let mut skip: usize = query.get("$skip").and_then(|v| v.parse().ok()).unwrap_or(0);
        if skip >= self.total {
            skip = 0;
        }

        let end = (skip + top).min(self.total);
        let value: Vec<Value> = (skip..end).map(|i| json!({"Id": i + 1})).collect();

        let mut body = json!({
            "@odata.context": "https://api.example.com/v1/$metadata#Products",
            "value": value,
        });
        if self.with_count && query.get("$count").is_some_and(|v| v == "true") {
            body["@odata.count"] = json!(self.total);
        }
        if end < self.total {
            body["@odata.nextLink"] =
                json!(format!("{}/v1/Products?$skip={}", self.base, end));
        }
        ResponseTemplate::new(200).set_body_json(body)
    }
}

async fn mount(server: &MockServer, total: usize, with_count: bool) {
    Mock::given(method("GET"))
        .and(path("/v1/Products"))
        .respond_with(Collection {
            base: server.uri(),
            total,
            with_count,
        })
        .mount(server)
        .await;
}

fn ids(items: &[Value]) -> Vec<u64> {
    items.iter().filter_map(|item| item["Id"].as_u64()).collect()
}

#[tokio::test]
async fn test_fetch_all_uses_count_and_recommended_size() {
    let server = MockServer::start().await;
    mount(&server, 250, true).await;

    let client = client(&server, fast_config());
    let result = client.fetch_all::<Value>("Products", None).await.unwrap();

    assert_eq!(server.received_requests().await.unwrap().len(), 3);
    assert_eq!(result.items.len(), 250);
    assert_eq!(ids(&result.items), (1..=250).collect::<Vec<u64>>());
    assert_eq!(result.final_page, 3);
    assert!(result.all_pages_queried);
}

#[tokio::test]
async fn test_fetch_all_single_page() {
    let server = MockServer::start().await;
    mount(&server, 40, true).await;

    let client = client(&server, fast_config());
    let result = client.fetch_all::<Value>("Products", None).await.unwrap();

    assert_eq!(server.received_requests().await.unwrap().len(), 1);
    assert_eq!(result.items.len(), 40);
    assert_eq!(result.final_page, 1);
    assert!(result.all_pages_queried);
}

#[tokio::test]
async fn test_fetch_all_without_count_follows_next_links() {
    let server = MockServer::start().await;
    mount(&server, 230, false).await;

    let client = client(&server, fast_config());
    let result = client.fetch_all::<Value>("Products", None).await.unwrap();

    assert_eq!(server.received_requests().await.unwrap().len(), 3);
    assert_eq!(ids(&result.items), (1..=230).collect::<Vec<u64>>());
}

#[tokio::test]
async fn test_fetch_page_in_range() {
    let server = MockServer::start().await;
    mount(&server, 250, true).await;

    let client = client(&server, fast_config());
    let result = client.fetch_page::<Value>("Products", 2, Some(100)).await.unwrap();

    assert_eq!(ids(&result.items), (101..=200).collect::<Vec<u64>>());
    assert_eq!(result.final_page, 2);
    assert!(!result.all_pages_queried);

    let last = client.fetch_page::<Value>("Products", 3, Some(100)).await.unwrap();
    assert_eq!(last.items.len(), 50);
    assert!(last.all_pages_queried);
}

#[tokio::test]
async fn test_fetch_page_past_the_end_is_empty() {
    let server = MockServer::start().await;
    mount(&server, 250, true).await;

    let client = client(&server, fast_config());
    let result = client.fetch_page::<Value>("Products", 10, Some(100)).await.unwrap();

    assert!(result.items.is_empty());
    assert!(result.all_pages_queried);
    assert_eq!(result.final_page, 10);
}

#[tokio::test]
async fn test_page_failure_propagates_with_context() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/Orders"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"Message": "Bad filter"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server, fast_config());
    let error = client.fetch_all::<Value>("Orders?$filter=bad", None).await.unwrap_err();

    assert_eq!(error.status(), Some(400));
    assert!(error.to_string().contains("Bad filter"));
    assert!(error.to_string().contains("/v1/Orders"));
}
