//! OData collection envelope

use crate::api::error::{ApiError, ApiResult};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// One page of a collection response
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(bound(deserialize = "T: DeserializeOwned"))]
pub struct QueryResponse<T = Value> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
    #[serde(rename = "@odata.count", default)]
    pub count: Option<u64>,
    #[serde(rename = "@odata.nextLink", default)]
    pub next_link: Option<String>,
}

impl<T: DeserializeOwned> QueryResponse<T> {
    /// Parse a collection body; a body that is not an envelope is a protocol error
    pub fn from_json(status: u16, body: &str) -> ApiResult<Self> {
        serde_json::from_str(body).map_err(|e| ApiError::unparsable(status, e))
    }
}

impl<T> QueryResponse<T> {
    /// Check if there are more results available
    pub fn has_more(&self) -> bool {
        self.next_link.is_some()
    }

    pub fn len(&self) -> usize {
        self.value.len()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

impl<T> Default for QueryResponse<T> {
    fn default() -> Self {
        Self {
            value: Vec::new(),
            count: None,
            next_link: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Order {
        #[serde(rename = "OrderId")]
        order_id: u32,
    }

    #[test]
    fn test_parse_envelope() {
        let body = r#"{
            "@odata.context": "https://api.example.com/v1/$metadata#Orders",
            "value": [{"OrderId": 1}, {"OrderId": 2}],
            "@odata.count": 250,
            "@odata.nextLink": "https://api.example.com/v1/Orders?$skip=100"
        }"#;

        let page: QueryResponse<Order> = QueryResponse::from_json(200, body).unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page.value[1], Order { order_id: 2 });
        assert_eq!(page.count, Some(250));
        assert!(page.has_more());
    }

    #[test]
    fn test_last_page_has_no_next_link() {
        let page: QueryResponse = QueryResponse::from_json(200, r#"{"value": []}"#).unwrap();
        assert!(page.is_empty());
        assert!(!page.has_more());
        assert_eq!(page.count, None);
    }

    #[test]
    fn test_unparsable_body() {
        let error = QueryResponse::<Order>::from_json(200, "<html></html>").unwrap_err();
        assert_eq!(error.status(), Some(200));

        let wrong_shape = QueryResponse::<Order>::from_json(200, r#"{"value": [{"Sku": "A"}]}"#);
        assert!(wrong_shape.is_err());
    }
}
