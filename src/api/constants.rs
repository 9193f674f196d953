//! API constants for the commerce REST API family

/// REST API version segment
pub const API_VERSION: &str = "v1";

/// Token endpoint, relative to the API host
pub const TOKEN_ENDPOINT: &str = "oauth2/token";

/// Batch endpoint for multi-operation requests
pub const BATCH_ENDPOINT: &str = "$batch";

/// Boundary string used for every batch request body
pub const CHANGESET_BOUNDARY: &str = "changeset";

/// Content type for batch requests
pub fn batch_content_type() -> String {
    format!("multipart/mixed; boundary={}", CHANGESET_BOUNDARY)
}

/// Suffix appended to a resource name to reach its bulk export endpoint
pub const EXPORT_SUFFIX: &str = "Export";

/// Query parameter carrying the access token on mutating calls
pub const ACCESS_TOKEN_PARAM: &str = "access_token";

/// OData query options used to drive paging
pub mod odata {
    pub const COUNT: &str = "$count";
    pub const SKIP: &str = "$skip";
    pub const TOP: &str = "$top";
    pub const FILTER: &str = "$filter";
    pub const SELECT: &str = "$select";

    /// Envelope keys of a collection response
    pub const VALUE: &str = "value";
    pub const COUNT_ANNOTATION: &str = "@odata.count";
    pub const NEXT_LINK_ANNOTATION: &str = "@odata.nextLink";
}

/// OAuth2 grant types accepted by the token endpoint
pub mod grants {
    pub const REFRESH_TOKEN: &str = "refresh_token";
    pub const SOAP: &str = "soap";
}

/// Standard header values
pub mod headers {
    /// Content type for JSON requests
    pub const CONTENT_TYPE_JSON: &str = "application/json";

    /// Content type of a single batch part
    pub const CONTENT_TYPE_HTTP: &str = "application/http";

    /// Correlation id header attached to every outgoing request
    pub const X_CORRELATION_ID: &str = "X-Correlation-Id";
}

/// HTTP methods allowed inside a batch
pub mod methods {
    pub const GET: &str = "GET";
    pub const POST: &str = "POST";
    pub const PUT: &str = "PUT";
}

/// Join a base URL and a relative path with exactly one slash
pub fn join(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Build a collection endpoint URL
pub fn resource_endpoint(base_url: &str, resource: &str) -> String {
    join(base_url, &format!("{}/{}", API_VERSION, resource))
}

/// Build the batch endpoint URL
pub fn batch_endpoint(base_url: &str) -> String {
    join(base_url, &format!("{}/{}", API_VERSION, BATCH_ENDPOINT))
}

/// Build the export endpoint URL for a resource (`Products` -> `ProductExport`)
pub fn export_endpoint(base_url: &str, resource: &str) -> String {
    let singular = resource.strip_suffix('s').unwrap_or(resource);
    join(
        base_url,
        &format!("{}/{}{}", API_VERSION, singular, EXPORT_SUFFIX),
    )
}

/// Build the token endpoint URL
pub fn token_endpoint(base_url: &str) -> String {
    join(base_url, TOKEN_ENDPOINT)
}
