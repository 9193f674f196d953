use super::auth::CredentialManager;
use super::constants::{self, headers, odata};
use super::error::{ApiError, ApiResult, CallContext};
use super::export::{self, ExportJob, ExportRequest, LookupStrategy};
use super::models::{CredentialState, LegacyCredentials};
use super::operations::batch::parser::extract_error_message;
use super::operations::{
    BatchBuilder, BatchCeiling, BatchResponse, BatchResponseItem, BatchResponseParser,
};
use super::query::paging::{self, PagedResult, with_query};
use super::query::QueryResponse;
use super::resilience::logging::redact_url;
use super::resilience::{
    ApiLogger, OperationContext, OperationKind, RateLimiter, RateLimiterStats, ResilienceConfig,
    RetryConfig, RetryPolicy,
};
use log::{debug, info, warn};
use reqwest::Method;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Resilient client for the commerce REST API
///
/// Cheap to clone; clones share credentials, rate limiters and the batch
/// ceiling.
#[derive(Debug, Clone)]
pub struct CommerceClient {
    base_url: String,
    account_id: Option<String>,
    http_client: reqwest::Client,
    credentials: Arc<CredentialManager>,
    single_limiter: RateLimiter,
    batch_limiter: RateLimiter,
    read_retry: RetryPolicy,
    write_retry: RetryPolicy,
    ceiling: Arc<BatchCeiling>,
    config: Arc<ResilienceConfig>,
    api_logger: ApiLogger,
    cancel: CancellationToken,
}

/// Builder for [`CommerceClient`]
#[derive(Debug)]
pub struct CommerceClientBuilder {
    base_url: String,
    token_url: Option<String>,
    credentials: CredentialState,
    legacy: Option<LegacyCredentials>,
    account_id: Option<String>,
    resilience: ResilienceConfig,
    http_client: Option<reqwest::Client>,
    cancel: CancellationToken,
}

impl CommerceClientBuilder {
    /// Token endpoint; defaults to `<base_url>/oauth2/token`
    pub fn token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = Some(token_url.into());
        self
    }

    pub fn legacy_credentials(mut self, legacy: LegacyCredentials) -> Self {
        self.legacy = Some(legacy);
        self
    }

    /// Account reported in error context
    pub fn account_id(mut self, account_id: impl Into<String>) -> Self {
        self.account_id = Some(account_id.into());
        self
    }

    pub fn resilience(mut self, resilience: ResilienceConfig) -> Self {
        self.resilience = resilience;
        self
    }

    pub fn http_client(mut self, http_client: reqwest::Client) -> Self {
        self.http_client = Some(http_client);
        self
    }

    /// Token that aborts every wait and in-flight request of the client
    pub fn cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn build(self) -> ApiResult<CommerceClient> {
        let http_client = match self.http_client {
            Some(client) => client,
            None => reqwest::Client::builder()
                .pool_max_idle_per_host(10)
                .pool_idle_timeout(Duration::from_secs(90))
                .connect_timeout(Duration::from_secs(10))
                .user_agent(concat!("commerce-client/", env!("CARGO_PKG_VERSION")))
                .build()
                .map_err(|e| ApiError::Network(format!("failed to build HTTP client: {}", e)))?,
        };

        let resilience = self.resilience;
        let cancel = self.cancel;
        let token_url = self
            .token_url
            .unwrap_or_else(|| constants::token_endpoint(&self.base_url));

        let mut credentials =
            CredentialManager::new(http_client.clone(), token_url, self.credentials)
                .with_timeout(resilience.timeouts.get(OperationKind::Token))
                .with_cancellation(cancel.clone());
        if let Some(legacy) = self.legacy {
            credentials = credentials.with_legacy_credentials(legacy);
        }

        Ok(CommerceClient {
            base_url: self.base_url,
            account_id: self.account_id,
            http_client,
            credentials: Arc::new(credentials),
            single_limiter: RateLimiter::new("single", resilience.single_limit.clone())
                .with_cancellation(cancel.clone()),
            batch_limiter: RateLimiter::new("batch", resilience.batch_limit.clone())
                .with_cancellation(cancel.clone()),
            read_retry: RetryPolicy::new(resilience.read_retry.clone())
                .with_cancellation(cancel.clone()),
            write_retry: RetryPolicy::new(resilience.write_retry.clone())
                .with_cancellation(cancel.clone()),
            ceiling: Arc::new(BatchCeiling::new(&resilience.batch)),
            api_logger: ApiLogger::new(resilience.monitoring.clone()),
            config: Arc::new(resilience),
            cancel,
        })
    }
}

/// Body of one outgoing request
#[derive(Debug, Clone)]
enum RequestBody {
    Empty,
    Json(Value),
    Raw { content_type: String, body: String },
}

/// Everything needed to send (and resend) one request
struct CallSpec<'a> {
    kind: OperationKind,
    method: Method,
    url: String,
    body: RequestBody,
    limiter: Option<&'a RateLimiter>,
    retry: &'a RetryPolicy,
    /// Send the bearer header and handle 401s
    authenticated: bool,
    /// Also pass the token as `?access_token=`
    token_in_query: bool,
}

/// Successful response, fully read
#[derive(Debug)]
struct RawResponse {
    status: u16,
    content_type: Option<String>,
    body: Vec<u8>,
}

impl RawResponse {
    fn text(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    fn json<T: DeserializeOwned>(&self) -> ApiResult<T> {
        serde_json::from_slice(&self.body).map_err(|e| ApiError::unparsable(self.status, e))
    }

    /// `None` for an empty body
    fn json_opt<T: DeserializeOwned>(&self) -> ApiResult<Option<T>> {
        if self.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        self.json().map(Some)
    }
}

impl CommerceClient {
    pub fn builder(base_url: impl Into<String>, credentials: CredentialState) -> CommerceClientBuilder {
        CommerceClientBuilder {
            base_url: base_url.into(),
            token_url: None,
            credentials,
            legacy: None,
            account_id: None,
            resilience: ResilienceConfig::default(),
            http_client: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn credentials(&self) -> &Arc<CredentialManager> {
        &self.credentials
    }

    pub fn config(&self) -> &ResilienceConfig {
        &self.config
    }

    /// Current batch-size ceiling
    pub fn batch_ceiling(&self) -> usize {
        self.ceiling.current()
    }

    pub fn single_limiter_stats(&self) -> RateLimiterStats {
        self.single_limiter.stats()
    }

    pub fn batch_limiter_stats(&self) -> RateLimiterStats {
        self.batch_limiter.stats()
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Cancel every pending and future call of this client and its clones
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Absolute URLs pass through; anything else is a resource path under `/v1`
    fn resolve_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            constants::resource_endpoint(&self.base_url, path)
        }
    }

    fn call_context(&self, url: &str) -> CallContext {
        let redacted = redact_url(url);
        let (endpoint, parameters) = match redacted.split_once('?') {
            Some((endpoint, query)) => (endpoint.to_string(), Some(query.to_string())),
            None => (redacted, None),
        };
        CallContext {
            endpoint,
            parameters,
            account: self.account_id.clone(),
        }
    }

    /// Log completion and attach call context to a failure
    fn finish<T>(&self, context: &OperationContext, url: &str, result: ApiResult<T>) -> ApiResult<T> {
        let error = result.as_ref().err().map(ToString::to_string);
        self.api_logger.complete_operation(context, error.as_deref());
        result.map_err(|e| e.with_context(self.call_context(url)))
    }

    fn single_call(&self, kind: OperationKind, method: Method, url: String, body: RequestBody) -> CallSpec<'_> {
        let mutating = method != Method::GET;
        CallSpec {
            kind,
            method,
            url,
            body,
            limiter: Some(&self.single_limiter),
            retry: if mutating { &self.write_retry } else { &self.read_retry },
            authenticated: true,
            token_in_query: mutating,
        }
    }

    /// GET a single entity or document
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        let url = self.resolve_url(path);
        let context = self.api_logger.start_operation(OperationKind::Single, &url);
        let spec = self.single_call(OperationKind::Single, Method::GET, url.clone(), RequestBody::Empty);

        let result = async { self.call(&context, &spec).await?.json::<T>() }.await;
        self.finish(&context, &url, result)
    }

    /// POST a JSON payload; `None` when the server returns no body
    pub async fn post_json<T: DeserializeOwned>(&self, path: &str, payload: &Value) -> ApiResult<Option<T>> {
        self.write_json(Method::POST, path, payload).await
    }

    /// PUT a JSON payload; `None` when the server returns no body
    pub async fn put_json<T: DeserializeOwned>(&self, path: &str, payload: &Value) -> ApiResult<Option<T>> {
        self.write_json(Method::PUT, path, payload).await
    }

    async fn write_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        payload: &Value,
    ) -> ApiResult<Option<T>> {
        let url = self.resolve_url(path);
        let context = self.api_logger.start_operation(OperationKind::Single, &url);
        let spec = self.single_call(
            OperationKind::Single,
            method,
            url.clone(),
            RequestBody::Json(payload.clone()),
        );

        let result = async { self.call(&context, &spec).await?.json_opt::<T>() }.await;
        self.finish(&context, &url, result)
    }

    /// Fetch one collection page by URL
    async fn get_page<T: DeserializeOwned>(&self, url: String) -> ApiResult<QueryResponse<T>> {
        let context = self.api_logger.start_operation(OperationKind::Page, &url);
        let spec = self.single_call(OperationKind::Page, Method::GET, url.clone(), RequestBody::Empty);

        let result = async {
            let response = self.call(&context, &spec).await?;
            QueryResponse::<T>::from_json(response.status, &response.text())
        }
        .await;
        self.finish(&context, &url, result)
    }

    /// Fetch every page of a collection, merged in page order
    pub async fn fetch_all<T: DeserializeOwned>(
        &self,
        path: &str,
        page_size: Option<usize>,
    ) -> ApiResult<PagedResult<T>> {
        let url = self.resolve_url(path);
        paging::fetch_all(&url, page_size, self.config.paging.page_fan_out, |page_url| {
            self.get_page(page_url)
        })
        .await
    }

    /// Fetch a single page; pages past the end come back empty
    pub async fn fetch_page<T: DeserializeOwned>(
        &self,
        path: &str,
        page_number: usize,
        page_size: Option<usize>,
    ) -> ApiResult<PagedResult<T>> {
        let url = self.resolve_url(path);
        let page_size = page_size.unwrap_or(self.config.paging.default_page_size);
        paging::fetch_page(&url, page_number, page_size, |page_url| self.get_page(page_url)).await
    }

    /// Send a batch, split to the current ceiling
    ///
    /// Each chunk is cut from the batch with the ceiling read at send time, so
    /// a chunk with a throttled part is resent at the shrunk size and the
    /// following chunks stay smaller. Parts come back in request order.
    pub async fn execute_batch(&self, batch: &BatchBuilder) -> ApiResult<BatchResponse> {
        let url = constants::batch_endpoint(&self.base_url);
        if batch.is_empty() {
            return Ok(BatchResponse::new(Vec::new()));
        }

        let context = self.api_logger.start_operation(OperationKind::Batch, &url);
        let mutating = batch.parts().iter().any(|part| part.method.is_mutating());
        let retry = if mutating { &self.write_retry } else { &self.read_retry };

        let result = async {
            let mut items = Vec::with_capacity(batch.len());

            while items.len() < batch.len() {
                let offset = items.len();
                let refreshed = AtomicBool::new(false);
                let mut attempt = 0;

                let chunk_items = retry
                    .execute(
                        || {
                            attempt += 1;
                            let chunk = batch.chunk(offset, self.ceiling.current());
                            self.send_chunk(&context, &url, chunk, retry, attempt, &refreshed)
                        },
                        |error, delay, attempt| {
                            self.api_logger
                                .log_retry(&context, attempt, &error.to_string(), delay)
                        },
                    )
                    .await?;
                items.extend(chunk_items);
            }

            Ok(BatchResponse::new(items))
        }
        .await;

        self.finish(&context, &url, result)
    }

    /// Post one chunk; a throttled part shrinks the ceiling and fails the chunk
    async fn send_chunk(
        &self,
        context: &OperationContext,
        url: &str,
        chunk: BatchBuilder,
        retry: &RetryPolicy,
        attempt: u32,
        refreshed: &AtomicBool,
    ) -> ApiResult<Vec<BatchResponseItem>> {
        let request = chunk.build();
        let spec = CallSpec {
            kind: OperationKind::Batch,
            method: Method::POST,
            url: url.to_string(),
            body: RequestBody::Raw {
                content_type: request.content_type,
                body: request.body,
            },
            limiter: Some(&self.batch_limiter),
            retry,
            authenticated: true,
            token_in_query: true,
        };

        let response = self.attempt(context, &spec, attempt, refreshed).await?;
        let parsed = BatchResponseParser::parse_for(
            &response.text(),
            response.content_type.as_deref(),
            chunk.parts(),
        )?;

        self.api_logger.log_batch_chunk(context, chunk.len(), parsed.status);
        if parsed.status == 429 {
            self.shrink_ceiling(context);
            return Err(ApiError::Throttled {
                status: 429,
                message: "batch part throttled".into(),
            });
        }

        Ok(parsed.items)
    }

    fn shrink_ceiling(&self, context: &OperationContext) {
        let (from, to) = self.ceiling.shrink();
        if from != to {
            self.api_logger.log_ceiling_shrink(context, from, to);
        }
    }

    /// Resolve keys to identifiers, by bulk export or by batched lookups
    ///
    /// Keys are matched case-insensitively and returned lowercased. Keys that
    /// do not exist are absent from the result.
    pub async fn resolve_keys(
        &self,
        resource: &str,
        key_field: &str,
        id_field: &str,
        keys: &[String],
    ) -> ApiResult<HashMap<String, String>> {
        // Lowercased key -> key as given, which is what the lookup filters use
        let wanted: HashMap<String, String> = keys
            .iter()
            .map(|key| key.trim())
            .filter(|key| !key.is_empty())
            .map(|key| (key.to_lowercase(), key.to_string()))
            .collect();
        if wanted.is_empty() {
            return Ok(HashMap::new());
        }

        let strategy = export::strategy::choose(wanted.len(), self.ceiling.max(), &self.config.export);
        if strategy == LookupStrategy::Export {
            match self.export_keys(resource, key_field, id_field).await {
                Ok(mut mapping) => {
                    mapping.retain(|key, _| wanted.contains_key(key));
                    return Ok(mapping);
                }
                Err(error) if error.is_export_unavailable() => {
                    warn!("Export unavailable for {}, falling back to lookups: {}", resource, error);
                }
                Err(error) => return Err(error),
            }
        }

        self.lookup_keys(resource, key_field, id_field, wanted.into_values().collect())
            .await
    }

    /// Batched `$filter` lookups, one part per key, filtering on the key as given
    async fn lookup_keys(
        &self,
        resource: &str,
        key_field: &str,
        id_field: &str,
        keys: Vec<String>,
    ) -> ApiResult<HashMap<String, String>> {
        let pairs = paging::process_with_pages(
            keys,
            self.ceiling.max(),
            self.config.paging.process_fan_out,
            |page| self.lookup_page(resource, key_field, id_field, page),
        )
        .await?;

        Ok(pairs.into_iter().collect())
    }

    async fn lookup_page(
        &self,
        resource: &str,
        key_field: &str,
        id_field: &str,
        keys: Vec<String>,
    ) -> ApiResult<Vec<(String, String)>> {
        let collection = constants::resource_endpoint(&self.base_url, resource);
        let batch = keys.iter().fold(BatchBuilder::new(), |batch, key| {
            batch.add_get(with_query(
                &collection,
                &[
                    (
                        odata::FILTER,
                        format!("{} eq '{}'", key_field, key.replace('\'', "''")),
                    ),
                    (odata::SELECT, format!("{},{}", key_field, id_field)),
                ],
            ))
        });

        let response = self.execute_batch(&batch).await?;
        let mut pairs = Vec::new();
        for part in response.decode::<QueryResponse<Value>>()? {
            if part.status == 404 {
                continue;
            }
            if !part.is_success() {
                let error = ApiError::from_status(part.status, part.error.unwrap_or_default())
                    .unwrap_or_else(|| ApiError::unparsable(part.status, "batch part"));
                return Err(error.with_context(self.call_context(&collection)));
            }
            for row in part.value.map(|page| page.value).unwrap_or_default() {
                if let (Some(key), Some(id)) = (field_string(&row, key_field), field_string(&row, id_field)) {
                    pairs.push((key.to_lowercase(), id));
                }
            }
        }
        Ok(pairs)
    }

    /// Run a bulk export of `resource` and map lowercased keys to identifiers
    pub async fn export_keys(
        &self,
        resource: &str,
        key_field: &str,
        id_field: &str,
    ) -> ApiResult<HashMap<String, String>> {
        let url = constants::export_endpoint(&self.base_url, resource);
        let context = self.api_logger.start_operation(OperationKind::ExportRequest, &url);

        let result = async {
            let job = self.request_export(&context, &url, key_field, id_field).await?;
            job.ensure_progressing()?;

            let file_url = match job.file_url() {
                Some(file_url) => file_url.to_string(),
                None => {
                    let token = job.token().ok_or_else(|| {
                        ApiError::ExportUnavailable("export job returned no token".into())
                    })?;
                    info!("Export job {} accepted, polling for its file", token);
                    export::poll_until_ready(
                        self.config.export.poll_interval,
                        self.config.export.max_polls,
                        &self.cancel,
                        || self.poll_export(&context, &url, token),
                    )
                    .await?
                }
            };

            let archive = self.download(&context, &file_url).await?;
            export::parse_export_archive(&archive, key_field, id_field)
        }
        .await;

        self.finish(&context, &url, result)
    }

    /// Request the export; a 400, 429 or 500 means no export is available
    async fn request_export(
        &self,
        context: &OperationContext,
        url: &str,
        key_field: &str,
        id_field: &str,
    ) -> ApiResult<ExportJob> {
        let no_retry = RetryPolicy::new(RetryConfig::none()).with_cancellation(self.cancel.clone());
        let body = serde_json::to_value(ExportRequest::tab_delimited([key_field, id_field]))
            .map_err(|e| ApiError::ExportUnavailable(format!("export request: {}", e)))?;
        let spec = CallSpec {
            retry: &no_retry,
            ..self.single_call(OperationKind::ExportRequest, Method::POST, url.to_string(), RequestBody::Json(body))
        };

        let response = self.call(context, &spec).await.map_err(|error| match error.status() {
            Some(400 | 429 | 500) => ApiError::ExportUnavailable(error.to_string()),
            _ => error,
        })?;
        response
            .json()
            .map_err(|e| ApiError::ExportUnavailable(format!("export job unreadable: {}", e)))
    }

    /// Poll the job; an HTTP failure that outlives the retries ends the export
    async fn poll_export(&self, context: &OperationContext, url: &str, token: &str) -> ApiResult<ExportJob> {
        let poll_url = with_query(url, &[("token", token.to_string())]);
        let spec = self.single_call(OperationKind::ExportPoll, Method::GET, poll_url, RequestBody::Empty);

        let response = self.call(context, &spec).await.map_err(|error| match error.status() {
            Some(status) if status != 401 => {
                ApiError::ExportUnavailable(format!("export poll failed (HTTP {}): {}", status, error))
            }
            _ => error,
        })?;
        response
            .json()
            .map_err(|e| ApiError::ExportUnavailable(format!("export status unreadable: {}", e)))
    }

    /// Download the export file; the URL is pre-signed so no credentials are sent
    async fn download(&self, context: &OperationContext, file_url: &str) -> ApiResult<Vec<u8>> {
        let spec = CallSpec {
            kind: OperationKind::Download,
            method: Method::GET,
            url: file_url.to_string(),
            body: RequestBody::Empty,
            limiter: None,
            retry: &self.read_retry,
            authenticated: false,
            token_in_query: false,
        };
        Ok(self.call(context, &spec).await?.body)
    }

    /// Send `spec` under its retry policy
    async fn call(&self, context: &OperationContext, spec: &CallSpec<'_>) -> ApiResult<RawResponse> {
        let refreshed = AtomicBool::new(false);
        let mut attempt = 0;

        spec.retry
            .execute(
                || {
                    attempt += 1;
                    self.attempt(context, spec, attempt, &refreshed)
                },
                |error, delay, attempt| {
                    self.api_logger
                        .log_retry(context, attempt, &error.to_string(), delay)
                },
            )
            .await
            .map_err(|error| match error {
                ApiError::TokenExpired => {
                    ApiError::Unauthorized("access token rejected after refresh".into())
                }
                other => other,
            })
    }

    /// One round trip: admission, send, status classification
    async fn attempt(
        &self,
        context: &OperationContext,
        spec: &CallSpec<'_>,
        attempt: u32,
        refreshed: &AtomicBool,
    ) -> ApiResult<RawResponse> {
        if spec.authenticated && self.credentials.needs_refresh() {
            debug!("Access token expired, refreshing before send");
            let seen = self.credentials.access_token();
            self.credentials.refresh_if_stale(&seen).await?;
        }

        let token = self.credentials.access_token();
        let url = if spec.token_in_query {
            with_query(&spec.url, &[(constants::ACCESS_TOKEN_PARAM, token.clone())])
        } else {
            spec.url.clone()
        };

        let permit = match spec.limiter {
            Some(limiter) => Some(limiter.acquire().await?),
            None => None,
        };

        let mut request = self
            .http_client
            .request(spec.method.clone(), &url)
            .timeout(self.config.timeouts.get(spec.kind));
        if spec.authenticated {
            request = request.header(AUTHORIZATION, format!("Bearer {}", token));
        }
        if !context.correlation_id.is_empty() {
            request = request.header(headers::X_CORRELATION_ID, &context.correlation_id);
        }
        request = match &spec.body {
            RequestBody::Empty => request,
            RequestBody::Json(payload) => request.json(payload),
            RequestBody::Raw { content_type, body } => request
                .header(CONTENT_TYPE, content_type.as_str())
                .body(body.clone()),
        };

        self.api_logger.log_request(context, spec.method.as_str(), attempt);
        let started = Instant::now();
        let exchange = async {
            let response = request.send().await?;
            let status = response.status().as_u16();
            let content_type = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string);
            let body = response.bytes().await?;
            Ok::<_, ApiError>(RawResponse {
                status,
                content_type,
                body: body.to_vec(),
            })
        };

        let response = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(ApiError::Cancelled),
            response = exchange => response?,
        };
        drop(permit);
        self.api_logger.log_response(context, response.status, started.elapsed());

        if spec.authenticated && response.status == 401 {
            if refreshed.swap(true, Ordering::SeqCst) {
                return Err(ApiError::Unauthorized(
                    "access token rejected after refresh".into(),
                ));
            }
            self.credentials.refresh_if_stale(&token).await?;
            return Err(ApiError::TokenExpired);
        }

        if !(200..300).contains(&response.status) {
            if spec.kind == OperationKind::Batch && response.status == 429 {
                self.shrink_ceiling(context);
            }
            let message = extract_error_message(Some(response.text().as_ref())).unwrap_or_default();
            if let Some(error) = ApiError::from_status(response.status, message) {
                return Err(error);
            }
        }

        Ok(response)
    }
}

/// Field of a JSON row as a string, whatever its JSON type
fn field_string(row: &Value, field: &str) -> Option<String> {
    let value = row
        .get(field)
        .or_else(|| {
            row.as_object()?
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(field))
                .map(|(_, value)| value)
        })?;
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
