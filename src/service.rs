use {
    crate::{SignedUrlConfig, SignedUrlError, SingleUseToken, UrlParts, Verifier},
    async_trait::async_trait,
    http::{request::Parts, status::StatusCode, Request, Response},
    log::debug,
    scratchstack_errors::ServiceError,
    std::{
        any::type_name,
        fmt::{Debug, Formatter, Result as FmtResult},
        future::Future,
        pin::Pin,
        sync::Arc,
        task::{Context, Poll},
    },
    tower::{BoxError, Service, ServiceExt},
};

/// Extracts the caller's current single-use token for a request, if the route expects one.
pub type TokenExtractor = Arc<dyn Fn(&Parts) -> Option<SingleUseToken> + Send + Sync>;

/// Request extension inserted by [`SignedUrlVerifierService`] when a request passes verification.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VerifiedUrl(pub UrlParts);

/// SignedUrlVerifierService implements a Tower service that rejects requests whose URL signature,
/// expiration, or single-use token does not verify.
#[derive(Clone)]
pub struct SignedUrlVerifierService<S, E> {
    verifier: Verifier,
    route_verification: bool,
    default_scheme: String,
    token_extractor: Option<TokenExtractor>,
    implementation: S,
    error_handler: E,
}

impl<S, E> SignedUrlVerifierService<S, E> {
    /// Wrap `implementation` with the verification settings from `config`.
    pub fn new(config: &SignedUrlConfig, implementation: S, error_handler: E) -> Self {
        SignedUrlVerifierService {
            verifier: config.verifier(),
            route_verification: config.route_verification(),
            default_scheme: config.default_scheme().to_string(),
            token_extractor: None,
            implementation,
            error_handler,
        }
    }

    /// Install the function used to obtain the current single-use token for a request. Without
    /// one, every request is verified as if no token were supplied.
    pub fn with_token_extractor<F>(mut self, extractor: F) -> Self
    where
        F: Fn(&Parts) -> Option<SingleUseToken> + Send + Sync + 'static,
    {
        self.token_extractor = Some(Arc::new(extractor));
        self
    }
}

impl<S, E> Debug for SignedUrlVerifierService<S, E> {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        f.debug_struct("SignedUrlVerifierService")
            .field("route_verification", &self.route_verification)
            .field("default_scheme", &self.default_scheme)
            .field("token_extractor", &self.token_extractor.is_some())
            .field("implementation", &type_name::<S>())
            .field("error_handler", &type_name::<E>())
            .finish()
    }
}

impl<ReqB, ResB, S, E> Service<Request<ReqB>> for SignedUrlVerifierService<S, E>
where
    ReqB: Send + 'static,
    ResB: Send + 'static,
    S: Service<Request<ReqB>, Response = Response<ResB>, Error = BoxError> + Clone + Send + 'static,
    S::Future: Send,
    E: ErrorMapper<ResB>,
{
    type Response = S::Response;
    type Error = BoxError;
    type Future = Pin<Box<dyn Future<Output = Result<Response<ResB>, BoxError>> + Send>>;

    fn poll_ready(&mut self, c: &mut Context) -> Poll<Result<(), Self::Error>> {
        self.implementation.poll_ready(c)
    }

    fn call(&mut self, req: Request<ReqB>) -> Self::Future {
        let implementation = self.implementation.clone();

        if !self.route_verification {
            return Box::pin(implementation.oneshot(req));
        }

        Box::pin(handle_call(
            req,
            self.verifier.clone(),
            self.default_scheme.clone(),
            self.token_extractor.clone(),
            implementation,
            self.error_handler.clone(),
        ))
    }
}

async fn handle_call<ReqB, ResB, S, E>(
    req: Request<ReqB>,
    verifier: Verifier,
    default_scheme: String,
    token_extractor: Option<TokenExtractor>,
    implementation: S,
    error_handler: E,
) -> Result<Response<ResB>, BoxError>
where
    ReqB: Send + 'static,
    ResB: Send + 'static,
    S: Service<Request<ReqB>, Response = Response<ResB>, Error = BoxError> + Clone + Send + 'static,
    S::Future: Send,
    E: ErrorMapper<ResB>,
{
    let (mut parts, body) = req.into_parts();
    let url = UrlParts::from_request_parts(&parts, &default_scheme);
    let token = token_extractor.as_ref().and_then(|extract| extract(&parts));

    match verifier.verify(&url, token) {
        Ok(()) => {
            parts.extensions.insert(VerifiedUrl(url));
            implementation.oneshot(Request::from_parts(parts, body)).await
        }
        Err(e) if e.is_invalid_signature() => {
            debug!("Rejecting {} {}: {}: {}", parts.method, url, ServiceError::error_code(&e), e);
            error_handler.map_error(e).await
        }
        Err(e) => Err(e.into()),
    }
}

/// Converts a failed verification into a response.
#[async_trait]
pub trait ErrorMapper<B>: Clone + Send + 'static
where
    B: Send + 'static,
{
    /// Produce the response for a request that failed verification.
    async fn map_error(self, error: SignedUrlError) -> Result<Response<B>, BoxError>;
}

/// An [ErrorMapper] that answers every failed verification with an empty-bodied response carrying
/// a fixed status.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct StatusErrorMapper {
    status: StatusCode,
}

impl StatusErrorMapper {
    /// Create a new `StatusErrorMapper` answering with `status`.
    pub fn new(status: StatusCode) -> Self {
        StatusErrorMapper {
            status,
        }
    }

    /// Retrieve the status.
    #[inline]
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl Default for StatusErrorMapper {
    fn default() -> Self {
        Self::new(StatusCode::FORBIDDEN)
    }
}

#[async_trait]
impl<B> ErrorMapper<B> for StatusErrorMapper
where
    B: Default + Send + 'static,
{
    async fn map_error(self, _error: SignedUrlError) -> Result<Response<B>, BoxError> {
        let mut response = Response::new(B::default());
        *response.status_mut() = self.status;
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use {
        crate::{
            SignOptions, SignedUrlConfig, SignedUrlVerifierService, SigningSecret, SingleUseToken, StatusErrorMapper,
            VerifiedUrl,
        },
        chrono::Duration,
        http::{Request, Response, StatusCode},
        std::str::FromStr,
        tower::{service_fn, BoxError, ServiceExt},
    };

    fn config(route_verification: bool) -> SignedUrlConfig {
        SignedUrlConfig::builder()
            .secret(SigningSecret::from_str("S3CRET").unwrap())
            .route_verification(route_verification)
            .build()
            .unwrap()
    }

    async fn hello_response(req: Request<String>) -> Result<Response<String>, BoxError> {
        let body = match req.extensions().get::<VerifiedUrl>() {
            Some(VerifiedUrl(url)) => format!("verified {}", url.path_info()),
            None => "unverified".to_string(),
        };
        Ok(Response::new(body))
    }

    fn get(uri: &str) -> Request<String> {
        Request::builder().uri(uri).header("host", "example.com").body(String::new()).unwrap()
    }

    /// Strip the scheme and host from an absolute URL to get an origin-form request target.
    fn origin_form(url: &str) -> &str {
        url.strip_prefix("https://example.com").unwrap()
    }

    #[test_log::test(tokio::test)]
    async fn test_verified_request() {
        let config = config(true);
        let signed = config.signer().sign("https://example.com/reset?id=42");
        let svc = SignedUrlVerifierService::new(&config, service_fn(hello_response), config.error_mapper());

        // Make sure we can debug print the verifier service.
        let _ = format!("{:?}", svc);

        let response = svc.clone().oneshot(get(origin_form(&signed))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.body(), "verified /reset");

        // Absolute-form request targets carry their own scheme and host.
        let response = svc.oneshot(get(&signed)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test_log::test(tokio::test)]
    async fn test_rejected_request() {
        let config = config(true);
        let signed = config.signer().sign("https://example.com/reset?id=42");
        let svc = SignedUrlVerifierService::new(&config, service_fn(hello_response), config.error_mapper());

        let tampered = origin_form(&signed).replace("id=42", "id=43");
        let response = svc.clone().oneshot(get(&tampered)).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(response.body(), "");

        let response = svc.clone().oneshot(get("/reset?id=42")).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        // Signed for another host.
        let request = Request::builder()
            .uri(origin_form(&signed))
            .header("host", "example.org")
            .body(String::new())
            .unwrap();
        let response = svc.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test_log::test(tokio::test)]
    async fn test_not_found_status() {
        let config = SignedUrlConfig::builder()
            .secret(SigningSecret::from_str("S3CRET").unwrap())
            .route_verification(true)
            .failure_status(StatusCode::NOT_FOUND)
            .build()
            .unwrap();
        let svc = SignedUrlVerifierService::new(&config, service_fn(hello_response), config.error_mapper());

        let response = svc.oneshot(get("/reset?id=42&_hash=bogus")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test_log::test(tokio::test)]
    async fn test_route_verification_disabled() {
        let config = config(false);
        let svc = SignedUrlVerifierService::new(&config, service_fn(hello_response), StatusErrorMapper::default());

        let response = svc.oneshot(get("/reset?id=42")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.body(), "unverified");
    }

    #[test_log::test(tokio::test)]
    async fn test_token_extractor() {
        let config = config(true);
        let options = SignOptions::builder()
            .expires(Duration::seconds(3600))
            .single_use_token("hash_v1")
            .build()
            .unwrap();
        let signed = config.signer().sign_with("https://example.com/reset?id=42", &options).unwrap();
        let request_target = origin_form(&signed).to_string();

        // Without an extractor, a single-use URL cannot be verified.
        let svc = SignedUrlVerifierService::new(&config, service_fn(hello_response), config.error_mapper());
        let response = svc.oneshot(get(&request_target)).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        // The extractor reads the current token from the request (a real application would look
        // it up from the resource the URL refers to).
        let svc = SignedUrlVerifierService::new(&config, service_fn(hello_response), config.error_mapper())
            .with_token_extractor(|parts| {
                parts.headers.get("x-current-token").and_then(|v| v.to_str().ok()).map(SingleUseToken::from)
            });
        let _ = format!("{:?}", svc);

        let request = Request::builder()
            .uri(&request_target)
            .header("host", "example.com")
            .header("x-current-token", "hash_v1")
            .body(String::new())
            .unwrap();
        let response = svc.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let request = Request::builder()
            .uri(&request_target)
            .header("host", "example.com")
            .header("x-current-token", "hash_v2")
            .body(String::new())
            .unwrap();
        let response = svc.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test_log::test(tokio::test)]
    async fn test_inner_errors_propagate() {
        let config = config(true);
        let signed = config.signer().sign("https://example.com/fail");
        let inner =
            service_fn(|_: Request<String>| async { Err::<Response<String>, BoxError>("inner failure".into()) });
        let svc = SignedUrlVerifierService::new(&config, inner, config.error_mapper());

        let e = svc.oneshot(get(origin_form(&signed))).await.unwrap_err();
        assert_eq!(e.to_string(), "inner failure");
    }

    #[test_log::test]
    fn test_blocking_use() {
        let config = config(true);
        let signed = config.signer().sign("https://example.com/a");
        let svc = SignedUrlVerifierService::new(&config, service_fn(hello_response), config.error_mapper());

        let response = tokio_test::block_on(svc.oneshot(get(origin_form(&signed)))).unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
