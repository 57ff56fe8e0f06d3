//! AWS Signature Version 4 request signing.
//!
//! The provider verifies requests with the SigV4 scheme under a fixed
//! service and region scope. Its router strips the `/api` prefix before
//! reconstructing the canonical request, so the signer signs the stripped
//! path and puts the routed path back afterwards.

use std::ops::{Deref, DerefMut};
use std::time::SystemTime;

use aws_credential_types::Credentials as AwsCredentials;
use aws_sigv4::http_request::{
    sign, SignableBody, SignableRequest, SigningParams, SigningSettings,
};
use aws_sigv4::sign::v4;
use aws_smithy_runtime_api::client::identity::Identity;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderName, HeaderValue};
use reqwest::{Request, Url};
use tracing::debug;

use crate::config::Credentials;
use crate::error::{ApiError, Result};

/// Service token understood by the provider.
pub const DEFAULT_SERVICE: &str = "terraform";

/// Region token understood by the provider.
pub const DEFAULT_REGION: &str = "global";

/// Path prefix removed by the provider's router before verification.
pub const ROUTED_PREFIX: &str = "/api";

/// Name reported as the credentials provider.
const PROVIDER_NAME: &str = "dws";

/// Service and region scope of a signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningScope {
    /// Service token.
    pub service: String,
    /// Region token.
    pub region: String,
}

impl Default for SigningScope {
    fn default() -> Self {
        Self {
            service: String::from(DEFAULT_SERVICE),
            region: String::from(DEFAULT_REGION),
        }
    }
}

/// Signs outgoing requests in place.
#[derive(Debug, Clone)]
pub struct RequestSigner {
    credentials: Credentials,
    scope: SigningScope,
}

impl RequestSigner {
    /// Creates a signer with the provider's default scope.
    #[must_use]
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            scope: SigningScope::default(),
        }
    }

    /// Overrides the signing scope.
    #[must_use]
    pub fn with_scope(mut self, scope: SigningScope) -> Self {
        self.scope = scope;
        self
    }

    /// Whether requests are signed with the anonymous identity.
    #[must_use]
    pub const fn is_anonymous(&self) -> bool {
        self.credentials.is_anonymous()
    }

    /// Signs the request with the current time.
    ///
    /// The request URL is identical before and after the call, whether or not
    /// signing succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the body is not buffered, the URL has no host, or
    /// the signer rejects the request.
    pub fn sign(&self, request: &mut Request) -> Result<()> {
        self.sign_at(request, Utc::now())
    }

    /// Signs the request as of the given time.
    ///
    /// # Errors
    ///
    /// See [`RequestSigner::sign`].
    pub fn sign_at(&self, request: &mut Request, now: DateTime<Utc>) -> Result<()> {
        let mut routed = RoutedRequest::strip(request, ROUTED_PREFIX);
        self.sign_routed(&mut routed, SystemTime::from(now))
    }

    fn sign_routed(&self, request: &mut Request, time: SystemTime) -> Result<()> {
        if request.url().host_str().is_none() {
            return Err(ApiError::signing(format!("URL has no host: {}", request.url())).into());
        }

        let identity: Identity = AwsCredentials::new(
            self.credentials.access_key(),
            self.credentials.secret_key(),
            None,
            None,
            PROVIDER_NAME,
        )
        .into();

        let params: SigningParams<'_> = v4::SigningParams::builder()
            .identity(&identity)
            .region(&self.scope.region)
            .name(&self.scope.service)
            .time(time)
            .settings(SigningSettings::default())
            .build()
            .map_err(|e| ApiError::signing(format!("invalid signing parameters: {e}")))?
            .into();

        let body: &[u8] = match request.body() {
            None => &[],
            Some(body) => body.as_bytes().ok_or_else(|| {
                ApiError::signing("request body is a stream and cannot be digested")
            })?,
        };

        let headers: Vec<(&str, &str)> = request
            .headers()
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str(), v)))
            .collect();

        let signable = SignableRequest::new(
            request.method().as_str(),
            request.url().as_str(),
            headers.into_iter(),
            SignableBody::Bytes(body),
        )
        .map_err(|e| ApiError::signing(e.to_string()))?;

        let (instructions, _signature) = sign(signable, &params)
            .map_err(|e| ApiError::signing(e.to_string()))?
            .into_parts();

        let signed: Vec<(HeaderName, HeaderValue)> = instructions
            .headers()
            .map(|(name, value)| {
                let name = HeaderName::from_bytes(name.as_bytes())
                    .map_err(|e| ApiError::signing(format!("invalid header name: {e}")))?;
                let value = HeaderValue::from_str(value)
                    .map_err(|e| ApiError::signing(format!("invalid header value: {e}")))?;
                Ok((name, value))
            })
            .collect::<std::result::Result<_, ApiError>>()?;

        for (name, value) in signed {
            request.headers_mut().insert(name, value);
        }

        debug!(
            "Signed {} {} (anonymous: {})",
            request.method(),
            request.url().path(),
            self.credentials.is_anonymous()
        );
        Ok(())
    }
}

/// Holds a request with its routed prefix removed; dropping it puts the
/// original URL back.
struct RoutedRequest<'a> {
    request: &'a mut Request,
    original: Url,
}

impl<'a> RoutedRequest<'a> {
    fn strip(request: &'a mut Request, prefix: &str) -> Self {
        let original = request.url().clone();

        if !prefix.is_empty() {
            if let Some(rest) = original.path().strip_prefix(prefix) {
                if rest.is_empty() {
                    request.url_mut().set_path("/");
                } else if rest.starts_with('/') {
                    request.url_mut().set_path(rest);
                }
            }
        }

        Self { request, original }
    }
}

impl Deref for RoutedRequest<'_> {
    type Target = Request;

    fn deref(&self) -> &Request {
        self.request
    }
}

impl DerefMut for RoutedRequest<'_> {
    fn deref_mut(&mut self) -> &mut Request {
        self.request
    }
}

impl Drop for RoutedRequest<'_> {
    fn drop(&mut self) {
        *self.request.url_mut() = self.original.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
    use reqwest::Method;

    fn request(method: Method, url: &str) -> Request {
        Request::new(method, Url::parse(url).expect("valid url"))
    }

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2015, 8, 30, 12, 36, 0).single().expect("valid time")
    }

    fn authorization(request: &Request) -> String {
        request
            .headers()
            .get(AUTHORIZATION)
            .expect("authorization header")
            .to_str()
            .expect("ascii")
            .to_string()
    }

    #[test]
    fn test_reference_vector_get_vanilla() {
        let signer = RequestSigner::new(Credentials::from_keys(
            "AKIDEXAMPLE",
            "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY",
        ))
        .with_scope(SigningScope {
            service: String::from("service"),
            region: String::from("us-east-1"),
        });

        let mut req = request(Method::GET, "https://example.amazonaws.com/");
        signer.sign_at(&mut req, fixed_time()).expect("sign");

        assert_eq!(
            authorization(&req),
            "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20150830/us-east-1/service/aws4_request, \
             SignedHeaders=host;x-amz-date, \
             Signature=5fa00fa31553b73ebf1942676e86291e8372ff2a2260956d9b8aae1d763fbf31"
        );
        assert_eq!(
            req.headers().get("x-amz-date").expect("date header"),
            "20150830T123600Z"
        );
    }

    #[test]
    fn test_routed_path_restored_after_signing() {
        let signer = RequestSigner::new(Credentials::from_keys("AKID", "secret"));
        let url = "https://app.example.com/api/gpu/1234?verbose=true";

        let mut req = request(Method::GET, url);
        signer.sign(&mut req).expect("sign");

        assert_eq!(req.url().as_str(), url);
        assert!(req.headers().contains_key(AUTHORIZATION));
    }

    #[test]
    fn test_signature_covers_stripped_path() {
        let signer = RequestSigner::new(Credentials::from_keys("AKID", "secret"));

        let mut routed = request(Method::GET, "https://app.example.com/api/gpu/1234");
        let mut direct = request(Method::GET, "https://app.example.com/gpu/1234");
        signer.sign_at(&mut routed, fixed_time()).expect("sign");
        signer.sign_at(&mut direct, fixed_time()).expect("sign");

        assert_eq!(authorization(&routed), authorization(&direct));
    }

    #[test]
    fn test_prefix_only_stripped_on_segment_boundary() {
        let mut apix = request(Method::GET, "https://app.example.com/apix/gpu");
        {
            let routed = RoutedRequest::strip(&mut apix, ROUTED_PREFIX);
            assert_eq!(routed.url().path(), "/apix/gpu");
        }

        let mut api = request(Method::GET, "https://app.example.com/api/gpu");
        {
            let routed = RoutedRequest::strip(&mut api, ROUTED_PREFIX);
            assert_eq!(routed.url().path(), "/gpu");
        }
        assert_eq!(api.url().path(), "/api/gpu");
    }

    #[test]
    fn test_path_restored_when_signing_fails() {
        let signer = RequestSigner::new(Credentials::from_keys("AKID", "secret"));

        let mut req = request(Method::GET, "unix:/api/gpu");
        let result = signer.sign(&mut req);

        assert!(result.is_err());
        assert_eq!(req.url().as_str(), "unix:/api/gpu");
    }

    #[test]
    fn test_anonymous_credentials_still_sign() {
        let signer = RequestSigner::new(Credentials::from_keys("", ""));
        assert!(signer.is_anonymous());

        let mut req = request(Method::DELETE, "https://app.example.com/api/gpu/1234");
        signer.sign(&mut req).expect("anonymous signing never fails");

        assert!(authorization(&req).contains("Credential=anonymous/"));
        assert_eq!(req.url().path(), "/api/gpu/1234");
    }

    #[test]
    fn test_body_digest_changes_signature() {
        let signer = RequestSigner::new(Credentials::from_keys("AKID", "secret"));

        let mut first = request(Method::POST, "https://app.example.com/api/gpu");
        *first.body_mut() = Some(reqwest::Body::from(r#"{"gpuCount":1}"#));
        let mut second = request(Method::POST, "https://app.example.com/api/gpu");
        *second.body_mut() = Some(reqwest::Body::from(r#"{"gpuCount":2}"#));

        signer.sign_at(&mut first, fixed_time()).expect("sign");
        signer.sign_at(&mut second, fixed_time()).expect("sign");

        assert_ne!(authorization(&first), authorization(&second));
    }

    #[test]
    fn test_content_type_is_signed() {
        let signer = RequestSigner::new(Credentials::from_keys("AKID", "secret"));

        let mut req = request(Method::POST, "https://app.example.com/api/gpu");
        req.headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        *req.body_mut() = Some(reqwest::Body::from("{}"));
        signer.sign(&mut req).expect("sign");

        assert!(authorization(&req).contains("SignedHeaders=content-type;host;x-amz-date"));
    }

    #[test]
    fn test_port_is_part_of_signature() {
        let signer = RequestSigner::new(Credentials::anonymous());

        let mut first = request(Method::GET, "http://127.0.0.1:8080/api/gpu");
        let mut second = request(Method::GET, "http://127.0.0.1:8081/api/gpu");
        signer.sign_at(&mut first, fixed_time()).expect("sign");
        signer.sign_at(&mut second, fixed_time()).expect("sign");

        assert_ne!(authorization(&first), authorization(&second));
        assert_eq!(first.url().as_str(), "http://127.0.0.1:8080/api/gpu");
    }

    #[test]
    fn test_encoded_id_signs_and_keeps_url() {
        let signer = RequestSigner::new(Credentials::from_keys("AKID", "secret"));
        let url = "https://app.example.com/api/gpu/..%2Fdeployment%2Fdep-1";

        let mut req = request(Method::DELETE, url);
        signer.sign(&mut req).expect("sign");

        assert_eq!(req.url().as_str(), url);
        assert!(authorization(&req).starts_with("AWS4-HMAC-SHA256 Credential=AKID/"));
    }
}
