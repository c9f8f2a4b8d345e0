//! Request preparation.

use bytes::Bytes;
use http::header::{ACCEPT, CONTENT_TYPE, USER_AGENT};
use url::Url;

use crate::call::validate_endpoint;
use crate::{Call, ContentType, EffectiveConfig, Encoded, Error, Request, Result, encode};

/// Header carrying the pinned API version.
pub const API_VERSION_HEADER: &str = "API-Version";

/// Header carrying the connected account.
pub const ACCOUNT_HEADER: &str = "Account";

/// Header carrying the idempotency key of a call.
pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

const USER_AGENT_VALUE: &str = concat!("paywire/", env!("CARGO_PKG_VERSION"));

/// Build the outbound request of a call.
///
/// Headers are layered in this order, later layers replacing earlier ones
/// of the same name (ignoring case): basic auth and base headers, API
/// version and account when resolved, idempotency key, content type, then
/// the caller's headers.
///
/// The endpoint's segments are appended beneath the base URL path, so the
/// request never targets another host or a parent path.
///
/// # Errors
///
/// - [`crate::Error::InvalidCall`] if the endpoint is not a relative path
/// - [`crate::Error::InvalidUrl`] if the base URL cannot carry a path
pub fn prepare(call: &Call, config: &EffectiveConfig) -> Result<Request<Bytes>> {
    let url = endpoint_url(config.base_url(), &call.endpoint)?;
    let client = &call.options.client_options;

    let mut builder = Request::builder(call.method, url)
        .basic_auth(config.token(), "")
        .header(ACCEPT.as_str(), ContentType::Json.as_str())
        .header(USER_AGENT.as_str(), USER_AGENT_VALUE);

    if let Some(api_version) = config.api_version() {
        builder = builder.header(API_VERSION_HEADER, api_version);
    }
    if let Some(account) = config.account() {
        builder = builder.header(ACCOUNT_HEADER, account);
    }
    if let Some(key) = &client.idempotency_key {
        builder = builder.header(IDEMPOTENCY_KEY_HEADER, key.as_str());
    }

    builder = match encode(call.method, &call.options.params) {
        Encoded::Query(pairs) => builder.query_pairs(pairs),
        Encoded::Body(body) => builder
            .header(CONTENT_TYPE.as_str(), ContentType::FormUrlEncoded.as_str())
            .body(body),
    };

    builder = builder.headers(client.headers.clone());
    if let Some(timeout) = client.timeout {
        builder = builder.timeout(timeout);
    }

    Ok(builder.build())
}

fn endpoint_url(base_url: &Url, endpoint: &str) -> Result<Url> {
    validate_endpoint(endpoint)?;

    let mut url = base_url.clone();
    url.path_segments_mut()
        .map_err(|()| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
        .pop_if_empty()
        .extend(endpoint.trim_start_matches('/').split('/'));

    if !url.path().starts_with(base_url.path().trim_end_matches('/')) {
        return Err(Error::invalid_call(format!(
            "endpoint must be relative to the base URL: {endpoint}"
        )));
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use assert2::{check, let_assert};

    use super::*;
    use crate::{CallOptions, Method, Params};

    fn config() -> EffectiveConfig {
        let base_url = Url::parse("https://api.example.com/v1/").expect("url");
        EffectiveConfig::new("sk_test_123", base_url)
    }

    #[test]
    fn get_places_params_in_query() {
        let call = Call::get("customers").options(
            CallOptions::new()
                .param("limit", 3)
                .param("created", Params::new().with("gte", 1_700_000_000)),
        );

        let request = prepare(&call, &config()).expect("prepared");

        check!(request.method() == Method::Get);
        check!(
            request.url().as_str()
                == "https://api.example.com/v1/customers?created%5Bgte%5D=1700000000&limit=3"
        );
        check!(request.body().is_none());
        check!(request.header("content-type").is_none());
    }

    #[test]
    fn post_places_params_in_form_body() {
        let call = Call::post("/charges").options(
            CallOptions::new()
                .param("amount", 2000)
                .param("currency", "usd"),
        );

        let request = prepare(&call, &config()).expect("prepared");

        check!(request.url().as_str() == "https://api.example.com/v1/charges");
        check!(request.header("Content-Type") == Some("application/x-www-form-urlencoded"));
        check!(request.body() == Some(&Bytes::from_static(b"amount=2000&currency=usd")));
    }

    #[test]
    fn delete_without_params_has_clean_url() {
        let request = prepare(&Call::delete("customers/cus_1"), &config()).expect("prepared");
        check!(request.url().as_str() == "https://api.example.com/v1/customers/cus_1");
        check!(request.body().is_none());
    }

    #[test]
    fn base_headers_and_auth() {
        let request = prepare(&Call::get("balance"), &config()).expect("prepared");

        check!(request.header("Authorization") == Some("Basic c2tfdGVzdF8xMjM6"));
        check!(request.header("Accept") == Some("application/json"));
        check!(request.header("User-Agent").is_some_and(|ua| ua.starts_with("paywire/")));
        check!(request.header(API_VERSION_HEADER).is_none());
        check!(request.header(ACCOUNT_HEADER).is_none());
        check!(request.timeout().is_none());
    }

    #[test]
    fn resolved_version_and_account_become_headers() {
        let config = config()
            .with_api_version("2024-06-20")
            .with_account("acct_123");

        let request = prepare(&Call::get("balance"), &config).expect("prepared");

        check!(request.header("api-version") == Some("2024-06-20"));
        check!(request.header("account") == Some("acct_123"));
    }

    #[test]
    fn caller_options_are_applied_last() {
        let call = Call::post("refunds").options(
            CallOptions::new()
                .header("accept", "application/vnd.example+json")
                .header("X-Trace", "t-1")
                .idempotency_key("refund-42")
                .timeout(Duration::from_secs(3)),
        );

        let request = prepare(&call, &config()).expect("prepared");

        check!(request.header("Accept") == Some("application/vnd.example+json"));
        check!(request.header("x-trace") == Some("t-1"));
        check!(request.header("Idempotency-Key") == Some("refund-42"));
        check!(request.timeout() == Some(Duration::from_secs(3)));
        check!(request.headers().keys().filter(|k| k.eq_ignore_ascii_case("accept")).count() == 1);
    }

    #[test]
    fn endpoints_join_under_base_path() {
        let base_url = Url::parse("http://localhost:12111/v1").expect("url");
        let config = EffectiveConfig::new("sk", base_url);

        let request = prepare(&Call::get("customers/cus_1"), &config).expect("prepared");
        check!(request.url().as_str() == "http://localhost:12111/v1/customers/cus_1");
    }

    #[test]
    fn endpoint_cannot_replace_the_base_url() {
        let_assert!(
            Err(Error::InvalidCall(message)) =
                prepare(&Call::get("http:evil.example.com/steal"), &config())
        );
        check!(message.starts_with("endpoint must be relative"));

        let_assert!(Err(Error::InvalidCall(_)) = prepare(&Call::get("x:y"), &config()));
    }

    #[test]
    fn endpoint_cannot_climb_out_of_the_base_path() {
        let_assert!(
            Err(Error::InvalidCall(message)) =
                prepare(&Call::get("customers/../../evil"), &config())
        );
        check!(message.contains("dot segment"));
    }

    #[test]
    fn endpoint_segments_are_percent_encoded() {
        let request = prepare(&Call::get("customers/cus%1/sources/card:visa"), &config())
            .expect("prepared");
        check!(
            request.url().as_str() == "https://api.example.com/v1/customers/cus%251/sources/card:visa"
        );
        check!(request.url().host_str() == Some("api.example.com"));
    }
}
