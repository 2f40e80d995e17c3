// Token refresh logic

use bytes::Bytes;
use chrono::Utc;
use reqwest::header::{HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::Method;

use super::credentials::Credentials;
use super::types::{ClientCredentialsResponse, TokenRecord};
use crate::error::{ApiError, ClientError, TransportError};
use crate::scope::OperationScope;
use crate::transport::{Transport, TransportRequest};

/// Default path of the token endpoint, relative to the API base URL
pub const DEFAULT_TOKEN_PATH: &str = "/oauth/token";

const GRANT_BODY: &str = "grant_type=client_credentials";

/// Build the client-credentials grant request
pub fn build_grant_request(
    credentials: &Credentials,
    token_path: &str,
    user_agent: &str,
) -> Result<TransportRequest, ClientError> {
    let mut request = TransportRequest::new(Method::POST, token_path);

    let authorization = HeaderValue::from_str(&credentials.basic_authorization())
        .map_err(|e| ClientError::Config(format!("Invalid client credentials: {}", e)))?;
    let user_agent = HeaderValue::from_str(user_agent)
        .map_err(|e| TransportError::InvalidRequest(format!("Invalid user agent: {}", e)))?;

    request.headers.insert(AUTHORIZATION, authorization);
    request.headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static("application/x-www-form-urlencoded"),
    );
    request
        .headers
        .insert(ACCEPT, HeaderValue::from_static("application/json"));
    request.headers.insert(USER_AGENT, user_agent);
    request.body = Some(Bytes::from_static(GRANT_BODY.as_bytes()));

    Ok(request)
}

/// Run the client-credentials grant through `transport`
///
/// Fails fast without any network call if `scope` is already done.
pub async fn refresh_client_credentials(
    transport: &dyn Transport,
    scope: &OperationScope,
    credentials: &Credentials,
    token_path: &str,
    user_agent: &str,
) -> Result<TokenRecord, ClientError> {
    scope.check()?;

    tracing::info!(
        client_id = %credentials.client_id(),
        token_path = %token_path,
        "Refreshing access token via client credentials grant"
    );

    let request = build_grant_request(credentials, token_path, user_agent)?;
    let obtained_at = Utc::now();

    let response = scope.run(transport.send(scope, request)).await??;

    if !response.is_success() {
        let err = ApiError::from_response(response.status.as_u16(), &response.body);
        tracing::error!(
            status = err.status,
            message = %err.message,
            "Token refresh rejected"
        );
        return Err(err.into());
    }

    let data: ClientCredentialsResponse =
        serde_json::from_slice(&response.body).map_err(ClientError::Decode)?;

    if data.access_token.is_empty() {
        return Err(ClientError::Decode(serde::de::Error::custom(
            "token response does not contain access_token",
        )));
    }

    let record = TokenRecord::from_grant(data, obtained_at)?;

    tracing::info!(
        token_type = %record.token_type,
        expires_at = %record.expires_at.to_rfc3339(),
        "Access token refreshed"
    );

    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::{json_response, raw_response, token_response, ScriptedTransport};

    #[test]
    fn test_grant_request_shape() {
        let creds = Credentials::new("client", "secret");
        let request = build_grant_request(&creds, "/oauth/token", "test-agent").unwrap();

        assert_eq!(request.method, Method::POST);
        assert_eq!(request.path, "/oauth/token");
        assert_eq!(
            request.headers.get(AUTHORIZATION).unwrap(),
            "Basic Y2xpZW50OnNlY3JldA=="
        );
        assert_eq!(
            request.headers.get(CONTENT_TYPE).unwrap(),
            "application/x-www-form-urlencoded"
        );
        assert_eq!(
            request.body.as_deref(),
            Some(b"grant_type=client_credentials".as_slice())
        );
    }

    #[tokio::test]
    async fn test_refresh_success() {
        let transport = ScriptedTransport::new(|_| Ok(token_response("fresh-token", 600)));
        let creds = Credentials::new("client", "secret");

        let record = refresh_client_credentials(
            &transport,
            &OperationScope::background(),
            &creds,
            DEFAULT_TOKEN_PATH,
            "test-agent",
        )
        .await
        .unwrap();

        assert_eq!(record.access_token, "fresh-token");
        assert_eq!(record.token_type, "Bearer");
        assert_eq!(
            (record.expires_at - record.obtained_at).num_seconds(),
            600
        );
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_refresh_rejected_is_api_error() {
        let transport = ScriptedTransport::new(|_| {
            Ok(json_response(
                401,
                serde_json::json!({"message": "invalid_client"}),
            ))
        });
        let creds = Credentials::new("client", "wrong");

        let err = refresh_client_credentials(
            &transport,
            &OperationScope::background(),
            &creds,
            DEFAULT_TOKEN_PATH,
            "test-agent",
        )
        .await
        .unwrap_err();

        assert!(err.is_unauthorized());
        assert_eq!(err.api_error().unwrap().message, "invalid_client");
    }

    #[tokio::test]
    async fn test_refresh_garbled_body_is_decode_error() {
        let transport = ScriptedTransport::new(|_| Ok(raw_response(200, "not json")));

        let err = refresh_client_credentials(
            &transport,
            &OperationScope::background(),
            &Credentials::new("client", "secret"),
            DEFAULT_TOKEN_PATH,
            "test-agent",
        )
        .await
        .unwrap_err();

        assert!(err.is_decode());
    }

    #[tokio::test]
    async fn test_refresh_empty_token_is_decode_error() {
        let transport = ScriptedTransport::new(|_| Ok(token_response("", 600)));

        let err = refresh_client_credentials(
            &transport,
            &OperationScope::background(),
            &Credentials::new("client", "secret"),
            DEFAULT_TOKEN_PATH,
            "test-agent",
        )
        .await
        .unwrap_err();

        assert!(err.is_decode());
    }

    #[tokio::test]
    async fn test_refresh_out_of_range_expiry_is_decode_error() {
        for expires_in in [i64::MAX, 1_000_000_000_000_000] {
            let transport = ScriptedTransport::new(move |_| Ok(token_response("t", expires_in)));

            let err = refresh_client_credentials(
                &transport,
                &OperationScope::background(),
                &Credentials::new("client", "secret"),
                DEFAULT_TOKEN_PATH,
                "test-agent",
            )
            .await
            .unwrap_err();

            assert!(err.is_decode(), "expires_in {}: {:?}", expires_in, err);
            assert_eq!(transport.calls(), 1);
        }
    }

    #[tokio::test]
    async fn test_refresh_fails_fast_on_cancelled_scope() {
        let transport = ScriptedTransport::new(|_| Ok(token_response("never", 600)));
        let scope = OperationScope::background();
        scope.cancel();

        let err = refresh_client_credentials(
            &transport,
            &scope,
            &Credentials::new("client", "secret"),
            DEFAULT_TOKEN_PATH,
            "test-agent",
        )
        .await
        .unwrap_err();

        assert!(err.is_cancelled());
        assert_eq!(transport.calls(), 0);
    }
}
