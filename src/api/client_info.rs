use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequestParts},
    http::{header, request::Parts, HeaderMap},
};
use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};

use crate::model::ClientInfo;

/// Axum extractor for the client metadata recorded on a session's first request
///
/// - IP: first hop of `X-Forwarded-For` if it is a valid address, else the socket peer address
///   when the server was started with connect info
/// - User agent: the `User-Agent` header
///
/// Never rejects; missing values are left as `None`.
#[async_trait]
impl<S> FromRequestParts<S> for ClientInfo
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let headers = &parts.headers;

        let ip = forwarded_for(headers).or_else(|| {
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(address)| address.ip().to_string())
        });
        let user_agent = extract_header_value(headers, header::USER_AGENT.as_str());

        Ok(ClientInfo::new(ip, user_agent))
    }
}

fn forwarded_for(headers: &HeaderMap) -> Option<String> {
    let value = extract_header_value(headers, "x-forwarded-for")?;
    let hop = value.split(',').map(str::trim).find(|hop| !hop.is_empty())?;
    hop.parse::<IpAddr>().ok().map(|ip| ip.to_string())
}

/// Extract header value as string
fn extract_header_value(headers: &HeaderMap, header_name: &str) -> Option<String> {
    headers
        .get(header_name)
        .and_then(|value| value.to_str().ok())
        .map(|s| s.to_string())
}
