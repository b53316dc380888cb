//! A [`MemberService`] that obtains members over HTTP.

use crate::domain::member::{Member, MemberError, MemberService};
use async_trait::async_trait;
use http::{Method, Request, StatusCode};
use http_body_util::{BodyExt, Empty};
use hyper::body::Bytes;
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use serde::Deserialize;
use url::Url;

/// A [`MemberService`] that does `GET <url><username>` and expects a single member as JSON in
/// return. A 404 means the member does not exist.
#[derive(Debug)]
pub struct HttpMemberService {
    base_url: Url,
    client: Client<HttpsConnector<HttpConnector>, Empty<Bytes>>,
}

#[derive(Deserialize, Debug)]
struct MemberJsonObj {
    id: i64,
    username: String,
    name: Option<String>,
    authorities: Option<Vec<String>>,
}

impl HttpMemberService {
    /// Creates a service that will obtain members from the specified base URL.
    pub fn new(url: &str) -> Result<HttpMemberService, String> {
        let base_url = Url::parse(url).map_err(|e| format!("invalid member service URL {}: {}", url, e))?;
        if base_url.cannot_be_a_base() {
            return Err(format!("invalid member service URL {}: cannot be a base", url));
        }

        let https = hyper_rustls::HttpsConnectorBuilder::new()
            .with_webpki_roots()
            .https_or_http()
            .enable_http1()
            .build();

        Ok(HttpMemberService {
            base_url,
            client: Client::builder(TokioExecutor::new()).build(https),
        })
    }

    // The username becomes the last path segment, percent-encoded.
    fn member_url(&self, username: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(username);
        }
        url
    }
}

#[async_trait]
impl MemberService for HttpMemberService {
    async fn find_by_username(&self, username: &str) -> Result<Member, MemberError> {
        let req = Request::builder()
            .method(Method::GET)
            .header("Accept", "application/json")
            .uri(self.member_url(username).as_str())
            .body(Empty::<Bytes>::new())
            .map_err(|e| MemberError::with_source("error creating request", e))?;

        let resp = self
            .client
            .request(req)
            .await
            .map_err(|e| MemberError::with_source("error doing HTTP request", e))?;

        match resp.status() {
            StatusCode::NOT_FOUND => return Err(MemberError::not_found(username)),
            status if !status.is_success() => {
                return Err(MemberError::new(format!("unexpected HTTP status {}", status)))
            }
            _ => {}
        }

        let body_bytes = resp
            .into_body()
            .collect()
            .await
            .map_err(|e| MemberError::with_source("error reading body", e))?
            .to_bytes();

        let m: MemberJsonObj =
            serde_json::from_slice(&body_bytes).map_err(|e| MemberError::with_source("error parsing body", e))?;

        if m.username != username {
            return Err(MemberError::Generic(format!(
                "asked for member {:?} but got {:?}",
                username, m.username
            )));
        }

        let name = m.name.unwrap_or_else(|| m.username.clone());
        Ok(Member::new(m.id, m.username, name).with_authorities(m.authorities.unwrap_or_default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    // Serves one canned response per accepted connection and hands back the request lines seen.
    async fn canned_server(
        responses: Vec<(&'static str, &'static str)>,
    ) -> (String, tokio::task::JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let mut seen = Vec::new();
            for (status, body) in responses {
                let (mut stream, _) = listener.accept().await.unwrap();
                let mut buf = vec![0u8; 4096];
                let n = stream.read(&mut buf).await.unwrap();
                let request = String::from_utf8_lossy(&buf[..n]).to_string();
                seen.push(request.lines().next().unwrap_or_default().to_string());
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                stream.write_all(response.as_bytes()).await.unwrap();
                stream.shutdown().await.unwrap();
            }
            seen
        });
        (format!("http://{}/members/", addr), handle)
    }

    #[tokio::test]
    async fn found_member_is_decoded() {
        let (url, server) = canned_server(vec![(
            "200 OK",
            r#"{"id": 5, "username": "dave", "name": "Dave", "authorities": ["ROLE_MEMBER"]}"#,
        )])
        .await;
        let service = HttpMemberService::new(&url).unwrap();

        let member = service.find_by_username("dave").await.unwrap();

        assert_eq!(member, Member::new(5, "dave", "Dave").with_authorities(["ROLE_MEMBER"]));
        assert_eq!(server.await.unwrap(), vec!["GET /members/dave HTTP/1.1".to_string()]);
    }

    #[tokio::test]
    async fn not_found_status_maps_to_not_found() {
        let (url, _server) = canned_server(vec![("404 Not Found", "{}")]).await;
        let service = HttpMemberService::new(&url).unwrap();

        let err = service.find_by_username("eve").await.unwrap_err();

        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn server_errors_are_not_mistaken_for_not_found() {
        let (url, _server) = canned_server(vec![("500 Internal Server Error", "{}")]).await;
        let service = HttpMemberService::new(&url).unwrap();

        let err = service.find_by_username("eve").await.unwrap_err();

        assert!(!err.is_not_found());
        assert!(err.to_string().contains("500"));
    }

    #[tokio::test]
    async fn malformed_body_is_an_error() {
        let (url, _server) = canned_server(vec![("200 OK", "not json")]).await;
        let service = HttpMemberService::new(&url).unwrap();

        let err = service.find_by_username("eve").await.unwrap_err();

        assert!(matches!(err, MemberError::ImplPropagated(..)));
    }

    #[tokio::test]
    async fn base_url_without_trailing_slash_gets_one_segment_appended() {
        let (url, server) = canned_server(vec![("200 OK", r#"{"id": 5, "username": "dave"}"#)]).await;
        let service = HttpMemberService::new(url.trim_end_matches('/')).unwrap();

        let member = service.find_by_username("dave").await.unwrap();

        assert_eq!(member.id, 5);
        assert_eq!(server.await.unwrap(), vec!["GET /members/dave HTTP/1.1".to_string()]);
    }

    #[test]
    fn rejects_unusable_base_urls() {
        assert!(HttpMemberService::new("not a url").is_err());
        assert!(HttpMemberService::new("mailto:members@example.com").is_err());
    }

    #[tokio::test]
    async fn usernames_are_percent_encoded() {
        let (url, server) = canned_server(vec![("404 Not Found", "{}")]).await;
        let service = HttpMemberService::new(&url).unwrap();

        let _ = service.find_by_username("a b/c").await;

        assert_eq!(server.await.unwrap(), vec!["GET /members/a%20b%2Fc HTTP/1.1".to_string()]);
    }
}
