//! HTTP implementation of [`LookupService`] on top of `reqwest`.

use async_trait::async_trait;
use reqwest::{Client, Url};
use tracing::{debug, instrument, warn};

use crate::config::ApiConfig;
use crate::error::{AppError, LookupError};
use crate::lookup::schema::WireFormat;
use crate::lookup::service::LookupService;
use crate::model::filter_state::Tag;
use crate::model::search_state::ResultRecord;

#[derive(Debug, Clone)]
pub struct HttpLookup {
    client: Client,
    base: Url,
    format: WireFormat,
}

impl HttpLookup {
    pub fn new(config: &ApiConfig) -> Result<Self, AppError> {
        let base = Url::parse(&config.base_url).map_err(|e| AppError::InvalidConfig {
            field: "api.base_url".into(),
            message: e.to_string(),
        })?;
        if base.cannot_be_a_base() {
            return Err(AppError::InvalidConfig {
                field: "api.base_url".into(),
                message: format!("{base} cannot be used as a base URL"),
            });
        }

        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| AppError::HttpClient(e.to_string()))?;

        Ok(Self {
            client,
            base,
            format: config.wire_format,
        })
    }

    /// `{base}/{segment}/{key}` with `key` percent-encoded as one path segment.
    pub fn endpoint(&self, segment: &str, key: &str) -> Result<Url, LookupError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| LookupError::Transport(format!("invalid base URL {}", self.base)))?
            .pop_if_empty()
            .push(segment)
            .push(key);
        Ok(url)
    }

    async fn get(&self, url: Url) -> Result<Vec<u8>, LookupError> {
        debug!(%url, "GET");
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| LookupError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            warn!(%url, status = status.as_u16(), "Lookup returned non-success status");
            return Err(LookupError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| LookupError::Transport(e.to_string()))?;
        Ok(body.to_vec())
    }
}

#[async_trait]
impl LookupService for HttpLookup {
    #[instrument(level = "debug", skip(self, tag), fields(tag = %tag))]
    async fn tag_members(&self, tag: &Tag) -> Result<Vec<String>, LookupError> {
        let url = self.endpoint(self.format.tag_segment(), tag.as_str())?;
        let body = self.get(url).await?;
        self.format.decode_members(&body)
    }

    #[instrument(level = "debug", skip(self))]
    async fn record(&self, name: &str) -> Result<ResultRecord, LookupError> {
        let url = self.endpoint(self.format.name_segment(), name)?;
        let body = self.get(url).await?;
        self.format.decode_record(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Minimal HTTP/1.1 responder: `routes` maps a request path to (status, body).
    async fn serve(routes: Vec<(&'static str, u16, &'static str)>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let routes = routes.clone();
                tokio::spawn(async move {
                    let mut buf = vec![0_u8; 4096];
                    let n = socket.read(&mut buf).await.unwrap_or(0);
                    let request = String::from_utf8_lossy(&buf[..n]);
                    let path = request.split_whitespace().nth(1).unwrap_or("/").to_owned();

                    let (status, body) = routes
                        .iter()
                        .find(|(route, _, _)| *route == path)
                        .map_or((404, "{}"), |(_, status, body)| (*status, *body));

                    let response = format!(
                        "HTTP/1.1 {status} X\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                        body.len()
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        format!("http://{addr}/api")
    }

    fn config(base_url: String, wire_format: WireFormat) -> ApiConfig {
        ApiConfig {
            base_url,
            wire_format,
            request_timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn test_endpoint_encodes_key() {
        let lookup = HttpLookup::new(&config(
            "https://pokeapi.co/api/v2/".into(),
            WireFormat::PokeApi,
        ))
        .unwrap();

        let url = lookup.endpoint("pokemon", "mr mime").unwrap();
        assert_eq!(url.as_str(), "https://pokeapi.co/api/v2/pokemon/mr%20mime");
    }

    #[test]
    fn test_rejects_invalid_base() {
        assert!(HttpLookup::new(&config("not a url".into(), WireFormat::Generic)).is_err());
        assert!(HttpLookup::new(&config("mailto:a@b".into(), WireFormat::Generic)).is_err());
    }

    #[tokio::test]
    async fn test_generic_round_trip() {
        let base = serve(vec![
            ("/api/tag/fire", 200, r#"{"members":["charmander","charizard"]}"#),
            ("/api/name/charizard", 200, r#"{"name":"charizard","id":6,"imageUrl":null}"#),
        ])
        .await;
        let lookup = HttpLookup::new(&config(base, WireFormat::Generic)).unwrap();

        let members = lookup.tag_members(&Tag::from("fire")).await.unwrap();
        assert_eq!(members, vec!["charmander", "charizard"]);

        let record = lookup.record("charizard").await.unwrap();
        assert_eq!(record.id, 6);
        assert_eq!(record.image_url, None);
    }

    #[tokio::test]
    async fn test_non_success_and_bad_shape() {
        let base = serve(vec![
            ("/api/name/missingno", 404, r#"{"detail":"Not found."}"#),
            ("/api/name/glitch", 200, r#"{"unexpected":true}"#),
        ])
        .await;
        let lookup = HttpLookup::new(&config(base, WireFormat::Generic)).unwrap();

        let err = lookup.record("missingno").await.unwrap_err();
        assert!(matches!(err, LookupError::Status { status: 404, .. }));

        let err = lookup.record("glitch").await.unwrap_err();
        assert!(matches!(err, LookupError::Schema(_)));
    }
}
