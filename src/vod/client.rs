//! HTTP implementation of [`VodClient`] against the provider's RPC-style
//! JSON API (`?Action=...` plus call parameters).
//!
//! Authentication uses the long-lived access key pair from process
//! configuration, sent with every request. Responses use the provider's
//! PascalCase field names; the wire structs here keep that quirk out of the
//! rest of the crate.

use super::{AssetPage, PlayInfo, RemoteAsset, VodClient, VodError, VodResult, PLAY_URL_TTL_SECS};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const API_VERSION: &str = "2017-03-21";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Provider client over a shared pooled HTTP connection.
#[derive(Clone, Debug)]
pub struct HttpVodClient {
    http: Client,
    endpoint: String,
    access_key_id: String,
    access_key_secret: String,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(rename = "Code", default)]
    code: String,
    #[serde(rename = "Message", default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct SearchMediaResponse {
    #[serde(rename = "Total", default)]
    total: u64,
    #[serde(rename = "MediaList", default)]
    media_list: Vec<MediaItem>,
}

#[derive(Debug, Deserialize)]
struct MediaItem {
    #[serde(rename = "MediaId")]
    media_id: String,
    #[serde(rename = "Title", default)]
    title: Option<String>,
    #[serde(rename = "Description", default)]
    description: Option<String>,
    #[serde(
        rename = "Duration",
        default,
        deserialize_with = "super::duration_seconds"
    )]
    duration: i64,
    #[serde(rename = "CoverURL", default)]
    cover_url: Option<String>,
    #[serde(rename = "Status", default)]
    status: Option<String>,
    #[serde(rename = "CreationTime", default)]
    creation_time: Option<String>,
    #[serde(rename = "Size", default)]
    size: i64,
}

#[derive(Debug, Deserialize)]
struct GetVideoInfoResponse {
    #[serde(rename = "Video")]
    video: Option<VideoInfo>,
}

#[derive(Debug, Deserialize)]
struct VideoInfo {
    #[serde(rename = "VideoId")]
    video_id: String,
    #[serde(rename = "Title", default)]
    title: Option<String>,
    #[serde(rename = "Description", default)]
    description: Option<String>,
    #[serde(
        rename = "Duration",
        default,
        deserialize_with = "super::duration_seconds"
    )]
    duration: i64,
    #[serde(rename = "CoverURL", default)]
    cover_url: Option<String>,
    #[serde(rename = "Status", default)]
    status: Option<String>,
    #[serde(rename = "CreationTime", default)]
    creation_time: Option<String>,
    #[serde(rename = "Size", default)]
    size: i64,
}

#[derive(Debug, Deserialize)]
struct GetPlayInfoResponse {
    #[serde(rename = "PlayInfoList", default)]
    play_info_list: Option<PlayInfoList>,
}

#[derive(Debug, Default, Deserialize)]
struct PlayInfoList {
    #[serde(rename = "PlayInfo", default)]
    play_info: Vec<PlayInfoItem>,
}

#[derive(Debug, Deserialize)]
struct PlayInfoItem {
    #[serde(rename = "PlayURL")]
    play_url: String,
    #[serde(rename = "Definition", default)]
    definition: Option<String>,
    #[serde(rename = "Format", default)]
    format: Option<String>,
}

impl From<MediaItem> for RemoteAsset {
    fn from(m: MediaItem) -> Self {
        RemoteAsset {
            remote_asset_id: m.media_id,
            title: m.title.unwrap_or_else(|| "Untitled".to_string()),
            description: m.description.unwrap_or_default(),
            duration_seconds: m.duration,
            cover_url: m.cover_url.unwrap_or_default(),
            status: m.status.unwrap_or_default(),
            creation_time: m.creation_time.unwrap_or_default(),
            size: m.size,
        }
    }
}

impl From<VideoInfo> for RemoteAsset {
    fn from(v: VideoInfo) -> Self {
        RemoteAsset {
            remote_asset_id: v.video_id,
            title: v.title.unwrap_or_else(|| "Untitled".to_string()),
            description: v.description.unwrap_or_default(),
            duration_seconds: v.duration,
            cover_url: v.cover_url.unwrap_or_default(),
            status: v.status.unwrap_or_default(),
            creation_time: v.creation_time.unwrap_or_default(),
            size: v.size,
        }
    }
}

impl HttpVodClient {
    pub fn new(endpoint: String, access_key_id: String, access_key_secret: String) -> Self {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            http,
            endpoint,
            access_key_id,
            access_key_secret,
        }
    }

    /// Issue one API call and deserialize the success body.
    async fn call<T: for<'de> Deserialize<'de>>(
        &self,
        action: &str,
        params: &[(&str, String)],
    ) -> VodResult<T> {
        debug!("VOD API call: {}", action);

        let mut query: Vec<(&str, String)> = vec![
            ("Action", action.to_string()),
            ("Version", API_VERSION.to_string()),
        ];
        query.extend(params.iter().cloned());

        let response = self
            .http
            .get(&self.endpoint)
            .query(&query)
            .header("x-vod-access-key-id", &self.access_key_id)
            .header("x-vod-access-key-secret", &self.access_key_secret)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_api_error(status, &body));
        }

        response.json::<T>().await.map_err(map_transport_error)
    }
}

fn map_transport_error(err: reqwest::Error) -> VodError {
    if err.is_connect() || err.is_timeout() {
        VodError::Network(err.to_string())
    } else {
        VodError::Unknown {
            code: "TRANSPORT".to_string(),
            message: err.to_string(),
        }
    }
}

/// Map a non-2xx provider response to the error taxonomy using the machine
/// code in the body.
fn map_api_error(status: StatusCode, body: &str) -> VodError {
    let api_err: ApiError = serde_json::from_str(body).unwrap_or(ApiError {
        code: status.as_str().to_string(),
        message: body.chars().take(200).collect(),
    });

    let ApiError { code, message } = api_err;
    match code.as_str() {
        "InvalidAccessKeyId.NotFound" | "SignatureDoesNotMatch" => {
            VodError::Auth { code, message }
        }
        "InvalidVideo.NotFound" | "InvalidMediaId.NotFound" => {
            VodError::NotFound { code, message }
        }
        "Forbidden.Delinquent" => VodError::QuotaExceeded { code, message },
        _ => VodError::Unknown { code, message },
    }
}

#[async_trait]
impl VodClient for HttpVodClient {
    async fn list_assets(&self, page_no: u32, page_size: u32) -> VodResult<AssetPage> {
        let response: SearchMediaResponse = self
            .call(
                "SearchMedia",
                &[
                    ("PageNo", page_no.to_string()),
                    ("PageSize", page_size.to_string()),
                    ("Status", "Normal".to_string()),
                    ("SortBy", "CreationTime:Desc".to_string()),
                ],
            )
            .await?;

        Ok(AssetPage {
            items: response.media_list.into_iter().map(Into::into).collect(),
            total: response.total,
        })
    }

    async fn get_asset_info(&self, remote_asset_id: &str) -> VodResult<RemoteAsset> {
        let response: GetVideoInfoResponse = self
            .call(
                "GetVideoInfo",
                &[("VideoId", remote_asset_id.to_string())],
            )
            .await?;

        response.video.map(Into::into).ok_or_else(|| VodError::Unknown {
            code: "VideoInfo.Missing".to_string(),
            message: format!("no video info in response for {remote_asset_id}"),
        })
    }

    async fn get_play_url(&self, remote_asset_id: &str) -> VodResult<PlayInfo> {
        let response: GetPlayInfoResponse = self
            .call(
                "GetPlayInfo",
                &[
                    ("VideoId", remote_asset_id.to_string()),
                    ("Formats", "mp4".to_string()),
                    ("AuthTimeout", PLAY_URL_TTL_SECS.to_string()),
                    ("Definition", "Auto".to_string()),
                ],
            )
            .await?;

        // The first entry is the highest-quality rendition
        let item = response
            .play_info_list
            .unwrap_or_default()
            .play_info
            .into_iter()
            .next()
            .ok_or_else(|| VodError::Unknown {
                code: "PlayInfo.Missing".to_string(),
                message: format!(
                    "no play info in response for {remote_asset_id}; transcode may be pending"
                ),
            })?;

        Ok(PlayInfo {
            play_url: item.play_url,
            definition: item.definition.unwrap_or_default(),
            format: item.format.unwrap_or_default(),
        })
    }
}
