//! Cafe Bazaar backend. Anonymous: no token, device info travels in the body.

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::debug;

use apkget_schema::{Arch, ArtifactManifest, PackageId, SearchHit, SplitDescriptor, Store};

use crate::error::{Error, Result};
use crate::store::{StoreClient, not_found};

const API_BASE: &str = "https://api.cafebazaar.ir";
const SDK_VERSION: u32 = 33;
const CLIENT_VERSION_CODE: u64 = 2_300_300;
const SEARCH_USER_AGENT: &str = "Bazaar/2600200 (Android 35; Xiaomi 2311DRK48G)";
const SEARCH_DEVICE_INFO: &str = "PHONE/arm64-v8a|GMS";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope<T> {
    #[serde(default)]
    properties: Option<Properties>,
    single_reply: Option<T>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Properties {
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DownloadReply {
    app_download_info_reply: Option<DownloadInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DownloadInfo {
    #[serde(default)]
    full_path_urls: Vec<String>,
    #[serde(default)]
    splits: Vec<BazaarSplit>,
    #[serde(default)]
    version_code: Option<u64>,
    #[serde(default)]
    version_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BazaarSplit {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    full_path_urls: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchReply {
    search_body_v2_reply: SearchBody,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchBody {
    page_body: PageBody,
}

#[derive(Debug, Deserialize)]
struct PageBody {
    #[serde(default)]
    rows: Vec<Row>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Row {
    #[serde(default)]
    app_item_with_custom_detail: Option<AppItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppItem {
    #[serde(default)]
    is_ad: bool,
    info: AppInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppInfo {
    package_name: String,
    name: String,
    #[serde(default)]
    version_code: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct BazaarClient {
    http: reqwest::Client,
    base: String,
}

impl BazaarClient {
    pub fn new(http: reqwest::Client) -> Self {
        Self {
            http,
            base: API_BASE.to_string(),
        }
    }

    pub fn with_base_url(mut self, base: &str) -> Self {
        self.base = base.trim_end_matches('/').to_string();
        self
    }

    async fn process<T: DeserializeOwned>(
        &self,
        request: &str,
        body: &Value,
        search_headers: bool,
    ) -> Result<Envelope<T>> {
        let url = format!("{}/rest-v1/process/{request}", self.base);
        let mut builder = self.http.post(&url).json(body);
        if search_headers {
            builder = builder
                .header(reqwest::header::USER_AGENT, SEARCH_USER_AGENT)
                .header("x-device-info", SEARCH_DEVICE_INFO);
        }

        let resp = builder.send().await?;
        let status = resp.status();
        let text = resp.text().await?;
        debug!(%url, %status, bytes = text.len(), "bazaar reply");

        // Errors come back as JSON with `properties.errorMessage`, often on a
        // 4xx status; parse before judging the status.
        match serde_json::from_str::<Envelope<T>>(&text) {
            Ok(envelope) => Ok(envelope),
            Err(_) if !status.is_success() => Err(Error::protocol(
                Store::CafeBazaar,
                format!("HTTP {status} from {request}"),
            )),
            Err(e) => Err(Error::protocol(Store::CafeBazaar, e)),
        }
    }
}

fn error_message(properties: Option<&Properties>) -> Option<&str> {
    properties
        .and_then(|p| p.error_message.as_deref())
        .map(str::trim)
        .filter(|m| !m.is_empty())
}

#[async_trait]
impl StoreClient for BazaarClient {
    fn store(&self) -> Store {
        Store::CafeBazaar
    }

    async fn resolve(&self, package: &PackageId, arch: Arch) -> Result<ArtifactManifest> {
        let body = json!({
            "properties": {
                "androidClientInfo": { "cpu": arch.cpu_list(), "sdkVersion": SDK_VERSION },
                "clientVersionCode": CLIENT_VERSION_CODE,
            },
            "singleRequest": {
                "appDownloadInfoRequest": { "packageName": package.as_str(), "referrers": [] }
            },
        });

        let envelope: Envelope<DownloadReply> =
            self.process("AppDownloadInfoRequest", &body, false).await?;

        if let Some(message) = error_message(envelope.properties.as_ref()) {
            debug!(%package, message, "bazaar reports package unavailable");
            return Err(not_found(package, Store::CafeBazaar));
        }
        let Some(info) = envelope
            .single_reply
            .and_then(|r| r.app_download_info_reply)
        else {
            return Err(not_found(package, Store::CafeBazaar));
        };
        if info.full_path_urls.is_empty() {
            return Err(not_found(package, Store::CafeBazaar));
        }

        let mut splits = vec![SplitDescriptor::base(info.full_path_urls, None)];
        splits.extend(info.splits.into_iter().enumerate().map(|(i, s)| {
            let name = s.name.unwrap_or_else(|| format!("split_{i}"));
            SplitDescriptor::config(&name, s.full_path_urls, None)
        }));

        let version_code = info.version_code.unwrap_or_default();
        Ok(ArtifactManifest {
            package_id: package.clone(),
            display_version: info
                .version_name
                .unwrap_or_else(|| version_code.to_string()),
            version_code,
            splits,
        })
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        let body = json!({
            "singleRequest": {
                "searchBodyV2Request": {
                    "query": query,
                    "offset": 0,
                    "language": "fa",
                    "scope": "app",
                }
            }
        });

        let envelope: Envelope<SearchReply> =
            self.process("SearchBodyV2Request", &body, true).await?;
        if error_message(envelope.properties.as_ref()).is_some() {
            return Ok(Vec::new());
        }
        let Some(reply) = envelope.single_reply else {
            return Ok(Vec::new());
        };

        Ok(reply
            .search_body_v2_reply
            .page_body
            .rows
            .into_iter()
            .filter_map(|row| row.app_item_with_custom_detail)
            .filter(|item| !item.is_ad)
            .filter_map(|item| {
                let package_id = PackageId::parse(&item.info.package_name).ok()?;
                Some(SearchHit {
                    package_id,
                    display_name: item.info.name,
                    version_code: item.info.version_code,
                    store: Store::CafeBazaar,
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apkget_schema::{Abi, SplitKind};
    use mockito::{Matcher, Server};

    fn client(server: &Server) -> BazaarClient {
        BazaarClient::new(reqwest::Client::new()).with_base_url(&server.url())
    }

    fn pkg() -> PackageId {
        PackageId::parse("com.example.app").unwrap()
    }

    #[tokio::test]
    async fn test_resolve_normalizes_splits() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", "/rest-v1/process/AppDownloadInfoRequest")
            .match_body(Matcher::PartialJson(json!({
                "properties": { "androidClientInfo": { "cpu": "x86_64,x86" } },
                "singleRequest": { "appDownloadInfoRequest": { "packageName": "com.example.app" } }
            })))
            .with_status(200)
            .with_body(
                r#"{
                    "properties": {"statusCode": 200},
                    "singleReply": {"appDownloadInfoReply": {
                        "fullPathUrls": ["https://cdn1/base.apk", "https://cdn2/base.apk"],
                        "versionCode": 1402,
                        "splits": [
                            {"name": "config.x86_64", "fullPathUrls": ["https://cdn1/x86_64.apk"]},
                            {"name": "config.xxhdpi", "fullPathUrls": ["https://cdn1/xxhdpi.apk"]}
                        ]
                    }}
                }"#,
            )
            .create_async()
            .await;

        let manifest = client(&server).resolve(&pkg(), Arch::X86_64).await.unwrap();
        assert_eq!(manifest.version_code, 1402);
        assert_eq!(manifest.display_version, "1402");
        assert_eq!(manifest.splits.len(), 3);
        assert_eq!(manifest.splits[0].kind, SplitKind::Base);
        assert_eq!(manifest.splits[0].urls.len(), 2);
        assert_eq!(manifest.splits[1].abi, Some(Abi::X86_64));
        assert_eq!(manifest.splits[2].kind, SplitKind::DensityConfig);
        manifest.validate().unwrap();
    }

    #[tokio::test]
    async fn test_error_message_is_absence() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", "/rest-v1/process/AppDownloadInfoRequest")
            .with_status(400)
            .with_body(r#"{"properties": {"errorMessage": "This app is not available in your region"}}"#)
            .create_async()
            .await;

        let err = client(&server).resolve(&pkg(), Arch::Arm64).await.unwrap_err();
        assert!(err.is_absence(), "{err:?}");
    }

    #[tokio::test]
    async fn test_server_error_is_not_absence() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", "/rest-v1/process/AppDownloadInfoRequest")
            .with_status(502)
            .with_body("<html>bad gateway</html>")
            .create_async()
            .await;

        let err = client(&server).resolve(&pkg(), Arch::Arm64).await.unwrap_err();
        assert!(matches!(err, Error::Protocol { .. }));
    }

    #[tokio::test]
    async fn test_search_skips_ads() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", "/rest-v1/process/SearchBodyV2Request")
            .match_header("x-device-info", SEARCH_DEVICE_INFO)
            .with_status(200)
            .with_body(
                r#"{"singleReply": {"searchBodyV2Reply": {"pageBody": {"rows": [
                    {"appItemWithCustomDetail": {"isAd": true,
                        "info": {"packageName": "com.ads.thing", "name": "Ad", "versionCode": 1}}},
                    {"someBanner": {}},
                    {"appItemWithCustomDetail": {"isAd": false,
                        "info": {"packageName": "org.telegram.messenger", "name": "Telegram", "versionCode": 5012}}}
                ]}}}}"#,
            )
            .create_async()
            .await;

        let hits = client(&server).search("telegram").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].package_id.as_str(), "org.telegram.messenger");
        assert_eq!(hits[0].version_code, Some(5012));
        assert_eq!(hits[0].store, Store::CafeBazaar);
    }
}
