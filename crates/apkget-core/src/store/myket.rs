//! Myket backend.
//!
//! Every call after device registration carries a session token in the
//! `Authorization` header. Tokens outlive a single run, so the caller may
//! seed one from the config file and persist whatever [`MyketClient::token`]
//! holds afterwards. A token the server rejects is replaced once per call.

use async_trait::async_trait;
use rand::seq::IndexedRandom;
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use sha1::{Digest, Sha1};
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info, warn};

use apkget_schema::{Arch, ArtifactManifest, PackageId, SearchHit, SplitDescriptor, Store};

use crate::error::{Error, Result};
use crate::store::{StoreClient, not_found};

const API_BASE: &str = "https://apiserver.myket.ir";
const MYKET_VERSION: &str = "963";
const SALT: &str = "NZe*x:38_Jh@#LM6)!9&wb5:32D";
const AD_ID: &str = "de46304b-89ac-4ffa-a9bf-4ecc9ee9c857";
const ANDROID_ID: &str = "8f2ff66584cc50ef";
const SEARCH_LIMIT: u32 = 20;

#[derive(Debug, Deserialize)]
struct Authorization {
    token: String,
}

#[derive(Debug, Deserialize)]
struct ServerList {
    #[serde(default)]
    asl: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppDetails {
    #[serde(default)]
    translated_message: Option<String>,
    #[serde(default)]
    version: Option<AppVersion>,
}

#[derive(Debug, Deserialize)]
struct AppVersion {
    code: u64,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UriInfo {
    #[serde(default)]
    result_code: Option<String>,
    #[serde(default)]
    uri_path: Option<String>,
    #[serde(default)]
    uri_servers: Vec<String>,
    #[serde(default)]
    split: Vec<UriSplit>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UriSplit {
    #[serde(rename = "type")]
    kind: String,
    uri_path: String,
    #[serde(default)]
    uri_servers: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SearchPage {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    app: SearchApp,
}

#[derive(Debug, Deserialize)]
struct SearchApp {
    application: Listing,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Listing {
    package_name: String,
    #[serde(default)]
    english_title: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    version_code: Option<u64>,
    #[serde(default)]
    ad_info: Option<Value>,
}

/// Failure of one authenticated call, before token handling decides what it means.
enum CallError {
    Rejected(StatusCode),
    Other(Error),
}

impl From<reqwest::Error> for CallError {
    fn from(e: reqwest::Error) -> Self {
        Self::Other(e.into())
    }
}

#[derive(Debug)]
pub struct MyketClient {
    http: reqwest::Client,
    base: String,
    abis: Vec<String>,
    token: Mutex<Option<String>>,
    servers: OnceCell<Vec<String>>,
}

impl MyketClient {
    /// `arch` is the device class announced when registering for a token.
    pub fn new(http: reqwest::Client, arch: Arch) -> Self {
        Self {
            http,
            base: API_BASE.to_string(),
            abis: arch.abis().iter().map(|a| a.as_str().to_string()).collect(),
            token: Mutex::new(None),
            servers: OnceCell::new(),
        }
    }

    pub fn with_base_url(mut self, base: &str) -> Self {
        self.base = base.trim_end_matches('/').to_string();
        self
    }

    /// Seed a token cached from an earlier run.
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = Mutex::new(token.filter(|t| !t.is_empty()));
        self
    }

    /// The token in use, if one has been issued or seeded.
    pub async fn token(&self) -> Option<String> {
        self.token.lock().await.clone()
    }

    async fn authorize(&self) -> Result<String> {
        let uuid = uuid::Uuid::new_v4().to_string();
        let body = json!({
            "acId": "",
            "acKey": "",
            "api": "33",
            "adId": AD_ID,
            "andId": ANDROID_ID,
            "hsh": device_hash(&uuid),
            "supportedAbis": self.abis,
            "uuid": uuid,
        });

        let url = format!("{}/v1/devices/authorize/", self.base);
        let fail = |reason: String| Error::AuthenticationRequired {
            store: Store::Myket,
            reason,
        };

        let resp = self
            .http
            .post(&url)
            .header("Myket-Version", MYKET_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| fail(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(fail(format!("device registration returned HTTP {}", resp.status())));
        }
        let auth: Authorization = resp.json().await.map_err(|e| fail(e.to_string()))?;
        info!("registered new Myket device token");
        Ok(auth.token)
    }

    /// Current token, registering a device if there is none.
    async fn current_token(&self) -> Result<String> {
        let mut slot = self.token.lock().await;
        if let Some(token) = slot.as_ref() {
            return Ok(token.clone());
        }
        let token = self.authorize().await?;
        *slot = Some(token.clone());
        Ok(token)
    }

    /// Replace `stale` with a fresh token unless another call already did.
    async fn refresh_token(&self, stale: &str) -> Result<String> {
        let mut slot = self.token.lock().await;
        if let Some(token) = slot.as_ref().filter(|t| t.as_str() != stale) {
            return Ok(token.clone());
        }
        *slot = None;
        let token = self.authorize().await?;
        *slot = Some(token.clone());
        Ok(token)
    }

    async fn api_root(&self) -> Result<String> {
        let servers = self
            .servers
            .get_or_try_init(|| async {
                let url = format!("{}/v1/apiservers/", self.base);
                let list: ServerList = self
                    .http
                    .get(&url)
                    .header("Myket-Version", MYKET_VERSION)
                    .send()
                    .await?
                    .error_for_status()?
                    .json()
                    .await?;
                debug!(count = list.asl.len(), "fetched Myket API servers");
                Ok::<_, Error>(list.asl)
            })
            .await?;

        let chosen = servers.choose(&mut rand::rng()).map_or(self.base.as_str(), String::as_str);
        Ok(strip_api_version(chosen))
    }

    async fn call_once<T: DeserializeOwned>(
        &self,
        method: &Method,
        url: &str,
        token: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> std::result::Result<Option<T>, CallError> {
        let mut builder = self
            .http
            .request(method.clone(), url)
            .header("Myket-Version", MYKET_VERSION)
            .header(reqwest::header::AUTHORIZATION, token)
            .query(query);
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let resp = builder.send().await?;
        let status = resp.status();
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(CallError::Rejected(status)),
            StatusCode::NOT_FOUND => Ok(None),
            s if s.is_success() => Ok(Some(resp.json().await?)),
            s => Err(CallError::Other(Error::protocol(
                Store::Myket,
                format!("HTTP {s} from {url}"),
            ))),
        }
    }

    /// Authenticated call. `Ok(None)` means the resource does not exist.
    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<Option<T>> {
        let url = format!("{}{path}", self.api_root().await?);
        let token = self.current_token().await?;

        match self.call_once(&method, &url, &token, query, body).await {
            Ok(value) => Ok(value),
            Err(CallError::Other(e)) => Err(e),
            Err(CallError::Rejected(status)) => {
                warn!(%status, "Myket rejected the session token, registering again");
                let token = self.refresh_token(&token).await?;
                match self.call_once(&method, &url, &token, query, body).await {
                    Ok(value) => Ok(value),
                    Err(CallError::Other(e)) => Err(e),
                    Err(CallError::Rejected(status)) => Err(Error::AuthenticationRequired {
                        store: Store::Myket,
                        reason: format!("fresh token rejected with HTTP {status}"),
                    }),
                }
            }
        }
    }
}

/// `hsh` field of the registration body: sha1 of the salt and uuid joined
/// with the three empty account fields.
fn device_hash(uuid: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(format!("{SALT}-{uuid}---").as_bytes());
    hex::encode(hasher.finalize())
}

/// API server entries end in a version segment (`.../v1/`); calls add their own.
fn strip_api_version(server: &str) -> String {
    let trimmed = server.trim_end_matches('/');
    trimmed
        .rsplit_once('/')
        .filter(|(_, last)| last.starts_with('v') && last[1..].chars().all(|c| c.is_ascii_digit()))
        .map_or(trimmed, |(root, _)| root)
        .to_string()
}

fn join_url(server: &str, path: &str) -> String {
    format!(
        "{}/{}",
        server.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

fn mirrors(servers: &[String], path: &str) -> Vec<String> {
    servers.iter().map(|s| join_url(s, path)).collect()
}

#[async_trait]
impl StoreClient for MyketClient {
    fn store(&self) -> Store {
        Store::Myket
    }

    async fn resolve(&self, package: &PackageId, _arch: Arch) -> Result<ArtifactManifest> {
        let path = format!("/v2/applications/{package}");
        let Some(details) = self.call::<AppDetails>(Method::GET, &path, &[], None).await? else {
            return Err(not_found(package, Store::Myket));
        };
        if let Some(message) = details.translated_message.filter(|m| !m.is_empty()) {
            debug!(%package, %message, "myket reports package unavailable");
            return Err(not_found(package, Store::Myket));
        }
        let Some(version) = details.version else {
            return Err(Error::protocol(Store::Myket, "application details carry no version"));
        };

        let body = json!({ "requestedVersion": version.code });
        let Some(uri) = self
            .call::<UriInfo>(Method::POST, &format!("{path}/uri"), &[], Some(&body))
            .await?
        else {
            return Err(not_found(package, Store::Myket));
        };

        let Some(base_path) = uri.uri_path.as_deref() else {
            debug!(%package, result = ?uri.result_code, "myket returned no download path");
            return Err(not_found(package, Store::Myket));
        };
        if uri.uri_servers.is_empty() {
            return Err(Error::protocol(Store::Myket, "download reply lists no servers"));
        }

        let mut splits = vec![SplitDescriptor::base(mirrors(&uri.uri_servers, base_path), None)];
        for split in &uri.split {
            let servers = if split.uri_servers.is_empty() {
                &uri.uri_servers
            } else {
                &split.uri_servers
            };
            splits.push(SplitDescriptor::config(
                &split.kind,
                mirrors(servers, &split.uri_path),
                None,
            ));
        }

        Ok(ArtifactManifest {
            package_id: package.clone(),
            display_version: version.name.unwrap_or_else(|| version.code.to_string()),
            version_code: version.code,
            splits,
        })
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        let params = [
            ("limit", SEARCH_LIMIT.to_string()),
            ("offset", "0".to_string()),
            ("query", query.to_string()),
            ("tab", "app_app".to_string()),
        ];
        let page: SearchPage = self
            .call(Method::GET, "/v2/applications/search/", &params, None)
            .await?
            .unwrap_or(SearchPage { items: Vec::new() });

        Ok(page
            .items
            .into_iter()
            .map(|item| item.app.application)
            .filter(|app| app.ad_info.as_ref().is_none_or(|ad| !is_truthy(ad)))
            .filter_map(|app| {
                let package_id = PackageId::parse(&app.package_name).ok()?;
                let display_name = app
                    .english_title
                    .filter(|t| !t.is_empty())
                    .or(app.title)
                    .unwrap_or_else(|| app.package_name.clone());
                Some(SearchHit {
                    package_id,
                    display_name,
                    version_code: app.version_code,
                    store: Store::Myket,
                })
            })
            .collect())
    }
}

fn is_truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Object(m) => !m.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::String(s) => !s.is_empty(),
        Value::Number(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apkget_schema::{Abi, SplitKind};
    use mockito::{Matcher, Server, ServerGuard};

    fn pkg() -> PackageId {
        PackageId::parse("com.example.app").unwrap()
    }

    async fn server_with_discovery() -> ServerGuard {
        let mut server = Server::new_async().await;
        let asl = format!(r#"{{"asl": ["{}/v1/"]}}"#, server.url());
        server
            .mock("GET", "/v1/apiservers/")
            .with_status(200)
            .with_body(asl)
            .create_async()
            .await;
        server
    }

    fn client(server: &ServerGuard, token: Option<&str>) -> MyketClient {
        MyketClient::new(reqwest::Client::new(), Arch::Arm64)
            .with_base_url(&server.url())
            .with_token(token.map(String::from))
    }

    #[test]
    fn test_strip_api_version() {
        assert_eq!(
            strip_api_version("https://apiserver2.myket.ir/v1/"),
            "https://apiserver2.myket.ir"
        );
        assert_eq!(strip_api_version("http://127.0.0.1:1234"), "http://127.0.0.1:1234");
    }

    #[test]
    fn test_device_hash_shape() {
        let h = device_hash("00000000-0000-0000-0000-000000000000");
        assert_eq!(h.len(), 40);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(h, device_hash("11111111-0000-0000-0000-000000000000"));
    }

    #[tokio::test]
    async fn test_resolve_with_cached_token() {
        let mut server = server_with_discovery().await;
        let _details = server
            .mock("GET", "/v2/applications/com.example.app")
            .match_header("authorization", "cached")
            .match_header("myket-version", MYKET_VERSION)
            .with_status(200)
            .with_body(r#"{"version": {"code": 77, "name": "7.7"}}"#)
            .create_async()
            .await;
        let _uri = server
            .mock("POST", "/v2/applications/com.example.app/uri")
            .match_body(Matcher::Json(json!({"requestedVersion": 77})))
            .with_status(200)
            .with_body(
                r#"{
                    "resultCode": "Successful",
                    "uriPath": "/apk/base.apk",
                    "uriServers": ["https://dl1.example/", "https://dl2.example"],
                    "split": [
                        {"type": "config.armeabi_v7a.apk", "uriPath": "/apk/v7a.apk", "uriServers": ["https://dl1.example/"]},
                        {"type": "config.fa.apk", "uriPath": "apk/fa.apk", "uriServers": []}
                    ]
                }"#,
            )
            .create_async()
            .await;

        let myket = client(&server, Some("cached"));
        let manifest = myket.resolve(&pkg(), Arch::Arm64).await.unwrap();

        assert_eq!(manifest.display_version, "7.7");
        assert_eq!(manifest.version_code, 77);
        assert_eq!(
            manifest.splits[0].urls,
            vec!["https://dl1.example/apk/base.apk", "https://dl2.example/apk/base.apk"]
        );
        assert_eq!(manifest.splits[1].abi, Some(Abi::ArmeabiV7a));
        assert_eq!(manifest.splits[1].name, "config.armeabi_v7a");
        assert_eq!(manifest.splits[2].kind, SplitKind::LanguageConfig);
        assert_eq!(manifest.splits[2].urls.len(), 2);
        assert_eq!(myket.token().await.as_deref(), Some("cached"));
    }

    #[tokio::test]
    async fn test_rejected_token_is_refreshed_once() {
        let mut server = server_with_discovery().await;
        let auth = server
            .mock("POST", "/v1/devices/authorize/")
            .match_body(Matcher::PartialJson(json!({
                "supportedAbis": ["arm64-v8a", "armeabi-v7a", "armeabi"]
            })))
            .with_status(200)
            .with_body(r#"{"token": "fresh"}"#)
            .expect(1)
            .create_async()
            .await;
        let _stale = server
            .mock("GET", "/v2/applications/com.example.app")
            .match_header("authorization", "stale")
            .with_status(401)
            .create_async()
            .await;
        let _ok = server
            .mock("GET", "/v2/applications/com.example.app")
            .match_header("authorization", "fresh")
            .with_status(200)
            .with_body(r#"{"translatedMessage": "Not available in your country"}"#)
            .create_async()
            .await;

        let myket = client(&server, Some("stale"));
        let err = myket.resolve(&pkg(), Arch::Arm64).await.unwrap_err();
        assert!(err.is_absence());
        assert_eq!(myket.token().await.as_deref(), Some("fresh"));
        auth.assert_async().await;
    }

    #[tokio::test]
    async fn test_failed_registration_requires_auth() {
        let mut server = server_with_discovery().await;
        let _auth = server
            .mock("POST", "/v1/devices/authorize/")
            .with_status(500)
            .create_async()
            .await;

        let err = client(&server, None)
            .resolve(&pkg(), Arch::Arm64)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::AuthenticationRequired {
                store: Store::Myket,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_search_skips_ads() {
        let mut server = server_with_discovery().await;
        let _m = server
            .mock("GET", "/v2/applications/search/")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("query".into(), "telegram".into()),
                Matcher::UrlEncoded("tab".into(), "app_app".into()),
            ]))
            .with_status(200)
            .with_body(
                r#"{"items": [
                    {"app": {"application": {"packageName": "com.ad.app", "englishTitle": "Ad", "versionCode": 1, "adInfo": {"id": 3}}}},
                    {"app": {"application": {"packageName": "org.telegram.messenger", "englishTitle": "Telegram", "versionCode": 5020, "adInfo": null}}}
                ]}"#,
            )
            .create_async()
            .await;

        let hits = client(&server, Some("t")).search("telegram").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].display_name, "Telegram");
        assert_eq!(hits[0].version_code, Some(5020));
        assert_eq!(hits[0].store, Store::Myket);
    }
}
