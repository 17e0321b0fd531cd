//! Handshake URL signing.
//!
//! The service authorizes the WebSocket upgrade through three query
//! parameters: `host`, `date` and `authorization`. The authorization value is
//! an HMAC-SHA256 signature over a canonical three-line string, wrapped in a
//! base64-encoded header bundle.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use time::OffsetDateTime;
use time::macros::format_description;
use tokio_tungstenite::tungstenite::http::Uri;
use tracing::debug;
use url::{Url, form_urlencoded};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::base::{AiuiError, AiuiResult};

/// Signature algorithm announced in the authorization bundle.
pub const SIGNATURE_ALGORITHM: &str = "hmac-sha256";

/// Header list announced in the authorization bundle.
pub const SIGNED_HEADERS: &str = "host date request-line";

type HmacSha256 = Hmac<Sha256>;

/// Format a timestamp as RFC-1123 with a literal `GMT` zone token.
///
/// Both the signature and the service's clock-skew check depend on this exact
/// textual form, e.g. `Sun, 03 Sep 2023 16:47:59 GMT`.
pub fn format_http_date(at: OffsetDateTime) -> AiuiResult<String> {
    let format = format_description!(
        "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT"
    );
    at.to_offset(time::UtcOffset::UTC)
        .format(&format)
        .map_err(|e| AiuiError::Signing(format!("failed to format date: {e}")))
}

/// Build the canonical string that is signed.
pub fn canonical_string(host: &str, date: &str, path: &str) -> String {
    format!("host: {host}\ndate: {date}\nGET {path} HTTP/1.1")
}

/// HMAC-SHA256 over `data` keyed by `secret`, base64-encoded.
pub fn hmac_sha256_base64(data: &str, secret: &str) -> AiuiResult<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AiuiError::Signing(format!("invalid signing key: {e}")))?;
    mac.update(data.as_bytes());
    Ok(BASE64.encode(mac.finalize().into_bytes()))
}

/// Signs handshake URLs for one set of credentials.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct RequestSigner {
    api_key: String,
    api_secret: String,
}

impl RequestSigner {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }

    /// Sign `base_url` with the current UTC time.
    pub fn sign(&self, base_url: &str) -> AiuiResult<String> {
        self.sign_at(base_url, OffsetDateTime::now_utc())
    }

    /// Sign `base_url` for an explicit timestamp.
    pub fn sign_at(&self, base_url: &str, at: OffsetDateTime) -> AiuiResult<String> {
        let (host, path) = host_and_path(base_url)?;
        let date = format_http_date(at)?;
        let signature =
            hmac_sha256_base64(&canonical_string(&host, &date, &path), &self.api_secret)?;
        let authorization = BASE64.encode(format!(
            "api_key=\"{}\", algorithm=\"{}\", headers=\"{}\", signature=\"{}\"",
            self.api_key, SIGNATURE_ALGORITHM, SIGNED_HEADERS, signature
        ));

        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("authorization", &authorization)
            .append_pair("date", &date)
            .append_pair("host", &host)
            .finish();

        debug!(host = %host, date = %date, "Signed handshake URL");
        Ok(format!("{base_url}?{query}"))
    }
}

/// Sign `base_url` with the current UTC time.
pub fn sign(base_url: &str, api_key: &str, api_secret: &str) -> AiuiResult<String> {
    RequestSigner::new(api_key, api_secret).sign(base_url)
}

/// Extract the `Host` value and the request path.
///
/// The host is the URL authority without user info, exactly as the WebSocket
/// client sends it in the `Host` header. An explicit port is kept even when it
/// is the scheme default.
fn host_and_path(base_url: &str) -> AiuiResult<(String, String)> {
    let url = Url::parse(base_url)
        .map_err(|e| AiuiError::Signing(format!("invalid base URL '{base_url}': {e}")))?;
    let uri: Uri = base_url
        .parse()
        .map_err(|e| AiuiError::Signing(format!("invalid base URL '{base_url}': {e}")))?;

    let authority = uri.authority().map(|a| a.as_str()).unwrap_or_default();
    let host = match authority.rsplit_once('@') {
        Some((_, host)) => host,
        None => authority,
    };
    if host.is_empty() {
        return Err(AiuiError::Signing(format!("base URL '{base_url}' has no host")));
    }

    Ok((host.to_string(), url.path().to_string()))
}
