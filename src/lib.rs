#![cfg_attr(doc, doc = include_str!("../README.md"))]

pub mod error;
pub mod live;
pub mod ws;

pub use error::Error;
pub use live::{BindingSession, Client, ListenerHandle, LiveMessage, Room, RoomHandlers, RoomScope};
pub use ws::config::{Config, ReconnectConfig};

use url::Url;

pub type Result<T> = std::result::Result<T, Error>;

/// Path suffix stripped when deriving the socket endpoint from an API origin.
pub const API_PATH_SUFFIX: &str = "/api";

/// Derive the WebSocket endpoint from the HTTP API origin.
///
/// `https`/`wss` origins map to `wss`, `http`/`ws` to `ws`; any other scheme
/// is rejected. A trailing slash and a trailing `/api` path segment are
/// dropped, so `https://podium.example/api` becomes `wss://podium.example/`.
pub fn socket_origin(api_origin: &str) -> Result<String> {
    let mut url = Url::parse(api_origin)?;

    let scheme = match url.scheme() {
        "https" | "wss" => "wss",
        "http" | "ws" => "ws",
        other => {
            return Err(Error::validation(format!(
                "unsupported API origin scheme `{other}`"
            )));
        }
    };
    url.set_scheme(scheme)
        .map_err(|()| Error::validation("API origin cannot carry a WebSocket scheme"))?;

    let path = url.path().trim_end_matches('/');
    let path = path.strip_suffix(API_PATH_SUFFIX).unwrap_or(path).to_owned();
    url.set_path(&path);

    Ok(String::from(url))
}
