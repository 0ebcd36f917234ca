//! WebSocket connection bootstrap

use anyhow::Context;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

/// The full-duplex stream a session owns for its lifetime.
pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Open the game connection, identifying with a `name` header carrying the
/// human-readable display name.
pub async fn connect(url: &str, display_name: &str) -> anyhow::Result<WsStream> {
    let mut request = url.into_client_request().context("invalid server url")?;
    request.headers_mut().insert(
        "name",
        HeaderValue::from_str(display_name).context("display name is not a valid header value")?,
    );

    let (stream, _response) = connect_async(request)
        .await
        .context("websocket handshake failed")?;
    Ok(stream)
}
