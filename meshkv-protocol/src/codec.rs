use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::msg::Msg;

/// Default read timeout for a framed message (§6): a peer that hasn't
/// finished sending within this window is treated the same as one that
/// never connected.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(3);

/// Default dial timeout used when opening a new connection to a peer.
pub const DEFAULT_DIAL_TIMEOUT: Duration = Duration::from_secs(3);

const MAX_MESSAGE_BYTES: u32 = 64 * 1024 * 1024;

/// Write a `Msg` as a 4-byte big-endian length prefix followed by its
/// JSON encoding.
pub async fn write_msg<W: AsyncWriteExt + Unpin>(writer: &mut W, msg: &Msg) -> std::io::Result<()> {
    let payload = serde_json::to_vec(msg)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    writer.write_u32(payload.len() as u32).await?;
    writer.write_all(&payload).await?;
    writer.flush().await
}

/// Read one framed message, bounded by `DEFAULT_READ_TIMEOUT`. A
/// decode failure (bad length, truncated body, invalid JSON) yields
/// `Ok(None)` rather than an error — the spec treats a malformed
/// message as a null message to ignore, not a protocol fault worth
/// tearing the connection down over (§6/§7).
pub async fn read_msg<R: AsyncReadExt + Unpin>(reader: &mut R) -> std::io::Result<Option<Msg>> {
    tokio::time::timeout(DEFAULT_READ_TIMEOUT, read_msg_untimed(reader))
        .await
        .unwrap_or(Ok(None))
}

/// Read one framed message with no timeout — used by accept loops that
/// block waiting for a peer's first message rather than racing a clock.
pub async fn read_msg_untimed<R: AsyncReadExt + Unpin>(reader: &mut R) -> std::io::Result<Option<Msg>> {
    let len = match reader.read_u32().await {
        Ok(len) => len,
        Err(_) => return Ok(None),
    };
    if len == 0 || len > MAX_MESSAGE_BYTES {
        return Ok(None);
    }

    let mut buf = vec![0u8; len as usize];
    if reader.read_exact(&mut buf).await.is_err() {
        return Ok(None);
    }

    Ok(serde_json::from_slice(&buf).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshkv_core::{NodeInfo, RaftRole, Role, Status};
    use crate::msg::Head;

    fn info() -> NodeInfo {
        NodeInfo {
            id: "node-a".into(),
            ip: "10.0.0.1".into(),
            group: "default".into(),
            name: "node-a".into(),
            status: Status::Alive,
            role: Role::AnyRole,
            raft_role: RaftRole::Follower,
            last_log_id: 0,
            last_service_log_id: 0,
            version: "0".into(),
            score: 0,
            score_count: 0,
        }
    }

    #[tokio::test]
    async fn round_trips_over_a_duplex_stream() {
        let (mut client, mut server) = tokio::io::duplex(4096);
        let msg = Msg::new(Head::Hi, "hello", info());

        write_msg(&mut client, &msg).await.unwrap();
        let received = read_msg(&mut server).await.unwrap().unwrap();
        assert_eq!(received.body, "hello");
        assert!(matches!(received.head, Head::Hi));
    }

    #[tokio::test]
    async fn truncated_stream_decodes_as_none() {
        let (mut client, mut server) = tokio::io::duplex(4096);
        client.write_u32(100).await.unwrap();
        client.write_all(b"short").await.unwrap();
        drop(client);

        let result = read_msg(&mut server).await.unwrap();
        assert!(result.is_none());
    }
}
