//! Wire format: one JSON object per line.
//!
//! ```json
//! {"type":"request","name":"pages","id":"7","args":[12]}
//! {"type":"response","name":"pages","id":"7","result":{"root":"/tmp/12","files":["01.png"]}}
//! {"type":"response","name":"pages","id":"8","error":{"code":"not_found","message":"..."}}
//! ```

use crate::error::{ErrorKind, Result};
use derive_more::{Display, Error};
use exn::ResultExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

/// A failure reported by a handler, carried across the wire as-is.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[display("{code}: {message}")]
pub struct RemoteError {
    /// Short machine-readable category, for example `not_found`.
    pub code: String,
    pub message: String,
}
impl RemoteError {
    pub const UNKNOWN_FUNCTION: &'static str = "unknown_function";
    pub const BAD_ARGUMENTS: &'static str = "bad_arguments";
    pub const INTERNAL: &'static str = "internal";

    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self { code: code.into(), message: message.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Envelope {
    Request {
        name: String,
        id: String,
        #[serde(default)]
        args: Value,
    },
    Response {
        name: String,
        id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<RemoteError>,
    },
}
impl Envelope {
    pub fn response(name: String, id: String, outcome: std::result::Result<Value, RemoteError>) -> Self {
        match outcome {
            Ok(result) => Self::Response { name, id, result: Some(result), error: None },
            Err(error) => Self::Response { name, id, result: None, error: Some(error) },
        }
    }
}

/// Read the next envelope. `Ok(None)` at end of stream; blank lines are
/// skipped.
pub(crate) async fn read_envelope<R>(reader: &mut R, line: &mut String) -> Result<Option<Envelope>>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        line.clear();
        let read = reader.read_line(line).await.or_raise(|| ErrorKind::Transport)?;
        if read == 0 {
            return Ok(None);
        }
        if line.trim().is_empty() {
            continue;
        }
        return serde_json::from_str(line.trim_end()).map(Some).or_raise(|| ErrorKind::Codec);
    }
}

pub(crate) async fn write_envelope<W>(writer: &mut W, envelope: &Envelope) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut bytes = serde_json::to_vec(envelope).or_raise(|| ErrorKind::Codec)?;
    bytes.push(b'\n');
    writer.write_all(&bytes).await.or_raise(|| ErrorKind::Transport)?;
    writer.flush().await.or_raise(|| ErrorKind::Transport)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::BufReader;

    #[test]
    fn test_wire_shape() {
        let request = Envelope::Request { name: "pages".to_string(), id: "7".to_string(), args: json!([12]) };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"type": "request", "name": "pages", "id": "7", "args": [12]})
        );
        let failed = Envelope::response("pages".to_string(), "8".to_string(), Err(RemoteError::new("not_found", "gone")));
        assert_eq!(
            serde_json::to_value(&failed).unwrap(),
            json!({"type": "response", "name": "pages", "id": "8", "error": {"code": "not_found", "message": "gone"}})
        );
    }

    #[tokio::test]
    async fn test_read_skips_blank_lines_and_stops_at_eof() {
        let input = b"\n{\"type\":\"request\",\"name\":\"ping\",\"id\":\"1\"}\n\n".to_vec();
        let mut reader = BufReader::new(input.as_slice());
        let mut line = String::new();
        let first = read_envelope(&mut reader, &mut line).await.unwrap();
        assert_eq!(first, Some(Envelope::Request { name: "ping".to_string(), id: "1".to_string(), args: Value::Null }));
        assert_eq!(read_envelope(&mut reader, &mut line).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_read_rejects_garbage() {
        let mut reader = BufReader::new(&b"not json\n"[..]);
        let err = read_envelope(&mut reader, &mut String::new()).await.unwrap_err();
        assert_eq!(*err, ErrorKind::Codec);
    }
}
