//! Gmail API response shapes.
//!
//! Only the fields guardrelay reads are modelled; everything else in the
//! response is ignored.

use serde::Deserialize;

/// `users.messages.list` response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageList {
    /// Absent (not empty) when nothing matches the query.
    #[serde(default)]
    pub messages: Vec<MessageRef>,
}

/// Message id as returned by a list call. Newest first.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageRef {
    pub id: String,
}

/// `users.messages.get` response (`format=full`).
#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub id: String,
    #[serde(default)]
    pub payload: Option<MessagePart>,
}

/// One node of the MIME tree.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessagePart {
    #[serde(default)]
    pub body: Option<MessagePartBody>,
    #[serde(default)]
    pub parts: Vec<MessagePart>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessagePartBody {
    /// URL-safe base64 content. Missing for multipart containers and
    /// attachments.
    #[serde(default)]
    pub data: Option<String>,
}

impl MessagePart {
    /// Encoded body data of this part and all nested parts, depth first
    /// with a part's own body before its children.
    pub fn encoded_bodies(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_bodies(&mut out);
        out
    }

    fn collect_bodies<'a>(&'a self, out: &mut Vec<&'a str>) {
        if let Some(data) = self
            .body
            .as_ref()
            .and_then(|b| b.data.as_deref())
            .filter(|d| !d.is_empty())
        {
            out.push(data);
        }
        for part in &self.parts {
            part.collect_bodies(out);
        }
    }
}
