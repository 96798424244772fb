//! Media objects referenced by sends, and their wire inputs.
//!
//! File references are short-lived server-issued capability tokens. They
//! expire; the dispatch pipeline refreshes them through the transport and
//! rebuilds the input media from the *current* reference on retry.

use courier_wire as wire;

use crate::message::FullMsgId;

/// Server-issued capability token for a previously uploaded blob.
pub type FileReference = Vec<u8>;

/// Where a media object was first seen — the transport needs this to
/// re-request a fresh file reference.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FileOrigin {
    None,
    Photo(i64),
    Document(i64),
    Message(FullMsgId),
}

// ─── Photo / Document ─────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
pub struct Photo {
    pub id:             i64,
    pub access_hash:    i64,
    pub file_reference: FileReference,
}

impl Photo {
    pub fn input_media(&self) -> wire::enums::InputMedia {
        wire::enums::InputMedia::Photo(wire::types::InputMediaPhoto {
            id: wire::types::InputPhoto {
                id:             self.id,
                access_hash:    self.access_hash,
                file_reference: self.file_reference.clone(),
            },
            ttl_seconds: None,
            spoiler:     false,
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    pub id:             i64,
    pub access_hash:    i64,
    pub file_reference: FileReference,
    pub is_sticker:     bool,
    pub is_voice:       bool,
    /// Set for external (web) documents sent by url.
    pub web_url:        Option<String>,
}

impl Document {
    pub fn new(id: i64, access_hash: i64, file_reference: FileReference) -> Self {
        Self {
            id,
            access_hash,
            file_reference,
            is_sticker: false,
            is_voice: false,
            web_url: None,
        }
    }

    pub fn input_media(&self) -> wire::enums::InputMedia {
        wire::enums::InputMedia::Document(wire::types::InputMediaDocument {
            id: wire::types::InputDocument {
                id:             self.id,
                access_hash:    self.access_hash,
                file_reference: self.file_reference.clone(),
            },
            ttl_seconds: None,
            query:       None,
        })
    }

    /// Wire input for sending this document by its web url.
    pub fn input_media_external(&self) -> Option<wire::enums::InputMedia> {
        let url = self.web_url.clone()?;
        Some(wire::enums::InputMedia::DocumentExternal(
            wire::types::InputMediaDocumentExternal { url, ttl_seconds: None },
        ))
    }
}

// ─── Locally rendered media ───────────────────────────────────────────────────

/// Media attached to a locally rendered history item. Photos and documents
/// are referenced by id — the objects themselves live in storage so a
/// reference refresh is visible everywhere at once.
#[derive(Clone, Debug, PartialEq)]
pub enum MessageMedia {
    Photo {
        photo:   i64,
        spoiler: bool,
    },
    Document {
        document:    i64,
        voice:       bool,
        ttl_seconds: Option<i32>,
        spoiler:     bool,
    },
    Dice {
        /// Server-rolled value; zero until delivered.
        value:    i32,
        emoticon: String,
    },
    GeoPoint {
        lat:  f64,
        long: f64,
    },
}

/// A geographic point picked in the compose UI.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LocationPoint {
    pub lat:  f64,
    pub long: f64,
}

impl LocationPoint {
    pub fn input_media(&self) -> wire::enums::InputMedia {
        wire::enums::InputMedia::GeoPoint(wire::types::InputMediaGeoPoint {
            geo_point: wire::types::InputGeoPoint {
                lat:             self.lat,
                long:            self.long,
                accuracy_radius: None,
            },
        })
    }
}
