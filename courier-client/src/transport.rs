//! The network seam of the dispatch pipeline.
//!
//! The pipeline composes requests and reconciles results; moving bytes is
//! the transport's problem. Tests script this trait with in-memory fakes.

use std::future::Future;

use courier_wire as wire;

use crate::errors::InvocationError;
use crate::media::{FileOrigin, FileReference};
use crate::message::PeerId;

/// Low-level network operations the dispatch pipeline depends on.
pub trait Transport: Send + Sync {
    /// Fire-and-forget "user is doing X" signal shown to the other side.
    /// Best effort; failures are not surfaced.
    fn send_action(&self, peer: PeerId, action: SendProgress);

    /// Execute `messages.sendMedia` and return the resulting update batch.
    fn send_media(
        &self,
        request: wire::functions::messages::SendMedia,
    ) -> impl Future<Output = Result<wire::types::Updates, InvocationError>> + Send;

    /// Ask the server for a fresh file reference for `origin`.
    ///
    /// `Ok(None)` means the origin could not be refreshed (media gone or
    /// origin unknown); the caller treats that as a terminal failure.
    fn refresh_file_reference(
        &self,
        origin: FileOrigin,
    ) -> impl Future<Output = Result<Option<FileReference>, InvocationError>> + Send;
}

/// Typing-style progress signal emitted just before a send.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SendProgress {
    Typing,
    UploadingPhoto,
    UploadingFile,
    ChoosingSticker,
    ChoosingLocation,
}
