//! Scripted in-memory transport shared by the integration tests.

// Not every test binary touches every helper.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex};

use courier_client::errors::{InvocationError, RpcError};
use courier_client::media::{FileOrigin, FileReference};
use courier_client::message::PeerId;
use courier_client::storage::Storage;
use courier_client::transport::{SendProgress, Transport};
use courier_client::{AppConfig, Sender, SessionInfo};
use courier_wire::functions::messages::SendMedia;
use courier_wire::types::{UpdateMessageId, Updates};

pub const SELF_ID: i64 = 1000;

/// One scripted reply to a `send_media` call.
#[derive(Clone, Debug)]
pub enum Scripted {
    /// Acknowledge with an `updateMessageID` carrying this server id.
    AckWith(i32),
    /// Acknowledge with an empty update batch.
    AckEmpty,
    /// Reject with an RPC error.
    Fail(i32, &'static str),
}

#[derive(Default)]
struct Inner {
    script:          Mutex<VecDeque<Scripted>>,
    requests:        Mutex<Vec<SendMedia>>,
    actions:         Mutex<Vec<(PeerId, SendProgress)>>,
    refreshes:       Mutex<Vec<FileOrigin>>,
    /// Reference handed out by `refresh_file_reference`; `None` refuses.
    fresh_reference: Mutex<Option<FileReference>>,
}

/// Cheaply cloneable so a test keeps a handle after the sender takes one.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    inner: Arc<Inner>,
}

impl ScriptedTransport {
    pub fn scripted(replies: impl IntoIterator<Item = Scripted>) -> Self {
        let transport = Self::default();
        *transport.inner.script.lock().unwrap() = replies.into_iter().collect();
        transport
    }

    pub fn set_fresh_reference(&self, reference: Option<FileReference>) {
        *self.inner.fresh_reference.lock().unwrap() = reference;
    }

    pub fn requests(&self) -> Vec<SendMedia> {
        self.inner.requests.lock().unwrap().clone()
    }

    pub fn actions(&self) -> Vec<(PeerId, SendProgress)> {
        self.inner.actions.lock().unwrap().clone()
    }

    pub fn refreshes(&self) -> Vec<FileOrigin> {
        self.inner.refreshes.lock().unwrap().clone()
    }
}

impl Transport for ScriptedTransport {
    fn send_action(&self, peer: PeerId, action: SendProgress) {
        self.inner.actions.lock().unwrap().push((peer, action));
    }

    fn send_media(
        &self,
        request: SendMedia,
    ) -> impl Future<Output = Result<Updates, InvocationError>> + Send {
        let random_id = request.random_id;
        self.inner.requests.lock().unwrap().push(request);
        let reply = self
            .inner
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Scripted::AckEmpty);
        let result = match reply {
            Scripted::AckWith(id) => Ok(Updates {
                updates: vec![courier_wire::enums::Update::MessageId(UpdateMessageId {
                    id,
                    random_id,
                })],
            }),
            Scripted::AckEmpty => Ok(Updates::default()),
            Scripted::Fail(code, name) => {
                Err(InvocationError::Rpc(RpcError::from_server(code, name)))
            }
        };
        async move { result }
    }

    fn refresh_file_reference(
        &self,
        origin: FileOrigin,
    ) -> impl Future<Output = Result<Option<FileReference>, InvocationError>> + Send {
        self.inner.refreshes.lock().unwrap().push(origin);
        let reference = self.inner.fresh_reference.lock().unwrap().clone();
        async move { Ok(reference) }
    }
}

pub fn make_sender(transport: ScriptedTransport) -> Sender<ScriptedTransport> {
    make_sender_with_config(transport, AppConfig::default())
}

pub fn make_sender_with_config(
    transport: ScriptedTransport,
    config:    AppConfig,
) -> Sender<ScriptedTransport> {
    let session = SessionInfo {
        user_id:     SELF_ID,
        access_hash: 7777,
        name:        "Alice".into(),
    };
    Sender::new(transport, Arc::new(Storage::new()), session, config)
}
