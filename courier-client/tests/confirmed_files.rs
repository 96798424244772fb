//! Confirmed-upload dispatch: message shells, media-replacing edits and
//! album stamping.

mod common;

use std::sync::{Arc, Mutex};

use common::{make_sender, ScriptedTransport, SELF_ID};

use courier_client::media::MessageMedia;
use courier_client::message::{
    FullMsgId, MessageFlags, ReplyTo, SendOptions, TextWithEntities,
};
use courier_client::peers::Peer;
use courier_client::storage::{HistoryUpdate, QueuedUpload, SendState, FIRST_LOCAL_ID};
use courier_client::upload::{
    AlbumItem, FilePrepareResult, FileTo, SendMediaType, SendingAlbum,
};

const PEER: i64 = 42;

fn prepared(file_type: SendMediaType, caption: &str) -> FilePrepareResult {
    FilePrepareResult {
        task_id:   1,
        to:        FileTo { peer: PEER, ..Default::default() },
        file_type,
        media_id:  900,
        caption:   TextWithEntities::plain(caption),
        spoiler:   false,
        album:     None,
    }
}

#[test]
fn confirmed_photo_creates_a_pending_shell_and_queues_the_bytes() {
    let transport = ScriptedTransport::default();
    let sender = make_sender(transport.clone());
    sender.storage().add_peer(Peer::user(PEER, 11));
    let mut rx = sender.storage().subscribe_changes();

    sender.send_confirmed_file(prepared(SendMediaType::Photo, "  shot  "));

    let id = FullMsgId { peer: PEER, msg: FIRST_LOCAL_ID };
    let item = sender.storage().message(id).expect("shell exists");
    assert_eq!(item.state, SendState::Pending);
    assert!(item.flags.contains(MessageFlags::BEING_SENT | MessageFlags::OUTGOING));
    assert_eq!(item.from, SELF_ID);
    assert_eq!(item.caption.text, "shot");
    assert_eq!(item.media, Some(MessageMedia::Photo { photo: 900, spoiler: false }));
    assert_eq!(item.grouped_id, None);

    assert_eq!(
        sender.storage().queued_uploads(),
        vec![QueuedUpload { id, task_id: 1 }],
    );
    assert_eq!(rx.try_recv().unwrap(), HistoryUpdate::MessageSent { peer: PEER });
    // The bytes go out later; nothing hits the wire yet.
    assert!(transport.requests().is_empty());
}

#[test]
fn replacing_media_edits_in_place_and_keeps_counters() {
    let sender = make_sender(ScriptedTransport::default());
    sender.storage().add_peer(Peer::user(PEER, 11));
    let existing = FullMsgId { peer: PEER, msg: 77 };
    sender.storage().add_new_local_message(
        PEER,
        courier_client::storage::NewMessageDescriptor { id: 77, ..Default::default() },
        Some(MessageMedia::Photo { photo: 1, spoiler: false }),
        TextWithEntities::plain("old"),
    );
    sender.storage().with_message(existing, |item| {
        item.views = Some(40);
        item.forwards = Some(2);
    });
    let mut rx = sender.storage().subscribe_changes();

    let mut file = prepared(SendMediaType::Photo, "new");
    file.to.replace_media_of = Some(77);
    sender.send_confirmed_file(file);

    let item = sender.storage().message(existing).unwrap();
    assert_eq!(item.caption.text, "new");
    assert_eq!(item.media, Some(MessageMedia::Photo { photo: 900, spoiler: false }));
    assert_eq!(item.previous_media, Some(MessageMedia::Photo { photo: 1, spoiler: false }));
    assert_eq!(item.views, Some(40));
    assert_eq!(item.forwards, Some(2));

    // No fresh shell was allocated and no send notification fired.
    assert!(sender.storage().message(FullMsgId { peer: PEER, msg: FIRST_LOCAL_ID }).is_none());
    assert!(rx.try_recv().is_err());
    // The upload is addressed to the edited message.
    assert_eq!(sender.storage().queued_uploads()[0].id, existing);
}

#[test]
fn vanished_edit_target_degrades_to_a_local_send() {
    let sender = make_sender(ScriptedTransport::default());
    sender.storage().add_peer(Peer::user(PEER, 11));
    let mut rx = sender.storage().subscribe_changes();

    // The message being replaced was deleted while the file prepared.
    let mut file = prepared(SendMediaType::Photo, "late");
    file.to.replace_media_of = Some(77);
    sender.send_confirmed_file(file);

    // The shell and its upload land in local-id space, never at the dead
    // server id where a real message could reappear.
    assert!(sender.storage().message(FullMsgId { peer: PEER, msg: 77 }).is_none());
    let id = FullMsgId { peer: PEER, msg: FIRST_LOCAL_ID };
    let item = sender.storage().message(id).expect("fresh shell");
    assert_eq!(item.state, SendState::Pending);
    assert_eq!(item.caption.text, "late");
    assert_eq!(sender.storage().queued_uploads(), vec![QueuedUpload { id, task_id: 1 }]);
    assert_eq!(rx.try_recv().unwrap(), HistoryUpdate::MessageSent { peer: PEER });
}

#[test]
fn audio_replacement_always_sends_as_a_new_message() {
    let sender = make_sender(ScriptedTransport::default());
    sender.storage().add_peer(Peer::user(PEER, 11));

    let mut file = prepared(SendMediaType::Audio, "");
    file.to.replace_media_of = Some(77);
    sender.send_confirmed_file(file);

    let item = sender
        .storage()
        .message(FullMsgId { peer: PEER, msg: FIRST_LOCAL_ID })
        .expect("new shell");
    assert_eq!(
        item.media,
        Some(MessageMedia::Document {
            document:    900,
            voice:       true,
            ttl_seconds: None,
            spoiler:     false,
        }),
    );
    // Voice messages to non-broadcast peers start unread.
    assert!(item.flags.contains(MessageFlags::MEDIA_IS_UNREAD));
}

#[test]
fn audio_to_broadcast_is_not_marked_unread() {
    let sender = make_sender(ScriptedTransport::default());
    sender.storage().add_peer(Peer::channel(PEER, 11, false));

    sender.send_confirmed_file(prepared(SendMediaType::Audio, ""));

    let item = sender
        .storage()
        .message(FullMsgId { peer: PEER, msg: FIRST_LOCAL_ID })
        .unwrap();
    assert!(!item.flags.contains(MessageFlags::MEDIA_IS_UNREAD));
}

#[test]
fn scheduled_file_hides_the_edited_badge() {
    let sender = make_sender(ScriptedTransport::default());
    sender.storage().add_peer(Peer::user(PEER, 11));
    let mut rx = sender.storage().subscribe_changes();

    let mut file = prepared(SendMediaType::File, "doc");
    file.to.options = SendOptions { scheduled: Some(1_900_000_000), ..Default::default() };
    sender.send_confirmed_file(file);

    let item = sender
        .storage()
        .message(FullMsgId { peer: PEER, msg: FIRST_LOCAL_ID })
        .unwrap();
    assert!(item.flags.contains(MessageFlags::IS_OR_WAS_SCHEDULED | MessageFlags::HIDE_EDITED));
    assert_eq!(rx.try_recv().unwrap(), HistoryUpdate::ScheduledSent { peer: PEER });
}

#[test]
fn reply_target_is_topic_converted_for_new_shells() {
    let sender = make_sender(ScriptedTransport::default());
    sender.storage().add_peer(Peer::user(PEER, 11));
    sender.storage().set_topic_redirect(PEER, 300, 5);

    let mut file = prepared(SendMediaType::Photo, "");
    file.to.reply_to = Some(ReplyTo { message_id: 300, topic_root_id: Some(300) });
    sender.send_confirmed_file(file);

    let item = sender
        .storage()
        .message(FullMsgId { peer: PEER, msg: FIRST_LOCAL_ID })
        .unwrap();
    assert!(item.flags.contains(MessageFlags::HAS_REPLY_INFO));
    let reply = item.reply_to.unwrap();
    assert_eq!(reply.message_id, 5);
    // The topic root is remapped through the same redirects.
    assert_eq!(reply.topic_root_id, Some(5));
}

// ─── Albums ───────────────────────────────────────────────────────────────────

#[test]
fn album_items_are_stamped_with_their_message_ids() {
    let sender = make_sender(ScriptedTransport::default());
    sender.storage().add_peer(Peer::user(PEER, 11));

    let album = Arc::new(Mutex::new(SendingAlbum {
        group_id: 4242,
        items:    vec![
            AlbumItem { task_id: 1, msg_id: None },
            AlbumItem { task_id: 2, msg_id: None },
        ],
    }));

    let mut first = prepared(SendMediaType::Photo, "");
    first.album = Some(album.clone());
    sender.send_confirmed_file(first);

    let mut second = prepared(SendMediaType::Photo, "");
    second.task_id = 2;
    second.media_id = 901;
    second.album = Some(album.clone());
    sender.send_confirmed_file(second);

    let album = album.lock().unwrap();
    let first_id = album.items[0].msg_id.expect("first stamped");
    let second_id = album.items[1].msg_id.expect("second stamped");
    assert_eq!(first_id, FullMsgId { peer: PEER, msg: FIRST_LOCAL_ID });
    assert_eq!(second_id, FullMsgId { peer: PEER, msg: FIRST_LOCAL_ID + 1 });

    // Both shells share the album's grouping id.
    for id in [first_id, second_id] {
        assert_eq!(sender.storage().message(id).unwrap().grouped_id, Some(4242));
    }
}

#[test]
#[should_panic(expected = "album item for confirmed file")]
fn album_without_a_matching_item_is_a_bug() {
    let sender = make_sender(ScriptedTransport::default());
    sender.storage().add_peer(Peer::user(PEER, 11));

    let album = Arc::new(Mutex::new(SendingAlbum {
        group_id: 4242,
        items:    vec![AlbumItem { task_id: 9, msg_id: None }],
    }));
    let mut file = prepared(SendMediaType::Photo, "");
    file.album = Some(album);
    sender.send_confirmed_file(file);
}
