//! RPC request constructors.
//!
//! Requests carry their flag word explicitly: the pipeline computes the
//! exact bit set up front and the transport serializes it verbatim. The
//! bit assignment is part of the server contract and must not drift.

pub mod messages {
    use std::ops::{BitOr, BitOrAssign};

    use crate::enums;

    /// Flag bits of [`SendMedia`], matching the server's enumeration.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct SendMediaFlags(pub u32);

    impl SendMediaFlags {
        pub const REPLY_TO:             Self = Self(1 << 0);
        pub const REPLY_MARKUP:         Self = Self(1 << 2);
        pub const ENTITIES:             Self = Self(1 << 3);
        pub const SILENT:               Self = Self(1 << 5);
        pub const BACKGROUND:           Self = Self(1 << 6);
        pub const CLEAR_DRAFT:          Self = Self(1 << 7);
        pub const SCHEDULE_DATE:        Self = Self(1 << 10);
        pub const SEND_AS:              Self = Self(1 << 13);
        pub const NOFORWARDS:           Self = Self(1 << 14);
        pub const UPDATE_STICKERSETS:   Self = Self(1 << 15);
        pub const INVERT_MEDIA:         Self = Self(1 << 16);
        pub const QUICK_REPLY_SHORTCUT: Self = Self(1 << 17);

        pub fn empty() -> Self {
            Self(0)
        }

        pub fn contains(self, other: Self) -> bool {
            self.0 & other.0 == other.0
        }
    }

    impl BitOr for SendMediaFlags {
        type Output = Self;
        fn bitor(self, rhs: Self) -> Self {
            Self(self.0 | rhs.0)
        }
    }

    impl BitOrAssign for SendMediaFlags {
        fn bitor_assign(&mut self, rhs: Self) {
            self.0 |= rhs.0;
        }
    }

    /// `messages.sendMedia` — sends a single media message.
    ///
    /// `schedule_date` is `0` for an immediate send, a Unix timestamp
    /// otherwise (mirrored by [`SendMediaFlags::SCHEDULE_DATE`]).
    #[derive(Clone, Debug, PartialEq)]
    pub struct SendMedia {
        pub flags:                SendMediaFlags,
        pub peer:                 enums::InputPeer,
        pub reply_to:             Option<enums::InputReplyTo>,
        pub media:                enums::InputMedia,
        pub message:              String,
        pub random_id:            i64,
        pub entities:             Vec<enums::MessageEntity>,
        pub schedule_date:        i32,
        pub send_as:              enums::InputPeer,
        pub quick_reply_shortcut: Option<enums::InputQuickReplyShortcut>,
    }
}
