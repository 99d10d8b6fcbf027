//! Event extraction from the inflated message stream.
//!
//! Every top-level message carries a tick (field 1), an issuing player
//! (field 2) and an envelope (field 3) whose content message (3.1) holds
//! one or more actions keyed by field number. The extractor looks each
//! action up in [`dispatch::ACTION_TABLE`] and projects it into a typed
//! [`EventContent`]; actions outside the table become
//! [`EventContent::Unknown`] with their fields intact.
//!
//! # Example
//!
//! ```
//! use sgreplay_parser::events::{EventContent, EventIterator};
//! use sgreplay_parser::records::encode_frames;
//! use sgreplay_parser::wire::MessageBuilder;
//!
//! let body = MessageBuilder::new()
//!     .varint(1, 42)
//!     .varint(2, 1)
//!     .message(3, MessageBuilder::new().message(
//!         1,
//!         MessageBuilder::new().message(37, MessageBuilder::new().varint(2, 1).string(3, "Alice")),
//!     ))
//!     .build();
//! let data = encode_frames([body.as_slice()]);
//!
//! let events: Vec<_> = EventIterator::new(&data).collect::<Result<_, _>>().unwrap();
//! assert_eq!(events.len(), 1);
//! assert_eq!(events[0].frame, 42);
//! assert!(matches!(events[0].content, EventContent::PlayerInfo(_)));
//! ```

pub mod dispatch;
pub mod extract;
pub mod types;

pub use dispatch::{lookup_action, ActionKind, ACTION_TABLE};
pub use extract::{find_map_name, EventExtractor, EventIterator, MAP_SCAN_LIMIT};
pub use types::{
    AbilityData, ChatOrProfile, Command, EventContent, MapInfo, PlayerInfo, Point, ReplayEvent,
    SpawnEvent, SyncData, TargetData,
};
