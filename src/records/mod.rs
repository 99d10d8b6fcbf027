//! Record-level structure of the inflated stream and its trailing bytes.
//!
//! - [`frame`]: splits the inflated buffer into length-prefixed message
//!   bodies
//! - [`footer`]: interprets the bytes after the deflate stream (gzip
//!   trailer plus the optional result footer)
//!
//! # Example
//!
//! ```
//! use sgreplay_parser::records::{encode_frames, MessageFramer};
//!
//! let data = encode_frames([&b"\x08\x01"[..], &b"\x08\x02"[..]]);
//! let bodies: Vec<&[u8]> = MessageFramer::new(&data)
//!     .map(|frame| frame.map(|f| f.body))
//!     .collect::<Result<_, _>>()
//!     .unwrap();
//! assert_eq!(bodies, vec![&b"\x08\x01"[..], &b"\x08\x02"[..]]);
//! ```

pub mod footer;
pub mod frame;

pub use footer::{
    recover_footer, Footer, FooterRecovery, GzipTrailer, Outcome, PlayerResult, TRAILER_SIZE,
};
pub use frame::{encode_frames, MessageFramer, RawFrame};
