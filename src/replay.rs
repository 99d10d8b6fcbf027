//! End-to-end pipeline from replay bytes to a [`Game`].

use std::fs;
use std::path::Path;

use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::anomaly::{Anomaly, AnomalyKind};
use crate::assets::AssetTable;
use crate::config::ParseOptions;
use crate::decompress::{decompress, Inflated};
use crate::error::{FramingError, Result};
use crate::events::EventIterator;
use crate::header::{read_container, ReplayHeader};
use crate::records::{recover_footer, FooterRecovery, MessageFramer};
use crate::stats::{Game, GameBuilder, ReplayMetadata};
use crate::wire::json::to_json;
use crate::wire::FieldTree;

/// A replay after header validation and inflation, before any message is
/// decoded.
#[derive(Debug, Clone)]
pub struct DecodedReplay<'a> {
    /// The container header.
    pub header: ReplayHeader,
    /// The inflated stream and the bytes that followed it.
    pub inflated: Inflated<'a>,
}

impl DecodedReplay<'_> {
    /// Returns a framer over the inflated messages.
    #[must_use]
    pub fn messages(&self) -> MessageFramer<'_> {
        MessageFramer::new(&self.inflated.data)
    }

    /// Returns an event iterator over the inflated messages.
    #[must_use]
    pub fn events(&self) -> EventIterator<'_> {
        EventIterator::new(&self.inflated.data)
    }

    /// Renders every message as a JSON object holding its index, offset
    /// and either its fields or the reason they did not decode.
    ///
    /// Nested messages are expanded up to `options.render_depth` levels.
    pub fn render_messages<'s>(
        &'s self,
        options: &ParseOptions,
    ) -> impl Iterator<Item = std::result::Result<Value, FramingError>> + 's {
        let depth = options.render_depth;
        self.messages().map(move |frame| {
            let frame = frame?;
            Ok(match FieldTree::parse(frame.body) {
                Ok(tree) => json!({
                    "index": frame.index,
                    "offset": frame.offset,
                    "fields": to_json(&tree, depth),
                }),
                Err(e) => json!({
                    "index": frame.index,
                    "offset": frame.offset,
                    "error": e.to_string(),
                }),
            })
        })
    }

    /// Interprets the bytes after the deflate stream.
    #[must_use]
    pub fn footer(&self) -> FooterRecovery {
        recover_footer(self.inflated.trailing, self.inflated.data.len())
    }
}

/// Validates the header and inflates the payload.
///
/// # Errors
///
/// Returns a format error before any decompression is attempted if the
/// header is invalid, or a decompression error for a damaged stream.
pub fn decode_container(data: &[u8]) -> Result<DecodedReplay<'_>> {
    let container = read_container(data)?;
    debug!(
        version = container.header.version,
        changelist = container.header.changelist,
        payload = container.payload.len(),
        "container header ok"
    );

    let inflated = decompress(container.payload)?;
    debug!(
        compressed = inflated.compressed_len,
        inflated = inflated.data.len(),
        trailing = inflated.trailing.len(),
        "payload inflated"
    );

    Ok(DecodedReplay {
        header: container.header,
        inflated,
    })
}

/// Parses a replay held in memory.
///
/// # Errors
///
/// Header and decompression failures abort the parse. A framing failure
/// does not: the events decoded so far are kept and the game is marked
/// truncated.
///
/// # Example
///
/// ```no_run
/// use sgreplay_parser::{parse_replay, ParseOptions};
///
/// let data = std::fs::read("match.SGReplay").unwrap();
/// let game = parse_replay(&data, &ParseOptions::default()).unwrap();
/// println!("{} on {:?}", game.duration, game.map_name);
/// ```
pub fn parse_replay(data: &[u8], options: &ParseOptions) -> Result<Game> {
    parse_replay_with_assets(data, options, None)
}

/// Parses a replay, resolving names through `assets` where it can.
///
/// # Errors
///
/// See [`parse_replay`].
pub fn parse_replay_with_assets(
    data: &[u8],
    options: &ParseOptions,
    assets: Option<&AssetTable>,
) -> Result<Game> {
    let decoded = decode_container(data)?;
    let recovery = decoded.footer();
    let tick_rate = options.tick_rate_for(decoded.header.changelist);

    let mut anomalies = recovery.anomalies;
    let mut truncated = false;
    let mut builder = GameBuilder::new(tick_rate).keep_events(options.keep_events);

    let mut events = decoded.events();
    for result in events.by_ref() {
        match result {
            Ok(event) => builder.record(event),
            Err(e) => {
                warn!(error = %e, "message stream ends early");
                truncated = true;
                anomalies.push(Anomaly::new(AnomalyKind::TruncatedStream, e.to_string()));
            }
        }
    }

    let mut extractor = events.into_extractor();
    anomalies.extend(extractor.take_anomalies());

    let meta = ReplayMetadata {
        header: decoded.header,
        gzip_header: decoded.inflated.gzip_header.clone(),
        trailer: recovery.trailer,
        footer: recovery.footer,
        stream_map_name: extractor.map_name().map(str::to_owned),
        message_count: extractor.message_count(),
        anomalies,
        truncated,
    };
    Ok(builder.finish(meta, assets))
}

/// Reads and parses a replay file.
///
/// # Errors
///
/// Returns [`crate::ParserError::IoError`] if the file cannot be read, or
/// any [`parse_replay`] error.
pub fn parse_file<P: AsRef<Path>>(path: P, options: &ParseOptions) -> Result<Game> {
    parse_file_with_assets(path, options, None)
}

/// Reads and parses a replay file with name resolution.
///
/// # Errors
///
/// See [`parse_file`].
pub fn parse_file_with_assets<P: AsRef<Path>>(
    path: P,
    options: &ParseOptions,
    assets: Option<&AssetTable>,
) -> Result<Game> {
    let data = fs::read(path.as_ref())?;
    debug!(path = %path.as_ref().display(), bytes = data.len(), "read replay");
    parse_replay_with_assets(&data, options, assets)
}
