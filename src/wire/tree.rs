//! Schema-less decoded messages.

use std::borrow::Cow;

use indexmap::IndexMap;

use super::value::{WireKind, WireValue};
use super::varint::{decode_varint, encode_varint, VarintError};
use crate::error::WireFormatError;

/// Largest field number a tag may carry.
pub const MAX_FIELD_NUMBER: u64 = (1 << 29) - 1;

/// A decoded message: field number to the values seen for it.
///
/// Repeated fields keep every value in arrival order. Fields are iterated
/// in first-seen order, and [`FieldTree::entries`] replays every value in
/// the order it was decoded, interleaving fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldTree<'a> {
    fields: IndexMap<u32, Vec<WireValue<'a>>>,
    // field number of each value, in arrival order
    order: Vec<u32>,
}

impl<'a> FieldTree<'a> {
    /// Creates an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes one message body.
    ///
    /// Length-delimited values borrow from `data` and are not interpreted
    /// further. Unknown field numbers are kept like any other.
    ///
    /// # Errors
    ///
    /// `WireFormatError` if a tag carries wire kind 3, 4, 6 or 7, a field
    /// number of 0 or above 2^29 - 1, or a value runs past the end of
    /// `data`.
    ///
    /// # Example
    ///
    /// ```
    /// use sgreplay_parser::wire::FieldTree;
    ///
    /// // field 1 = 150, field 2 = "hi"
    /// let tree = FieldTree::parse(&[0x08, 0x96, 0x01, 0x12, 0x02, b'h', b'i']).unwrap();
    /// assert_eq!(tree.varint(1), Some(150));
    /// assert_eq!(tree.string(2), Some("hi"));
    /// ```
    pub fn parse(data: &'a [u8]) -> Result<Self, WireFormatError> {
        let mut tree = FieldTree::new();
        let mut pos = 0;

        while pos < data.len() {
            let tag_offset = pos;
            let (tag, n) = read_varint(data, pos)?;
            pos += n;

            let field_number = tag >> 3;
            #[allow(clippy::cast_possible_truncation)]
            let bits = (tag & 0x07) as u8;

            let Some(kind) = WireKind::from_tag_bits(bits) else {
                return Err(WireFormatError::InvalidWireKind {
                    kind: bits,
                    field_number,
                    offset: tag_offset,
                });
            };
            if field_number == 0 || field_number > MAX_FIELD_NUMBER {
                return Err(WireFormatError::InvalidFieldNumber {
                    field_number,
                    offset: tag_offset,
                });
            }

            let value = match kind {
                WireKind::Varint => {
                    let (v, n) = read_varint(data, pos)?;
                    pos += n;
                    WireValue::Varint(v)
                }
                WireKind::Fixed64 => {
                    let bytes = take(data, pos, 8)?;
                    pos += 8;
                    let mut buf = [0u8; 8];
                    buf.copy_from_slice(bytes);
                    WireValue::Fixed64(u64::from_le_bytes(buf))
                }
                WireKind::LengthDelimited => {
                    let (len, n) = read_varint(data, pos)?;
                    pos += n;
                    let len = usize::try_from(len).unwrap_or(usize::MAX);
                    let bytes = take(data, pos, len)?;
                    pos += len;
                    WireValue::LengthDelimited(Cow::Borrowed(bytes))
                }
                WireKind::Fixed32 => {
                    let bytes = take(data, pos, 4)?;
                    pos += 4;
                    WireValue::Fixed32(u32::from_le_bytes([
                        bytes[0], bytes[1], bytes[2], bytes[3],
                    ]))
                }
            };

            #[allow(clippy::cast_possible_truncation)]
            let field = field_number as u32;
            tree.push(field, value);
        }

        Ok(tree)
    }

    /// Appends a value to a field.
    pub fn push(&mut self, field: u32, value: WireValue<'a>) {
        self.fields.entry(field).or_default().push(value);
        self.order.push(field);
    }

    /// Removes a field and returns its values.
    ///
    /// The remaining fields keep their relative order.
    pub fn remove(&mut self, field: u32) -> Vec<WireValue<'a>> {
        let Some(values) = self.fields.shift_remove(&field) else {
            return Vec::new();
        };
        self.order.retain(|&f| f != field);
        values
    }

    /// Returns the first value of a field.
    #[must_use]
    pub fn get(&self, field: u32) -> Option<&WireValue<'a>> {
        self.fields.get(&field).and_then(|values| values.first())
    }

    /// Returns every value of a field, in arrival order.
    #[must_use]
    pub fn get_all(&self, field: u32) -> &[WireValue<'a>] {
        self.fields.get(&field).map_or(&[], Vec::as_slice)
    }

    /// Returns whether a field is present.
    #[must_use]
    pub fn contains(&self, field: u32) -> bool {
        self.fields.contains_key(&field)
    }

    /// Iterates over fields in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &[WireValue<'a>])> {
        self.fields.iter().map(|(k, v)| (*k, v.as_slice()))
    }

    /// Iterates over every value in decode order, across fields.
    ///
    /// A message carrying field 45, then 7, then 45 again yields them in
    /// exactly that sequence.
    pub fn entries(&self) -> impl Iterator<Item = (u32, &WireValue<'a>)> + '_ {
        let mut cursors: IndexMap<u32, usize> = IndexMap::with_capacity(self.fields.len());
        self.order.iter().filter_map(move |&field| {
            let cursor = cursors.entry(field).or_insert(0);
            let value = self.fields.get(&field)?.get(*cursor)?;
            *cursor += 1;
            Some((field, value))
        })
    }

    /// Returns the present field numbers in first-seen order.
    pub fn field_numbers(&self) -> impl Iterator<Item = u32> + '_ {
        self.fields.keys().copied()
    }

    /// Returns the number of distinct fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns whether the tree has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns the first value of a field as a number.
    #[must_use]
    pub fn varint(&self, field: u32) -> Option<u64> {
        self.get(field).and_then(WireValue::as_u64)
    }

    /// Returns the first value of a field as text.
    #[must_use]
    pub fn string(&self, field: u32) -> Option<&str> {
        self.get(field).and_then(WireValue::as_str)
    }

    /// Returns the first value of a field as raw bytes.
    #[must_use]
    pub fn bytes(&self, field: u32) -> Option<&[u8]> {
        self.get(field).and_then(WireValue::as_bytes)
    }

    /// Returns the first value of a field as a nested message.
    #[must_use]
    pub fn message(&self, field: u32) -> Option<FieldTree<'_>> {
        self.get(field).and_then(WireValue::as_message)
    }

    /// Iterates over every value of a field that parses as a message.
    pub fn messages(&self, field: u32) -> impl Iterator<Item = FieldTree<'_>> {
        self.get_all(field).iter().filter_map(WireValue::as_message)
    }

    /// Follows a field-number path through nested messages and hands the
    /// value at the end to `f`.
    ///
    /// Each step takes the first value of its field. Intermediate values
    /// must parse as messages; otherwise the lookup yields `None`.
    pub fn lookup<R>(&self, path: &[u32], f: impl FnOnce(&WireValue<'_>) -> Option<R>) -> Option<R> {
        let (&first, rest) = path.split_first()?;
        let value = self.get(first)?;
        if rest.is_empty() {
            return f(value);
        }
        value.as_message()?.lookup(rest, f)
    }

    /// Returns whether a path resolves to a value.
    #[must_use]
    pub fn has_path(&self, path: &[u32]) -> bool {
        self.lookup(path, |_| Some(())).is_some()
    }

    /// Returns the number at the end of a path.
    #[must_use]
    pub fn varint_at(&self, path: &[u32]) -> Option<u64> {
        self.lookup(path, |v| v.as_u64())
    }

    /// Returns the text at the end of a path.
    #[must_use]
    pub fn string_at(&self, path: &[u32]) -> Option<String> {
        self.lookup(path, |v| v.as_str().map(str::to_owned))
    }

    /// Returns the message at the end of a path, detached from the buffer.
    #[must_use]
    pub fn message_at(&self, path: &[u32]) -> Option<FieldTree<'static>> {
        self.lookup(path, |v| v.as_message().map(FieldTree::into_owned))
    }

    /// Returns the wire kinds seen for a field, in first-seen order and
    /// without repeats.
    #[must_use]
    pub fn kinds(&self, field: u32) -> Vec<WireKind> {
        let mut kinds = Vec::new();
        for value in self.get_all(field) {
            let kind = value.kind();
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }
        kinds
    }

    /// Returns the fields whose values do not all share one wire kind.
    #[must_use]
    pub fn mixed_kind_fields(&self) -> Vec<u32> {
        self.field_numbers()
            .filter(|&f| self.kinds(f).len() > 1)
            .collect()
    }

    /// Detaches the tree from the buffer it was decoded from.
    #[must_use]
    pub fn into_owned(self) -> FieldTree<'static> {
        FieldTree {
            fields: self
                .fields
                .into_iter()
                .map(|(k, values)| (k, values.into_iter().map(WireValue::into_owned).collect()))
                .collect(),
            order: self.order,
        }
    }

    /// Re-emits the tree as wire bytes.
    ///
    /// Values are written in decode order, so the output matches the input
    /// byte for byte when the input used minimal varints. Decoding the
    /// output yields an equal tree.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode_into(&mut out);
        out
    }

    /// Appends the wire bytes of the tree to `out`.
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        for (field, value) in self.entries() {
            encode_tag(field, value.kind(), out);
            match value {
                WireValue::Varint(v) => encode_varint(*v, out),
                WireValue::Fixed64(v) => out.extend_from_slice(&v.to_le_bytes()),
                WireValue::LengthDelimited(bytes) => {
                    encode_varint(bytes.len() as u64, out);
                    out.extend_from_slice(bytes);
                }
                WireValue::Fixed32(v) => out.extend_from_slice(&v.to_le_bytes()),
            }
        }
    }
}

/// Appends a field tag to `out`.
pub fn encode_tag(field: u32, kind: WireKind, out: &mut Vec<u8>) {
    encode_varint((u64::from(field) << 3) | u64::from(kind.tag_bits()), out);
}

fn read_varint(data: &[u8], offset: usize) -> Result<(u64, usize), WireFormatError> {
    decode_varint(data, offset).map_err(|e| match e {
        VarintError::TooLong => WireFormatError::VarintTooLong { offset },
        VarintError::Truncated => WireFormatError::Truncated {
            offset,
            needed: data.len() - offset + 1,
            available: data.len() - offset,
        },
    })
}

fn take(data: &[u8], offset: usize, len: usize) -> Result<&[u8], WireFormatError> {
    let available = data.len() - offset;
    if len > available {
        return Err(WireFormatError::Truncated {
            offset,
            needed: len,
            available,
        });
    }
    Ok(&data[offset..offset + len])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::builder::MessageBuilder;

    // ========================
    // Walker tests
    // ========================

    #[test]
    fn test_parse_all_kinds() {
        let bytes = MessageBuilder::new()
            .varint(1, 300)
            .fixed64(2, 0x0102_0304_0506_0708)
            .string(3, "abc")
            .fixed32(4, 0xDEAD_BEEF)
            .build();

        let tree = FieldTree::parse(&bytes).unwrap();
        assert_eq!(tree.get(1), Some(&WireValue::Varint(300)));
        assert_eq!(tree.get(2), Some(&WireValue::Fixed64(0x0102_0304_0506_0708)));
        assert_eq!(tree.string(3), Some("abc"));
        assert_eq!(tree.get(4), Some(&WireValue::Fixed32(0xDEAD_BEEF)));
        assert_eq!(tree.len(), 4);
    }

    #[test]
    fn test_parse_repeated_fields_keep_order() {
        let bytes = MessageBuilder::new()
            .varint(5, 1)
            .varint(6, 99)
            .varint(5, 2)
            .varint(5, 3)
            .build();

        let tree = FieldTree::parse(&bytes).unwrap();
        let values: Vec<u64> = tree.get_all(5).iter().filter_map(WireValue::as_u64).collect();
        assert_eq!(values, vec![1, 2, 3]);
        assert_eq!(tree.varint(5), Some(1));
    }

    #[test]
    fn test_parse_empty_message() {
        let tree = FieldTree::parse(&[]).unwrap();
        assert!(tree.is_empty());
    }

    #[test]
    fn test_parse_rejects_group_kinds() {
        // field 1, kind 3 (start group)
        let result = FieldTree::parse(&[0x0B]);
        assert_eq!(
            result,
            Err(WireFormatError::InvalidWireKind {
                kind: 3,
                field_number: 1,
                offset: 0,
            })
        );

        // field 2, kind 6
        assert!(matches!(
            FieldTree::parse(&[0x08, 0x01, 0x16]),
            Err(WireFormatError::InvalidWireKind { kind: 6, offset: 2, .. })
        ));
    }

    #[test]
    fn test_parse_rejects_field_zero() {
        assert!(matches!(
            FieldTree::parse(&[0x00, 0x01]),
            Err(WireFormatError::InvalidFieldNumber { field_number: 0, .. })
        ));
    }

    #[test]
    fn test_parse_rejects_huge_field_number() {
        let mut bytes = Vec::new();
        encode_varint((MAX_FIELD_NUMBER + 1) << 3, &mut bytes);
        bytes.push(0x01);

        assert!(matches!(
            FieldTree::parse(&bytes),
            Err(WireFormatError::InvalidFieldNumber { .. })
        ));
    }

    #[test]
    fn test_parse_truncated_values() {
        // fixed64 with 3 bytes
        assert!(matches!(
            FieldTree::parse(&[0x09, 0x01, 0x02, 0x03]),
            Err(WireFormatError::Truncated { needed: 8, available: 3, .. })
        ));
        // length 5 with 2 bytes
        assert!(matches!(
            FieldTree::parse(&[0x0A, 0x05, b'a', b'b']),
            Err(WireFormatError::Truncated { .. })
        ));
        // varint cut off
        assert!(matches!(
            FieldTree::parse(&[0x08, 0x80]),
            Err(WireFormatError::Truncated { .. })
        ));
    }

    #[test]
    fn test_parse_overlong_varint() {
        let mut bytes = vec![0x08];
        bytes.extend_from_slice(&[0xFF; 10]);
        assert_eq!(
            FieldTree::parse(&bytes),
            Err(WireFormatError::VarintTooLong { offset: 1 })
        );
    }

    // ========================
    // Path lookup tests
    // ========================

    fn nested_tree_bytes() -> Vec<u8> {
        MessageBuilder::new()
            .message(
                3,
                MessageBuilder::new().message(
                    1,
                    MessageBuilder::new()
                        .message(3, MessageBuilder::new().string(2, "DesolateTemple")),
                ),
            )
            .build()
    }

    #[test]
    fn test_lookup_nested_path() {
        let bytes = nested_tree_bytes();
        let tree = FieldTree::parse(&bytes).unwrap();

        assert_eq!(tree.string_at(&[3, 1, 3, 2]).as_deref(), Some("DesolateTemple"));
        assert!(tree.has_path(&[3, 1, 3]));
        assert!(!tree.has_path(&[3, 1, 1, 2]));
        assert_eq!(tree.varint_at(&[3, 1, 3, 2]), None);
        assert_eq!(tree.string_at(&[]), None);
    }

    #[test]
    fn test_message_at_is_detached() {
        let owned = {
            let bytes = nested_tree_bytes();
            let tree = FieldTree::parse(&bytes).unwrap();
            tree.message_at(&[3, 1, 3]).unwrap()
        };
        assert_eq!(owned.string(2), Some("DesolateTemple"));
    }

    // ========================
    // Kind and encoding tests
    // ========================

    #[test]
    fn test_mixed_kind_fields() {
        let bytes = MessageBuilder::new()
            .varint(1, 5)
            .string(1, "five")
            .varint(2, 1)
            .varint(2, 2)
            .build();

        let tree = FieldTree::parse(&bytes).unwrap();
        assert_eq!(tree.mixed_kind_fields(), vec![1]);
        assert_eq!(
            tree.kinds(1),
            vec![WireKind::Varint, WireKind::LengthDelimited]
        );
    }

    #[test]
    fn test_encode_reparses_to_equal_tree() {
        let bytes = MessageBuilder::new()
            .varint(1, 13_796)
            .varint(2, 1)
            .fixed32(7, 42)
            .message(3, MessageBuilder::new().varint(1, 7))
            .varint(1, 13_800)
            .build();

        let tree = FieldTree::parse(&bytes).unwrap();
        let encoded = tree.encode();
        let reparsed = FieldTree::parse(&encoded).unwrap();
        assert_eq!(reparsed, tree);
    }

    #[test]
    fn test_remove_and_push() {
        let mut tree = FieldTree::new();
        tree.push(9, WireValue::Varint(1));
        tree.push(4, WireValue::Varint(2));
        tree.push(9, WireValue::Varint(3));
        assert_eq!(tree.field_numbers().collect::<Vec<_>>(), vec![9, 4]);

        assert_eq!(tree.remove(9), vec![WireValue::Varint(1), WireValue::Varint(3)]);
        assert!(tree.remove(9).is_empty());
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.entries().count(), 1);
    }

    #[test]
    fn test_entries_follow_decode_order() {
        let bytes = MessageBuilder::new()
            .varint(45, 1)
            .varint(7, 2)
            .varint(45, 3)
            .varint(1, 4)
            .build();

        let tree = FieldTree::parse(&bytes).unwrap();
        let seen: Vec<(u32, u64)> = tree
            .entries()
            .filter_map(|(field, value)| Some((field, value.as_u64()?)))
            .collect();
        assert_eq!(seen, vec![(45, 1), (7, 2), (45, 3), (1, 4)]);
        assert_eq!(tree.field_numbers().collect::<Vec<_>>(), vec![45, 7, 1]);
    }

    #[test]
    fn test_encode_keeps_interleaved_fields() {
        let bytes = MessageBuilder::new()
            .string(45, "gl hf")
            .message(7, MessageBuilder::new().varint(2, 1))
            .string(45, "gg")
            .build();

        let tree = FieldTree::parse(&bytes).unwrap();
        assert_eq!(tree.encode(), bytes);
    }
}
