//! Dynamic Label decoder (EN 300 401 clause 7.4.5.2, TS 102 980).
//!
//! Each DL data group starts with a 2-byte prefix:
//!
//! ```text
//! byte 0: | toggle (1) | first (1) | last (1) | C (1) | field length - 1 / command (4) |
//! byte 1: | charset (4) | rfa (4) |           first segment
//!         | rfa (1) | segment number (3) | rfa (4) |   other segments
//! ```
//!
//! followed by up to 16 label characters (or a command body) and a CRC.

use std::collections::BTreeMap;

use log::{debug, trace};

use crate::process::data_group::{DataGroup, DataGroupKind, Decoded};
use crate::structs::dynamic_label::{
    DL_PLUS_ITEM_TITLE, DlPlusCategory, DynamicLabel, content_type,
};
use crate::utils::charset::{Charset, to_utf8};

/// Largest character field of one segment.
pub const DL_MAX_FIELD_LEN: usize = 16;

/// Number of segments a label may consist of.
pub const DL_MAX_SEGMENTS: u8 = 8;

const DL_COMMAND_CLEAR_DISPLAY: u8 = 0b01;
const DL_COMMAND_DL_PLUS: u8 = 0b10;

const DL_PLUS_CID_TAGS: u8 = 0;

/// One received label segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DlSegment {
    pub toggle: bool,
    pub first: bool,
    pub last: bool,
    pub segnum: u8,
    /// Only meaningful in the first segment.
    pub charset: u8,
    pub chars: Vec<u8>,
}

impl DlSegment {
    pub fn new(prefix: [u8; 2], chars: &[u8]) -> Self {
        let first = prefix[0] & 0x40 != 0;

        Self {
            toggle: prefix[0] & 0x80 != 0,
            first,
            last: prefix[0] & 0x20 != 0,
            segnum: if first { 0 } else { (prefix[1] >> 4) & 0x07 },
            charset: prefix[1] >> 4,
            chars: chars.to_vec(),
        }
    }
}

/// Collects label segments until segments `0..=k` are present and `k` is
/// flagged last.
#[derive(Debug, Default)]
pub struct SegmentReassembler {
    segments: BTreeMap<u8, DlSegment>,
}

impl SegmentReassembler {
    pub fn reset(&mut self) {
        self.segments.clear();
    }

    /// Adds a segment and returns the raw label and its charset once complete.
    pub fn add_segment(&mut self, segment: DlSegment) -> Option<(Vec<u8>, Charset)> {
        // a toggle change starts a new label
        if self
            .segments
            .values()
            .next()
            .is_some_and(|cached| cached.toggle != segment.toggle)
        {
            self.segments.clear();
        }

        if self.segments.contains_key(&segment.segnum) {
            return None;
        }

        self.segments.insert(segment.segnum, segment);
        self.complete_label()
    }

    fn complete_label(&self) -> Option<(Vec<u8>, Charset)> {
        let mut count = 0;
        for segnum in 0..DL_MAX_SEGMENTS {
            let segment = self.segments.get(&segnum)?;
            count += 1;

            if segment.last {
                break;
            }
            if segnum == DL_MAX_SEGMENTS - 1 {
                return None;
            }
        }

        let raw: Vec<u8> = self
            .segments
            .values()
            .take(count)
            .flat_map(|segment| segment.chars.iter().copied())
            .collect();
        // byte 1 of later segments holds the segment number, not a charset
        let charset = self
            .segments
            .get(&0)
            .map(|first| Charset::from(first.charset))
            .unwrap_or_default();

        Some((raw, charset))
    }
}

/// Dynamic label application: label segments, clear display and DL Plus
/// commands.
#[derive(Debug, Default)]
pub struct DynamicLabelKind {
    reassembler: SegmentReassembler,
    label: DynamicLabel,
    item_toggle: bool,
}

impl DynamicLabelKind {
    pub fn label(&self) -> &DynamicLabel {
        &self.label
    }

    fn process_segment(&mut self, dg: &mut DataGroup) -> Decoded<DynamicLabel> {
        let field_len = (dg.data()[0] & 0x0F) as usize + 1;

        if let Some(early) = check_data_packet(dg, field_len) {
            return early;
        }

        let raw = dg.data();
        let segment = DlSegment::new([raw[0], raw[1]], &raw[2..2 + field_len]);
        trace!(
            "DL segment {} (toggle {}, {} chars{})",
            segment.segnum,
            segment.toggle as u8,
            segment.chars.len(),
            if segment.last { ", last" } else { "" }
        );

        let Some((raw, charset)) = self.reassembler.add_segment(segment) else {
            return Decoded::Done(None);
        };

        self.label.text = to_utf8(&raw, charset);
        self.label.raw = raw;
        self.label.charset = charset;
        debug!("DL: {}", self.label.text);

        Decoded::Done(Some(self.label.clone()))
    }

    fn clear_display(&mut self, dg: &mut DataGroup) -> Decoded<DynamicLabel> {
        if let Some(early) = check_data_packet(dg, 0) {
            return early;
        }

        debug!("DL: clear display");
        self.label.clear();

        Decoded::Done(Some(self.label.clone()))
    }

    fn dl_plus_command(&mut self, dg: &mut DataGroup) -> Decoded<DynamicLabel> {
        let raw = dg.data();
        let link = raw[1] & 0x80 != 0;
        let cid = raw[2] >> 4;

        if cid != DL_PLUS_CID_TAGS {
            debug!("DL Plus: unsupported command id {cid:#X}");
            return Decoded::Done(None);
        }

        let item_toggle = raw[2] & 0x08 != 0;
        let item_running = raw[2] & 0x04 != 0;
        let num_tags = (raw[2] & 0x03) as usize + 1;

        if let Some(early) = check_data_packet(dg, num_tags * 3 + 1) {
            return early;
        }

        trace!(
            "DL Plus: {num_tags} tags, item toggle {}, running {}, link {}",
            item_toggle as u8, item_running as u8, link as u8
        );

        let label = &mut self.label;
        let mut updated = false;

        if !item_running && item_toggle != self.item_toggle {
            label.info.clear();
            label.programme.clear();
            label.interactivity.clear();
            label.descriptors.clear();
            updated = true;
        }
        self.item_toggle = item_toggle;

        if !item_running && !label.items.is_empty() {
            label.items.clear();
            updated = true;
        }

        let mut items_cleared = false;
        for tag in dg.data()[3..3 + num_tags * 3].chunks_exact(3) {
            let code = tag[0] & 0x7F;
            let start = (tag[1] & 0x7F) as usize;
            let length_marker = (tag[2] & 0x7F) as usize;

            if start + length_marker + 1 > label.raw.len() {
                trace!("DL Plus: tag {code} exceeds label ({start} + {length_marker})");
                continue;
            }

            let Some(ct) = content_type(code) else {
                trace!("DL Plus: unknown content type {code}");
                continue;
            };

            let text = if length_marker == 0 {
                String::new()
            } else {
                let slice = &label.raw[start..start + length_marker + 1];
                to_utf8(slice, label.charset).trim().to_string()
            };

            match ct.category {
                DlPlusCategory::Item if items_cleared => {}
                DlPlusCategory::Item if code == DL_PLUS_ITEM_TITLE && text.is_empty() => {
                    updated |= !label.items.is_empty();
                    label.items.clear();
                    items_cleared = true;
                }
                DlPlusCategory::Programme => {
                    updated |= set_or_remove(&mut label.programme, code, text, !item_running);
                }
                category => {
                    if let Some(map) = label.category_map_mut(category) {
                        updated |= set_or_remove(map, code, text, true);
                    }
                }
            }
        }

        Decoded::Done(updated.then(|| self.label.clone()))
    }
}

/// Waits for `2 + field_len` bytes plus CRC and verifies the CRC.
///
/// Returns the decode result to report early when the packet is not usable
/// yet (or not at all).
fn check_data_packet(dg: &mut DataGroup, field_len: usize) -> Option<Decoded<DynamicLabel>> {
    let real_len = 2 + field_len;

    if !dg.ensure_size(real_len + 2) {
        return Some(Decoded::NeedMore);
    }

    if !dg.check_crc(real_len) {
        debug!("DL: CRC mismatch, discarding");
        return Some(Decoded::Done(None));
    }

    None
}

fn set_or_remove(
    map: &mut BTreeMap<u8, String>,
    code: u8,
    text: String,
    allow_remove: bool,
) -> bool {
    if !text.is_empty() {
        if map.get(&code) == Some(&text) {
            return false;
        }
        map.insert(code, text);
        true
    } else if allow_remove {
        map.remove(&code).is_some()
    } else {
        false
    }
}

impl DataGroupKind for DynamicLabelKind {
    type Output = DynamicLabel;
    const MAX_SIZE: usize = 2 + DL_MAX_FIELD_LEN + 2;

    fn initial_needed_size(&self) -> usize {
        // prefix + CRC
        2 + 2
    }

    fn decode(&mut self, dg: &mut DataGroup) -> Decoded<DynamicLabel> {
        let prefix = dg.data()[0];

        if prefix & 0x10 == 0 {
            return self.process_segment(dg);
        }

        match prefix & 0x0F {
            DL_COMMAND_CLEAR_DISPLAY => self.clear_display(dg),
            DL_COMMAND_DL_PLUS => self.dl_plus_command(dg),
            command => {
                trace!("DL: ignoring command {command:#X}");
                Decoded::Done(None)
            }
        }
    }

    fn reset(&mut self) {
        self.reassembler.reset();
        self.label.clear();
        self.item_toggle = false;
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::process::data_group::DataGroupDecoder;
    use crate::structs::dynamic_label::{DL_PLUS_ITEM_ARTIST, DL_PLUS_PROGRAMME_NOW};
    use crate::utils::crc::CRC_CCITT;

    pub(crate) fn with_crc(mut raw: Vec<u8>) -> Vec<u8> {
        let crc = CRC_CCITT.checksum(&raw);
        raw.extend(crc.to_be_bytes());
        raw
    }

    pub(crate) fn segment(toggle: bool, segnum: u8, last: bool, charset: u8, chars: &[u8]) -> Vec<u8> {
        let first = segnum == 0;
        let b0 = (toggle as u8) << 7
            | (first as u8) << 6
            | (last as u8) << 5
            | (chars.len() as u8 - 1);
        let b1 = if first { charset << 4 } else { segnum << 4 };

        let mut raw = vec![b0, b1];
        raw.extend_from_slice(chars);
        with_crc(raw)
    }

    fn label_segments(toggle: bool, text: &[u8]) -> Vec<Vec<u8>> {
        let chunks: Vec<&[u8]> = text.chunks(DL_MAX_FIELD_LEN).collect();
        chunks
            .iter()
            .enumerate()
            .map(|(i, chars)| segment(toggle, i as u8, i + 1 == chunks.len(), 0, chars))
            .collect()
    }

    /// DL Plus tags command with `(content type, start, length marker)` tags.
    fn dl_plus(toggle: bool, running: bool, tags: &[(u8, u8, u8)]) -> Vec<u8> {
        let b2 = (toggle as u8) << 3 | (running as u8) << 2 | (tags.len() as u8 - 1);
        let mut raw = vec![0x60 | 0x10 | DL_COMMAND_DL_PLUS, 0x00, b2];
        for &(ct, start, len) in tags {
            raw.extend([ct, start, len]);
        }
        with_crc(raw)
    }

    fn feed_all(
        decoder: &mut DataGroupDecoder<DynamicLabelKind>,
        groups: &[Vec<u8>],
    ) -> Vec<DynamicLabel> {
        groups
            .iter()
            .filter_map(|group| decoder.feed(true, group))
            .collect()
    }

    const TEXT: &[u8] = b"You are listening to DAB+ Radio: Song - Band";

    #[test]
    fn delivery_order_does_not_matter() {
        let segments = label_segments(false, TEXT);
        assert_eq!(segments.len(), 3);

        for order in [[0, 1, 2], [2, 0, 1], [1, 2, 0], [2, 1, 0]] {
            let mut decoder = DataGroupDecoder::new(DynamicLabelKind::default());
            let ordered: Vec<_> = order.iter().map(|&i| segments[i].clone()).collect();

            let labels = feed_all(&mut decoder, &ordered);
            assert_eq!(labels.len(), 1, "order {order:?}");
            assert_eq!(labels[0].text.as_bytes(), TEXT);
            assert_eq!(labels[0].charset, Charset::EbuLatin);
        }
    }

    #[test]
    fn charset_comes_from_first_segment() {
        let mut decoder = DataGroupDecoder::new(DynamicLabelKind::default());
        let first = segment(false, 0, false, 0xF, "Grü".as_bytes());
        let last = segment(false, 1, true, 0, "ße".as_bytes());

        let labels = feed_all(&mut decoder, &[first, last]);
        assert_eq!(labels.len(), 1);
        assert_eq!(labels[0].charset, Charset::Utf8);
        assert_eq!(labels[0].text, "Grüße");
    }

    #[test]
    fn segment_split_across_subfields() {
        let mut decoder = DataGroupDecoder::new(DynamicLabelKind::default());
        let raw = segment(false, 0, true, 0xF, "Grüße".as_bytes());

        assert!(decoder.feed(true, &raw[..4]).is_none());
        assert!(decoder.feed(false, &raw[4..9]).is_none());

        let label = decoder.feed(false, &raw[9..]);
        assert_eq!(label.map(|l| l.text), Some("Grüße".to_string()));
    }

    #[test]
    fn stale_toggle_is_discarded() {
        let mut decoder = DataGroupDecoder::new(DynamicLabelKind::default());

        let old = segment(false, 0, false, 0, b"Old label ");
        let new_tail = segment(true, 1, true, 0, b"tail");
        let new_head = segment(true, 0, false, 0, b"New ");

        assert!(feed_all(&mut decoder, &[old, new_tail]).is_empty());
        let labels = feed_all(&mut decoder, &[new_head]);
        assert_eq!(labels.len(), 1);
        assert_eq!(labels[0].text, "New tail");
    }

    #[test]
    fn duplicate_segments_do_not_republish() {
        let mut decoder = DataGroupDecoder::new(DynamicLabelKind::default());
        let only = segment(false, 0, true, 0, b"Same");

        assert_eq!(feed_all(&mut decoder, &[only.clone(), only]).len(), 1);
    }

    #[test]
    fn bad_crc_is_dropped() {
        let mut decoder = DataGroupDecoder::new(DynamicLabelKind::default());
        let mut raw = segment(false, 0, true, 0, b"Broken");
        raw[3] ^= 0x20;

        assert!(decoder.feed(true, &raw).is_none());
        assert!(decoder.kind().label().is_empty());
    }

    #[test]
    fn clear_display_command() {
        let mut decoder = DataGroupDecoder::new(DynamicLabelKind::default());
        feed_all(&mut decoder, &label_segments(false, b"Some label"));
        feed_all(&mut decoder, &[dl_plus(false, true, &[(1, 0, 3)])]);
        assert!(!decoder.kind().label().items.is_empty());

        let clear = with_crc(vec![0x10 | DL_COMMAND_CLEAR_DISPLAY, 0x00]);
        let labels = feed_all(&mut decoder, &[clear]);

        assert_eq!(labels.len(), 1);
        assert!(labels[0].is_empty());
        assert!(labels[0].text.is_empty());
        assert!(labels[0].items.is_empty());
    }

    #[test]
    fn unknown_command_is_ignored() {
        let mut decoder = DataGroupDecoder::new(DynamicLabelKind::default());
        let command = with_crc(vec![0x10 | 0x07, 0x00]);

        assert!(feed_all(&mut decoder, &[command]).is_empty());
        assert_eq!(decoder.data_group().size(), 0);
    }

    #[test]
    fn dl_plus_item_tags() {
        let mut decoder = DataGroupDecoder::new(DynamicLabelKind::default());
        feed_all(&mut decoder, &label_segments(false, b"Song - Band "));

        let labels = feed_all(
            &mut decoder,
            &[dl_plus(false, true, &[(DL_PLUS_ITEM_TITLE, 0, 3), (DL_PLUS_ITEM_ARTIST, 7, 4)])],
        );

        assert_eq!(labels.len(), 1);
        assert_eq!(labels[0].tag(DL_PLUS_ITEM_TITLE), Some("Song"));
        assert_eq!(labels[0].tag(DL_PLUS_ITEM_ARTIST), Some("Band"));

        // same tags again: nothing changed
        let again = dl_plus(false, true, &[(DL_PLUS_ITEM_TITLE, 0, 3), (DL_PLUS_ITEM_ARTIST, 7, 4)]);
        assert!(feed_all(&mut decoder, &[again]).is_empty());
    }

    #[test]
    fn dl_plus_empty_title_clears_items() {
        let mut decoder = DataGroupDecoder::new(DynamicLabelKind::default());
        feed_all(&mut decoder, &label_segments(false, b"Song - Band "));
        feed_all(
            &mut decoder,
            &[dl_plus(false, true, &[(DL_PLUS_ITEM_TITLE, 0, 3), (DL_PLUS_ITEM_ARTIST, 7, 4)])],
        );

        let labels = feed_all(
            &mut decoder,
            &[dl_plus(false, true, &[(DL_PLUS_ITEM_TITLE, 0, 0), (DL_PLUS_ITEM_ARTIST, 7, 4)])],
        );

        assert_eq!(labels.len(), 1);
        assert!(labels[0].items.is_empty());
    }

    #[test]
    fn dl_plus_out_of_range_tags_are_skipped() {
        let mut decoder = DataGroupDecoder::new(DynamicLabelKind::default());
        feed_all(&mut decoder, &label_segments(false, b"Short"));

        let tags = [(DL_PLUS_ITEM_TITLE, 2, 3), (DL_PLUS_ITEM_ARTIST, 0, 4), (64, 0, 1)];
        let labels = feed_all(&mut decoder, &[dl_plus(false, true, &tags)]);

        assert_eq!(labels.len(), 1);
        assert_eq!(labels[0].tag(DL_PLUS_ITEM_TITLE), None);
        assert_eq!(labels[0].tag(DL_PLUS_ITEM_ARTIST), Some("Short"));
        assert_eq!(labels[0].items.len(), 1);
    }

    #[test]
    fn dl_plus_toggle_change_clears_programme() {
        let mut decoder = DataGroupDecoder::new(DynamicLabelKind::default());
        feed_all(&mut decoder, &label_segments(false, b"Morning Show"));

        let labels = feed_all(
            &mut decoder,
            &[dl_plus(false, true, &[(DL_PLUS_PROGRAMME_NOW, 0, 11)])],
        );
        assert_eq!(labels[0].tag(DL_PLUS_PROGRAMME_NOW), Some("Morning Show"));

        // item stopped, toggle flipped, no tags in range
        let labels = feed_all(&mut decoder, &[dl_plus(true, false, &[(0, 100, 0)])]);
        assert_eq!(labels.len(), 1);
        assert!(labels[0].programme.is_empty());
    }

    #[test]
    fn dl_plus_unsupported_cid() {
        let mut decoder = DataGroupDecoder::new(DynamicLabelKind::default());
        let command = with_crc(vec![0x72, 0x00, 0x10, 1, 0, 0]);

        assert!(feed_all(&mut decoder, &[command]).is_empty());
    }
}
