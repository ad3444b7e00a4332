//! Dynamic Label and DL Plus structures.
//!
//! A dynamic label is up to 128 characters of free text sent in segments of
//! at most 16 bytes. DL Plus (ETSI TS 102 980) adds tags pointing into the
//! label text, grouped into categories such as the currently playing item or
//! programme information.

use std::collections::BTreeMap;
use std::fmt::Display;

use crate::utils::charset::Charset;

/// DL Plus content type category (TS 102 980 clause 5.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DlPlusCategory {
    Dummy,
    Item,
    Info,
    Programme,
    Interactivity,
    Reserved,
    Private,
    Descriptor,
}

impl Display for DlPlusCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Dummy => "dummy",
            Self::Item => "item",
            Self::Info => "info",
            Self::Programme => "programme",
            Self::Interactivity => "interactivity",
            Self::Reserved => "reserved",
            Self::Private => "private",
            Self::Descriptor => "descriptor",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DlPlusContentType {
    pub code: u8,
    pub category: DlPlusCategory,
    /// ID3v2 frame id, empty when there is none.
    pub id3v2: &'static str,
    pub name: &'static str,
}

pub const DL_PLUS_ITEM_TITLE: u8 = 1;
pub const DL_PLUS_ITEM_ARTIST: u8 = 4;
pub const DL_PLUS_PROGRAMME_NOW: u8 = 33;

macro_rules! content_types {
    ($(($code:expr, $category:ident, $id3:expr, $name:expr)),* $(,)?) => {
        [$(DlPlusContentType {
            code: $code,
            category: DlPlusCategory::$category,
            id3v2: $id3,
            name: $name,
        }),*]
    };
}

/// All 64 DL Plus content types, indexed by code.
pub static DL_PLUS_CONTENT_TYPES: [DlPlusContentType; 64] = content_types![
    (0, Dummy, "", "DUMMY"),
    (1, Item, "TIT2", "ITEM.TITLE"),
    (2, Item, "TALB", "ITEM.ALBUM"),
    (3, Item, "TRCK", "ITEM.TRACKNUMBER"),
    (4, Item, "TPE1", "ITEM.ARTIST"),
    (5, Item, "TIT1", "ITEM.COMPOSITION"),
    (6, Item, "TIT3", "ITEM.MOVEMENT"),
    (7, Item, "TPE3", "ITEM.CONDUCTOR"),
    (8, Item, "TCOM", "ITEM.COMPOSER"),
    (9, Item, "TPE2", "ITEM.BAND"),
    (10, Item, "COMM", "ITEM.COMMENT"),
    (11, Item, "TCON", "ITEM.GENRE"),
    (12, Info, "", "INFO.NEWS"),
    (13, Info, "", "INFO.NEWS.LOCAL"),
    (14, Info, "", "INFO.STOCKMARKET"),
    (15, Info, "", "INFO.SPORT"),
    (16, Info, "", "INFO.LOTTERY"),
    (17, Info, "", "INFO.HOROSCOPE"),
    (18, Info, "", "INFO.DAILY_DIVERSION"),
    (19, Info, "", "INFO.HEALTH"),
    (20, Info, "", "INFO.EVENT"),
    (21, Info, "", "INFO.SCENE"),
    (22, Info, "", "INFO.CINEMA"),
    (23, Info, "", "INFO.TV"),
    (24, Info, "", "INFO.DATE_TIME"),
    (25, Info, "", "INFO.WEATHER"),
    (26, Info, "", "INFO.TRAFFIC"),
    (27, Info, "", "INFO.ALARM"),
    (28, Info, "", "INFO.ADVERTISEMENT"),
    (29, Info, "", "INFO.URL"),
    (30, Info, "", "INFO.OTHER"),
    (31, Programme, "", "STATIONNAME.SHORT"),
    (32, Programme, "", "STATIONNAME.LONG"),
    (33, Programme, "TKNO", "PROGRAMME.NOW"),
    (34, Programme, "TKNE", "PROGRAMME.NEXT"),
    (35, Programme, "", "PROGRAMME.PART"),
    (36, Programme, "", "PROGRAMME.HOST"),
    (37, Programme, "", "PROGRAMME.EDITORIAL_STAFF"),
    (38, Programme, "", "PROGRAMME.FREQUENCY"),
    (39, Programme, "WORS", "PROGRAMME.HOMEPAGE"),
    (40, Programme, "", "PROGRAMME.SUBCHANNEL"),
    (41, Interactivity, "", "PHONE.HOTLINE"),
    (42, Interactivity, "", "PHONE.STUDIO"),
    (43, Interactivity, "", "PHONE.OTHER"),
    (44, Interactivity, "", "SMS.STUDIO"),
    (45, Interactivity, "", "SMS.OTHER"),
    (46, Interactivity, "", "EMAIL.HOTLINE"),
    (47, Interactivity, "", "EMAIL.STUDIO"),
    (48, Interactivity, "", "EMAIL.OTHER"),
    (49, Interactivity, "", "MMS.OTHER"),
    (50, Interactivity, "", "CHAT"),
    (51, Interactivity, "", "CHAT.CENTER"),
    (52, Interactivity, "", "VOTE.QUESTION"),
    (53, Interactivity, "", "VOTE.CENTRE"),
    (54, Reserved, "", ""),
    (55, Reserved, "", ""),
    (56, Private, "", ""),
    (57, Private, "", ""),
    (58, Private, "", ""),
    (59, Descriptor, "", "DESCRIPTOR.PLACE"),
    (60, Descriptor, "", "DESCRIPTOR.APPOINTMENT"),
    (61, Descriptor, "TSRC", "DESCRIPTOR.IDENTIFIER"),
    (62, Descriptor, "WPAY", "DESCRIPTOR.PURCHASE"),
    (63, Descriptor, "", "DESCRIPTOR.GET_DATA"),
];

/// Looks up a DL Plus content type by its 6-bit code.
pub fn content_type(code: u8) -> Option<&'static DlPlusContentType> {
    DL_PLUS_CONTENT_TYPES.get(code as usize)
}

/// Current dynamic label with its DL Plus tag maps.
///
/// Each map goes from content type code to trimmed UTF-8 text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DynamicLabel {
    pub raw: Vec<u8>,
    pub charset: Charset,
    pub text: String,

    pub items: BTreeMap<u8, String>,
    pub info: BTreeMap<u8, String>,
    pub programme: BTreeMap<u8, String>,
    pub interactivity: BTreeMap<u8, String>,
    pub descriptors: BTreeMap<u8, String>,
}

impl DynamicLabel {
    /// Empties the label text and all tag maps.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    pub fn category_map(&self, category: DlPlusCategory) -> Option<&BTreeMap<u8, String>> {
        match category {
            DlPlusCategory::Item => Some(&self.items),
            DlPlusCategory::Info => Some(&self.info),
            DlPlusCategory::Programme => Some(&self.programme),
            DlPlusCategory::Interactivity => Some(&self.interactivity),
            DlPlusCategory::Descriptor => Some(&self.descriptors),
            _ => None,
        }
    }

    pub(crate) fn category_map_mut(
        &mut self,
        category: DlPlusCategory,
    ) -> Option<&mut BTreeMap<u8, String>> {
        match category {
            DlPlusCategory::Item => Some(&mut self.items),
            DlPlusCategory::Info => Some(&mut self.info),
            DlPlusCategory::Programme => Some(&mut self.programme),
            DlPlusCategory::Interactivity => Some(&mut self.interactivity),
            DlPlusCategory::Descriptor => Some(&mut self.descriptors),
            _ => None,
        }
    }

    /// Text of a tag by content type code, from whichever category holds it.
    pub fn tag(&self, code: u8) -> Option<&str> {
        let category = content_type(code)?.category;
        self.category_map(category)?.get(&code).map(String::as_str)
    }

    /// All tags as `(content type, text)` pairs in code order.
    pub fn tags(&self) -> Vec<(&'static DlPlusContentType, &str)> {
        let mut tags: Vec<_> = [
            &self.items,
            &self.info,
            &self.programme,
            &self.interactivity,
            &self.descriptors,
        ]
        .into_iter()
        .flat_map(|map| map.iter())
        .filter_map(|(&code, text)| content_type(code).map(|ct| (ct, text.as_str())))
        .collect();

        tags.sort_by_key(|(ct, _)| ct.code);
        tags
    }
}

impl Display for DynamicLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.text)?;

        for (ct, text) in self.tags() {
            write!(f, " [{}: {}]", ct.name, text)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_indexed_by_code() {
        for (i, ct) in DL_PLUS_CONTENT_TYPES.iter().enumerate() {
            assert_eq!(ct.code as usize, i);
        }
        assert!(content_type(64).is_none());
    }

    #[test]
    fn table_categories() {
        assert_eq!(content_type(DL_PLUS_ITEM_TITLE).map(|ct| ct.id3v2), Some("TIT2"));
        assert_eq!(
            content_type(DL_PLUS_PROGRAMME_NOW).map(|ct| ct.category),
            Some(DlPlusCategory::Programme)
        );
        assert_eq!(content_type(57).map(|ct| ct.category), Some(DlPlusCategory::Private));
        assert_eq!(content_type(62).map(|ct| ct.name), Some("DESCRIPTOR.PURCHASE"));
    }

    #[test]
    fn tag_lookup_and_display() {
        let mut label = DynamicLabel {
            text: "Now: Song by Band".to_string(),
            ..Default::default()
        };
        label.items.insert(DL_PLUS_ITEM_ARTIST, "Band".to_string());
        label.items.insert(DL_PLUS_ITEM_TITLE, "Song".to_string());

        assert_eq!(label.tag(DL_PLUS_ITEM_ARTIST), Some("Band"));
        assert_eq!(label.tag(DL_PLUS_PROGRAMME_NOW), None);
        assert_eq!(
            label.to_string(),
            "Now: Song by Band [ITEM.TITLE: Song] [ITEM.ARTIST: Band]"
        );

        label.clear();
        assert!(label.is_empty());
        assert!(label.items.is_empty());
    }
}
