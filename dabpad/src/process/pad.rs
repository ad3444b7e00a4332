//! PAD dispatcher.
//!
//! Splits the X-PAD of each audio frame into data subfields according to its
//! contents indicators and routes them to the DGLI, dynamic label and MOT
//! decoders (EN 300 401 clause 7.4). X-PAD bytes arrive in reversed order at
//! the end of the audio frame, immediately before the F-PAD.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use log::{debug, trace};

use crate::process::data_group::DataGroupDecoder;
use crate::process::dgli::DgliKind;
use crate::process::dynamic_label::DynamicLabelKind;
use crate::process::mot::MotKind;
use crate::structs::dynamic_label::DynamicLabel;
use crate::structs::fpad::{FPAD_LEN, FPad, XPadIndicator};
use crate::structs::mot::MotFile;
use crate::structs::xpad::{AppType, ContentsIndicator, XPAD_MAX_CIS, XPAD_MAX_LEN};

const MOT_APP_TYPE_NOT_SET: u8 = 0xFF;

/// Shared, thread-safe handle to the X-PAD application type carrying MOT.
///
/// The MOT start subfields use this type, continuations use type + 1. The
/// handle can be cloned and updated from another thread while frames are
/// processed.
#[derive(Debug, Clone)]
pub struct MotAppType(Arc<AtomicU8>);

impl Default for MotAppType {
    fn default() -> Self {
        Self(Arc::new(AtomicU8::new(MOT_APP_TYPE_NOT_SET)))
    }
}

impl MotAppType {
    pub fn set(&self, app_type: Option<u8>) {
        let value = app_type.map_or(MOT_APP_TYPE_NOT_SET, |t| t & 0x1F);
        self.0.store(value, Ordering::Relaxed);
    }

    pub fn get(&self) -> Option<u8> {
        match self.0.load(Ordering::Relaxed) {
            MOT_APP_TYPE_NOT_SET => None,
            app_type => Some(app_type),
        }
    }
}

/// Results of processing one frame's PAD.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PadEvent {
    LabelChanged(DynamicLabel),
    SlideChanged(MotFile),
    /// The contents indicators announce less X-PAD than the frame carries.
    LengthError { announced: usize, available: usize },
}

#[derive(Debug)]
pub struct PadDecoder {
    xpad: [u8; XPAD_MAX_LEN],
    /// Continues into the next frame when it carries no CI list.
    last_ci: Option<ContentsIndicator>,
    loose: bool,
    mot_app_type: MotAppType,

    dgli: DataGroupDecoder<DgliKind>,
    label: DataGroupDecoder<DynamicLabelKind>,
    mot: DataGroupDecoder<MotKind>,
}

impl Default for PadDecoder {
    fn default() -> Self {
        Self {
            xpad: [0; XPAD_MAX_LEN],
            last_ci: None,
            loose: false,
            mot_app_type: MotAppType::default(),
            dgli: DataGroupDecoder::new(DgliKind::default()),
            label: DataGroupDecoder::new(DynamicLabelKind::default()),
            mot: DataGroupDecoder::new(MotKind::default()),
        }
    }
}

impl PadDecoder {
    /// Tolerates two kinds of non-compliant encoders: CI continuation across
    /// frames without X-PAD, and X-PAD shorter than the frame's PAD area.
    pub fn set_loose(&mut self, loose: bool) {
        self.loose = loose;
    }

    /// Handle to the MOT application type; unset disables MOT decoding.
    pub fn mot_app_type(&self) -> MotAppType {
        self.mot_app_type.clone()
    }

    /// The most recent dynamic label.
    pub fn label(&self) -> &DynamicLabel {
        self.label.kind().label()
    }

    pub fn reset(&mut self) {
        self.mot_app_type.set(None);
        self.last_ci = None;
        self.dgli.reset();
        self.label.reset();
        self.mot.reset();
    }

    /// Processes the PAD of one audio frame.
    ///
    /// # Arguments
    ///
    /// * `xpad` - X-PAD bytes in transmission (reversed) order
    /// * `exact_len` - Whether `xpad` is known to be exactly the X-PAD field
    ///   (DAB+), rather than the whole area before the F-PAD (DAB)
    /// * `fpad` - The two F-PAD bytes
    pub fn process(&mut self, xpad: &[u8], exact_len: bool, fpad: [u8; FPAD_LEN]) -> Vec<PadEvent> {
        let mut events = Vec::new();

        let used = xpad.len().min(XPAD_MAX_LEN);
        for (dst, src) in self.xpad[..used].iter_mut().zip(xpad.iter().rev()) {
            *dst = *src;
        }

        let fpad = FPad::from(fpad);
        let prev_ci = self.last_ci.take();

        let mut cis: Vec<ContentsIndicator> = Vec::with_capacity(XPAD_MAX_CIS);
        let mut cis_len = 0;

        if fpad.is_type0() {
            match (fpad.ci_flag, fpad.xpad_indicator) {
                (true, XPadIndicator::Short) => {
                    if xpad.is_empty() {
                        return events;
                    }

                    let ci = ContentsIndicator::short(self.xpad[0]);
                    if ci.kind() != AppType::EndMarker {
                        cis_len = 1;
                        cis.push(ci);
                    }
                }
                (true, XPadIndicator::VariableSize) => {
                    for i in 0..XPAD_MAX_CIS {
                        if xpad.len() < i + 1 {
                            trace!("X-PAD: CI list truncated after {i} bytes");
                            return events;
                        }

                        let raw = self.xpad[i];
                        cis_len += 1;

                        if AppType::from(raw) == AppType::EndMarker {
                            break;
                        }
                        cis.push(ContentsIndicator::from_byte(raw));
                    }
                }
                (false, XPadIndicator::Short | XPadIndicator::VariableSize) => {
                    cis.extend(prev_ci);
                }
                _ => {}
            }
        }

        if cis.is_empty() {
            // some encoders only count frames carrying X-PAD as "previous"
            if self.loose {
                self.last_ci = prev_ci;
            }
            return events;
        }

        let announced = cis_len + cis.iter().map(|ci| ci.len).sum::<usize>();

        if announced > xpad.len() {
            trace!("X-PAD: announced {announced} bytes, only {} available", xpad.len());
            return events;
        }

        if exact_len && !self.loose && announced < xpad.len() {
            debug!("X-PAD: announced {announced} bytes, but {} available", xpad.len());
            events.push(PadEvent::LengthError {
                announced,
                available: xpad.len(),
            });
            return events;
        }

        let mut offset = cis_len;
        let mut continued: Option<u8> = None;

        for ci in &cis {
            // only valid for the data group immediately following the DGLI
            let dgli_len = self.dgli.kind_mut().take_length();

            let Some(subfield) = self.xpad[..used].get(offset..offset + ci.len) else {
                trace!("X-PAD: subfield beyond {XPAD_MAX_LEN} bytes");
                break;
            };

            let kind = ci.kind();
            let mot_base = self
                .mot_app_type
                .get()
                .filter(|&base| ci.app_type == base || ci.app_type == base + 1);

            continued = match (kind, mot_base) {
                (AppType::DataGroupLengthIndicator, _) => {
                    self.dgli.feed(fpad.ci_flag, subfield);
                    Some(ci.app_type)
                }
                (AppType::DynamicLabelStart | AppType::DynamicLabelContinuation, _) => {
                    let start = kind == AppType::DynamicLabelStart;
                    if let Some(label) = self.label.feed(start, subfield) {
                        events.push(PadEvent::LabelChanged(label));
                    }
                    Some(AppType::DynamicLabelContinuation.into())
                }
                (_, Some(base)) => {
                    let start = ci.app_type == base;
                    if start {
                        self.mot.kind_mut().set_len(dgli_len);
                    }

                    if let Some(file) = self.mot.feed(start, subfield) {
                        if file.is_image() {
                            debug!("MOT: new slide {file}");
                            events.push(PadEvent::SlideChanged(file));
                        } else {
                            debug!("MOT: ignoring non-image object {file}");
                        }
                    }
                    Some(base + 1)
                }
                _ => {
                    trace!("X-PAD: unhandled application type {kind}");
                    None
                }
            };

            offset += ci.len;
        }

        self.last_ci = continued.map(|app_type| ContentsIndicator {
            len: offset,
            app_type,
        });

        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::dynamic_label::tests::{segment, with_crc};
    use crate::process::mot::manager::tests::data_group;
    use crate::process::mot::object::tests::{TRIGGER_NOW, header};
    use crate::structs::mot::{MOT_DG_TYPE_BODY, MOT_DG_TYPE_HEADER};

    const FPAD_VARIABLE_CI: [u8; 2] = [0x20, 0x02];
    const FPAD_VARIABLE: [u8; 2] = [0x20, 0x00];
    const FPAD_NO_XPAD: [u8; 2] = [0x00, 0x00];

    /// Reverses logical X-PAD into transmission order.
    fn xpad(logical: &[u8]) -> Vec<u8> {
        logical.iter().rev().copied().collect()
    }

    fn padded(mut bytes: Vec<u8>, len: usize) -> Vec<u8> {
        bytes.resize(len, 0);
        bytes
    }

    fn dgli(length: u16) -> Vec<u8> {
        with_crc(length.to_be_bytes().to_vec())
    }

    /// DL start subfield of 12 bytes carrying the whole label group.
    fn hello_frame() -> Vec<u8> {
        let mut logical = vec![0x62, 0x00];
        logical.extend(padded(segment(false, 0, true, 0, b"Hello"), 12));
        logical
    }

    fn labels(events: &[PadEvent]) -> Vec<String> {
        events
            .iter()
            .filter_map(|event| match event {
                PadEvent::LabelChanged(label) => Some(label.text.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn label_in_single_frame() {
        let mut decoder = PadDecoder::default();
        let events = decoder.process(&xpad(&hello_frame()), false, FPAD_VARIABLE_CI);

        assert_eq!(labels(&events), ["Hello"]);
        assert_eq!(decoder.label().text, "Hello");
    }

    #[test]
    fn short_xpad_label() {
        let mut decoder = PadDecoder::default();
        let group = segment(false, 0, true, 0, b"Hi");
        assert_eq!(group.len(), 6);

        // short X-PAD: CI byte + 3 bytes, then continuation frames of 4 bytes
        let mut logical = vec![0x02];
        logical.extend(&group[..3]);
        assert!(decoder.process(&xpad(&logical), false, [0x10, 0x02]).is_empty());

        let events = decoder.process(&xpad(&padded(group[3..].to_vec(), 4)), false, [0x10, 0x00]);
        assert_eq!(labels(&events), ["Hi"]);
    }

    #[test]
    fn announced_beyond_available_drops_frame() {
        let mut decoder = PadDecoder::default();
        let frame = hello_frame();

        assert!(decoder.process(&xpad(&frame[..13]), false, FPAD_VARIABLE_CI).is_empty());

        // the continuation is lost as well
        let rest = padded(Vec::new(), 14);
        assert!(decoder.process(&xpad(&rest), false, FPAD_VARIABLE).is_empty());
        assert!(decoder.label().is_empty());
    }

    #[test]
    fn exact_length_mismatch() {
        let mut decoder = PadDecoder::default();
        let frame = padded(hello_frame(), 16);

        let events = decoder.process(&xpad(&frame), true, FPAD_VARIABLE_CI);
        assert_eq!(
            events,
            [PadEvent::LengthError {
                announced: 14,
                available: 16
            }]
        );

        // without exact length the trailing bytes are tolerated
        let events = decoder.process(&xpad(&frame), false, FPAD_VARIABLE_CI);
        assert_eq!(labels(&events), ["Hello"]);

        // and so they are in loose mode
        let mut decoder = PadDecoder::default();
        decoder.set_loose(true);
        let events = decoder.process(&xpad(&frame), true, FPAD_VARIABLE_CI);
        assert_eq!(labels(&events), ["Hello"]);
    }

    fn split_label_frames() -> (Vec<u8>, Vec<u8>) {
        let group = segment(false, 0, true, 0, b"Hello");

        let mut first = vec![0x02, 0x00];
        first.extend(&group[..4]);

        // continuation CI length is the whole previous X-PAD
        let second = padded(group[4..].to_vec(), 6);

        (first, second)
    }

    #[test]
    fn continuation_without_ci_list() {
        let mut decoder = PadDecoder::default();
        let (first, second) = split_label_frames();

        assert!(decoder.process(&xpad(&first), false, FPAD_VARIABLE_CI).is_empty());
        let events = decoder.process(&xpad(&second), false, FPAD_VARIABLE);

        assert_eq!(labels(&events), ["Hello"]);
    }

    #[test]
    fn continuation_across_frame_without_xpad() {
        let (first, second) = split_label_frames();

        let mut strict = PadDecoder::default();
        strict.process(&xpad(&first), false, FPAD_VARIABLE_CI);
        strict.process(&[], false, FPAD_NO_XPAD);
        assert!(strict.process(&xpad(&second), false, FPAD_VARIABLE).is_empty());

        let mut loose = PadDecoder::default();
        loose.set_loose(true);
        loose.process(&xpad(&first), false, FPAD_VARIABLE_CI);
        loose.process(&[], false, FPAD_NO_XPAD);
        let events = loose.process(&xpad(&second), false, FPAD_VARIABLE);

        assert_eq!(labels(&events), ["Hello"]);
    }

    #[test]
    fn unhandled_type_ends_continuation() {
        let mut decoder = PadDecoder::default();
        let (first, second) = split_label_frames();

        // DL subfield followed by a user defined one
        let mut logical = vec![0x02, 0x04, 0x00];
        logical.extend(&first[2..]);
        logical.extend([0; 4]);
        decoder.process(&xpad(&logical), false, FPAD_VARIABLE_CI);

        assert!(decoder.process(&xpad(&padded(second, 11)), false, FPAD_VARIABLE).is_empty());
    }

    #[test]
    fn truncated_ci_list_aborts() {
        let mut decoder = PadDecoder::default();

        // two CIs without end marker, X-PAD ends after them
        assert!(decoder.process(&xpad(&[0x02, 0x02]), false, FPAD_VARIABLE_CI).is_empty());
        assert!(decoder.process(&[], false, FPAD_VARIABLE_CI).is_empty());
        assert!(decoder.process(&[], false, [0x10, 0x02]).is_empty());
    }

    /// DGLI + MOT start subfields carrying one MOT data group.
    fn mot_frame(group: &[u8], class: u8) -> Vec<u8> {
        let len = [4, 6, 8, 12, 16, 24, 32, 48][class as usize];
        assert!(group.len() <= len);

        let mut logical = vec![0x01, (class << 5) | 12, 0x00];
        logical.extend(dgli(group.len() as u16));
        logical.extend(padded(group.to_vec(), len));
        logical
    }

    fn slides(events: &[PadEvent]) -> Vec<MotFile> {
        events
            .iter()
            .filter_map(|event| match event {
                PadEvent::SlideChanged(file) => Some(file.clone()),
                _ => None,
            })
            .collect()
    }

    fn mot_frames(content_type: u16) -> [Vec<u8>; 2] {
        let hdr = header(4, content_type, &TRIGGER_NOW);
        let header_dg = data_group(MOT_DG_TYPE_HEADER, 0x4242, 0, true, &hdr);
        let body_dg = data_group(MOT_DG_TYPE_BODY, 0x4242, 0, true, b"\xFF\xD8\xFF\xD9");
        assert_eq!((header_dg.len(), body_dg.len()), (23, 15));

        [mot_frame(&header_dg, 5), mot_frame(&body_dg, 4)]
    }

    #[test]
    fn mot_slide() {
        let mut decoder = PadDecoder::default();
        decoder.mot_app_type().set(Some(12));

        let [first, second] = mot_frames(0x0201);
        assert!(decoder.process(&xpad(&first), false, FPAD_VARIABLE_CI).is_empty());

        let slides = slides(&decoder.process(&xpad(&second), false, FPAD_VARIABLE_CI));
        assert_eq!(slides.len(), 1);
        assert_eq!(slides[0].body, b"\xFF\xD8\xFF\xD9");
        assert_eq!(slides[0].file_extension(), "jpg");
    }

    #[test]
    fn mot_requires_app_type() {
        let mut decoder = PadDecoder::default();
        let [first, second] = mot_frames(0x0201);

        decoder.process(&xpad(&first), false, FPAD_VARIABLE_CI);
        assert!(decoder.process(&xpad(&second), false, FPAD_VARIABLE_CI).is_empty());
    }

    #[test]
    fn mot_non_image_is_not_a_slide() {
        let mut decoder = PadDecoder::default();
        decoder.mot_app_type().set(Some(12));
        let [first, second] = mot_frames(0x0100);

        decoder.process(&xpad(&first), false, FPAD_VARIABLE_CI);
        assert!(decoder.process(&xpad(&second), false, FPAD_VARIABLE_CI).is_empty());
    }

    #[test]
    fn mot_app_type_is_shared_across_threads() -> anyhow::Result<()> {
        let decoder = PadDecoder::default();
        let handle = decoder.mot_app_type();
        assert_eq!(handle.get(), None);

        std::thread::spawn(move || handle.set(Some(12)))
            .join()
            .map_err(|_| anyhow::anyhow!("setter thread panicked"))?;

        assert_eq!(decoder.mot_app_type().get(), Some(12));

        Ok(())
    }

    #[test]
    fn reset_clears_state() {
        let mut decoder = PadDecoder::default();
        decoder.mot_app_type().set(Some(12));
        decoder.process(&xpad(&hello_frame()), false, FPAD_VARIABLE_CI);

        let (first, second) = split_label_frames();
        decoder.process(&xpad(&first), false, FPAD_VARIABLE_CI);
        decoder.reset();

        assert!(decoder.label().is_empty());
        assert_eq!(decoder.mot_app_type().get(), None);
        assert!(decoder.process(&xpad(&second), false, FPAD_VARIABLE).is_empty());
    }
}
