use anyhow::Result;
use log::{debug, info, warn};

use dabpad::process::pad::{PadDecoder, PadEvent};
use dabpad::process::superframe::{SuperframeEvent, SuperframeFilter};
use dabpad::structs::audio_format::AudioServiceFormat;
use dabpad::structs::dynamic_label::DynamicLabel;
use dabpad::structs::mot::MotFile;

/// Decoded results of one audio frame, in stream order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Format(AudioServiceFormat),
    AudioError(String),
    Label(DynamicLabel),
    Slide(MotFile),
    LengthError { announced: usize, available: usize },
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SessionStats {
    pub frames: usize,
    pub superframes: usize,
    pub rs_corrected: usize,
    pub rs_uncorrectable: usize,
    pub audio_errors: usize,
    pub length_errors: usize,
    pub labels: usize,
    pub slides: usize,
}

/// Superframe filter and PAD decoder for one DAB+ sub-channel.
pub struct Session {
    filter: SuperframeFilter,
    pad: PadDecoder,
    stats: SessionStats,
}

impl Session {
    pub fn new(bitrate_kbps: usize, fail_level: log::Level) -> Result<Self> {
        let mut filter = SuperframeFilter::new(bitrate_kbps)?;
        filter.set_fail_level(fail_level);

        Ok(Self {
            filter,
            pad: PadDecoder::default(),
            stats: SessionStats::default(),
        })
    }

    pub fn set_loose(&mut self, loose: bool) {
        self.pad.set_loose(loose);
    }

    pub fn set_mot_app_type(&mut self, app_type: Option<u8>) {
        self.pad.mot_app_type().set(app_type);
    }

    pub fn frame_len(&self) -> usize {
        self.filter.frame_len()
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn label(&self) -> &DynamicLabel {
        self.pad.label()
    }

    pub fn format(&self) -> Option<AudioServiceFormat> {
        self.filter.format()
    }

    /// Processes one sub-channel frame.
    pub fn feed(&mut self, frame: &[u8]) -> Result<Vec<SessionEvent>> {
        let mut events = Vec::new();
        self.stats.frames += 1;

        for event in self.filter.feed(frame)? {
            match event {
                SuperframeEvent::FormatChanged(format) => {
                    info!("Audio format: {format}");
                    events.push(SessionEvent::Format(format));
                }
                SuperframeEvent::FecInfo {
                    corrected,
                    uncorrectable,
                } => {
                    self.stats.superframes += 1;
                    self.stats.rs_corrected += corrected;
                    self.stats.rs_uncorrectable += uncorrectable;
                }
                SuperframeEvent::AudioError(message) => {
                    self.stats.audio_errors += 1;
                    warn!("Audio error at frame {}: {message}", self.stats.frames);
                    events.push(SessionEvent::AudioError(message));
                }
                SuperframeEvent::Pad { xpad, fpad } => {
                    for pad_event in self.pad.process(&xpad, true, fpad) {
                        events.push(self.pad_event(pad_event));
                    }
                }
            }
        }

        Ok(events)
    }

    fn pad_event(&mut self, event: PadEvent) -> SessionEvent {
        match event {
            PadEvent::LabelChanged(label) => {
                self.stats.labels += 1;
                info!("Label: {label}");
                SessionEvent::Label(label)
            }
            PadEvent::SlideChanged(slide) => {
                self.stats.slides += 1;
                info!("Slide: {slide}");
                SessionEvent::Slide(slide)
            }
            PadEvent::LengthError {
                announced,
                available,
            } => {
                self.stats.length_errors += 1;
                debug!("X-PAD length mismatch: {announced} announced, {available} available");
                SessionEvent::LengthError {
                    announced,
                    available,
                }
            }
        }
    }
}
