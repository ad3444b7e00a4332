use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Serialize;

use super::session::SessionEvent;
use dabpad::structs::dynamic_label::DynamicLabel;
use dabpad::structs::mot::{MotFile, MotTime};

/// One entry of the YAML event log.
#[derive(Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EventRecord {
    Format {
        frame: usize,
        format: String,
    },
    AudioError {
        frame: usize,
        message: String,
    },
    Label {
        frame: usize,
        text: String,
        charset: String,
        #[serde(skip_serializing_if = "BTreeMap::is_empty")]
        tags: BTreeMap<String, String>,
    },
    Slide {
        frame: usize,
        name: String,
        content_type: String,
        size: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        file: Option<PathBuf>,
        #[serde(skip_serializing_if = "Option::is_none")]
        category: Option<u8>,
        #[serde(skip_serializing_if = "Option::is_none")]
        slide_id: Option<u8>,
        #[serde(skip_serializing_if = "String::is_empty")]
        click_through_url: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        trigger_time: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        expire_time: Option<String>,
    },
    LengthError {
        frame: usize,
        announced: usize,
        available: usize,
    },
}

impl EventRecord {
    pub fn new(frame: usize, event: &SessionEvent, file: Option<&Path>) -> Self {
        match event {
            SessionEvent::Format(format) => Self::Format {
                frame,
                format: format.to_string(),
            },
            SessionEvent::AudioError(message) => Self::AudioError {
                frame,
                message: message.clone(),
            },
            SessionEvent::Label(label) => Self::label(frame, label),
            SessionEvent::Slide(slide) => Self::slide(frame, slide, file),
            &SessionEvent::LengthError {
                announced,
                available,
            } => Self::LengthError {
                frame,
                announced,
                available,
            },
        }
    }

    fn label(frame: usize, label: &DynamicLabel) -> Self {
        Self::Label {
            frame,
            text: label.text.clone(),
            charset: label.charset.to_string(),
            tags: label
                .tags()
                .into_iter()
                .map(|(ct, text)| (ct.name.to_string(), text.to_string()))
                .collect(),
        }
    }

    fn slide(frame: usize, slide: &MotFile, file: Option<&Path>) -> Self {
        let time = |t: &Option<MotTime>| t.as_ref().map(MotTime::to_string);

        Self::Slide {
            frame,
            name: slide.content_name.clone(),
            content_type: format!("{} ({:#06X})", slide.content_main_type, slide.content_type),
            size: slide.body.len(),
            file: file.map(Path::to_path_buf),
            category: slide.category,
            slide_id: slide.slide_id,
            click_through_url: slide.click_through_url.clone(),
            trigger_time: time(&slide.trigger_time),
            expire_time: time(&slide.expire_time),
        }
    }
}

/// Collects event records and writes them as one YAML sequence.
#[derive(Debug, Default)]
pub struct EventLog {
    records: Vec<EventRecord>,
}

impl EventLog {
    pub fn push(&mut self, record: EventRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml_ng::to_string(&self.records)?)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_yaml()?)?;
        log::info!("Wrote {} events to {}", self.len(), path.display());
        Ok(())
    }
}
