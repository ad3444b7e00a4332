use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use super::command::{Cli, DecodeArgs};
use super::events::{EventLog, EventRecord};
use super::session::{Session, SessionEvent};
use crate::input::InputReader;
use dabpad::structs::mot::MotFile;

pub fn cmd_decode(args: &DecodeArgs, cli: &Cli, multi: Option<&MultiProgress>) -> Result<()> {
    log::info!(
        "Decoding DAB+ sub-channel: {} ({} kbit/s, strict mode: {}, loose PAD: {})",
        args.input.display(),
        args.bitrate,
        cli.strict,
        args.loose
    );

    let mut session = Session::new(args.bitrate, cli.fail_level())?;
    session.set_loose(args.loose);
    session.set_mot_app_type(if args.no_mot {
        None
    } else {
        Some(args.mot_app_type)
    });

    if let Some(ref path) = args.output_path {
        fs::create_dir_all(path)
            .with_context(|| format!("Cannot create output path {}", path.display()))?;
        log::info!("Output path specified: {}", path.display());
    }

    let mut input_reader = InputReader::new(&args.input)?;
    if input_reader.is_pipe() {
        log::info!("Reading sub-channel from stdin");
    }
    let frame_len = session.frame_len();

    let pb = match multi {
        Some(multi) => {
            let total = input_reader.size().map(|size| size / frame_len as u64);
            Some(create_progress_bar(multi, total)?)
        }
        None => None,
    };

    let mut event_log = args.events.as_ref().map(|_| EventLog::default());
    let mut slide_count = 0;

    let rest = input_reader.process_frames(frame_len, |frame| {
        let events = session.feed(frame)?;
        let frame_index = session.stats().frames - 1;

        for event in &events {
            let mut file = None;

            if let (SessionEvent::Slide(slide), Some(dir)) = (event, &args.output_path) {
                let path = dir.join(slide_file_name(slide_count, slide));
                fs::write(&path, &slide.body)
                    .with_context(|| format!("Cannot write slide {}", path.display()))?;
                log::debug!("Slide written to {}", path.display());
                slide_count += 1;
                file = Some(path);
            }

            if let Some(log) = event_log.as_mut() {
                log.push(EventRecord::new(frame_index, event, file.as_deref()));
            }
        }

        if let Some(ref pb) = pb {
            pb.inc(1);
            if let Some(SessionEvent::Label(label)) = events
                .iter()
                .rev()
                .find(|e| matches!(e, SessionEvent::Label(_)))
            {
                pb.set_message(label.text.clone());
            }
        }

        Ok(true)
    })?;

    if rest > 0 {
        log::warn!("Ignoring {rest} trailing bytes (incomplete frame)");
    }

    if let Some(ref pb) = pb {
        pb.finish_and_clear();
    }

    if let (Some(log), Some(path)) = (&event_log, &args.events) {
        if log.is_empty() {
            log::warn!("No events decoded, the event log will be empty");
        }
        log.write(path)?;
    }

    let stats = session.stats();
    log::info!(
        "Decoded {} frames: {} labels, {} slides, {} audio errors",
        stats.frames,
        stats.labels,
        stats.slides,
        stats.audio_errors
    );

    Ok(())
}

fn create_progress_bar(multi: &MultiProgress, total_frames: Option<u64>) -> Result<ProgressBar> {
    let pb = if let Some(total) = total_frames {
        let pb = multi.add(ProgressBar::new(total));
        pb.set_style(ProgressStyle::with_template(
            "{bar:40.cyan/blue} {pos}/{len} frames ({percent}%)\n{msg} | elapsed: {elapsed_precise} | ETA: {eta_precise}",
        )?);
        pb
    } else {
        let pb = multi.add(ProgressBar::new_spinner());
        pb.set_style(ProgressStyle::with_template(
            "{spinner:.green} {pos} frames\n{msg} | elapsed: {elapsed_precise}",
        )?);
        pb
    };

    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb.set_message("waiting for label");
    Ok(pb)
}

/// Numbered file name for a slide, keeping only a safe form of its content name.
fn slide_file_name(index: usize, slide: &MotFile) -> PathBuf {
    let stem: String = Path::new(&slide.content_name)
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    let name = if stem.is_empty() {
        format!("{index:05}.{}", slide.file_extension())
    } else {
        format!("{index:05}_{stem}.{}", slide.file_extension())
    };

    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slide_names_are_sanitized() {
        let slide = MotFile {
            content_name: "../logos/station logo.png".to_string(),
            content_type: 0x0203,
            ..Default::default()
        };
        assert_eq!(slide_file_name(7, &slide), PathBuf::from("00007_station_logo.png"));

        let unnamed = MotFile {
            content_type: 0x0201,
            ..Default::default()
        };
        assert_eq!(slide_file_name(0, &unnamed), PathBuf::from("00000.jpg"));
    }
}
