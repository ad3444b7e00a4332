use anyhow::Result;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use super::command::{Cli, DEFAULT_MOT_APP_TYPE, InfoArgs};
use super::session::{Session, SessionStats};
use crate::input::InputReader;
use dabpad::process::superframe::FRAMES_PER_SUPERFRAME;
use dabpad::structs::dynamic_label::DynamicLabel;

/// Duration of one DAB+ audio frame in milliseconds.
const FRAME_DURATION_MS: usize = 24;

pub fn cmd_info(args: &InfoArgs, cli: &Cli, multi: Option<&MultiProgress>) -> Result<()> {
    log::info!("Analyzing DAB+ sub-channel: {}", args.input.display());

    let mut session = Session::new(args.bitrate, cli.fail_level())?;
    session.set_mot_app_type(Some(DEFAULT_MOT_APP_TYPE));

    let pb = match multi {
        Some(multi) => {
            let pb = multi.add(ProgressBar::new_spinner());
            pb.set_style(ProgressStyle::with_template("{spinner:.green} {msg}")?);
            pb.enable_steady_tick(std::time::Duration::from_millis(100));
            pb.set_message("Analyzing frames...");
            Some(pb)
        }
        None => None,
    };

    let mut input_reader = InputReader::new(&args.input)?;
    input_reader.process_frames(session.frame_len(), |frame| {
        session.feed(frame)?;

        let frames = session.stats().frames;
        if let Some(ref pb) = pb {
            if frames.is_multiple_of(100) {
                pb.set_message(format!("Analyzing frames...       {frames}"));
            }
        }

        Ok(true)
    })?;

    if let Some(ref pb) = pb {
        pb.finish_and_clear();
    }

    println!();
    println!("DAB+ Sub-channel Information");
    println!("============================");
    println!();

    match session.format() {
        Some(format) => {
            println!("Audio Format");
            println!("  Codec                     {}", format.codec);
            println!("  Sampling rate             {} kHz", format.sample_rate_khz);
            println!("  Mode                      {}", format.mode);
            println!("  Bitrate                   {} kbit/s", format.bitrate_kbps);
            println!();
        }
        None => {
            println!("No DAB+ superframe found in the input.");
            println!("Check the bitrate or whether this is a DAB+ sub-channel.");
            println!();
        }
    }

    display_stats(session.stats());
    display_label(session.label());

    Ok(())
}

fn display_stats(stats: &SessionStats) {
    let duration_secs = (stats.frames * FRAME_DURATION_MS) as f64 / 1000.0;
    let lost = (stats.frames / FRAMES_PER_SUPERFRAME).saturating_sub(stats.superframes);

    println!("Analysis Summary");
    println!("  Frames processed          {}", stats.frames);
    println!("  Duration                  {duration_secs:.1} s");
    println!("  Superframes               {} ({lost} not synced)", stats.superframes);
    println!("  RS symbols corrected      {}", stats.rs_corrected);
    println!("  RS codewords failed       {}", stats.rs_uncorrectable);
    println!("  Audio errors              {}", stats.audio_errors);
    println!("  X-PAD length errors       {}", stats.length_errors);
    println!("  Label updates             {}", stats.labels);
    println!("  Slides                    {}", stats.slides);
    println!();
}

fn display_label(label: &DynamicLabel) {
    if label.is_empty() {
        return;
    }

    println!("Dynamic Label");
    println!("  Text                      {}", label.text);
    println!("  Charset                   {}", label.charset);
    for (content_type, text) in label.tags() {
        println!("  {:26}{text}", content_type.name);
    }
    println!();
}
