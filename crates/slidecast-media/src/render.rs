//! Slide rendering and re-encode joins.
//!
//! A chunk is rendered in a single FFmpeg pass: every slide contributes a
//! looped still image and either its narration track or generated silence,
//! both trimmed to the slide duration, and the pairs are joined with the
//! `concat` filter.

use std::path::{Path, PathBuf};
use tracing::{info, warn};

use slidecast_models::encoding::AUDIO_SAMPLE_RATE;
use slidecast_models::EncodingProfile;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// Background colour of placeholder slides.
const PLACEHOLDER_COLOR: &str = "0x496d89";

/// One slide ready to render.
#[derive(Debug, Clone, PartialEq)]
pub struct SlideClip {
    pub image: PathBuf,
    /// Narration track; `None` renders silence
    pub audio: Option<PathBuf>,
    pub duration_secs: f64,
}

impl SlideClip {
    pub fn new(image: impl Into<PathBuf>, audio: Option<PathBuf>, duration_secs: f64) -> Self {
        Self {
            image: image.into(),
            audio,
            duration_secs,
        }
    }

    pub fn is_silent(&self) -> bool {
        self.audio.is_none()
    }
}

fn audio_format_filter() -> String {
    format!(
        "aresample={},aformat=sample_fmts=fltp:channel_layouts=stereo",
        AUDIO_SAMPLE_RATE
    )
}

/// Build the single-pass command that renders `clips` into `output`.
pub fn build_slides_command(
    clips: &[SlideClip],
    output: &Path,
    profile: &EncodingProfile,
) -> MediaResult<FfmpegCommand> {
    if clips.is_empty() {
        return Err(MediaError::EmptyInput("no slide clips".to_string()));
    }

    let mut cmd = FfmpegCommand::new(output);
    let mut graph = Vec::with_capacity(clips.len() * 2 + 1);
    let mut concat_inputs = String::new();

    for (i, clip) in clips.iter().enumerate() {
        let duration = format!("{:.3}", clip.duration_secs);
        let video_idx = cmd.input_count();
        cmd = cmd.input_with(
            [
                "-loop".to_string(),
                "1".to_string(),
                "-framerate".to_string(),
                profile.fps.to_string(),
                "-t".to_string(),
                duration.clone(),
            ],
            clip.image.to_string_lossy(),
        );

        let audio_idx = cmd.input_count();
        cmd = match &clip.audio {
            Some(audio) => cmd.input(audio),
            None => cmd.input_with(
                ["-f".to_string(), "lavfi".to_string(), "-t".to_string(), duration.clone()],
                format!("anullsrc=r={}:cl=stereo", AUDIO_SAMPLE_RATE),
            ),
        };

        graph.push(format!(
            "[{}:v]{},trim=duration={},setpts=PTS-STARTPTS[v{}]",
            video_idx,
            profile.normalize_video_filter(),
            duration,
            i
        ));
        graph.push(format!(
            "[{}:a]{},apad,atrim=duration={},asetpts=PTS-STARTPTS[a{}]",
            audio_idx,
            audio_format_filter(),
            duration,
            i
        ));
        concat_inputs.push_str(&format!("[v{}][a{}]", i, i));
    }

    graph.push(format!(
        "{}concat=n={}:v=1:a=1[outv][outa]",
        concat_inputs,
        clips.len()
    ));

    Ok(cmd
        .filter_complex(graph.join(";"))
        .map("[outv]")
        .map("[outa]")
        .output_args(profile.to_ffmpeg_args()))
}

/// Render slide clips into one video.
pub async fn render_slides(
    runner: &FfmpegRunner,
    clips: &[SlideClip],
    output: &Path,
    profile: &EncodingProfile,
) -> MediaResult<()> {
    let total: f64 = clips.iter().map(|c| c.duration_secs).sum();
    info!(
        "Rendering {} slides ({:.1}s) -> {}",
        clips.len(),
        total,
        output.display()
    );

    let cmd = build_slides_command(clips, output, profile)?;
    runner.run(&cmd).await
}

/// Build the command that decodes every input and re-encodes them in order.
pub fn build_reencode_command(
    inputs: &[PathBuf],
    output: &Path,
    profile: &EncodingProfile,
) -> MediaResult<FfmpegCommand> {
    if inputs.is_empty() {
        return Err(MediaError::EmptyInput("no videos to join".to_string()));
    }

    let mut cmd = FfmpegCommand::new(output);
    let mut graph = Vec::with_capacity(inputs.len() * 2 + 1);
    let mut concat_inputs = String::new();

    for (i, input) in inputs.iter().enumerate() {
        cmd = cmd.input(input);
        graph.push(format!("[{}:v]{}[v{}]", i, profile.normalize_video_filter(), i));
        graph.push(format!("[{}:a]{}[a{}]", i, audio_format_filter(), i));
        concat_inputs.push_str(&format!("[v{}][a{}]", i, i));
    }

    graph.push(format!(
        "{}concat=n={}:v=1:a=1[outv][outa]",
        concat_inputs,
        inputs.len()
    ));

    Ok(cmd
        .filter_complex(graph.join(";"))
        .map("[outv]")
        .map("[outa]")
        .output_args(profile.to_ffmpeg_args()))
}

/// Join videos by fully decoding and re-encoding them.
pub async fn reencode_join(
    runner: &FfmpegRunner,
    inputs: &[PathBuf],
    output: &Path,
    profile: &EncodingProfile,
) -> MediaResult<()> {
    for input in inputs {
        if !input.exists() {
            return Err(MediaError::FileNotFound(input.clone()));
        }
    }

    info!("Re-encoding {} videos -> {}", inputs.len(), output.display());
    let cmd = build_reencode_command(inputs, output, profile)?;
    runner.run(&cmd).await
}

/// Render a labelled placeholder frame for a slide.
///
/// `drawtext` needs an FFmpeg build with fontconfig; without it the frame is
/// rendered unlabelled.
pub async fn render_placeholder_slide(
    runner: &FfmpegRunner,
    label: &str,
    output: &Path,
    profile: &EncodingProfile,
) -> MediaResult<()> {
    let source = format!(
        "color=c={}:s={}x{}",
        PLACEHOLDER_COLOR, profile.width, profile.height
    );
    let base = FfmpegCommand::new(output).input_with(["-f", "lavfi"], source);

    let labelled = base
        .clone()
        .video_filter(format!(
            "drawtext=text='{}':fontcolor=white:fontsize=40:x=100:y=100",
            escape_drawtext(label)
        ))
        .single_frame();

    match runner.run(&labelled).await {
        Ok(()) => Ok(()),
        Err(e) => {
            warn!("Labelled placeholder failed, rendering plain frame: {}", e);
            runner.run(&base.single_frame()).await
        }
    }
}

fn escape_drawtext(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control())
        .flat_map(|c| match c {
            '\'' | ':' | '\\' | '%' => vec!['\\', c],
            _ => vec![c],
        })
        .collect()
}
