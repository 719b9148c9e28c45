//! Audio and video metadata with `ffprobe`.
//!
//! Stream `0` describes the container, ffprobe's own streams follow from
//! index `1`. Accessors that make no sense for a stream type (a frame rate
//! on an audio stream, say) are not applicable and never reach the record.

use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock};

use filescraper_common::{
    Accessor, Field, MetadataModel, Overrides, Result, Scraper, ScraperArgs, ScraperEntry,
    ScraperState, Support, Value,
};

use crate::command::ToolCommand;
use crate::scrapers::strip_zeros;
use crate::tools::get_tool_path;
use crate::Error;

static ENCODER_VERSION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"([\d.]+)$").unwrap());

const MOV_FAMILY: &[&str] = &["video/quicktime", "video/mp4", "audio/mp4"];

const FFMPEG_SUPPORT: Support = Support::new(&[
    ("video/mpeg", &[]),
    ("video/MP2T", &[]),
    ("video/mp4", &[]),
    ("video/quicktime", &[]),
    ("video/x-matroska", &[]),
    ("video/avi", &[]),
    ("video/dv", &[]),
    ("video/x-ffv", &[]),
    ("audio/mp4", &[]),
    ("audio/mpeg", &[]),
    ("audio/x-wav", &[]),
    ("audio/flac", &[]),
    ("audio/x-aiff", &[]),
])
.any_version()
.wellformed_only();

#[derive(Debug, Clone, Default, Deserialize)]
struct ProbeOutput {
    format: ProbeFormat,
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ProbeFormat {
    #[serde(default)]
    format_name: String,
    format_long_name: Option<String>,
    duration: Option<String>,
    #[serde(default)]
    tags: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ProbeStream {
    #[serde(default)]
    index: usize,
    codec_type: Option<String>,
    codec_name: Option<String>,
    codec_long_name: Option<String>,
    pix_fmt: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    sample_aspect_ratio: Option<String>,
    display_aspect_ratio: Option<String>,
    bit_rate: Option<String>,
    r_frame_rate: Option<String>,
    sample_rate: Option<String>,
    channels: Option<u32>,
    duration: Option<String>,
    bits_per_raw_sample: Option<String>,
}

/// Container MIME type from ffprobe's `format_name`.
///
/// QuickTime and MP4 share one demuxer, so the detectors' guess decides
/// between them.
fn container_mimetype(format_name: &str, predicted: Option<&str>) -> Value {
    let mime = match format_name {
        "mpeg" => "video/mpeg",
        "mpegts" => "video/MP2T",
        "matroska,webm" => "video/x-matroska",
        "avi" => "video/avi",
        "dv" => "video/dv",
        "wav" => "audio/x-wav",
        "mp3" => "audio/mpeg",
        "flac" => "audio/flac",
        "aiff" => "audio/x-aiff",
        "mov,mp4,m4a,3gp,3g2,mj2" => match predicted {
            Some(p) if MOV_FAMILY.contains(&p) => p,
            _ => "video/mp4",
        },
        _ => return Value::Unavailable,
    };
    Value::new(mime)
}

/// Stream MIME type from the codec name.
fn codec_mimetype(codec_name: &str) -> Value {
    let mime = match codec_name {
        "mpeg1video" | "mpeg2video" => "video/mpeg",
        "mpeg4" | "h264" | "hevc" => "video/mp4",
        "dvvideo" => "video/dv",
        "ffv1" => "video/x-ffv",
        "aac" => "audio/mp4",
        "mp1" | "mp2" | "mp3" => "audio/mpeg",
        "flac" => "audio/flac",
        c if c.starts_with("pcm_") => "audio/x-wav",
        _ => return Value::Unavailable,
    };
    Value::new(mime)
}

/// Seconds as an ISO 8601 duration, e.g. `PT1M2.5S`.
fn iso8601_duration(seconds: f64) -> String {
    let total = (seconds * 100.0).round() / 100.0;
    let hours = (total / 3600.0).floor();
    let minutes = ((total - hours * 3600.0) / 60.0).floor();
    let secs = total - hours * 3600.0 - minutes * 60.0;

    let mut out = String::from("PT");
    if hours > 0.0 {
        out.push_str(&format!("{hours}H"));
    }
    if minutes > 0.0 {
        out.push_str(&format!("{minutes}M"));
    }
    if secs > 0.0 {
        out.push_str(&format!("{}S", strip_zeros(&format!("{secs:.2}"))));
    }
    out
}

/// `"16:9"` as `"1.78"`.
fn aspect_ratio(ratio: &str) -> Option<String> {
    let (num, den) = ratio.split_once(':')?;
    let num: f64 = num.parse().ok()?;
    let den: f64 = den.parse().ok()?;
    if den == 0.0 {
        return None;
    }
    Some(strip_zeros(&format!("{:.2}", num / den)))
}

fn scaled(value: &str, divisor: f64) -> Option<String> {
    let v: f64 = value.parse().ok()?;
    Some(strip_zeros(&(v / divisor).to_string()))
}

fn chroma_sampling(pix_fmt: &str) -> Option<String> {
    ["444", "422", "420", "440", "411", "410"]
        .iter()
        .find(|code| pix_fmt.contains(*code))
        .map(|code| {
            code.chars()
                .map(String::from)
                .collect::<Vec<_>>()
                .join(":")
        })
}

/// Metadata for one ffprobe stream, or for the container itself.
#[derive(Debug, Clone)]
pub struct FfmpegMeta {
    index: usize,
    /// `None` for the container.
    stream: Option<ProbeStream>,
    format: Arc<ProbeFormat>,
    has_audio: bool,
    predicted_mimetype: Option<String>,
    overrides: Option<Overrides>,
}

impl FfmpegMeta {
    fn stream_type(&self) -> &str {
        match &self.stream {
            None => "videocontainer",
            Some(s) => s.codec_type.as_deref().unwrap_or("other"),
        }
    }

    fn is(&self, types: &[&str]) -> bool {
        types.contains(&self.stream_type())
    }

    fn stream_field<F>(&self, types: &[&str], get: F) -> Field
    where
        F: FnOnce(&ProbeStream) -> Option<String>,
    {
        Field::when(self.is(types), || {
            Value::from_option(self.stream.as_ref().and_then(get))
        })
    }

    fn stream_field_or<F>(&self, types: &[&str], default: &str, get: F) -> Field
    where
        F: FnOnce(&ProbeStream) -> Option<String>,
    {
        Field::when(self.is(types), || {
            Value::new(
                self.stream
                    .as_ref()
                    .and_then(get)
                    .unwrap_or_else(|| default.to_string()),
            )
        })
    }

    fn encoder(&self) -> Option<&str> {
        self.format.tags.get("encoder").map(String::as_str)
    }
}

impl MetadataModel for FfmpegMeta {
    fn support(&self) -> &'static Support {
        &FFMPEG_SUPPORT
    }

    fn overrides(&self) -> Option<&Overrides> {
        self.overrides.as_ref()
    }

    fn index(&self) -> usize {
        self.index
    }

    fn scraped_mimetype(&self) -> Value {
        match &self.stream {
            None => container_mimetype(&self.format.format_name, self.predicted_mimetype.as_deref()),
            Some(s) => s
                .codec_name
                .as_deref()
                .map(codec_mimetype)
                .unwrap_or_default(),
        }
    }

    fn accessors(&self) -> Vec<Accessor> {
        const AV: &[&str] = &["video", "audio"];
        const VIDEO: &[&str] = &["video"];
        const AUDIO: &[&str] = &["audio"];
        const CODED: &[&str] = &["video", "audio", "videocontainer"];

        let is_video = self.stream_type() == "video";
        vec![
            Accessor::new("stream_type", Field::known(self.stream_type())),
            Accessor::new("codec_quality", Field::when(self.is(AV), Value::default)),
            Accessor::new("data_rate_mode", Field::when(self.is(AV), Value::default)),
            Accessor::new("signal_format", Field::when(self.is(VIDEO), Value::default)),
            Accessor::new(
                "color",
                self.stream_field(VIDEO, |s| {
                    s.pix_fmt.as_deref().map(|fmt| {
                        match fmt {
                            "gray" => "Grayscale",
                            "monob" | "monow" => "B&W",
                            _ => "Color",
                        }
                        .to_string()
                    })
                }),
            ),
            Accessor::new(
                "width",
                self.stream_field_or(VIDEO, "0", |s| s.width.map(|w| w.to_string())),
            ),
            Accessor::new(
                "height",
                self.stream_field_or(VIDEO, "0", |s| s.height.map(|h| h.to_string())),
            ),
            Accessor::new(
                "par",
                self.stream_field_or(VIDEO, "0", |s| {
                    s.sample_aspect_ratio.as_deref().and_then(aspect_ratio)
                }),
            ),
            Accessor::new(
                "dar",
                self.stream_field(VIDEO, |s| {
                    s.display_aspect_ratio.as_deref().and_then(aspect_ratio)
                }),
            ),
            Accessor::new(
                "data_rate",
                self.stream_field_or(AV, "0", |s| {
                    let divisor = if is_video { 1_000_000.0 } else { 1000.0 };
                    s.bit_rate.as_deref().and_then(|b| scaled(b, divisor))
                }),
            ),
            Accessor::new(
                "frame_rate",
                self.stream_field_or(VIDEO, "0", |s| {
                    s.r_frame_rate
                        .as_deref()
                        .and_then(|r| r.split('/').next())
                        .map(str::to_string)
                }),
            ),
            Accessor::new(
                "sampling",
                self.stream_field(VIDEO, |s| s.pix_fmt.as_deref().and_then(chroma_sampling)),
            ),
            Accessor::new(
                "sound",
                Field::when(self.is(VIDEO), || {
                    Value::new(if self.has_audio { "Yes" } else { "No" })
                }),
            ),
            Accessor::new(
                "audio_data_encoding",
                self.stream_field(AUDIO, |s| {
                    s.codec_long_name
                        .as_deref()
                        .and_then(|n| n.split(' ').next())
                        .map(str::to_string)
                }),
            ),
            Accessor::new(
                "sampling_frequency",
                self.stream_field_or(AUDIO, "0", |s| {
                    s.sample_rate.as_deref().and_then(|r| scaled(r, 1000.0))
                }),
            ),
            Accessor::new(
                "num_channels",
                self.stream_field(AUDIO, |s| s.channels.map(|c| c.to_string())),
            ),
            Accessor::new(
                "codec_creator_app",
                Field::when(self.is(CODED), || Value::from_option(self.encoder())),
            ),
            Accessor::new(
                "codec_creator_app_version",
                Field::when(self.is(CODED), || {
                    Value::from_option(
                        self.encoder()
                            .and_then(|e| ENCODER_VERSION.captures(e))
                            .map(|c| c[1].to_string()),
                    )
                }),
            ),
            Accessor::new(
                "codec_name",
                Field::when(self.is(CODED), || match &self.stream {
                    None => Value::from_option(self.format.format_long_name.clone()),
                    Some(s) => Value::from_option(s.codec_long_name.clone()),
                }),
            ),
            Accessor::new(
                "duration",
                self.stream_field(AV, |s| {
                    s.duration
                        .as_deref()
                        .and_then(|d| d.parse::<f64>().ok())
                        .map(iso8601_duration)
                }),
            ),
            Accessor::new(
                "bits_per_sample",
                self.stream_field_or(AV, "0", |s| s.bits_per_raw_sample.clone()),
            ),
        ]
    }
}

/// Audio/video scraper driven by `ffprobe`.
#[derive(Debug)]
pub struct FfmpegScraper {
    state: ScraperState,
}

impl FfmpegScraper {
    pub const ENTRY: ScraperEntry = ScraperEntry {
        name: "FfmpegScraper",
        only_wellformed: true,
        metadata: &[&FFMPEG_SUPPORT],
        build: Self::boxed,
    };

    pub fn new(args: ScraperArgs) -> Self {
        Self {
            state: ScraperState::new(args),
        }
    }

    fn boxed(args: ScraperArgs) -> Box<dyn Scraper> {
        Box::new(Self::new(args))
    }

    fn collect(&mut self, output: ProbeOutput) {
        let format = Arc::new(output.format);
        let has_audio = output
            .streams
            .iter()
            .any(|s| s.codec_type.as_deref() == Some("audio"));
        let predicted = self.state.predicted_mimetype().map(str::to_string);

        self.state.push_stream(Box::new(FfmpegMeta {
            index: 0,
            stream: None,
            format: Arc::clone(&format),
            has_audio,
            predicted_mimetype: predicted.clone(),
            overrides: Some(self.state.overrides().clone()),
        }));
        for stream in output.streams {
            self.state.push_stream(Box::new(FfmpegMeta {
                index: stream.index + 1,
                stream: Some(stream),
                format: Arc::clone(&format),
                has_audio,
                predicted_mimetype: predicted.clone(),
                overrides: None,
            }));
        }
    }
}

impl Scraper for FfmpegScraper {
    fn name(&self) -> &'static str {
        "FfmpegScraper"
    }

    scraper_state!();

    fn only_wellformed(&self) -> bool {
        Self::ENTRY.only_wellformed
    }

    fn run(&mut self) -> Result<()> {
        let ffprobe = get_tool_path("ffprobe", self.state.tools())?;
        let output = ToolCommand::new(ffprobe)
            .args(["-v", "error", "-print_format", "json", "-show_format", "-show_streams"])
            .arg(self.state.path())
            .execute()?;

        if !output.success() {
            if self.state.predicted_mimetype() == Some("application/octet-stream") {
                self.state
                    .message("Was not an audio/video file, skipping scraper...");
            } else {
                self.state.error("Error in scraping file.");
                self.state.error(output.stderr.trim());
            }
            return Ok(());
        }

        let probe: ProbeOutput = serde_json::from_str(&output.stdout)
            .map_err(|e| Error::parse_error("ffprobe", e.to_string()))?;
        self.collect(probe);
        self.state.message("The file was scraped successfully.");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROBE_JSON: &str = r#"{
        "streams": [
            {
                "index": 0,
                "codec_name": "h264",
                "codec_long_name": "H.264 / AVC / MPEG-4 AVC / MPEG-4 part 10",
                "codec_type": "video",
                "width": 320,
                "height": 180,
                "sample_aspect_ratio": "1:1",
                "display_aspect_ratio": "16:9",
                "pix_fmt": "yuv420p",
                "r_frame_rate": "30/1",
                "duration": "30.000000",
                "bit_rate": "8000000",
                "bits_per_raw_sample": "8"
            },
            {
                "index": 1,
                "codec_name": "aac",
                "codec_long_name": "AAC (Advanced Audio Coding)",
                "codec_type": "audio",
                "sample_rate": "44100",
                "channels": 2,
                "bit_rate": "128000",
                "duration": "30.000000"
            }
        ],
        "format": {
            "filename": "valid.mp4",
            "format_name": "mov,mp4,m4a,3gp,3g2,mj2",
            "format_long_name": "QuickTime / MOV",
            "duration": "30.024000",
            "tags": {"encoder": "Lavf56.40.101"}
        }
    }"#;

    fn scraped(args: ScraperArgs) -> FfmpegScraper {
        let mut scraper = FfmpegScraper::new(args);
        scraper.collect(serde_json::from_str(PROBE_JSON).unwrap());
        scraper
    }

    fn get<'a>(record: &'a filescraper_common::ModelRecord, name: &str) -> Option<&'a str> {
        record
            .entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.value.as_str())
    }

    #[test]
    fn test_streams_are_indexed_after_container() {
        let scraper = scraped(
            ScraperArgs::new("valid.mp4", true).with_predicted_mimetype(Some("video/mp4".into())),
        );
        let records = scraper.records();
        assert_eq!(records.iter().map(|r| r.index).collect::<Vec<_>>(), vec![0, 1, 2]);

        let container = &records[0];
        assert_eq!(get(container, "mimetype"), Some("video/mp4"));
        assert_eq!(get(container, "stream_type"), Some("videocontainer"));
        assert_eq!(get(container, "codec_creator_app_version"), Some("56.40.101"));
        assert_eq!(get(container, "codec_name"), Some("QuickTime / MOV"));
        assert_eq!(get(container, "width"), None);
        assert_eq!(get(container, "duration"), None);
    }

    #[test]
    fn test_video_stream_accessors() {
        let records = scraped(ScraperArgs::new("valid.mp4", true)).records();
        let video = &records[1];
        assert_eq!(get(video, "mimetype"), Some("video/mp4"));
        assert_eq!(get(video, "width"), Some("320"));
        assert_eq!(get(video, "par"), Some("1"));
        assert_eq!(get(video, "dar"), Some("1.78"));
        assert_eq!(get(video, "data_rate"), Some("8"));
        assert_eq!(get(video, "frame_rate"), Some("30"));
        assert_eq!(get(video, "sampling"), Some("4:2:0"));
        assert_eq!(get(video, "sound"), Some("Yes"));
        assert_eq!(get(video, "color"), Some("Color"));
        assert_eq!(get(video, "duration"), Some("PT30S"));
        assert_eq!(get(video, "codec_quality"), Some("(:unav)"));
        assert_eq!(get(video, "sampling_frequency"), None);
    }

    #[test]
    fn test_audio_stream_accessors() {
        let records = scraped(ScraperArgs::new("valid.mp4", true)).records();
        let audio = &records[2];
        assert_eq!(get(audio, "mimetype"), Some("audio/mp4"));
        assert_eq!(get(audio, "audio_data_encoding"), Some("AAC"));
        assert_eq!(get(audio, "sampling_frequency"), Some("44.1"));
        assert_eq!(get(audio, "num_channels"), Some("2"));
        assert_eq!(get(audio, "data_rate"), Some("128"));
        assert_eq!(get(audio, "bits_per_sample"), Some("0"));
        assert_eq!(get(audio, "width"), None);
        assert_eq!(get(audio, "sound"), None);
    }

    #[test]
    fn test_overrides_apply_to_container_only() {
        let params = filescraper_common::Params::new().with("mimetype", "video/quicktime");
        let records = scraped(ScraperArgs::new("valid.mp4", true).with_params(params)).records();
        assert_eq!(get(&records[0], "mimetype"), Some("video/quicktime"));
        assert_eq!(get(&records[1], "mimetype"), Some("video/mp4"));
    }

    #[test]
    fn test_supported_streams_pass_check() {
        let mut scraper = scraped(ScraperArgs::new("valid.mp4", true));
        scraper.state_mut().check_supported();
        assert!(scraper.errors().is_empty(), "{:?}", scraper.errors());
    }

    #[test]
    fn test_helpers() {
        assert_eq!(iso8601_duration(62.5), "PT1M2.5S");
        assert_eq!(iso8601_duration(3600.0), "PT1H");
        assert_eq!(aspect_ratio("4:3"), Some("1.33".to_string()));
        assert_eq!(aspect_ratio("0:0"), None);
        assert_eq!(container_mimetype("mpegts", None), Value::new("video/MP2T"));
        assert_eq!(
            container_mimetype("mov,mp4,m4a,3gp,3g2,mj2", Some("video/quicktime")),
            Value::new("video/quicktime")
        );
        assert_eq!(container_mimetype("bogus", None), Value::Unavailable);
        assert_eq!(codec_mimetype("pcm_s16le"), Value::new("audio/x-wav"));
        assert_eq!(codec_mimetype("subrip"), Value::Unavailable);
    }
}
