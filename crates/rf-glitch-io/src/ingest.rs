//! Loading sample streams from CSV, raw and WAV files
//!
//! Every loader produces a canonical [`SampleStream`]. Column naming
//! conventions live in [`ChannelResolver`] and nowhere else.

use crate::{IngestError, Result};
use rf_glitch::{ChannelId, GlitchError, SampleStream};
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

/// Sample rate assumed for CSV input when none is given
pub const DEFAULT_SAMPLE_RATE: f64 = 44100.0;

/// Columns that carry timing or indexing rather than samples
const INDEX_COLUMNS: &[&str] = &["frame", "sample_index", "time", "time_seconds"];

/// Bytes per raw `f32` sample
const RAW_SAMPLE_BYTES: usize = 4;

/// On-disk input format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    /// Header row plus one row per frame
    Csv,
    /// Headerless little-endian interleaved `f32`
    Raw,
    /// RIFF WAVE, float or integer PCM
    Wav,
}

impl InputFormat {
    /// Guess the format from a file extension
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Self> {
        let ext = path.as_ref().extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Some(Self::Csv),
            "raw" | "f32" | "pcm" | "bin" => Some(Self::Raw),
            "wav" | "wave" => Some(Self::Wav),
            _ => None,
        }
    }
}

impl FromStr for InputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "raw" => Ok(Self::Raw),
            "wav" => Ok(Self::Wav),
            other => Err(format!("unknown input format '{}' (expected csv, raw or wav)", other)),
        }
    }
}

/// Maps CSV header names to channel ids
///
/// With explicit columns the n-th name becomes channel n. Otherwise the
/// known dump conventions are tried in order and the first match wins:
/// `left_channel`/`right_channel`, `channel_0`.., `left`/`right`,
/// `amplitude`, then `sample` or `value`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelResolver {
    columns: Option<Vec<String>>,
}

impl ChannelResolver {
    /// Resolve by the built-in naming conventions
    pub fn conventions() -> Self {
        Self::default()
    }

    /// Resolve exactly these columns, in channel order
    pub fn explicit<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: Some(columns.into_iter().map(Into::into).collect()),
        }
    }

    /// Column positions for channel 0, 1, ... in `header`
    pub fn resolve(&self, header: &[String]) -> Result<Vec<usize>> {
        let find = |name: &str| header.iter().position(|h| h.eq_ignore_ascii_case(name));

        if let Some(columns) = &self.columns {
            return columns
                .iter()
                .map(|name| find(name).ok_or_else(|| IngestError::MissingColumn(name.clone())))
                .collect();
        }

        if let Some(left) = find("left_channel") {
            let mut positions = vec![left];
            positions.extend(find("right_channel"));
            return Ok(positions);
        }

        let numbered: Vec<usize> = (0..)
            .map(|n| find(&format!("channel_{}", n)))
            .take_while(Option::is_some)
            .flatten()
            .collect();
        if !numbered.is_empty() {
            return Ok(numbered);
        }

        if let Some(left) = find("left") {
            let mut positions = vec![left];
            positions.extend(find("right"));
            return Ok(positions);
        }

        ["amplitude", "sample", "value"]
            .iter()
            .find_map(|name| find(name))
            .map(|position| vec![position])
            .ok_or_else(|| {
                let data: Vec<&str> = header
                    .iter()
                    .map(String::as_str)
                    .filter(|h| !INDEX_COLUMNS.iter().any(|i| h.eq_ignore_ascii_case(i)))
                    .collect();
                IngestError::MissingColumn(format!(
                    "no known channel column among [{}]",
                    data.join(", ")
                ))
            })
    }
}

/// How to turn a file into a stream
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Forced format; guessed from the extension when `None`
    pub format: Option<InputFormat>,

    /// Rate for CSV / raw input; checked against the header for WAV
    pub sample_rate: Option<f64>,

    /// Interleaved channel count for raw input
    pub num_channels: usize,

    /// Keep at most this many seconds
    pub max_duration: Option<f64>,

    /// Processing buffer size the stream was rendered with
    pub frame_size: Option<usize>,

    pub resolver: ChannelResolver,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            format: None,
            sample_rate: None,
            num_channels: 2,
            max_duration: None,
            frame_size: None,
            resolver: ChannelResolver::conventions(),
        }
    }
}

impl LoadOptions {
    pub fn with_format(mut self, format: InputFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn with_sample_rate(mut self, sample_rate: f64) -> Self {
        self.sample_rate = Some(sample_rate);
        self
    }

    pub fn with_channels(mut self, num_channels: usize) -> Self {
        self.num_channels = num_channels;
        self
    }

    pub fn with_max_duration(mut self, seconds: f64) -> Self {
        self.max_duration = Some(seconds);
        self
    }

    pub fn with_frame_size(mut self, frame_size: usize) -> Self {
        self.frame_size = Some(frame_size);
        self
    }

    pub fn with_resolver(mut self, resolver: ChannelResolver) -> Self {
        self.resolver = resolver;
        self
    }

    fn rate_or_default(&self) -> f64 {
        self.sample_rate.unwrap_or(DEFAULT_SAMPLE_RATE)
    }

    /// Frame budget implied by `max_duration` at `sample_rate`
    ///
    /// Durations past `usize::MAX` frames saturate; negative or non-finite
    /// durations are rejected.
    fn max_frames(&self, sample_rate: f64) -> Result<Option<usize>> {
        match self.max_duration {
            None => Ok(None),
            Some(seconds) if seconds.is_finite() && seconds >= 0.0 => {
                Ok(Some((seconds * sample_rate).floor() as usize))
            }
            Some(seconds) => Err(GlitchError::InvalidInput(format!(
                "max duration must be a finite, non-negative number of seconds, got {}",
                seconds
            ))
            .into()),
        }
    }
}

/// Load a stream, dispatching on the configured or guessed format
pub fn load<P: AsRef<Path>>(path: P, options: &LoadOptions) -> Result<SampleStream> {
    let path = path.as_ref();
    let path_str = path.display().to_string();

    let format = options
        .format
        .or_else(|| InputFormat::from_path(path))
        .ok_or_else(|| {
            IngestError::Unsupported(format!("{}: cannot tell the format, pass one explicitly", path_str))
        })?;

    log::debug!("Loading {} as {:?}", path_str, format);

    let stream = match format {
        InputFormat::Csv => parse_csv(&std::fs::read_to_string(path)?, options)?,
        InputFormat::Raw => read_raw(std::fs::File::open(path)?, options)?,
        InputFormat::Wav => load_wav(path, options)?,
    };

    if stream.shared_len() == 0 {
        return Err(IngestError::Empty(path_str));
    }

    log::info!(
        "Loaded {}: {} channel(s), {} samples @ {}Hz",
        path_str,
        stream.num_channels(),
        stream.shared_len(),
        stream.sample_rate()
    );

    Ok(stream)
}

/// Split one CSV line into trimmed cells
///
/// Double-quoted cells may hold commas, and `""` inside quotes is a literal
/// quote. Quoted cells never span lines.
fn split_row(line: &str) -> Vec<String> {
    let mut cells = Vec::new();
    let mut cell = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if quoted && chars.peek() == Some(&'"') => {
                cell.push('"');
                chars.next();
            }
            '"' => quoted = !quoted,
            ',' if !quoted => cells.push(std::mem::take(&mut cell).trim().to_string()),
            _ => cell.push(c),
        }
    }
    cells.push(cell.trim().to_string());

    cells
}

/// Numeric rows under a header, with 1-based line numbers
struct CsvTable {
    header: Vec<String>,
    rows: Vec<(usize, Vec<String>)>,
}

impl CsvTable {
    fn parse(text: &str) -> Result<Self> {
        let mut lines = text
            .lines()
            .enumerate()
            .map(|(i, line)| (i + 1, line))
            .filter(|(_, line)| !line.trim().is_empty());

        let (_, header_line) = lines.next().ok_or_else(|| IngestError::Empty("CSV input".into()))?;
        let header = split_row(header_line.trim_start_matches('\u{feff}'));
        let rows = lines.map(|(number, line)| (number, split_row(line))).collect();

        Ok(Self { header, rows })
    }

    /// Values of one column up to its first empty or missing cell
    ///
    /// Samples past a gap cannot be placed in time, so the column ends there.
    fn column(&self, position: usize, limit: Option<usize>) -> Result<Vec<f64>> {
        let mut values = Vec::with_capacity(self.rows.len());

        for (line, cells) in &self.rows {
            if limit.is_some_and(|max| values.len() >= max) {
                break;
            }

            let cell = match cells.get(position) {
                Some(cell) if !cell.is_empty() => cell,
                _ => {
                    log::warn!(
                        "column '{}' has no value on line {}, keeping the {} samples before it",
                        self.header[position],
                        line,
                        values.len()
                    );
                    break;
                }
            };

            let value: f64 = cell.parse().map_err(|_| IngestError::Parse {
                line: *line,
                message: format!("'{}' in column '{}' is not a number", cell, self.header[position]),
            })?;
            values.push(value);
        }

        Ok(values)
    }

    fn find(&self, name: &str) -> Result<usize> {
        self.header
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
            .ok_or_else(|| IngestError::MissingColumn(name.to_string()))
    }
}

/// Build a stream from CSV text
///
/// A channel stops at its first empty or missing cell; channels that end
/// up with different sample counts produce a ragged stream.
pub fn parse_csv(text: &str, options: &LoadOptions) -> Result<SampleStream> {
    let table = CsvTable::parse(text)?;
    let positions = options.resolver.resolve(&table.header)?;
    let sample_rate = options.rate_or_default();
    let limit = options.max_frames(sample_rate)?;

    log::debug!(
        "CSV channel columns: {:?}",
        positions.iter().map(|&p| table.header[p].as_str()).collect::<Vec<_>>()
    );

    let channels = positions
        .iter()
        .enumerate()
        .map(|(id, &position)| Ok((id as ChannelId, table.column(position, limit)?)))
        .collect::<Result<Vec<_>>>()?;

    let equal = channels.windows(2).all(|pair| pair[0].1.len() == pair[1].1.len());
    let stream = if equal {
        SampleStream::new(sample_rate, channels)?
    } else {
        log::warn!("CSV channels have different lengths, analyzing the shared prefix");
        SampleStream::ragged(sample_rate, channels)?
    };

    attach_frame_size(stream, options)
}

/// Load a combined `input` / `output` CSV as `(reference, output)`
pub fn load_pair_csv<P: AsRef<Path>>(
    path: P,
    options: &LoadOptions,
) -> Result<(SampleStream, SampleStream)> {
    parse_pair_csv(&std::fs::read_to_string(path)?, options)
}

/// [`load_pair_csv`] over in-memory text
pub fn parse_pair_csv(text: &str, options: &LoadOptions) -> Result<(SampleStream, SampleStream)> {
    let table = CsvTable::parse(text)?;
    let sample_rate = options.rate_or_default();
    let limit = options.max_frames(sample_rate)?;

    let input = table.column(table.find("input")?, limit)?;
    let output = table.column(table.find("output")?, limit)?;

    let reference = attach_frame_size(SampleStream::from_channels(sample_rate, vec![input])?, options)?;
    let output = attach_frame_size(SampleStream::from_channels(sample_rate, vec![output])?, options)?;
    Ok((reference, output))
}

/// Read little-endian interleaved `f32` samples
///
/// A trailing partial frame (or partial sample) is dropped.
pub fn read_raw<R: Read>(reader: R, options: &LoadOptions) -> Result<SampleStream> {
    if options.num_channels == 0 {
        return Err(GlitchError::InvalidInput("raw input needs at least one channel".into()).into());
    }

    let sample_rate = options.rate_or_default();
    let frame_bytes = RAW_SAMPLE_BYTES * options.num_channels;

    let mut bytes = Vec::new();
    match options.max_frames(sample_rate)? {
        Some(frames) => {
            let budget = u64::try_from(frames.saturating_mul(frame_bytes)).unwrap_or(u64::MAX);
            reader.take(budget).read_to_end(&mut bytes)?
        }
        None => {
            let mut reader = reader;
            reader.read_to_end(&mut bytes)?
        }
    };

    let samples: Vec<f32> = bytes
        .chunks_exact(RAW_SAMPLE_BYTES)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();

    let stream = SampleStream::from_interleaved(&samples, options.num_channels, sample_rate)?;
    attach_frame_size(stream, options)
}

/// Load a WAV file, normalizing integer PCM to [-1, 1]
pub fn load_wav<P: AsRef<Path>>(path: P, options: &LoadOptions) -> Result<SampleStream> {
    let reader = hound::WavReader::open(path)?;
    let spec = reader.spec();
    let sample_rate = spec.sample_rate as f64;
    let num_channels = spec.channels as usize;

    if let Some(expected) = options.sample_rate {
        if (expected - sample_rate).abs() > f64::EPSILON {
            return Err(GlitchError::SampleRateMismatch {
                expected,
                actual: sample_rate,
            }
            .into());
        }
    }

    let limit = options
        .max_frames(sample_rate)?
        .map_or(usize::MAX, |frames| frames.saturating_mul(num_channels));

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .take(limit)
            .collect::<std::result::Result<Vec<_>, _>>()?,
        hound::SampleFormat::Int => {
            let max_val = (1i64 << (spec.bits_per_sample - 1)) as f64;
            reader
                .into_samples::<i32>()
                .take(limit)
                .map(|s| s.map(|v| (v as f64 / max_val) as f32))
                .collect::<std::result::Result<Vec<_>, _>>()?
        }
    };

    let stream = SampleStream::from_interleaved(&samples, num_channels, sample_rate)?;
    attach_frame_size(stream, options)
}

fn attach_frame_size(stream: SampleStream, options: &LoadOptions) -> Result<SampleStream> {
    match options.frame_size {
        Some(frame_size) => Ok(stream.with_frame_size(frame_size)?),
        None => Ok(stream),
    }
}
