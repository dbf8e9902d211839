//! The mutable context populated by one walk of a movie box tree.

use bitflags::bitflags;
use derive_more::Display;
use fixed::types::{I16F16, I8F8, U16F16};
use mediameta_common::parse::FourCC;

use super::box_type::{SOUN, VIDE};

/// The accumulating result of one walk over a `moov` box: one movie-level record plus one [`Track`] per `trak` box,
/// in file order.
///
/// Tracks are appended and never removed; leaf parsers address "the current track" as the last element of the
/// append-only list.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParseContext {
    /// The movie-level record.
    pub movie: Movie,

    /// The per-track records, in file order.
    pub tracks: Vec<Track>,

    /// The walker's current box-nesting depth.
    pub(crate) depth: u32,
}

/// Movie-level fields extracted from the movie header.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Movie {
    /// The number of time units per second for the whole presentation.
    pub timescale: u32,

    /// The presentation duration, in [`timescale`](Self::timescale) units.
    pub duration: u64,

    /// The track ID a writer would assign to the next added track.
    pub next_track_id: u32,

    /// The preferred playback rate.
    pub rate: I16F16,

    /// The preferred playback volume.
    pub volume: I8F8,
}

/// Per-track fields extracted from one `trak` subtree.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Track {
    /// The track ID.
    pub id: u32,

    /// The track header flag word.
    pub flags: TrackFlags,

    /// The track duration, in movie-timescale units.
    pub duration: u64,

    /// The presentation layer; lower layers are rendered closer to the viewer.
    pub layer: i16,

    /// The alternate group the track belongs to, or zero.
    pub alternate_group: i16,

    /// The presentation width, in 16.16 fixed-point pixels.
    pub width: U16F16,

    /// The presentation height, in 16.16 fixed-point pixels.
    pub height: U16F16,

    /// The handler classification from the media handler reference, if one was seen.
    pub handler: Option<HandlerType>,

    /// The number of time units per second for this track's media.
    pub media_timescale: u32,

    /// The media duration, in [`media_timescale`](Self::media_timescale) units.
    pub media_duration: u64,

    /// The media language.
    pub language: Language,

    /// The sample descriptions, in declaration order.
    pub sample_descriptions: Vec<SampleDescription>,

    /// The time-to-sample table: 8-byte `{sample_count, sample_delta}` records.
    pub time_to_sample: SampleArray,

    /// The sample-to-chunk table: 12-byte `{first_chunk, samples_per_chunk, sample_description_index}` records.
    pub sample_to_chunk: SampleArray,

    /// The chunk-offset table: 4- or 8-byte offsets, per [`chunk_offset_width`](Self::chunk_offset_width).
    pub chunk_offsets: SampleArray,

    /// The record width of the chunk-offset table.
    pub chunk_offset_width: ChunkOffsetWidth,
}

bitflags! {
    /// The flag word of a track header.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct TrackFlags: u32 {
        /// The track is enabled.
        const ENABLED = 0x000001;
        /// The track is used in the presentation.
        const IN_MOVIE = 0x000002;
        /// The track is used when previewing the presentation.
        const IN_PREVIEW = 0x000004;
    }
}

/// The classification of a track's media handler.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq)]
pub enum HandlerType {
    /// A video track (`vide`).
    #[display(fmt = "video")]
    Video,

    /// An audio track (`soun`).
    #[display(fmt = "audio")]
    Audio,

    /// Any other handler.
    #[display(fmt = "{}", _0)]
    Other(FourCC),
}

/// A packed ISO 639-2/T language code.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Language(pub [u8; 3]);

/// A deferred-decode pointer to the repeating records of one sample table.
///
/// The records are *not* decoded during the walk; this descriptor records where in the parsed buffer they begin and
/// how many there are, and [`tables`](crate::tables) decodes them on demand.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SampleArray {
    /// The offset of the first record from the start of the parsed buffer.
    pub offset: usize,

    /// The number of records.
    pub entry_count: u32,
}

/// The record width of a chunk-offset table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ChunkOffsetWidth {
    /// 32-bit offsets (`stco`).
    #[default]
    U32,

    /// 64-bit offsets (`co64`).
    U64,
}

/// One entry of a sample description box.
#[derive(Clone, Debug, PartialEq)]
pub enum SampleDescription {
    /// A visual sample entry.
    Video(VideoDescription),

    /// An audio sample entry.
    Audio(AudioDescription),

    /// An entry for any other handler, recorded by coding name only.
    Other(FourCC),
}

/// A parsed visual sample entry.
#[derive(Clone, Debug, PartialEq)]
pub struct VideoDescription {
    /// The coding name of the entry (e.g. `avc1`).
    pub codec: FourCC,

    /// The data reference index.
    pub data_reference_index: u16,

    /// The coded width, in pixels.
    pub width: u16,

    /// The coded height, in pixels.
    pub height: u16,

    /// The color depth, in bits per pixel.
    pub depth: u16,

    /// The trailing codec-specific extension boxes, as an opaque range of the parsed buffer.
    pub extensions: ByteRange,

    /// The range of the `avcC` configuration within [`extensions`](Self::extensions), when one is present.
    pub avc_configuration: Option<ByteRange>,
}

/// A parsed audio sample entry.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioDescription {
    /// The coding name of the entry (e.g. `mp4a`).
    pub codec: FourCC,

    /// The data reference index.
    pub data_reference_index: u16,

    /// The channel count.
    pub channel_count: u16,

    /// The sample size, in bits.
    pub sample_size: u16,

    /// The sample rate, in 16.16 fixed-point hertz.
    pub sample_rate: U16F16,

    /// The trailing codec-specific extension boxes, as an opaque range of the parsed buffer.
    pub extensions: ByteRange,
}

/// A half-open byte range of the parsed buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ByteRange {
    /// The range's first byte offset.
    pub start: usize,

    /// The range's one-past-last byte offset.
    pub end: usize,
}

//
// ParseContext impls
//

impl ParseContext {
    /// The track currently being populated, if the walker is inside a `trak` box.
    pub(crate) fn current_track_mut(&mut self) -> Option<&mut Track> {
        self.tracks.last_mut()
    }
}

//
// HandlerType impls
//

impl HandlerType {
    /// Classify a handler type code.
    pub fn from_fourcc(handler: FourCC) -> Self {
        match handler {
            VIDE => Self::Video,
            SOUN => Self::Audio,
            other => Self::Other(other),
        }
    }
}

//
// Language impls
//

impl Language {
    /// Unpack the 15-bit language field of a media header: three 5-bit letters, each offset by 0x60.
    pub fn from_packed(packed: u16) -> Self {
        Self([
            (packed >> 10 & 0x1f) as u8 + 0x60,
            (packed >> 5 & 0x1f) as u8 + 0x60,
            (packed & 0x1f) as u8 + 0x60,
        ])
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match std::str::from_utf8(&self.0) {
            Ok(code) => write!(f, "{code}"),
            Err(_) => write!(f, "und"),
        }
    }
}

//
// ByteRange impls
//

impl ByteRange {
    /// The range's length, in bytes.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Whether the range is empty.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// The range's bytes within `buf`.
    pub fn slice<'a>(&self, buf: &'a [u8]) -> &'a [u8] {
        &buf[self.start..self.end]
    }
}
