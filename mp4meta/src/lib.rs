#![warn(missing_docs)]

//! `mp4meta` extracts structured metadata from an MP4 file without decoding any audio or video samples.
//!
//! The extractor walks the file's top-level boxes, fully buffers the presentation metadata (`moov`), and parses it
//! into one movie-level record plus one record per track: timing, geometry, language, codec identity, and
//! deferred-decode descriptors for the sample tables. The media data (`mdat`) is never read — only its span in the
//! input is located, for a downstream demuxer to consume.
//!
//! # Unsupported MP4 features
//!
//! The extractor does not currently support:
//!
//! - "Fragmented" MP4 files, which are mostly used for adaptive-bitrate streaming.
//! - Discontiguous media data, i.e. media data (`mdat`) boxes interspersed with presentation metadata (`moov`).
//! - Deep parsing of non-AVC codec configuration; unrecognized sample entry extensions are preserved as opaque
//!   byte ranges.
//!
//! # Usage
//!
//! The main entry points are [`extract`]/[`extract_async`], which take a [`Read`] + [`Skip`] input. The [`Skip`]
//! trait represents a subset of the [`Seek`](std::io::Seek) trait; an input stream which can be skipped forward, but
//! not necessarily seeked to arbitrary positions.
//!
//! ```no_run
//! let file = std::fs::File::open("example.mp4")?;
//! let metadata = mp4meta::extract(std::io::BufReader::new(file))?;
//!
//! println!("{} time units per second", metadata.movie.timescale);
//! for track in &metadata.tracks {
//!     println!("track {}: {:?} ({})", track.id, track.handler, track.language);
//! }
//! # Ok::<(), mp4meta::Error>(())
//! ```
//!
//! The [`parse`] module also contains a less stable API which can be used to parse individual MP4 box types, and
//! [`tables`] decodes the recorded sample-table descriptors into dense arrays.

#[macro_use]
extern crate mediameta_common;

pub mod parse;
pub mod tables;

mod util;

use std::io::Read;
use std::pin::Pin;

use bytes::{BufMut, Bytes, BytesMut};
use derive_builder::Builder;
use derive_more::Display;
use futures_util::io::BufReader;
use futures_util::{pin_mut, AsyncBufReadExt, AsyncRead, AsyncReadExt};
use mediameta_common::{buf_skip, buf_stream_len, buf_stream_position, sync};

use crate::parse::error::{MultipleBoxes, WhileParsingBox};
use crate::parse::{box_type, parse_movie, BoxHeader, FourCC, Movie, ParseError, Track};
use crate::util::IoResultExt;

//
// public types
//

pub use mediameta_common::{AsyncSkip, Diagnostics, InputSpan, Skip};

/// Error type returned by `mp4meta`.
pub type Error = mediameta_common::Error<ParseError>;

#[derive(Builder, Clone)]
#[builder(build_fn(name = "try_build"))]
/// Configuration for the MP4 metadata extractor.
pub struct Config {
    /// The maximum size of presentation metadata to buffer.
    ///
    /// This is useful to set an upper bound on memory consumption in the parser.
    ///
    /// The default is 1 GiB.
    #[builder(default = "1024 * 1024 * 1024")]
    pub max_metadata_size: u64,
}

/// Metadata extracted from an MP4 input.
#[derive(Clone, Debug)]
pub struct MovieMetadata {
    /// The major brand of the file type header, if a `ftyp` box was present.
    pub brand: Option<FourCC>,

    /// The buffered presentation metadata: the `moov` box, header included, with extended and to-end-of-file sizes
    /// resolved to a concrete size.
    ///
    /// The [`SampleArray`](parse::SampleArray) and [`ByteRange`](parse::ByteRange) descriptors on the track records
    /// index into this buffer.
    pub metadata: Bytes,

    /// The movie-level record.
    pub movie: Movie,

    /// The per-track records, in file order.
    pub tracks: Vec<Track>,

    /// The span of the input containing the (contiguous) media data.
    pub data: InputSpan,

    /// The diagnostics accumulated while parsing.
    pub diagnostics: Diagnostics,
}

//
// private types
//

#[derive(Clone, Copy, Debug, Display)]
#[display(fmt = "box data too large: {} > {}", _0, _1)]
struct BoxDataTooLarge(u64, u64);

const MAX_FTYP_SIZE: u64 = 1024;

//
// public functions
//

/// Extract metadata from an MP4 input, with the default [`Config`].
///
/// The `input` must implement [`Read`] + [`Skip`], where [`Skip`] represents a subset of the
/// [`Seek`](std::io::Seek) trait; an input stream which can be skipped forward, but not necessarily seeked to
/// arbitrary positions.
///
/// # Errors
///
/// If the input cannot be parsed, or an IO error occurs, an [`Error`] is returned.
pub fn extract<R: Read + Skip + Unpin>(input: R) -> Result<MovieMetadata, Error> {
    extract_with_config(input, Config::default())
}

/// Extract metadata from an MP4 input, with the given [`Config`].
///
/// # Errors
///
/// If the input cannot be parsed, or an IO error occurs, an [`Error`] is returned.
pub fn extract_with_config<R: Read + Skip + Unpin>(input: R, config: Config) -> Result<MovieMetadata, Error> {
    sync::run(input, |input| extract_async_with_config(input, config))
}

/// Extract metadata from an MP4 input asynchronously, with the default [`Config`].
///
/// The `input` must implement [`AsyncRead`] + [`AsyncSkip`], where [`AsyncSkip`] represents a subset of the
/// [`AsyncSeek`](futures_util::AsyncSeek) trait; an input stream which can be skipped forward, but not necessarily
/// seeked to arbitrary positions.
///
/// # Errors
///
/// If the input cannot be parsed, or an IO error occurs, an [`Error`] is returned.
pub async fn extract_async<R: AsyncRead + AsyncSkip>(input: R) -> Result<MovieMetadata, Error> {
    extract_async_with_config(input, Config::default()).await
}

/// Extract metadata from an MP4 input asynchronously, with the given [`Config`].
///
/// # Errors
///
/// If the input cannot be parsed, or an IO error occurs, an [`Error`] is returned.
pub async fn extract_async_with_config<R: AsyncRead + AsyncSkip>(
    input: R,
    config: Config,
) -> Result<MovieMetadata, Error> {
    let reader = BufReader::with_capacity(BoxHeader::MAX_SIZE as usize, input);
    pin_mut!(reader);

    let mut diagnostics = Diagnostics::new();
    let mut brand: Option<FourCC> = None;
    let mut moov: Option<BytesMut> = None;
    let mut data: Option<InputSpan> = None;

    while !reader.as_mut().fill_buf().await?.is_empty() {
        let start_pos = buf_stream_position(reader.as_mut()).await?;

        let header = BoxHeader::read(&mut reader)
            .await
            .map_eof(|| Error::Parse(report_attach!(ParseError::TruncatedBox, "while reading box header")))?;

        match header.box_type() {
            box_type::FTYP => {
                ensure_attach!(
                    brand.is_none(),
                    ParseError::InvalidBoxLayout,
                    MultipleBoxes(box_type::FTYP)
                );
                let ftyp_data = read_box_data(reader.as_mut(), &header, MAX_FTYP_SIZE).await?;
                ensure_attach!(
                    ftyp_data.len() >= 8,
                    ParseError::InvalidBoxSize(box_type::FTYP),
                    WhileParsingBox(box_type::FTYP),
                );
                let major_brand = FourCC::parse(&ftyp_data[..4]);
                log::info!("ftyp @ 0x{start_pos:08x}: major brand `{major_brand}`");
                brand = Some(major_brand);
            }

            box_type::MOOV => {
                ensure_attach!(
                    moov.is_none(),
                    ParseError::InvalidBoxLayout,
                    MultipleBoxes(box_type::MOOV)
                );
                let moov_data = read_box_data(reader.as_mut(), &header, config.max_metadata_size).await?;
                log::info!("moov @ 0x{start_pos:08x}: {len} bytes", len = moov_data.len());

                // Reassemble a concretely-sized box for the walker, resolving extended and to-end-of-file sizes.
                let mut buffered = BytesMut::with_capacity(moov_data.len() + BoxHeader::MAX_SIZE as usize);
                put_header(&mut buffered, box_type::MOOV, moov_data.len() as u64);
                buffered.extend_from_slice(&moov_data);
                moov = Some(buffered);
            }

            box_type::MDAT => {
                let box_size = skip_box(reader.as_mut(), &header).await? + header.encoded_len();
                log::info!("mdat @ 0x{start_pos:08x}: {box_size} bytes");

                if let Some(data) = &mut data {
                    // Try to extend already accumulated data.
                    ensure_attach!(
                        data.offset + data.len == start_pos,
                        ParseError::InvalidBoxLayout,
                        "discontiguous mdat boxes",
                    );
                    data.len += box_size;
                } else {
                    data = Some(InputSpan { offset: start_pos, len: box_size });
                }
            }

            name @ (box_type::FREE | box_type::SKIP | box_type::META | box_type::MECO) => {
                let box_size = skip_box(reader.as_mut(), &header).await? + header.encoded_len();
                log::info!("{name} @ 0x{start_pos:08x}: {box_size} bytes");

                // Try to extend any already accumulated data in case there's more mdat boxes to come.
                if let Some(data) = &mut data {
                    if data.offset + data.len == start_pos {
                        data.len += box_size;
                    }
                }
            }

            name => {
                let box_size = skip_box(reader.as_mut(), &header).await? + header.encoded_len();
                log::info!("{name} @ 0x{start_pos:08x}: {box_size} bytes (skipped)");
            }
        }
    }

    let Some(moov) = moov else {
        bail_attach!(ParseError::MissingRequiredBox(box_type::MOOV));
    };
    let Some(data) = data else {
        bail_attach!(ParseError::MissingRequiredBox(box_type::MDAT));
    };

    let context = parse_movie(&moov, &mut diagnostics)?;
    log::info!(
        "metadata: {tracks} tracks, duration {duration}/{timescale}",
        tracks = context.tracks.len(),
        duration = context.movie.duration,
        timescale = context.movie.timescale,
    );

    Ok(MovieMetadata {
        brand,
        metadata: moov.freeze(),
        movie: context.movie,
        tracks: context.tracks,
        data,
        diagnostics,
    })
}

//
// Config impls
//

impl Config {
    /// Construct a builder for `Config`.
    ///
    /// See the documentation for [`ConfigBuilder`].
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::builder().build()
    }
}

//
// ConfigBuilder impls
//

impl ConfigBuilder {
    /// Build a new [`Config`].
    pub fn build(&self) -> Config {
        self.try_build().unwrap()
    }
}

//
// private functions
//

/// Read a box's data into memory, assuming its header has already been read.
async fn read_box_data<R: AsyncRead + AsyncSkip>(
    mut reader: Pin<&mut BufReader<R>>,
    header: &BoxHeader,
    max_size: u64,
) -> Result<BytesMut, Error> {
    let data_size = match header.box_data_size()? {
        Some(size) => size,
        None => buf_stream_len(reader.as_mut()).await? - buf_stream_position(reader.as_mut()).await?,
    };
    ensure_attach!(
        data_size <= max_size,
        ParseError::InvalidInput,
        BoxDataTooLarge(data_size, max_size),
        WhileParsingBox(header.box_type()),
    );

    let mut data = BytesMut::new();
    data.resize(data_size as usize, 0);
    reader.read_exact(&mut data).await.map_eof(|| {
        Error::Parse(report_attach!(
            ParseError::TruncatedBox,
            WhileParsingBox(header.box_type())
        ))
    })?;
    Ok(data)
}

/// Skip a box's data, assuming its header has already been read.
///
/// Returns the amount of data that was skipped.
async fn skip_box<R: AsyncRead + AsyncSkip>(
    mut reader: Pin<&mut BufReader<R>>,
    header: &BoxHeader,
) -> Result<u64, Error> {
    let box_data_size = match header.box_data_size()? {
        Some(box_size) => box_size,
        None => buf_stream_len(reader.as_mut()).await? - buf_stream_position(reader.as_mut()).await?,
    };
    buf_skip(reader, box_data_size).await.map_eof(|| {
        Error::Parse(report_attach!(
            ParseError::TruncatedBox,
            WhileParsingBox(header.box_type())
        ))
    })?;
    Ok(box_data_size)
}

/// Write a compact or extended box header for `data_size` bytes of payload.
fn put_header<B: BufMut>(out: &mut B, box_type: FourCC, data_size: u64) {
    if data_size + 8 <= u32::MAX as u64 {
        out.put_u32(data_size as u32 + 8);
        box_type.put_buf(&mut *out);
    } else {
        out.put_u32(1);
        box_type.put_buf(&mut *out);
        out.put_u64(data_size + 16);
    }
}
