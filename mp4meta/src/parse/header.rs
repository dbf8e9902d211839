use std::io;
use std::mem::size_of;

use futures_util::{pin_mut, AsyncRead, AsyncReadExt};
use mediameta_common::parse::{ByteReader, FourCC};
use mediameta_common::Result;

use super::error::WhileParsingBox;
use super::ParseError;

/// A parsed box header: the box type plus its compact, extended, or until-end-of-file size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoxHeader {
    box_type: FourCC,
    box_size: BoxSize,
}

/// The size field of a box header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoxSize {
    /// A zero size: the box runs to the end of the file. Only meaningful for a top-level box.
    UntilEof,

    /// A compact 32-bit size.
    Size(u32),

    /// A 64-bit size carried in a `large_size` field following the box type.
    Ext(u64),
}

impl BoxHeader {
    /// The maximum encoded size of a box header, in bytes.
    pub const MAX_SIZE: u64 = 16;

    /// Read a box header from an [`AsyncRead`].
    pub(crate) async fn read<R: AsyncRead>(input: R) -> io::Result<Self> {
        pin_mut!(input);

        let mut size = [0; 4];
        input.read_exact(&mut size).await?;

        let box_type = FourCC::read(&mut input).await?;

        let box_size = match u32::from_be_bytes(size) {
            0 => BoxSize::UntilEof,
            1 => {
                let mut size = [0; 8];
                input.read_exact(&mut size).await?;
                BoxSize::Ext(u64::from_be_bytes(size))
            }
            size => BoxSize::Size(size),
        };

        Ok(Self { box_type, box_size })
    }

    /// Read a box header from a [`ByteReader`] positioned at the box's first byte.
    pub fn read_from<T: AsRef<[u8]>>(reader: &mut ByteReader<T>) -> Result<Self, ParseError> {
        let size = reader.u32()?;
        let box_type = reader.four_cc()?;
        let box_size = match size {
            0 => BoxSize::UntilEof,
            1 => BoxSize::Ext(reader.u64()?),
            size => BoxSize::Size(size),
        };
        Ok(Self { box_type, box_size })
    }

    /// The encoded length of this header, in bytes.
    pub const fn encoded_len(&self) -> u64 {
        let mut size = FourCC::size() + size_of::<u32>() as u64;
        if let BoxSize::Ext(_) = self.box_size {
            size += size_of::<u64>() as u64;
        }
        size
    }

    /// The total box size, header included, or [`None`] for a box running to the end of the file.
    pub fn box_size(&self) -> Option<u64> {
        self.box_size.size()
    }

    /// The size of the box's payload, or [`None`] for a box running to the end of the file.
    pub fn box_data_size(&self) -> Result<Option<u64>, ParseError> {
        match self.box_size.size() {
            None => Ok(None),
            Some(size) => size
                .checked_sub(self.encoded_len())
                .ok_or_else(|| {
                    report_attach!(
                        ParseError::InvalidBoxSize(self.box_type),
                        "box size smaller than its header",
                        WhileParsingBox(self.box_type)
                    )
                })
                .map(Some),
        }
    }

    /// The box type.
    pub const fn box_type(&self) -> FourCC {
        self.box_type
    }
}

impl BoxSize {
    /// The total box size, or [`None`] for [`BoxSize::UntilEof`].
    pub const fn size(&self) -> Option<u64> {
        match *self {
            BoxSize::UntilEof => None,
            BoxSize::Size(size) => Some(size as u64),
            BoxSize::Ext(size) => Some(size),
        }
    }
}

macro_rules! box_type {
    ($($name:ident),+ $(,)?) => {
        /// Box type constants for the box types this parser dispatches on.
        pub mod box_type {
            use super::FourCC;

            $(
                #[doc = concat!("The `", stringify!($name), "` box type.")]
                pub const $name: FourCC = box_name_to_fourcc(stringify!($name));
            )+

            /// The `avcC` box type.
            pub const AVCC: FourCC = FourCC { value: *b"avcC" };

            const fn box_name_to_fourcc(name: &str) -> FourCC {
                let name = name.as_bytes();
                let mut fourcc = [b' '; 4];
                let mut name_idx = 0;
                while name_idx < name.len() {
                    fourcc[name_idx] = name[name_idx].to_ascii_lowercase();
                    name_idx += 1;
                }
                FourCC { value: fourcc }
            }
        }
    };
}

box_type! {
    AVC1,
    CO64,
    ESDS,
    FREE,
    FTYP,
    HDLR,
    MDAT,
    MDHD,
    MDIA,
    MECO,
    META,
    MINF,
    MOOV,
    MP4A,
    MVHD,
    SKIP,
    SOUN,
    STBL,
    STCO,
    STSC,
    STSD,
    STTS,
    TKHD,
    TRAK,
    VIDE,
}
