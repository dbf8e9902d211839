//! Error types returned by the box parsers.

use derive_more::Display;
use mediameta_common::error::{ReportStack, ReportableError};
use mediameta_common::parse::ReadError;

use super::FourCC;

/// Error type returned by the MP4 parser.
///
/// While the API of this error type is currently considered unstable, it is more stably guaranteed to implement
/// [`Display`] + [`Debug`].
#[derive(Clone, Debug, thiserror::Error)]
pub enum ParseError {
    /// A box's size is below its minimum, does not match its version-implied constant, or is misaligned with its
    /// record size.
    #[error("invalid `{_0}` box size")]
    InvalidBoxSize(FourCC),

    /// A box carries an unrecognized version byte.
    #[error("invalid `{_0}` box version")]
    InvalidBoxVersion(FourCC),

    /// A box's declared entry count disagrees with its size-derived count, or exceeds a hard cap.
    #[error("invalid `{_0}` box entry count")]
    InvalidEntryCount(FourCC),

    /// A box type that must appear at most once per parent has already been seen.
    #[error("duplicate `{_0}` box")]
    DuplicateBox(FourCC),

    /// Box nesting exceeds the fixed recursion bound.
    #[error("illegal box nesting depth")]
    IllegalBoxDepth,

    /// The input's boxes are in an ordering or configuration disallowed by the ISO specification.
    #[error("invalid box layout")]
    InvalidBoxLayout,

    /// The input is missing a box required by the ISO specification.
    #[error("missing required `{_0}` box")]
    MissingRequiredBox(FourCC),

    /// The input ended before the end of a box.
    ///
    /// This can occur either when the entire input is truncated or when a box size is incorrect.
    #[error("truncated box")]
    TruncatedBox,

    /// The input is invalid in a way not covered by the other variants.
    #[error("invalid input")]
    InvalidInput,

    /// A read ran out of the parsed byte range, or a decoded value exceeded a structural bound.
    #[error(transparent)]
    Read(#[from] ReadError),
}

#[derive(Clone, Copy, Debug, Display)]
#[display(fmt = "multiple `{}` boxes", _0)]
pub(crate) struct MultipleBoxes(pub(crate) FourCC);

#[derive(Clone, Copy, Debug, Display)]
#[display(fmt = "while parsing `{}` box", _0)]
pub(crate) struct WhileParsingBox(pub(crate) FourCC);

#[derive(Clone, Copy, Debug, Display)]
#[display(fmt = "while parsing `{}` box field `{}`", _0, _1)]
pub(crate) struct WhileParsingField<T>(pub(crate) FourCC, pub(crate) T);

#[derive(Clone, Copy, Debug, Display)]
#[display(fmt = "box exceeds its parent by {} bytes", _0)]
pub(crate) struct ByteShortfall(pub(crate) u64);

#[derive(Clone, Copy, Debug, Display)]
#[display(fmt = "where `{} = {}`", _0, _1)]
pub(crate) struct WhereEq<T, U>(pub(crate) T, pub(crate) U);

impl ReportableError for ParseError {
    type Stack = ReportStack;
}
