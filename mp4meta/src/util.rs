use std::io;

/// Extensions for mapping unexpected-EOF IO errors to parse-level errors.
pub(crate) trait IoResultExt<T>: Sized {
    fn map_eof<F: FnOnce() -> crate::Error>(self, map: F) -> Result<T, crate::Error>;
}

impl<T> IoResultExt<T> for io::Result<T> {
    fn map_eof<F: FnOnce() -> crate::Error>(self, map: F) -> Result<T, crate::Error> {
        self.map_err(|err| match err.kind() {
            io::ErrorKind::UnexpectedEof => map(),
            _ => crate::Error::Io(err),
        })
    }
}
