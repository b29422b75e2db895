#[derive(Debug, Fail)]
pub enum Error {
    #[fail(display = "{}", _0)]
    Io(::std::io::Error),
    #[fail(display = "{}", _0)]
    Zip(::zip::result::ZipError),
    #[fail(display = "Mount identifier '{}' is duplicated.", _0)]
    MountDuplicated(String),
    #[fail(display = "Failed to find mount with identifier '{}'.", _0)]
    MountNotFound(String),
    #[fail(display = "Failed to find filesystem at {}.", _0)]
    FilesystemNotFound(String),
    #[fail(display = "Failed to find file at {}.", _0)]
    FileNotFound(String),
}

pub type Result<T> = ::std::result::Result<T, Error>;

impl From<::std::io::Error> for Error {
    fn from(err: ::std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<::zip::result::ZipError> for Error {
    fn from(err: ::zip::result::ZipError) -> Self {
        Error::Zip(err)
    }
}
