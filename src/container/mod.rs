use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

mod error;

pub use error::{Error, Result};

/// The maximum allowed length for a [`ContainerID`].
const CONTAINER_ID_MAX_LEN: usize = 255;

/// The number of leading characters used for the abbreviated container id.
const SHORT_ID_LEN: usize = 12;

/// A validated container identifier.
///
/// # Examples
///
/// ```
/// # use stack_monitor::container::{ContainerID, Error};
/// let raw_id = "abc123abc123abc123abc123abc123abc123abc123abc123abc123abc123abcd";
/// let container_id = ContainerID::new(raw_id).unwrap();
/// assert_eq!(container_id.short(), "abc123abc123");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContainerID(Arc<str>);

impl ContainerID {
    /// Creates a new `ContainerID` from the given raw id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidContainerID`] if the input is empty or its
    /// length exceeds [`CONTAINER_ID_MAX_LEN`].
    pub fn new(src: impl AsRef<str>) -> Result<Self> {
        let src = src.as_ref();
        if src.is_empty() || src.len() > CONTAINER_ID_MAX_LEN {
            return Err(Error::InvalidContainerID(src.to_owned()));
        }

        Ok(Self(src.into()))
    }

    /// Returns the abbreviated id, i.e., the first twelve characters for a
    /// full-length engine id, or the whole id if it is shorter.
    pub fn short(&self) -> &str {
        let end = self
            .0
            .char_indices()
            .nth(SHORT_ID_LEN)
            .map_or(self.0.len(), |(idx, _)| idx);
        &self.0[..end]
    }
}

impl AsRef<str> for ContainerID {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ContainerID {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl serde::Serialize for ContainerID {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}
