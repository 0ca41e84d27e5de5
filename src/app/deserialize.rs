use core::convert::{TryFrom, TryInto};

pub(crate) trait Int {
    type Bytes: Sized + for<'a> TryFrom<&'a [u8]>;

    fn from_be_bytes(bytes: Self::Bytes) -> Self;
}

macro_rules! impl_int {
    ($($type:ty),*) => {
        $(
            impl Int for $type {
                type Bytes = [u8; core::mem::size_of::<$type>()];

                fn from_be_bytes(bytes: Self::Bytes) -> Self {
                    <$type>::from_be_bytes(bytes)
                }
            }
        )*
    }
}

impl_int!(u16, u32, u64);

pub(crate) fn be<T: Int>(bytes: &mut &[u8]) -> Result<T, UnexpectedEnd> {
    if bytes.len() < core::mem::size_of::<T::Bytes>() {
        return Err(UnexpectedEnd);
    }
    let byte_arr: T::Bytes = bytes[..core::mem::size_of::<T::Bytes>()].try_into().map_err(|_| UnexpectedEnd)?;
    *bytes = &bytes[core::mem::size_of::<T::Bytes>()..];
    Ok(T::from_be_bytes(byte_arr))
}

pub(crate) fn byte(bytes: &mut &[u8]) -> Result<u8, UnexpectedEnd> {
    let byte = *bytes.first().ok_or(UnexpectedEnd)?;
    *bytes = &bytes[1..];
    Ok(byte)
}

pub(crate) fn array<const N: usize>(bytes: &mut &[u8]) -> Result<[u8; N], UnexpectedEnd> {
    let array = bytes.get(..N)
        .ok_or(UnexpectedEnd)?
        .try_into()
        .map_err(|_| UnexpectedEnd)?;
    *bytes = &bytes[N..];
    Ok(array)
}

/// Reads a byte string prefixed with its 16-bit big-endian length.
pub(crate) fn short_bytes(bytes: &mut &[u8]) -> Result<Vec<u8>, UnexpectedEnd> {
    let len = be::<u16>(bytes)? as usize;
    let data = bytes.get(..len).ok_or(UnexpectedEnd)?.to_vec();
    *bytes = &bytes[len..];
    Ok(data)
}

/// Counterpart of [`short_bytes`].
///
/// Panics if `data` is longer than `u16::MAX`, callers bound their inputs.
pub(crate) fn write_short_bytes(data: &[u8], out: &mut Vec<u8>) {
    let len = u16::try_from(data.len()).expect("byte strings are bounded by the caller");
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(data);
}

#[derive(Debug)]
pub struct UnexpectedEnd;

/// Just to avoid duplicating version values (SSOT).
macro_rules! version_enum {
    (pub enum $name:ident { $($variant:ident = $value:expr),* $(,)? }) => {
        #[must_use = "Protect the code against forgetting to handle new variants"]
        #[derive(Copy, Clone, Eq, PartialEq, Debug)]
        pub enum $name {
            $($variant = $value,)*
        }

        impl $name {
            pub const fn from_num(num: u32) -> Option<Self> {
                match num {
                    $(
                        $value => Some(Self::$variant),
                    )*
                    _ => None,
                }
            }
        }
    }
}
pub(crate) use version_enum;

version_enum! {
    pub enum StateVersion {
        V1 = 0x01,
    }
}

impl StateVersion {
    pub const CURRENT: Self = Self::V1;

    /// Deserializes state version.
    ///
    /// Snapshots start with a 4-byte big endian version number. Unknown versions are rejected
    /// rather than guessed because a newer writer may have added fields.
    pub fn deserialize(bytes: &mut &[u8]) -> Result<Self, StateVersionDeserError> {
        let num = be::<u32>(bytes)?;
        Self::from_num(num).ok_or(StateVersionDeserError::UnsupportedVersion(num))
    }

    /// Serializes the state version.
    pub fn serialize(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&(self as u32).to_be_bytes());
    }
}

/// Error returned when deserializing version number fails.
#[derive(Debug)]
pub enum StateVersionDeserError {
    /// The input data is too short.
    UnexpectedEnd,
    /// The version number is not supported (currently always higher).
    UnsupportedVersion(u32),
}

impl From<UnexpectedEnd> for StateVersionDeserError {
    fn from(_: UnexpectedEnd) -> Self {
        Self::UnexpectedEnd
    }
}
