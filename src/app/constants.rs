use core::fmt;
use core::str::FromStr;

/// Instruction-set revision both programs are compiled against.
pub const TARGET_AVM_VERSION: u8 = 7;

/// Global state key holding the application version.
pub const KEY_VERSION: &[u8] = b"Version";

/// Global state key holding the administrator address.
pub const KEY_ADMIN: &[u8] = b"admin";

/// First argument selecting the version report.
pub const METHOD_VERSION: &[u8] = b"Version";

/// Default first argument selecting the asset opt-in.
pub const METHOD_OPT_IN_ASSET: &[u8] = b"OptInASA";

pub const LOG_VERSION_PREFIX: &[u8] = b"Version: ";
pub const LOG_PAY: &[u8] = b"Pay Txn";

/// Note attached to asset transfers emitted by the application.
pub const NOTE_ASSET_TRANSFER: &[u8] = b"Asset Transfer";

macro_rules! u8_enum {
    ($(#[$meta:meta])* $vis:vis enum $name:ident { $($variant:ident = $val:literal => $text:literal),* $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
        $vis enum $name {
            $($variant = $val,)*
        }

        impl $name {
            /// Short name used by command line tools.
            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text,)*
                }
            }
        }

        impl core::convert::TryFrom<u8> for $name {
            type Error = InvalidEnumValue;

            fn try_from(val: u8) -> Result<Self, Self::Error> {
                match val {
                    $($val => Ok($name::$variant),)*
                    _ => Err(InvalidEnumValue(val))
                }
            }
        }

        impl FromStr for $name {
            type Err = UnknownName;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)*
                    _ => Err(UnknownName(s.to_owned())),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        #[cfg(test)]
        impl quickcheck::Arbitrary for $name {
            fn arbitrary(gen: &mut quickcheck::Gen) -> Self {
                *gen.choose(&[$($name::$variant),*]).unwrap()
            }
        }
    }
}

u8_enum! {
    /// What should happen to the caller's relationship with the application after the call.
    pub enum OnCompletion {
        NoOp = 0 => "noop",
        OptIn = 1 => "optin",
        CloseOut = 2 => "closeout",
        ClearState = 3 => "clearstate",
        UpdateApplication = 4 => "update",
        DeleteApplication = 5 => "delete",
    }
}

u8_enum! {
    /// The ledger transaction type.
    pub enum TxnType {
        Payment = 1 => "pay",
        KeyRegistration = 2 => "keyreg",
        AssetConfig = 3 => "acfg",
        AssetTransfer = 4 => "axfer",
        AssetFreeze = 5 => "afrz",
        ApplicationCall = 6 => "appl",
    }
}

u8_enum! {
    /// Identifies the kind of a serialized snapshot.
    pub enum StateId {
        GlobalState = 0 => "global-state",
        Ledger = 1 => "ledger",
    }
}

#[derive(Debug)]
pub struct InvalidEnumValue(pub u8);

#[derive(Debug)]
pub struct UnknownName(pub String);

impl fmt::Display for UnknownName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "unknown name \"{}\"", self.0)
    }
}
