macro_rules! impl_arbitrary {
    ($type:ident, $($field:ident),*) => {
        #[cfg(test)]
        impl quickcheck::Arbitrary for $type {
            fn arbitrary(gen: &mut quickcheck::Gen) -> Self {
                let _ = &gen;
                $type {
                    $(
                        $field: crate::test_macros::qc_help::Hack::new(0).arbitrary(gen),
                    )*
                }
            }
        }
    };
}
pub(crate) use impl_arbitrary;

/// Checks that a snapshot type survives serialization with header and that garbage input
/// doesn't make the deserializer panic.
#[cfg(test)]
macro_rules! check_roundtrip_with_header {
    ($name:ident, $ty:ty) => {
        mod $name {
            #[allow(unused)]
            use super::*;
            use crate::app::{Serialize, Deserialize};

            quickcheck::quickcheck! {
                fn roundtrip(val: $ty) -> bool {
                    let mut bytes = Vec::new();
                    val.serialize_with_header(&mut bytes);
                    let mut slice = &*bytes;
                    let val2 = <$ty>::deserialize_with_header(&mut slice).unwrap();

                    assert_eq!(val2, val);
                    slice.is_empty()
                }
            }

            quickcheck::quickcheck! {
                fn garbage(val: $ty, modify: Vec<(usize, u8)>, delete: Vec<usize>) -> bool {
                    let mut bytes = Vec::new();
                    val.serialize_with_header(&mut bytes);
                    if !bytes.is_empty() {
                        for (pos, byte) in modify {
                            let pos = pos % bytes.len();
                            bytes[pos] = byte;
                        }
                    }

                    for pos in delete {
                        if bytes.is_empty() {
                            break
                        }
                        let pos = pos % bytes.len();
                        bytes.remove(pos);
                    }

                    let _ = <$ty>::deserialize_with_header(&mut &*bytes);

                    true
                }
            }
        }
    }
}

#[cfg(test)]
pub(crate) use check_roundtrip_with_header;


/// Abbreviation for our arbitrary trait.
#[cfg(test)]
pub(crate) fn arbitrary<T: qc_help::Arbitrary>(gen: &mut quickcheck::Gen) -> T {
    T::arbitrary(gen)
}
