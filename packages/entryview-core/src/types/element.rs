use std::fmt::Debug;

/// Element types that readers can produce.
///
/// `TYPE_NAME` must match the basic class registered by
/// [`register_builtin_types`](super::register_builtin_types). Values are
/// stored in native byte order.
pub trait Element: Copy + Default + Debug + 'static {
    /// Catalog name of the element type
    const TYPE_NAME: &'static str;
    /// Size in bytes of one stored element
    const SIZE: usize;

    /// Decodes one element from the first `SIZE` bytes (any alignment).
    /// Returns `None` when fewer bytes are given.
    fn decode(bytes: &[u8]) -> Option<Self>;

    /// Views `bytes` as elements in place. Returns `None` when the bytes are
    /// misaligned or not a valid representation of `Self`.
    fn view(bytes: &[u8]) -> Option<&[Self]>;

    /// Appends the stored representation of `self` to `out`.
    fn encode(&self, out: &mut Vec<u8>);
}

macro_rules! pod_element {
    ($($ty:ty => $name:literal),* $(,)?) => {
        $(
            impl Element for $ty {
                const TYPE_NAME: &'static str = $name;
                const SIZE: usize = std::mem::size_of::<$ty>();

                fn decode(bytes: &[u8]) -> Option<Self> {
                    bytes.get(..Self::SIZE).map(bytemuck::pod_read_unaligned)
                }

                fn view(bytes: &[u8]) -> Option<&[Self]> {
                    bytemuck::try_cast_slice(bytes).ok()
                }

                fn encode(&self, out: &mut Vec<u8>) {
                    out.extend_from_slice(bytemuck::bytes_of(self));
                }
            }
        )*
    };
}

pod_element!(
    u8 => "u8",
    i8 => "i8",
    u16 => "u16",
    i16 => "i16",
    u32 => "u32",
    i32 => "i32",
    u64 => "u64",
    i64 => "i64",
    f32 => "f32",
    f64 => "f64",
);

// Stored bools are bytes that may hold values other than 0 and 1, so they
// are never viewed in place.
impl Element for bool {
    const TYPE_NAME: &'static str = "bool";
    const SIZE: usize = 1;

    fn decode(bytes: &[u8]) -> Option<Self> {
        bytes.first().map(|b| *b != 0)
    }

    fn view(_bytes: &[u8]) -> Option<&[Self]> {
        None
    }

    fn encode(&self, out: &mut Vec<u8>) {
        out.push(u8::from(*self));
    }
}

/// Returns the stored size of the basic type named `type_name`.
pub fn basic_type_size(type_name: &str) -> Option<usize> {
    let size = match type_name {
        "bool" => bool::SIZE,
        "u8" => u8::SIZE,
        "i8" => i8::SIZE,
        "u16" => u16::SIZE,
        "i16" => i16::SIZE,
        "u32" => u32::SIZE,
        "i32" => i32::SIZE,
        "u64" => u64::SIZE,
        "i64" => i64::SIZE,
        "f32" => f32::SIZE,
        "f64" => f64::SIZE,
        _ => return None,
    };
    Some(size)
}

/// Decodes a stored integer of basic type `type_name` as a signed count.
pub(crate) fn decode_count(type_name: &str, bytes: &[u8]) -> Option<i64> {
    let value = match type_name {
        "u8" => i64::from(u8::decode(bytes)?),
        "i8" => i64::from(i8::decode(bytes)?),
        "u16" => i64::from(u16::decode(bytes)?),
        "i16" => i64::from(i16::decode(bytes)?),
        "u32" => i64::from(u32::decode(bytes)?),
        "i32" => i64::from(i32::decode(bytes)?),
        "u64" => i64::try_from(u64::decode(bytes)?).ok()?,
        "i64" => i64::decode(bytes)?,
        _ => return None,
    };
    Some(value)
}
