use super::class_layout::ClassLayout;
use super::element::Element;
use super::error::CatalogError;
use super::type_registry::TypeRegistry;

/// Returns the basic layout of element type `T`.
pub fn basic_layout<T: Element>() -> ClassLayout {
    ClassLayout::basic(T::TYPE_NAME, T::SIZE, std::mem::align_of::<T>())
}

/// Registers all built-in element types.
///
/// Built-in types:
/// - bool: 1 byte, stored as 0/1
/// - u8, i8, u16, i16, u32, i32, u64, i64: native-endian integers
/// - f32, f64: native-endian IEEE 754 floats
///
/// # Returns
/// `Ok(())` if all types registered successfully.
pub fn register_builtin_types(registry: &TypeRegistry) -> Result<(), CatalogError> {
    registry.register(basic_layout::<bool>())?;
    registry.register(basic_layout::<u8>())?;
    registry.register(basic_layout::<i8>())?;
    registry.register(basic_layout::<u16>())?;
    registry.register(basic_layout::<i16>())?;
    registry.register(basic_layout::<u32>())?;
    registry.register(basic_layout::<i32>())?;
    registry.register(basic_layout::<u64>())?;
    registry.register(basic_layout::<i64>())?;
    registry.register(basic_layout::<f32>())?;
    registry.register(basic_layout::<f64>())?;
    Ok(())
}
