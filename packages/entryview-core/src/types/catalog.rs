use super::class_layout::{ClassLayout, MemberLayout};
use super::SchemaGeneration;

/// Source of class layouts for column resolution.
///
/// Lookups are pure functions of `(class, member, generation)`: the same
/// question asked for the same generation always gets the same answer, so
/// proxies can be resolved and re-resolved without a live type system.
pub trait TypeCatalog: Send + Sync {
    /// Returns the layout of `class` as seen by `generation`.
    fn class_layout(&self, class: &str, generation: SchemaGeneration) -> Option<ClassLayout>;

    /// Resolves a (possibly dotted) member path within `class`.
    ///
    /// Dotted paths walk members stored by value; the returned layout has its
    /// offset relative to the start of `class`. Paths through pointers or
    /// collections are not followed.
    fn resolve_member(
        &self,
        class: &str,
        member: &str,
        generation: SchemaGeneration,
    ) -> Option<MemberLayout> {
        let mut layout = self.class_layout(class, generation)?;
        let mut parts = member.split('.').peekable();
        let mut offset = 0i64;

        loop {
            let part = parts.next()?;
            let found = layout.member(part)?.clone();
            if parts.peek().is_none() {
                return Some(MemberLayout {
                    offset: offset + found.offset,
                    ..found
                });
            }
            if found.is_pointer || found.is_collection || found.array_length > 1 {
                return None;
            }
            offset += found.offset;
            layout = self.class_layout(found.runtime_class(), generation)?;
        }
    }
}
