use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::Arc;

use crate::diagnostics::DiagnosticKind;
use crate::director::Director;
use crate::error::ReaderError;
use crate::source::{ColumnKind, ColumnSchema, ReadStatus, Source};
use crate::types::element::{basic_type_size, decode_count};
use crate::types::{ClassKind, MemberLayout, SchemaGeneration};

use super::collection::CollectionView;
use super::descriptor::{AccessStep, ColumnDescriptor, Location, ValueShape};

/// Shared handle to a proxy. The Director keeps one per path.
pub type ProxyRef = Rc<RefCell<ColumnProxy>>;

/// Identity of a proxy within its Director.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProxyId(pub u64);

impl fmt::Display for ProxyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Resolution state of a proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyState {
    Unresolved,
    Resolved,
    /// A source transition happened since the last resolution
    Invalidated,
}

#[derive(Debug)]
enum ProxyOrigin {
    Root,
    Child {
        parent: Weak<RefCell<ColumnProxy>>,
        member: String,
    },
}

/// Lazily resolved accessor for one column path.
///
/// Resolution runs on first use and again after every invalidation. Failed
/// resolutions are not cached, so a later source can restore the column.
pub struct ColumnProxy {
    id: ProxyId,
    path: String,
    origin: ProxyOrigin,
    descriptor: Option<ColumnDescriptor>,
    collection: Option<CollectionView>,
    count_provider: Option<Weak<RefCell<ColumnProxy>>>,
    invalidated: Rc<Cell<bool>>,
    subscribed: bool,
    benign_absence: Option<SchemaGeneration>,
    reported: HashSet<(DiagnosticKind, String)>,
    epoch: u64,
}

impl fmt::Debug for ColumnProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnProxy")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("state", &self.state())
            .field("epoch", &self.epoch)
            .finish()
    }
}

impl ColumnProxy {
    pub(crate) fn root(id: ProxyId, path: impl Into<String>) -> Self {
        Self::with_origin(id, path.into(), ProxyOrigin::Root)
    }

    pub(crate) fn child(id: ProxyId, parent: &ProxyRef, member: impl Into<String>) -> Self {
        let member = member.into();
        let path = format!("{}.{}", parent.borrow().path(), member);
        Self::with_origin(
            id,
            path,
            ProxyOrigin::Child {
                parent: Rc::downgrade(parent),
                member,
            },
        )
    }

    fn with_origin(id: ProxyId, path: String, origin: ProxyOrigin) -> Self {
        Self {
            id,
            path,
            origin,
            descriptor: None,
            collection: None,
            count_provider: None,
            invalidated: Rc::new(Cell::new(false)),
            subscribed: false,
            benign_absence: None,
            reported: HashSet::new(),
            epoch: 0,
        }
    }

    pub fn id(&self) -> ProxyId {
        self.id
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn state(&self) -> ProxyState {
        if self.invalidated.get() {
            ProxyState::Invalidated
        } else if self.descriptor.is_some() {
            ProxyState::Resolved
        } else {
            ProxyState::Unresolved
        }
    }

    /// Returns `true` if resolved and not invalidated since.
    pub fn is_resolved(&self) -> bool {
        self.state() == ProxyState::Resolved
    }

    pub fn is_invalidated(&self) -> bool {
        self.invalidated.get()
    }

    pub fn descriptor(&self) -> Option<&ColumnDescriptor> {
        self.descriptor.as_ref()
    }

    /// The collection whose elements this proxy's values come from.
    pub fn collection(&self) -> Option<&CollectionView> {
        self.collection.as_ref()
    }

    /// Incremented on every successful resolution.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Drops resolved state. The next `setup` resolves from scratch.
    pub fn reset(&mut self) {
        self.descriptor = None;
        self.collection = None;
        self.count_provider = None;
        self.invalidated.set(false);
    }

    /// Resolves the proxy against the current source.
    ///
    /// Returns `false` on any failure, leaving the proxy unresolved.
    /// Conditions are reported to the Director's diagnostics.
    pub fn setup(&mut self, director: &Director) -> bool {
        if self.invalidated.get() {
            self.reset();
        }
        if self.descriptor.is_some() {
            return true;
        }
        self.collection = None;

        let Some(source) = director.current_source() else {
            return false;
        };

        if !self.subscribed {
            let flag = Rc::clone(&self.invalidated);
            director.subscribe(self.id, Box::new(move || flag.set(true)));
            self.subscribed = true;
        }

        let child = match &self.origin {
            ProxyOrigin::Root => None,
            ProxyOrigin::Child { parent, member } => Some((parent.clone(), member.clone())),
        };
        let result = match child {
            None => self.resolve_root(director, &source),
            Some((parent, member)) => self.resolve_child(director, &source, &parent, &member),
        };

        let descriptor = match result {
            Ok(Some(descriptor)) => descriptor,
            Ok(None) => return false,
            Err(error) => {
                self.report(director, source.name(), &error);
                return false;
            }
        };

        let local = director.cursor().local_entry;
        if source.column_base(&descriptor.column, local).is_none() {
            tracing::debug!(
                column = %self.path,
                source = source.name(),
                entry = local,
                "No data for column at current entry"
            );
            return false;
        }

        tracing::debug!(
            column = %self.path,
            source = source.name(),
            shape = %descriptor.shape,
            element_type = %descriptor.element_type,
            "Resolved column"
        );
        self.descriptor = Some(descriptor);
        self.epoch += 1;
        true
    }

    /// Computes where this column's values lie for `local_entry` of the
    /// current source. Requires a resolved proxy.
    pub fn locate(&self, director: &Director, local_entry: u64) -> Result<Location, ReaderError> {
        let not_active = || ReaderError::NoActiveSource {
            column: self.path.clone(),
        };
        let descriptor = self.descriptor.as_ref().ok_or_else(not_active)?;
        let source = director.current_source().ok_or_else(not_active)?;

        let base = source
            .column_base(&descriptor.column, local_entry)
            .ok_or_else(|| ReaderError::ReadError {
                column: self.path.clone(),
                entry: local_entry,
                source_name: source.name().to_string(),
                reason: "no data for entry".to_string(),
            })?;

        if descriptor.steps.is_empty()
            && descriptor.shape != ValueShape::Scalar
            && source.column_raw_size(&descriptor.column, local_entry) == 0
        {
            return Ok(Location::empty(base, descriptor.element_size));
        }

        let count = match &descriptor.shape {
            ValueShape::CountedArray { count_column } => {
                Some(self.dynamic_count(director, count_column, local_entry)?)
            }
            _ => None,
        };

        descriptor.locate_in(base, source.as_ref(), local_entry, count)
    }

    fn dynamic_count(
        &self,
        director: &Director,
        count_column: &str,
        local_entry: u64,
    ) -> Result<usize, ReaderError> {
        let missing = || ReaderError::MissingColumn {
            column: count_column.to_string(),
            source_name: director
                .current_source()
                .map(|s| s.name().to_string())
                .unwrap_or_default(),
        };
        let provider = self
            .count_provider
            .as_ref()
            .and_then(Weak::upgrade)
            .ok_or_else(missing)?;
        let mut provider = provider.borrow_mut();
        if !provider.setup(director) {
            return Err(missing());
        }
        if let Some(source) = director.current_source() {
            if source.read_status(count_column, local_entry) == ReadStatus::Error {
                return Err(ReaderError::ReadError {
                    column: count_column.to_string(),
                    entry: local_entry,
                    source_name: source.name().to_string(),
                    reason: format!("count column of '{}' is unreadable", self.path),
                });
            }
        }

        let location = provider.locate(director, local_entry)?;
        let type_name = provider
            .descriptor()
            .map(|d| d.element_type.as_str())
            .unwrap_or_default();
        let count = location
            .element_bytes(0)
            .and_then(|bytes| decode_count(type_name, bytes))
            .ok_or_else(missing)?;

        usize::try_from(count).map_err(|_| ReaderError::ReadError {
            column: self.path.clone(),
            entry: local_entry,
            source_name: director
                .current_source()
                .map(|s| s.name().to_string())
                .unwrap_or_default(),
            reason: format!("negative element count {}", count),
        })
    }

    fn resolve_root(
        &mut self,
        director: &Director,
        source: &Arc<dyn Source>,
    ) -> Result<Option<ColumnDescriptor>, ReaderError> {
        let generation = source.generation();
        let schema = source.schema();

        if let Some(column) = schema.column(&self.path) {
            return self.describe_column(director, source, column).map(Some);
        }

        if self.benign_absence == Some(generation) {
            return Ok(None);
        }
        if director.is_benign_absence(&self.path, schema) {
            tracing::debug!(
                column = %self.path,
                source = source.name(),
                "Column split into sub-columns; not an error"
            );
            self.benign_absence = Some(generation);
            return Ok(None);
        }

        // "object.member" where only "object" is a column
        let prefix = self
            .path
            .match_indices('.')
            .map(|(i, _)| i)
            .rev()
            .find_map(|i| schema.column(&self.path[..i]).map(|c| (c, i)));
        if let Some((column, split)) = prefix {
            let base = self.describe_column(director, source, column)?;
            let member = self.path[split + 1..].to_string();
            return self.apply_member(director, source, base, &member).map(Some);
        }

        if director.config().is_missing_suppressed(&self.path) {
            return Ok(None);
        }
        Err(ReaderError::MissingColumn {
            column: self.path.clone(),
            source_name: source.name().to_string(),
        })
    }

    fn resolve_child(
        &mut self,
        director: &Director,
        source: &Arc<dyn Source>,
        parent: &Weak<RefCell<ColumnProxy>>,
        member: &str,
    ) -> Result<Option<ColumnDescriptor>, ReaderError> {
        let Some(parent) = parent.upgrade() else {
            return Ok(None);
        };
        let parent_descriptor = {
            let mut parent = parent.borrow_mut();
            if !parent.setup(director) {
                return Ok(None);
            }
            match parent.descriptor() {
                Some(descriptor) => descriptor.clone(),
                None => return Ok(None),
            }
        };
        self.apply_member(director, source, parent_descriptor, member)
            .map(Some)
    }

    /// Describes a source column as a whole.
    fn describe_column(
        &mut self,
        director: &Director,
        source: &Arc<dyn Source>,
        column: &ColumnSchema,
    ) -> Result<ColumnDescriptor, ReaderError> {
        let generation = source.generation();
        let catalog = director.catalog();
        let path = self.path.clone();
        let unknown = |class: &str| ReaderError::UnknownClass {
            column: path.clone(),
            class: class.to_string(),
        };

        let mut descriptor = ColumnDescriptor {
            path: self.path.clone(),
            column: column.name.clone(),
            declared_type: String::new(),
            runtime_class: String::new(),
            value_class: None,
            element_type: String::new(),
            offset: 0,
            member_offset: 0,
            element_size: 0,
            array_length: 1,
            is_pointer: false,
            is_top_level_aggregate: false,
            is_indexed_container: false,
            shape: ValueShape::Scalar,
            steps: Vec::new(),
        };

        match &column.kind {
            ColumnKind::Leaf {
                type_name,
                array_length,
                count_column,
            } => {
                let layout = catalog
                    .class_layout(type_name, generation)
                    .ok_or_else(|| unknown(type_name))?;
                if let Some(expected) =
                    basic_type_size(type_name).filter(|size| *size != layout.size)
                {
                    return Err(ReaderError::UnsupportedLayout {
                        column: self.path.clone(),
                        reason: format!(
                            "'{}' is registered with size {}, stored size is {}",
                            type_name, layout.size, expected
                        ),
                    });
                }
                descriptor.declared_type = type_name.clone();
                descriptor.runtime_class = type_name.clone();
                descriptor.element_type = type_name.clone();
                descriptor.element_size = layout.size;
                descriptor.array_length = *array_length;
                descriptor.shape = match count_column {
                    Some(count_column) => {
                        self.attach_count_provider(director, source, count_column)?;
                        ValueShape::CountedArray {
                            count_column: count_column.clone(),
                        }
                    }
                    None if *array_length > 1 => ValueShape::FixedArray {
                        length: *array_length,
                    },
                    None => ValueShape::Scalar,
                };
            }
            ColumnKind::Object { class_name } => {
                let layout = catalog
                    .class_layout(class_name, generation)
                    .ok_or_else(|| unknown(class_name))?;
                descriptor.declared_type = class_name.clone();
                descriptor.runtime_class = class_name.clone();
                descriptor.element_type = class_name.clone();
                descriptor.element_size = layout.size;
                descriptor.is_top_level_aggregate = true;
            }
            ColumnKind::IndexedContainer { element_class } => {
                let layout = catalog
                    .class_layout(element_class, generation)
                    .ok_or_else(|| unknown(element_class))?;
                descriptor.declared_type = element_class.clone();
                descriptor.runtime_class = element_class.clone();
                descriptor.element_type = element_class.clone();
                descriptor.element_size = layout.size;
                descriptor.is_top_level_aggregate = true;
                descriptor.is_indexed_container = true;
                descriptor.shape = ValueShape::Collection;
                descriptor.steps.push(AccessStep::Elements {
                    stride: layout.size,
                });
            }
            ColumnKind::Collection { class_name } => {
                let layout = catalog
                    .class_layout(class_name, generation)
                    .ok_or_else(|| unknown(class_name))?;
                let view = CollectionView::generate(&layout, catalog, generation, &self.path)?;
                descriptor.declared_type = class_name.clone();
                descriptor.runtime_class = class_name.clone();
                descriptor.value_class = Some(view.value_class.clone());
                descriptor.element_type = view.value_class.clone();
                descriptor.element_size = view.value_size;
                descriptor.is_top_level_aggregate = true;
                descriptor.shape = ValueShape::Collection;
                descriptor.steps.push(AccessStep::Elements {
                    stride: view.value_size,
                });
                self.collection = Some(view);
            }
        }

        Ok(descriptor)
    }

    fn attach_count_provider(
        &mut self,
        director: &Director,
        source: &Arc<dyn Source>,
        count_column: &str,
    ) -> Result<(), ReaderError> {
        let is_scalar_leaf = matches!(
            source.schema().column(count_column).map(|c| &c.kind),
            Some(ColumnKind::Leaf {
                array_length: 1,
                count_column: None,
                ..
            })
        );
        if count_column == self.path || !is_scalar_leaf {
            return Err(ReaderError::MissingColumn {
                column: count_column.to_string(),
                source_name: source.name().to_string(),
            });
        }
        self.count_provider = Some(Rc::downgrade(&director.proxy(count_column)));
        Ok(())
    }

    /// Narrows `parent` to one of its members.
    fn apply_member(
        &mut self,
        director: &Director,
        source: &Arc<dyn Source>,
        parent: ColumnDescriptor,
        member: &str,
    ) -> Result<ColumnDescriptor, ReaderError> {
        let generation = source.generation();
        let catalog = director.catalog();
        let path = self.path.clone();
        let unknown = |class: &str| ReaderError::UnknownClass {
            column: path.clone(),
            class: class.to_string(),
        };
        let unsupported = |reason: &str| ReaderError::UnsupportedLayout {
            column: path.clone(),
            reason: reason.to_string(),
        };

        let parent_layout = catalog
            .class_layout(&parent.runtime_class, generation)
            .ok_or_else(|| unknown(&parent.runtime_class))?;
        let class_layout = match parent_layout.kind.clone() {
            ClassKind::IndexedContainer { element_class } => catalog
                .class_layout(&element_class, generation)
                .ok_or_else(|| unknown(&element_class))?,
            ClassKind::Collection { .. } => {
                let view =
                    CollectionView::generate(&parent_layout, catalog, generation, &self.path)?;
                let value_layout = catalog
                    .class_layout(&view.value_class, generation)
                    .ok_or_else(|| unknown(&view.value_class))?;
                self.collection = Some(view);
                value_layout
            }
            ClassKind::Basic | ClassKind::Struct => parent_layout,
        };

        let layout: MemberLayout = catalog
            .resolve_member(&class_layout.name, member, generation)
            .ok_or_else(|| ReaderError::MissingMember {
                column: self.path.clone(),
                member: member.to_string(),
                class: class_layout.name.clone(),
            })?;

        let member_offset = match (usize::try_from(layout.offset), layout.end_offset()) {
            (Ok(offset), Some(end)) if end <= class_layout.size => offset,
            _ => {
                let error = ReaderError::InvalidOffset {
                    column: self.path.clone(),
                    offset: layout.offset,
                    max: class_layout.size,
                };
                self.report(director, source.name(), &error);
                0
            }
        };

        let in_elements = parent.in_elements();
        let member_class = layout.runtime_class().to_string();
        let container = match catalog.class_layout(&member_class, generation) {
            Some(l) if CollectionView::is_container(&l) => Some(CollectionView::generate(
                &l,
                catalog,
                generation,
                &self.path,
            )?),
            Some(l) if !layout.is_pointer && !layout.is_collection => {
                let stored = basic_type_size(&member_class).unwrap_or(l.size);
                if stored != layout.element_size() || l.size != stored {
                    return Err(unsupported(&format!(
                        "member '{}' has size {} but '{}' is {} bytes",
                        member,
                        layout.element_size(),
                        member_class,
                        stored
                    )));
                }
                None
            }
            Some(_) => None,
            None if layout.is_collection || layout.is_pointer => return Err(unknown(&member_class)),
            None => None,
        };

        let mut descriptor = ColumnDescriptor {
            path: self.path.clone(),
            column: parent.column.clone(),
            declared_type: layout.type_name.clone(),
            runtime_class: member_class.clone(),
            value_class: None,
            element_type: layout.type_name.clone(),
            offset: parent.child_base_offset() + member_offset,
            member_offset,
            element_size: layout.size,
            array_length: layout.array_length,
            is_pointer: layout.is_pointer,
            is_top_level_aggregate: false,
            is_indexed_container: false,
            shape: if in_elements {
                ValueShape::Collection
            } else {
                ValueShape::Scalar
            },
            steps: parent.steps.clone(),
        };
        descriptor.steps.push(AccessStep::Offset(member_offset));

        if let Some(view) = container {
            if in_elements {
                return Err(unsupported("collection nested inside collection elements"));
            }
            descriptor.steps.push(AccessStep::Deref);
            descriptor.steps.push(AccessStep::Elements {
                stride: view.value_size,
            });
            descriptor.offset = 0;
            descriptor.element_type = view.value_class.clone();
            descriptor.value_class = Some(view.value_class.clone());
            descriptor.element_size = view.value_size;
            descriptor.is_indexed_container = matches!(
                catalog.class_layout(&member_class, generation).map(|l| l.kind),
                Some(ClassKind::IndexedContainer { .. })
            );
            descriptor.shape = ValueShape::Collection;
            self.collection = Some(view);
        } else if layout.is_pointer {
            if in_elements {
                return Err(unsupported("pointer inside collection elements"));
            }
            let target = catalog
                .class_layout(&member_class, generation)
                .ok_or_else(|| unknown(&member_class))?;
            descriptor.steps.push(AccessStep::Deref);
            descriptor.offset = 0;
            descriptor.element_type = member_class;
            descriptor.element_size = target.size;
        } else if layout.array_length > 1 {
            if in_elements {
                return Err(unsupported("fixed array inside collection elements"));
            }
            descriptor.element_size = layout.element_size();
            descriptor.shape = ValueShape::FixedArray {
                length: layout.array_length,
            };
        }

        Ok(descriptor)
    }

    /// Reports `error` once per kind and source.
    fn report(&mut self, director: &Director, source_name: &str, error: &ReaderError) {
        if self.reported.insert((error.kind(), source_name.to_string())) {
            director.diagnostics().report_error(error);
        }
    }
}
