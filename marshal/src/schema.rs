//! Field descriptor tables and their resolution.
//!
//! A [Schema] is the table of fields a record type declares itself, plus the name of the
//! type it extends (if any). A [Registry] owns schemas by type name and resolves each one
//! into a [Layout]: the base chain flattened base-first into a single field list.
//!
//! Resolution validates everything that could otherwise fail half way through a buffer
//! (unknown types, unsupported array elements, records that contain themselves), so a
//! decode that starts never fails on configuration. Layouts are cached per type in a
//! [OnceLock] and shared between threads.

use crate::{
    adapter::Adapter,
    array::{Array, ArrayLength},
    enumeration::EnumType,
    length::LengthSize,
    primitive::Primitive,
    string::StringPolicy,
    Error, Record, Value,
};
use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, OnceLock},
};
use tracing::debug;

/// Largest element count of a fixed array: the most any length width can express.
pub const MAX_FIXED_LENGTH: usize = u32::MAX as usize;

/// What a field holds and which codec handles it.
#[derive(Clone, Debug)]
pub enum Kind {
    Primitive(Primitive),
    String(StringPolicy),
    Enum(Arc<EnumType>),
    Array(Box<Array>),
    /// A nested record, by type name.
    Record(String),
    Custom(Arc<dyn Adapter>),
}

impl Kind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Primitive(_) => "primitive",
            Self::String(_) => "string",
            Self::Enum(_) => "enum",
            Self::Array(_) => "array",
            Self::Record(_) => "record",
            Self::Custom(_) => "custom",
        }
    }
}

impl From<Primitive> for Kind {
    fn from(kind: Primitive) -> Self {
        Self::Primitive(kind)
    }
}

impl From<StringPolicy> for Kind {
    fn from(policy: StringPolicy) -> Self {
        Self::String(policy)
    }
}

impl From<Array> for Kind {
    fn from(array: Array) -> Self {
        Self::Array(Box::new(array))
    }
}

/// Descriptor of one field.
#[derive(Clone, Debug)]
pub struct Field {
    name: String,
    kind: Kind,
    length_size: LengthSize,
    skip: bool,
}

impl Field {
    pub fn new(name: impl Into<String>, kind: impl Into<Kind>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            length_size: LengthSize::default(),
            skip: false,
        }
    }

    pub fn primitive(name: impl Into<String>, kind: Primitive) -> Self {
        Self::new(name, kind)
    }

    pub fn string(name: impl Into<String>, policy: StringPolicy) -> Self {
        Self::new(name, policy)
    }

    pub fn enumeration(name: impl Into<String>, ty: Arc<EnumType>) -> Self {
        Self::new(name, Kind::Enum(ty))
    }

    pub fn array(name: impl Into<String>, array: Array) -> Self {
        Self::new(name, array)
    }

    /// A nested record of type `type_name`.
    pub fn record(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self::new(name, Kind::Record(type_name.into()))
    }

    pub fn custom(name: impl Into<String>, adapter: Arc<dyn Adapter>) -> Self {
        Self::new(name, Kind::Custom(adapter))
    }

    /// Width of this field's length or enum index: 1, 2 or 4 bytes. Other values mean 4.
    pub fn with_length_size(mut self, size: i32) -> Self {
        self.length_size = LengthSize::normalize(size);
        self
    }

    /// Marks the field as storage-only: it is kept in records but never read or written.
    pub fn skipped(mut self) -> Self {
        self.skip = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &Kind {
        &self.kind
    }

    pub fn length_size(&self) -> LengthSize {
        self.length_size
    }

    pub fn is_skipped(&self) -> bool {
        self.skip
    }

    /// Record types referenced by this field, with whether each is stored inline (as opposed
    /// to behind a dynamic array).
    fn references(&self) -> Option<(&str, bool)> {
        match &self.kind {
            Kind::Record(name) => Some((name, true)),
            Kind::Array(array) => array
                .element_record()
                .map(|name| (name, matches!(array.length(), ArrayLength::Fixed(_)))),
            _ => None,
        }
    }

    /// Rejects combinations the codecs do not support.
    pub(crate) fn validate(&self, owner: &str) -> Result<(), Error> {
        if let Kind::Array(array) = &self.kind {
            if let ArrayLength::Fixed(len) = array.length() {
                if len > MAX_FIXED_LENGTH {
                    return Err(Error::Configuration(
                        owner.to_string(),
                        format!(
                            "array field {} has fixed length {len} (max {MAX_FIXED_LENGTH})",
                            self.name
                        ),
                    ));
                }
            }
            match array.element() {
                Kind::Primitive(_) | Kind::Record(_) => {}
                other => {
                    return Err(Error::Configuration(
                        owner.to_string(),
                        format!(
                            "array field {} has unsupported {} elements",
                            self.name,
                            other.name()
                        ),
                    ))
                }
            }
        }
        Ok(())
    }
}

/// The fields a record type declares, and the type it extends.
#[derive(Clone, Debug)]
pub struct Schema {
    name: String,
    base: Option<String>,
    fields: Vec<Field>,
}

impl Schema {
    pub fn builder(name: impl Into<String>) -> Builder {
        Builder {
            schema: Schema {
                name: name.into(),
                base: None,
                fields: Vec::new(),
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base(&self) -> Option<&str> {
        self.base.as_deref()
    }

    /// Fields declared by this type only.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }
}

/// Builder for [Schema].
#[derive(Clone, Debug)]
pub struct Builder {
    schema: Schema,
}

impl Builder {
    /// Extends `base`: its fields are laid out before this type's own.
    pub fn base(mut self, base: impl Into<String>) -> Self {
        self.schema.base = Some(base.into());
        self
    }

    pub fn field(mut self, field: Field) -> Self {
        self.schema.fields.push(field);
        self
    }

    pub fn build(self) -> Schema {
        self.schema
    }
}

/// A record type with its base chain flattened.
#[derive(Debug)]
pub struct Layout {
    name: String,
    fields: Vec<Field>,
    index: HashMap<String, usize>,
}

impl Layout {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All fields, base-most type first, each type's fields in declaration order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn index_of(&self, field: &str) -> Option<usize> {
        self.index.get(field).copied()
    }
}

#[derive(Debug)]
struct Entry {
    schema: Schema,
    layout: OnceLock<Result<Arc<Layout>, Error>>,
    closure: OnceLock<Result<(), Error>>,
}

impl Entry {
    fn new(schema: Schema) -> Self {
        Self {
            schema,
            layout: OnceLock::new(),
            closure: OnceLock::new(),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
    Active,
    Done,
}

/// Schemas by type name, with their resolved layouts.
///
/// Register every schema first, then share the registry (typically behind an [Arc]) between
/// any number of concurrent calls.
#[derive(Debug, Default)]
pub struct Registry {
    entries: HashMap<String, Entry>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a schema. Fails if a schema with the same name is already registered.
    pub fn register(&mut self, schema: Schema) -> Result<(), Error> {
        if self.entries.contains_key(schema.name()) {
            return Err(Error::Configuration(
                schema.name().to_string(),
                "already registered".to_string(),
            ));
        }

        // A new type can make previously unresolvable types resolvable
        for (name, entry) in self.entries.iter_mut() {
            if matches!(entry.layout.get(), Some(Err(_)))
                || matches!(entry.closure.get(), Some(Err(_)))
            {
                debug!(name = name.as_str(), "invalidated failed resolution");
                entry.layout = OnceLock::new();
                entry.closure = OnceLock::new();
            }
        }
        debug!(name = schema.name(), "registered schema");
        self.entries
            .insert(schema.name().to_string(), Entry::new(schema));
        Ok(())
    }

    /// Builder-style [Self::register].
    pub fn with(mut self, schema: Schema) -> Result<Self, Error> {
        self.register(schema)?;
        Ok(self)
    }

    pub fn schema(&self, name: &str) -> Option<&Schema> {
        self.entries.get(name).map(|entry| &entry.schema)
    }

    /// Resolves `name` and validates every type reachable from it.
    pub fn resolve(&self, name: &str) -> Result<Arc<Layout>, Error> {
        let entry = self.entry(name)?;
        let layout = self.layout(name)?;
        entry
            .closure
            .get_or_init(|| self.check_closure(name))
            .clone()?;
        Ok(layout)
    }

    /// Creates an instance of `name` with every field at its default: primitives zero,
    /// strings and dynamic arrays empty, fixed arrays and nested records default-filled,
    /// enum and custom fields unset.
    pub fn instantiate(&self, name: &str) -> Result<Record, Error> {
        let layout = self.resolve(name)?;
        self.construct(layout, true)
    }

    /// Creates an instance of `layout` where only skipped fields hold defaults.
    pub(crate) fn construct(&self, layout: Arc<Layout>, all: bool) -> Result<Record, Error> {
        let values = layout
            .fields()
            .iter()
            .map(|field| {
                if all || field.is_skipped() {
                    self.default_value(field.kind())
                } else {
                    Ok(None)
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Record::new(layout, values))
    }

    fn default_value(&self, kind: &Kind) -> Result<Option<Value>, Error> {
        Ok(match kind {
            Kind::Primitive(primitive) => Some(primitive.zero()),
            Kind::String(_) => Some(Value::String(String::new())),
            Kind::Enum(_) | Kind::Custom(_) => None,
            Kind::Array(array) => match array.length() {
                ArrayLength::Prefixed => Some(Value::Array(Vec::new())),
                ArrayLength::Fixed(len) => {
                    let mut values = Vec::new();
                    values.try_reserve_exact(len).map_err(|_| {
                        Error::Configuration(
                            kind.name().to_string(),
                            format!("cannot allocate {len} default elements"),
                        )
                    })?;
                    for _ in 0..len {
                        if let Some(value) = self.default_value(array.element())? {
                            values.push(value);
                        }
                    }
                    Some(Value::Array(values))
                }
            },
            Kind::Record(name) => Some(Value::Record(self.instantiate(name)?)),
        })
    }

    fn entry(&self, name: &str) -> Result<&Entry, Error> {
        self.entries
            .get(name)
            .ok_or_else(|| Error::Construction(name.to_string()))
    }

    /// Resolves a single type (without following nested references).
    fn layout(&self, name: &str) -> Result<Arc<Layout>, Error> {
        self.entry(name)?
            .layout
            .get_or_init(|| self.build_layout(name))
            .clone()
    }

    fn build_layout(&self, name: &str) -> Result<Arc<Layout>, Error> {
        // Walk up the base chain
        let root = &self.entry(name)?.schema;
        let mut chain = vec![root];
        let mut seen = HashSet::from([name]);
        let mut next = root.base();
        while let Some(base) = next {
            if !seen.insert(base) {
                return Err(Error::Configuration(
                    name.to_string(),
                    format!("cyclic base type {base}"),
                ));
            }
            let schema = &self
                .entries
                .get(base)
                .ok_or_else(|| {
                    Error::Configuration(name.to_string(), format!("unknown base type {base}"))
                })?
                .schema;
            chain.push(schema);
            next = schema.base();
        }

        // Concatenate base-first
        let mut fields = Vec::new();
        let mut index = HashMap::new();
        for schema in chain.iter().rev() {
            for field in schema.fields() {
                field.validate(name)?;
                if index.insert(field.name().to_string(), fields.len()).is_some() {
                    return Err(Error::Configuration(
                        name.to_string(),
                        format!("duplicate field {}", field.name()),
                    ));
                }
                fields.push(field.clone());
            }
        }
        debug!(
            name,
            fields = fields.len(),
            levels = chain.len(),
            "resolved layout"
        );
        Ok(Arc::new(Layout {
            name: name.to_string(),
            fields,
            index,
        }))
    }

    fn check_closure(&self, root: &str) -> Result<(), Error> {
        // Every reachable type must resolve
        let mut reachable = HashSet::new();
        let mut pending = vec![root.to_string()];
        while let Some(name) = pending.pop() {
            if reachable.contains(&name) {
                continue;
            }
            let layout = self.layout(&name)?;
            for (target, _) in layout.fields().iter().filter_map(Field::references) {
                pending.push(target.to_string());
            }
            reachable.insert(name);
        }

        // No type may contain itself except through a dynamic array
        let mut state = HashMap::new();
        for name in &reachable {
            self.check_inline(name, &mut state)?;
        }
        Ok(())
    }

    fn check_inline(&self, name: &str, state: &mut HashMap<String, Visit>) -> Result<(), Error> {
        match state.get(name) {
            Some(Visit::Done) => return Ok(()),
            Some(Visit::Active) => {
                return Err(Error::Configuration(
                    name.to_string(),
                    "record contains itself without a dynamic array".to_string(),
                ))
            }
            None => {}
        }
        state.insert(name.to_string(), Visit::Active);
        let layout = self.layout(name)?;
        for (target, inline) in layout.fields().iter().filter_map(Field::references) {
            if inline {
                self.check_inline(target, state)?;
            }
        }
        state.insert(name.to_string(), Visit::Done);
        Ok(())
    }

    /// Validates a free-standing field (used for array-shaped roots).
    pub(crate) fn check_field(&self, field: &Field) -> Result<(), Error> {
        field.validate(field.name())?;
        if let Some((target, _)) = field.references() {
            self.resolve(target)?;
        }
        Ok(())
    }
}
