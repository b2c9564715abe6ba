//! Slot descriptors, the process-wide class registry, and the resolved
//! descriptor cache.
//!
//! A record type's declared layout ([`RecordDescriptor`]) is produced by
//! `#[derive(Record)]`. Before the codec uses it, the layout is *resolved*:
//! inclusion rules are applied, external names are fixed, and the slots of an
//! embedded parent record are merged in through a projection. Resolution is
//! idempotent, so the cache tolerates racing inserts without coordination.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use log::{debug, warn};

use crate::record::{Record, RecordHandle, RecordType};
use crate::value::{Value, ValueKind, WireEnum};

/// Reads one slot out of a record instance.
pub type SlotGetFn = fn(&dyn Any) -> Value;
/// Writes one slot into a record instance; fails when the value cannot
/// convert to the slot's type.
pub type SlotSetFn = fn(&mut dyn Any, Value) -> crate::Result<()>;
/// Projects a record onto the parent record it embeds.
pub type ProjectFn = fn(&dyn Any) -> &dyn Any;
/// Mutable variant of [`ProjectFn`].
pub type ProjectMutFn = fn(&mut dyn Any) -> &mut dyn Any;
/// Composed reader for an included slot.
pub type ResolvedGetFn = Arc<dyn Fn(&dyn Any) -> Value + Send + Sync>;
/// Composed writer for an included slot.
pub type ResolvedSetFn = Arc<dyn Fn(&mut dyn Any, Value) -> crate::Result<()> + Send + Sync>;

/// Parent chains longer than this stop contributing slots.
const MAX_PARENT_DEPTH: usize = 16;

/// One named field of a record, as declared.
pub struct SlotDescriptor {
    /// The declared field name.
    pub name: &'static str,
    /// External-name override.
    pub rename: Option<&'static str>,
    /// Excluded from serialization unconditionally.
    pub transient: bool,
    /// Excluded by directive.
    pub ignore: bool,
    /// Treated as immutable after construction; excluded unless
    /// [`WriteOptions::serialize_readonly_fields`](crate::WriteOptions) is
    /// set.
    pub readonly: bool,
    /// The declared value kind.
    pub kind: ValueKind,
    /// Slot reader.
    pub get: SlotGetFn,
    /// Slot writer.
    pub set: SlotSetFn,
}

/// Link from a record type to the parent record it embeds.
pub struct ParentLink {
    /// The parent's wire class name.
    pub name: &'static str,
    /// Supplier of the parent's declared layout.
    pub descriptor: fn() -> Arc<RecordDescriptor>,
    /// Projection from an instance to its embedded parent.
    pub project: ProjectFn,
    /// Mutable projection from an instance to its embedded parent.
    pub project_mut: ProjectMutFn,
}

/// The declared slot layout of a record type, before inclusion rules.
pub struct RecordDescriptor {
    /// The wire class name.
    pub name: &'static str,
    /// The embedded parent whose slots merge into this record's field list.
    pub parent: Option<ParentLink>,
    /// Restrict the scan to directly-declared slots.
    pub ignore_inherited: bool,
    /// Declared slots, in declaration order.
    pub slots: Vec<SlotDescriptor>,
}

/// One included slot after inclusion rules and parent merging.
#[derive(Clone)]
pub struct ResolvedSlot {
    /// The external name carried on the wire.
    pub wire_name: &'static str,
    /// Whether the slot is skipped unless read-only serialization is on.
    pub readonly: bool,
    /// The declared value kind.
    pub kind: ValueKind,
    /// Composed reader.
    pub get: ResolvedGetFn,
    /// Composed writer.
    pub set: ResolvedSetFn,
}

/// A record type's included slots, in wire order.
pub struct ResolvedDescriptor {
    /// The wire class name.
    pub name: &'static str,
    /// Included slots.
    pub slots: Vec<ResolvedSlot>,
}

impl ResolvedDescriptor {
    /// Finds a slot by its external name.
    pub fn slot(&self, wire_name: &str) -> Option<&ResolvedSlot> {
        self.slots.iter().find(|slot| slot.wire_name == wire_name)
    }
}

/// Accumulated projection steps from the scanned type down a parent chain.
#[derive(Clone, Default)]
struct Projection {
    steps: Vec<(ProjectFn, ProjectMutFn)>,
}

impl Projection {
    fn apply<'a>(&self, mut any: &'a dyn Any) -> &'a dyn Any {
        for (step, _) in &self.steps {
            any = step(any);
        }
        any
    }

    fn apply_mut<'a>(&self, mut any: &'a mut dyn Any) -> &'a mut dyn Any {
        for (_, step) in &self.steps {
            any = step(any);
        }
        any
    }
}

fn resolve(descriptor: &RecordDescriptor) -> ResolvedDescriptor {
    let mut slots = Vec::new();
    collect(descriptor, &Projection::default(), 0, &mut slots);
    ResolvedDescriptor {
        name: descriptor.name,
        slots,
    }
}

fn collect(
    descriptor: &RecordDescriptor,
    projection: &Projection,
    depth: usize,
    out: &mut Vec<ResolvedSlot>,
) {
    for slot in &descriptor.slots {
        if slot.transient || slot.ignore {
            continue;
        }
        let wire_name = slot.rename.unwrap_or(slot.name);
        if out.iter().any(|existing| existing.wire_name == wire_name) {
            debug!(
                "slot `{wire_name}` of `{}` is shadowed by a subtype slot",
                descriptor.name
            );
            continue;
        }
        let get = {
            let projection = projection.clone();
            let get = slot.get;
            Arc::new(move |any: &dyn Any| get(projection.apply(any))) as ResolvedGetFn
        };
        let set = {
            let projection = projection.clone();
            let set = slot.set;
            Arc::new(move |any: &mut dyn Any, value: Value| set(projection.apply_mut(any), value))
                as ResolvedSetFn
        };
        out.push(ResolvedSlot {
            wire_name,
            readonly: slot.readonly,
            kind: slot.kind,
            get,
            set,
        });
    }

    if descriptor.ignore_inherited {
        return;
    }
    let Some(parent) = &descriptor.parent else {
        return;
    };
    if depth >= MAX_PARENT_DEPTH {
        warn!(
            "parent chain of record class `{}` exceeds depth {MAX_PARENT_DEPTH}; \
             deeper slots are not scanned",
            descriptor.name
        );
        return;
    }
    let mut next = projection.clone();
    next.steps.push((parent.project, parent.project_mut));
    let parent_descriptor = (parent.descriptor)();
    collect(&parent_descriptor, &next, depth + 1, out);
}

// Keyed by the declared descriptor's identity rather than its wire name:
// several Rust types may share one wire name (e.g. producer and consumer
// schemas in one process). The cache pins each descriptor so its address
// stays unique for the life of the process.
type DescriptorCache =
    RwLock<HashMap<usize, (Arc<RecordDescriptor>, Arc<ResolvedDescriptor>)>>;

fn descriptor_cache() -> &'static DescriptorCache {
    static CACHE: OnceLock<DescriptorCache> = OnceLock::new();
    CACHE.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Resolves `descriptor`, consulting and populating the process-wide cache.
pub fn introspect(descriptor: &Arc<RecordDescriptor>) -> Arc<ResolvedDescriptor> {
    let key = Arc::as_ptr(descriptor) as usize;
    if let Some((_, found)) = descriptor_cache()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&key)
    {
        return found.clone();
    }
    let resolved = Arc::new(resolve(descriptor));
    let mut cache = descriptor_cache()
        .write()
        .unwrap_or_else(PoisonError::into_inner);
    cache
        .entry(key)
        .or_insert_with(|| (descriptor.clone(), resolved))
        .1
        .clone()
}

/// Resolves the slot layout of a live record, or `None` when its slots are
/// dynamic.
pub(crate) fn introspect_record(record: &dyn Record) -> Option<Arc<ResolvedDescriptor>> {
    record.raw_descriptor().map(|raw| introspect(&raw))
}

/// Construction path for a registered record class.
pub type ConstructFn = fn() -> RecordHandle;

#[derive(Clone, Copy)]
struct RecordBinding {
    descriptor: fn() -> Arc<RecordDescriptor>,
    construct: Option<ConstructFn>,
}

#[derive(Clone, Copy)]
struct EnumBinding {
    constants: &'static [&'static str],
}

type RecordRegistry = RwLock<HashMap<&'static str, RecordBinding>>;
type EnumRegistry = RwLock<HashMap<&'static str, EnumBinding>>;

fn record_registry() -> &'static RecordRegistry {
    static REGISTRY: OnceLock<RecordRegistry> = OnceLock::new();
    REGISTRY.get_or_init(|| RwLock::new(HashMap::new()))
}

fn enum_registry() -> &'static EnumRegistry {
    static REGISTRY: OnceLock<EnumRegistry> = OnceLock::new();
    REGISTRY.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Registers record type `T` so the decoder can resolve its wire class name
/// and construct blank instances.
///
/// Idempotent; re-registering a name replaces its binding. Encoding needs no
/// registration because a live record carries its own layout.
pub fn register<T: RecordType>() {
    register_with(T::NAME, T::descriptor, Some(|| {
        RecordHandle::new(T::default())
    }));
}

/// Registers a record class by hand, e.g. for an encode-only adapter.
///
/// When `construct` is `None`, decoding this class fails with
/// [`Error::CannotConstruct`](crate::Error).
pub fn register_with(
    name: &'static str,
    descriptor: fn() -> Arc<RecordDescriptor>,
    construct: Option<ConstructFn>,
) {
    record_registry()
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(
            name,
            RecordBinding {
                descriptor,
                construct,
            },
        );
    debug!("registered record class `{name}`");
}

/// Registers enumeration `E` for decode-side constant resolution.
pub fn register_enum<E: WireEnum>() {
    enum_registry()
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(
            E::NAME,
            EnumBinding {
                constants: E::constants(),
            },
        );
    debug!("registered enum class `{}`", E::NAME);
}

/// Looks up a registered record class by wire name.
pub(crate) fn lookup_record(
    name: &str,
) -> Option<(Arc<ResolvedDescriptor>, Option<ConstructFn>)> {
    let binding = *record_registry()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(name)?;
    let raw = (binding.descriptor)();
    Some((introspect(&raw), binding.construct))
}

/// Looks up a registered enum's constant names by wire name.
pub(crate) fn lookup_enum(name: &str) -> Option<&'static [&'static str]> {
    enum_registry()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(name)
        .map(|binding| binding.constants)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FromValue, IntoValue};

    #[derive(Default)]
    struct Plain {
        kept: i32,
        hidden: i32,
        stamped: i64,
    }

    fn plain_descriptor() -> Arc<RecordDescriptor> {
        Arc::new(RecordDescriptor {
            name: "introspect.Plain",
            parent: None,
            ignore_inherited: false,
            slots: vec![
                SlotDescriptor {
                    name: "kept",
                    rename: None,
                    transient: false,
                    ignore: false,
                    readonly: false,
                    kind: ValueKind::Int,
                    get: |any| {
                        any.downcast_ref::<Plain>().expect("record type mismatch").kept.into_value()
                    },
                    set: |any, value| {
                        any.downcast_mut::<Plain>().expect("record type mismatch").kept =
                            i32::from_value(value)?;
                        Ok(())
                    },
                },
                SlotDescriptor {
                    name: "hidden",
                    rename: None,
                    transient: true,
                    ignore: false,
                    readonly: false,
                    kind: ValueKind::Int,
                    get: |any| {
                        any.downcast_ref::<Plain>().expect("record type mismatch").hidden.into_value()
                    },
                    set: |any, value| {
                        any.downcast_mut::<Plain>().expect("record type mismatch").hidden =
                            i32::from_value(value)?;
                        Ok(())
                    },
                },
                SlotDescriptor {
                    name: "stamped",
                    rename: Some("ts"),
                    transient: false,
                    ignore: false,
                    readonly: true,
                    kind: ValueKind::Long,
                    get: |any| {
                        any.downcast_ref::<Plain>().expect("record type mismatch").stamped.into_value()
                    },
                    set: |any, value| {
                        any.downcast_mut::<Plain>().expect("record type mismatch").stamped =
                            i64::from_value(value)?;
                        Ok(())
                    },
                },
            ],
        })
    }

    #[test]
    fn inclusion_rules_apply() {
        let resolved = resolve(&plain_descriptor());
        assert_eq!(resolved.name, "introspect.Plain");
        let names: Vec<_> = resolved.slots.iter().map(|s| s.wire_name).collect();
        // transient slots are dropped, renames take effect
        assert_eq!(names, vec!["kept", "ts"]);
        assert!(resolved.slot("ts").unwrap().readonly);
        assert!(resolved.slot("hidden").is_none());
    }

    #[test]
    fn accessors_work_through_any() {
        let resolved = resolve(&plain_descriptor());
        let mut record = Plain::default();
        let slot = resolved.slot("kept").unwrap();
        (slot.set)(&mut record as &mut dyn Any, Value::Int(11)).unwrap();
        assert_eq!(record.kept, 11);
        assert_eq!((slot.get)(&record as &dyn Any), Value::Int(11));
        assert!((slot.set)(&mut record as &mut dyn Any, Value::string("no")).is_err());
    }

    #[test]
    fn cache_returns_one_resolution() {
        let raw = plain_descriptor();
        let first = introspect(&raw);
        let second = introspect(&raw);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn constructorless_registration_is_looked_up() {
        register_with("introspect.Opaque", plain_descriptor, None);
        let (descriptor, construct) = lookup_record("introspect.Opaque").unwrap();
        assert_eq!(descriptor.slots.len(), 2);
        assert!(construct.is_none());
        assert!(lookup_record("introspect.Unknown").is_none());
    }
}
