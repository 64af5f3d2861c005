//! The `list` type: a locked, growable sequence of values.
//!
//! A [`List`] is a shared handle to a [`Monitor`] around a [`GrowableArray`].
//! Mutations take the lock for the raw buffer change only. Anything that
//! compares elements (`index`, `remove`, `count`, `in`, `==`, `sort`) reads
//! under the lock, releases it, and then calls into the runtime, so user
//! `__eq__`/`__lt__` code may freely touch the same list.
//!
//! Iteration is per-step: [`ListIter`] locks once per element. A concurrent
//! structural change during iteration may skip or repeat elements but never
//! reads out of bounds.

use std::{mem, sync::Arc};

use crate::{
    args::{ArgValues, optional_index},
    dispatch::{BinaryOp, Builtin, BuiltinFn, CompareOp, Operation, builtins::unhashable},
    exception::{ExcType, RunError, RunResult},
    resource::{DataDepthGuard, ReprGuard},
    runtime::Runtime,
    sync::{Monitor, ObjectId, OrderedLocker},
    types::{
        Type,
        growable::GrowableArray,
        slice::{Slice, adjust_range, clamp_insert_index, normalize_index},
    },
    value::Value,
};

/// Buffer plus a mutation counter.
///
/// The counter advances on every change made through [`ListState::items_mut`];
/// `sort` and key extraction compare it before and after calling out.
#[derive(Debug, Default)]
struct ListState {
    items: GrowableArray<Value>,
    version: u64,
}

impl ListState {
    fn items_mut(&mut self) -> &mut GrowableArray<Value> {
        self.version = self.version.wrapping_add(1);
        &mut self.items
    }
}

/// Python `list`.
///
/// Cloning the handle shares the list, as binding a second name does in Python.
#[derive(Debug, Clone, Default)]
pub struct List(Arc<Monitor<ListState>>);

impl List {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_vec(items: Vec<Value>) -> Self {
        Self::from_array(GrowableArray::from_vec(items))
    }

    fn from_array(items: GrowableArray<Value>) -> Self {
        Self(Arc::new(Monitor::new(ListState { items, version: 0 })))
    }

    /// Builds a list from any iterable value.
    pub fn from_iterable(rt: &Runtime, iterable: &Value) -> RunResult<Self> {
        Ok(Self::from_vec(rt.collect(iterable)?))
    }

    pub(crate) fn addr(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }

    #[must_use]
    pub fn id(&self) -> ObjectId {
        self.0.id()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.read(|s| s.items.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.0.read(|s| s.items.capacity())
    }

    /// Number of buffer reallocations since creation.
    #[must_use]
    pub fn reallocations(&self) -> usize {
        self.0.read(|s| s.items.reallocations())
    }

    /// Copies the current contents out.
    #[must_use]
    pub fn to_vec(&self) -> Vec<Value> {
        self.0.read(|s| s.items.as_slice().to_vec())
    }

    fn version(&self) -> u64 {
        self.0.read(|s| s.version)
    }

    /// Element at position `index` if still in bounds, read under the lock.
    fn get_raw(&self, index: usize) -> Option<Value> {
        self.0.read(|s| s.items.get(index).cloned())
    }

    // ========================================================================
    // Indexing
    // ========================================================================

    /// `list[index]`
    pub fn get(&self, index: i64) -> RunResult<Value> {
        self.0.read(|s| {
            normalize_index(index, s.items.len())
                .and_then(|i| s.items.get(i).cloned())
                .ok_or_else(ExcType::list_index_error)
        })
    }

    /// `list[index] = value`
    pub fn set(&self, index: i64, value: Value) -> RunResult<()> {
        self.0.write(|s| {
            let i = normalize_index(index, s.items.len()).ok_or_else(ExcType::list_assignment_index_error)?;
            s.items_mut().set(i, value);
            Ok(())
        })
    }

    /// `del list[index]`
    pub fn delete(&self, index: i64) -> RunResult<()> {
        self.0.write(|s| {
            let i = normalize_index(index, s.items.len()).ok_or_else(ExcType::list_assignment_index_error)?;
            s.items_mut().remove_at(i);
            Ok(())
        })
    }

    /// `list[slice]`, always a fresh list.
    pub fn get_slice(&self, slice: &Slice) -> RunResult<Self> {
        self.0.read(|s| {
            let indices = slice.indices(s.items.len())?;
            Ok(Self::from_array(s.items.copy_slice(&indices)))
        })
    }

    /// `list[slice] = iterable`
    ///
    /// The iterable is drained before the lock is taken, so `a[:] = a` works.
    pub fn set_slice(&self, rt: &Runtime, slice: &Slice, iterable: &Value) -> RunResult<()> {
        let values = rt.collect(iterable)?;
        self.0.write(|s| {
            let indices = slice.indices(s.items.len())?;
            s.items_mut().assign_slice(&indices, values)
        })
    }

    /// `del list[slice]`
    pub fn delete_slice(&self, slice: &Slice) -> RunResult<()> {
        self.0.write(|s| {
            let indices = slice.indices(s.items.len())?;
            s.items_mut().delete_slice(&indices);
            Ok(())
        })
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    pub fn append(&self, value: Value) {
        self.0.write(|s| s.items_mut().append(value));
    }

    /// Inserts before `index`, clamping out-of-range positions to either end.
    pub fn insert(&self, index: i64, value: Value) {
        self.0.write(|s| {
            let at = clamp_insert_index(index, s.items.len());
            s.items_mut().insert(at, value);
        });
    }

    /// Appends every element of `iterable`.
    ///
    /// A list argument is snapshotted first, so `a.extend(a)` doubles `a`.
    pub fn extend(&self, rt: &Runtime, iterable: &Value) -> RunResult<()> {
        let values = rt.collect(iterable)?;
        self.0.write(|s| s.items_mut().extend(values));
        Ok(())
    }

    /// `list.pop([index])`
    pub fn pop(&self, index: Option<i64>) -> RunResult<Value> {
        self.0.write(|s| {
            let len = s.items.len();
            if len == 0 {
                return Err(ExcType::index_error_pop_empty_list());
            }
            let i = normalize_index(index.unwrap_or(-1), len).ok_or_else(ExcType::index_error_pop_out_of_range)?;
            s.items_mut().pop_at(i).ok_or_else(ExcType::index_error_pop_out_of_range)
        })
    }

    /// Removes the first element equal to `value`.
    ///
    /// The match is found with the lock released; if the slot changed before
    /// the lock was re-taken, the scan starts over.
    pub fn remove(&self, rt: &Runtime, value: &Value) -> RunResult<()> {
        loop {
            let Some((position, found)) = self.find(rt, value, 0, usize::MAX)? else {
                return Err(ExcType::value_error_remove_not_in_list());
            };
            let removed = self.0.write(|s| {
                let still_there = s.items.get(position).is_some_and(|current| current.is_same(&found));
                if still_there {
                    s.items_mut().remove_at(position);
                }
                still_there
            });
            if removed {
                return Ok(());
            }
        }
    }

    pub fn clear(&self) {
        self.0.write(|s| s.items_mut().clear());
    }

    pub fn reverse(&self) {
        self.0.write(|s| s.items_mut().reverse());
    }

    /// Shrinks the buffer to the current length.
    pub fn trim_excess(&self) {
        self.0.write(|s| s.items.trim_excess());
    }

    /// Shallow copy.
    #[must_use]
    pub fn copy(&self) -> Self {
        Self::from_vec(self.to_vec())
    }

    /// `list *= count`; a count of zero or less clears.
    pub fn repeat_in_place(&self, count: i64) -> RunResult<()> {
        self.0.write(|s| s.items_mut().repeat_in_place(count))
    }

    // ========================================================================
    // Searching
    // ========================================================================

    /// Scans `[start, stop)` for an element equal to `value`.
    ///
    /// The bound is re-clamped to the current length on every step, so a
    /// concurrent shrink ends the scan instead of reading past the end.
    fn find(&self, rt: &Runtime, value: &Value, start: usize, stop: usize) -> RunResult<Option<(usize, Value)>> {
        let snapshot_len = self.len();
        let mut i = start;
        while i < stop.min(snapshot_len) {
            let Some(item) = self.get_raw(i) else { break };
            if rt.equals(&item, value)? {
                return Ok(Some((i, item)));
            }
            i += 1;
        }
        Ok(None)
    }

    /// `list.index(value[, start[, stop]])`
    pub fn index(&self, rt: &Runtime, value: &Value, start: Option<i64>, stop: Option<i64>) -> RunResult<usize> {
        let (start, stop) = adjust_range(start, stop, self.len());
        self.find(rt, value, start, stop)?
            .map(|(i, _)| i)
            .ok_or_else(ExcType::value_error_not_in_list)
    }

    /// `list.count(value)`
    pub fn count(&self, rt: &Runtime, value: &Value) -> RunResult<usize> {
        let mut count = 0;
        for item in self.iter() {
            if rt.equals(&item?, value)? {
                count += 1;
            }
        }
        Ok(count)
    }

    /// `value in list`
    pub fn contains(&self, rt: &Runtime, value: &Value) -> RunResult<bool> {
        Ok(self.find(rt, value, 0, usize::MAX)?.is_some())
    }

    // ========================================================================
    // Sorting
    // ========================================================================

    /// Stable in-place sort, `list.sort(key=None, reverse=False)`.
    ///
    /// Keys are computed from a snapshot before sorting starts; a change to the
    /// list while they are computed raises `ValueError`. During the sort the
    /// list reads as empty, and any mutation made by a comparison callback
    /// aborts the sort with the original contents restored.
    pub fn sort(&self, rt: &Runtime, key: Option<&Value>, reverse: bool) -> RunResult<()> {
        let keyed = match key {
            Some(key_fn) => Some(self.compute_keys(rt, key_fn)?),
            None => None,
        };
        self.sort_keyed(rt, keyed, reverse)
    }

    /// Sorts by precomputed keys, which must still describe the current
    /// contents: the list version they were read at is checked under the lock.
    fn sort_keyed(&self, rt: &Runtime, keyed: Option<(Vec<Value>, u64)>, reverse: bool) -> RunResult<()> {
        let guard = self.0.enter();
        let keys = match keyed {
            Some((_, keyed_version)) if guard.get().version != keyed_version => {
                guard.release();
                return Err(ExcType::value_error_list_mutated_determining_keys());
            }
            Some((keys, _)) => Some(keys),
            None => None,
        };
        let original = guard.get_mut().items_mut().take();
        let sorting_version = guard.get().version;
        guard.release();

        let sort_keys = keys.as_deref().unwrap_or(original.as_slice());
        let order = linked_merge_sort(sort_keys, reverse, |a, b| {
            let less = rt.less_than(a, b)?;
            if self.version() == sorting_version {
                Ok(less)
            } else {
                Err(ExcType::value_error_list_mutated_during_sort())
            }
        });

        self.0.write(|s| {
            let mutated = s.version != sorting_version;
            let order = match order {
                Ok(_) if mutated => Err(ExcType::value_error_list_mutated_during_sort()),
                other => other,
            };
            match order {
                Ok(order) => {
                    let mut items = original.into_vec();
                    let sorted = order.iter().map(|&i| mem::replace(&mut items[i], Value::None)).collect();
                    s.items_mut().replace(GrowableArray::from_vec(sorted));
                    Ok(())
                }
                Err(err) => {
                    s.items_mut().replace(original);
                    Err(err)
                }
            }
        })
    }

    /// Applies `key_fn` to a snapshot of the elements, returning the keys and
    /// the version the snapshot was taken at.
    fn compute_keys(&self, rt: &Runtime, key_fn: &Value) -> RunResult<(Vec<Value>, u64)> {
        let (snapshot, version) = self.0.read(|s| (s.items.as_slice().to_vec(), s.version));
        let mut keys = Vec::with_capacity(snapshot.len());
        for item in snapshot {
            keys.push(rt.invoke(key_fn, &[item])?);
            if self.version() != version {
                return Err(ExcType::value_error_list_mutated_determining_keys());
            }
        }
        Ok((keys, version))
    }

    // ========================================================================
    // Operators
    // ========================================================================

    /// `self + other`, reading both under ordered locks.
    #[must_use]
    pub fn concat(&self, other: &Self) -> Self {
        let pair = OrderedLocker::new(&*self.0, &*other.0);
        let joined = GrowableArray::concat(pair.left().items.as_slice(), pair.right().items.as_slice());
        pair.release();
        Self::from_array(joined)
    }

    /// `self * count`
    pub fn repeat(&self, count: i64) -> RunResult<Self> {
        self.0.read(|s| s.items.repeated(count)).map(Self::from_array)
    }

    /// Snapshots both lists under ordered locks.
    fn snapshot_pair(&self, other: &Self) -> (Vec<Value>, Vec<Value>) {
        let pair = OrderedLocker::new(&*self.0, &*other.0);
        let snapshot = (pair.left().items.as_slice().to_vec(), pair.right().items.as_slice().to_vec());
        pair.release();
        snapshot
    }

    /// `self == other`: length check, then a full element-wise scan.
    pub fn equals(&self, rt: &Runtime, other: &Self) -> RunResult<bool> {
        if Arc::ptr_eq(&self.0, &other.0) {
            return Ok(true);
        }
        let (left, right) = self.snapshot_pair(other);
        if left.len() != right.len() {
            return Ok(false);
        }
        let _depth = DataDepthGuard::enter()?;
        for (a, b) in left.iter().zip(&right) {
            if !rt.equals(a, b)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Rich comparison decided by the first mismatching element, then by length.
    pub fn compare(&self, rt: &Runtime, op: CompareOp, other: &Self) -> RunResult<bool> {
        if matches!(op, CompareOp::Eq | CompareOp::Ne) {
            return Ok(self.equals(rt, other)? == (op == CompareOp::Eq));
        }
        let (left, right) = self.snapshot_pair(other);
        let _depth = DataDepthGuard::enter()?;
        for (a, b) in left.iter().zip(&right) {
            if !rt.equals(a, b)? {
                return rt.compare_bool(op, a, b);
            }
        }
        Ok(op.matches(left.len().cmp(&right.len())))
    }

    /// `repr(list)`; a list that contains itself prints as `[...]`.
    pub fn repr(&self, rt: &Runtime) -> RunResult<String> {
        let Some(_guard) = ReprGuard::enter(self.addr())? else {
            return Ok("[...]".to_owned());
        };
        let mut out = String::from("[");
        for (i, item) in self.to_vec().iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            out.push_str(&rt.repr(item)?);
        }
        out.push(']');
        Ok(out)
    }

    /// Forward iterator, locking once per element.
    #[must_use]
    pub fn iter(&self) -> ListIter {
        ListIter::new(self.clone())
    }

    /// `reversed(list)`
    #[must_use]
    pub fn reversed(&self) -> ListIter {
        ListIter::reversed(self.clone())
    }
}

/// Iterator over a list that re-reads the bounds on every step.
#[derive(Debug)]
pub struct ListIter {
    list: List,
    /// Next index going forward, or the count of unvisited elements going backward.
    cursor: usize,
    reversed: bool,
}

impl ListIter {
    #[must_use]
    pub fn new(list: List) -> Self {
        Self {
            list,
            cursor: 0,
            reversed: false,
        }
    }

    #[must_use]
    pub fn reversed(list: List) -> Self {
        let cursor = list.len();
        Self {
            list,
            cursor,
            reversed: true,
        }
    }
}

impl Iterator for ListIter {
    type Item = RunResult<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.list.0.read(|s| {
            if self.reversed {
                self.cursor = self.cursor.min(s.items.len()).checked_sub(1)?;
                s.items.get(self.cursor).cloned()
            } else {
                let item = s.items.get(self.cursor).cloned()?;
                self.cursor += 1;
                Some(item)
            }
        });
        if item.is_none() && self.reversed {
            self.cursor = 0;
        }
        item.map(Ok)
    }
}

/// End-of-run marker in the link array.
const END: usize = usize::MAX;

/// Stable natural merge sort over index links.
///
/// Returns the permutation that sorts `keys`: `result[k]` is the original
/// position of the `k`-th smallest key. Ascending runs are detected first and
/// chained through a link array; adjacent runs are then merged pairwise,
/// bottom-up, until one remains. `less` is the only comparison used, and an
/// error from it aborts the sort.
fn linked_merge_sort(
    keys: &[Value],
    reverse: bool,
    mut less: impl FnMut(&Value, &Value) -> RunResult<bool>,
) -> RunResult<Vec<usize>> {
    let n = keys.len();
    if n < 2 {
        return Ok((0..n).collect());
    }
    // `later` must move ahead of `earlier`.
    let mut inverted = |earlier: usize, later: usize| -> RunResult<bool> {
        if reverse {
            less(&keys[earlier], &keys[later])
        } else {
            less(&keys[later], &keys[earlier])
        }
    };

    let mut links = vec![END; n];
    let mut runs = Vec::new();
    let mut head = 0;
    for i in 1..n {
        if inverted(i - 1, i)? {
            runs.push(head);
            head = i;
        } else {
            links[i - 1] = i;
        }
    }
    runs.push(head);

    while runs.len() > 1 {
        let mut merged = Vec::with_capacity(runs.len().div_ceil(2));
        for pair in runs.chunks(2) {
            match *pair {
                [p, q] => merged.push(merge_runs(&mut links, p, q, &mut inverted)?),
                [p] => merged.push(p),
                _ => {}
            }
        }
        runs = merged;
    }

    let mut order = Vec::with_capacity(n);
    let mut cursor = runs.first().copied().unwrap_or(END);
    while cursor != END {
        order.push(cursor);
        cursor = links[cursor];
    }
    Ok(order)
}

/// Merges run `q` into run `p`, where every element of `p` precedes `q` originally.
fn merge_runs(
    links: &mut [usize],
    mut p: usize,
    mut q: usize,
    inverted: &mut impl FnMut(usize, usize) -> RunResult<bool>,
) -> RunResult<usize> {
    let mut head = END;
    let mut tail = END;
    while p != END && q != END {
        let taken = if inverted(p, q)? {
            let taken = q;
            q = links[q];
            taken
        } else {
            let taken = p;
            p = links[p];
            taken
        };
        if tail == END {
            head = taken;
        } else {
            links[tail] = taken;
        }
        tail = taken;
    }
    let rest = if p == END { q } else { p };
    if tail == END {
        head = rest;
    } else {
        links[tail] = rest;
    }
    Ok(head)
}

// ============================================================================
// Dispatch glue
// ============================================================================

fn receiver(args: &[Value]) -> RunResult<(&List, ArgValues<'_>)> {
    match ArgValues::split(args)? {
        (Value::List(list), rest) => Ok((list, rest)),
        (other, _) => Err(RunError::internal(format!("list slot called on {}", other.py_type()))),
    }
}

/// Built-in slot table for `list`.
pub(crate) fn slot(op: &Operation) -> Option<Builtin> {
    let func: BuiltinFn = match op {
        Operation::GetItem => getitem,
        Operation::SetItem => setitem,
        Operation::DelItem => delitem,
        Operation::Len => len,
        Operation::Contains => contains,
        Operation::Hash => unhashable,
        Operation::Repr => repr,
        Operation::Compare(cmp) => return Some(Builtin::Compare(compare, *cmp)),
        Operation::Binary(BinaryOp::Add) => add,
        Operation::Binary(BinaryOp::Mul) | Operation::ReflectedBinary(BinaryOp::Mul) => mul,
        Operation::InPlace(BinaryOp::Add) => iadd,
        Operation::InPlace(BinaryOp::Mul) => imul,
        Operation::InvokeMember(name) => method(name)?,
        _ => return None,
    };
    Some(Builtin::Fn(func))
}

fn method(name: &str) -> Option<BuiltinFn> {
    Some(match name {
        "append" => append,
        "extend" => extend,
        "insert" => insert,
        "pop" => pop,
        "remove" => remove,
        "index" => index,
        "count" => count,
        "clear" => clear,
        "copy" => copy,
        "reverse" => reverse,
        "sort" => sort,
        "__getitem__" => getitem,
        "__setitem__" => setitem,
        "__delitem__" => delitem,
        "__len__" => len,
        "__contains__" => contains,
        "__repr__" => repr,
        _ => return None,
    })
}

fn getitem(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (list, args) = receiver(args)?;
    match args.get_one_arg("__getitem__")? {
        Value::Slice(slice) => Ok(Value::List(list.get_slice(slice)?)),
        Value::Int(_) | Value::Bool(_) => list.get(args.as_slice()[0].as_index()?),
        other => Err(ExcType::type_error_indices(Type::List, other.py_type())),
    }
}

fn setitem(rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (list, args) = receiver(args)?;
    let (key, value) = args.get_two_args("__setitem__")?;
    match key {
        Value::Slice(slice) => list.set_slice(rt, slice, value)?,
        Value::Int(_) | Value::Bool(_) => list.set(key.as_index()?, value.clone())?,
        other => return Err(ExcType::type_error_indices(Type::List, other.py_type())),
    }
    Ok(Value::None)
}

fn delitem(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (list, args) = receiver(args)?;
    match args.get_one_arg("__delitem__")? {
        Value::Slice(slice) => list.delete_slice(slice)?,
        key @ (Value::Int(_) | Value::Bool(_)) => list.delete(key.as_index()?)?,
        other => return Err(ExcType::type_error_indices(Type::List, other.py_type())),
    }
    Ok(Value::None)
}

fn len(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (list, args) = receiver(args)?;
    args.check_zero_args("__len__")?;
    Ok(Value::from_usize(list.len()))
}

fn contains(rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (list, args) = receiver(args)?;
    list.contains(rt, args.get_one_arg("__contains__")?).map(Value::Bool)
}

fn repr(rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (list, _) = receiver(args)?;
    Ok(Value::str(&list.repr(rt)?))
}

/// All six comparisons; unrelated right operands get `NotImplemented`.
fn compare(rt: &Runtime, op: CompareOp, args: &[Value]) -> RunResult<Value> {
    let (list, args) = receiver(args)?;
    let name: &'static str = op.into();
    match args.get_one_arg(name)? {
        Value::List(other) => list.compare(rt, op, other).map(Value::Bool),
        _ => Ok(Value::NotImplemented),
    }
}

fn add(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (list, args) = receiver(args)?;
    match args.get_one_arg("__add__")? {
        Value::List(other) => Ok(Value::List(list.concat(other))),
        _ => Ok(Value::NotImplemented),
    }
}

fn mul(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (list, args) = receiver(args)?;
    match args.get_one_arg("__mul__")?.as_int() {
        Some(count) => list.repeat(count).map(Value::List),
        None => Ok(Value::NotImplemented),
    }
}

fn iadd(rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (list, rest) = receiver(args)?;
    list.extend(rt, rest.get_one_arg("__iadd__")?)?;
    Ok(args[0].clone())
}

fn imul(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (list, rest) = receiver(args)?;
    match rest.get_one_arg("__imul__")?.as_int() {
        Some(count) => {
            list.repeat_in_place(count)?;
            Ok(args[0].clone())
        }
        None => Ok(Value::NotImplemented),
    }
}

fn append(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (list, args) = receiver(args)?;
    list.append(args.get_one_arg("append")?.clone());
    Ok(Value::None)
}

fn extend(rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (list, args) = receiver(args)?;
    list.extend(rt, args.get_one_arg("extend")?)?;
    Ok(Value::None)
}

fn insert(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (list, args) = receiver(args)?;
    let (index, value) = args.get_two_args("insert")?;
    list.insert(index.as_index()?, value.clone());
    Ok(Value::None)
}

fn pop(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (list, args) = receiver(args)?;
    let index = optional_index(args.get_zero_one_arg("pop")?)?;
    list.pop(index)
}

fn remove(rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (list, args) = receiver(args)?;
    list.remove(rt, args.get_one_arg("remove")?)?;
    Ok(Value::None)
}

fn index(rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (list, args) = receiver(args)?;
    let (value, start, stop) = args.get_one_to_three_args("index")?;
    let position = list.index(rt, value, optional_index(start)?, optional_index(stop)?)?;
    Ok(Value::from_usize(position))
}

fn count(rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (list, args) = receiver(args)?;
    list.count(rt, args.get_one_arg("count")?).map(Value::from_usize)
}

fn clear(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (list, args) = receiver(args)?;
    args.check_zero_args("clear")?;
    list.clear();
    Ok(Value::None)
}

fn copy(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (list, args) = receiver(args)?;
    args.check_zero_args("copy")?;
    Ok(Value::List(list.copy()))
}

fn reverse(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (list, args) = receiver(args)?;
    args.check_zero_args("reverse")?;
    list.reverse();
    Ok(Value::None)
}

/// `sort([key[, reverse]])`; `key` may be `None`.
fn sort(rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (list, args) = receiver(args)?;
    let (key, reverse) = args.get_zero_one_two_args("sort")?;
    let key = key.filter(|k| !matches!(k, Value::None));
    let reverse = match reverse {
        Some(flag) => rt.truthy(flag)?,
        None => false,
    };
    list.sort(rt, key, reverse)?;
    Ok(Value::None)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn ints(values: &[i64]) -> Vec<Value> {
        values.iter().copied().map(Value::Int).collect()
    }

    fn plain_less(a: &Value, b: &Value) -> RunResult<bool> {
        Ok(a.as_int() < b.as_int())
    }

    #[test]
    fn merge_sort_orders_runs() {
        let keys = ints(&[5, 3, 1, 4, 1, 5, 9, 2, 6]);
        let order = linked_merge_sort(&keys, false, plain_less).unwrap();
        let sorted: Vec<i64> = order.iter().map(|&i| keys[i].as_int().unwrap()).collect();
        assert_eq!(sorted, vec![1, 1, 2, 3, 4, 5, 5, 6, 9]);
    }

    #[test]
    fn merge_sort_is_stable_both_directions() {
        let keys = ints(&[2, 1, 2, 1, 2]);
        assert_eq!(linked_merge_sort(&keys, false, plain_less).unwrap(), vec![1, 3, 0, 2, 4]);
        assert_eq!(linked_merge_sort(&keys, true, plain_less).unwrap(), vec![0, 2, 4, 1, 3]);
    }

    #[test]
    fn merge_sort_propagates_comparison_errors() {
        let keys = ints(&[3, 2, 1]);
        let err = linked_merge_sort(&keys, false, |_, _| Err(ExcType::type_error("boom"))).unwrap_err();
        assert_eq!(err.message(), Some("boom"));
    }

    #[test]
    fn reversed_iteration_tracks_shrinking() {
        let list = List::from_vec(ints(&[1, 2, 3, 4]));
        let mut it = list.reversed();
        assert_eq!(it.next().unwrap().unwrap().as_int(), Some(4));
        list.delete_slice(&Slice::range(1, 4)).unwrap();
        assert_eq!(it.next().unwrap().unwrap().as_int(), Some(1));
        assert!(it.next().is_none());
    }

    /// An assignment that lands between key extraction and the sort keeps the
    /// length but still invalidates the keys.
    #[test]
    fn keys_from_an_older_version_are_rejected() {
        let rt = Runtime::new();
        let list = List::from_vec(ints(&[3, 1, 2]));
        let negate = Value::Native(crate::value::NativeFunction::new("negate", |_rt, args| {
            Ok(Value::Int(-args[0].as_int().unwrap_or_default()))
        }));
        let keyed = list.compute_keys(&rt, &negate).unwrap();
        list.set(0, Value::Int(7)).unwrap();

        let err = list.sort_keyed(&rt, Some(keyed), false).unwrap_err();
        assert_eq!(err.message(), Some("list mutated while determining keys"));
        let contents: Vec<_> = list.to_vec().iter().map(|v| v.as_int().unwrap()).collect();
        assert_eq!(contents, vec![7, 1, 2]);

        list.sort(&rt, Some(&negate), false).unwrap();
        let contents: Vec<_> = list.to_vec().iter().map(|v| v.as_int().unwrap()).collect();
        assert_eq!(contents, vec![7, 2, 1]);
    }
}
