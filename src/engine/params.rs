//! Parameter payload and the sequential binder
//!
//! A configured method call carries its arguments flattened into five
//! kind buckets, each a flat value array plus a parallel per-slot count
//! array (variable-length array parameters own more than one value).
//! The buckets are only touched through the builder and the cursor-based
//! reader here, so the parallel arrays cannot drift apart.

use crate::engine::method::Signature;
use crate::object::{ObjectRef, PingRef};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Parameter name that is injected from evaluation context rather than
/// bound from the payload. Matched case-insensitively.
pub const PING_OBJECTS_PARAM: &str = "pingobjects";

/// The five primitive kinds a payload bucket can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    Int,
    Float,
    Bool,
    Str,
    ObjectRef,
}

/// A named method invocation: function name plus flattened payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MethodCall {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub params: ParamBag,
}

impl MethodCall {
    pub fn new(name: impl Into<String>, params: ParamBag) -> Self {
        Self {
            name: name.into(),
            params,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
    }
}

/// Flattened, kind-bucketed parameter payload.
///
/// Invariant per bucket: the counts sum to the value array's length.
/// The fields stay private; rule files deserialize through serde and
/// code builds bags through the `with_*` methods.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParamBag {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    int_counts: Vec<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    ints: Vec<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    float_counts: Vec<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    floats: Vec<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    bool_counts: Vec<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    bools: Vec<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    string_counts: Vec<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    strings: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    object_counts: Vec<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    objects: Vec<ObjectRef>,
}

impl ParamBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_int(mut self, value: i64) -> Self {
        self.int_counts.push(1);
        self.ints.push(value);
        self
    }

    pub fn with_int_array(mut self, values: Vec<i64>) -> Self {
        self.int_counts.push(values.len() as u32);
        self.ints.extend(values);
        self
    }

    pub fn with_float(mut self, value: f64) -> Self {
        self.float_counts.push(1);
        self.floats.push(value);
        self
    }

    pub fn with_float_array(mut self, values: Vec<f64>) -> Self {
        self.float_counts.push(values.len() as u32);
        self.floats.extend(values);
        self
    }

    pub fn with_bool(mut self, value: bool) -> Self {
        self.bool_counts.push(1);
        self.bools.push(value);
        self
    }

    pub fn with_bool_array(mut self, values: Vec<bool>) -> Self {
        self.bool_counts.push(values.len() as u32);
        self.bools.extend(values);
        self
    }

    pub fn with_string(mut self, value: impl Into<String>) -> Self {
        self.string_counts.push(1);
        self.strings.push(value.into());
        self
    }

    pub fn with_string_array(mut self, values: Vec<String>) -> Self {
        self.string_counts.push(values.len() as u32);
        self.strings.extend(values);
        self
    }

    pub fn with_object(mut self, value: ObjectRef) -> Self {
        self.object_counts.push(1);
        self.objects.push(value);
        self
    }

    pub fn with_object_array(mut self, values: Vec<ObjectRef>) -> Self {
        self.object_counts.push(values.len() as u32);
        self.objects.extend(values);
        self
    }

    /// Verify the counts/values invariant for every bucket.
    pub fn check_invariant(&self) -> Result<(), BindError> {
        fn check<T>(kind: ParamKind, counts: &[u32], values: &[T]) -> Result<(), BindError> {
            let total: usize = counts.iter().map(|c| *c as usize).sum();
            if total != values.len() {
                return Err(BindError::CorruptBucket(kind));
            }
            Ok(())
        }
        check(ParamKind::Int, &self.int_counts, &self.ints)?;
        check(ParamKind::Float, &self.float_counts, &self.floats)?;
        check(ParamKind::Bool, &self.bool_counts, &self.bools)?;
        check(ParamKind::Str, &self.string_counts, &self.strings)?;
        check(ParamKind::ObjectRef, &self.object_counts, &self.objects)?;
        Ok(())
    }

    pub fn reader(&self) -> BagReader<'_> {
        BagReader::new(self)
    }
}

/// One bound argument, in signature order.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Int(i64),
    IntArray(Vec<i64>),
    Float(f64),
    FloatArray(Vec<f64>),
    Bool(bool),
    BoolArray(Vec<bool>),
    Str(String),
    StrArray(Vec<String>),
    Object(Option<ObjectRef>),
    ObjectArray(Vec<ObjectRef>),
    /// Injected ping-reference list for a `pingobjects` parameter.
    Pings(Vec<PingRef>),
}

impl Arg {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Arg::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Arg::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Arg::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Arg::Str(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str_array(&self) -> Option<&[String]> {
        match self {
            Arg::StrArray(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_int_array(&self) -> Option<&[i64]> {
        match self {
            Arg::IntArray(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Arg::Object(v) => v.as_ref(),
            _ => None,
        }
    }

    pub fn as_pings(&self) -> Option<&[PingRef]> {
        match self {
            Arg::Pings(v) => Some(v),
            _ => None,
        }
    }
}

/// Binding failure. Upstream, every variant degrades to an Ignored
/// verdict; none of them is surfaced as a user error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindError {
    #[error("payload exhausted in the {0:?} bucket")]
    Exhausted(ParamKind),
    #[error("counts do not cover the {0:?} bucket values")]
    CorruptBucket(ParamKind),
    #[error("value '{value}' rejected by validator for parameter '{name}'")]
    Rejected { name: String, value: String },
}

#[derive(Default)]
struct Cursor {
    slot: usize,
    value: usize,
}

/// Stateful sequential reader over a bag's buckets.
///
/// Each bucket keeps an independent slot cursor and value cursor; the
/// payload ordering must mirror the signature's parameter ordering
/// within each kind bucket. A scalar slot yields its first value and
/// still advances the value cursor by the full declared count.
pub struct BagReader<'a> {
    bag: &'a ParamBag,
    int: Cursor,
    float: Cursor,
    bool_: Cursor,
    string: Cursor,
    object: Cursor,
}

impl<'a> BagReader<'a> {
    fn new(bag: &'a ParamBag) -> Self {
        Self {
            bag,
            int: Cursor::default(),
            float: Cursor::default(),
            bool_: Cursor::default(),
            string: Cursor::default(),
            object: Cursor::default(),
        }
    }

    fn take<'b, T>(
        kind: ParamKind,
        counts: &[u32],
        values: &'b [T],
        cursor: &mut Cursor,
    ) -> Result<&'b [T], BindError> {
        let count = *counts.get(cursor.slot).ok_or(BindError::Exhausted(kind))? as usize;
        let start = cursor.value;
        let end = start + count;
        if end > values.len() {
            return Err(BindError::Exhausted(kind));
        }
        cursor.slot += 1;
        cursor.value = end;
        Ok(&values[start..end])
    }

    /// Consume the next slot of `kind`, producing a scalar or array arg.
    pub fn next(&mut self, kind: ParamKind, is_array: bool) -> Result<Arg, BindError> {
        match kind {
            ParamKind::Int => {
                let vals = Self::take(kind, &self.bag.int_counts, &self.bag.ints, &mut self.int)?;
                if is_array {
                    Ok(Arg::IntArray(vals.to_vec()))
                } else {
                    let first = *vals.first().ok_or(BindError::Exhausted(kind))?;
                    Ok(Arg::Int(first))
                }
            }
            ParamKind::Float => {
                let vals =
                    Self::take(kind, &self.bag.float_counts, &self.bag.floats, &mut self.float)?;
                if is_array {
                    Ok(Arg::FloatArray(vals.to_vec()))
                } else {
                    let first = *vals.first().ok_or(BindError::Exhausted(kind))?;
                    Ok(Arg::Float(first))
                }
            }
            ParamKind::Bool => {
                let vals =
                    Self::take(kind, &self.bag.bool_counts, &self.bag.bools, &mut self.bool_)?;
                if is_array {
                    Ok(Arg::BoolArray(vals.to_vec()))
                } else {
                    let first = *vals.first().ok_or(BindError::Exhausted(kind))?;
                    Ok(Arg::Bool(first))
                }
            }
            ParamKind::Str => {
                let vals = Self::take(
                    kind,
                    &self.bag.string_counts,
                    &self.bag.strings,
                    &mut self.string,
                )?;
                if is_array {
                    Ok(Arg::StrArray(vals.to_vec()))
                } else {
                    let first = vals.first().ok_or(BindError::Exhausted(kind))?;
                    Ok(Arg::Str(first.clone()))
                }
            }
            ParamKind::ObjectRef => {
                let vals = Self::take(
                    kind,
                    &self.bag.object_counts,
                    &self.bag.objects,
                    &mut self.object,
                )?;
                if is_array {
                    Ok(Arg::ObjectArray(vals.to_vec()))
                } else {
                    let first = vals.first().ok_or(BindError::Exhausted(kind))?;
                    if first.is_none() {
                        Ok(Arg::Object(None))
                    } else {
                        Ok(Arg::Object(Some(first.clone())))
                    }
                }
            }
        }
    }
}

/// Bind a payload onto a signature's declared parameters.
///
/// The subject parameter is not part of the payload and is bound by the
/// caller. A parameter named `pingobjects` receives `pings` instead of
/// consuming payload slots.
pub fn bind(bag: &ParamBag, signature: &Signature, pings: &[PingRef]) -> Result<Vec<Arg>, BindError> {
    bag.check_invariant()?;
    let mut reader = bag.reader();
    let mut args = Vec::with_capacity(signature.params.len());
    for spec in &signature.params {
        if spec.name.eq_ignore_ascii_case(PING_OBJECTS_PARAM) {
            args.push(Arg::Pings(pings.to_vec()));
            continue;
        }
        let arg = reader.next(spec.kind, spec.is_array)?;
        if let Some(validator) = spec.validator {
            match &arg {
                Arg::Str(s) => {
                    if !validator(s) {
                        return Err(BindError::Rejected {
                            name: spec.name.clone(),
                            value: s.clone(),
                        });
                    }
                }
                Arg::StrArray(values) => {
                    for s in values {
                        if !validator(s) {
                            return Err(BindError::Rejected {
                                name: spec.name.clone(),
                                value: s.clone(),
                            });
                        }
                    }
                }
                _ => {}
            }
        }
        args.push(arg);
    }
    Ok(args)
}
