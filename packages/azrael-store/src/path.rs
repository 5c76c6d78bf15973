//! Dotted field paths into a JSON document (spec.md §7, `mod`).

use serde_json::Value;

use crate::error::StoreError;

/// A field path such as `rbs.position.x`, pre-split and validated.
///
/// No segment may contain `'.'` — that is the path separator itself,
/// so a segment containing one could never be addressed unambiguously.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath(Vec<String>);

impl FieldPath {
    pub fn parse(raw: &str) -> Result<Self, StoreError> {
        let segments: Vec<String> = raw.split('.').map(str::to_string).collect();
        for seg in &segments {
            if seg.is_empty() {
                return Err(StoreError::InvalidFieldPath(raw.to_string()));
            }
        }
        Ok(FieldPath(segments))
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Reads the value at this path, if present.
    pub fn get<'a>(&self, doc: &'a Value) -> Option<&'a Value> {
        let mut cur = doc;
        for seg in &self.0 {
            cur = cur.as_object()?.get(seg)?;
        }
        Some(cur)
    }

    pub fn exists(&self, doc: &Value) -> bool {
        self.get(doc).is_some()
    }

    /// Writes `value` at this path, creating intermediate objects as needed.
    pub fn set(&self, doc: &mut Value, value: Value) {
        let mut cur = doc;
        for seg in &self.0[..self.0.len() - 1] {
            if !cur.is_object() {
                *cur = Value::Object(serde_json::Map::new());
            }
            cur = cur
                .as_object_mut()
                .expect("just normalized to object")
                .entry(seg.clone())
                .or_insert_with(|| Value::Object(serde_json::Map::new()));
        }
        if !cur.is_object() {
            *cur = Value::Object(serde_json::Map::new());
        }
        let last = self.0.last().expect("path has at least one segment");
        cur.as_object_mut()
            .expect("just normalized to object")
            .insert(last.clone(), value);
    }

    /// Removes the value at this path. No-op if absent.
    pub fn unset(&self, doc: &mut Value) {
        let Some((last, prefix)) = self.0.split_last() else {
            return;
        };
        let mut cur = doc;
        for seg in prefix {
            match cur.as_object_mut().and_then(|m| m.get_mut(seg)) {
                Some(next) => cur = next,
                None => return,
            }
        }
        if let Some(obj) = cur.as_object_mut() {
            obj.remove(last);
        }
    }

    /// Adds `delta` to the numeric value at this path.
    ///
    /// The field is created at `delta` if absent; an existing
    /// non-number value is an error rather than silently coerced.
    pub fn inc(&self, doc: &mut Value, delta: f64, aid: &str) -> Result<(), StoreError> {
        let current = match self.get(doc) {
            Some(v) if v.is_null() => 0.0,
            Some(v) => v.as_f64().ok_or_else(|| StoreError::FieldNotNumeric {
                aid: aid.to_string(),
                path: self.0.clone(),
            })?,
            None => 0.0,
        };
        let updated = current + delta;
        let number = serde_json::Number::from_f64(updated).ok_or_else(|| StoreError::FieldNotNumeric {
            aid: aid.to_string(),
            path: self.0.clone(),
        })?;
        self.set(doc, Value::Number(number));
        Ok(())
    }
}
