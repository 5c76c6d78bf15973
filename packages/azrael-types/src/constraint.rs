//! Constraint records (spec.md §3, §4.3).

use serde::{Deserialize, Serialize};

use crate::id::ObjectId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConstraintType {
    P2P,
    #[serde(rename = "6DofSpring2")]
    SixDofSpring2,
}

/// A physical link between two bodies.
///
/// `rb_a`/`rb_b` are normalized so `rb_a <= rb_b` at construction
/// (spec.md §3): the pair is unordered from the caller's point of
/// view but the index and de-duplication logic in Igor only ever see
/// the canonical order. `Deserialize` is hand-written (below) so that
/// invariant holds for constraints arriving over the wire too, not
/// only for ones built through `ConstraintMeta::new` in Rust code.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConstraintMeta {
    pub aid: String,
    #[serde(rename = "conType")]
    pub con_type: ConstraintType,
    pub rb_a: ObjectId,
    pub rb_b: ObjectId,
    #[serde(default)]
    pub condata: serde_json::Value,
}

impl<'de> serde::Deserialize<'de> for ConstraintMeta {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            aid: String,
            #[serde(rename = "conType")]
            con_type: ConstraintType,
            rb_a: ObjectId,
            rb_b: ObjectId,
            #[serde(default)]
            condata: serde_json::Value,
        }
        let raw = Raw::deserialize(deserializer)?;
        Ok(ConstraintMeta::new(raw.aid, raw.con_type, raw.rb_a, raw.rb_b, raw.condata))
    }
}

impl ConstraintMeta {
    /// Builds a constraint, normalizing `rb_a <= rb_b`.
    pub fn new(
        aid: String,
        con_type: ConstraintType,
        rb_a: ObjectId,
        rb_b: ObjectId,
        condata: serde_json::Value,
    ) -> Self {
        let (rb_a, rb_b) = if rb_a <= rb_b {
            (rb_a, rb_b)
        } else {
            (rb_b, rb_a)
        };
        ConstraintMeta {
            aid,
            con_type,
            rb_a,
            rb_b,
            condata,
        }
    }

    /// The de-duplication key of spec.md §4.3: `(conType, rb_a, rb_b, aid)`.
    pub fn dedup_key(&self) -> (ConstraintType, ObjectId, ObjectId, &str) {
        (self.con_type, self.rb_a, self.rb_b, self.aid.as_str())
    }

    pub fn touches(&self, body: ObjectId) -> bool {
        self.rb_a == body || self.rb_b == body
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_normalizes_body_order() {
        let c = ConstraintMeta::new(
            "c1".into(),
            ConstraintType::P2P,
            ObjectId::new(5),
            ObjectId::new(2),
            serde_json::json!({}),
        );
        assert_eq!(c.rb_a, ObjectId::new(2));
        assert_eq!(c.rb_b, ObjectId::new(5));
    }

    #[test]
    fn deserialize_normalizes_body_order() {
        let json = serde_json::json!({
            "aid": "c1",
            "conType": "P2P",
            "rb_a": 5,
            "rb_b": 2,
            "condata": {},
        });
        let c: ConstraintMeta = serde_json::from_value(json).unwrap();
        assert_eq!(c.rb_a, ObjectId::new(2));
        assert_eq!(c.rb_b, ObjectId::new(5));
    }
}
