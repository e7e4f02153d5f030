//! Coordinate (de)serialization helpers.
//!
//! Geometry is written the way draw.io writes it: whole numbers without a
//! trailing `.0`, and never NaN or infinity.

use serde::{Deserialize, Deserializer, Serializer};

fn finite<E>(v: f64, err: impl FnOnce(String) -> E) -> Result<f64, E> {
    if v.is_finite() {
        // Collapses -0.0.
        Ok(v + 0.0)
    } else {
        Err(err(format!("coordinate must be finite, got {v}")))
    }
}

pub fn ser_f64_compact<S: Serializer>(v: &f64, s: S) -> Result<S::Ok, S::Error> {
    let v = finite(*v, <S::Error as serde::ser::Error>::custom)?;
    let whole = v.trunc() == v && v.abs() < 9.0e15;
    if whole {
        s.serialize_i64(v as i64)
    } else {
        s.serialize_f64(v)
    }
}

pub fn ser_opt_f64_compact<S: Serializer>(v: &Option<f64>, s: S) -> Result<S::Ok, S::Error> {
    match v {
        Some(v) => ser_f64_compact(v, s),
        None => s.serialize_none(),
    }
}

pub fn de_f64<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    finite(f64::deserialize(d)?, <D::Error as serde::de::Error>::custom)
}

pub fn de_opt_f64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    Option::<f64>::deserialize(d)?
        .map(|v| finite(v, <D::Error as serde::de::Error>::custom))
        .transpose()
}
