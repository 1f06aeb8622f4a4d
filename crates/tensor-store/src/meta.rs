//! `TensorMeta`: the declared shape and optimizer wiring for one tensor
//! partition, and its JSON checkpoint schema.
//!
//! Dense and sparse tensors share a schema; `kind` picks the interpretation
//! of `data_shape`/`state_shape` (whole-tensor shape for dense, per-key slice
//! shape for sparse). `initializer`/`updater` are opaque base64 blobs: the
//! optimizer they describe lives entirely on the host side of the trait
//! objects in [`crate::optimizer`].

use mlps_core::DataType;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TensorKind {
    Dense,
    Sparse,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TensorMeta {
    pub name: String,
    pub kind: TensorKind,
    #[serde(serialize_with = "serialize_data_type", deserialize_with = "deserialize_data_type")]
    pub data_type: DataType,
    /// Whole-tensor shape (dense) or per-key slice shape (sparse).
    pub data_shape: Vec<u64>,
    /// Whole-tensor optimizer state shape (dense) or per-key slice shape (sparse).
    pub state_shape: Vec<u64>,
    #[serde(with = "base64_blob")]
    pub initializer: Vec<u8>,
    #[serde(with = "base64_blob")]
    pub updater: Vec<u8>,
    pub partition_count: u32,
}

impl TensorMeta {
    /// Element count of one key's data region (sparse) or the whole buffer
    /// (dense); an empty shape means a scalar.
    pub fn data_elements(&self) -> u64 {
        shape_elements(&self.data_shape)
    }

    pub fn state_elements(&self) -> u64 {
        shape_elements(&self.state_shape)
    }

    pub fn data_bytes(&self) -> u64 {
        self.data_elements() * self.data_type.size_of() as u64
    }

    pub fn state_bytes(&self) -> u64 {
        self.state_elements() * self.data_type.size_of() as u64
    }

    /// Bytes per key in the backing `ArrayHashMap<u64, u8>`: `[data | state]`.
    pub fn value_width_bytes(&self) -> u64 {
        self.data_bytes() + self.state_bytes()
    }
}

fn shape_elements(shape: &[u64]) -> u64 {
    if shape.is_empty() {
        1
    } else {
        shape.iter().product()
    }
}

fn serialize_data_type<S>(dt: &DataType, s: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    s.serialize_u64(dt.code())
}

fn deserialize_data_type<'de, D>(d: D) -> Result<DataType, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let code = u64::deserialize(d)?;
    DataType::from_code(code).ok_or_else(|| serde::de::Error::custom(format!("unknown data type code {code}")))
}

mod base64_blob {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(d)?;
        STANDARD.decode(encoded.as_bytes()).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TensorMeta {
        TensorMeta {
            name: "embedding".into(),
            kind: TensorKind::Sparse,
            data_type: DataType::Float32,
            data_shape: vec![8],
            state_shape: vec![8],
            initializer: vec![1, 2, 3],
            updater: vec![4, 5],
            partition_count: 4,
        }
    }

    #[test]
    fn json_round_trips_and_base64_encodes_blobs() {
        let meta = sample();
        let json = serde_json::to_string(&meta).unwrap();
        assert!(json.contains("\"initializer\":\"AQID\""));
        let back: TensorMeta = serde_json::from_str(&json).unwrap();
        assert_eq!(back.name, meta.name);
        assert_eq!(back.data_type, meta.data_type);
        assert_eq!(back.initializer, meta.initializer);
    }

    #[test]
    fn value_width_accounts_for_data_and_state() {
        let meta = sample();
        assert_eq!(meta.data_bytes(), 32);
        assert_eq!(meta.state_bytes(), 32);
        assert_eq!(meta.value_width_bytes(), 64);
    }

    #[test]
    fn scalar_shape_is_one_element() {
        let mut meta = sample();
        meta.data_shape = vec![];
        meta.state_shape = vec![];
        assert_eq!(meta.value_width_bytes(), 8);
    }
}
