// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Interchange-format model description, deserialized from JSON.
//!
//! The structures mirror the ONNX protobuf messages field for field, so a
//! model exported with `onnx.helper`/`MessageToJson` style tooling maps onto
//! them directly. Only the fields the importer consumes are modelled.
//!
//! # Format
//! ```json
//! {
//!   "ir_version": 3,
//!   "producer_name": "CNTK",
//!   "opset_import": [{ "domain": "", "version": 7 }],
//!   "graph": {
//!     "name": "add_graph",
//!     "input": [
//!       { "name": "Input0", "elem_type": "FLOAT", "dims": [1, 1, 2, 2] },
//!       { "name": "Input1", "elem_type": 1, "dims": [1, 1, 2, 2] }
//!     ],
//!     "output": [{ "name": "Output", "elem_type": "FLOAT", "dims": [1, 1, 2, 2] }],
//!     "node": [
//!       { "name": "addition", "op_type": "Add",
//!         "input": ["Input0", "Input1"], "output": ["Output"] }
//!     ]
//!   }
//! }
//! ```

use crate::{Attributes, ModelError};
use std::path::Path;
use tensor_core::{DType, Shape, Tensor, TensorDesc};

/// Element type as either the format's numeric code or its name.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum ElemType {
    Code(i32),
    Name(String),
}

impl ElemType {
    /// Resolves to a [`DType`], or `None` for types with no counterpart.
    pub fn to_dtype(&self) -> Option<DType> {
        match self {
            ElemType::Code(code) => dtype_from_code(*code),
            ElemType::Name(name) => dtype_from_name(name),
        }
    }
}

impl From<DType> for ElemType {
    fn from(dtype: DType) -> Self {
        ElemType::Name(dtype_name(dtype).to_string())
    }
}

fn dtype_from_code(code: i32) -> Option<DType> {
    Some(match code {
        1 => DType::F32,
        2 => DType::U8,
        3 => DType::I8,
        5 => DType::I16,
        6 => DType::I32,
        7 => DType::I64,
        9 => DType::Bool,
        10 => DType::F16,
        11 => DType::F64,
        16 => DType::BF16,
        _ => return None,
    })
}

fn dtype_from_name(name: &str) -> Option<DType> {
    Some(match name {
        "FLOAT" => DType::F32,
        "UINT8" => DType::U8,
        "INT8" => DType::I8,
        "INT16" => DType::I16,
        "INT32" => DType::I32,
        "INT64" => DType::I64,
        "BOOL" => DType::Bool,
        "FLOAT16" => DType::F16,
        "DOUBLE" => DType::F64,
        "BFLOAT16" => DType::BF16,
        _ => return None,
    })
}

fn dtype_name(dtype: DType) -> &'static str {
    match dtype {
        DType::F32 => "FLOAT",
        DType::U8 => "UINT8",
        DType::I8 => "INT8",
        DType::I16 => "INT16",
        DType::I32 => "INT32",
        DType::I64 => "INT64",
        DType::Bool => "BOOL",
        DType::F16 => "FLOAT16",
        DType::F64 => "DOUBLE",
        DType::BF16 => "BFLOAT16",
    }
}

/// One dimension of a declared shape: a fixed extent or a symbolic name.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum Dim {
    Value(i64),
    Param(String),
}

fn static_shape(tensor: &str, dims: &[Dim]) -> Result<Shape, ModelError> {
    dims.iter()
        .map(|d| match d {
            Dim::Value(v) => usize::try_from(*v).map_err(|_| ModelError::InvalidTensor {
                name: tensor.to_string(),
                detail: format!("negative dimension {v}"),
            }),
            Dim::Param(p) => Err(ModelError::InvalidTensor {
                name: tensor.to_string(),
                detail: format!("symbolic dimension '{p}' is not supported"),
            }),
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Shape::new)
}

/// Builds a descriptor whose dense byte size fits a `usize`.
fn sized_desc(tensor: &str, dtype: DType, shape: Shape) -> Result<TensorDesc, ModelError> {
    let desc = TensorDesc::new(dtype, shape);
    match desc.checked_size_bytes() {
        Some(_) => Ok(desc),
        None => Err(ModelError::InvalidTensor {
            name: tensor.to_string(),
            detail: format!("{desc} is too large to address"),
        }),
    }
}

fn resolve_dtype(tensor: &str, elem_type: &ElemType) -> Result<DType, ModelError> {
    elem_type
        .to_dtype()
        .ok_or_else(|| ModelError::InvalidTensor {
            name: tensor.to_string(),
            detail: format!("unsupported element type {elem_type:?}"),
        })
}

/// Top-level model.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ModelProto {
    #[serde(default)]
    pub ir_version: i64,
    #[serde(default)]
    pub producer_name: String,
    #[serde(default)]
    pub producer_version: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub model_version: i64,
    #[serde(default)]
    pub opset_import: Vec<OperatorSetId>,
    pub graph: GraphProto,
}

/// An operator-set import, e.g. the default domain at version 7.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct OperatorSetId {
    #[serde(default)]
    pub domain: String,
    pub version: i64,
}

/// The computation graph.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct GraphProto {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub input: Vec<ValueInfoProto>,
    #[serde(default)]
    pub output: Vec<ValueInfoProto>,
    #[serde(default)]
    pub initializer: Vec<TensorProto>,
    #[serde(default)]
    pub node: Vec<NodeProto>,
}

/// A named, typed tensor declaration (graph input or output).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ValueInfoProto {
    pub name: String,
    pub elem_type: ElemType,
    #[serde(default)]
    pub dims: Vec<Dim>,
}

impl ValueInfoProto {
    /// Creates a declaration with static dimensions.
    ///
    /// # Errors
    /// [`ModelError::InvalidTensor`] if a dimension exceeds `i64::MAX`.
    pub fn new(name: impl Into<String>, desc: &TensorDesc) -> Result<Self, ModelError> {
        let name = name.into();
        let dims = desc
            .shape()
            .dims()
            .iter()
            .map(|&d| {
                i64::try_from(d).map(Dim::Value).map_err(|_| ModelError::InvalidTensor {
                    name: name.clone(),
                    detail: format!("dimension {d} does not fit the interchange format"),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            name,
            elem_type: desc.dtype().into(),
            dims,
        })
    }

    /// Converts to a descriptor. Every dimension must be static and
    /// non-negative.
    pub fn to_desc(&self) -> Result<TensorDesc, ModelError> {
        let dtype = resolve_dtype(&self.name, &self.elem_type)?;
        let shape = static_shape(&self.name, &self.dims)?;
        sized_desc(&self.name, dtype, shape)
    }
}

/// A constant tensor stored in the model.
///
/// As in the protobuf format, 8 and 16 bit integers and booleans are carried
/// in `int32_data`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TensorProto {
    pub name: String,
    pub elem_type: ElemType,
    #[serde(default)]
    pub dims: Vec<i64>,
    #[serde(default)]
    pub float_data: Vec<f32>,
    #[serde(default)]
    pub double_data: Vec<f64>,
    #[serde(default)]
    pub int32_data: Vec<i32>,
    #[serde(default)]
    pub int64_data: Vec<i64>,
}

impl TensorProto {
    /// Decodes the stored values into a [`Tensor`].
    pub fn to_tensor(&self) -> Result<Tensor, ModelError> {
        let dtype = resolve_dtype(&self.name, &self.elem_type)?;
        let dims: Vec<Dim> = self.dims.iter().map(|&d| Dim::Value(d)).collect();
        let shape = sized_desc(&self.name, dtype, static_shape(&self.name, &dims)?)?
            .shape()
            .clone();
        let invalid = |detail: String| ModelError::InvalidTensor {
            name: self.name.clone(),
            detail,
        };

        let expected = shape.num_elements();
        let check_len = |actual: usize| {
            if actual == expected {
                Ok(())
            } else {
                Err(invalid(format!(
                    "{dtype} data holds {actual} values, shape {shape} needs {expected}"
                )))
            }
        };

        let tensor = match dtype {
            DType::F32 => {
                check_len(self.float_data.len())?;
                Tensor::from_slice(shape.clone(), &self.float_data)
            }
            DType::F64 => {
                check_len(self.double_data.len())?;
                Tensor::from_slice(shape.clone(), &self.double_data)
            }
            DType::I32 => {
                check_len(self.int32_data.len())?;
                Tensor::from_slice(shape.clone(), &self.int32_data)
            }
            DType::I64 => {
                check_len(self.int64_data.len())?;
                Tensor::from_slice(shape.clone(), &self.int64_data)
            }
            DType::I8 => {
                check_len(self.int32_data.len())?;
                Tensor::from_slice(shape.clone(), &self.narrow::<i8>()?)
            }
            DType::U8 => {
                check_len(self.int32_data.len())?;
                Tensor::from_slice(shape.clone(), &self.narrow::<u8>()?)
            }
            DType::I16 => {
                check_len(self.int32_data.len())?;
                Tensor::from_slice(shape.clone(), &self.narrow::<i16>()?)
            }
            DType::Bool => {
                check_len(self.int32_data.len())?;
                let bytes = self.int32_data.iter().map(|&v| u8::from(v != 0)).collect();
                Tensor::from_bytes(TensorDesc::new(DType::Bool, shape.clone()), bytes)
            }
            DType::F16 | DType::BF16 => {
                return Err(invalid(format!("{dtype} initializers are not supported")))
            }
        };

        tensor.map_err(|e| invalid(e.to_string()))
    }

    fn narrow<T: TryFrom<i32>>(&self) -> Result<Vec<T>, ModelError> {
        self.int32_data
            .iter()
            .map(|&v| {
                T::try_from(v).map_err(|_| ModelError::InvalidTensor {
                    name: self.name.clone(),
                    detail: format!("value {v} out of range for the element type"),
                })
            })
            .collect()
    }
}

/// An operator application.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct NodeProto {
    #[serde(default)]
    pub name: String,
    pub op_type: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub input: Vec<String>,
    #[serde(default)]
    pub output: Vec<String>,
    #[serde(default)]
    pub attribute: Attributes,
}

impl ModelProto {
    /// Loads a model from a JSON file path.
    pub fn from_file(path: &Path) -> Result<Self, ModelError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parses a model from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        let model: Self = serde_json::from_str(json)?;
        Ok(model)
    }

    /// Returns the imported version of the default operator domain, if any.
    pub fn default_opset(&self) -> Option<i64> {
        self.opset_import
            .iter()
            .find(|o| o.domain.is_empty() || o.domain == "ai.onnx")
            .map(|o| o.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADDITION: &str = r#"{
        "ir_version": 3,
        "producer_name": "CNTK",
        "opset_import": [{ "domain": "", "version": 7 }],
        "graph": {
            "name": "add_graph",
            "input": [
                { "name": "Input0", "elem_type": "FLOAT", "dims": [1, 1, 2, 2] },
                { "name": "Input1", "elem_type": 1, "dims": [1, 1, 2, 2] }
            ],
            "output": [{ "name": "Output", "elem_type": "FLOAT", "dims": [1, 1, 2, 2] }],
            "node": [
                { "name": "addition", "op_type": "Add",
                  "input": ["Input0", "Input1"], "output": ["Output"] }
            ]
        }
    }"#;

    #[test]
    fn test_parse_addition_model() {
        let model = ModelProto::from_json(ADDITION).unwrap();
        assert_eq!(model.ir_version, 3);
        assert_eq!(model.producer_name, "CNTK");
        assert_eq!(model.default_opset(), Some(7));
        assert_eq!(model.graph.input.len(), 2);
        assert_eq!(model.graph.node[0].op_type, "Add");

        let d0 = model.graph.input[0].to_desc().unwrap();
        let d1 = model.graph.input[1].to_desc().unwrap();
        assert_eq!(d0, d1);
        assert_eq!(d0, TensorDesc::new(DType::F32, vec![1, 1, 2, 2]));
    }

    #[test]
    fn test_elem_type_codes_and_names_agree() {
        for (code, name) in [(1, "FLOAT"), (6, "INT32"), (7, "INT64"), (9, "BOOL"), (11, "DOUBLE")] {
            assert_eq!(
                ElemType::Code(code).to_dtype(),
                ElemType::Name(name.into()).to_dtype()
            );
        }
        assert_eq!(ElemType::Code(8).to_dtype(), None);
        assert_eq!(ElemType::Name("STRING".into()).to_dtype(), None);
    }

    #[test]
    fn test_symbolic_dim_rejected() {
        let info: ValueInfoProto =
            serde_json::from_str(r#"{ "name": "x", "elem_type": 1, "dims": ["N", 3] }"#).unwrap();
        let err = info.to_desc().unwrap_err();
        assert!(matches!(err, ModelError::InvalidTensor { ref name, .. } if name == "x"));
    }

    #[test]
    fn test_negative_dim_rejected() {
        let info: ValueInfoProto =
            serde_json::from_str(r#"{ "name": "x", "elem_type": 1, "dims": [-1] }"#).unwrap();
        assert!(info.to_desc().is_err());
    }

    #[test]
    fn test_unaddressable_dims_rejected() {
        let info: ValueInfoProto = serde_json::from_str(
            r#"{ "name": "x", "elem_type": 1, "dims": [4294967296, 4294967296, 16] }"#,
        )
        .unwrap();
        assert!(matches!(
            info.to_desc(),
            Err(ModelError::InvalidTensor { ref name, ref detail }) if name == "x" && detail.contains("too large")
        ));

        let proto: TensorProto = serde_json::from_str(
            r#"{ "name": "w", "elem_type": 1, "dims": [4294967296, 4294967296], "float_data": [] }"#,
        )
        .unwrap();
        assert!(matches!(proto.to_tensor(), Err(ModelError::InvalidTensor { .. })));
    }

    #[test]
    fn test_value_info_rejects_dims_past_i64() {
        let desc = TensorDesc::new(DType::F32, vec![usize::MAX, 0]);
        assert!(matches!(
            ValueInfoProto::new("z", &desc),
            Err(ModelError::InvalidTensor { ref name, .. }) if name == "z"
        ));
    }

    #[test]
    fn test_scalar_has_no_dims() {
        let info: ValueInfoProto =
            serde_json::from_str(r#"{ "name": "s", "elem_type": "FLOAT" }"#).unwrap();
        assert_eq!(info.to_desc().unwrap(), TensorDesc::new(DType::F32, Shape::scalar()));
    }

    #[test]
    fn test_value_info_from_desc() {
        let desc = TensorDesc::new(DType::I32, vec![2, 3]);
        let info = ValueInfoProto::new("y", &desc).unwrap();
        assert_eq!(info.elem_type, ElemType::Name("INT32".into()));
        assert_eq!(info.to_desc().unwrap(), desc);
    }

    #[test]
    fn test_float_initializer() {
        let proto: TensorProto = serde_json::from_str(
            r#"{ "name": "b", "elem_type": "FLOAT", "dims": [4], "float_data": [1, 2, 3, 4] }"#,
        )
        .unwrap();
        let t = proto.to_tensor().unwrap();
        assert_eq!(t.to_vec::<f32>().unwrap(), vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_narrow_initializer() {
        let proto: TensorProto = serde_json::from_str(
            r#"{ "name": "q", "elem_type": "INT8", "dims": [2], "int32_data": [-3, 7] }"#,
        )
        .unwrap();
        let t = proto.to_tensor().unwrap();
        assert_eq!(t.to_vec::<i8>().unwrap(), vec![-3, 7]);

        let overflow: TensorProto = serde_json::from_str(
            r#"{ "name": "q", "elem_type": "INT8", "dims": [1], "int32_data": [300] }"#,
        )
        .unwrap();
        assert!(overflow.to_tensor().is_err());
    }

    #[test]
    fn test_initializer_length_mismatch() {
        let proto: TensorProto = serde_json::from_str(
            r#"{ "name": "b", "elem_type": "FLOAT", "dims": [2, 2], "float_data": [1, 2] }"#,
        )
        .unwrap();
        let err = proto.to_tensor().unwrap_err();
        assert!(err.to_string().contains("'b'"));
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        assert!(matches!(
            ModelProto::from_json("{ not json"),
            Err(ModelError::ParseError(_))
        ));
    }
}
