//! JSON dump of the reflection data.

use super::{
    ShaderReflection, TypeKind, TypeLayoutReflection, TypeReflection, VariableLayoutReflection,
};
use crate::{
    proc::{ResourceKind, TypeLayoutInner},
    ResourceAccess, ScalarType,
};
use serde_json::{json, Map, Value};

fn binding_json(var: &VariableLayoutReflection, kind: ResourceKind) -> Value {
    let mut object = Map::new();
    object.insert("kind".into(), kind.to_str().into());
    let count = var.type_layout().size(kind);
    if kind == ResourceKind::Uniform {
        object.insert("offset".into(), var.offset(kind).into());
        object.insert("size".into(), count.into());
    } else {
        let space = var.space(kind);
        if space != 0 {
            object.insert("space".into(), space.into());
        }
        object.insert("index".into(), var.offset(kind).into());
        if count != 1 {
            object.insert("count".into(), count.into());
        }
    }
    Value::Object(object)
}

/// Adds `"binding"` for exactly one category, `"bindings"` otherwise.
fn insert_bindings(object: &mut Map<String, Value>, var: &VariableLayoutReflection) {
    let mut bindings: Vec<_> = var
        .resources()
        .iter()
        .map(|res| binding_json(var, res.kind))
        .collect();
    if bindings.len() == 1 {
        object.insert("binding".into(), bindings.remove(0));
    } else {
        object.insert("bindings".into(), Value::Array(bindings));
    }
}

fn scalar_json(scalar: ScalarType) -> Value {
    json!({
        "kind": "scalar",
        "scalarType": scalar.to_str(),
    })
}

fn type_json(ty: TypeReflection) -> Value {
    let mut object = Map::new();
    match ty.kind() {
        TypeKind::SamplerState => {
            object.insert("kind".into(), "samplerState".into());
        }
        TypeKind::Resource => {
            object.insert("kind".into(), "resource".into());
            if let Some(shape) = ty.resource_shape() {
                object.insert("baseShape".into(), shape.base.to_str().into());
                if shape.arrayed {
                    object.insert("array".into(), true.into());
                }
                if shape.multisampled {
                    object.insert("multisample".into(), true.into());
                }
            }
            match ty.resource_access() {
                Some(ResourceAccess::Read) | None => {}
                Some(access) => {
                    object.insert("access".into(), access.to_str().into());
                }
            }
        }
        TypeKind::ConstantBuffer => {
            object.insert("kind".into(), "constantBuffer".into());
            if let Some(element) = ty.element_type() {
                object.insert("elementType".into(), type_json(element));
            }
        }
        TypeKind::Scalar => {
            object.insert("kind".into(), "scalar".into());
            if let Some(scalar) = ty.scalar_type() {
                object.insert("scalarType".into(), scalar.to_str().into());
            }
        }
        TypeKind::Vector => {
            object.insert("kind".into(), "vector".into());
            object.insert("elementCount".into(), ty.element_count().into());
            if let Some(scalar) = ty.scalar_type() {
                object.insert("elementType".into(), scalar_json(scalar));
            }
        }
        TypeKind::Matrix => {
            object.insert("kind".into(), "matrix".into());
            object.insert("rowCount".into(), ty.row_count().into());
            object.insert("columnCount".into(), ty.column_count().into());
            if let Some(scalar) = ty.scalar_type() {
                object.insert("elementType".into(), scalar_json(scalar));
            }
        }
        TypeKind::Array => {
            object.insert("kind".into(), "array".into());
            object.insert("elementCount".into(), ty.element_count().into());
            if let Some(element) = ty.element_type() {
                object.insert("elementType".into(), type_json(element));
            }
        }
        TypeKind::Struct => {
            object.insert("kind".into(), "struct".into());
            let fields = (0..ty.field_count())
                .filter_map(|index| ty.field_by_index(index))
                .map(|field| {
                    json!({
                        "name": field.name(),
                        "type": type_json(field.ty()),
                    })
                })
                .collect();
            object.insert("fields".into(), Value::Array(fields));
        }
    }
    Value::Object(object)
}

fn type_layout_json(layout: TypeLayoutReflection) -> Value {
    let inner = &layout.program.type_layouts[layout.handle].inner;
    match *inner {
        TypeLayoutInner::Array {
            element,
            element_count,
            uniform_stride,
        } => {
            let mut object = Map::new();
            object.insert("kind".into(), "array".into());
            object.insert("elementCount".into(), element_count.into());
            object.insert(
                "elementType".into(),
                type_layout_json(TypeLayoutReflection::new(layout.program, element)),
            );
            if layout.size(ResourceKind::Uniform) != 0 {
                object.insert("uniformStride".into(), uniform_stride.into());
            }
            Value::Object(object)
        }
        TypeLayoutInner::Struct { .. } => {
            let fields = layout.fields_iter().map(var_layout_json).collect();
            json!({
                "kind": "struct",
                "fields": Value::Array(fields),
            })
        }
        TypeLayoutInner::ConstantBuffer { element } => json!({
            "kind": "constantBuffer",
            "elementType": type_layout_json(TypeLayoutReflection::new(layout.program, element)),
        }),
        TypeLayoutInner::Simple | TypeLayoutInner::StructuredBuffer { .. } => match layout.ty() {
            Some(ty) => type_json(ty),
            None => Value::Null,
        },
    }
}

fn var_layout_json(var: VariableLayoutReflection) -> Value {
    let mut object = Map::new();
    object.insert("name".into(), var.name().into());
    object.insert("type".into(), type_layout_json(var.type_layout()));
    insert_bindings(&mut object, &var);
    Value::Object(object)
}

fn parameter_json(parameter: VariableLayoutReflection) -> Value {
    let mut object = Map::new();
    object.insert("name".into(), parameter.name().into());
    insert_bindings(&mut object, &parameter);
    object.insert("type".into(), type_layout_json(parameter.type_layout()));
    Value::Object(object)
}

/// Describe every top-level parameter as a JSON document.
pub fn to_json(reflection: &ShaderReflection) -> Value {
    let parameters = reflection.parameters().map(parameter_json).collect();
    json!({ "parameters": Value::Array(parameters) })
}

/// Pretty-printed form of [`to_json`].
pub fn to_json_string(reflection: &ShaderReflection) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&to_json(reflection))
}
