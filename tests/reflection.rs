mod common;

use bindery::{
    binding::{bind, Options, VaryingDirection},
    proc::{LayoutRule, ResourceKind},
    reflect::{ParameterCategory, ResourceBaseShape, TypeKind},
    ArgumentDirection, Function, FunctionArgument, RegisterSemantic, ResourceAccess, ScalarType,
    ShaderStage, TextureDimension, TypeInner, VectorSize,
};
use common::Builder;

#[test]
fn reflection_reports_committed_bindings() {
    let mut b = Builder::new();
    let float4 = b.vector(VectorSize::Quad);
    let texture = b.texture(ResourceAccess::Read);
    let textures = b.array(texture, 2);
    let sampler = b.sampler();
    let unit = b.unit();
    b.global(unit, "tint", float4, &[]);
    b.global(unit, "maps", textures, &[RegisterSemantic::with_space("t4", "space2")]);
    b.global(unit, "smp", sampler, &[]);

    let program = bind(&b.request, &Options::default()).unwrap();
    let reflection = program.reflection();
    assert_eq!(reflection.parameter_count(), 3);
    assert!(reflection.parameter_by_index(3).is_none());

    let maps = reflection.parameter_by_index(1).unwrap();
    assert_eq!(maps.name(), "maps");
    assert_eq!(
        maps.category(),
        ParameterCategory::Single(ResourceKind::ShaderResource)
    );
    let location = maps.binding(ResourceKind::ShaderResource).unwrap();
    assert_eq!((location.space, location.index, location.count), (2, 4, 2));
    assert_eq!(maps.binding_index(), 4);
    assert_eq!(maps.binding_space(), 2);

    let tint = reflection.parameter_by_index(0).unwrap();
    assert_eq!(tint.category(), ParameterCategory::Single(ResourceKind::Uniform));
    let location = tint.binding(ResourceKind::Uniform).unwrap();
    assert_eq!((location.index, location.count), (0, 16));

    let smp = reflection.parameter_by_index(2).unwrap();
    assert_eq!(smp.offset(ResourceKind::SamplerState), 0);
    assert_eq!(smp.category_count(), 1);
    assert_eq!(smp.category_by_index(0), Some(ResourceKind::SamplerState));
    assert_eq!(smp.type_layout().kind(), TypeKind::SamplerState);

    let global = reflection.global_scope();
    assert_eq!(global.kind(), TypeKind::ConstantBuffer);
    assert!(global.ty().is_none());
    let element = global.element_type_layout().unwrap();
    assert_eq!(element.kind(), TypeKind::Struct);
    assert_eq!(element.field_count(), 3);
    assert_eq!(element.rules(), LayoutRule::HlslConstantBuffer);
    assert_eq!(element.size(ResourceKind::ShaderResource), 2);
}

#[test]
fn type_layout_queries() {
    let mut b = Builder::new();
    let float = b.float();
    let float3 = b.vector(VectorSize::Tri);
    let matrix = b.ty(TypeInner::Matrix {
        rows: VectorSize::Quad,
        columns: VectorSize::Tri,
        scalar: ScalarType::Float32,
    });
    let weights = b.array(float, 4);
    let texture = b.texture(ResourceAccess::Read);
    let light = b.structure(
        "Light",
        &[
            ("position", float3),
            ("weights", weights),
            ("transform", matrix),
            ("shadow", texture),
        ],
    );
    let unit = b.unit();
    b.global(unit, "light", light, &[]);

    let program = bind(&b.request, &Options::default()).unwrap();
    let reflection = program.reflection();
    let light = reflection.find_parameter_by_name("light").unwrap();
    assert_eq!(light.category(), ParameterCategory::Mixed);

    let layout = light.type_layout();
    assert_eq!(layout.kind(), TypeKind::Struct);
    assert_eq!(layout.category_count(), 2);
    assert_eq!(layout.field_count(), 4);
    let offsets: Vec<_> = layout
        .fields_iter()
        .map(|field| field.offset(ResourceKind::Uniform))
        .collect();
    assert_eq!(offsets, [0, 16, 80, 0]);

    let weights = layout.field_by_index(1).unwrap().type_layout();
    assert_eq!(weights.kind(), TypeKind::Array);
    assert_eq!(weights.element_count(), 4);
    assert_eq!(weights.element_stride(ResourceKind::Uniform), 16);
    assert_eq!(weights.size(ResourceKind::Uniform), 64);

    let transform = layout.field_by_index(2).unwrap();
    let ty = transform.variable().unwrap().ty();
    assert_eq!(transform.variable().unwrap().name(), "transform");
    assert_eq!(ty.kind(), TypeKind::Matrix);
    assert_eq!((ty.row_count(), ty.column_count()), (4, 3));
    assert_eq!(ty.scalar_type(), Some(ScalarType::Float32));

    let shadow = layout.field_by_index(3).unwrap();
    assert!(shadow.binding(ResourceKind::Uniform).is_none());
    assert_eq!(shadow.offset(ResourceKind::ShaderResource), 0);

    let ty = layout.ty().unwrap();
    assert_eq!(ty.name(), Some("Light"));
    assert_eq!(ty.field_count(), 4);
    let position = ty.field_by_index(0).unwrap();
    assert_eq!(position.name(), "position");
    assert_eq!(position.ty().kind(), TypeKind::Vector);
    assert_eq!(position.ty().element_count(), 3);
}

#[test]
fn struct_fields_are_monotonic_and_never_straddle() {
    let mut b = Builder::new();
    let float = b.float();
    let float2 = b.vector(VectorSize::Bi);
    let float3 = b.vector(VectorSize::Tri);
    let float4 = b.vector(VectorSize::Quad);
    let block = b.structure(
        "Block",
        &[
            ("a", float),
            ("b", float3),
            ("c", float2),
            ("d", float3),
            ("e", float),
            ("f", float4),
            ("g", float2),
        ],
    );
    let unit = b.unit();
    b.global(unit, "block", block, &[]);

    let program = bind(&b.request, &Options::default()).unwrap();
    let layout = program
        .reflection()
        .find_parameter_by_name("block")
        .unwrap()
        .type_layout();
    let fields: Vec<_> = layout
        .fields_iter()
        .map(|field| {
            (
                field.offset(ResourceKind::Uniform),
                field.type_layout().size(ResourceKind::Uniform),
            )
        })
        .collect();

    for pair in fields.windows(2) {
        let ((offset, size), (next, _)) = (pair[0], pair[1]);
        assert!(next >= offset + size);
    }
    for &(offset, size) in fields.iter() {
        assert_eq!(offset / 16, (offset + size - 1) / 16, "field at {offset} straddles");
    }
}

#[test]
fn resource_types() {
    let mut b = Builder::new();
    let float4 = b.vector(VectorSize::Quad);
    let cube_array = b.ty(TypeInner::Texture {
        dim: TextureDimension::Cube,
        arrayed: true,
        multisampled: false,
        access: ResourceAccess::Read,
        result: float4,
    });
    let cubes = b.array(cube_array, 2);
    let element = b.structure("Particle", &[("velocity", float4)]);
    let particles = b.ty(TypeInner::StructuredBuffer {
        base: element,
        access: ResourceAccess::Append,
    });
    let raw = b.ty(TypeInner::ByteAddressBuffer {
        access: ResourceAccess::Read,
    });
    let unit = b.unit();
    b.global(unit, "cubes", cubes, &[]);
    b.global(unit, "particles", particles, &[]);
    b.global(unit, "raw", raw, &[]);

    let program = bind(&b.request, &Options::default()).unwrap();
    let reflection = program.reflection();

    let cubes = reflection.find_parameter_by_name("cubes").unwrap();
    let ty = cubes.variable().unwrap().ty();
    assert_eq!(ty.kind(), TypeKind::Array);
    let shape = ty.resource_shape().unwrap();
    assert_eq!(shape.base, ResourceBaseShape::TextureCube);
    assert!(shape.arrayed && !shape.multisampled);
    assert_eq!(ty.resource_access(), Some(ResourceAccess::Read));
    assert_eq!(ty.resource_result_type().map(|ty| ty.handle()), Some(float4));

    let particles = reflection.find_parameter_by_name("particles").unwrap();
    assert_eq!(
        particles.category(),
        ParameterCategory::Single(ResourceKind::UnorderedAccess)
    );
    let layout = particles.type_layout();
    assert_eq!(layout.kind(), TypeKind::Resource);
    let element = layout.element_type_layout().unwrap();
    assert_eq!(element.rules(), LayoutRule::HlslStructuredBuffer);
    assert_eq!(element.size(ResourceKind::Uniform), 16);

    let raw = reflection.find_parameter_by_name("raw").unwrap();
    let ty = raw.variable().unwrap().ty();
    assert_eq!(
        ty.resource_shape().map(|shape| shape.base),
        Some(ResourceBaseShape::ByteAddressBuffer)
    );
    assert!(ty.resource_result_type().is_none());
    assert_eq!(raw.offset(ResourceKind::ShaderResource), 2);
}

#[test]
fn entry_points_and_varyings() {
    let mut b = Builder::new();
    let float4 = b.vector(VectorSize::Quad);
    let unit = b.unit();
    b.function(
        unit,
        Function {
            name: "cs_main".to_string(),
            workgroup_size: Some([8, 8, 1]),
            ..Function::default()
        },
    );
    b.request_entry_point(unit, "cs_main", "cs_5_0");
    b.function(
        unit,
        Function {
            name: "vs_main".to_string(),
            arguments: vec![
                FunctionArgument {
                    name: "position".to_string(),
                    ty: float4,
                    direction: ArgumentDirection::In,
                    semantic: Some("POSITION".to_string()),
                },
                FunctionArgument {
                    name: "id".to_string(),
                    ty: float4,
                    direction: ArgumentDirection::In,
                    semantic: Some("SV_VertexID".to_string()),
                },
            ],
            ..Function::default()
        },
    );
    b.request_entry_point(unit, "vs_main", "vs_5_1");

    let program = bind(&b.request, &Options::default()).unwrap();
    let reflection = program.reflection();
    assert_eq!(reflection.entry_point_count(), 2);

    let compute = reflection.entry_point_by_index(0).unwrap();
    assert_eq!(compute.name(), "cs_main");
    assert_eq!(compute.stage(), ShaderStage::Compute);
    assert_eq!(compute.compute_thread_group_size(), [8, 8, 1]);

    let vertex = reflection.entry_point_by_index(1).unwrap();
    assert_eq!(vertex.stage(), ShaderStage::Vertex);
    assert_eq!(vertex.profile().to_string(), "vs_5_1");
    assert_eq!(vertex.compute_thread_group_size(), [1, 1, 1]);
    let varyings = vertex.varyings();
    assert_eq!(varyings.len(), 2);
    assert!(varyings
        .iter()
        .all(|varying| varying.direction == VaryingDirection::Input));
    assert_eq!(varyings[0].kind, Some(ResourceKind::VertexInput));
    assert_eq!(varyings[0].semantic_name.as_deref(), Some("POSITION"));
    assert_eq!(varyings[1].kind, None);
    assert!(reflection.entry_point_by_index(2).is_none());
}

#[test]
fn json_document_shape() {
    let mut b = Builder::new();
    let float = b.float();
    let float4 = b.vector(VectorSize::Quad);
    let texture = b.texture(ResourceAccess::Read);
    let values = b.array(float, 2);
    let material = b.structure("Material", &[("color", float4), ("map", texture)]);
    let block = b.structure("Block", &[("values", values)]);
    let block = b.constant_buffer(block);
    let unit = b.unit();
    b.global(unit, "material", material, &[]);
    b.global(unit, "block", block, &[RegisterSemantic::new("b3")]);

    let program = bind(&b.request, &Options::default()).unwrap();
    let text = bindery::reflect::to_json_string(&program.reflection()).unwrap();
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    let parameters = value["parameters"].as_array().unwrap();
    assert_eq!(parameters.len(), 2);

    let material = &parameters[0];
    assert_eq!(material["name"], "material");
    let bindings = material["bindings"].as_array().unwrap();
    assert_eq!(bindings.len(), 2);
    assert_eq!(bindings[0]["kind"], "uniform");
    assert_eq!(bindings[0]["offset"], 0);
    assert_eq!(bindings[0]["size"], 16);
    assert_eq!(bindings[1]["kind"], "shaderResource");
    assert_eq!(bindings[1]["index"], 0);
    assert!(bindings[1].get("space").is_none());
    assert!(bindings[1].get("count").is_none());

    let fields = material["type"]["fields"].as_array().unwrap();
    assert_eq!(material["type"]["kind"], "struct");
    assert_eq!(fields[0]["name"], "color");
    assert_eq!(fields[0]["binding"]["offset"], 0);
    assert_eq!(fields[0]["type"]["kind"], "vector");
    assert_eq!(fields[0]["type"]["elementCount"], 4);
    assert_eq!(fields[1]["binding"]["kind"], "shaderResource");
    assert_eq!(fields[1]["type"]["kind"], "resource");
    assert_eq!(fields[1]["type"]["baseShape"], "texture2D");
    assert!(fields[1]["type"].get("access").is_none());

    let block = &parameters[1];
    assert_eq!(block["binding"]["kind"], "constantBuffer");
    assert_eq!(block["binding"]["index"], 3);
    assert_eq!(block["type"]["kind"], "constantBuffer");
    let values = &block["type"]["elementType"]["fields"][0];
    assert_eq!(values["type"]["kind"], "array");
    assert_eq!(values["type"]["elementCount"], 2);
    assert_eq!(values["type"]["uniformStride"], 16);
    assert_eq!(values["type"]["elementType"]["scalarType"], "float32");
}
