#![allow(dead_code)]

use bindery::{
    CompileRequest, EntryPointRequest, Function, FunctionResult, GlobalVariable, Handle,
    RegisterSemantic, ResourceAccess, ScalarType, StorageQualifiers, StructMember,
    TextureDimension, TranslationUnit, Type, TypeInner, VectorSize,
};

/// Assembles a `CompileRequest` the way a front end would.
#[derive(Default)]
pub struct Builder {
    pub request: CompileRequest,
}

impl Builder {
    pub fn new() -> Self {
        let _ = env_logger::builder().is_test(true).try_init();
        Self::default()
    }

    pub fn ty(&mut self, inner: TypeInner) -> Handle<Type> {
        self.request.types.insert(Type { name: None, inner })
    }

    pub fn named(&mut self, name: &str, inner: TypeInner) -> Handle<Type> {
        self.request.types.insert(Type {
            name: Some(name.to_string()),
            inner,
        })
    }

    pub fn float(&mut self) -> Handle<Type> {
        self.ty(TypeInner::Scalar(ScalarType::Float32))
    }

    pub fn vector(&mut self, size: VectorSize) -> Handle<Type> {
        self.ty(TypeInner::Vector {
            size,
            scalar: ScalarType::Float32,
        })
    }

    pub fn texture(&mut self, access: ResourceAccess) -> Handle<Type> {
        let result = self.vector(VectorSize::Quad);
        self.ty(TypeInner::Texture {
            dim: TextureDimension::D2,
            arrayed: false,
            multisampled: false,
            access,
            result,
        })
    }

    pub fn sampler(&mut self) -> Handle<Type> {
        self.ty(TypeInner::Sampler { comparison: false })
    }

    pub fn array(&mut self, base: Handle<Type>, size: u32) -> Handle<Type> {
        self.ty(TypeInner::Array { base, size })
    }

    pub fn structure(&mut self, name: &str, members: &[(&str, Handle<Type>)]) -> Handle<Type> {
        let members = members
            .iter()
            .map(|&(name, ty)| StructMember {
                name: name.to_string(),
                ty,
                semantic: None,
            })
            .collect();
        self.named(name, TypeInner::Struct { members })
    }

    pub fn constant_buffer(&mut self, base: Handle<Type>) -> Handle<Type> {
        self.ty(TypeInner::ConstantBuffer { base })
    }

    /// Start a new translation unit and return its index.
    pub fn unit(&mut self) -> usize {
        self.request
            .translation_units
            .push(TranslationUnit::default());
        self.request.translation_units.len() - 1
    }

    pub fn global(
        &mut self,
        unit: usize,
        name: &str,
        ty: Handle<Type>,
        registers: &[RegisterSemantic],
    ) -> Handle<GlobalVariable> {
        self.global_with(unit, name, ty, StorageQualifiers::empty(), registers)
    }

    pub fn global_with(
        &mut self,
        unit: usize,
        name: &str,
        ty: Handle<Type>,
        qualifiers: StorageQualifiers,
        registers: &[RegisterSemantic],
    ) -> Handle<GlobalVariable> {
        self.request.translation_units[unit]
            .global_variables
            .append(GlobalVariable {
                name: name.to_string(),
                ty,
                qualifiers,
                registers: registers.to_vec(),
            })
    }

    pub fn function(&mut self, unit: usize, function: Function) -> Handle<Function> {
        self.request.translation_units[unit]
            .functions
            .append(function)
    }

    /// Declare `name` as an empty function and request it as an entry point.
    pub fn entry_point(&mut self, unit: usize, name: &str, profile: &str) {
        self.function(
            unit,
            Function {
                name: name.to_string(),
                ..Function::default()
            },
        );
        self.request_entry_point(unit, name, profile);
    }

    pub fn request_entry_point(&mut self, unit: usize, name: &str, profile: &str) {
        self.request.translation_units[unit]
            .entry_points
            .push(EntryPointRequest {
                name: name.to_string(),
                profile: profile.parse().unwrap(),
            });
    }

    /// A fragment shader returning one `float4` to `semantic`.
    pub fn fragment_entry_point(&mut self, unit: usize, name: &str, semantic: &str) {
        let color = self.vector(VectorSize::Quad);
        self.function(
            unit,
            Function {
                name: name.to_string(),
                arguments: Vec::new(),
                result: Some(FunctionResult {
                    ty: color,
                    semantic: Some(semantic.to_string()),
                }),
                workgroup_size: None,
            },
        );
        self.request_entry_point(unit, name, "ps_5_0");
    }
}
