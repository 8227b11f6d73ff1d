use super::semantics::SimpleSemantic;
use crate::{
    arena::{Handle, UniqueArena},
    proc::ResourceKind,
    Function, Profile, ShaderStage, Type, TypeInner,
};
use std::ops::Range;

/// Whether a varying flows into or out of the entry point.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
#[cfg_attr(feature = "deserialize", derive(serde::Deserialize))]
pub enum VaryingDirection {
    Input,
    Output,
}

/// One scalar, vector or matrix slot of an entry point's signature.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
#[cfg_attr(feature = "deserialize", derive(serde::Deserialize))]
pub struct VaryingLayout {
    /// Access path, like `input.uv` or `result.color[1]`.
    pub name: String,
    pub direction: VaryingDirection,
    /// Semantic name without its index, if one is in effect.
    pub semantic_name: Option<String>,
    pub semantic_index: u32,
    /// Number of consecutive semantic slots, one per matrix row.
    pub slot_count: u32,
    /// Slot kind for vertex inputs and render target outputs.
    pub kind: Option<ResourceKind>,
}

/// Layout of a resolved entry point.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
#[cfg_attr(feature = "deserialize", derive(serde::Deserialize))]
pub struct EntryPointLayout {
    pub name: String,
    /// Index of the translation unit declaring the function.
    pub unit: usize,
    pub function: Handle<Function>,
    pub profile: Profile,
    pub workgroup_size: Option<[u32; 3]>,
    pub varyings: Vec<VaryingLayout>,
}

impl EntryPointLayout {
    pub const fn stage(&self) -> ShaderStage {
        self.profile.stage
    }

    /// Render target slots written by this entry point.
    pub fn render_targets(&self) -> impl Iterator<Item = Range<u32>> + '_ {
        self.varyings.iter().filter_map(|varying| match varying.kind {
            Some(ResourceKind::FragmentOutput) => {
                let end = varying.semantic_index.saturating_add(varying.slot_count);
                Some(varying.semantic_index..end)
            }
            _ => None,
        })
    }
}

struct Semantic<'s> {
    name: &'s str,
    render_target: bool,
    system_value: bool,
}

/// Flattens entry point arguments and results into semantic slots.
struct VaryingCollector<'a> {
    types: &'a UniqueArena<Type>,
    stage: ShaderStage,
    varyings: Vec<VaryingLayout>,
    /// Paths whose semantic slots would end past `u32::MAX`.
    out_of_range: Vec<String>,
}

impl<'a> VaryingCollector<'a> {
    /// Use the declaration's own semantic unless an outer one is in effect.
    fn visit_declaration(
        &mut self,
        path: String,
        ty: Handle<Type>,
        declared: Option<&str>,
        outer: Option<&Semantic>,
        index: &mut u32,
        direction: VaryingDirection,
    ) {
        match (outer, declared) {
            (None, Some(declared)) => {
                let semantic = match SimpleSemantic::decompose(declared) {
                    Some(semantic) => semantic,
                    None => {
                        log::trace!("semantic {} of {} is out of range", declared, path);
                        self.out_of_range.push(path);
                        return;
                    }
                };
                let mut local_index = semantic.index;
                let inner = Semantic {
                    name: &semantic.name,
                    render_target: semantic.is_render_target(),
                    system_value: semantic.is_system_value(),
                };
                self.visit(path, ty, Some(&inner), &mut local_index, direction);
            }
            _ => self.visit(path, ty, outer, index, direction),
        }
    }

    fn visit(
        &mut self,
        path: String,
        ty: Handle<Type>,
        semantic: Option<&Semantic>,
        index: &mut u32,
        direction: VaryingDirection,
    ) {
        let types = self.types;
        match types[ty].inner {
            TypeInner::Scalar(_) | TypeInner::Vector { .. } => {
                self.push(path, semantic, index, direction, 1);
            }
            TypeInner::Matrix { rows, .. } => {
                self.push(path, semantic, index, direction, rows as u32);
            }
            TypeInner::Array { base, size } => {
                for element in 0..size {
                    self.visit(
                        format!("{path}[{element}]"),
                        base,
                        semantic,
                        index,
                        direction,
                    );
                }
            }
            TypeInner::Struct { ref members } => {
                for member in members.iter() {
                    self.visit_declaration(
                        format!("{}.{}", path, member.name),
                        member.ty,
                        member.semantic.as_deref(),
                        semantic,
                        index,
                        direction,
                    );
                }
            }
            TypeInner::Texture { .. }
            | TypeInner::TypedBuffer { .. }
            | TypeInner::ByteAddressBuffer { .. }
            | TypeInner::StructuredBuffer { .. }
            | TypeInner::ConstantBuffer { .. }
            | TypeInner::Sampler { .. } => {}
        }
    }

    fn push(
        &mut self,
        name: String,
        semantic: Option<&Semantic>,
        index: &mut u32,
        direction: VaryingDirection,
        slot_count: u32,
    ) {
        let kind = match (self.stage, direction, semantic) {
            (ShaderStage::Vertex, VaryingDirection::Input, Some(sem)) if sem.system_value => None,
            (ShaderStage::Vertex, VaryingDirection::Input, _) => Some(ResourceKind::VertexInput),
            (ShaderStage::Fragment, VaryingDirection::Output, Some(sem)) if sem.render_target => {
                Some(ResourceKind::FragmentOutput)
            }
            _ => None,
        };
        let end = match index.checked_add(slot_count) {
            Some(end) => end,
            None => {
                // Everything after this slot is out of range too.
                *index = u32::MAX;
                self.out_of_range.push(name);
                return;
            }
        };
        log::trace!("varying {} uses semantic slots {}..{}", name, *index, end);
        self.varyings.push(VaryingLayout {
            name,
            direction,
            semantic_name: semantic.map(|sem| sem.name.to_string()),
            semantic_index: *index,
            slot_count,
            kind,
        });
        *index = end;
    }
}

/// Flatten the signature of `function` into varyings.
///
/// Declarations whose semantic slots do not fit in a `u32` are left out and
/// their paths returned separately.
pub(super) fn collect_varyings(
    types: &UniqueArena<Type>,
    function: &Function,
    stage: ShaderStage,
) -> (Vec<VaryingLayout>, Vec<String>) {
    let mut collector = VaryingCollector {
        types,
        stage,
        varyings: Vec::new(),
        out_of_range: Vec::new(),
    };
    let mut input_index = 0;
    let mut output_index = 0;

    for argument in function.arguments.iter() {
        if argument.direction.is_input() {
            collector.visit_declaration(
                argument.name.clone(),
                argument.ty,
                argument.semantic.as_deref(),
                None,
                &mut input_index,
                VaryingDirection::Input,
            );
        }
        if argument.direction.is_output() {
            collector.visit_declaration(
                argument.name.clone(),
                argument.ty,
                argument.semantic.as_deref(),
                None,
                &mut output_index,
                VaryingDirection::Output,
            );
        }
    }

    if let Some(ref result) = function.result {
        collector.visit_declaration(
            "result".to_string(),
            result.ty,
            result.semantic.as_deref(),
            None,
            &mut output_index,
            VaryingDirection::Output,
        );
    }

    (collector.varyings, collector.out_of_range)
}
