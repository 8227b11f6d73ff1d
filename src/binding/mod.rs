/*! Shader parameter binding.

[`bind`] runs four phases over a [`CompileRequest`]:

1. *Collect*: every global that is a shader parameter gets a type layout and
   is grouped with same-named declarations from other translation units.
   Requested entry points are resolved and their varyings flattened.
2. *Reconcile*: explicit `register` annotations are committed and their slots
   reserved.
3. *Auto-allocate*: every resource kind a parameter still lacks a location
   for is assigned the first free slots in space 0.
4. *Materialize*: the parameters become the fields of one global-scope
   struct, which is wrapped in a constant buffer if any parameter holds
   uniform data.

Conditions a user can fix are recorded as [`BindingDiagnostic`]s; with
[`ConflictPolicy::Fail`] any of them fails the whole request.
*/

mod entry_point;
mod ranges;
mod semantics;

pub use entry_point::{EntryPointLayout, VaryingDirection, VaryingLayout};
pub use ranges::{UsedRange, UsedRanges};
pub use semantics::{
    parse_register, ProfileError, RegisterBinding, RegisterError, SimpleSemantic,
};

use crate::{
    arena::{Arena, Handle, UniqueArena},
    proc::{
        DeclRef, LayoutRule, ResourceKind, TypeLayout, TypeLayoutInner, TypeLayouter, VarLayout,
        VarLayoutFlags, VarResourceInfo,
    },
    CompileRequest, EntryPointRequest, FastHashMap, TranslationUnit, Type,
};
use std::{collections::BTreeMap, fmt};

/// Name diagnostics use for the implicit global constant buffer.
pub const GLOBAL_SCOPE_NAME: &str = "$Globals";

/// What to do when the request has user-diagnosable problems.
#[derive(Clone, Copy, Debug, Default, Hash, Eq, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
#[cfg_attr(feature = "deserialize", derive(serde::Deserialize))]
pub enum ConflictPolicy {
    /// Record diagnostics on the [`ProgramLayout`] and keep going.
    #[default]
    Report,
    /// Fail the request if anything was diagnosed.
    Fail,
}

/// Configuration for [`bind`].
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
#[cfg_attr(feature = "deserialize", derive(serde::Deserialize))]
#[cfg_attr(feature = "deserialize", serde(default))]
pub struct Options {
    /// Rules for laying out global-scope parameters.
    pub layout_rules: LayoutRule,
    pub conflict_policy: ConflictPolicy,
    /// Fragment `SV_Target` outputs claim the unordered-access slots with the
    /// same numbers.
    pub reserve_render_target_slots: bool,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            layout_rules: LayoutRule::HlslConstantBuffer,
            conflict_policy: ConflictPolicy::Report,
            reserve_render_target_slots: true,
        }
    }
}

/// A committed `(space, index, count)` binding for one resource kind.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
#[cfg_attr(feature = "deserialize", derive(serde::Deserialize))]
pub struct BindingLocation {
    pub space: u32,
    pub index: u32,
    pub count: u32,
}

impl fmt::Display for BindingLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "slots {}..{} of space {}",
            self.index,
            u64::from(self.index) + u64::from(self.count),
            self.space
        )
    }
}

#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum BindingDiagnostic {
    #[error("`register({register})` on `{name}` is ignored: {source}")]
    InvalidRegister {
        name: String,
        register: String,
        source: RegisterError,
    },
    #[error("`{name}` is bound to a {kind:?} register but uses no resource of that kind")]
    UnusedExplicitBinding { name: String, kind: ResourceKind },
    #[error("`{name}` has conflicting {kind:?} bindings: {first} and {second}")]
    ConflictingExplicitBinding {
        name: String,
        kind: ResourceKind,
        first: BindingLocation,
        second: BindingLocation,
    },
    #[error("`{name}` claims {kind:?} {location}, which is already in use")]
    RegisterCollision {
        name: String,
        kind: ResourceKind,
        location: BindingLocation,
    },
    #[error("`{name}` claims {kind:?} {location}, which ends past the last register")]
    RegisterOutOfRange {
        name: String,
        kind: ResourceKind,
        location: BindingLocation,
    },
    #[error("`{name}` needs {count} {kind:?} slot(s) but no free range that large is left")]
    OutOfRegisters {
        name: String,
        kind: ResourceKind,
        count: u32,
    },
    #[error("`{name}` is too large to lay out")]
    LayoutTooLarge { name: String },
    #[error("`{name}` is declared with incompatible layouts, treating the declarations as different parameters")]
    ParameterMismatch { name: String },
    #[error("`{varying}` of entry point `{entry_point}` has semantic slots past the last index")]
    SemanticOutOfRange {
        entry_point: String,
        varying: String,
    },
    #[error("entry point `{name}` is not declared in translation unit {unit}")]
    MissingEntryPoint { name: String, unit: usize },
    #[error("entry point `{name}` is declared more than once in translation unit {unit}")]
    AmbiguousEntryPoint { name: String, unit: usize },
    #[error("entry point `{name}` in translation unit {unit} is not a function")]
    NotAFunction { name: String, unit: usize },
}

#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum BindingError {
    #[error("binding rejected with {} diagnostic(s), the first being: {}", .0.len(), .0[0])]
    Rejected(Vec<BindingDiagnostic>),
}

/// The layout of everything declared at global scope.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
#[cfg_attr(feature = "deserialize", derive(serde::Deserialize))]
pub enum GlobalScopeLayout {
    /// No parameter holds uniform data.
    Struct(Handle<TypeLayout>),
    /// Uniform parameters live in an implicit constant buffer.
    ConstantBuffer {
        layout: Handle<TypeLayout>,
        element: Handle<TypeLayout>,
        binding: VarResourceInfo,
    },
}

impl GlobalScopeLayout {
    /// The outermost layout node.
    pub const fn type_layout(&self) -> Handle<TypeLayout> {
        match *self {
            Self::Struct(layout) | Self::ConstantBuffer { layout, .. } => layout,
        }
    }

    /// The struct whose fields are the parameters.
    pub const fn struct_layout(&self) -> Handle<TypeLayout> {
        match *self {
            Self::Struct(layout) | Self::ConstantBuffer {
                element: layout, ..
            } => layout,
        }
    }
}

/// Result of binding a [`CompileRequest`].
#[derive(Clone, Debug)]
pub struct ProgramLayout {
    pub types: UniqueArena<Type>,
    pub type_layouts: Arena<TypeLayout>,
    pub var_layouts: Arena<VarLayout>,
    pub global_scope: GlobalScopeLayout,
    pub entry_points: Vec<EntryPointLayout>,
    pub diagnostics: Vec<BindingDiagnostic>,
}

impl ProgramLayout {
    /// One layout per logical parameter, in discovery order.
    pub fn parameters(&self) -> &[Handle<VarLayout>] {
        match self.type_layouts[self.global_scope.struct_layout()].inner {
            TypeLayoutInner::Struct { ref fields, .. } => fields,
            _ => &[],
        }
    }

    /// Look up the layout of a particular global declaration.
    pub fn find_declaration(&self, decl: DeclRef) -> Option<Handle<VarLayout>> {
        match self.type_layouts[self.global_scope.struct_layout()].inner {
            TypeLayoutInner::Struct {
                ref var_to_layout, ..
            } => var_to_layout.get(&decl).copied(),
            _ => None,
        }
    }
}

/// Binding state of one logical parameter.
#[derive(Debug)]
struct ParameterInfo {
    name: String,
    /// Every declaration of the parameter, the first one being canonical.
    var_layouts: Vec<Handle<VarLayout>>,
    bindings: [Option<BindingLocation>; ResourceKind::COUNT],
}

impl ParameterInfo {
    fn first(&self) -> Handle<VarLayout> {
        self.var_layouts[0]
    }
}

struct Binder<'a> {
    request: &'a CompileRequest,
    options: &'a Options,
    layouter: TypeLayouter<'a>,
    parameters: Vec<ParameterInfo>,
    by_name: FastHashMap<String, Vec<usize>>,
    used: BTreeMap<(ResourceKind, u32), UsedRanges>,
    entry_points: Vec<EntryPointLayout>,
    diagnostics: Vec<BindingDiagnostic>,
}

impl<'a> Binder<'a> {
    fn new(request: &'a CompileRequest, options: &'a Options) -> Self {
        Self {
            request,
            options,
            layouter: TypeLayouter::new(&request.types),
            parameters: Vec::new(),
            by_name: FastHashMap::default(),
            used: BTreeMap::new(),
            entry_points: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    fn report(&mut self, diagnostic: BindingDiagnostic) {
        log::warn!("{}", diagnostic);
        self.diagnostics.push(diagnostic);
    }

    fn ranges(&mut self, kind: ResourceKind, space: u32) -> &mut UsedRanges {
        self.used.entry((kind, space)).or_default()
    }

    fn collect(&mut self) {
        let request = self.request;
        for (unit_index, unit) in request.translation_units.iter().enumerate() {
            for (handle, var) in unit.global_variables.iter() {
                if !var.is_shader_parameter() {
                    log::trace!("skipping non-parameter global {}", var.name);
                    continue;
                }
                self.collect_parameter(
                    DeclRef::Global {
                        unit: unit_index,
                        var: handle,
                    },
                    &var.name,
                    var.ty,
                );
            }
            for entry_point in unit.entry_points.iter() {
                self.collect_entry_point(unit_index, unit, entry_point);
            }
        }
        log::debug!(
            "collected {} parameters and {} entry points",
            self.parameters.len(),
            self.entry_points.len()
        );
    }

    fn collect_parameter(&mut self, decl: DeclRef, name: &str, ty: Handle<Type>) {
        let rules = self.options.layout_rules;
        let candidates = self.by_name.get(name).cloned().unwrap_or_default();

        // Same type means same layout, so the first declaration's tree is shared.
        let same_type = candidates.iter().copied().find(|&index| {
            let first = &self.layouter.var_layouts[self.parameters[index].first()];
            self.layouter.type_layouts[first.type_layout].ty == Some(ty)
        });
        let (type_layout, matched) = match same_type {
            Some(index) => {
                let first = self.parameters[index].first();
                (self.layouter.var_layouts[first].type_layout, Some(index))
            }
            None => {
                let type_layout = self.layouter.create_type_layout(ty, rules);
                if self.layouter.type_layouts[type_layout].is_oversized() {
                    self.report(BindingDiagnostic::LayoutTooLarge {
                        name: name.to_string(),
                    });
                    return;
                }
                let matched = candidates.iter().copied().find(|&index| {
                    let first = self.parameters[index].first();
                    let existing = self.layouter.var_layouts[first].type_layout;
                    self.layouter.same_layout(existing, type_layout)
                });
                (type_layout, matched)
            }
        };

        let mut var = VarLayout::new(decl, name.to_string(), type_layout);
        match matched {
            Some(index) => {
                var.flags |= VarLayoutFlags::IS_REDECLARATION;
                let handle = self.layouter.var_layouts.append(var);
                self.parameters[index].var_layouts.push(handle);
            }
            None => {
                if !candidates.is_empty() {
                    self.report(BindingDiagnostic::ParameterMismatch {
                        name: name.to_string(),
                    });
                }
                let handle = self.layouter.var_layouts.append(var);
                self.by_name
                    .entry(name.to_string())
                    .or_default()
                    .push(self.parameters.len());
                self.parameters.push(ParameterInfo {
                    name: name.to_string(),
                    var_layouts: vec![handle],
                    bindings: [None; ResourceKind::COUNT],
                });
            }
        }
    }

    fn collect_entry_point(
        &mut self,
        unit_index: usize,
        unit: &'a TranslationUnit,
        request: &EntryPointRequest,
    ) {
        let mut matches = unit
            .functions
            .iter()
            .filter(|&(_, function)| function.name == request.name);
        let (handle, function) = match (matches.next(), matches.next()) {
            (Some(found), None) => found,
            (Some(_), Some(_)) => {
                self.report(BindingDiagnostic::AmbiguousEntryPoint {
                    name: request.name.clone(),
                    unit: unit_index,
                });
                return;
            }
            (None, _) => {
                let is_variable = unit
                    .global_variables
                    .fetch_if(|var| var.name == request.name)
                    .is_some();
                let name = request.name.clone();
                self.report(if is_variable {
                    BindingDiagnostic::NotAFunction {
                        name,
                        unit: unit_index,
                    }
                } else {
                    BindingDiagnostic::MissingEntryPoint {
                        name,
                        unit: unit_index,
                    }
                });
                return;
            }
        };

        let (varyings, out_of_range) =
            entry_point::collect_varyings(&self.request.types, function, request.profile.stage);
        for varying in out_of_range {
            self.report(BindingDiagnostic::SemanticOutOfRange {
                entry_point: request.name.clone(),
                varying,
            });
        }
        let layout = EntryPointLayout {
            name: request.name.clone(),
            unit: unit_index,
            function: handle,
            profile: request.profile,
            workgroup_size: function.workgroup_size,
            varyings,
        };

        if self.options.reserve_render_target_slots {
            let targets: Vec<_> = layout.render_targets().collect();
            for target in targets {
                log::debug!(
                    "entry point {} reserves render target slots {:?}",
                    layout.name,
                    target
                );
                self.ranges(ResourceKind::UnorderedAccess, 0)
                    .add(target.start, target.end);
            }
        }
        self.entry_points.push(layout);
    }

    fn reconcile(&mut self) {
        let request = self.request;
        for index in 0..self.parameters.len() {
            for position in 0..self.parameters[index].var_layouts.len() {
                let handle = self.parameters[index].var_layouts[position];
                let var = &self.layouter.var_layouts[handle];
                let global = match var.decl {
                    DeclRef::Global { unit, var: global } => {
                        &request.translation_units[unit].global_variables[global]
                    }
                    DeclRef::Member { .. } => continue,
                };
                let type_layout = var.type_layout;

                for semantic in global.registers.iter() {
                    let name = &self.parameters[index].name;
                    let binding = match parse_register(semantic) {
                        Ok(binding) => binding,
                        Err(source) => {
                            let diagnostic = BindingDiagnostic::InvalidRegister {
                                name: name.clone(),
                                register: semantic.register.clone(),
                                source,
                            };
                            self.report(diagnostic);
                            continue;
                        }
                    };

                    let count = self.layouter.type_layouts[type_layout].size(binding.kind);
                    if count == 0 {
                        let diagnostic = BindingDiagnostic::UnusedExplicitBinding {
                            name: name.clone(),
                            kind: binding.kind,
                        };
                        self.report(diagnostic);
                        continue;
                    }
                    let location = BindingLocation {
                        space: binding.space,
                        index: binding.index,
                        count,
                    };
                    let end = match binding.index.checked_add(count) {
                        Some(end) => end,
                        None => {
                            let diagnostic = BindingDiagnostic::RegisterOutOfRange {
                                name: name.clone(),
                                kind: binding.kind,
                                location,
                            };
                            self.report(diagnostic);
                            continue;
                        }
                    };
                    self.commit_explicit(index, binding.kind, location, end);
                }
            }
        }
    }

    fn commit_explicit(
        &mut self,
        index: usize,
        kind: ResourceKind,
        location: BindingLocation,
        end: u32,
    ) {
        let name = self.parameters[index].name.clone();
        match self.parameters[index].bindings[kind.index()] {
            Some(first) if first == location => {}
            Some(first) => {
                self.report(BindingDiagnostic::ConflictingExplicitBinding {
                    name,
                    kind,
                    first,
                    second: location,
                });
            }
            None => {
                log::debug!("{} explicitly bound to {:?} {}", name, kind, location);
                self.parameters[index].bindings[kind.index()] = Some(location);
                let ranges = self.ranges(kind, location.space);
                let collides = ranges.overlaps(location.index, end);
                ranges.add(location.index, end);
                if collides {
                    self.report(BindingDiagnostic::RegisterCollision {
                        name,
                        kind,
                        location,
                    });
                }
            }
        }
    }

    fn has_global_uniforms(&self) -> bool {
        self.parameters.iter().any(|parameter| {
            let first = &self.layouter.var_layouts[parameter.first()];
            self.layouter.type_layouts[first.type_layout]
                .find_resource(ResourceKind::Uniform)
                .is_some()
        })
    }

    fn allocate(&mut self) {
        for index in 0..self.parameters.len() {
            let first = self.parameters[index].first();
            let type_layout = self.layouter.var_layouts[first].type_layout;
            let resources = self.layouter.type_layouts[type_layout].resources.clone();

            for res in resources {
                // Uniform bytes are placed when the global scope is built.
                if res.kind == ResourceKind::Uniform
                    || self.parameters[index].bindings[res.kind.index()].is_some()
                {
                    continue;
                }
                let slot = match self.ranges(res.kind, 0).allocate(res.count) {
                    Some(slot) => slot,
                    None => {
                        let diagnostic = BindingDiagnostic::OutOfRegisters {
                            name: self.parameters[index].name.clone(),
                            kind: res.kind,
                            count: res.count,
                        };
                        self.report(diagnostic);
                        continue;
                    }
                };
                let location = BindingLocation {
                    space: 0,
                    index: slot,
                    count: res.count,
                };
                log::debug!(
                    "{} allocated {:?} {}",
                    self.parameters[index].name,
                    res.kind,
                    location
                );
                self.parameters[index].bindings[res.kind.index()] = Some(location);
            }

            let has_uniform = self.layouter.type_layouts[type_layout]
                .find_resource(ResourceKind::Uniform)
                .is_some();
            let parameter = &self.parameters[index];
            for &handle in parameter.var_layouts.iter() {
                let var = &mut self.layouter.var_layouts[handle];
                for kind in ResourceKind::ALL {
                    if kind == ResourceKind::Uniform {
                        if has_uniform {
                            var.find_or_add_resource(kind);
                        }
                        continue;
                    }
                    if let Some(location) = parameter.bindings[kind.index()] {
                        let res = var.find_or_add_resource(kind);
                        res.space = location.space;
                        res.index = location.index;
                    }
                }
            }
        }
    }

    fn materialize(&mut self, global_buffer: Option<VarResourceInfo>) -> GlobalScopeLayout {
        let rule = self.options.layout_rules;
        let rules = rule.rules();
        let mut info = rules.begin_struct_layout();
        let mut global = TypeLayout {
            ty: None,
            rules: rule,
            resources: Vec::new(),
            uniform_alignment: 1,
            inner: TypeLayoutInner::Simple,
        };
        let mut fields = Vec::with_capacity(self.parameters.len());
        let mut var_to_layout = FastHashMap::default();

        for parameter in self.parameters.iter() {
            let first = parameter.first();
            let type_layout = &self.layouter.type_layouts[self.layouter.var_layouts[first].type_layout];
            let uniform = type_layout.uniform();

            for res in type_layout.resources.iter() {
                if res.kind != ResourceKind::Uniform {
                    global.add_resource(res.kind, res.count);
                }
            }

            if uniform.size != 0 {
                let offset = rules.add_struct_field(&mut info, uniform);
                log::debug!("{} placed at uniform offset {}", parameter.name, offset);
                for &handle in parameter.var_layouts.iter() {
                    let var = &mut self.layouter.var_layouts[handle];
                    let res = var.find_or_add_resource(ResourceKind::Uniform);
                    res.space = 0;
                    res.index = offset;
                }
            }

            fields.push(first);
            for &handle in parameter.var_layouts.iter() {
                var_to_layout.insert(self.layouter.var_layouts[handle].decl, handle);
            }
        }

        rules.end_struct_layout(&mut info);
        if info.size == u32::MAX {
            self.report(BindingDiagnostic::LayoutTooLarge {
                name: GLOBAL_SCOPE_NAME.to_string(),
            });
        }
        if info.size != 0 {
            global.add_resource(ResourceKind::Uniform, info.size);
        }
        global.uniform_alignment = info.alignment;
        global.inner = TypeLayoutInner::Struct {
            fields,
            var_to_layout,
        };
        let element = self.layouter.type_layouts.append(global);

        match global_buffer {
            Some(binding) => GlobalScopeLayout::ConstantBuffer {
                layout: self.layouter.wrap_constant_buffer(None, element, rule),
                element,
                binding,
            },
            None => GlobalScopeLayout::Struct(element),
        }
    }
}

/// Compute layouts and bindings for every shader parameter in `request`.
pub fn bind(request: &CompileRequest, options: &Options) -> Result<ProgramLayout, BindingError> {
    let mut binder = Binder::new(request, options);

    binder.collect();
    binder.reconcile();

    let global_buffer = if binder.has_global_uniforms() {
        match binder.ranges(ResourceKind::ConstantBuffer, 0).allocate(1) {
            Some(index) => {
                log::debug!("global constant buffer allocated at b{}", index);
                Some(VarResourceInfo {
                    kind: ResourceKind::ConstantBuffer,
                    space: 0,
                    index,
                })
            }
            None => {
                binder.report(BindingDiagnostic::OutOfRegisters {
                    name: GLOBAL_SCOPE_NAME.to_string(),
                    kind: ResourceKind::ConstantBuffer,
                    count: 1,
                });
                None
            }
        }
    } else {
        None
    };

    binder.allocate();
    let global_scope = binder.materialize(global_buffer);

    let Binder {
        layouter,
        entry_points,
        diagnostics,
        ..
    } = binder;

    if options.conflict_policy == ConflictPolicy::Fail && !diagnostics.is_empty() {
        return Err(BindingError::Rejected(diagnostics));
    }

    let (type_layouts, var_layouts) = layouter.finish();
    Ok(ProgramLayout {
        types: request.types.clone(),
        type_layouts,
        var_layouts,
        global_scope,
        entry_points,
        diagnostics,
    })
}
