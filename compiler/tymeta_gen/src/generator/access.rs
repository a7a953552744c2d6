//! Metadata sources, access strategies and accessors.

use std::sync::OnceLock;

use tymeta_abi::{FunctionMetadataConvention, FunctionTypeFlags};
use tymeta_ir::{DeclId, FunctionRepresentation, FunctionTypeRef, ProtocolId, TypeRef};
use tymeta_rt::witness::{builtin_metadata, empty_tuple_metadata};
use tymeta_rt::{ArgumentSource, MetadataAccessor, MetadataRef, MetadataSource};

use super::nominal::Emitted;
use super::{AccessStrategy, DeclState, MetadataGenerator};
use crate::conformance::{describe, ArgumentLayout};
use crate::error::{MetadataError, Result};
use crate::protocol::protocol_constants;
use crate::sink::CodegenSink;
use crate::symbol::Linkage;
use crate::type_info::check_arguments;

fn convention(repr: FunctionRepresentation) -> FunctionMetadataConvention {
    match repr {
        FunctionRepresentation::Thick => FunctionMetadataConvention::Swift,
        FunctionRepresentation::Thin => FunctionMetadataConvention::Thin,
        FunctionRepresentation::Block => FunctionMetadataConvention::Block,
        FunctionRepresentation::CFunctionPointer => FunctionMetadataConvention::CFunctionPointer,
    }
}

/// Evaluate `source` in no generic context. Failing here means a record the
/// generator built cannot be instantiated, which generated code cannot
/// recover from either.
fn resolve_or_abort(name: &str, source: &MetadataSource) -> MetadataRef {
    source.resolve(&[]).unwrap_or_else(|| {
        tracing::error!(accessor = name, "metadata could not be instantiated");
        panic!("accessor `{name}` could not instantiate its metadata")
    })
}

impl<S: CodegenSink> MetadataGenerator<'_, S> {
    /// How `ty`'s metadata is reached from code outside any generic context.
    pub fn access_strategy(&mut self, ty: &TypeRef) -> Result<AccessStrategy> {
        let strategy = match ty {
            TypeRef::Builtin(_) => AccessStrategy::Direct,
            TypeRef::Tuple(elements) if elements.is_empty() => AccessStrategy::Direct,
            TypeRef::Nominal { decl, args } if args.is_empty() => {
                let built = self.built(*decl)?;
                let linkage = self
                    .table
                    .nominal(*decl)
                    .map_or(Linkage::Private, |d| Linkage::from(d.linkage));
                match built.emitted {
                    Emitted::Constant(_) if self.options.prefer_direct_access => {
                        AccessStrategy::Direct
                    }
                    _ => AccessStrategy::Accessor(linkage),
                }
            }
            _ => AccessStrategy::Accessor(Linkage::SharedNonUnique),
        };
        tracing::trace!(ty = %describe(self.table, ty), ?strategy, "access strategy");
        Ok(strategy)
    }

    /// The metadata record of `ty`, which must not mention generic
    /// parameters.
    pub fn metadata(&mut self, ty: &TypeRef) -> Result<MetadataRef> {
        if self.access_strategy(ty)? == AccessStrategy::Direct {
            if let MetadataSource::Direct(metadata) = self.metadata_source(ty, None)? {
                return Ok(metadata);
            }
        }
        Ok(self.accessor(ty)?.get())
    }

    /// The accessor for `ty`, created on first request.
    pub fn accessor(&mut self, ty: &TypeRef) -> Result<&'static MetadataAccessor> {
        if let Some(&accessor) = self.accessors.get(ty) {
            return Ok(accessor);
        }
        if ty.has_params() {
            return Err(MetadataError::unimplemented(
                "accessor for a type with unbound generic parameters",
            ));
        }
        let accessor = match self.metadata_source(ty, None)? {
            MetadataSource::Accessor(accessor) => accessor,
            source => {
                let name = format!("{}.accessor", describe(self.table, ty));
                MetadataAccessor::leak(name.clone(), move || resolve_or_abort(&name, &source))
            }
        };
        tracing::debug!(
            accessor = accessor.name(),
            ordering = ?self.options.cache_ordering,
            "metadata accessor"
        );
        self.accessors.insert(ty.clone(), accessor);
        Ok(accessor)
    }

    /// How to find `ty`'s metadata at runtime, inside a declaration whose
    /// generic arguments are laid out as `context`.
    pub(super) fn metadata_source(
        &mut self,
        ty: &TypeRef,
        context: Option<&ArgumentLayout>,
    ) -> Result<MetadataSource> {
        Ok(match ty {
            TypeRef::Builtin(builtin) => MetadataSource::Direct(builtin_metadata(*builtin)),
            TypeRef::Param(param) => match context {
                Some(context) => context.param_source(*param)?,
                None => {
                    return Err(MetadataError::unimplemented(
                        "generic parameter outside its declaration",
                    ))
                }
            },
            TypeRef::Nominal { decl, args } => self.nominal_source(*decl, args, context)?,
            TypeRef::Tuple(elements) if elements.is_empty() => {
                MetadataSource::Direct(empty_tuple_metadata())
            }
            TypeRef::Tuple(elements) => {
                let mut sources = Vec::with_capacity(elements.len());
                for element in elements {
                    sources.push(self.metadata_source(element, context)?);
                }
                MetadataSource::Tuple(sources)
            }
            TypeRef::Function(function) => self.function_source(function, context)?,
            TypeRef::Existential(protocols) => {
                let mut descriptors = Vec::with_capacity(protocols.len());
                for &protocol in protocols {
                    descriptors.push(self.protocol_descriptor(protocol)?);
                }
                MetadataSource::Existential(descriptors)
            }
            TypeRef::Metatype(instance) => {
                MetadataSource::Metatype(Box::new(self.metadata_source(instance, context)?))
            }
            TypeRef::ExistentialMetatype(instance) => MetadataSource::ExistentialMetatype(
                Box::new(self.metadata_source(instance, context)?),
            ),
            TypeRef::InOut(_) => {
                return Err(MetadataError::unimplemented(
                    "inout type outside a parameter list",
                ))
            }
            TypeRef::Module => return Err(MetadataError::unimplemented("metadata for a module")),
        })
    }

    fn function_source(
        &mut self,
        function: &FunctionTypeRef,
        context: Option<&ArgumentLayout>,
    ) -> Result<MetadataSource> {
        if function.polymorphic {
            return Err(MetadataError::unimplemented(
                "metadata for a polymorphic function type",
            ));
        }
        if function.params.len() > FunctionTypeFlags::MAX_ARGUMENTS {
            return Err(MetadataError::unimplemented(
                "function type with too many parameters",
            ));
        }
        let mut params = Vec::with_capacity(function.params.len());
        for param in &function.params {
            params.push(match param {
                TypeRef::InOut(inner) => (self.metadata_source(inner, context)?, true),
                other => (self.metadata_source(other, context)?, false),
            });
        }
        let result = self.metadata_source(&function.result, context)?;
        let flags = FunctionTypeFlags::new()
            .with_num_arguments(params.len())
            .with_convention(convention(function.repr))
            .with_throws(function.throws);
        Ok(MetadataSource::Function {
            flags,
            params,
            result: Box::new(result),
        })
    }

    fn nominal_source(
        &mut self,
        id: DeclId,
        args: &[TypeRef],
        context: Option<&ArgumentLayout>,
    ) -> Result<MetadataSource> {
        let table = self.table;
        let decl = table
            .nominal(id)
            .ok_or(MetadataError::UnknownDecl(id))?;
        check_arguments(table, decl, args.len())?;

        let mut words = Vec::new();
        for (arg, param) in args.iter().zip(&decl.generic_params) {
            words.push(ArgumentSource::Metadata(self.metadata_source(arg, context)?));
            for &protocol in &param.conformances {
                let needs_table = table
                    .protocol(protocol)
                    .ok_or(MetadataError::UnknownProtocol(protocol))?
                    .needs_witness_table();
                if needs_table {
                    words.push(
                        self.conformances
                            .witness_source(table, arg, protocol, context)?,
                    );
                }
            }
        }

        if let Some(DeclState::Building(pending)) = self.decls.get_mut(&id) {
            let cell: &'static OnceLock<MetadataSource> = Box::leak(Box::new(OnceLock::new()));
            pending.push((cell, words));
            tracing::trace!(decl = table.name(decl.name), "deferred self reference");
            return Ok(MetadataSource::Deferred(cell));
        }
        Ok(match self.built(id)?.emitted {
            Emitted::Constant(metadata) => MetadataSource::Direct(metadata),
            Emitted::Initialized { accessor, .. } => MetadataSource::Accessor(accessor),
            Emitted::Pattern(pattern) => MetadataSource::Generic {
                pattern,
                args: words,
            },
        })
    }

    /// Address of protocol `id`'s descriptor, defining it on first request.
    pub fn protocol_descriptor(&mut self, id: ProtocolId) -> Result<usize> {
        if let Some(&address) = self.protocols.get(&id) {
            return Ok(address);
        }
        let constants = protocol_constants(self.table, id)?;
        let mut address = None;
        for (name, buffer) in constants.constants {
            let linkage = if name == constants.descriptor {
                Linkage::Public
            } else {
                Linkage::Private
            };
            let defined = self.sink.define_constant(&name, linkage, buffer)?;
            if name == constants.descriptor {
                address = Some(defined);
            }
        }
        let address = address.ok_or_else(|| MetadataError::UnresolvedSymbol {
            symbol: constants.descriptor.clone(),
        })?;
        self.protocols.insert(id, address);
        // Inherited descriptors resolve the list's forward references.
        for parent in constants.inherited {
            self.protocol_descriptor(parent)?;
        }
        Ok(address)
    }
}
