//! Metadata collection over a handler hierarchy.
//!
//! The walk visits the type itself, then each implemented interface
//! (recursively), then the superclass (recursively). Methods are correlated
//! by name only: two methods of the same name anywhere in the hierarchy are
//! treated as the same endpoint, overloads included. One route per method
//! name per handler type is therefore the supported model.

use crate::handler::{HandlerMethod, HandlerType};
use crate::logging::{debug, trace};
use crate::metadata::{COLLECTED_KINDS, Metadata, MetadataSet, ParamMetadata};
use std::sync::Arc;

/// Metadata gathered for one method name.
#[derive(Debug, Clone)]
pub struct CollectedMethod {
    /// The most-derived declaration of the method
    pub method: Arc<HandlerMethod>,
    pub metadata: MetadataSet,
    /// Parameter metadata per formal index of `method`
    pub params: Vec<Vec<ParamMetadata>>,
}

/// All methods reachable from `ty`, in walk order. The same name may
/// appear several times.
pub fn collect_methods(ty: &HandlerType) -> Vec<Arc<HandlerMethod>> {
    let mut methods: Vec<Arc<HandlerMethod>> = ty.methods().to_vec();

    for interface in ty.interfaces() {
        methods.extend(collect_methods(interface));
    }

    if let Some(superclass) = ty.superclass() {
        methods.extend(collect_methods(superclass));
    }

    methods
}

/// Collect method metadata for `ty`, in order of first discovery.
///
/// For each method name at most one item per metadata kind is kept: the
/// first one met during the walk, which is the most-derived declaration.
/// Methods carrying no recognized metadata are left out.
pub fn collect(ty: &HandlerType) -> Vec<CollectedMethod> {
    let methods = collect_methods(ty);
    let mut collected: Vec<(String, MetadataSet)> = Vec::new();

    for method in &methods {
        for kind in COLLECTED_KINDS {
            let Some(item) = method.metadata().iter().find(|m| m.kind() == *kind) else {
                continue;
            };
            add(&mut collected, method.name(), item.clone());
        }
    }

    let output: Vec<CollectedMethod> = collected
        .into_iter()
        .filter_map(|(name, metadata)| {
            let method = methods.iter().find(|m| m.name() == name)?.clone();
            let params = collect_params(&methods, &method);
            trace!(
                owner = ty.name(),
                method = %name,
                items = metadata.len(),
                "Collected method metadata"
            );
            Some(CollectedMethod {
                method,
                metadata,
                params,
            })
        })
        .collect();

    debug!(
        owner = ty.name(),
        reachable = methods.len(),
        annotated = output.len(),
        "Metadata collection finished"
    );

    output
}

fn add(collected: &mut Vec<(String, MetadataSet)>, name: &str, item: Metadata) {
    match collected.iter_mut().find(|(n, _)| n == name) {
        Some((_, set)) => {
            set.insert(item);
        }
        None => {
            let mut set = MetadataSet::new();
            set.insert(item);
            collected.push((name.to_string(), set));
        }
    }
}

/// Parameter metadata for each formal index of `method`, taken from the
/// first same-named method in the walk that declares any for that index.
fn collect_params(methods: &[Arc<HandlerMethod>], method: &HandlerMethod) -> Vec<Vec<ParamMetadata>> {
    (0..method.params().len())
        .map(|index| {
            methods
                .iter()
                .filter(|m| m.name() == method.name())
                .filter_map(|m| m.params().get(index))
                .find(|p| !p.metadata().is_empty())
                .map(|p| p.metadata().to_vec())
                .unwrap_or_default()
        })
        .collect()
}

/// First type in the hierarchy of `ty` declaring a type-level path:
/// the type itself, then its direct interfaces, then its superclass chain.
pub fn type_with_path(ty: &HandlerType) -> Option<&HandlerType> {
    if ty.has_path() {
        return Some(ty);
    }

    if let Some(interface) = ty.interfaces().iter().find(|i| i.has_path()) {
        return Some(interface.as_ref());
    }

    ty.superclass().and_then(|superclass| type_with_path(superclass.as_ref()))
}
