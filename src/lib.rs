// Armature REST - declarative routes for Armature resources
//
// Handler types describe their endpoints once. This library compiles those
// descriptions into route definitions at bootstrap and binds request data to
// handler arguments at request time.

// Re-export core functionality
pub use armature_rest_core::*;

// Prelude for common imports
pub mod prelude {
    pub use crate::{
        ArgumentBinder,
        Arguments,
        CompiledRoute,
        Container,
        ContextCache,
        ContextError,
        ContextProvider,
        ContextProviderRegistry,
        Error,
        FormalParam,
        HandlerMethod,
        HandlerType,
        HttpMethod,
        HttpRequest,
        ParameterSource,
        ReadError,
        ReaderRegistry,
        RequestContext,
        Resource,
        RestConfig,
        RouteCompiler,
        RouteDefinition,
        RouteTable,
        Value,
        ValueReader,
        ValueType,
        compile,
        compile_resource,
    };
}
