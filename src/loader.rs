use std::sync::Arc ;
use std::sync::atomic::{ AtomicUsize, Ordering };
use thiserror::Error ;
use wasmtime::{ Engine, Linker };

use crate::{ CodeImage, CodeResolver, ContextData, IsolatedContext, PluginHandle, PluginProxy };
use crate::{ ResolveError, TypeName, UnitName };
use crate::context::ContextError ;



/// Errors that can occur while loading a plugin.
///
/// Nothing is retried: every failure of the resolver or of the context's loading
/// machinery reaches the caller as-is.
#[derive( Debug, Error )]
pub enum LoadError {

	/// A unit or type name was blank.
	#[error( "Invalid argument: {0}" )]
	InvalidArgument( &'static str ),

	/// The resolver has no image for the requested unit.
	#[error( "Unit not found: {0}" )]
	UnitNotFound( UnitName ),

	/// The resolver failed to read the unit's image.
	#[error( "Failed to read unit '{unit}': {source}" )]
	Io { unit: UnitName, #[source] source: std::io::Error },

	/// The unit doesn't define the requested type.
	#[error( "Type '{type_name}' not found in unit '{unit}'" )]
	TypeNotFound { unit: UnitName, type_name: TypeName },

	/// The type's constructor export exists but is not a function.
	#[error( "Constructor of '{type_name}' is not invokable" )]
	AccessDenied { type_name: TypeName },

	/// The type's constructor doesn't have the `() -> i32` signature.
	#[error( "Constructor of '{type_name}' has an unsupported signature: {error}" )]
	ArgumentError { type_name: TypeName, error: wasmtime::Error },

	/// The context can't be used (unloaded, poisoned or missing its resolver bridge).
	#[error( "Context unavailable: {0}" )]
	ContextUnavailable( #[from] ContextError ),

	/// The image is not a valid WebAssembly module.
	#[error( "Bad image for unit '{unit}': {error}" )]
	BadImage { unit: UnitName, error: wasmtime::Error },

	/// A unit imported by `unit` could not be loaded.
	#[error( "Failed to load dependency '{dependency}' of unit '{unit}': {source}" )]
	DependencyLoadFailure { unit: UnitName, dependency: UnitName, #[source] source: Box<LoadError> },

	/// Units import from each other in a cycle.
	#[error( "Dependency cycle detected loading '{0}'" )]
	DependencyCycle( UnitName ),

	/// Linking or running the unit's start function failed.
	///
	/// If the start function ran but registering the instance failed, the instance
	/// stays in the context unrecorded, and a later request for the unit runs the
	/// start function again. [`NameConflict`]( Self::NameConflict ) is checked
	/// beforehand so this does not happen for clashing names.
	#[error( "Failed to instantiate unit '{unit}': {error}" )]
	Instantiation { unit: UnitName, error: wasmtime::Error },

	/// The linker already defines an item under the unit's name that the unit exports too.
	#[error( "Export '{export}' of unit '{unit}' is already defined in the linker" )]
	NameConflict { unit: UnitName, export: String },

	/// The constructor trapped.
	#[error( "Constructor of '{type_name}' failed: {error}" )]
	ConstructorFailed { type_name: TypeName, error: wasmtime::Error },

}

impl From<ResolveError> for LoadError {
	fn from( error: ResolveError ) -> Self { match error {
		ResolveError::NotFound( unit ) => Self::UnitNotFound( unit ),
		ResolveError::Io { unit, source } => Self::Io { unit, source },
	}}
}

/// Loads plugins into fresh isolated contexts.
///
/// Each call to [`load`]( Self::load ) creates a new context, installs a resolver
/// bridge wired to this loader's resolver, and constructs the requested type inside
/// it. The resolver is shared by every context the loader creates and stays captured
/// for as long as each context lives.
///
/// # Type Parameters
/// - `R`: the [`CodeResolver`] images are fetched from
pub struct PluginLoader<R> {
	engine: Engine,
	resolver: Arc<R>,
	linker: Linker<ContextData>,
	live_contexts: Arc<AtomicUsize>,
}

impl<R: CodeResolver + 'static> PluginLoader<R> {

	/// Creates a loader compiling units with `engine` and fetching them from `resolver`.
	///
	/// The engine's [`Config`]( wasmtime::Config ) applies to every context.
	pub fn new( engine: &Engine, resolver: R ) -> Self {
		Self {
			engine: engine.clone(),
			resolver: Arc::new( resolver ),
			linker: Linker::new( engine ),
			live_contexts: Arc::new( AtomicUsize::new( 0 )),
		}
	}

	/// Replaces the linker every context starts from.
	///
	/// Host functions defined on it are available to all units; imports it satisfies
	/// are never sent to the resolver. Each context gets its own clone, so units loaded
	/// in one context never become visible in another.
	pub fn with_linker( mut self, linker: Linker<ContextData> ) -> Self {
		self.linker = linker ;
		self
	}

	#[inline] pub fn resolver( &self ) -> &R { &self.resolver }

	/// Number of contexts created by this loader that have not been torn down.
	pub fn live_contexts( &self ) -> usize { self.live_contexts.load( Ordering::Acquire ) }

	/// Loads `unit` into a new isolated context and constructs `type_name` from it.
	///
	/// Resolving the unit may recursively resolve every unit it imports from, all
	/// through this loader's resolver. On failure the new context is torn down before
	/// returning.
	///
	/// # Errors
	/// See [`LoadError`] for the possible failure kinds.
	pub fn load<T: PluginProxy>( &self, unit: &str, type_name: &str ) -> Result<PluginHandle<T>, LoadError> {

		let unit = UnitName::new( unit ).ok_or( LoadError::InvalidArgument( "unit name must not be empty" ))?;
		let type_name = TypeName::new( type_name ).ok_or( LoadError::InvalidArgument( "type name must not be empty" ))?;

		tracing::debug!( %unit, %type_name, "Loading plugin" );

		let context = IsolatedContext::new(
			&self.engine,
			format!( "{}:{}", unit, type_name ),
			self.linker.clone(),
			Arc::clone( &self.live_contexts ),
		);
		context.initialize_bridge( Arc::clone( &self.resolver ) as Arc<dyn CodeResolver> )?;

		match context.create_instance::<T>( &unit, &type_name ) {
			Ok( instance ) => Ok( PluginHandle::new( context, instance )),
			Err( err ) => {
				tracing::debug!( context = %context.name(), error = %err, "Load failed, unloading context" );
				context.unload();
				Err( err )
			},
		}

	}

}

/// A loader resolves units exactly like the resolver it was created with.
impl<R: CodeResolver> CodeResolver for PluginLoader<R> {
	fn resolve( &self, name: &UnitName ) -> Result<CodeImage, ResolveError> {
		self.resolver.resolve( name )
	}
}

impl<R: std::fmt::Debug> std::fmt::Debug for PluginLoader<R> {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_struct( "PluginLoader" )
			.field( "resolver", &self.resolver )
			.field( "live_contexts", &self.live_contexts.load( Ordering::Relaxed ))
			.finish_non_exhaustive()
	}
}
