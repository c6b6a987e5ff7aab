//! Isolated execution contexts.
//!
//! Every context owns its own wasmtime [`Store`] and [`Linker`]. Units loaded into a
//! context, the objects constructed from them and their linear memories all live in
//! that store, so unloading the context destroys everything at once. Contexts share
//! nothing with each other except host functions supplied through the loader's linker.

use std::collections::HashMap ;
use std::sync::{ Arc, Mutex, PoisonError };
use std::sync::atomic::{ AtomicU64, AtomicUsize, Ordering };
use itertools::Itertools ;
use thiserror::Error ;
use wasmtime::{ Engine, Instance, Linker, Module, Store };

use crate::{ abi, CodeImage, CodeResolver, LoadError, PluginProxy, Proxy, TypeName, UnitName };
use crate::bridge::ResolverBridge ;



/// Unique identifier of a context within the process.
#[derive( Copy, Clone, Debug, Eq, Hash, PartialEq )]
pub struct ContextId( u64 );

impl ContextId {
	fn next() -> Self {
		static NEXT: AtomicU64 = AtomicU64::new( 1 );
		Self( NEXT.fetch_add( 1, Ordering::Relaxed ))
	}
}

impl std::fmt::Display for ContextId {
	fn fmt( &self, f: &mut std::fmt::Formatter ) -> Result<(), std::fmt::Error> {
		std::fmt::Display::fmt( &self.0, f )
	}
}

impl From<ContextId> for u64 {
	fn from( id: ContextId ) -> Self { id.0 }
}

/// Data stored inside every context's wasmtime [`Store`].
///
/// Host functions registered on the loader's [`Linker`] receive it through their
/// [`Caller`]( wasmtime::Caller ) and can use it to tell contexts apart.
#[derive( Debug )]
pub struct ContextData {
	id: ContextId,
	name: String,
}

impl ContextData {
	#[inline] pub fn id( &self ) -> ContextId { self.id }
	#[inline] pub fn name( &self ) -> &str { &self.name }
}

/// Errors caused by the state of a context rather than by the code inside it.
#[derive( Debug, Error )]
pub enum ContextError {
	/// The context has been torn down.
	#[error( "Context '{0}' has been unloaded" )] Unloaded( String ),
	/// A unit was requested before a resolver bridge was installed.
	#[error( "Context '{0}' has no resolver bridge installed" )] NoBridge( String ),
	/// A resolver bridge may only be installed once per context.
	#[error( "Context '{0}' already has a resolver bridge installed" )] BridgeAlreadyInstalled( String ),
	/// A previous call panicked while holding the context.
	#[error( "Context '{0}' is poisoned" )] Poisoned( String ),
}

/// The live part of a context, dropped as a whole on teardown.
pub(crate) struct ContextState {
	pub(crate) store: Store<ContextData>,
	linker: Linker<ContextData>,
	units: HashMap<UnitName, Instance>,
	/// Units whose dependencies are currently being resolved, outermost first
	pending: Vec<UnitName>,
	bridge: Option<Arc<ResolverBridge>>,
}

impl ContextState {

	#[inline] pub(crate) fn data( &self ) -> &ContextData { self.store.data() }

	/// Returns the instance of `name`, raising a resolution failure if it isn't loaded yet.
	pub(crate) fn require_unit( &mut self, name: &UnitName ) -> Result<Instance, LoadError> {

		if let Some( instance ) = self.units.get( name ) { return Ok( *instance ) }
		if self.pending.contains( name ) { return Err( LoadError::DependencyCycle( name.clone() )) }

		let bridge = self.bridge.clone()
			.ok_or_else(|| ContextError::NoBridge( self.data().name().to_string() ))?;

		self.pending.push( name.clone() );
		let result = bridge.handle_resolution_failure( name, self );
		self.pending.pop();

		let instance = result?;
		self.units.insert( name.clone(), instance );
		Ok( instance )

	}

	/// Compiles `image`, resolves the units it imports from and instantiates it.
	pub(crate) fn load_image( &mut self, name: &UnitName, image: &CodeImage ) -> Result<Instance, LoadError> {

		let module = Module::new( self.store.engine(), image.as_bytes() )
			.map_err(| error | LoadError::BadImage { unit: name.clone(), error })?;

		// The unit is registered under its own name after instantiation, which must not
		// fail once the start function has run
		if let Some( export ) = module.exports().find(| export | self.linker.get( &mut self.store, name.as_str(), export.name() ).is_some() ) {
			return Err( LoadError::NameConflict { unit: name.clone(), export: export.name().to_string() })
		}

		// Imports the linker can't satisfy yet name the units this one depends on
		let dependencies = module.imports()
			.filter(| import | self.linker.get( &mut self.store, import.module(), import.name() ).is_none() )
			.map(| import | import.module().to_string() )
			.unique()
			.collect::<Vec<_>>();

		dependencies.iter().filter_map( UnitName::new ).try_for_each(| dependency | match self.require_unit( &dependency ) {
			Ok( _ ) => Ok(()),
			Err( err @ LoadError::DependencyCycle( _ )) => Err( err ),
			Err( err ) => Err( LoadError::DependencyLoadFailure {
				unit: name.clone(),
				dependency,
				source: Box::new( err ),
			}),
		})?;

		let instance = self.linker.instantiate( &mut self.store, &module )
			.map_err(| error | LoadError::Instantiation { unit: name.clone(), error })?;
		self.linker.instance( &mut self.store, name.as_str(), instance )
			.map_err(| error | LoadError::Instantiation { unit: name.clone(), error })?;

		tracing::debug!( context = %self.data().name(), unit = %name, dependencies = dependencies.len(), "Unit loaded" );
		Ok( instance )

	}

	/// Runs the constructor of `type_name` exported by `instance`, returning the object handle.
	pub(crate) fn construct(
		&mut self,
		unit: &UnitName,
		instance: Instance,
		type_name: &TypeName,
	) -> Result<i32, LoadError> {
		let constructor = instance
			.get_export( &mut self.store, &abi::constructor_export( type_name ))
			.ok_or_else(|| LoadError::TypeNotFound { unit: unit.clone(), type_name: type_name.clone() })?
			.into_func()
			.ok_or_else(|| LoadError::AccessDenied { type_name: type_name.clone() })?
			.typed::<(), i32>( &self.store )
			.map_err(| error | LoadError::ArgumentError { type_name: type_name.clone(), error })?;
		constructor.call( &mut self.store, () )
			.map_err(| error | LoadError::ConstructorFailed { type_name: type_name.clone(), error })
	}

}

struct ContextInner {
	id: ContextId,
	name: String,
	state: Mutex<Option<ContextState>>,
	live: Arc<AtomicUsize>,
}

impl ContextInner {
	fn release( &self, state: Option<ContextState> ) -> bool {
		let Some( state ) = state else { return false };
		let units = state.units.len();
		drop( state );
		self.live.fetch_sub( 1, Ordering::AcqRel );
		tracing::debug!( context = %self.name, id = %self.id, units, "Context unloaded" );
		true
	}
}

impl Drop for ContextInner {
	fn drop( &mut self ) {
		let state = self.state.get_mut().unwrap_or_else( PoisonError::into_inner ).take();
		self.release( state );
	}
}

/// A handle to an isolated execution context.
///
/// Cloning creates another reference to the same context. The context stays live
/// until [`unload`]( Self::unload ) is called or the last handle is dropped; after
/// that every operation on it, including calls through previously issued
/// [`Proxy`]s, fails with [`ContextError::Unloaded`].
#[derive( Clone )]
pub struct IsolatedContext {
	inner: Arc<ContextInner>,
}

impl IsolatedContext {

	pub(crate) fn new(
		engine: &Engine,
		name: String,
		linker: Linker<ContextData>,
		live: Arc<AtomicUsize>,
	) -> Self {
		let id = ContextId::next();
		let store = Store::new( engine, ContextData { id, name: name.clone() });
		live.fetch_add( 1, Ordering::AcqRel );
		tracing::debug!( context = %name, %id, "Context created" );
		Self { inner: Arc::new( ContextInner {
			id,
			name,
			state: Mutex::new( Some( ContextState {
				store,
				linker,
				units: HashMap::new(),
				pending: Vec::new(),
				bridge: None,
			})),
			live,
		})}
	}

	#[inline] pub fn id( &self ) -> ContextId { self.inner.id }

	/// Diagnostic name, `"<unit>:<type>"` for contexts created by the loader.
	#[inline] pub fn name( &self ) -> &str { &self.inner.name }

	/// Whether the context has been torn down.
	pub fn is_unloaded( &self ) -> bool {
		self.inner.state.lock().unwrap_or_else( PoisonError::into_inner ).is_none()
	}

	/// Installs the bridge that routes every resolution failure of this context to `resolver`.
	///
	/// # Errors
	/// Fails if a bridge is already installed or the context was unloaded.
	pub fn initialize_bridge( &self, resolver: Arc<dyn CodeResolver> ) -> Result<(), ContextError> {
		self.with_state(| state | match state.bridge {
			Some( _ ) => Err( ContextError::BridgeAlreadyInstalled( self.inner.name.clone() )),
			None => {
				state.bridge = Some( Arc::new( ResolverBridge::new( resolver )));
				Ok(())
			},
		})
	}

	/// Makes sure `unit` and everything it depends on is loaded in this context.
	///
	/// Units already present are not resolved again.
	///
	/// # Errors
	/// Any resolution, compilation or instantiation failure, see [`LoadError`].
	pub fn load_unit( &self, unit: &UnitName ) -> Result<(), LoadError> {
		self.with_state(| state | state.require_unit( unit ).map(|_| ()))
	}

	/// Names of the units loaded so far, sorted.
	///
	/// # Errors
	/// Fails if the context was unloaded.
	pub fn loaded_units( &self ) -> Result<Vec<UnitName>, ContextError> {
		self.with_state(| state | Ok( state.units.keys().cloned().sorted().collect() ))
	}

	/// Constructs an instance of `type_name` from `unit` inside this context.
	///
	/// The unit is resolved first if it isn't loaded yet.
	///
	/// # Errors
	/// Any resolution failure, a missing or non-invokable constructor, or a trap
	/// raised by the constructor. See [`LoadError`].
	pub fn create_instance<T: PluginProxy>( &self, unit: &UnitName, type_name: &TypeName ) -> Result<T, LoadError> {
		let ( instance, object ) = self.with_state(| state | {
			let instance = state.require_unit( unit )?;
			let object = state.construct( unit, instance, type_name )?;
			Ok::<_, LoadError>(( instance, object ))
		})?;
		Ok( T::from_proxy( Proxy::new( self.clone(), unit.clone(), type_name.clone(), instance, object )))
	}

	/// Tears the context down, destroying everything loaded in it.
	///
	/// Returns `true` if this call performed the teardown, `false` if the context
	/// was already unloaded. Teardown cannot be undone.
	pub fn unload( &self ) -> bool {
		let state = self.inner.state.lock().unwrap_or_else( PoisonError::into_inner ).take();
		self.inner.release( state )
	}

	pub(crate) fn with_state<R, E>( &self, f: impl FnOnce( &mut ContextState ) -> Result<R, E> ) -> Result<R, E>
	where
		E: From<ContextError>,
	{
		let mut lock = self.inner.state.lock()
			.map_err(|_| ContextError::Poisoned( self.inner.name.clone() ))?;
		let state = lock.as_mut()
			.ok_or_else(|| ContextError::Unloaded( self.inner.name.clone() ))?;
		f( state )
	}

}

impl std::fmt::Debug for IsolatedContext {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_struct( "IsolatedContext" )
			.field( "id", &self.inner.id )
			.field( "name", &self.inner.name )
			.field( "unloaded", &self.is_unloaded() )
			.finish_non_exhaustive()
	}
}



#[cfg( test )]
mod tests {

	use super::* ;
	use crate::MemoryResolver ;

	fn context( live: &Arc<AtomicUsize> ) -> IsolatedContext {
		let engine = Engine::default();
		IsolatedContext::new( &engine, "test".to_string(), Linker::new( &engine ), Arc::clone( live ))
	}

	fn unit( name: &str ) -> UnitName { UnitName::new( name ).expect( "valid unit name" ) }

	#[test]
	fn units_require_a_bridge() {
		let context = context( &Arc::new( AtomicUsize::new( 0 )));
		match context.load_unit( &unit( "Empty" )) {
			Err( LoadError::ContextUnavailable( ContextError::NoBridge( name ))) => assert_eq!( name, "test" ),
			other => panic!( "Expected NoBridge, found: {:?}", other ),
		}
	}

	#[test]
	fn bridge_is_installed_once() {
		let context = context( &Arc::new( AtomicUsize::new( 0 )));
		let resolver = Arc::new( MemoryResolver::new().with_unit( "Empty", "(module)" ));
		assert!( context.initialize_bridge( resolver.clone() ).is_ok() );
		assert!( matches!( context.initialize_bridge( resolver ), Err( ContextError::BridgeAlreadyInstalled( _ ))));
		assert!( context.load_unit( &unit( "Empty" )).is_ok() );
		assert_eq!( context.loaded_units().expect( "live context" ), vec![ unit( "Empty" )]);
	}

	#[test]
	fn unload_happens_once() {
		let live = Arc::new( AtomicUsize::new( 0 ));
		let context = context( &live );
		let clone = context.clone();
		assert_eq!( live.load( Ordering::Acquire ), 1 );

		assert!( clone.unload() );
		assert!( !context.unload() );
		assert!( context.is_unloaded() );
		assert_eq!( live.load( Ordering::Acquire ), 0 );
		assert!( matches!( context.load_unit( &unit( "Empty" )), Err( LoadError::ContextUnavailable( ContextError::Unloaded( _ )))));
	}

	#[test]
	fn last_handle_unloads() {
		let live = Arc::new( AtomicUsize::new( 0 ));
		drop( context( &live ));
		assert_eq!( live.load( Ordering::Acquire ), 0 );
	}

}
