use std::sync::Arc ;
use wasmtime::Instance ;

use crate::{ CodeResolver, LoadError, UnitName };
use crate::context::ContextState ;



/// Routes a context's resolution failures back to the host resolver.
///
/// Exactly one bridge lives in each context, installed through
/// [`IsolatedContext::initialize_bridge`]( crate::IsolatedContext::initialize_bridge )
/// before the first unit is requested. The bridge is host code, so bootstrapping
/// it never goes through the resolver it is about to install.
pub(crate) struct ResolverBridge {
	resolver: Arc<dyn CodeResolver>,
}

impl ResolverBridge {

	pub(crate) fn new( resolver: Arc<dyn CodeResolver> ) -> Self {
		Self { resolver }
	}

	/// Satisfies a request for a unit the context does not have yet.
	///
	/// Nothing is loaded if the resolver fails; its error reaches the caller unchanged.
	/// Dependencies the image itself imports are resolved through this same bridge
	/// before the unit is instantiated.
	pub(crate) fn handle_resolution_failure(
		&self,
		name: &UnitName,
		state: &mut ContextState,
	) -> Result<Instance, LoadError> {
		tracing::trace!( context = %state.data().name(), unit = %name, "Resolving unit through host resolver" );
		let image = self.resolver.resolve( name )?;
		state.load_image( name, &image )
	}

}

impl std::fmt::Debug for ResolverBridge {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_struct( "ResolverBridge" )
			.field( "resolver", &"<dyn CodeResolver>" )
			.finish()
	}
}
