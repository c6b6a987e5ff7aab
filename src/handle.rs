use std::sync::atomic::{ AtomicBool, Ordering };
use thiserror::Error ;

use crate::{ CallError, IsolatedContext, PluginProxy };



/// Returned when a disposed [`PluginHandle`]'s instance is accessed.
#[derive( Debug, Error )]
#[error( "Plugin handle for context '{0}' has been disposed" )]
pub struct UseAfterDispose( pub String );

/// Errors reported by [`PluginHandle::dispose`].
///
/// The context is always torn down before one of these is returned.
#[derive( Debug, Error )]
pub enum DisposeError {
	/// The instance's own disposal capability failed.
	#[error( "Plugin instance failed to dispose: {0}" )] Instance( #[source] CallError ),
}

/// A plugin instance together with the isolated context it lives in.
///
/// Returned by [`PluginLoader::load`]( crate::PluginLoader::load ). The handle owns the
/// context: disposing it (explicitly or by dropping the handle) first lets the instance
/// dispose itself, then tears the context down. Disposal happens exactly once even when
/// several threads race to dispose the same handle.
///
/// # Type Parameters
/// - `T`: the host-side view of the instance, see [`PluginProxy`]
pub struct PluginHandle<T: PluginProxy> {
	context: IsolatedContext,
	instance: T,
	/// Set by the caller that wins the right to dispose
	claimed: AtomicBool,
	/// Set once the context has been torn down
	torn_down: AtomicBool,
}

/// Unloads the context when dropped, so teardown survives a failing or panicking
/// instance disposal.
struct UnloadGuard<'a> {
	context: &'a IsolatedContext,
	torn_down: &'a AtomicBool,
}

impl Drop for UnloadGuard<'_> {
	fn drop( &mut self ) {
		self.context.unload();
		self.torn_down.store( true, Ordering::Release );
	}
}

impl<T: PluginProxy> PluginHandle<T> {

	pub(crate) fn new( context: IsolatedContext, instance: T ) -> Self {
		Self { context, instance, claimed: AtomicBool::new( false ), torn_down: AtomicBool::new( false )}
	}

	/// The plugin instance.
	///
	/// # Errors
	/// [`UseAfterDispose`] once disposal of the handle has started.
	pub fn instance( &self ) -> Result<&T, UseAfterDispose> {
		match self.claimed.load( Ordering::Acquire ) {
			true => Err( UseAfterDispose( self.context.name().to_string() )),
			false => Ok( &self.instance ),
		}
	}

	/// Whether disposal has completed and the context is torn down.
	#[inline] pub fn is_disposed( &self ) -> bool { self.torn_down.load( Ordering::Acquire ) }

	/// The context owned by this handle.
	///
	/// Further units and instances may be requested through it; they resolve through
	/// the same resolver as the original load.
	#[inline] pub fn context( &self ) -> &IsolatedContext { &self.context }

	/// Disposes the instance, then tears down its context.
	///
	/// Only the first call does anything. Concurrent calls wait until that teardown
	/// has finished and then return `Ok(())`, so the context is always unloaded by the
	/// time any call returns. Calling it from within the instance's own disposal never
	/// returns.
	///
	/// # Errors
	/// [`DisposeError::Instance`] if the instance's disposal failed. The context has
	/// been torn down regardless.
	pub fn dispose( &self ) -> Result<(), DisposeError> {
		if self.claimed.compare_exchange( false, true, Ordering::AcqRel, Ordering::Acquire ).is_err() {
			while !self.is_disposed() { std::thread::yield_now(); }
			return Ok(())
		}
		let _unload = UnloadGuard { context: &self.context, torn_down: &self.torn_down };
		self.instance.dispose().map_err( DisposeError::Instance )
	}

}

impl<T: PluginProxy> Drop for PluginHandle<T> {
	fn drop( &mut self ) {
		if let Err( err ) = self.dispose() {
			tracing::warn!( context = %self.context.name(), error = %err, "Plugin dropped with failing disposal" );
		}
	}
}

impl<T: PluginProxy + std::fmt::Debug> std::fmt::Debug for PluginHandle<T> {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_struct( "PluginHandle" )
			.field( "context", &self.context )
			.field( "instance", &self.instance )
			.field( "disposed", &self.is_disposed() )
			.finish()
	}
}
