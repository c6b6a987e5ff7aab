//! Host-side handles to objects living inside an isolated context.
//!
//! Nothing but plain data crosses the boundary: arguments and results are
//! [`Value`]s, strings are copied out of the unit's linear memory. Every call
//! locks the owning context, checks the callee's signature and marshals the
//! values, so it may fail with a [`BoundaryError`] regardless of what the callee
//! itself does. Failures raised by the callee are reported separately as
//! [`CallError::Trap`].

use thiserror::Error ;
use wasmtime::{ Instance, Val, ValType };

use crate::{ abi, IsolatedContext, TypeName, UnitName };
use crate::context::{ ContextError, ContextState };



/// A plain value passed to or returned from a call across the boundary.
#[derive( Copy, Clone, Debug, PartialEq )]
pub enum Value {
	I32( i32 ),
	I64( i64 ),
	F32( f32 ),
	F64( f64 ),
}

impl Value {
	fn matches( &self, ty: &ValType ) -> bool {
		matches!(
			( self, ty ),
			( Value::I32( _ ), ValType::I32 )
			| ( Value::I64( _ ), ValType::I64 )
			| ( Value::F32( _ ), ValType::F32 )
			| ( Value::F64( _ ), ValType::F64 )
		)
	}
}

impl From<Value> for Val {
	fn from( value: Value ) -> Val { match value {
		Value::I32( value ) => Val::I32( value ),
		Value::I64( value ) => Val::I64( value ),
		Value::F32( value ) => Val::F32( value.to_bits() ),
		Value::F64( value ) => Val::F64( value.to_bits() ),
	}}
}

impl TryFrom<Val> for Value {
	type Error = BoundaryError ;
	fn try_from( val: Val ) -> Result<Self, Self::Error> { match val {
		Val::I32( value ) => Ok( Value::I32( value )),
		Val::I64( value ) => Ok( Value::I64( value )),
		Val::F32( bits ) => Ok( Value::F32( f32::from_bits( bits ))),
		Val::F64( bits ) => Ok( Value::F64( f64::from_bits( bits ))),
		_ => Err( BoundaryError::NonPlainValue ),
	}}
}

/// Failures of the boundary crossing itself, independent of the callee's logic.
#[derive( Debug, Error )]
pub enum BoundaryError {
	/// The owning context is unloaded or poisoned.
	#[error( "Context unavailable: {0}" )] ContextUnavailable( #[from] ContextError ),
	/// The type doesn't export the requested method.
	#[error( "Missing method: {0}" )] MissingMethod( String ),
	/// The arguments don't match the method's parameters.
	#[error( "Signature mismatch: {0}" )] SignatureMismatch( String ),
	/// The callee returned a value that only has meaning inside its context.
	#[error( "Non-plain value cannot cross the context boundary" )] NonPlainValue,
	/// The method's results don't have the expected shape.
	#[error( "Unexpected results from '{method}': expected {expected}, found {found} values" )]
	UnexpectedResults { method: String, expected: &'static str, found: usize },
	/// The unit doesn't export a linear memory to read from.
	#[error( "Unit '{0}' exports no memory" )] MissingMemory( UnitName ),
	/// A returned pointer/length pair lies outside the unit's memory.
	#[error( "Out of bounds memory access at {ptr} (+{len})" )] MemoryAccess { ptr: u32, len: u32 },
	/// Returned bytes aren't valid UTF-8.
	#[error( "Invalid string: {0}" )] InvalidString( #[from] std::string::FromUtf8Error ),
}

/// Errors that can occur when calling a method through a [`Proxy`].
#[derive( Debug, Error )]
pub enum CallError {
	/// Marshalling or context failure; the callee may not have run at all.
	#[error( "Boundary error: {0}" )] Boundary( #[from] BoundaryError ),
	/// The callee trapped.
	#[error( "Runtime exception: {0}" )] Trap( wasmtime::Error ),
}

impl From<ContextError> for CallError {
	fn from( error: ContextError ) -> Self { Self::Boundary( error.into() )}
}

impl CallError {
	/// Whether the failure happened at the boundary rather than in the callee.
	pub fn is_boundary( &self ) -> bool { matches!( self, Self::Boundary( _ ))}
}

/// A reference to an object constructed inside an [`IsolatedContext`].
///
/// Calls are routed to the exports of the object's type (see the crate docs for the
/// export naming). The proxy keeps the context handle alive but not the context's
/// contents: once the context is unloaded every call fails with
/// [`BoundaryError::ContextUnavailable`].
pub struct Proxy {
	context: IsolatedContext,
	unit: UnitName,
	type_name: TypeName,
	instance: Instance,
	object: i32,
}

impl Proxy {

	const PLACEHOLDER_VAL: Val = Val::I32( 0 );

	pub(crate) fn new(
		context: IsolatedContext,
		unit: UnitName,
		type_name: TypeName,
		instance: Instance,
		object: i32,
	) -> Self {
		Self { context, unit, type_name, instance, object }
	}

	/// The unit the object's type was loaded from.
	#[inline] pub fn unit( &self ) -> &UnitName { &self.unit }

	/// The object's dynamic type.
	#[inline] pub fn type_name( &self ) -> &TypeName { &self.type_name }

	/// The context the object lives in.
	#[inline] pub fn context( &self ) -> &IsolatedContext { &self.context }

	/// Whether the object's type exports `method`.
	///
	/// # Errors
	/// Fails if the context is no longer available.
	pub fn has_method( &self, method: &str ) -> Result<bool, CallError> {
		let export = abi::method_export( &self.type_name, method );
		self.context.with_state(| state | Ok( self.instance.get_func( &mut state.store, &export ).is_some() ))
	}

	/// Calls `method` on the object, passing the object handle followed by `args`.
	///
	/// # Errors
	/// [`CallError::Boundary`] if the context is gone, the method doesn't exist, the
	/// arguments don't match or a result can't cross the boundary;
	/// [`CallError::Trap`] if the method itself traps.
	pub fn call( &self, method: &str, args: &[Value] ) -> Result<Vec<Value>, CallError> {
		self.context.with_state(| state | self.invoke( state, method, args ))
	}

	/// Calls a method returning a string as a `(ptr, len)` pair into the unit's memory.
	///
	/// # Errors
	/// As [`call`]( Self::call ), plus [`BoundaryError`]s for results of the wrong
	/// shape, a missing memory, out of bounds pointers and invalid UTF-8.
	pub fn call_string( &self, method: &str, args: &[Value] ) -> Result<String, CallError> {
		self.context.with_state(| state | {

			let results = self.invoke( state, method, args )?;
			let &[ Value::I32( ptr ), Value::I32( len )] = results.as_slice() else {
				return Err( BoundaryError::UnexpectedResults {
					method: method.to_string(),
					expected: "(i32, i32)",
					found: results.len(),
				}.into() )
			};
			let ( ptr, len ) = ( ptr.cast_unsigned(), len.cast_unsigned() );

			let memory = self.instance.get_memory( &mut state.store, abi::MEMORY )
				.ok_or_else(|| BoundaryError::MissingMemory( self.unit.clone() ))?;
			let start = ptr as usize ;
			let bytes = memory.data( &state.store )
				.get( start..start.saturating_add( len as usize ))
				.ok_or( BoundaryError::MemoryAccess { ptr, len })?
				.to_vec();

			String::from_utf8( bytes ).map_err(| err | CallError::Boundary( err.into() ))

		})
	}

	/// Invokes the type's disposal capability, if it exports one.
	///
	/// # Errors
	/// Fails if the context is gone or the disposal export traps.
	pub fn dispose_remote( &self ) -> Result<(), CallError> {
		self.context.with_state(| state | {
			let export = abi::method_export( &self.type_name, abi::DISPOSE );
			match self.instance.get_func( &mut state.store, &export ) {
				Some( _ ) => self.invoke( state, abi::DISPOSE, &[] ).map(|_| ()),
				None => Ok(()),
			}
		})
	}

	fn invoke( &self, state: &mut ContextState, method: &str, args: &[Value] ) -> Result<Vec<Value>, CallError> {

		let export = abi::method_export( &self.type_name, method );
		let func = self.instance.get_func( &mut state.store, &export )
			.ok_or_else(|| BoundaryError::MissingMethod( export.clone() ))?;
		let ty = func.ty( &state.store );

		let params = std::iter::once( Value::I32( self.object ))
			.chain( args.iter().copied() )
			.collect::<Vec<_>>();
		if ty.params().len() != params.len() || !ty.params().zip( &params ).all(|( ty, value )| value.matches( &ty )) {
			return Err( BoundaryError::SignatureMismatch( export ).into() );
		}

		let params = params.into_iter().map( Val::from ).collect::<Vec<_>>();
		let mut results = vec![ Self::PLACEHOLDER_VAL; ty.results().len() ];
		func.call( &mut state.store, &params, &mut results ).map_err( CallError::Trap )?;

		results.into_iter()
			.map( Value::try_from )
			.collect::<Result<Vec<_>, _>>()
			.map_err( CallError::from )

	}

}

impl std::fmt::Debug for Proxy {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_struct( "Proxy" )
			.field( "context", &self.context.name() )
			.field( "unit", &self.unit )
			.field( "type_name", &self.type_name )
			.field( "object", &self.object )
			.finish_non_exhaustive()
	}
}

/// A host-side view of a plugin object, built on top of a raw [`Proxy`].
///
/// Implement this for typed wrappers that expose the plugin's methods as regular
/// Rust methods:
///
/// ```
/// use wasm_isolate::{ CallError, PluginProxy, Proxy };
///
/// struct Greeter( Proxy );
///
/// impl PluginProxy for Greeter {
/// 	fn from_proxy( proxy: Proxy ) -> Self { Self( proxy ) }
/// 	fn proxy( &self ) -> &Proxy { &self.0 }
/// }
///
/// impl Greeter {
/// 	fn greet( &self ) -> Result<String, CallError> {
/// 		self.0.call_string( "Greet", &[] )
/// 	}
/// }
/// ```
pub trait PluginProxy: Sized + Send + Sync {

	/// Wraps a freshly constructed object.
	fn from_proxy( proxy: Proxy ) -> Self ;

	/// The underlying raw proxy.
	fn proxy( &self ) -> &Proxy ;

	/// The instance's disposal capability, run before its context is torn down.
	///
	/// Defaults to calling the type's `dispose` export when it has one.
	///
	/// # Errors
	/// Whatever the disposal reports; the context is torn down regardless.
	fn dispose( &self ) -> Result<(), CallError> { self.proxy().dispose_remote() }

}

impl PluginProxy for Proxy {
	fn from_proxy( proxy: Proxy ) -> Self { proxy }
	fn proxy( &self ) -> &Proxy { self }
}



#[cfg( test )]
mod tests {

	use super::* ;

	#[test]
	fn plain_values_convert_losslessly() {
		[ Value::I32( -7 ), Value::I64( i64::MAX ), Value::F32( 1.5 ), Value::F64( -0.25 )]
			.into_iter()
			.for_each(| value | match Value::try_from( Val::from( value )) {
				Ok( converted ) => assert_eq!( converted, value ),
				Err( err ) => panic!( "Conversion of {:?} failed: {}", value, err ),
			});
	}

	#[test]
	fn values_match_their_wasm_types() {
		assert!( Value::I32( 0 ).matches( &ValType::I32 ));
		assert!( Value::F64( 0.0 ).matches( &ValType::F64 ));
		assert!( !Value::I64( 0 ).matches( &ValType::I32 ));
		assert!( !Value::F32( 0.0 ).matches( &ValType::F64 ));
	}

	#[test]
	fn context_errors_are_boundary_errors() {
		let error = CallError::from( ContextError::Unloaded( "a:b".to_string() ));
		assert!( error.is_boundary() );
		assert!( matches!( error, CallError::Boundary( BoundaryError::ContextUnavailable( ContextError::Unloaded( _ )))));
	}

}
