//! The host-supplied capability that turns unit names into code images.
//!
//! A context never reads code on its own. Whenever it needs a unit it does not
//! have yet, the request is forwarded to the [`CodeResolver`] that was captured
//! when the context was created. Both the request ([`UnitName`]) and the response
//! ([`CodeImage`]) are plain data, so the resolver may live on either side of the
//! isolation boundary.

use std::collections::HashMap ;
use thiserror::Error ;

use crate::{ CodeImage, UnitName };



/// Errors a [`CodeResolver`] may report.
#[derive( Debug, Error )]
pub enum ResolveError {
	/// No image exists for the requested unit.
	#[error( "Unit not found: {0}" )]
	NotFound( UnitName ),
	/// The image exists but could not be read.
	#[error( "Failed to read unit '{unit}': {source}" )]
	Io { unit: UnitName, #[source] source: std::io::Error },
}

/// Resolves unit names to raw code images.
///
/// Implementations must be safe to call repeatedly and from any thread; a single
/// resolver serves every resolution request of every context created with it,
/// including requests issued long after the plugin was first loaded.
///
/// Closures of the right shape are resolvers too:
///
/// ```
/// use wasm_isolate::{ CodeImage, CodeResolver, ResolveError, UnitName };
///
/// let resolver = | name: &UnitName | match name.as_str() {
/// 	"Empty" => Ok( CodeImage::from( "(module)" )),
/// 	_ => Err( ResolveError::NotFound( name.clone() )),
/// };
/// # let name = UnitName::new( "Empty" ).unwrap();
/// assert!( resolver.resolve( &name ).is_ok() );
/// ```
pub trait CodeResolver: Send + Sync {
	/// Returns the image for `name`.
	///
	/// # Errors
	/// [`ResolveError::NotFound`] if no image exists, [`ResolveError::Io`] for any
	/// underlying read failure.
	fn resolve( &self, name: &UnitName ) -> Result<CodeImage, ResolveError> ;
}

impl<F> CodeResolver for F
where
	F: Fn( &UnitName ) -> Result<CodeImage, ResolveError> + Send + Sync,
{
	fn resolve( &self, name: &UnitName ) -> Result<CodeImage, ResolveError> { self( name )}
}

/// A resolver serving images registered up front.
///
/// Useful for hosts that embed their plugins in the binary, and for tests.
#[derive( Debug, Clone, Default )]
pub struct MemoryResolver {
	images: HashMap<UnitName, CodeImage>,
}

impl MemoryResolver {

	pub fn new() -> Self { Self::default() }

	/// Registers `image` under `name`, replacing any previous image.
	///
	/// A blank `name` can never be requested, so nothing is registered for it.
	pub fn with_unit( mut self, name: &str, image: impl Into<CodeImage> ) -> Self {
		match UnitName::new( name ) {
			Some( unit ) => { self.insert( unit, image ); },
			None => tracing::warn!( "Ignoring image registered under a blank unit name" ),
		}
		self
	}

	/// Registers `image` under `unit`, returning the image it replaces.
	pub fn insert( &mut self, unit: UnitName, image: impl Into<CodeImage> ) -> Option<CodeImage> {
		self.images.insert( unit, image.into() )
	}

	/// Names of all registered units.
	pub fn units( &self ) -> impl Iterator<Item = &UnitName> { self.images.keys() }

}

impl CodeResolver for MemoryResolver {
	fn resolve( &self, name: &UnitName ) -> Result<CodeImage, ResolveError> {
		self.images.get( name ).cloned().ok_or_else(|| ResolveError::NotFound( name.clone() ))
	}
}



#[cfg( test )]
mod tests {

	use super::* ;

	fn unit( name: &str ) -> UnitName { UnitName::new( name ).expect( "valid unit name" ) }

	#[test]
	fn memory_resolver_returns_registered_images() {
		let resolver = MemoryResolver::new().with_unit( "Foo", "(module)" );
		match resolver.resolve( &unit( "Foo" )) {
			Ok( image ) => assert_eq!( image.as_bytes(), b"(module)" ),
			Err( err ) => panic!( "Unexpected error: {}", err ),
		}
	}

	#[test]
	fn memory_resolver_skips_blank_names() {
		let resolver = MemoryResolver::new()
			.with_unit( "  ", "(module)" )
			.with_unit( "Foo", "(module)" );
		assert_eq!( resolver.units().collect::<Vec<_>>(), vec![ &unit( "Foo" )]);
	}

	#[test]
	fn memory_resolver_replaces_images() {
		let mut resolver = MemoryResolver::new().with_unit( "Foo", "(module)" );
		match resolver.insert( unit( "Foo" ), "(module $foo)" ) {
			Some( previous ) => assert_eq!( previous.as_bytes(), b"(module)" ),
			None => panic!( "Expected the previous image" ),
		}
		assert!( resolver.insert( unit( "Bar" ), "(module)" ).is_none() );
	}

	#[test]
	fn memory_resolver_reports_missing_units() {
		match MemoryResolver::new().resolve( &unit( "Bar" )) {
			Err( ResolveError::NotFound( name )) if name.as_str() == "Bar" => {}
			other => panic!( "Expected NotFound, found: {:?}", other ),
		}
	}

}
