//! Plain-data identifiers and images that cross the isolation boundary.

use std::sync::Arc ;



/// Name of a loadable code unit.
///
/// Names are compared by their canonical form: surrounding whitespace is
/// stripped on construction, so `" Foo "` and `"Foo"` identify the same unit.
#[derive( Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord )]
pub struct UnitName( String );

impl UnitName {

	/// Creates a unit name, returning `None` if it is empty after trimming.
	pub fn new( name: impl AsRef<str> ) -> Option<Self> {
		match name.as_ref().trim() {
			"" => None,
			name => Some( Self( name.to_string() )),
		}
	}

	/// The canonical string form.
	#[inline] pub fn as_str( &self ) -> &str { &self.0 }

}

impl std::fmt::Display for UnitName {
	fn fmt( &self, f: &mut std::fmt::Formatter ) -> std::fmt::Result { f.write_str( &self.0 )}
}

impl AsRef<str> for UnitName {
	fn as_ref( &self ) -> &str { &self.0 }
}

impl std::borrow::Borrow<str> for UnitName {
	fn borrow( &self ) -> &str { &self.0 }
}

/// Name of a type defined by a unit, e.g. `MyPlugin.Greeter`.
#[derive( Clone, Debug, PartialEq, Eq, Hash )]
pub struct TypeName( String );

impl TypeName {

	/// Creates a type name, returning `None` if it is empty after trimming.
	pub fn new( name: impl AsRef<str> ) -> Option<Self> {
		match name.as_ref().trim() {
			"" => None,
			name => Some( Self( name.to_string() )),
		}
	}

	#[inline] pub fn as_str( &self ) -> &str { &self.0 }

}

impl std::fmt::Display for TypeName {
	fn fmt( &self, f: &mut std::fmt::Formatter ) -> std::fmt::Result { f.write_str( &self.0 )}
}

/// The raw image of a unit as returned by a [`CodeResolver`]( crate::CodeResolver ).
///
/// Images are immutable; cloning one shares the underlying buffer. The bytes are
/// either a binary WebAssembly module or its text format.
#[derive( Clone, PartialEq, Eq )]
pub struct CodeImage( Arc<[u8]> );

impl CodeImage {

	#[inline] pub fn as_bytes( &self ) -> &[u8] { &self.0 }

	#[inline] pub fn len( &self ) -> usize { self.0.len() }

	#[inline] pub fn is_empty( &self ) -> bool { self.0.is_empty() }

}

impl From<Vec<u8>> for CodeImage {
	fn from( bytes: Vec<u8> ) -> Self { Self( bytes.into() )}
}

impl From<&[u8]> for CodeImage {
	fn from( bytes: &[u8] ) -> Self { Self( bytes.into() )}
}

impl From<&str> for CodeImage {
	fn from( text: &str ) -> Self { Self( text.as_bytes().into() )}
}

impl AsRef<[u8]> for CodeImage {
	fn as_ref( &self ) -> &[u8] { &self.0 }
}

impl std::fmt::Debug for CodeImage {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_tuple( "CodeImage" ).field( &format_args!( "<{} bytes>", self.0.len() )).finish()
	}
}



#[cfg( test )]
mod tests {

	use super::* ;

	#[test]
	fn unit_names_compare_by_canonical_form() {
		assert_eq!( UnitName::new( "  MyPlugin\t" ), UnitName::new( "MyPlugin" ));
		assert_eq!( UnitName::new( "MyPlugin" ).map(| name | name.to_string() ), Some( "MyPlugin".to_string() ));
	}

	#[test]
	fn blank_names_are_rejected() {
		assert!( UnitName::new( "" ).is_none() );
		assert!( UnitName::new( "   " ).is_none() );
		assert!( TypeName::new( "\n" ).is_none() );
	}

	#[test]
	fn images_share_their_buffer() {
		let image = CodeImage::from( vec![ 0, 97, 115, 109 ]);
		let clone = image.clone();
		assert_eq!( image.as_bytes().as_ptr(), clone.as_bytes().as_ptr() );
		assert_eq!( format!( "{:?}", image ), "CodeImage(<4 bytes>)" );
	}

}
