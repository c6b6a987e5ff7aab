//! Export naming used to find types and methods inside a unit.
//!
//! A unit defines a type `T` by exporting `"T#new"`, a `() -> i32` constructor
//! returning an object handle. Methods are exported as `"T#<method>"` and take the
//! object handle as their first parameter. An optional `"T#dispose"` export is the
//! type's disposal capability. Strings are returned as a `(ptr, len)` pair pointing
//! into the unit's exported `"memory"`.

use crate::TypeName ;



pub(crate) const SEPARATOR: char = '#' ;
pub(crate) const CONSTRUCTOR: &str = "new" ;
pub(crate) const DISPOSE: &str = "dispose" ;
pub(crate) const MEMORY: &str = "memory" ;

#[inline]
pub(crate) fn method_export( type_name: &TypeName, method: &str ) -> String {
	format!( "{}{}{}", type_name, SEPARATOR, method )
}

#[inline]
pub(crate) fn constructor_export( type_name: &TypeName ) -> String {
	method_export( type_name, CONSTRUCTOR )
}



#[cfg( test )]
mod tests {

	use super::* ;

	#[test]
	fn export_names() {
		let type_name = TypeName::new( "MyPlugin.Greeter" ).expect( "valid type name" );
		assert_eq!( constructor_export( &type_name ), "MyPlugin.Greeter#new" );
		assert_eq!( method_export( &type_name, "Greet" ), "MyPlugin.Greeter#Greet" );
		assert_eq!( method_export( &type_name, DISPOSE ), "MyPlugin.Greeter#dispose" );
	}

}
