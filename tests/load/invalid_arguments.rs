use wasm_isolate::{ LoadError, Proxy };
use crate::fixtures ;

#[test]
fn load_rejects_blank_names() {

	let loader = fixtures::loader();

	match loader.load::<Proxy>( "", "MyPlugin.Greeter" ) {
		Err( LoadError::InvalidArgument( _ )) => {},
		Err( err ) => panic!( "Unexpected error: {}", err ),
		Ok( _ ) => panic!( "Expected failure" ),
	}

	match loader.load::<Proxy>( "MyPlugin", "  " ) {
		Err( LoadError::InvalidArgument( _ )) => {},
		Err( err ) => panic!( "Unexpected error: {}", err ),
		Ok( _ ) => panic!( "Expected failure" ),
	}

	// Nothing was created or resolved
	assert!( loader.resolver().requests().is_empty() );
	assert_eq!( loader.live_contexts(), 0 );

}
