use wasm_isolate::{ LoadError, Proxy };
use crate::fixtures ;

#[test]
fn load_invalid_module() {
	match fixtures::loader().load::<Proxy>( "Broken", "Broken.T" ) {
		Err( LoadError::BadImage { unit, .. }) if unit.as_str() == "Broken" => {},
		Err( err ) => panic!( "Unexpected error: {}", err ),
		Ok( _ ) => panic!( "Expected failure" ),
	}
}

#[test]
fn load_module_with_trapping_start() {
	let loader = fixtures::loader();
	match loader.load::<Proxy>( "Starting", "Starting.T" ) {
		Err( LoadError::Instantiation { unit, .. }) if unit.as_str() == "Starting" => {},
		Err( err ) => panic!( "Unexpected error: {}", err ),
		Ok( _ ) => panic!( "Expected failure" ),
	}
	assert_eq!( loader.live_contexts(), 0 );
}
