use wasm_isolate::{ LoadError, Proxy };
use crate::fixtures ;

#[test]
fn missing_dependency_fails_the_load() {

	let loader = fixtures::loader();

	match loader.load::<Proxy>( "NeedsMissing", "NeedsMissing.T" ) {
		Err( LoadError::DependencyLoadFailure { unit, dependency, source })
			if unit.as_str() == "NeedsMissing" && dependency.as_str() == "Nowhere" => match *source {
				LoadError::UnitNotFound( missing ) => assert_eq!( missing.as_str(), "Nowhere" ),
				err => panic!( "Unexpected cause: {}", err ),
			},
		Err( err ) => panic!( "Unexpected error: {}", err ),
		Ok( _ ) => panic!( "Expected failure" ),
	}
	assert_eq!( loader.live_contexts(), 0 );

}
