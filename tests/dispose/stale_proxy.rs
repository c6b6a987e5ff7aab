use wasm_isolate::{ BoundaryError, CallError, ContextError, LoadError, Proxy };
use crate::fixtures::{ self, Greeter };

#[test]
fn calls_after_dispose_fail_at_the_boundary() {

	let loader = fixtures::loader();
	let plugin = loader.load::<Greeter>( "MyPlugin", "MyPlugin.Greeter" ).unwrap();
	let greeter = plugin.instance().unwrap();
	plugin.dispose().unwrap();

	match greeter.greet() {
		Err( CallError::Boundary( BoundaryError::ContextUnavailable( ContextError::Unloaded( _ )))) => {},
		other => panic!( "Unexpected result: {:?}", other ),
	}

}

#[test]
fn context_refuses_work_after_dispose() {

	let loader = fixtures::loader();
	let plugin = loader.load::<Greeter>( "MyPlugin", "MyPlugin.Greeter" ).unwrap();
	let context = plugin.context().clone();
	plugin.dispose().unwrap();

	match context.create_instance::<Proxy>( &fixtures::unit( "MyPlugin" ), &fixtures::type_name( "MyPlugin.Greeter" )) {
		Err( LoadError::ContextUnavailable( ContextError::Unloaded( _ ))) => {},
		Err( err ) => panic!( "Unexpected error: {}", err ),
		Ok( _ ) => panic!( "Expected failure" ),
	}
	assert!( context.loaded_units().is_err() );
	assert!( !context.unload() );

	// The resolver was never consulted again
	assert_eq!( loader.resolver().count( "MyPlugin" ), 1 );

}
