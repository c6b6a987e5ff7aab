use wasm_isolate::{ PluginProxy, Proxy };
use crate::fixtures::{ self, Greeter };

#[test]
fn load_single_unit() {

	let loader = fixtures::loader();
	let plugin = loader.load::<Greeter>( "MyPlugin", "MyPlugin.Greeter" ).unwrap();

	let greeter = plugin.instance().unwrap();
	assert_eq!( greeter.greet().unwrap(), "hello" );
	assert_eq!( greeter.proxy().type_name().as_str(), "MyPlugin.Greeter" );
	assert_eq!( greeter.proxy().unit().as_str(), "MyPlugin" );
	assert_eq!( plugin.context().name(), "MyPlugin:MyPlugin.Greeter" );
	assert_eq!( plugin.context().loaded_units().unwrap(), vec![ fixtures::unit( "MyPlugin" )]);
	assert_eq!( loader.resolver().requests(), vec![ fixtures::unit( "MyPlugin" )]);
	assert_eq!( loader.live_contexts(), 1 );

	plugin.dispose().unwrap();
	assert_eq!( loader.live_contexts(), 0 );

}

#[test]
fn every_load_gets_a_fresh_context() {

	let loader = fixtures::loader();
	let first = loader.load::<Greeter>( "MyPlugin", "MyPlugin.Greeter" ).unwrap();
	let second = loader.load::<Greeter>( "MyPlugin", "MyPlugin.Greeter" ).unwrap();

	assert_ne!( first.context().id(), second.context().id() );
	assert_eq!( loader.resolver().count( "MyPlugin" ), 2 );
	assert_eq!( loader.live_contexts(), 2 );

	// Guest globals are not shared, so both constructors hand out the first object id
	assert_eq!( first.instance().unwrap().id().unwrap(), 1 );
	assert_eq!( second.instance().unwrap().id().unwrap(), 1 );

	drop( first );
	assert_eq!( loader.live_contexts(), 1 );
	assert_eq!( second.instance().unwrap().greet().unwrap(), "hello" );

}

#[test]
fn further_instances_reuse_the_loaded_unit() {

	let loader = fixtures::loader();
	let plugin = loader.load::<Greeter>( "MyPlugin", "MyPlugin.Greeter" ).unwrap();

	let another = plugin.context()
		.create_instance::<Greeter>( &fixtures::unit( "MyPlugin" ), &fixtures::type_name( "MyPlugin.Greeter" ))
		.unwrap();

	assert_eq!( plugin.instance().unwrap().id().unwrap(), 1 );
	assert_eq!( another.id().unwrap(), 2 );
	assert_eq!( loader.resolver().count( "MyPlugin" ), 1 );

}

#[test]
fn instance_type_follows_the_request() {

	let loader = fixtures::loader();
	let plugin = loader.load::<Greeter>( "MyPlugin", "MyPlugin.Greeter" ).unwrap();

	let farewell = plugin.context()
		.create_instance::<Proxy>( &fixtures::unit( "MyPlugin" ), &fixtures::type_name( "MyPlugin.Farewell" ))
		.unwrap();

	assert_eq!( farewell.type_name().as_str(), "MyPlugin.Farewell" );
	assert_eq!( farewell.unit().as_str(), "MyPlugin" );
	assert_eq!( farewell.call_string( "Greet", &[] ).unwrap(), "goodbye" );
	assert_eq!( plugin.instance().unwrap().proxy().type_name().as_str(), "MyPlugin.Greeter" );

}
