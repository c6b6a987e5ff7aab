use std::sync::atomic::Ordering ;
use wasm_isolate::{ PluginProxy, Proxy };
use crate::fixtures::{ self, Greeter };

#[test]
fn dispose_runs_the_instance_disposal_then_unloads() {

	let ( linker, disposals ) = fixtures::disposal_linker();
	let loader = fixtures::loader().with_linker( linker );
	let resource = loader.load::<Proxy>( "Disposable", "Disposable.Resource" ).unwrap();
	assert!( resource.instance().unwrap().has_method( "dispose" ).unwrap() );

	resource.dispose().unwrap();
	assert_eq!( disposals.load( Ordering::SeqCst ), 1 );
	assert!( resource.is_disposed() );
	assert!( resource.context().is_unloaded() );
	assert!( resource.instance().is_err() );
	assert_eq!( loader.live_contexts(), 0 );

	// Later calls are no-ops
	resource.dispose().unwrap();
	assert_eq!( disposals.load( Ordering::SeqCst ), 1 );

}

#[test]
fn dispose_without_disposal_capability() {

	let loader = fixtures::loader();
	let plugin = loader.load::<Greeter>( "MyPlugin", "MyPlugin.Greeter" ).unwrap();
	assert!( !plugin.instance().unwrap().proxy().has_method( "dispose" ).unwrap() );

	plugin.dispose().unwrap();
	assert!( plugin.context().is_unloaded() );

}

#[test]
fn dropping_the_handle_disposes() {

	let ( linker, disposals ) = fixtures::disposal_linker();
	let loader = fixtures::loader().with_linker( linker );

	{
		let _resource = loader.load::<Proxy>( "Disposable", "Disposable.Resource" ).unwrap();
		assert_eq!( loader.live_contexts(), 1 );
	}

	assert_eq!( disposals.load( Ordering::SeqCst ), 1 );
	assert_eq!( loader.live_contexts(), 0 );

}
