use wasm_isolate::{ CodeImage, LoadError, MemoryResolver, PluginLoader, Proxy, ResolveError, UnitName, Value };
use crate::fixtures ;

#[test]
fn closures_resolve_units() {

	let resolver = | name: &UnitName | match name.as_str() {
		"Answer" => Ok( CodeImage::from( r#"(module
			(func (export "Answer.T#new") (result i32) i32.const 0)
			(func (export "Answer.T#Get") (param i32) (result i32) i32.const 42)
		)"# )),
		_ => Err( ResolveError::NotFound( name.clone() )),
	};

	let loader = PluginLoader::new( &fixtures::ENGINE, resolver );
	let answer = loader.load::<Proxy>( "Answer", "Answer.T" ).unwrap();
	assert_eq!( answer.instance().unwrap().call( "Get", &[] ).unwrap(), vec![ Value::I32( 42 )]);

	assert!( matches!( loader.load::<Proxy>( "Question", "Question.T" ), Err( LoadError::UnitNotFound( _ ))));

}

#[test]
fn loaders_resolve_like_their_resolver() {

	// A loader can stand in as the resolver of another loader
	let inner = fixtures::loader();
	let outer = PluginLoader::new( &fixtures::ENGINE, inner );

	let plugin = outer.load::<Proxy>( "Calculator", "Calculator.Adder" ).unwrap();
	assert_eq!( plugin.instance().unwrap().call( "Add", &[ Value::I32( 1 ), Value::I32( 1 )]).unwrap(), vec![ Value::I32( 2 )]);
	assert_eq!( outer.resolver().resolver().count( "Calculator" ), 1 );

}

#[test]
fn memory_resolver_serves_registered_units() {

	let resolver = MemoryResolver::new()
		.with_unit( "Core", std::fs::read( fixture_path!( "Core" )).unwrap() )
		.with_unit( "MathLib", std::fs::read( fixture_path!( "MathLib" )).unwrap() )
		.with_unit( "Calculator", std::fs::read( fixture_path!( "Calculator" )).unwrap() );
	assert_eq!( resolver.units().count(), 3 );

	let loader = PluginLoader::new( &fixtures::ENGINE, resolver );
	let plugin = loader.load::<Proxy>( "Calculator", "Calculator.Adder" ).unwrap();
	assert_eq!( plugin.instance().unwrap().call( "Increment", &[ Value::I32( 1 )]).unwrap(), vec![ Value::I32( 2 )]);

}
